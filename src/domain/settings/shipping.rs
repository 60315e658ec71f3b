//! Shipping methods and their per-form settings

use serde::{Deserialize, Serialize};
use std::fmt;
use crate::domain::value_objects::Money;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingMethod {
    Regular,
    Free,
    FlatJawa,
    FlatBali,
    FlatSumatra,
}

impl ShippingMethod {
    /// Declaration order, which is also display order.
    pub const ALL: [ShippingMethod; 5] = [
        ShippingMethod::Regular,
        ShippingMethod::Free,
        ShippingMethod::FlatJawa,
        ShippingMethod::FlatBali,
        ShippingMethod::FlatSumatra,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Free => "free",
            Self::FlatJawa => "flat_jawa",
            Self::FlatBali => "flat_bali",
            Self::FlatSumatra => "flat_sumatra",
        }
    }

    /// `flat_*` methods charge their cost per kilogram instead of per order.
    pub fn is_weight_rate(&self) -> bool {
        matches!(self, Self::FlatJawa | Self::FlatBali | Self::FlatSumatra)
    }
}

impl fmt::Display for ShippingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.key()) }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingSetting {
    pub visible: bool,
    pub cost: Money,
}

impl ShippingSetting {
    pub fn visible(cost: Money) -> Self { Self { visible: true, cost } }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingSettings {
    pub regular: ShippingSetting,
    pub free: ShippingSetting,
    pub flat_jawa: ShippingSetting,
    pub flat_bali: ShippingSetting,
    pub flat_sumatra: ShippingSetting,
}

impl Default for ShippingSettings {
    fn default() -> Self {
        Self {
            regular: ShippingSetting::visible(Money::ZERO),
            free: ShippingSetting::default(),
            flat_jawa: ShippingSetting::default(),
            flat_bali: ShippingSetting::default(),
            flat_sumatra: ShippingSetting::default(),
        }
    }
}

impl ShippingSettings {
    pub fn get(&self, method: ShippingMethod) -> &ShippingSetting {
        match method {
            ShippingMethod::Regular => &self.regular,
            ShippingMethod::Free => &self.free,
            ShippingMethod::FlatJawa => &self.flat_jawa,
            ShippingMethod::FlatBali => &self.flat_bali,
            ShippingMethod::FlatSumatra => &self.flat_sumatra,
        }
    }

    pub fn get_mut(&mut self, method: ShippingMethod) -> &mut ShippingSetting {
        match method {
            ShippingMethod::Regular => &mut self.regular,
            ShippingMethod::Free => &mut self.free,
            ShippingMethod::FlatJawa => &mut self.flat_jawa,
            ShippingMethod::FlatBali => &mut self.flat_bali,
            ShippingMethod::FlatSumatra => &mut self.flat_sumatra,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ShippingMethod, &ShippingSetting)> + '_ {
        ShippingMethod::ALL.into_iter().map(move |m| (m, self.get(m)))
    }

    pub fn visible_methods(&self) -> Vec<ShippingMethod> {
        self.iter().filter(|(_, s)| s.visible).map(|(m, _)| m).collect()
    }
}
