//! Option axes and the per-combination rows owned by a form

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{AttributeKey, Attributes, Money};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStyle {
    #[default]
    Dropdown,
    Radio,
    Modern,
}

/// A named axis such as "Size" with its selectable values in display order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductOption {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub display_style: DisplayStyle,
}

impl ProductOption {
    pub fn new(id: u32, name: impl Into<String>, values: &[&str]) -> Self {
        Self {
            id,
            name: name.into(),
            values: values.iter().map(|v| v.to_string()).collect(),
            display_style: DisplayStyle::default(),
        }
    }
}

/// Operator-entered numbers of one combination. Everything except the selling
/// price is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Economics {
    pub selling_price: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strikethrough_price: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_price: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cs_commission: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adv_commission: Option<Money>,
    /// Grams.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<Decimal>,
}

impl Economics {
    pub fn priced(selling_price: Money) -> Self { Self { selling_price, ..Self::default() } }

    /// Name of the first money field holding a negative amount.
    pub fn negative_field(&self) -> Option<&'static str> {
        let fields = [
            ("sellingPrice", Some(self.selling_price)),
            ("strikethroughPrice", self.strikethrough_price),
            ("costPrice", self.cost_price),
            ("csCommission", self.cs_commission),
            ("advCommission", self.adv_commission),
        ];
        fields
            .into_iter()
            .find(|(_, value)| value.map_or(false, |m| m.is_negative()))
            .map(|(name, _)| name)
            .or_else(|| self.weight.filter(|w| w.is_sign_negative() && !w.is_zero()).map(|_| "weight"))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantCombination {
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(flatten)]
    pub economics: Economics,
}

impl VariantCombination {
    pub fn new(attributes: Attributes, economics: Economics) -> Self { Self { attributes, economics } }
    pub fn key(&self) -> AttributeKey { AttributeKey::from_attributes(&self.attributes) }
    pub fn selling_price(&self) -> Money { self.economics.selling_price }
}
