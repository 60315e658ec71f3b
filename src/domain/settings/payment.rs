//! Payment methods and their per-form settings

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentMethod {
    Cod,
    BankTransfer,
    Qris,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [PaymentMethod::Cod, PaymentMethod::BankTransfer, PaymentMethod::Qris];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Cod => "cod",
            Self::BankTransfer => "bankTransfer",
            Self::Qris => "qris",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.key()) }
}

/// What the COD handling fee percentage is applied to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlingFeeBase {
    #[default]
    Product,
    ProductAndShipping,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodSetting {
    pub visible: bool,
    pub order: i32,
    pub handling_fee_percentage: Decimal,
    pub handling_fee_base: HandlingFeeBase,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    #[validate(length(min = 1))]
    pub bank_name: String,
    #[validate(length(min = 1))]
    pub account_number: String,
    #[validate(length(min = 1))]
    pub account_holder: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct BankTransferSetting {
    pub visible: bool,
    pub order: i32,
    #[validate]
    pub accounts: Vec<BankAccount>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct QrisSetting {
    pub visible: bool,
    pub order: i32,
    #[validate(url)]
    pub qr_image_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentSettings {
    pub cod: CodSetting,
    pub bank_transfer: BankTransferSetting,
    pub qris: QrisSetting,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            cod: CodSetting { visible: true, order: 1, ..CodSetting::default() },
            bank_transfer: BankTransferSetting { order: 2, ..BankTransferSetting::default() },
            qris: QrisSetting { order: 3, ..QrisSetting::default() },
        }
    }
}

impl PaymentSettings {
    pub fn is_visible(&self, method: PaymentMethod) -> bool {
        match method {
            PaymentMethod::Cod => self.cod.visible,
            PaymentMethod::BankTransfer => self.bank_transfer.visible,
            PaymentMethod::Qris => self.qris.visible,
        }
    }

    pub fn order_of(&self, method: PaymentMethod) -> i32 {
        match method {
            PaymentMethod::Cod => self.cod.order,
            PaymentMethod::BankTransfer => self.bank_transfer.order,
            PaymentMethod::Qris => self.qris.order,
        }
    }

    /// Visible methods by ascending `order`; ties keep declaration order.
    pub fn visible_methods(&self) -> Vec<PaymentMethod> {
        let mut methods: Vec<PaymentMethod> =
            PaymentMethod::ALL.into_iter().filter(|m| self.is_visible(*m)).collect();
        methods.sort_by_key(|m| self.order_of(*m));
        methods
    }
}
