//! Value Objects for storefront forms

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Mul};

/// Option name → selected value. Ordered by key so iteration is stable.
pub type Attributes = BTreeMap<String, String>;

/// Canonical signature of an attribute map.
///
/// Keys are sorted lexicographically and the map is JSON-encoded, so two maps
/// holding the same entries produce the same key no matter how they were built.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeKey(String);

impl AttributeKey {
    pub fn of<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let sorted: BTreeMap<&str, &str> = entries.into_iter().collect();
        // a map of plain strings always encodes
        Self(serde_json::to_string(&sorted).unwrap_or_default())
    }

    pub fn from_attributes(attributes: &Attributes) -> Self {
        Self::of(attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Money value object.
///
/// Amounts are Indonesian rupiah; the currency has no subunits in this domain,
/// so derived amounts are rounded to whole units with [`Money::whole`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self { Self(amount) }
    pub fn rupiah(amount: i64) -> Self { Self(Decimal::from(amount)) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_negative(&self) -> bool { self.0.is_sign_negative() && !self.0.is_zero() }

    /// `percentage` percent of this amount, e.g. `percent(5)` of 100 000 is 5 000.
    pub fn percent(&self, percentage: Decimal) -> Money {
        Money(self.0 * percentage / Decimal::ONE_HUNDRED)
    }

    pub fn whole(&self) -> Money {
        Money(self.0.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
    }

    pub fn to_f64(&self) -> f64 { self.0.to_f64().unwrap_or_default() }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money { Money(self.0 + rhs.0) }
}

impl Mul<Decimal> for Money {
    type Output = Money;
    fn mul(self, rhs: Decimal) -> Money { Money(self.0 * rhs) }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self { Self::rupiah(value) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Rp{}", self.0.normalize()) }
}
