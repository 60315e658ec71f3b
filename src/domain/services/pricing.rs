//! Checkout price calculation

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::variant::VariantCombination;
use crate::domain::settings::{HandlingFeeBase, PaymentMethod, PaymentSettings, ShippingMethod, ShippingSettings};
use crate::domain::value_objects::Money;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub surcharge: Money,
    pub total: Money,
}

/// Result of pricing a shopper's selection. `Unavailable` disables checkout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PriceQuote {
    Available(PriceBreakdown),
    Unavailable,
}

impl PriceQuote {
    pub fn breakdown(&self) -> Option<&PriceBreakdown> {
        match self {
            Self::Available(b) => Some(b),
            Self::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool { matches!(self, Self::Available(_)) }
}

pub fn compute_total(
    combo: Option<&VariantCombination>,
    shipping: ShippingMethod,
    payment: PaymentMethod,
    shipping_settings: &ShippingSettings,
    payment_settings: &PaymentSettings,
) -> PriceQuote {
    let Some(combo) = combo else {
        return PriceQuote::Unavailable;
    };
    let subtotal = combo.selling_price();
    let shipping_cost = shipping_cost(combo, shipping, shipping_settings);
    let surcharge = surcharge(subtotal, shipping_cost, payment, payment_settings);
    PriceQuote::Available(PriceBreakdown { subtotal, shipping_cost, surcharge, total: subtotal + shipping_cost + surcharge })
}

/// Weight-rate methods charge per started kilogram; a row without a positive
/// weight is charged as exactly one kilogram. Flat methods charge their cost
/// when visible and nothing otherwise.
pub fn shipping_cost(combo: &VariantCombination, method: ShippingMethod, settings: &ShippingSettings) -> Money {
    let setting = settings.get(method);
    if method.is_weight_rate() {
        let per_kg = setting.cost;
        match combo.economics.weight.filter(|grams| *grams > Decimal::ZERO) {
            Some(grams) => per_kg * (grams / Decimal::ONE_THOUSAND).ceil(),
            None => per_kg,
        }
    } else if setting.visible {
        setting.cost
    } else {
        Money::ZERO
    }
}

/// COD handling fee; every other method is free of charge.
pub fn surcharge(subtotal: Money, shipping_cost: Money, payment: PaymentMethod, settings: &PaymentSettings) -> Money {
    if payment != PaymentMethod::Cod {
        return Money::ZERO;
    }
    let cod = &settings.cod;
    let base = match cod.handling_fee_base {
        HandlingFeeBase::Product => subtotal,
        HandlingFeeBase::ProductAndShipping => subtotal + shipping_cost,
    };
    base.percent(cod.handling_fee_percentage).whole()
}

/// Keep `current` while it is visible, else fall back to the first visible
/// shipping method in declaration order.
pub fn default_shipping(settings: &ShippingSettings, current: Option<ShippingMethod>) -> Option<ShippingMethod> {
    current
        .filter(|m| settings.get(*m).visible)
        .or_else(|| settings.visible_methods().into_iter().next())
}

/// Keep `current` while it is visible, else fall back to the visible payment
/// method with the lowest `order`.
pub fn default_payment(settings: &PaymentSettings, current: Option<PaymentMethod>) -> Option<PaymentMethod> {
    current
        .filter(|m| settings.is_visible(*m))
        .or_else(|| settings.visible_methods().into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::variant::Economics;
    use crate::domain::settings::ShippingSetting;
    use crate::domain::value_objects::Attributes;

    fn combo(price: i64, weight: Option<i64>) -> VariantCombination {
        let mut economics = Economics::priced(Money::rupiah(price));
        economics.weight = weight.map(Decimal::from);
        VariantCombination::new(Attributes::new(), economics)
    }

    fn jawa_at(per_kg: i64) -> ShippingSettings {
        let mut settings = ShippingSettings::default();
        settings.flat_jawa = ShippingSetting::visible(Money::rupiah(per_kg));
        settings
    }

    #[test]
    fn test_weight_tier_rounding() {
        let settings = jawa_at(20_000);
        assert_eq!(shipping_cost(&combo(0, Some(1_200)), ShippingMethod::FlatJawa, &settings), Money::rupiah(40_000));
        assert_eq!(shipping_cost(&combo(0, Some(1_000)), ShippingMethod::FlatJawa, &settings), Money::rupiah(20_000));
        assert_eq!(shipping_cost(&combo(0, None), ShippingMethod::FlatJawa, &settings), Money::rupiah(20_000));
        assert_eq!(shipping_cost(&combo(0, Some(0)), ShippingMethod::FlatJawa, &settings), Money::rupiah(20_000));
        assert_eq!(shipping_cost(&combo(0, Some(1)), ShippingMethod::FlatJawa, &settings), Money::rupiah(20_000));
    }

    #[test]
    fn test_flat_shipping_respects_visibility() {
        let mut settings = ShippingSettings::default();
        settings.regular = ShippingSetting::visible(Money::rupiah(15_000));
        assert_eq!(shipping_cost(&combo(0, Some(5_000)), ShippingMethod::Regular, &settings), Money::rupiah(15_000));
        settings.regular.visible = false;
        assert_eq!(shipping_cost(&combo(0, None), ShippingMethod::Regular, &settings), Money::ZERO);
    }

    #[test]
    fn test_cod_base_switch() {
        let shipping = ShippingSettings { regular: ShippingSetting::visible(Money::rupiah(20_000)), ..ShippingSettings::default() };
        let mut payment = PaymentSettings::default();
        payment.cod.handling_fee_percentage = Decimal::from(5);

        let quote = compute_total(Some(&combo(100_000, None)), ShippingMethod::Regular, PaymentMethod::Cod, &shipping, &payment);
        assert_eq!(
            quote,
            PriceQuote::Available(PriceBreakdown {
                subtotal: Money::rupiah(100_000),
                shipping_cost: Money::rupiah(20_000),
                surcharge: Money::rupiah(5_000),
                total: Money::rupiah(125_000),
            })
        );

        payment.cod.handling_fee_base = HandlingFeeBase::ProductAndShipping;
        let quote = compute_total(Some(&combo(100_000, None)), ShippingMethod::Regular, PaymentMethod::Cod, &shipping, &payment);
        let breakdown = quote.breakdown().unwrap();
        assert_eq!(breakdown.surcharge, Money::rupiah(6_000));
        assert_eq!(breakdown.total, Money::rupiah(126_000));
    }

    #[test]
    fn test_no_surcharge_outside_cod() {
        let mut payment = PaymentSettings::default();
        payment.cod.handling_fee_percentage = Decimal::from(5);
        let quote = compute_total(Some(&combo(100_000, None)), ShippingMethod::Free, PaymentMethod::BankTransfer, &ShippingSettings::default(), &payment);
        assert_eq!(quote.breakdown().unwrap().surcharge, Money::ZERO);
        assert_eq!(quote.breakdown().unwrap().total, Money::rupiah(100_000));
    }

    #[test]
    fn test_missing_combination_is_unavailable() {
        let quote = compute_total(None, ShippingMethod::Regular, PaymentMethod::Cod, &ShippingSettings::default(), &PaymentSettings::default());
        assert_eq!(quote, PriceQuote::Unavailable);
        assert_eq!(serde_json::to_value(quote).unwrap(), serde_json::json!({ "status": "unavailable" }));
    }

    #[test]
    fn test_default_shipping_falls_back_to_first_visible() {
        let mut settings = jawa_at(10_000);
        settings.regular.visible = false;
        assert_eq!(default_shipping(&settings, Some(ShippingMethod::Regular)), Some(ShippingMethod::FlatJawa));
        settings.free.visible = true;
        assert_eq!(default_shipping(&settings, None), Some(ShippingMethod::Free));
        assert_eq!(default_shipping(&settings, Some(ShippingMethod::FlatJawa)), Some(ShippingMethod::FlatJawa));
        settings.free.visible = false;
        settings.flat_jawa.visible = false;
        assert_eq!(default_shipping(&settings, Some(ShippingMethod::FlatJawa)), None);
    }

    #[test]
    fn test_default_payment_uses_order() {
        let mut settings = PaymentSettings::default();
        settings.qris.visible = true;
        settings.qris.order = 0;
        assert_eq!(default_payment(&settings, None), Some(PaymentMethod::Qris));
        assert_eq!(default_payment(&settings, Some(PaymentMethod::Cod)), Some(PaymentMethod::Cod));
        settings.cod.visible = false;
        assert_eq!(default_payment(&settings, Some(PaymentMethod::Cod)), Some(PaymentMethod::Qris));
    }
}
