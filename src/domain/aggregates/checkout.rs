//! Shopper-side checkout state for one form

use serde::{Deserialize, Serialize};

use crate::domain::aggregates::form::Form;
use crate::domain::aggregates::variant::VariantCombination;
use crate::domain::services::pricing::{self, PriceQuote};
use crate::domain::settings::{PaymentMethod, ShippingMethod};
use crate::domain::value_objects::Attributes;

/// What the shopper picked on the storefront.
///
/// [`CheckoutSession::refresh`] must run whenever the form changes; it fills in
/// missing option values and re-applies the default-method rule. Until then a
/// stale selection simply prices as [`PriceQuote::Unavailable`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckoutSession {
    selections: Attributes,
    shipping: Option<ShippingMethod>,
    payment: Option<PaymentMethod>,
}

impl CheckoutSession {
    pub fn for_form(form: &Form) -> Self {
        let mut session = Self::default();
        session.refresh(form);
        session
    }

    /// Session built from a submitted selection.
    ///
    /// Options the shopper left out get their first value and unset or hidden
    /// methods get the default, but submitted values are kept as sent. A value
    /// the form no longer offers therefore quotes as unavailable instead of
    /// silently pricing another variant.
    pub fn with_choices(
        form: &Form,
        mut selections: Attributes,
        shipping: Option<ShippingMethod>,
        payment: Option<PaymentMethod>,
    ) -> Self {
        for option in form.product_options() {
            if selections.contains_key(&option.name) {
                continue;
            }
            if let Some(first) = option.values.first() {
                selections.insert(option.name.clone(), first.clone());
            }
        }
        Self {
            selections,
            shipping: pricing::default_shipping(form.shipping_settings(), shipping),
            payment: pricing::default_payment(form.payment_settings(), payment),
        }
    }

    pub fn selections(&self) -> &Attributes { &self.selections }
    pub fn shipping(&self) -> Option<ShippingMethod> { self.shipping }
    pub fn payment(&self) -> Option<PaymentMethod> { self.payment }

    pub fn select_option(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.selections.insert(name.into(), value.into());
    }

    pub fn select_shipping(&mut self, method: ShippingMethod) { self.shipping = Some(method); }
    pub fn select_payment(&mut self, method: PaymentMethod) { self.payment = Some(method); }

    /// Reconcile with the current form. Returns `true` when anything changed.
    ///
    /// Selections for removed options are dropped, options with no valid
    /// selection get their first value, and hidden or unset methods fall back
    /// to the first visible one by display order.
    pub fn refresh(&mut self, form: &Form) -> bool {
        let mut selections = Attributes::new();
        for option in form.product_options() {
            let chosen = self
                .selections
                .get(&option.name)
                .filter(|v| option.values.contains(v))
                .or_else(|| option.values.first());
            if let Some(value) = chosen {
                selections.insert(option.name.clone(), value.clone());
            }
        }
        let shipping = pricing::default_shipping(form.shipping_settings(), self.shipping);
        let payment = pricing::default_payment(form.payment_settings(), self.payment);

        let changed = selections != self.selections || shipping != self.shipping || payment != self.payment;
        self.selections = selections;
        self.shipping = shipping;
        self.payment = payment;
        changed
    }

    pub fn combination<'a>(&self, form: &'a Form) -> Option<&'a VariantCombination> {
        form.find_combination(&self.selections)
    }

    pub fn quote(&self, form: &Form) -> PriceQuote {
        let (Some(shipping), Some(payment)) = (self.shipping, self.payment) else {
            return PriceQuote::Unavailable;
        };
        pricing::compute_total(
            self.combination(form),
            shipping,
            payment,
            form.shipping_settings(),
            form.payment_settings(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::variant::{DisplayStyle, Economics};
    use crate::domain::settings::ShippingSetting;
    use crate::domain::value_objects::Money;

    fn form() -> (Form, u32) {
        let mut form = Form::create("Sepatu");
        form.add_option("Color", vec!["Red".into(), "Blue".into()], DisplayStyle::Modern).unwrap();
        let size = form.add_option("Size", vec!["40".into(), "41".into()], DisplayStyle::Dropdown).unwrap();
        let rows: Vec<Attributes> = form.variant_combinations().iter().map(|c| c.attributes.clone()).collect();
        for row in rows {
            form.update_combination(&row, Economics::priced(Money::rupiah(250_000))).unwrap();
        }
        (form, size)
    }

    #[test]
    fn test_defaults_to_first_values_and_methods() {
        let (form, _) = form();
        let session = CheckoutSession::for_form(&form);
        assert_eq!(session.selections().get("Color").map(String::as_str), Some("Red"));
        assert_eq!(session.selections().get("Size").map(String::as_str), Some("40"));
        assert_eq!(session.shipping(), Some(ShippingMethod::Regular));
        assert_eq!(session.payment(), Some(PaymentMethod::Cod));
        assert_eq!(session.quote(&form).breakdown().unwrap().total, Money::rupiah(250_000));
    }

    #[test]
    fn test_stale_selection_is_unavailable_until_refresh() {
        let (mut form, size) = form();
        let mut session = CheckoutSession::for_form(&form);
        form.remove_option(size).unwrap();

        assert_eq!(session.quote(&form), PriceQuote::Unavailable);
        assert!(session.refresh(&form));
        assert!(session.quote(&form).is_available());
        assert!(!session.refresh(&form));
    }

    #[test]
    fn test_hidden_method_falls_back_reactively() {
        let (mut form, _) = form();
        let mut session = CheckoutSession::for_form(&form);
        session.select_shipping(ShippingMethod::Regular);

        let mut shipping = form.shipping_settings().clone();
        shipping.regular.visible = false;
        shipping.flat_bali = ShippingSetting::visible(Money::rupiah(30_000));
        form.set_shipping_settings(shipping);

        assert!(session.refresh(&form));
        assert_eq!(session.shipping(), Some(ShippingMethod::FlatBali));
        assert_eq!(session.quote(&form).breakdown().unwrap().shipping_cost, Money::rupiah(30_000));
    }

    #[test]
    fn test_submitted_choices_keep_unknown_values() {
        let (form, _) = form();
        let mut selections = Attributes::new();
        selections.insert("Color".into(), "Green".into());
        selections.insert("Size".into(), "41".into());
        let session = CheckoutSession::with_choices(&form, selections, None, None);
        assert_eq!(session.selections().get("Color").map(String::as_str), Some("Green"));
        assert_eq!(session.shipping(), Some(ShippingMethod::Regular));
        assert_eq!(session.quote(&form), PriceQuote::Unavailable);
    }

    #[test]
    fn test_submitted_choices_fill_missing_options_only() {
        let (form, _) = form();
        let mut selections = Attributes::new();
        selections.insert("Size".into(), "41".into());
        let session = CheckoutSession::with_choices(&form, selections, Some(ShippingMethod::FlatBali), None);
        assert_eq!(session.selections().get("Color").map(String::as_str), Some("Red"));
        assert_eq!(session.selections().get("Size").map(String::as_str), Some("41"));
        assert_eq!(session.shipping(), Some(ShippingMethod::Regular));
        assert!(session.quote(&form).is_available());
    }

    #[test]
    fn test_submitted_choice_for_removed_option_is_unavailable() {
        let (mut form, size) = form();
        form.remove_option(size).unwrap();
        let mut selections = Attributes::new();
        selections.insert("Color".into(), "Red".into());
        selections.insert("Size".into(), "40".into());
        let session = CheckoutSession::with_choices(&form, selections, None, None);
        assert_eq!(session.quote(&form), PriceQuote::Unavailable);
    }
}
