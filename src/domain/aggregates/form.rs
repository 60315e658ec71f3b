//! Form Aggregate
//!
//! A form is the operator's draft of one sellable product: its option axes,
//! the variant matrix derived from them, and every checkout and post-purchase
//! setting. Every edit goes through a method here so the matrix is rebuilt
//! right after the options change, and only written back when it differs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::variant::{DisplayStyle, Economics, ProductOption, VariantCombination};
use crate::domain::events::{DomainEvent, FormEvent};
use crate::domain::services::matrix;
use crate::domain::settings::{AssignmentMode, PaymentSettings, ShippingSettings, ThankYouPage, TrackingSettings};
use crate::domain::value_objects::{AttributeKey, Attributes};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    id: String,
    title: String,
    #[serde(default)]
    product_options: Vec<ProductOption>,
    #[serde(default)]
    variant_combinations: Vec<VariantCombination>,
    #[serde(default)]
    shipping_settings: ShippingSettings,
    #[serde(default)]
    payment_settings: PaymentSettings,
    #[serde(default)]
    thank_you_page: ThankYouPage,
    #[serde(default)]
    tracking_settings: TrackingSettings,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

/// Whole-form replacement sent by the editor on save.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct FormDraft {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub product_options: Vec<ProductOption>,
    pub variant_combinations: Vec<VariantCombination>,
    pub shipping_settings: ShippingSettings,
    pub payment_settings: PaymentSettings,
    pub thank_you_page: ThankYouPage,
    pub tracking_settings: TrackingSettings,
}

impl Form {
    pub fn create(title: impl Into<String>) -> Self {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now();
        let mut form = Self {
            id: id.clone(), title: title.into(), product_options: vec![],
            variant_combinations: matrix::synchronize(&[], &[]),
            shipping_settings: ShippingSettings::default(), payment_settings: PaymentSettings::default(),
            thank_you_page: ThankYouPage::default(), tracking_settings: TrackingSettings::default(),
            created_at: now, updated_at: now, events: vec![],
        };
        form.raise_event(FormEvent::Created { form_id: id });
        form
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn title(&self) -> &str { &self.title }
    pub fn product_options(&self) -> &[ProductOption] { &self.product_options }
    pub fn variant_combinations(&self) -> &[VariantCombination] { &self.variant_combinations }
    pub fn shipping_settings(&self) -> &ShippingSettings { &self.shipping_settings }
    pub fn payment_settings(&self) -> &PaymentSettings { &self.payment_settings }
    pub fn thank_you_page(&self) -> &ThankYouPage { &self.thank_you_page }
    pub fn tracking_settings(&self) -> &TrackingSettings { &self.tracking_settings }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn option(&self, option_id: u32) -> Option<&ProductOption> {
        self.product_options.iter().find(|o| o.id == option_id)
    }

    /// Row matching the shopper's selection exactly.
    pub fn find_combination(&self, selection: &Attributes) -> Option<&VariantCombination> {
        matrix::find_combination(&self.variant_combinations, selection)
    }

    pub fn add_option(&mut self, name: &str, values: Vec<String>, display_style: DisplayStyle) -> Result<u32, FormError> {
        let name = normalize_name(name)?;
        self.ensure_unique_name(&name, None)?;
        let values = normalize_values(&name, values)?;
        let id = self.product_options.iter().map(|o| o.id).max().map_or(1, |max| max + 1);
        self.product_options.push(ProductOption { id, name: name.clone(), values, display_style });
        self.raise_event(FormEvent::OptionAdded { form_id: self.id.clone(), option_id: id, name });
        self.synchronize_matrix();
        self.touch();
        Ok(id)
    }

    /// Rename an axis. Existing rows are re-keyed before the rebuild, so every
    /// price survives. Returns `false` when the name did not change.
    pub fn rename_option(&mut self, option_id: u32, name: &str) -> Result<bool, FormError> {
        let name = normalize_name(name)?;
        let idx = self.option_index(option_id)?;
        let from = self.product_options[idx].name.clone();
        if from == name {
            return Ok(false);
        }
        self.ensure_unique_name(&name, Some(option_id))?;

        matrix::rename_attribute(&mut self.variant_combinations, &from, &name);
        self.product_options[idx].name = name.clone();
        self.raise_event(FormEvent::OptionRenamed { form_id: self.id.clone(), option_id, from, to: name });
        self.synchronize_matrix();
        self.touch();
        Ok(true)
    }

    /// Replace the values of an axis. An empty list is accepted and leaves the
    /// matrix empty until values are added again; [`Form::validate_for_save`]
    /// reports it.
    pub fn set_option_values(&mut self, option_id: u32, values: Vec<String>) -> Result<bool, FormError> {
        let idx = self.option_index(option_id)?;
        let values = normalize_values(&self.product_options[idx].name, values)?;
        if self.product_options[idx].values == values {
            return Ok(false);
        }
        let count = values.len();
        self.product_options[idx].values = values;
        self.raise_event(FormEvent::OptionValuesChanged { form_id: self.id.clone(), option_id, values: count });
        self.synchronize_matrix();
        self.touch();
        Ok(true)
    }

    pub fn set_display_style(&mut self, option_id: u32, display_style: DisplayStyle) -> Result<(), FormError> {
        let idx = self.option_index(option_id)?;
        if self.product_options[idx].display_style != display_style {
            self.product_options[idx].display_style = display_style;
            self.touch();
        }
        Ok(())
    }

    /// Remove an axis. Rows that only differed on it collapse into the first one.
    pub fn remove_option(&mut self, option_id: u32) -> Result<ProductOption, FormError> {
        let idx = self.option_index(option_id)?;
        let removed = self.product_options.remove(idx);
        let rows = std::mem::take(&mut self.variant_combinations);
        self.variant_combinations = matrix::remove_attribute(rows, &removed.name);
        self.raise_event(FormEvent::OptionRemoved { form_id: self.id.clone(), option_id, name: removed.name.clone() });
        self.synchronize_matrix();
        self.touch();
        Ok(removed)
    }

    /// Move an axis to `position` (clamped). Row order follows the new axis order.
    pub fn move_option(&mut self, option_id: u32, position: usize) -> Result<(), FormError> {
        let idx = self.option_index(option_id)?;
        let position = position.min(self.product_options.len() - 1);
        if idx == position {
            return Ok(());
        }
        let option = self.product_options.remove(idx);
        self.product_options.insert(position, option);
        self.raise_event(FormEvent::OptionsReordered { form_id: self.id.clone() });
        self.synchronize_matrix();
        self.touch();
        Ok(())
    }

    pub fn update_combination(&mut self, attributes: &Attributes, economics: Economics) -> Result<(), FormError> {
        if let Some(field) = economics.negative_field() {
            return Err(FormError::NegativeAmount { field });
        }
        let key = AttributeKey::from_attributes(attributes);
        let combo = self
            .variant_combinations
            .iter_mut()
            .find(|c| c.key() == key)
            .ok_or_else(|| FormError::CombinationNotFound(key.to_string()))?;
        if combo.economics != economics {
            combo.economics = economics;
            self.raise_event(FormEvent::CombinationUpdated { form_id: self.id.clone(), signature: key.to_string() });
            self.touch();
        }
        Ok(())
    }

    /// Copy one set of economics onto every row.
    pub fn apply_to_all_combinations(&mut self, economics: Economics) -> Result<(), FormError> {
        if let Some(field) = economics.negative_field() {
            return Err(FormError::NegativeAmount { field });
        }
        for combo in self.variant_combinations.iter_mut() {
            combo.economics = economics.clone();
        }
        self.touch();
        Ok(())
    }

    pub fn set_title(&mut self, title: impl Into<String>) { self.title = title.into(); self.touch(); }

    pub fn set_shipping_settings(&mut self, settings: ShippingSettings) {
        if self.shipping_settings != settings {
            self.shipping_settings = settings;
            self.settings_changed("shippingSettings");
        }
    }

    pub fn set_payment_settings(&mut self, settings: PaymentSettings) {
        if self.payment_settings != settings {
            self.payment_settings = settings;
            self.settings_changed("paymentSettings");
        }
    }

    pub fn set_thank_you_page(&mut self, page: ThankYouPage) {
        if self.thank_you_page != page {
            self.thank_you_page = page;
            self.settings_changed("thankYouPage");
        }
    }

    pub fn set_tracking_settings(&mut self, settings: TrackingSettings) {
        if self.tracking_settings != settings {
            self.tracking_settings = settings;
            self.settings_changed("trackingSettings");
        }
    }

    /// Replace the whole draft with what the editor sent.
    ///
    /// Options that kept their id but changed name have the old attribute key
    /// re-keyed in the submitted rows first, so a rename made client-side does
    /// not reset prices either.
    pub fn apply_draft(&mut self, draft: FormDraft) -> Result<(), FormError> {
        draft.validate().map_err(|e| FormError::Invalid(vec![ValidationIssue::Draft(e.to_string())]))?;

        let mut options = Vec::with_capacity(draft.product_options.len());
        let mut names = HashSet::new();
        for option in draft.product_options {
            let name = normalize_name(&option.name)?;
            if !names.insert(name.clone()) {
                return Err(FormError::DuplicateOptionName(name));
            }
            let values = normalize_values(&name, option.values)?;
            options.push(ProductOption { id: option.id, name, values, display_style: option.display_style });
        }

        let mut rows = draft.variant_combinations;
        let renames: HashMap<&str, &str> = options
            .iter()
            .filter_map(|o| self.option(o.id).filter(|old| old.name != o.name).map(|old| (old.name.as_str(), o.name.as_str())))
            .collect();
        if !renames.is_empty() {
            for row in rows.iter_mut().filter(|r| keyed_by_previous_names(&r.attributes, &self.product_options, &options)) {
                row.attributes = matrix::rekey(&row.attributes, &renames);
            }
        }
        if let Some((combo, field)) = rows.iter().find_map(|r| r.economics.negative_field().map(|f| (r, f))) {
            tracing::debug!(signature = %combo.key(), field, "rejecting draft with negative amount");
            return Err(FormError::NegativeAmount { field });
        }

        self.title = draft.title;
        self.product_options = options;
        self.variant_combinations = rows;
        self.synchronize_matrix();
        self.set_shipping_settings(draft.shipping_settings);
        self.set_payment_settings(draft.payment_settings);
        self.set_thank_you_page(draft.thank_you_page);
        self.set_tracking_settings(draft.tracking_settings);
        self.touch();
        Ok(())
    }

    /// Every reason the form cannot be saved or sold yet.
    pub fn validation_issues(&self) -> Vec<ValidationIssue> {
        let mut issues = vec![];
        if self.title.trim().is_empty() {
            issues.push(ValidationIssue::EmptyTitle);
        }
        for option in self.product_options.iter().filter(|o| o.values.is_empty()) {
            issues.push(ValidationIssue::OptionWithoutValues { option: option.name.clone() });
        }
        if self.variant_combinations.is_empty() {
            issues.push(ValidationIssue::EmptyMatrix);
        }
        for combo in &self.variant_combinations {
            if let Some(field) = combo.economics.negative_field() {
                issues.push(ValidationIssue::NegativeAmount { signature: combo.key().to_string(), field });
            }
        }

        if self.shipping_settings.visible_methods().is_empty() {
            issues.push(ValidationIssue::NoVisibleShipping);
        }
        let payment = &self.payment_settings;
        if payment.visible_methods().is_empty() {
            issues.push(ValidationIssue::NoVisiblePayment);
        }
        if payment.cod.visible {
            let pct = payment.cod.handling_fee_percentage;
            if pct < rust_decimal::Decimal::ZERO || pct > rust_decimal::Decimal::ONE_HUNDRED {
                issues.push(ValidationIssue::CodPercentageOutOfRange);
            }
        }
        if payment.bank_transfer.visible
            && (payment.bank_transfer.accounts.is_empty() || payment.bank_transfer.validate().is_err())
        {
            issues.push(ValidationIssue::BankTransferWithoutAccounts);
        }
        if payment.qris.visible && payment.qris.validate().is_err() {
            issues.push(ValidationIssue::QrisWithoutImage);
        }

        let cs = &self.thank_you_page.cs_assignment;
        if cs.mode == AssignmentMode::RoundRobin && cs.round_robin_agents.iter().all(|a| a.percentage == 0) {
            issues.push(ValidationIssue::EmptyRoundRobin);
        }
        issues
    }

    pub fn validate_for_save(&self) -> Result<(), FormError> {
        let issues = self.validation_issues();
        if issues.is_empty() { Ok(()) } else { Err(FormError::Invalid(issues)) }
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    /// Rebuild the matrix from the current options; writes only on change.
    fn synchronize_matrix(&mut self) -> bool {
        let next = matrix::synchronize(&self.product_options, &self.variant_combinations);
        if next == self.variant_combinations {
            return false;
        }
        let combinations = next.len();
        self.variant_combinations = next;
        self.raise_event(FormEvent::MatrixSynchronized { form_id: self.id.clone(), combinations });
        true
    }

    fn option_index(&self, option_id: u32) -> Result<usize, FormError> {
        self.product_options.iter().position(|o| o.id == option_id).ok_or(FormError::OptionNotFound(option_id))
    }

    fn ensure_unique_name(&self, name: &str, except: Option<u32>) -> Result<(), FormError> {
        let taken = self.product_options.iter().any(|o| o.name == name && Some(o.id) != except);
        if taken { Err(FormError::DuplicateOptionName(name.to_string())) } else { Ok(()) }
    }

    fn settings_changed(&mut self, section: &'static str) {
        self.raise_event(FormEvent::SettingsChanged { form_id: self.id.clone(), section });
        self.touch();
    }

    fn raise_event(&mut self, e: FormEvent) { self.events.push(DomainEvent::Form(e)); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

fn fits(attributes: &Attributes, options: &[ProductOption]) -> bool {
    attributes.iter().all(|(k, v)| options.iter().any(|o| &o.name == k && o.values.contains(v)))
}

/// Whether a submitted row still uses the stored option names. Rows matching
/// the stored options but not the submitted ones were sent before the rename;
/// rows matching neither are judged by their keys alone.
fn keyed_by_previous_names(attributes: &Attributes, previous: &[ProductOption], next: &[ProductOption]) -> bool {
    match (fits(attributes, previous), fits(attributes, next)) {
        (true, false) => true,
        (false, false) => {
            let named = |options: &[ProductOption], key: &String| options.iter().any(|o| &o.name == key);
            attributes.keys().all(|k| named(previous, k)) && !attributes.keys().all(|k| named(next, k))
        }
        _ => false,
    }
}

fn normalize_name(name: &str) -> Result<String, FormError> {
    let name = name.trim();
    if name.is_empty() { Err(FormError::EmptyOptionName) } else { Ok(name.to_string()) }
}

fn normalize_values(option: &str, values: Vec<String>) -> Result<Vec<String>, FormError> {
    let mut seen = HashSet::with_capacity(values.len());
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim().to_string();
        if value.is_empty() {
            return Err(FormError::EmptyOptionValue { option: option.to_string() });
        }
        if !seen.insert(value.clone()) {
            return Err(FormError::DuplicateOptionValue { option: option.to_string(), value });
        }
        out.push(value);
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("form title is empty")]
    EmptyTitle,
    #[error("option \"{option}\" has no values")]
    OptionWithoutValues { option: String },
    #[error("variant matrix is empty")]
    EmptyMatrix,
    #[error("combination {signature} has a negative {field}")]
    NegativeAmount { signature: String, field: &'static str },
    #[error("no shipping method is visible")]
    NoVisibleShipping,
    #[error("no payment method is visible")]
    NoVisiblePayment,
    #[error("COD handling fee must be between 0 and 100 percent")]
    CodPercentageOutOfRange,
    #[error("bank transfer is visible without a complete bank account")]
    BankTransferWithoutAccounts,
    #[error("QRIS is visible without a valid QR image URL")]
    QrisWithoutImage,
    #[error("round-robin CS assignment has no weighted agent")]
    EmptyRoundRobin,
    #[error("{0}")]
    Draft(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("option name must not be empty")]
    EmptyOptionName,
    #[error("option \"{0}\" already exists")]
    DuplicateOptionName(String),
    #[error("option \"{option}\" has an empty value")]
    EmptyOptionValue { option: String },
    #[error("option \"{option}\" lists \"{value}\" twice")]
    DuplicateOptionValue { option: String, value: String },
    #[error("option {0} not found")]
    OptionNotFound(u32),
    #[error("no combination matches {0}")]
    CombinationNotFound(String),
    #[error("{field} must not be negative")]
    NegativeAmount { field: &'static str },
    #[error("form is not ready to save: {}", join_issues(.0))]
    Invalid(Vec<ValidationIssue>),
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}
