//! Order Aggregate

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::checkout::CheckoutSession;
use crate::domain::aggregates::form::Form;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::services::distribution;
use crate::domain::services::pricing::{PriceBreakdown, PriceQuote};
use crate::domain::settings::{CsAssignmentSettings, PaymentMethod, ShippingMethod};
use crate::domain::value_objects::Attributes;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 6, max = 20))]
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus { #[default] Pending, Completed }

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: String,
    form_id: String,
    customer: Customer,
    attributes: Attributes,
    shipping_method: ShippingMethod,
    payment_method: PaymentMethod,
    breakdown: PriceBreakdown,
    status: OrderStatus,
    cs_agent_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl Order {
    /// Snapshot the session's selection and price. Fails when the selection
    /// does not price, which is exactly when the storefront disables submit.
    pub fn place(form: &Form, session: &CheckoutSession, customer: Customer) -> Result<Self, OrderError> {
        customer.validate().map_err(|e| OrderError::InvalidCustomer(e.to_string()))?;
        let shipping_method = session.shipping().ok_or(OrderError::MissingShippingMethod)?;
        let payment_method = session.payment().ok_or(OrderError::MissingPaymentMethod)?;
        let breakdown = match session.quote(form) {
            PriceQuote::Available(b) => b,
            PriceQuote::Unavailable => return Err(OrderError::SelectionUnavailable),
        };

        let id = Uuid::now_v7().to_string();
        let now = Utc::now();
        let mut order = Self {
            id: id.clone(), form_id: form.id().to_string(), customer,
            attributes: session.selections().clone(), shipping_method, payment_method, breakdown,
            status: OrderStatus::Pending, cs_agent_id: None, created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(OrderEvent::Placed { order_id: id, form_id: form.id().to_string(), total: breakdown.total });
        Ok(order)
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn form_id(&self) -> &str { &self.form_id }
    pub fn customer(&self) -> &Customer { &self.customer }
    pub fn attributes(&self) -> &Attributes { &self.attributes }
    pub fn breakdown(&self) -> &PriceBreakdown { &self.breakdown }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn cs_agent_id(&self) -> Option<&str> { self.cs_agent_id.as_deref() }

    /// Mark the order completed and hand it to a CS agent. An empty or
    /// misconfigured rotation leaves the order unassigned but still completes it.
    pub fn complete<R: Rng + ?Sized>(&mut self, assignment: &CsAssignmentSettings, rng: &mut R) -> Result<Option<&str>, OrderError> {
        if self.status == OrderStatus::Completed {
            return Err(OrderError::AlreadyCompleted);
        }
        self.cs_agent_id = distribution::pick_agent(assignment, rng);
        self.status = OrderStatus::Completed;
        self.touch();
        self.raise_event(OrderEvent::Completed { order_id: self.id.clone(), cs_agent_id: self.cs_agent_id.clone() });
        Ok(self.cs_agent_id.as_deref())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: OrderEvent) { self.events.push(DomainEvent::Order(e)); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("selected variant is not available")]
    SelectionUnavailable,
    #[error("no shipping method selected")]
    MissingShippingMethod,
    #[error("no payment method selected")]
    MissingPaymentMethod,
    #[error("invalid customer details: {0}")]
    InvalidCustomer(String),
    #[error("order already completed")]
    AlreadyCompleted,
}
