//! Domain events
use serde::Serialize;
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum DomainEvent {
    Form(FormEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormEvent {
    Created { form_id: String },
    OptionAdded { form_id: String, option_id: u32, name: String },
    OptionRenamed { form_id: String, option_id: u32, from: String, to: String },
    OptionValuesChanged { form_id: String, option_id: u32, values: usize },
    OptionRemoved { form_id: String, option_id: u32, name: String },
    OptionsReordered { form_id: String },
    MatrixSynchronized { form_id: String, combinations: usize },
    CombinationUpdated { form_id: String, signature: String },
    SettingsChanged { form_id: String, section: &'static str },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: String, form_id: String, total: Money },
    Completed { order_id: String, cs_agent_id: Option<String> },
}

impl OrderEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Placed { .. } => "storefront.orders.placed",
            Self::Completed { .. } => "storefront.orders.completed",
        }
    }
}
