//! Aggregates module
pub mod variant;
pub mod form;
pub mod checkout;
pub mod order;

pub use variant::{DisplayStyle, Economics, ProductOption, VariantCombination};
pub use form::{Form, FormDraft, FormError, ValidationIssue};
pub use checkout::CheckoutSession;
pub use order::{Customer, Order, OrderError, OrderStatus};
