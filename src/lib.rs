//! Storefront Forms
//!
//! Order-taking storefront configurator: an operator defines a sellable
//! product (a form) with option axes, per-combination economics, shipping and
//! payment rules, and what happens after purchase.
//!
//! ## Features
//! - Variant matrix kept in sync with the option axes without losing prices
//! - Checkout pricing with flat and weight-rate shipping and COD surcharge
//! - Weighted round-robin assignment of orders to CS agents
//! - Deferred, cancellable conversion pixels for Meta, Google, TikTok and Snack

pub mod api;
pub mod config;
pub mod domain;
pub mod pixel;
pub mod store;

use thiserror::Error;

pub use domain::aggregates::{CheckoutSession, Form, FormError, Order, OrderError};
pub use domain::services::{compute_total, pick_agent, synchronize, PriceBreakdown, PriceQuote};
pub use pixel::PixelDispatcher;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Form not found")]
    FormNotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("Storage error: {0}")]
    Storage(#[from] store::StoreError),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
