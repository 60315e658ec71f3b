//! Storefront domain: forms, checkout, orders and the services behind them
pub mod value_objects;
pub mod settings;
pub mod aggregates;
pub mod services;
pub mod events;
