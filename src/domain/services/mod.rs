//! Pure domain services: matrix rebuild, checkout pricing, CS distribution
pub mod matrix;
pub mod pricing;
pub mod distribution;

pub use matrix::{find_combination, rekey, remove_attribute, rename_attribute, synchronize};
pub use pricing::{compute_total, default_payment, default_shipping, PriceBreakdown, PriceQuote};
pub use distribution::{pick_agent, weighted_pick};
