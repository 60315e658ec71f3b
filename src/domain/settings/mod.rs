//! Per-form checkout, assignment and tracking settings
pub mod shipping;
pub mod payment;
pub mod assignment;
pub mod tracking;

pub use shipping::{ShippingMethod, ShippingSetting, ShippingSettings};
pub use payment::{BankAccount, BankTransferSetting, CodSetting, HandlingFeeBase, PaymentMethod, PaymentSettings, QrisSetting};
pub use assignment::{AssignmentMode, CsAssignmentSettings, RoundRobinAgent, ThankYouPage};
pub use tracking::{PageTracking, PixelConfig, Platform, PlatformActivation, PlatformTracking, TrackingPage, TrackingSettings};
