//! Conversion-pixel dispatch over Meta, Google, TikTok and Snack
pub mod sdk;
pub mod dispatcher;

pub use sdk::{GoogleTag, MetaPixel, SdkRegistry, SnapPixel, TiktokPixel};
pub use dispatcher::{DispatchContext, DispatchTiming, PixelDispatcher};
