//! Handles onto the ad platforms' tracking SDKs.
//!
//! Each platform's script installs its handle once it has loaded. Nothing here
//! assumes a handle exists: the dispatcher looks each one up at fire time and
//! skips the platform when it is missing.

use serde_json::Value;
use std::sync::{Arc, RwLock};

/// `fbq(...)`
pub trait MetaPixel: Send + Sync {
    fn init(&self, pixel_id: &str);
    fn track(&self, event: &str, params: &Value);
    fn track_single(&self, pixel_id: &str, event: &str, params: &Value);
}

/// `gtag(...)`
pub trait GoogleTag: Send + Sync {
    fn config(&self, tag_id: &str);
    fn event(&self, event: &str, params: &Value);
}

/// `ttq.instance(id)`
pub trait TiktokPixel: Send + Sync {
    fn page(&self, pixel_id: &str);
    fn track(&self, pixel_id: &str, event: &str, params: &Value);
}

/// `snaptr(...)`
pub trait SnapPixel: Send + Sync {
    fn init(&self, pixel_id: &str);
    fn track(&self, event: &str, params: &Value);
}

#[derive(Default)]
struct Handles {
    meta: Option<Arc<dyn MetaPixel>>,
    google: Option<Arc<dyn GoogleTag>>,
    tiktok: Option<Arc<dyn TiktokPixel>>,
    snack: Option<Arc<dyn SnapPixel>>,
}

/// Shared, late-bound registry of the loaded SDKs for one page.
#[derive(Clone, Default)]
pub struct SdkRegistry {
    inner: Arc<RwLock<Handles>>,
}

impl SdkRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn install_meta(&self, sdk: Arc<dyn MetaPixel>) { self.write().meta = Some(sdk); }
    pub fn install_google(&self, sdk: Arc<dyn GoogleTag>) { self.write().google = Some(sdk); }
    pub fn install_tiktok(&self, sdk: Arc<dyn TiktokPixel>) { self.write().tiktok = Some(sdk); }
    pub fn install_snack(&self, sdk: Arc<dyn SnapPixel>) { self.write().snack = Some(sdk); }

    pub fn meta(&self) -> Option<Arc<dyn MetaPixel>> { self.read().meta.clone() }
    pub fn google(&self) -> Option<Arc<dyn GoogleTag>> { self.read().google.clone() }
    pub fn tiktok(&self) -> Option<Arc<dyn TiktokPixel>> { self.read().tiktok.clone() }
    pub fn snack(&self) -> Option<Arc<dyn SnapPixel>> { self.read().snack.clone() }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Handles> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Handles> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for SdkRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handles = self.read();
        f.debug_struct("SdkRegistry")
            .field("meta", &handles.meta.is_some())
            .field("google", &handles.google.is_some())
            .field("tiktok", &handles.tiktok.is_some())
            .field("snack", &handles.snack.is_some())
            .finish()
    }
}
