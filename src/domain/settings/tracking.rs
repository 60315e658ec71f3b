//! Conversion-pixel settings per page and platform

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Meta,
    Google,
    Tiktok,
    Snack,
}

impl Platform {
    pub const ALL: [Platform; 4] = [Platform::Meta, Platform::Google, Platform::Tiktok, Platform::Snack];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Meta => "meta",
            Self::Google => "google",
            Self::Tiktok => "tiktok",
            Self::Snack => "snack",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.key()) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackingPage {
    #[default]
    FormPage,
    ThankYouPage,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformTracking {
    pub pixel_ids: BTreeSet<String>,
    pub event_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageTracking {
    pub meta: PlatformTracking,
    pub google: PlatformTracking,
    pub tiktok: PlatformTracking,
    pub snack: PlatformTracking,
}

impl PageTracking {
    pub fn get(&self, platform: Platform) -> &PlatformTracking {
        match platform {
            Platform::Meta => &self.meta,
            Platform::Google => &self.google,
            Platform::Tiktok => &self.tiktok,
            Platform::Snack => &self.snack,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackingSettings {
    pub form_page: PageTracking,
    pub thank_you_page: PageTracking,
}

impl TrackingSettings {
    pub fn page(&self, page: TrackingPage) -> &PageTracking {
        match page {
            TrackingPage::FormPage => &self.form_page,
            TrackingPage::ThankYouPage => &self.thank_you_page,
        }
    }

    /// Dispatcher input for `page`, in platform order. Blank ids are dropped and
    /// platforms left without ids produce no config.
    pub fn page_configs(&self, page: TrackingPage) -> Vec<PixelConfig> {
        let tracking = self.page(page);
        Platform::ALL
            .into_iter()
            .filter_map(|platform| {
                let entry = tracking.get(platform);
                let pixel_ids: Vec<String> = entry
                    .pixel_ids
                    .iter()
                    .map(|id| id.trim())
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect();
                if pixel_ids.is_empty() {
                    return None;
                }
                Some(PixelConfig { platform, pixel_ids, event_name: entry.event_name.trim().to_string() })
            })
            .collect()
    }
}

/// One platform's pixels and the custom event they fire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixelConfig {
    pub platform: Platform,
    pub pixel_ids: Vec<String>,
    pub event_name: String,
}

impl PixelConfig {
    pub fn new(platform: Platform, pixel_ids: &[&str], event_name: &str) -> Self {
        Self {
            platform,
            pixel_ids: pixel_ids.iter().map(|id| id.to_string()).collect(),
            event_name: event_name.to_string(),
        }
    }
}

/// Account-wide on/off switch per platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformActivation {
    pub meta: bool,
    pub google: bool,
    pub tiktok: bool,
    pub snack: bool,
}

impl Default for PlatformActivation {
    fn default() -> Self { Self { meta: true, google: true, tiktok: true, snack: true } }
}

impl PlatformActivation {
    pub fn is_active(&self, platform: Platform) -> bool {
        match platform {
            Platform::Meta => self.meta,
            Platform::Google => self.google,
            Platform::Tiktok => self.tiktok,
            Platform::Snack => self.snack,
        }
    }
}
