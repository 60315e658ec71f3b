//! Deferred, cancellable firing of conversion pixels.
//!
//! A dispatch schedules one task per platform. Each task waits
//! [`DispatchTiming::platform_delay`] so the platform script can finish
//! loading, fires the base page-view calls, then fires the custom events of
//! its configs in order once [`DispatchTiming::event_delay`] has passed since
//! the task started. Platforms never wait on each other.
//!
//! Every new dispatch cancels the tasks of the previous one, and dropping the
//! dispatcher cancels whatever is still pending.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::domain::settings::{PixelConfig, Platform, PlatformActivation, TrackingPage};
use crate::domain::value_objects::Money;
use crate::pixel::sdk::SdkRegistry;

const PAGE_VIEW: &str = "PageView";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchTiming {
    pub platform_delay: Duration,
    pub event_delay: Duration,
}

impl Default for DispatchTiming {
    fn default() -> Self {
        Self { platform_delay: Duration::from_millis(300), event_delay: Duration::from_millis(600) }
    }
}

/// Runtime facts attached to every custom event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DispatchContext {
    pub page: TrackingPage,
    pub form_id: String,
    pub content_name: Option<String>,
    pub value: Option<Money>,
    pub currency: String,
    pub order_id: Option<String>,
}

impl DispatchContext {
    fn event_params(&self) -> Value {
        let mut params = Map::new();
        params.insert("page".into(), json!(self.page));
        if !self.form_id.is_empty() {
            params.insert("form_id".into(), json!(self.form_id));
        }
        if let Some(name) = &self.content_name {
            params.insert("content_name".into(), json!(name));
        }
        if let Some(value) = self.value {
            params.insert("value".into(), json!(value.to_f64()));
            params.insert("currency".into(), json!(self.currency));
        }
        if let Some(order_id) = &self.order_id {
            params.insert("order_id".into(), json!(order_id));
        }
        Value::Object(params)
    }
}

/// Fires pixels for one page session.
///
/// Owns the set of Meta pixel ids already initialised in this session, so a
/// pixel is initialised at most once however often the page re-dispatches.
#[derive(Debug)]
pub struct PixelDispatcher {
    sdk: SdkRegistry,
    timing: DispatchTiming,
    meta_initialized: Arc<Mutex<BTreeSet<String>>>,
    pending: HashMap<Platform, CancellationToken>,
}

impl PixelDispatcher {
    pub fn new(sdk: SdkRegistry, timing: DispatchTiming) -> Self {
        Self { sdk, timing, meta_initialized: Arc::default(), pending: HashMap::new() }
    }

    pub fn from_config(sdk: SdkRegistry, config: &AppConfig) -> Self { Self::new(sdk, config.pixel_timing) }

    /// Schedule firing for `configs`. Must be called inside a Tokio runtime.
    ///
    /// Platforms without a matching config, or switched off in `activation`,
    /// are not scheduled at all.
    pub fn dispatch(&mut self, configs: &[PixelConfig], activation: &PlatformActivation, context: &DispatchContext) {
        self.cancel_pending();

        for platform in Platform::ALL {
            if !activation.is_active(platform) {
                continue;
            }
            let matching: Vec<PixelConfig> = configs.iter().filter(|c| c.platform == platform).cloned().collect();
            if matching.is_empty() {
                continue;
            }

            let token = CancellationToken::new();
            self.pending.insert(platform, token.clone());
            let job = PlatformJob {
                platform,
                configs: matching,
                params: context.event_params(),
                sdk: self.sdk.clone(),
                meta_initialized: Arc::clone(&self.meta_initialized),
                timing: self.timing,
            };
            tokio::spawn(async move {
                let finished = tokio::select! {
                    _ = token.cancelled() => false,
                    _ = job.run() => true,
                };
                if finished {
                    token.cancel();
                } else {
                    tracing::debug!(%platform, "pixel dispatch cancelled");
                }
            });
        }
    }

    /// Cancel every task of the last dispatch that has not finished.
    pub fn cancel_pending(&mut self) {
        for (_, token) in self.pending.drain() {
            token.cancel();
        }
    }

    /// Platforms of the last dispatch that have not finished firing yet.
    /// A task cancels its own token when it completes.
    pub fn scheduled_platforms(&self) -> BTreeSet<Platform> {
        self.pending.iter().filter(|(_, token)| !token.is_cancelled()).map(|(platform, _)| *platform).collect()
    }

    pub fn initialized_meta_pixels(&self) -> BTreeSet<String> {
        self.meta_initialized.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl Drop for PixelDispatcher {
    fn drop(&mut self) { self.cancel_pending(); }
}

struct PlatformJob {
    platform: Platform,
    configs: Vec<PixelConfig>,
    params: Value,
    sdk: SdkRegistry,
    meta_initialized: Arc<Mutex<BTreeSet<String>>>,
    timing: DispatchTiming,
}

impl PlatformJob {
    async fn run(self) {
        let start = Instant::now();
        sleep_until(start + self.timing.platform_delay).await;
        if !self.fire_base() {
            tracing::warn!(platform = %self.platform, "tracking SDK not loaded, skipping platform");
            return;
        }
        sleep_until(start + self.timing.event_delay).await;
        if !self.fire_events() {
            tracing::warn!(platform = %self.platform, "tracking SDK disappeared before custom events");
        }
    }

    fn pixel_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.configs.iter().flat_map(|c| c.pixel_ids.iter().map(String::as_str))
    }

    /// Custom events in config order. Blank names and page views are skipped,
    /// the base phase already sent those.
    fn custom_events(&self) -> impl Iterator<Item = (&PixelConfig, &str)> + '_ {
        self.configs
            .iter()
            .map(|c| (c, c.event_name.as_str()))
            .filter(|(_, event)| !event.is_empty() && *event != PAGE_VIEW)
    }

    /// Page-view phase. `false` when the SDK is missing.
    fn fire_base(&self) -> bool {
        match self.platform {
            Platform::Meta => {
                let Some(fbq) = self.sdk.meta() else { return false };
                {
                    let mut initialized = self.meta_initialized.lock().unwrap_or_else(|p| p.into_inner());
                    for id in self.pixel_ids() {
                        if initialized.insert(id.to_string()) {
                            tracing::debug!(pixel_id = id, "fbq init");
                            fbq.init(id);
                        }
                    }
                }
                fbq.track(PAGE_VIEW, &json!({}));
            }
            Platform::Google => {
                let Some(gtag) = self.sdk.google() else { return false };
                for id in self.pixel_ids() {
                    gtag.config(id);
                }
            }
            Platform::Tiktok => {
                let Some(ttq) = self.sdk.tiktok() else { return false };
                for id in self.pixel_ids() {
                    ttq.page(id);
                }
            }
            Platform::Snack => {
                let Some(snaptr) = self.sdk.snack() else { return false };
                for id in self.pixel_ids() {
                    snaptr.init(id);
                }
                snaptr.track("PAGE_VIEW", &json!({}));
            }
        }
        true
    }

    fn fire_events(&self) -> bool {
        match self.platform {
            Platform::Meta => {
                let Some(fbq) = self.sdk.meta() else { return false };
                for (config, event) in self.custom_events() {
                    for id in &config.pixel_ids {
                        fbq.track_single(id, event, &self.params);
                    }
                }
            }
            Platform::Google => {
                let Some(gtag) = self.sdk.google() else { return false };
                for (config, event) in self.custom_events() {
                    for id in &config.pixel_ids {
                        let mut params = self.params.clone();
                        if let Value::Object(map) = &mut params {
                            map.insert("send_to".into(), json!(id));
                        }
                        gtag.event(event, &params);
                    }
                }
            }
            Platform::Tiktok => {
                let Some(ttq) = self.sdk.tiktok() else { return false };
                for (config, event) in self.custom_events() {
                    for id in &config.pixel_ids {
                        ttq.track(id, event, &self.params);
                    }
                }
            }
            Platform::Snack => {
                let Some(snaptr) = self.sdk.snack() else { return false };
                for (_, event) in self.custom_events() {
                    snaptr.track(event, &self.params);
                }
            }
        }
        tracing::debug!(platform = %self.platform, configs = self.configs.len(), "pixel events fired");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::sdk::{GoogleTag, MetaPixel, SnapPixel, TiktokPixel};

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn push(&self, call: String) { self.calls.lock().unwrap().push(call); }
        fn calls(&self) -> Vec<String> { self.calls.lock().unwrap().clone() }
        fn count(&self, call: &str) -> usize { self.calls().iter().filter(|c| *c == call).count() }
    }

    impl MetaPixel for Recorder {
        fn init(&self, pixel_id: &str) { self.push(format!("fbq init {pixel_id}")); }
        fn track(&self, event: &str, _: &Value) { self.push(format!("fbq track {event}")); }
        fn track_single(&self, pixel_id: &str, event: &str, _: &Value) {
            self.push(format!("fbq trackSingle {pixel_id} {event}"));
        }
    }

    impl GoogleTag for Recorder {
        fn config(&self, tag_id: &str) { self.push(format!("gtag config {tag_id}")); }
        fn event(&self, event: &str, params: &Value) {
            self.push(format!("gtag event {event} {}", params["send_to"].as_str().unwrap_or_default()));
        }
    }

    impl TiktokPixel for Recorder {
        fn page(&self, pixel_id: &str) { self.push(format!("ttq {pixel_id} page")); }
        fn track(&self, pixel_id: &str, event: &str, _: &Value) { self.push(format!("ttq {pixel_id} track {event}")); }
    }

    impl SnapPixel for Recorder {
        fn init(&self, pixel_id: &str) { self.push(format!("snaptr init {pixel_id}")); }
        fn track(&self, event: &str, _: &Value) { self.push(format!("snaptr track {event}")); }
    }

    fn all_sdks() -> (SdkRegistry, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let sdk = SdkRegistry::new();
        sdk.install_meta(recorder.clone());
        sdk.install_google(recorder.clone());
        sdk.install_tiktok(recorder.clone());
        sdk.install_snack(recorder.clone());
        (sdk, recorder)
    }

    async fn settle() { tokio::time::sleep(Duration::from_secs(2)).await; }

    #[tokio::test(start_paused = true)]
    async fn test_meta_pixel_initialised_once_per_session() {
        let (sdk, recorder) = all_sdks();
        let mut dispatcher = PixelDispatcher::new(sdk, DispatchTiming::default());
        let configs = vec![PixelConfig::new(Platform::Meta, &["111"], "Purchase")];
        let context = DispatchContext::default();

        dispatcher.dispatch(&configs, &PlatformActivation::default(), &context);
        settle().await;
        dispatcher.dispatch(&configs, &PlatformActivation::default(), &context);
        settle().await;

        assert_eq!(recorder.count("fbq init 111"), 1);
        assert_eq!(recorder.count("fbq track PageView"), 2);
        assert_eq!(recorder.count("fbq trackSingle 111 Purchase"), 2);
        assert_eq!(
            recorder.calls()[..3],
            ["fbq init 111".to_string(), "fbq track PageView".to_string(), "fbq trackSingle 111 Purchase".to_string()]
        );
        assert!(dispatcher.initialized_meta_pixels().contains("111"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_redispatch_cancels_stale_config() {
        let (sdk, recorder) = all_sdks();
        let mut dispatcher = PixelDispatcher::new(sdk, DispatchTiming::default());
        let activation = PlatformActivation::default();

        dispatcher.dispatch(&[PixelConfig::new(Platform::Meta, &["old"], "Lead")], &activation, &DispatchContext::default());
        tokio::time::sleep(Duration::from_millis(100)).await;
        dispatcher.dispatch(&[PixelConfig::new(Platform::Meta, &["new"], "Lead")], &activation, &DispatchContext::default());
        settle().await;

        assert!(recorder.calls().iter().all(|c| !c.contains("old")));
        assert_eq!(recorder.count("fbq init new"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_events_wait_for_event_delay() {
        let (sdk, recorder) = all_sdks();
        let mut dispatcher = PixelDispatcher::new(sdk, DispatchTiming::default());
        let configs = vec![
            PixelConfig::new(Platform::Tiktok, &["T1"], "ViewContent"),
            PixelConfig::new(Platform::Tiktok, &["T2"], "AddToCart"),
        ];
        dispatcher.dispatch(&configs, &PlatformActivation::default(), &DispatchContext::default());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(recorder.calls().is_empty());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(recorder.calls(), vec!["ttq T1 page", "ttq T2 page"]);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(
            recorder.calls(),
            vec!["ttq T1 page", "ttq T2 page", "ttq T1 track ViewContent", "ttq T2 track AddToCart"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_sdk_does_not_block_other_platforms() {
        let recorder = Arc::new(Recorder::default());
        let sdk = SdkRegistry::new();
        sdk.install_google(recorder.clone());
        let mut dispatcher = PixelDispatcher::new(sdk, DispatchTiming::default());
        let configs = vec![
            PixelConfig::new(Platform::Meta, &["111"], "Purchase"),
            PixelConfig::new(Platform::Google, &["AW-1"], "conversion"),
        ];
        dispatcher.dispatch(&configs, &PlatformActivation::default(), &DispatchContext::default());
        settle().await;

        assert_eq!(recorder.calls(), vec!["gtag config AW-1", "gtag event conversion AW-1"]);
        assert!(dispatcher.initialized_meta_pixels().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sdk_loaded_during_delay_is_used() {
        let recorder = Arc::new(Recorder::default());
        let sdk = SdkRegistry::new();
        let mut dispatcher = PixelDispatcher::new(sdk.clone(), DispatchTiming::default());
        dispatcher.dispatch(&[PixelConfig::new(Platform::Snack, &["S1"], "PURCHASE")], &PlatformActivation::default(), &DispatchContext::default());
        tokio::time::sleep(Duration::from_millis(100)).await;
        sdk.install_snack(recorder.clone());
        settle().await;

        assert_eq!(recorder.calls(), vec!["snaptr init S1", "snaptr track PAGE_VIEW", "snaptr track PURCHASE"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inactive_or_unconfigured_platforms_are_not_scheduled() {
        let (sdk, recorder) = all_sdks();
        let mut dispatcher = PixelDispatcher::new(sdk, DispatchTiming::default());
        let activation = PlatformActivation { google: false, ..PlatformActivation::default() };
        let configs = vec![
            PixelConfig::new(Platform::Google, &["AW-1"], "conversion"),
            PixelConfig::new(Platform::Snack, &["S1"], ""),
        ];
        dispatcher.dispatch(&configs, &activation, &DispatchContext::default());

        assert_eq!(dispatcher.scheduled_platforms(), BTreeSet::from([Platform::Snack]));
        settle().await;
        assert_eq!(recorder.calls(), vec!["snaptr init S1", "snaptr track PAGE_VIEW"]);
        assert!(dispatcher.scheduled_platforms().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_platforms_drop_as_they_finish() {
        let (sdk, _recorder) = all_sdks();
        let timing = DispatchTiming { platform_delay: Duration::from_millis(100), event_delay: Duration::from_millis(200) };
        let mut dispatcher = PixelDispatcher::new(sdk, timing);
        let configs = vec![PixelConfig::new(Platform::Meta, &["111"], "Lead"), PixelConfig::new(Platform::Google, &["AW-1"], "")];
        dispatcher.dispatch(&configs, &PlatformActivation::default(), &DispatchContext::default());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(dispatcher.scheduled_platforms(), BTreeSet::from([Platform::Meta, Platform::Google]));
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(dispatcher.scheduled_platforms().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatcher_uses_configured_timing() {
        let (sdk, recorder) = all_sdks();
        let mut config = AppConfig::from_lookup(|_: &str| -> Result<String, std::env::VarError> { Err(std::env::VarError::NotPresent) }).unwrap();
        config.pixel_timing = DispatchTiming { platform_delay: Duration::from_millis(1_000), event_delay: Duration::from_millis(1_500) };
        let mut dispatcher = PixelDispatcher::from_config(sdk, &config);
        dispatcher.dispatch(&[PixelConfig::new(Platform::Tiktok, &["T1"], "ViewContent")], &PlatformActivation::default(), &DispatchContext::default());

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert!(recorder.calls().is_empty());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(recorder.calls(), vec!["ttq T1 page"]);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(recorder.calls(), vec!["ttq T1 page", "ttq T1 track ViewContent"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_dispatch() {
        let (sdk, recorder) = all_sdks();
        let mut dispatcher = PixelDispatcher::new(sdk, DispatchTiming::default());
        dispatcher.dispatch(&[PixelConfig::new(Platform::Meta, &["111"], "Lead")], &PlatformActivation::default(), &DispatchContext::default());
        drop(dispatcher);
        settle().await;
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn test_event_params() {
        let context = DispatchContext {
            page: TrackingPage::ThankYouPage,
            form_id: "f-1".into(),
            value: Some(Money::rupiah(125_000)),
            currency: "IDR".into(),
            order_id: Some("o-1".into()),
            ..DispatchContext::default()
        };
        assert_eq!(
            context.event_params(),
            json!({ "page": "thankYouPage", "form_id": "f-1", "value": 125000.0, "currency": "IDR", "order_id": "o-1" })
        );
        assert_eq!(DispatchContext::default().event_params(), json!({ "page": "formPage" }));
    }
}
