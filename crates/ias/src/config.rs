use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ias_catalog::StateStore;
use ias_net::NetOptions;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use url::Url;

use crate::store::AppStore;

/// Device package scan, normally backed by a platform bridge. The
/// default scanner reports nothing installed, which only disables the
/// skip-installed-apps preference.
pub trait InstalledAppScanner: Send + Sync {
    fn installed_packages(&self, filter_prefixes: &[String]) -> Vec<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoInstalledApps;

impl InstalledAppScanner for NoInstalledApps {
    fn installed_packages(&self, _filter_prefixes: &[String]) -> Vec<String> {
        Vec::new()
    }
}

/// Telemetry sink for fetch/decode failures and impression/click
/// counting. The default just forwards into `tracing`.
pub trait AnalyticsLogger: Send + Sync {
    fn log_error(&self, message: &str);
    fn log_event(&self, category: &str, label: &str, value: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnalytics;

impl AnalyticsLogger for TracingAnalytics {
    fn log_error(&self, message: &str) {
        error!(message, "ias: analytics error");
    }

    fn log_event(&self, category: &str, label: &str, value: &str) {
        info!(category, label, value, "ias: analytics event");
    }
}

/// Configuration for the advert engine.
///
/// Used with `IasService::new(config)`.
#[derive(Clone)]
pub struct IasConfig {
    /// Telemetry sink (defaults to `TracingAnalytics`).
    pub analytics: Arc<dyn AnalyticsLogger>,
    /// Slots never refreshed or downloaded.
    pub blacklisted_slots: Vec<u32>,
    /// Host application's own bundle identifier.
    pub bundle_id: String,
    /// Directory for downloaded advert images.
    pub cache_dir: PathBuf,
    /// Cancellation token for graceful shutdown.
    pub cancel: Option<CancellationToken>,
    /// Capacity of the events broadcast channel.
    pub events_channel_capacity: usize,
    pub log_clicks: bool,
    pub log_impressions: bool,
    /// Overrides the store-derived manifest URL (mainly for tests and
    /// staging servers).
    pub manifest_url: Option<Url>,
    /// Network configuration.
    pub net: NetOptions,
    /// Prefixes handed to the installed-package scan.
    pub package_filters: Vec<String>,
    /// Delay between the last save request and the actual disk write.
    pub save_debounce: Duration,
    /// Per-slot preload window: how many adverts beyond the active one
    /// stay downloaded. Defaults to 3 for slot 1 (backscreen grids) and
    /// 0 for slot 2.
    pub slot_windows: HashMap<u32, usize>,
    /// Device package scanner (defaults to `NoInstalledApps`).
    pub scanner: Arc<dyn InstalledAppScanner>,
    /// Directory holding the persisted catalog blob.
    pub state_dir: PathBuf,
    /// Key the catalog blob is stored under.
    pub state_key: String,
    /// Overrides the file-backed state store.
    pub state_store: Option<Arc<dyn StateStore>>,
    pub store: AppStore,
    /// TV build flag, selects the TV manifest source ids.
    pub tv: bool,
}

impl IasConfig {
    pub fn new(store: AppStore, bundle_id: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            analytics: Arc::new(TracingAnalytics),
            blacklisted_slots: Vec::new(),
            bundle_id: bundle_id.into(),
            cache_dir: data_dir.join("ias"),
            cancel: None,
            events_channel_capacity: 32,
            log_clicks: true,
            log_impressions: true,
            manifest_url: None,
            net: NetOptions::default(),
            package_filters: Vec::new(),
            save_debounce: Duration::from_secs(2),
            slot_windows: HashMap::from([(1, 3), (2, 0)]),
            scanner: Arc::new(NoInstalledApps),
            state_dir: data_dir,
            state_key: "ias_catalog".to_string(),
            state_store: None,
            store,
            tv: false,
        }
    }

    /// Set a manifest URL override.
    pub fn with_manifest_url(mut self, url: Url) -> Self {
        self.manifest_url = Some(url);
        self
    }

    /// Set the TV build flag.
    pub fn with_tv(mut self, tv: bool) -> Self {
        self.tv = tv;
        self
    }

    /// Set network options.
    pub fn with_net(mut self, net: NetOptions) -> Self {
        self.net = net;
        self
    }

    /// Set the preload window for one slot.
    pub fn with_slot_window(mut self, slot: u32, window: usize) -> Self {
        self.slot_windows.insert(slot, window);
        self
    }

    /// Blacklist a slot from refresh and download.
    pub fn with_blacklisted_slot(mut self, slot: u32) -> Self {
        self.blacklisted_slots.push(slot);
        self
    }

    /// Set prefixes for the installed-package scan.
    pub fn with_package_filters(mut self, filters: Vec<String>) -> Self {
        self.package_filters = filters;
        self
    }

    /// Set the save debounce delay.
    pub fn with_save_debounce(mut self, debounce: Duration) -> Self {
        self.save_debounce = debounce;
        self
    }

    /// Set events broadcast channel capacity.
    pub fn with_events_channel_capacity(mut self, capacity: usize) -> Self {
        self.events_channel_capacity = capacity;
        self
    }

    /// Set cancellation token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Set a custom state store backend.
    pub fn with_state_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.state_store = Some(store);
        self
    }

    /// Set the device package scanner.
    pub fn with_scanner(mut self, scanner: Arc<dyn InstalledAppScanner>) -> Self {
        self.scanner = scanner;
        self
    }

    /// Set the telemetry sink.
    pub fn with_analytics(mut self, analytics: Arc<dyn AnalyticsLogger>) -> Self {
        self.analytics = analytics;
        self
    }
}
