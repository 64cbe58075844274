use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ias_assets::{AssetCache, ImageHandle, ResolveRequest};
use ias_catalog::{
    commit_shown, decode_catalog, encode_catalog, ingest_manifest, parse_manifest,
    select_candidate, selection_window, AdCandidate, Catalog, FileStateStore, IngestContext,
    InstalledSet, RotationPolicy, SlotId, StateStore,
};
use ias_net::{HttpClient, Net};
use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{AnalyticsLogger, IasConfig, InstalledAppScanner};
use crate::error::{IasError, IasResult};
use crate::events::{EventEmitter, IasEvent};
use crate::gate::ReadyGate;
use crate::store::StoreIdentity;

/// Refresh cycle phase. One cycle runs at a time; concurrent triggers
/// coalesce into the in-flight one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Fetching,
    Merging,
    Downloading,
}

struct Inner<N> {
    analytics: Arc<dyn AnalyticsLogger>,
    cache: AssetCache,
    cancel: CancellationToken,
    catalog: RwLock<Catalog>,
    config: IasConfig,
    emitter: EventEmitter,
    gate: ReadyGate,
    identity: StoreIdentity,
    /// A catalog (cached or fetched) has been installed.
    loaded: AtomicBool,
    net: N,
    phase: Mutex<Phase>,
    refreshing: AtomicBool,
    save_pending: AtomicBool,
    scanner: Arc<dyn InstalledAppScanner>,
    state: Arc<dyn StateStore>,
}

/// Advert engine facade: owns the catalog, the image cache, the refresh
/// state machine and the persisted state. Cheap to clone; all clones
/// share one engine.
pub struct IasService<N: Net + 'static> {
    inner: Arc<Inner<N>>,
}

impl<N: Net + 'static> Clone for IasService<N> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl IasService<HttpClient> {
    pub fn new(config: IasConfig) -> IasResult<Self> {
        let net = HttpClient::new(config.net.clone());
        Self::with_net(config, net)
    }
}

impl<N: Net + 'static> IasService<N> {
    pub fn with_net(config: IasConfig, net: N) -> IasResult<Self> {
        let identity = StoreIdentity::new(config.store, config.bundle_id.clone(), config.tv);
        let cache = AssetCache::new(&config.cache_dir)?;
        let state: Arc<dyn StateStore> = match &config.state_store {
            Some(store) => Arc::clone(store),
            None => Arc::new(FileStateStore::new(&config.state_dir)?),
        };

        let service = Self {
            inner: Arc::new(Inner {
                analytics: Arc::clone(&config.analytics),
                cache,
                cancel: config.cancel.clone().unwrap_or_default(),
                catalog: RwLock::new(Catalog::default()),
                emitter: EventEmitter::new(config.events_channel_capacity),
                gate: ReadyGate::new(),
                identity,
                loaded: AtomicBool::new(false),
                net,
                phase: Mutex::new(Phase::Idle),
                refreshing: AtomicBool::new(false),
                save_pending: AtomicBool::new(false),
                scanner: Arc::clone(&config.scanner),
                state,
                config,
            }),
        };

        if service.is_enabled() {
            service.load_cached_state();
        } else {
            info!(store = ?service.inner.config.store, "ias: store unsupported, engine disabled");
        }
        Ok(service)
    }

    /// Kicks off the initial refresh cycle in the background. Must be
    /// called from within a tokio runtime.
    pub fn start(&self) {
        if !self.is_enabled() {
            return;
        }
        let this = self.clone();
        tokio::spawn(async move {
            let _ = this.refresh_catalog().await;
        });
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.identity.source_id().is_some()
    }

    pub fn phase(&self) -> Phase {
        *self.inner.phase.lock()
    }

    pub fn events(&self) -> tokio::sync::broadcast::Receiver<IasEvent> {
        self.inner.emitter.subscribe()
    }

    fn set_phase(&self, phase: Phase) {
        *self.inner.phase.lock() = phase;
    }

    fn policy_for(&self, slot: u32) -> RotationPolicy {
        let window = self.inner.config.slot_windows.get(&slot).copied().unwrap_or(0);
        // Multi-advert surfaces prefer repeats over empty positions.
        RotationPolicy { window, allow_duplicates: window > 0 }
    }

    fn manifest_url(&self) -> Option<Url> {
        self.inner
            .config
            .manifest_url
            .clone()
            .or_else(|| self.inner.identity.manifest_url())
    }

    fn load_cached_state(&self) {
        let key = self.inner.config.state_key.clone();
        match self.inner.state.load(&key) {
            Ok(Some(blob)) => match decode_catalog(&blob) {
                Ok(catalog) => {
                    let slots = catalog.slots.len();
                    *self.inner.catalog.write() = catalog;
                    self.inner.loaded.store(true, Ordering::SeqCst);
                    for op in self.inner.gate.open() {
                        op();
                    }
                    self.inner.emitter.emit_data_ready();
                    info!(slots, "ias: cached catalog loaded");
                }
                Err(e) => {
                    warn!(error = %e, "ias: cached catalog unreadable, starting cold");
                    self.inner.analytics.log_error(&format!("ias state decode: {e}"));
                }
            },
            Ok(None) => debug!("ias: no cached catalog, starting cold"),
            Err(e) => {
                warn!(error = %e, "ias: state load failed, starting cold");
                self.inner.analytics.log_error(&format!("ias state load: {e}"));
            }
        }
    }

    /// Runs one full refresh cycle: fetch manifest, merge, clean up
    /// orphans, download the per-slot windows. Returns `Ok(false)` when
    /// skipped (engine disabled or a cycle already in flight).
    pub async fn refresh_catalog(&self) -> IasResult<bool> {
        if !self.is_enabled() {
            return Ok(false);
        }
        if self
            .inner
            .refreshing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("ias: refresh already in flight");
            return Ok(false);
        }

        let result = self.run_cycle().await;
        self.set_phase(Phase::Idle);
        self.inner.refreshing.store(false, Ordering::SeqCst);

        match result {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(error = %e, "ias: refresh cycle failed");
                self.inner.analytics.log_error(&format!("ias refresh: {e}"));
                self.inner.emitter.emit_error(&e.to_string(), true);
                Err(e)
            }
        }
    }

    async fn run_cycle(&self) -> IasResult<()> {
        let url = self.manifest_url().ok_or(IasError::UnsupportedStore)?;

        self.set_phase(Phase::Fetching);
        info!(%url, "ias: fetching manifest");
        let body = self.inner.net.get_bytes(url, None).await?;

        self.set_phase(Phase::Merging);
        let doc = parse_manifest(&body)?;
        let installed = InstalledSet::new(
            self.inner
                .scanner
                .installed_packages(&self.inner.config.package_filters),
        );
        let outcome = {
            let current = self.inner.catalog.read();
            let previous = self.inner.loaded.load(Ordering::SeqCst).then(|| &*current);
            ingest_manifest(
                &doc,
                &IngestContext {
                    previous,
                    bundle_id: &self.inner.config.bundle_id,
                    installed: &installed,
                    package_source: self.inner.identity.package_source(),
                },
            )?
        };

        let mut catalog = outcome.catalog;
        if outcome.fresh {
            catalog.randomize_cursors();
        }
        let keep = catalog.cache_file_names();
        *self.inner.catalog.write() = catalog;
        self.inner.loaded.store(true, Ordering::SeqCst);

        if let Err(e) = self.inner.cache.remove_unreferenced(&keep) {
            warn!(error = %e, "ias: orphan cleanup failed");
        }
        for op in self.inner.gate.open() {
            op();
        }
        self.inner.emitter.emit_data_ready();
        self.request_save();

        self.set_phase(Phase::Downloading);
        let slots: Vec<u32> = {
            let catalog = self.inner.catalog.read();
            catalog.slots.iter().map(|s| s.number).collect()
        };
        for number in slots {
            if self.inner.config.blacklisted_slots.contains(&number) {
                continue;
            }
            if self.inner.cancel.is_cancelled() {
                break;
            }
            self.download_slot_window(number).await;
        }
        self.request_save();
        Ok(())
    }

    /// Downloads every not-yet-ready image in the slot's rotation
    /// window. Cache flags are snapshotted under the lock, I/O happens
    /// outside it, results are applied back under the lock.
    async fn download_slot_window(&self, number: u32) {
        let requests: Vec<(char, ResolveRequest)> = {
            let mut catalog = self.inner.catalog.write();
            let Some(slot) = catalog.slot_mut(number) else {
                return;
            };
            let policy = self.policy_for(number);
            let window = selection_window(slot, &policy);
            let mut out = Vec::new();
            for idx in window {
                let c = &mut slot.candidates[idx];
                if c.image_ready || c.downloading {
                    continue;
                }
                c.downloading = true;
                out.push((
                    c.slot_letter,
                    ResolveRequest {
                        file_name: c.cache_file_name.clone(),
                        image_url: c.image_url.clone(),
                        presumed_cached: c.image_cached,
                    },
                ));
            }
            out
        };

        for (letter, request) in requests {
            let id = SlotId::new(number, letter);
            match self.inner.cache.resolve(&request, &self.inner.net).await {
                Ok(outcome) => {
                    {
                        let mut catalog = self.inner.catalog.write();
                        if let Some(c) = catalog.candidate_mut(id) {
                            c.downloading = false;
                            c.image_ready = outcome.ready;
                            c.image_cached = outcome.cached;
                            if outcome.ready {
                                c.last_updated = c.pending_update;
                            }
                        }
                    }
                    self.inner.emitter.emit_image_ready(number);
                }
                Err(e) => {
                    {
                        let mut catalog = self.inner.catalog.write();
                        if let Some(c) = catalog.candidate_mut(id) {
                            c.downloading = false;
                            c.image_cached = false;
                        }
                    }
                    warn!(slot = %id, error = %e, "ias: image download failed");
                    self.inner.analytics.log_error(&format!("ias image {id}: {e}"));
                    self.inner.emitter.emit_error(&e.to_string(), true);
                }
            }
        }
    }

    /// Advances the slot's rotation and re-runs its window download.
    /// Before the first catalog lands the request is queued on the
    /// ready gate and a full refresh is triggered instead.
    pub async fn refresh_slot(&self, number: u32, force_notify: bool) -> IasResult<()> {
        if !self.is_enabled() || self.inner.config.blacklisted_slots.contains(&number) {
            return Ok(());
        }
        if !self.inner.gate.is_open() {
            let this = self.clone();
            self.inner.gate.run_or_queue(Box::new(move || {
                let queued = this.clone();
                tokio::spawn(async move {
                    let _ = queued.refresh_slot_now(number, force_notify).await;
                });
            }));
            self.start();
            return Ok(());
        }
        self.refresh_slot_now(number, force_notify).await
    }

    async fn refresh_slot_now(&self, number: u32, force_notify: bool) -> IasResult<()> {
        {
            let mut catalog = self.inner.catalog.write();
            let Some(slot) = catalog.slot_mut(number) else {
                return Ok(());
            };
            let policy = self.policy_for(number);
            if let Some(letter) = select_candidate(slot, 0, &policy).map(|c| c.slot_letter) {
                commit_shown(slot, letter);
            }
        }
        self.download_slot_window(number).await;
        if force_notify {
            self.inner.emitter.emit_force_change(number);
        }
        self.request_save();
        Ok(())
    }

    fn with_candidate<T>(
        &self,
        number: u32,
        offset: usize,
        f: impl FnOnce(&AdCandidate) -> T,
    ) -> Option<T> {
        if !self.is_enabled() {
            return None;
        }
        let catalog = self.inner.catalog.read();
        let slot = catalog.slot(number)?;
        select_candidate(slot, offset, &self.policy_for(number)).map(f)
    }

    pub fn is_ad_ready(&self, number: u32, offset: usize) -> bool {
        self.with_candidate(number, offset, |c| c.image_ready)
            .unwrap_or(false)
    }

    pub fn ad_image(&self, number: u32, offset: usize) -> Option<ImageHandle> {
        let file_name = self.with_candidate(number, offset, |c| c.cache_file_name.clone())?;
        self.inner.cache.image(&file_name)
    }

    pub fn ad_url(&self, number: u32, offset: usize) -> Option<Url> {
        self.with_candidate(number, offset, |c| c.ad_url.clone())
    }

    pub fn ad_package_name(&self, number: u32, offset: usize) -> Option<String> {
        self.with_candidate(number, offset, |c| c.package_name.clone())
    }

    pub fn on_impression(&self, package_name: &str, backscreen: bool) {
        if !self.is_enabled() || !self.inner.config.log_impressions {
            return;
        }
        self.log_ad_event("ias_impression", package_name, backscreen);
    }

    pub fn on_click(&self, package_name: &str, backscreen: bool) {
        if !self.is_enabled() || !self.inner.config.log_clicks {
            return;
        }
        self.log_ad_event("ias_click", package_name, backscreen);
    }

    fn log_ad_event(&self, category: &str, package_name: &str, backscreen: bool) {
        let placement = if backscreen { "(backscreen)" } else { "(main)" };
        let label = format!("{}{placement}", truncate(&self.inner.config.bundle_id, 27));
        self.inner
            .analytics
            .log_event(category, &label, truncate(package_name, 40));
    }

    /// Schedules a debounced catalog save; repeat requests inside the
    /// debounce window collapse into one write.
    fn request_save(&self) {
        if self.inner.save_pending.swap(true, Ordering::SeqCst) {
            return;
        }
        let this = self.clone();
        let delay = self.inner.config.save_debounce;
        tokio::spawn(async move {
            tokio::select! {
                () = this.inner.cancel.cancelled() => {}
                () = tokio::time::sleep(delay) => {}
            }
            if !this.inner.save_pending.swap(false, Ordering::SeqCst) {
                return;
            }
            if let Err(e) = this.save_now() {
                warn!(error = %e, "ias: state save failed");
                this.inner.analytics.log_error(&format!("ias save: {e}"));
            }
        });
    }

    /// Writes the catalog out immediately, bypassing the debounce.
    pub fn flush(&self) -> IasResult<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        self.inner.save_pending.store(false, Ordering::SeqCst);
        self.save_now()
    }

    /// Cancels background work and force-saves, for app quit/suspend.
    pub fn shutdown(&self) -> IasResult<()> {
        self.inner.cancel.cancel();
        self.flush()
    }

    fn save_now(&self) -> IasResult<()> {
        let blob = {
            let catalog = self.inner.catalog.read();
            encode_catalog(&catalog)?
        };
        self.inner.state.save(&self.inner.config.state_key, &blob)?;
        debug!("ias: catalog persisted");
        Ok(())
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
