#![forbid(unsafe_code)]

//! In-app self-advertising engine: pulls an advert manifest for the
//! active store, rotates adverts per slot, caches their images on disk
//! and persists the catalog between sessions.

mod config;
mod error;
mod events;
mod gate;
mod service;
mod store;

pub use crate::{
    config::{AnalyticsLogger, IasConfig, InstalledAppScanner, NoInstalledApps, TracingAnalytics},
    error::{IasError, IasResult},
    events::{EventEmitter, IasEvent},
    gate::{QueuedOp, ReadyGate},
    service::{IasService, Phase},
    store::{AppStore, StoreIdentity},
};

pub use ias_assets::ImageHandle;
pub use ias_net::NetOptions;
