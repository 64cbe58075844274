#![forbid(unsafe_code)]

//! Advert catalog: manifest parsing, merge with persisted state, slot
//! rotation and the JSON persistence codec.

mod error;
mod ingest;
mod manifest;
mod model;
mod persist;
mod rotate;

pub use crate::{
    error::{CatalogError, CatalogResult},
    ingest::{ingest_manifest, IngestContext, IngestOutcome},
    manifest::{
        cache_file_name, extract_package_name, image_extension, parse_manifest, parse_slot_id,
        to_https, ManifestDoc, ManifestSlot, PackageSource, SERVER_ERROR_MARKER,
    },
    model::{AdCandidate, AdSlot, Catalog, InstalledSet, SlotId},
    persist::{decode_catalog, encode_catalog, FileStateStore, StateStore},
    rotate::{commit_shown, select_candidate, selection_window, unique_eligible_count, RotationPolicy},
};
