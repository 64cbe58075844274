#![forbid(unsafe_code)]

//! Disk cache for advert images: download, decode, self-heal when a
//! presumed-cached file turns out missing or corrupt.

mod cache;
mod error;
mod image_data;

pub use crate::{
    cache::{AssetCache, ResolveOutcome, ResolveRequest},
    error::{AssetsError, AssetsResult},
    image_data::{AdImage, ImageHandle},
};
