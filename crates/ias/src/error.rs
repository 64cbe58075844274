use ias_assets::AssetsError;
use ias_catalog::CatalogError;
use ias_net::NetError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IasError {
    #[error("network error: {0}")]
    Net(#[from] NetError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("asset error: {0}")]
    Assets(#[from] AssetsError),

    #[error("store does not support in-app self-advertising")]
    UnsupportedStore,
}

pub type IasResult<T> = Result<T, IasError>;
