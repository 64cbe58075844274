use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("manifest parse error: {0}")]
    Parse(String),

    #[error("invalid slot id '{0}'")]
    SlotId(String),

    #[error("catalog encode error: {0}")]
    Encode(String),

    #[error("catalog decode error: {0}")]
    Decode(String),

    #[error("state store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
