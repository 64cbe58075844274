use ias_net::NetError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetsError {
    #[error("network error: {0}")]
    Net(#[from] NetError),

    #[error("image decode error for '{file_name}': {reason}")]
    Decode { file_name: String, reason: String },

    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssetsError {
    pub fn decode(file_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode { file_name: file_name.into(), reason: reason.to_string() }
    }
}

pub type AssetsResult<T> = Result<T, AssetsError>;
