use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaloneyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ID3 error: {0}")]
    ID3(String),

    #[error("ID3 no header found")]
    ID3NoHeader,

    #[error("ID3 unsupported version: {0}")]
    ID3UnsupportedVersion(String),

    #[error("ID3 bad compressed data")]
    ID3BadCompressedData,

    #[error("could not read tag of {path}: {reason}")]
    TagRead { path: PathBuf, reason: String },

    #[error("unknown frame id: {0}")]
    UnknownFrameId(String),

    #[error("{frame}: malformed value: {reason}")]
    MalformedFrameValue { frame: String, reason: String },

    #[error("{frame}: {reason}")]
    UnencodableValue { frame: String, reason: String },

    #[error("{frame}: invalid escape: {reason}")]
    InvalidEscape { frame: String, reason: String },

    #[error("no metadata found for {0}")]
    UnresolvedMetadata(String),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("profile error: {0}")]
    Profile(#[from] toml::de::Error),
}

impl MaloneyError {
    /// Errors that invalidate a whole batch rather than a single file.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            MaloneyError::UnknownFrameId(_)
                | MaloneyError::InvalidEscape { .. }
                | MaloneyError::UnencodableValue { .. }
                | MaloneyError::Catalog(_)
        )
    }

    pub(crate) fn malformed(frame: &str, reason: impl Into<String>) -> Self {
        MaloneyError::MalformedFrameValue {
            frame: frame.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MaloneyError>;
