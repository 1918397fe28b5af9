//! Error types shared across vidlane crates.
//!
//! Every failure falls into one of three families:
//! - **Configuration:** invalid static setup, raised once at build time.
//! - **Range:** a computed frame range leaves a source's usable bounds.
//! - **Resource:** an external limit such as the open-source ceiling.
//!
//! Extraction failures reported by a frame extractor abort the batch draw
//! they occurred in.

use std::path::PathBuf;

/// Top-level error type for vidlane operations.
#[derive(Debug, thiserror::Error)]
pub enum VidlaneError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Range error: {message}")]
    Range { message: String },

    #[error("Resource error: {message}")]
    Resource { message: String },

    #[error("Extraction error: {message}")]
    Extraction { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using VidlaneError.
pub type VidlaneResult<T> = Result<T, VidlaneError>;

impl VidlaneError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    pub fn range(msg: impl Into<String>) -> Self {
        Self::Range {
            message: msg.into(),
        }
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource {
            message: msg.into(),
        }
    }

    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction {
            message: msg.into(),
        }
    }

    /// Whether this error was raised by static configuration checks.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::FileNotFound { .. })
    }

    pub fn is_range(&self) -> bool {
        matches!(self, Self::Range { .. })
    }

    pub fn is_resource(&self) -> bool {
        matches!(self, Self::Resource { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_family_predicates() {
        assert!(VidlaneError::configuration("bad").is_configuration());
        assert!(VidlaneError::FileNotFound {
            path: PathBuf::from("/missing.mp4")
        }
        .is_configuration());
        assert!(VidlaneError::range("past end").is_range());
        assert!(VidlaneError::resource("too many handles").is_resource());
        assert!(!VidlaneError::extraction("decode").is_configuration());
    }

    #[test]
    fn test_error_messages_name_family() {
        let err = VidlaneError::configuration("interleave_size 3 does not divide 4 sources");
        assert_eq!(
            err.to_string(),
            "Configuration error: interleave_size 3 does not divide 4 sources"
        );
    }
}
