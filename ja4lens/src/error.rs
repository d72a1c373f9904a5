// ja4lens/src/error.rs
//
// Library error types. Lookups never fail (a miss is `None`); only loading the
// snapshot and analysing an uploaded capture can.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Fatal: the snapshot could not be turned into an index. No partial store is
/// ever handed out after one of these.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dataset is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("dataset must be a JSON array of records, found {0}")]
    NotAnArray(&'static str),
}

/// Upload rejections and extraction-tool failures.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("File too large (max {max_mb} MB)")]
    TooLarge { size: usize, max_mb: usize },

    #[error("Only .pcap and .pcapng files are accepted")]
    BadExtension(String),

    #[error("File too small to be a valid capture file")]
    TooSmall,

    #[error("Invalid file: not a pcap or pcapng file")]
    BadMagic(u32),

    #[error("capture I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to start extraction tool: {0}")]
    Spawn(std::io::Error),

    #[error("{0}")]
    ToolFailed(String),

    #[error("extraction tool timed out after {0:?}")]
    Timeout(Duration),

    #[error("extraction tool output exceeded {0} bytes")]
    OutputTooLarge(usize),

    #[error("extraction tool produced invalid JSON: {0}")]
    InvalidOutput(#[from] serde_json::Error),
}

impl IngestError {
    /// HTTP-style status for callers that front the analyzer with a web surface.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::TooLarge { .. }                                   => 413,
            Self::BadExtension(_) | Self::TooSmall | Self::BadMagic(_) => 400,
            _                                                       => 500,
        }
    }

    /// True when the upload itself was rejected (as opposed to a server-side failure).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_split_client_and_server_faults() {
        assert_eq!(IngestError::TooLarge { size: 1, max_mb: 50 }.status_code(), 413);
        assert_eq!(IngestError::BadMagic(0xdeadbeef).status_code(), 400);
        assert!(IngestError::TooSmall.is_client_error());
        assert!(!IngestError::Timeout(Duration::from_secs(60)).is_client_error());
        assert!(!IngestError::ToolFailed("boom".into()).is_client_error());
    }

    #[test]
    fn too_large_message_names_the_limit() {
        let e = IngestError::TooLarge { size: 60 * 1024 * 1024, max_mb: 50 };
        assert_eq!(e.to_string(), "File too large (max 50 MB)");
    }
}
