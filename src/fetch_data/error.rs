use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::data::SheetError;

/// Failure of one step of the fetch pipeline.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection failure or request timeout.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// Body is not JSON, lacks `data`, or `data` holds non-objects.
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("spreadsheet write failed: {0}")]
    Write(#[from] SheetError),

    #[error("cannot create {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Transport(_) => ErrorKind::Transport,
            FetchError::UnexpectedStatus { .. } => ErrorKind::UnexpectedStatus,
            FetchError::Decode(_) => ErrorKind::Decode,
            FetchError::Write(_) => ErrorKind::Write,
            FetchError::Filesystem { .. } => ErrorKind::Filesystem,
        }
    }
}

/// Serializable failure tag carried in outcomes and the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    UnexpectedStatus,
    Decode,
    Write,
    Filesystem,
    /// Worker task panicked before reporting.
    Panic,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Transport => "transport",
            ErrorKind::UnexpectedStatus => "unexpected_status",
            ErrorKind::Decode => "decode",
            ErrorKind::Write => "write",
            ErrorKind::Filesystem => "filesystem",
            ErrorKind::Panic => "panic",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let e = FetchError::UnexpectedStatus {
            status: 403,
            url: "https://example.test/".into(),
        };
        assert_eq!(e.kind(), ErrorKind::UnexpectedStatus);
        assert!(e.to_string().contains("403"));

        let e: FetchError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(e.kind(), ErrorKind::Decode);

        let e: FetchError = SheetError::InvalidCell { row: 0, col: 0 }.into();
        assert_eq!(e.kind(), ErrorKind::Write);
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::UnexpectedStatus).unwrap();
        assert_eq!(json, "\"unexpected_status\"");
        assert_eq!(ErrorKind::Panic.to_string(), "panic");
    }
}
