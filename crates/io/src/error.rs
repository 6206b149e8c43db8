use std::fmt;

/// Failures of the storage and file collaborators. Each aborts the operation
/// in progress; store writes run in a transaction and leave state unchanged.
#[derive(Debug)]
pub enum IoError {
    /// File read/write failure.
    Io(String),
    /// CSV read/write failure.
    Csv(String),
    /// SQLite failure.
    Sqlite(String),
    /// JSON encode/decode failure.
    Json(String),
    /// Persisted data that cannot be interpreted.
    Corrupt(String),
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::Sqlite(msg) => write!(f, "store error: {msg}"),
            Self::Json(msg) => write!(f, "JSON error: {msg}"),
            Self::Corrupt(msg) => write!(f, "corrupt store: {msg}"),
        }
    }
}

impl std::error::Error for IoError {}

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<::csv::Error> for IoError {
    fn from(e: ::csv::Error) -> Self {
        Self::Csv(e.to_string())
    }
}

impl From<rusqlite::Error> for IoError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sqlite(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

impl From<inventa_recon::ReconError> for IoError {
    fn from(e: inventa_recon::ReconError) -> Self {
        Self::Csv(e.to_string())
    }
}
