use std::fmt;

/// Engine errors. Not-found codes and duplicate verifications are outcomes,
/// not errors; see [`crate::model::RecordOutcome`] and
/// [`crate::collection::ScanOutcome`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty label, duplicate location, etc.).
    ConfigValidation(String),
    /// Catalog CSV could not be read.
    Csv(String),
    /// Location name is empty after trimming.
    EmptyLocationName,
    /// Location already registered (or collides with the general label).
    LocationExists(String),
    /// Location is not registered.
    UnknownLocation(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Csv(msg) => write!(f, "catalog CSV error: {msg}"),
            Self::EmptyLocationName => write!(f, "location name cannot be empty"),
            Self::LocationExists(name) => write!(f, "location '{name}' already exists"),
            Self::UnknownLocation(name) => write!(f, "unknown location: '{name}'"),
        }
    }
}

impl std::error::Error for ReconError {}
