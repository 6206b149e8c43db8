// File I/O operations: the collaborators around the engine

pub mod csv;
pub mod error;
pub mod report;
pub mod store;

pub use error::IoError;
pub use store::Store;

/// Store schema version
/// Increment when schema changes in a way that old versions can't read
pub const STORE_SCHEMA_VERSION: u32 = 1;
