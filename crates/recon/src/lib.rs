//! `inventa-recon` — Asset verification and reconciliation engine.
//!
//! Pure engine crate: receives the imported catalog rows and scanned codes,
//! returns match decisions, verify-once ledger outcomes, progress snapshots
//! and final reports. No CLI or storage dependencies.

pub mod catalog;
pub mod collection;
pub mod config;
pub mod error;
pub mod export;
pub mod ledger;
pub mod matcher;
pub mod model;
pub mod progress;

pub use catalog::Catalog;
pub use collection::{Collection, ScanOutcome};
pub use config::EngineConfig;
pub use error::ReconError;
pub use ledger::{Ledger, SharedLedger};
pub use matcher::{find_match, match_code, MatchHit, MatchRule};
pub use model::{
    Asset, AssetKey, CaptureMethod, CatalogInfo, CatalogMeta, FinalReport, LocationSection,
    ProgressSnapshot, RawRow, ReconciliationReport, RecordOutcome, ReportRow, ReportStatus, Scope,
    VerificationRecord, Visibility,
};
