//! A collection cycle: the catalog being verified, its ledger and the
//! registered locations, driven through one contract by every capture path.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::error::ReconError;
use crate::export;
use crate::ledger::Ledger;
use crate::matcher::{find_match, MatchRule};
use crate::model::{
    CaptureMethod, CatalogInfo, CatalogMeta, FinalReport, ProgressSnapshot, RawRow,
    ReconciliationReport, RecordOutcome, Scope, VerificationRecord,
};
use crate::progress::snapshot_with;

/// Result of feeding one scanned code through match + record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScanOutcome {
    NotFound {
        code: String,
    },
    Recorded {
        record: VerificationRecord,
        /// The matcher rule that found the asset; `None` when it was picked
        /// by id.
        #[serde(skip_serializing_if = "Option::is_none")]
        rule: Option<MatchRule>,
    },
    AlreadyRecorded {
        asset_id: String,
        ambiente: String,
    },
}

#[derive(Debug, Clone)]
pub struct Collection {
    config: EngineConfig,
    catalog: Catalog,
    meta: Option<CatalogMeta>,
    ledger: Ledger,
    locations: Vec<String>,
}

impl Collection {
    pub fn new(config: EngineConfig) -> Self {
        let locations = config
            .locations
            .iter()
            .map(|l| l.trim().to_string())
            .collect();
        Self {
            config,
            catalog: Catalog::default(),
            meta: None,
            ledger: Ledger::new(),
            locations,
        }
    }

    /// Reassemble a collection from persisted parts.
    pub fn from_parts(
        config: EngineConfig,
        catalog: Catalog,
        meta: Option<CatalogMeta>,
        ledger: Ledger,
        locations: Vec<String>,
    ) -> Self {
        Self {
            config,
            catalog,
            meta,
            ledger,
            locations,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn meta(&self) -> Option<&CatalogMeta> {
        self.meta.as_ref()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    pub fn scope(&self, name: &str) -> Scope {
        self.config.scope(name)
    }

    // -----------------------------------------------------------------------
    // Import
    // -----------------------------------------------------------------------

    /// Replace the catalog wholesale. The ledger is kept; records whose asset
    /// disappears become indeterminate.
    pub fn import(&mut self, rows: &[RawRow], file_name: &str, at: DateTime<Utc>) -> CatalogInfo {
        self.catalog = Catalog::from_rows(rows, &self.config.placeholder_prefix);
        self.meta = Some(CatalogMeta {
            file_name: file_name.to_string(),
            imported_at: at,
        });
        log::info!(
            "imported {} asset(s) from '{}' ({} row(s) read)",
            self.catalog.len(),
            file_name,
            rows.len()
        );
        CatalogInfo {
            total: self.catalog.len(),
            file_name: file_name.to_string(),
            imported_at: at,
        }
    }

    pub fn info(&self) -> Option<CatalogInfo> {
        self.meta.as_ref().map(|meta| CatalogInfo {
            total: self.catalog.len(),
            file_name: meta.file_name.clone(),
            imported_at: meta.imported_at,
        })
    }

    // -----------------------------------------------------------------------
    // Capture
    // -----------------------------------------------------------------------

    /// Match a scanned code and record it under `ambiente`.
    pub fn scan(
        &mut self,
        code: &str,
        ambiente: &str,
        method: CaptureMethod,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> ScanOutcome {
        let Some(hit) = find_match(code, self.catalog.assets()) else {
            return ScanOutcome::NotFound {
                code: code.trim().to_string(),
            };
        };
        let ambiente = self.config.location_label(ambiente);
        let record = VerificationRecord::capture(hit.asset, &ambiente, method, code, notes, at);
        let rule = hit.rule;
        self.commit(record, Some(rule))
    }

    /// Record the asset whose id is exactly `asset_id`, skipping the matcher.
    ///
    /// Matching always resolves a repeated code to its first row; this is how
    /// the later rows get verified.
    pub fn verify(
        &mut self,
        asset_id: &str,
        ambiente: &str,
        method: CaptureMethod,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> ScanOutcome {
        let asset_id = asset_id.trim();
        let Some(asset) = self.catalog.find_by_id(asset_id) else {
            return ScanOutcome::NotFound {
                code: asset_id.to_string(),
            };
        };
        let ambiente = self.config.location_label(ambiente);
        let record = VerificationRecord::capture(asset, &ambiente, method, asset_id, notes, at);
        self.commit(record, None)
    }

    fn commit(&mut self, record: VerificationRecord, rule: Option<MatchRule>) -> ScanOutcome {
        match self.ledger.insert(record.clone()) {
            RecordOutcome::Recorded => ScanOutcome::Recorded { record, rule },
            RecordOutcome::AlreadyRecorded => ScanOutcome::AlreadyRecorded {
                asset_id: record.asset_id,
                ambiente: record.ambiente,
            },
        }
    }

    /// Undo a verification. Returns whether a record was removed.
    pub fn undo(&mut self, asset_id: &str, ambiente: &str) -> bool {
        let ambiente = self.config.location_label(ambiente);
        self.ledger.remove(asset_id.trim(), &ambiente)
    }

    // -----------------------------------------------------------------------
    // Progress + Export
    // -----------------------------------------------------------------------

    pub fn progress(&self, scope: &Scope) -> ProgressSnapshot {
        snapshot_with(
            self.catalog.assets(),
            self.ledger.records(),
            scope,
            self.config.unscoped_visibility,
        )
    }

    /// General progress followed by each registered location.
    pub fn progress_by_location(&self) -> Vec<ProgressSnapshot> {
        std::iter::once(Scope::General)
            .chain(self.locations.iter().cloned().map(Scope::Location))
            .map(|scope| self.progress(&scope))
            .collect()
    }

    pub fn finalize(&self) -> FinalReport {
        export::finalize(self.catalog.assets(), self.ledger.records())
    }

    pub fn reconcile(&self, scope: &Scope) -> ReconciliationReport {
        export::reconcile(
            self.catalog.assets(),
            self.ledger.records(),
            scope,
            self.config.unscoped_visibility,
        )
    }

    /// Destroy catalog, import metadata and ledger. Locations survive.
    pub fn clear(&mut self) {
        log::info!(
            "clearing collection: {} asset(s), {} verification(s)",
            self.catalog.len(),
            self.ledger.len()
        );
        self.catalog = Catalog::default();
        self.meta = None;
        self.ledger.clear();
    }

    // -----------------------------------------------------------------------
    // Locations
    // -----------------------------------------------------------------------

    fn checked_name(&self, name: &str) -> Result<String, ReconError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ReconError::EmptyLocationName);
        }
        if self.scope(name).is_general() || self.locations.iter().any(|l| l == name) {
            return Err(ReconError::LocationExists(name.to_string()));
        }
        Ok(name.to_string())
    }

    fn position(&self, name: &str) -> Result<usize, ReconError> {
        let name = name.trim();
        self.locations
            .iter()
            .position(|l| l == name)
            .ok_or_else(|| ReconError::UnknownLocation(name.to_string()))
    }

    pub fn add_location(&mut self, name: &str) -> Result<String, ReconError> {
        let name = self.checked_name(name)?;
        self.locations.push(name.clone());
        Ok(name)
    }

    /// Rename a location and migrate its verifications. Returns the number of
    /// records moved.
    pub fn rename_location(&mut self, from: &str, to: &str) -> Result<usize, ReconError> {
        let pos = self.position(from)?;
        if from.trim() == to.trim() {
            return Ok(0);
        }
        let to = self.checked_name(to)?;
        let from = std::mem::replace(&mut self.locations[pos], to.clone());
        Ok(self.ledger.rename_location(&from, &to))
    }

    /// Drop a location and its verifications. Returns the number of records
    /// removed.
    pub fn remove_location(&mut self, name: &str) -> Result<usize, ReconError> {
        let pos = self.position(name)?;
        let name = self.locations.remove(pos);
        Ok(self.ledger.remove_location(&name))
    }
}
