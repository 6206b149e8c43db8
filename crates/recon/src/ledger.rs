//! Verification ledger: append-only record of confirmed sightings,
//! at most one per `(asset_id, ambiente)` pair.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::model::{Asset, CaptureMethod, RecordOutcome, Scope, VerificationRecord};

type PairKey = (String, String);

fn pair_key(asset_id: &str, ambiente: &str) -> PairKey {
    (asset_id.to_string(), ambiente.to_string())
}

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    records: Vec<VerificationRecord>,
    index: HashSet<PairKey>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted records. Later duplicates of a pair are
    /// dropped so the rebuilt ledger satisfies the verify-once invariant.
    pub fn from_records(records: impl IntoIterator<Item = VerificationRecord>) -> Self {
        let mut ledger = Self::new();
        for record in records {
            if ledger.insert(record.clone()) == RecordOutcome::AlreadyRecorded {
                log::warn!(
                    "dropping duplicate verification of '{}' in '{}'",
                    record.asset_id,
                    record.ambiente
                );
            }
        }
        ledger
    }

    /// Record a sighting of `asset` in `ambiente`, stamped with the current time.
    pub fn record(
        &mut self,
        asset: &Asset,
        ambiente: &str,
        method: CaptureMethod,
        codigo: &str,
        observacoes: Option<&str>,
    ) -> RecordOutcome {
        self.record_at(asset, ambiente, method, codigo, observacoes, Utc::now())
    }

    pub fn record_at(
        &mut self,
        asset: &Asset,
        ambiente: &str,
        method: CaptureMethod,
        codigo: &str,
        observacoes: Option<&str>,
        at: DateTime<Utc>,
    ) -> RecordOutcome {
        if self.contains(&asset.id, ambiente.trim()) {
            return RecordOutcome::AlreadyRecorded;
        }
        self.insert(VerificationRecord::capture(
            asset,
            ambiente,
            method,
            codigo,
            observacoes,
            at,
        ))
    }

    /// Append a prebuilt record unless its pair is already present.
    pub fn insert(&mut self, record: VerificationRecord) -> RecordOutcome {
        if !self.index.insert(pair_key(&record.asset_id, &record.ambiente)) {
            return RecordOutcome::AlreadyRecorded;
        }
        self.records.push(record);
        RecordOutcome::Recorded
    }

    pub fn contains(&self, asset_id: &str, ambiente: &str) -> bool {
        self.index.contains(&pair_key(asset_id, ambiente))
    }

    pub fn get(&self, asset_id: &str, ambiente: &str) -> Option<&VerificationRecord> {
        if !self.contains(asset_id, ambiente) {
            return None;
        }
        self.records
            .iter()
            .find(|r| r.asset_id == asset_id && r.ambiente == ambiente)
    }

    /// Undo a verification. Returns whether a record was removed.
    pub fn remove(&mut self, asset_id: &str, ambiente: &str) -> bool {
        if !self.index.remove(&pair_key(asset_id, ambiente)) {
            return false;
        }
        self.records
            .retain(|r| !(r.asset_id == asset_id && r.ambiente == ambiente));
        true
    }

    pub fn list_by_scope(&self, scope: &Scope) -> Vec<&VerificationRecord> {
        self.records
            .iter()
            .filter(|r| scope.includes_record(r))
            .collect()
    }

    pub fn records(&self) -> &[VerificationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Move every record of `from` to `to`. A record whose asset is already
    /// verified in `to` is dropped. Returns the number of records moved.
    pub fn rename_location(&mut self, from: &str, to: &str) -> usize {
        if from == to {
            return 0;
        }
        let occupied: HashSet<String> = self
            .records
            .iter()
            .filter(|r| r.ambiente == to)
            .map(|r| r.asset_id.clone())
            .collect();

        let mut moved = 0;
        let mut dropped = 0;
        let records = std::mem::take(&mut self.records);
        self.index.clear();
        for mut record in records {
            if record.ambiente == from {
                if occupied.contains(&record.asset_id) {
                    dropped += 1;
                    continue;
                }
                record.ambiente = to.to_string();
                moved += 1;
            }
            self.insert(record);
        }
        if dropped > 0 {
            log::warn!("renaming '{from}' to '{to}' dropped {dropped} duplicate verification(s)");
        }
        moved
    }

    /// Remove every record of a location. Returns the number removed.
    pub fn remove_location(&mut self, ambiente: &str) -> usize {
        let before = self.records.len();
        self.records.retain(|r| r.ambiente != ambiente);
        self.index.retain(|(_, a)| a != ambiente);
        before - self.records.len()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
    }
}

/// Ledger shared between capture paths. Every mutation takes the write lock,
/// so the duplicate check and the append for a pair happen as one step.
#[derive(Debug, Clone, Default)]
pub struct SharedLedger {
    inner: Arc<RwLock<Ledger>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    pub fn record(
        &self,
        asset: &Asset,
        ambiente: &str,
        method: CaptureMethod,
        codigo: &str,
        observacoes: Option<&str>,
    ) -> RecordOutcome {
        self.inner
            .write()
            .record(asset, ambiente, method, codigo, observacoes)
    }

    pub fn remove(&self, asset_id: &str, ambiente: &str) -> bool {
        self.inner.write().remove(asset_id, ambiente)
    }

    pub fn list_by_scope(&self, scope: &Scope) -> Vec<VerificationRecord> {
        self.inner
            .read()
            .list_by_scope(scope)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Copy of all records, for handing to the pure progress/export functions.
    pub fn snapshot(&self) -> Vec<VerificationRecord> {
        self.inner.read().records().to_vec()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }
}
