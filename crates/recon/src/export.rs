//! Final report and reconciliation review builders.
//!
//! None of these touch the catalog or ledger. Clearing state after a
//! successful handoff is the caller's job.

use std::collections::{HashMap, HashSet};

use crate::model::{
    Asset, FinalReport, LocationSection, ReconciliationReport, ReportRow, ReportStatus, Scope,
    VerificationRecord, Visibility,
};
use crate::progress::snapshot_with;

/// First catalog asset per id.
fn index_by_id(catalog: &[Asset]) -> HashMap<&str, &Asset> {
    let mut index = HashMap::with_capacity(catalog.len());
    for asset in catalog {
        index.entry(asset.id.as_str()).or_insert(asset);
    }
    index
}

fn present_rows<'a>(
    catalog: &HashMap<&str, &Asset>,
    records: impl Iterator<Item = &'a VerificationRecord>,
) -> Vec<ReportRow> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut rows = Vec::new();
    for record in records {
        let Some(asset) = catalog.get(record.asset_id.as_str()) else {
            continue;
        };
        if seen.insert(record.asset_id.as_str()) {
            rows.push(ReportRow {
                codigo: record.asset_id.clone(),
                nome: asset.nome.clone(),
                status: ReportStatus::Presente,
            });
        }
    }
    rows
}

/// One `Presente` row per distinct verified asset id, in first-verified
/// order. Records whose asset is not in the catalog are left out.
pub fn finalize(catalog: &[Asset], ledger: &[VerificationRecord]) -> FinalReport {
    let index = index_by_id(catalog);
    let rows = present_rows(&index, ledger.iter());

    let excluded = ledger
        .iter()
        .filter(|r| !index.contains_key(r.asset_id.as_str()))
        .count();
    if excluded > 0 {
        log::warn!("final report excludes {excluded} verification(s) not in the catalog");
    }

    if rows.is_empty() {
        FinalReport::Empty
    } else {
        log::info!("final report ready: {} asset(s) present", rows.len());
        FinalReport::Ready(rows)
    }
}

/// Present / missing / unexpected review of one scope.
pub fn reconcile(
    catalog: &[Asset],
    ledger: &[VerificationRecord],
    scope: &Scope,
    visibility: Visibility,
) -> ReconciliationReport {
    let index = index_by_id(catalog);
    let in_scope: Vec<&VerificationRecord> =
        ledger.iter().filter(|r| scope.includes_record(r)).collect();

    let present = present_rows(&index, in_scope.iter().copied());

    let verified_ids: HashSet<&str> = in_scope.iter().map(|r| r.asset_id.as_str()).collect();
    let mut missing_seen: HashSet<&str> = HashSet::new();
    let missing = catalog
        .iter()
        .filter(|a| scope.includes_asset(a, visibility))
        .filter(|a| !verified_ids.contains(a.id.as_str()))
        .filter(|a| missing_seen.insert(a.id.as_str()))
        .map(|a| ReportRow {
            codigo: a.id.clone(),
            nome: a.nome.clone(),
            status: ReportStatus::Ausente,
        })
        .collect();

    let mut unexpected_seen: HashSet<&str> = HashSet::new();
    let unexpected = in_scope
        .iter()
        .filter(|r| !index.contains_key(r.asset_id.as_str()))
        .filter(|r| unexpected_seen.insert(r.asset_id.as_str()))
        .map(|r| ReportRow {
            codigo: r.asset_id.clone(),
            nome: r.nome.clone(),
            status: ReportStatus::Indeterminado,
        })
        .collect();

    ReconciliationReport {
        summary: snapshot_with(catalog, ledger, scope, visibility),
        present,
        missing,
        unexpected,
    }
}

/// Group records by location, locations in first-seen order.
pub fn by_location(ledger: &[VerificationRecord]) -> Vec<LocationSection> {
    let mut sections: Vec<LocationSection> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for record in ledger {
        let pos = *positions.entry(record.ambiente.as_str()).or_insert_with(|| {
            sections.push(LocationSection {
                ambiente: record.ambiente.clone(),
                records: Vec::new(),
            });
            sections.len() - 1
        });
        sections[pos].records.push(record.clone());
    }
    sections
}
