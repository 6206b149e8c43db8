//! Progress snapshots, recomputed from catalog + ledger on every call.

use std::collections::HashSet;

use crate::model::{Asset, ProgressSnapshot, Scope, VerificationRecord, Visibility};

/// Progress for `scope`, counting unscoped assets in every location.
pub fn snapshot(catalog: &[Asset], ledger: &[VerificationRecord], scope: &Scope) -> ProgressSnapshot {
    snapshot_with(catalog, ledger, scope, Visibility::default())
}

pub fn snapshot_with(
    catalog: &[Asset],
    ledger: &[VerificationRecord],
    scope: &Scope,
    visibility: Visibility,
) -> ProgressSnapshot {
    let total = catalog
        .iter()
        .filter(|a| scope.includes_asset(a, visibility))
        .count();

    let known_ids: HashSet<&str> = catalog.iter().map(|a| a.id.as_str()).collect();
    let mut verified_ids: HashSet<&str> = HashSet::new();
    let mut indeterminate = 0;

    for record in ledger.iter().filter(|r| scope.includes_record(r)) {
        verified_ids.insert(record.asset_id.as_str());
        if !known_ids.contains(record.asset_id.as_str()) {
            indeterminate += 1;
        }
    }

    let verified = verified_ids.len();
    if indeterminate > 0 {
        log::debug!("scope '{scope}': {indeterminate} verification(s) not in catalog");
    }

    ProgressSnapshot {
        scope: scope.clone(),
        total,
        verified,
        unverified: total.saturating_sub(verified),
        indeterminate,
        percentage: percentage(verified, total),
    }
}

/// `verified / total * 100`, clamped to `[0, 100]`; zero for an empty scope.
pub fn percentage(verified: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (verified as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}
