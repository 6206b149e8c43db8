//! Scanned-code matching against the catalog.
//!
//! Assets are tried in catalog order and the first asset satisfying any rule
//! wins; later assets are never considered, even if they would match "better".
//! Per asset, rules are tried in the order of [`MatchRule`], which only
//! decides which rule gets reported.

use serde::Serialize;

use crate::model::Asset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    /// `asset.id == code`
    Exact,
    /// `asset.id` contains the code, or the code contains the id's prefix
    /// before its first `-`.
    IdContainment,
    /// Upper-cased name contains the upper-cased code.
    NameContainment,
    /// Digits of the id contain the digits of the code.
    NumericContainment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchHit<'a> {
    pub asset: &'a Asset,
    pub rule: MatchRule,
}

/// The scanned code, prepared once per lookup.
struct Probe {
    code: String,
    upper: String,
    digits: String,
}

impl Probe {
    fn new(scanned: &str) -> Self {
        let code = scanned.trim().to_string();
        Self {
            upper: code.to_uppercase(),
            digits: digits_only(&code),
            code,
        }
    }
}

fn digits_only(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

fn rule_for(asset: &Asset, probe: &Probe) -> Option<MatchRule> {
    if asset.id == probe.code {
        return Some(MatchRule::Exact);
    }

    let id_prefix = asset.id.split('-').next().unwrap_or("");
    if asset.id.contains(&probe.code) || (!id_prefix.is_empty() && probe.code.contains(id_prefix)) {
        return Some(MatchRule::IdContainment);
    }

    if asset.nome.to_uppercase().contains(&probe.upper) {
        return Some(MatchRule::NameContainment);
    }

    let id_digits = digits_only(&asset.id);
    if !id_digits.is_empty() && !probe.digits.is_empty() && id_digits.contains(&probe.digits) {
        return Some(MatchRule::NumericContainment);
    }

    None
}

/// Find the first catalog asset matching `scanned`, with the rule that hit.
///
/// A code that is empty after trimming matches nothing.
pub fn find_match<'a>(scanned: &str, catalog: &'a [Asset]) -> Option<MatchHit<'a>> {
    let probe = Probe::new(scanned);
    if probe.code.is_empty() {
        return None;
    }

    let hit = catalog
        .iter()
        .find_map(|asset| rule_for(asset, &probe).map(|rule| MatchHit { asset, rule }));

    match &hit {
        Some(h) => log::debug!("code '{}' matched {} via {:?}", probe.code, h.asset.key, h.rule),
        None => log::debug!("code '{}' not found in {} asset(s)", probe.code, catalog.len()),
    }
    hit
}

/// Find the asset a scanned code refers to; `None` is the not-found outcome.
pub fn match_code<'a>(scanned: &str, catalog: &'a [Asset]) -> Option<&'a Asset> {
    find_match(scanned, catalog).map(|hit| hit.asset)
}
