use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// One row handed over by the import collaborator: column 0 = code,
/// column 1 = name. Row 0 of any import is the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub code: String,
    pub name: String,
}

impl RawRow {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// Catalog-unique key for an imported row, `"{code}-{row_index}"`. This is
/// the asset's `id`: everything keyed on an asset (ledger pairs, progress,
/// reports) sees one entry per row even when codes repeat.
///
/// The row index is all digits, so it can always be split back off at the
/// last `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetKey(String);

impl AssetKey {
    pub fn new(code: &str, row_index: usize) -> Self {
        Self(format!("{code}-{row_index}"))
    }

    /// Rebuild a key that was previously produced by [`AssetKey::new`].
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The printable code, i.e. the key without its row suffix. A string
    /// that carries no row suffix is returned whole.
    pub fn code(&self) -> &str {
        match self.0.rsplit_once('-') {
            Some((code, row))
                if !code.is_empty()
                    && !row.is_empty()
                    && row.bytes().all(|b| b.is_ascii_digit()) =>
            {
                code
            }
            _ => &self.0,
        }
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub key: AssetKey,
    /// `key` as a plain string; the identity matched, recorded and reported.
    pub id: String,
    pub nome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambiente: Option<String>,
}

impl Asset {
    pub fn new(key: AssetKey, nome: impl Into<String>) -> Self {
        Self {
            id: key.as_str().to_string(),
            key,
            nome: nome.into(),
            ambiente: None,
        }
    }
}

/// Display-only metadata of the current import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMeta {
    pub file_name: String,
    pub imported_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogInfo {
    pub total: usize,
    pub file_name: String,
    pub imported_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Location filter: one named location, or the general scope spanning all.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum Scope {
    General,
    Location(String),
}

impl Scope {
    pub const ALL: &'static str = "ALL";

    /// Resolve a user-supplied scope name. Empty, `ALL` (any case) and the
    /// configured general label all denote [`Scope::General`].
    pub fn resolve(name: &str, general_label: &str) -> Self {
        let name = name.trim();
        if name.is_empty()
            || name.eq_ignore_ascii_case(Self::ALL)
            || name.eq_ignore_ascii_case(general_label.trim())
        {
            Self::General
        } else {
            Self::Location(name.to_string())
        }
    }

    pub fn is_general(&self) -> bool {
        matches!(self, Self::General)
    }

    /// Ledger visibility: general sees everything, a location only its own.
    pub fn includes_record(&self, record: &VerificationRecord) -> bool {
        match self {
            Self::General => true,
            Self::Location(name) => record.ambiente == *name,
        }
    }

    /// Catalog visibility under the given policy for assets with no location.
    pub fn includes_asset(&self, asset: &Asset, visibility: Visibility) -> bool {
        match (self, asset.ambiente.as_deref()) {
            (Self::General, _) => true,
            (Self::Location(name), Some(ambiente)) => ambiente == name,
            (Self::Location(_), None) => visibility == Visibility::Everywhere,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General => f.write_str(Self::ALL),
            Self::Location(name) => f.write_str(name),
        }
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.to_string()
    }
}

/// Where assets without an `ambiente` are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Visible from every location and from the general scope.
    #[default]
    Everywhere,
    /// Visible from the general scope only.
    GeneralOnly,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMethod {
    Camera,
    Manual,
}

impl fmt::Display for CaptureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Camera => write!(f, "camera"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

impl FromStr for CaptureMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "camera" => Ok(Self::Camera),
            "manual" => Ok(Self::Manual),
            other => Err(format!("unknown capture method: {other}")),
        }
    }
}

/// One confirmed sighting of an asset in a location. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    pub asset_id: String,
    pub nome: String,
    pub ambiente: String,
    pub data_hora: DateTime<Utc>,
    pub tipo_verificacao: CaptureMethod,
    pub codigo_verificado: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observacoes: Option<String>,
}

impl VerificationRecord {
    /// Build the record for a sighting of `asset` in `ambiente`. Location,
    /// code and notes are trimmed; blank notes are dropped.
    pub fn capture(
        asset: &Asset,
        ambiente: &str,
        method: CaptureMethod,
        codigo: &str,
        observacoes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            asset_id: asset.id.clone(),
            nome: asset.nome.clone(),
            ambiente: ambiente.trim().to_string(),
            data_hora: at,
            tipo_verificacao: method,
            codigo_verificado: codigo.trim().to_string(),
            observacoes: observacoes
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOutcome {
    Recorded,
    AlreadyRecorded,
}

// ---------------------------------------------------------------------------
// Progress + Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub scope: Scope,
    pub total: usize,
    pub verified: usize,
    pub unverified: usize,
    pub indeterminate: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportStatus {
    Presente,
    Ausente,
    Indeterminado,
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Presente => write!(f, "Presente"),
            Self::Ausente => write!(f, "Ausente"),
            Self::Indeterminado => write!(f, "Indeterminado"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub codigo: String,
    pub nome: String,
    pub status: ReportStatus,
}

/// Result of finalizing a collection. `Empty` is a normal state, distinct
/// from any failure of the mechanism that writes the report out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalReport {
    Empty,
    Ready(Vec<ReportRow>),
}

impl FinalReport {
    pub fn rows(&self) -> &[ReportRow] {
        match self {
            Self::Empty => &[],
            Self::Ready(rows) => rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Present / missing / unexpected review for one scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationReport {
    pub summary: ProgressSnapshot,
    pub present: Vec<ReportRow>,
    pub missing: Vec<ReportRow>,
    pub unexpected: Vec<ReportRow>,
}

/// Records of one location, in ledger order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationSection {
    pub ambiente: String,
    pub records: Vec<VerificationRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_key_code_strips_row_suffix() {
        let key = AssetKey::new("100-1", 7);
        assert_eq!(key.as_str(), "100-1-7");
        assert_eq!(key.code(), "100-1");
    }

    #[test]
    fn asset_key_without_row_suffix_is_its_own_code() {
        for raw in ["XYZ", "ABC-DEF", "-3", "100-"] {
            let key = AssetKey::from_raw(raw);
            assert_eq!(key.code(), raw);
        }
    }

    #[test]
    fn scope_resolution() {
        assert_eq!(Scope::resolve("ALL", "Geral"), Scope::General);
        assert_eq!(Scope::resolve("all", "Geral"), Scope::General);
        assert_eq!(Scope::resolve(" geral ", "Geral"), Scope::General);
        assert_eq!(Scope::resolve("", "Geral"), Scope::General);
        assert_eq!(
            Scope::resolve(" Sala 01 ", "Geral"),
            Scope::Location("Sala 01".into())
        );
    }

    #[test]
    fn unscoped_asset_visibility_follows_policy() {
        let asset = Asset {
            key: AssetKey::new("1", 1),
            id: "1-1".into(),
            nome: "Mesa".into(),
            ambiente: None,
        };
        let sala = Scope::Location("Sala 01".into());
        assert!(sala.includes_asset(&asset, Visibility::Everywhere));
        assert!(!sala.includes_asset(&asset, Visibility::GeneralOnly));
        assert!(Scope::General.includes_asset(&asset, Visibility::GeneralOnly));
    }

    #[test]
    fn capture_method_parse() {
        assert_eq!("Camera".parse::<CaptureMethod>(), Ok(CaptureMethod::Camera));
        assert_eq!(" manual".parse::<CaptureMethod>(), Ok(CaptureMethod::Manual));
        assert!("scanner".parse::<CaptureMethod>().is_err());
    }
}
