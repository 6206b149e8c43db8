//! Asset catalog: the reference list of assets for one collection cycle.
//!
//! Built in bulk from imported rows and replaced wholesale on re-import.

use std::collections::HashSet;

use crate::error::ReconError;
use crate::model::{Asset, AssetKey, RawRow};

/// Name prefix for rows imported without a name.
pub const DEFAULT_PLACEHOLDER_PREFIX: &str = "Ativo ";

/// Build assets from imported rows. Row 0 is the header and is skipped;
/// rows whose trimmed code is empty are dropped. Each asset's id is its
/// `"{code}-{row}"` key, so repeated codes still yield distinct assets.
pub fn load(rows: &[RawRow]) -> Vec<Asset> {
    load_with_placeholder(rows, DEFAULT_PLACEHOLDER_PREFIX)
}

pub fn load_with_placeholder(rows: &[RawRow], placeholder_prefix: &str) -> Vec<Asset> {
    let assets: Vec<Asset> = rows
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(row_index, row)| {
            let code = row.code.trim();
            if code.is_empty() {
                return None;
            }
            let name = row.name.trim();
            let nome = if name.is_empty() {
                format!("{placeholder_prefix}{code}")
            } else {
                name.to_string()
            };
            Some(Asset::new(AssetKey::new(code, row_index), nome))
        })
        .collect();

    let skipped = rows.len().saturating_sub(1) - assets.len();
    if skipped > 0 {
        log::debug!("catalog import skipped {skipped} row(s) without a code");
    }
    assets
}

/// Read headerless, possibly ragged CSV into raw rows (header row included).
pub fn rows_from_csv(csv_data: &str, delimiter: u8) -> Result<Vec<RawRow>, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReconError::Csv(e.to_string()))?;
        rows.push(RawRow::new(
            record.get(0).unwrap_or(""),
            record.get(1).unwrap_or(""),
        ));
    }
    Ok(rows)
}

/// Immutable catalog with an id lookup for indeterminate-record checks.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    assets: Vec<Asset>,
    ids: HashSet<String>,
}

impl Catalog {
    pub fn from_rows(rows: &[RawRow], placeholder_prefix: &str) -> Self {
        Self::from_assets(load_with_placeholder(rows, placeholder_prefix))
    }

    pub fn from_assets(assets: Vec<Asset>) -> Self {
        let ids = assets.iter().map(|a| a.id.clone()).collect();
        Self { assets, ids }
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// The asset carrying this id.
    pub fn find_by_id(&self, id: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[(&str, &str)]) -> Vec<RawRow> {
        data.iter().map(|(c, n)| RawRow::new(*c, *n)).collect()
    }

    #[test]
    fn header_skipped_and_empty_codes_dropped() {
        let input = rows(&[
            ("Numero", "Nome"),
            ("100", "Cadeira"),
            ("   ", "Sem codigo"),
            ("", ""),
            (" 200 ", " Mesa "),
        ]);
        let assets = load(&input);
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].id, "100-1");
        assert_eq!(assets[0].key.code(), "100");
        assert_eq!(assets[1].id, "200-4");
        assert_eq!(assets[1].nome, "Mesa");
        assert_eq!(assets[1].key, AssetKey::new("200", 4));
    }

    #[test]
    fn missing_name_gets_placeholder() {
        let input = rows(&[("code", "name"), ("300", "  ")]);
        let assets = load(&input);
        assert_eq!(assets[0].nome, "Ativo 300");

        let custom = load_with_placeholder(&input, "Item ");
        assert_eq!(custom[0].nome, "Item 300");
    }

    #[test]
    fn duplicate_codes_get_distinct_keys() {
        let input = rows(&[("h", "h"), ("100", "A"), ("100", "B"), ("100", "C")]);
        let assets = load(&input);
        assert_eq!(assets.len(), 3);
        let ids: HashSet<_> = assets.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, HashSet::from(["100-1", "100-2", "100-3"]));
        assert!(assets.iter().all(|a| a.key.code() == "100"));
    }

    #[test]
    fn header_only_or_empty_input() {
        assert!(load(&[]).is_empty());
        assert!(load(&rows(&[("100", "Header looks like data")])).is_empty());
    }

    #[test]
    fn csv_rows_are_ragged_tolerant() {
        let csv = "Numero;Nome\n100;Cadeira\n200\n;Orfao\n";
        let rows = rows_from_csv(csv, b';').unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[2], RawRow::new("200", ""));

        let catalog = Catalog::from_rows(&rows, DEFAULT_PLACEHOLDER_PREFIX);
        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains_id("200-2"));
        assert!(!catalog.contains_id("200"));
        assert_eq!(catalog.find_by_id("200-2").unwrap().nome, "Ativo 200");
        assert!(!catalog.contains_id("Orfao"));
    }
}
