// Catalog CSV import

use std::io::Read;
use std::path::Path;

use inventa_recon::catalog::rows_from_csv;
use inventa_recon::RawRow;

use crate::error::IoError;

/// Read a catalog file into raw rows (header row included; the catalog loader
/// skips it). The delimiter is sniffed from the first lines.
pub fn read_catalog_rows(path: &Path) -> Result<Vec<RawRow>, IoError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    log::debug!(
        "reading catalog {} with delimiter {:?}",
        path.display(),
        delimiter as char
    );
    Ok(rows_from_csv(&content, delimiter)?)
}

/// Candidates, in tie-break order.
const DELIMITERS: [u8; 4] = [b';', b'\t', b',', b'|'];
const SAMPLE_LINES: usize = 20;

/// Pick the delimiter that separates code from name on the most sample rows.
///
/// Only the first two columns of a catalog matter, so a candidate is viable
/// when it splits the header line, and scores one point per sampled row it
/// splits. Falls back to `,` when nothing splits the header.
pub fn sniff_delimiter(content: &str) -> u8 {
    let sample = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SAMPLE_LINES)
        .collect::<Vec<_>>()
        .join("\n");

    let mut best = (b',', 0);
    for delimiter in DELIMITERS {
        let score = split_rows(&sample, delimiter);
        if score > best.1 {
            best = (delimiter, score);
        }
    }
    best.0
}

/// Rows with a code/name split under `delimiter`; zero unless the header splits.
fn split_rows(sample: &str, delimiter: u8) -> usize {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(sample.as_bytes());

    let widths: Vec<usize> = reader
        .records()
        .map(|record| record.map_or(1, |r| r.len()))
        .collect();
    match widths.first() {
        Some(&header) if header >= 2 => widths.iter().filter(|&&w| w >= 2).count(),
        _ => 0,
    }
}

/// Read file and convert to UTF-8 if needed (spreadsheet exports are often Windows-1252)
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let mut file = std::fs::File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    let bytes = match String::from_utf8(bytes) {
        Ok(s) => return Ok(s.trim_start_matches('\u{feff}').to_string()),
        Err(e) => e.into_bytes(),
    };
    log::debug!("{} is not UTF-8, decoding as Windows-1252", path.display());
    let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
    Ok(decoded.into_owned())
}
