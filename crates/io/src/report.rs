// Report export: CSV, JSON and the per-location text listing

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use inventa_recon::model::{LocationSection, ReconciliationReport};
use inventa_recon::ReportRow;

use crate::error::IoError;

/// Write report rows as CSV with a `codigo,nome,status` header.
pub fn write_csv(rows: &[ReportRow], path: &Path) -> Result<(), IoError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write report rows as a JSON array of `{codigo, nome, status}` objects.
pub fn write_json(rows: &[ReportRow], path: &Path) -> Result<(), IoError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, rows)?;
    writer.flush()?;
    Ok(())
}

pub fn write_review_json(report: &ReconciliationReport, path: &Path) -> Result<(), IoError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush()?;
    Ok(())
}

/// Render verifications grouped by location:
///
/// ```text
/// Sala 01 (2)
///   100  Cadeira  2024-03-01 09:05  camera
///   200  Mesa  2024-03-01 09:07  manual  (etiqueta gasta)
/// ```
pub fn render_text(sections: &[LocationSection]) -> String {
    let mut out = String::new();
    for (i, section) in sections.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "{} ({})", section.ambiente, section.records.len());
        for record in &section.records {
            let _ = write!(
                out,
                "  {}  {}  {}  {}",
                record.asset_id,
                record.nome,
                record.data_hora.format("%Y-%m-%d %H:%M"),
                record.tipo_verificacao
            );
            if let Some(notes) = &record.observacoes {
                let _ = write!(out, "  ({notes})");
            }
            out.push('\n');
        }
    }
    out
}

pub fn write_text(sections: &[LocationSection], path: &Path) -> Result<(), IoError> {
    std::fs::write(path, render_text(sections))?;
    Ok(())
}
