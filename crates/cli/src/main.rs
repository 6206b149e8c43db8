// Inventa CLI - asset verification from the terminal or a scanner script

mod data_dir;
mod exit_codes;
mod locations;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};

use inventa_io::IoError;
use inventa_recon::export::by_location;
use inventa_recon::{
    AssetKey, CaptureMethod, Collection, FinalReport, ProgressSnapshot, ReconError, RecordOutcome,
    ScanOutcome, Scope,
};

use data_dir::DataDir;
use exit_codes::{
    EXIT_CATALOG_PARSE, EXIT_CONFIG, EXIT_IO, EXIT_LOCATION_EXISTS,
    EXIT_LOCATION_INVALID, EXIT_LOCATION_UNKNOWN, EXIT_NOTHING_TO_EXPORT,
    EXIT_SCAN_ALREADY_RECORDED, EXIT_SCAN_NOT_FOUND, EXIT_STORE, EXIT_SUCCESS,
    EXIT_UNDO_NOT_FOUND, EXIT_USAGE,
};
use locations::{cmd_locations, LocationCommands};

#[derive(Parser)]
#[command(name = "inventa")]
#[command(about = "Verify physical assets against an imported catalog")]
#[command(version)]
struct Cli {
    /// Directory holding inventa.db and inventa.toml
    #[arg(long, global = true, env = "INVENTA_DATA_DIR", value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a catalog CSV (column 1 = code, column 2 = name), replacing the current one
    #[command(after_help = "\
Examples:
  inventa import patrimonio.csv
  inventa import export.csv --name 'Patrimonio 2024'")]
    Import {
        file: PathBuf,

        /// Name shown for this import (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Match a scanned code and record it as verified in a location
    #[command(after_help = "\
Examples:
  inventa scan 100-1 --location 'Sala 01'
  inventa scan PAT00456 --location Almoxarifado --manual --notes 'etiqueta gasta'
  inventa scan 200 --location ALL
  inventa scan 100-1-6 --exact --location 'Sala 01'")]
    Scan {
        code: String,

        /// Treat CODE as an asset id (see `list` or `review`) instead of matching it
        #[arg(long)]
        exact: bool,

        /// Location the asset was seen in (ALL or the general label records under the general scope)
        #[arg(long, short = 'l')]
        location: String,

        /// Code was typed rather than read by the camera
        #[arg(long)]
        manual: bool,

        #[arg(long)]
        notes: Option<String>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove a verification
    Undo {
        asset_id: String,

        #[arg(long, short = 'l')]
        location: String,
    },

    /// Show verification progress (all locations, or one)
    Progress {
        #[arg(long, short = 'l')]
        location: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// List verifications (all locations, or one)
    List {
        #[arg(long, short = 'l')]
        location: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Show the current catalog import
    Info {
        #[arg(long)]
        json: bool,
    },

    /// Manage locations
    #[command(subcommand)]
    Locations(LocationCommands),

    /// Write the final report of present assets
    #[command(after_help = "\
Examples:
  inventa finalize --output relatorio.csv
  inventa finalize --output relatorio.json --format json
  inventa finalize --output relatorio.csv --clear")]
    Finalize {
        #[arg(long, short = 'o')]
        output: PathBuf,

        #[arg(long, short = 'f', value_enum, default_value = "csv")]
        format: ReportFormat,

        /// Clear catalog and verifications once the report is written
        #[arg(long)]
        clear: bool,
    },

    /// Review present, missing and unexpected assets for a scope
    Review {
        #[arg(long, short = 'l')]
        location: Option<String>,

        #[arg(long)]
        json: bool,

        /// Also write the review as JSON to a file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Delete the catalog and every verification (locations are kept)
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Csv,
    Json,
    /// Every verification of a catalog asset, grouped by location
    Text,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    let data_dir = DataDir::resolve(cli.data_dir);
    log::debug!("data dir: {}", data_dir.root().display());

    let result = match cli.command {
        Commands::Import { file, name } => cmd_import(&data_dir, &file, name),
        Commands::Scan {
            code,
            exact,
            location,
            manual,
            notes,
            json,
        } => cmd_scan(&data_dir, &code, exact, &location, manual, notes.as_deref(), json),
        Commands::Undo { asset_id, location } => cmd_undo(&data_dir, &asset_id, &location),
        Commands::Progress { location, json } => cmd_progress(&data_dir, location, json),
        Commands::List { location, json } => cmd_list(&data_dir, location, json),
        Commands::Info { json } => cmd_info(&data_dir, json),
        Commands::Locations(cmd) => cmd_locations(&data_dir, cmd),
        Commands::Finalize {
            output,
            format,
            clear,
        } => cmd_finalize(&data_dir, &output, format, clear),
        Commands::Review {
            location,
            json,
            output,
        } => cmd_review(&data_dir, location, json, output),
        Commands::Clear { yes } => cmd_clear(&data_dir, yes),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError {
            code,
            message,
            hint,
        }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_USAGE,
            message: msg.into(),
            hint: None,
        }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_IO,
            message: msg.into(),
            hint: None,
        }
    }

    /// Exit with `code` without printing an error line. For outcomes that
    /// already explained themselves on stdout/stderr.
    pub fn quiet(code: u8) -> Self {
        Self {
            code,
            message: String::new(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<IoError> for CliError {
    fn from(err: IoError) -> Self {
        let code = match &err {
            IoError::Io(_) | IoError::Json(_) => EXIT_IO,
            IoError::Csv(_) => EXIT_CATALOG_PARSE,
            IoError::Sqlite(_) | IoError::Corrupt(_) => EXIT_STORE,
        };
        Self {
            code,
            message: err.to_string(),
            hint: None,
        }
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let (code, hint) = match &err {
            ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => (EXIT_CONFIG, None),
            ReconError::Csv(_) => (EXIT_CATALOG_PARSE, None),
            ReconError::EmptyLocationName => (EXIT_LOCATION_INVALID, None),
            ReconError::LocationExists(_) => (EXIT_LOCATION_EXISTS, None),
            ReconError::UnknownLocation(_) => (
                EXIT_LOCATION_UNKNOWN,
                Some("see `inventa locations list`".to_string()),
            ),
        };
        Self {
            code,
            message: err.to_string(),
            hint,
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let out = serde_json::to_string_pretty(value).map_err(|e| CliError::io(e.to_string()))?;
    println!("{out}");
    Ok(())
}

/// A scope given on the command line must be the general scope or a
/// registered location.
fn checked_scope(collection: &Collection, name: &str) -> Result<Scope, CliError> {
    let scope = collection.scope(name);
    if let Scope::Location(location) = &scope {
        if !collection.locations().iter().any(|l| l == location) {
            return Err(ReconError::UnknownLocation(location.clone()).into());
        }
    }
    Ok(scope)
}

fn optional_scope(collection: &Collection, name: Option<&str>) -> Result<Scope, CliError> {
    match name {
        Some(name) => checked_scope(collection, name),
        None => Ok(Scope::General),
    }
}

// ============================================================================
// import
// ============================================================================

fn cmd_import(data_dir: &DataDir, file: &Path, name: Option<String>) -> Result<(), CliError> {
    let rows = inventa_io::csv::read_catalog_rows(file)
        .map_err(|e| CliError::from(e).with_hint(format!("while reading {}", file.display())))?;
    let file_name = name.unwrap_or_else(|| {
        file.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string())
    });

    let (mut store, mut collection) = data_dir.open()?;
    let info = collection.import(&rows, &file_name, Utc::now());
    if let Some(meta) = collection.meta() {
        store.replace_catalog(collection.catalog(), meta)?;
    }

    println!("imported {} asset(s) from '{}'", info.total, info.file_name);
    if !collection.ledger().is_empty() {
        eprintln!(
            "note: {} existing verification(s) kept",
            collection.ledger().len()
        );
    }
    Ok(())
}

// ============================================================================
// scan / undo
// ============================================================================

fn cmd_scan(
    data_dir: &DataDir,
    code: &str,
    exact: bool,
    location: &str,
    manual: bool,
    notes: Option<&str>,
    json: bool,
) -> Result<(), CliError> {
    let (store, mut collection) = data_dir.open()?;
    checked_scope(&collection, location)?;

    let method = if manual {
        CaptureMethod::Manual
    } else {
        CaptureMethod::Camera
    };
    let mut outcome = if exact {
        collection.verify(code, location, method, notes, Utc::now())
    } else {
        collection.scan(code, location, method, notes, Utc::now())
    };

    // The store has the final say: another process may have recorded the
    // same pair since the collection was loaded.
    if let ScanOutcome::Recorded { record, .. } = &outcome {
        if store.insert_verification(record)? == RecordOutcome::AlreadyRecorded {
            outcome = ScanOutcome::AlreadyRecorded {
                asset_id: record.asset_id.clone(),
                ambiente: record.ambiente.clone(),
            };
        }
    }

    if json {
        print_json(&outcome)?;
    }

    match outcome {
        ScanOutcome::Recorded { record, rule } => {
            if !json {
                println!(
                    "verified {} ({}) in {}",
                    record.asset_id, record.nome, record.ambiente
                );
            }
            if let Some(rule) = rule {
                log::debug!("matched by {rule:?}");
            }
            Ok(())
        }
        ScanOutcome::AlreadyRecorded { asset_id, ambiente } => {
            if !json {
                eprintln!("already verified: {asset_id} in {ambiente}");
            }
            Err(CliError::quiet(EXIT_SCAN_ALREADY_RECORDED))
        }
        ScanOutcome::NotFound { code } => {
            if !json && exact {
                eprintln!("not found: no asset has id '{code}'");
            } else if !json {
                eprintln!("not found: no asset matches '{code}'");
                if collection.catalog().is_empty() {
                    eprintln!("hint:  no catalog imported; run `inventa import <file>` first");
                }
            }
            Err(CliError::quiet(EXIT_SCAN_NOT_FOUND))
        }
    }
}

fn cmd_undo(data_dir: &DataDir, asset_id: &str, location: &str) -> Result<(), CliError> {
    let (store, collection) = data_dir.open()?;
    let ambiente = collection.config().location_label(location);

    if store.delete_verification(asset_id.trim(), &ambiente)? {
        println!("removed verification of {} in {}", asset_id.trim(), ambiente);
        Ok(())
    } else {
        eprintln!(
            "nothing to undo: {} is not verified in {}",
            asset_id.trim(),
            ambiente
        );
        Err(CliError::quiet(EXIT_UNDO_NOT_FOUND))
    }
}

// ============================================================================
// progress / list / info
// ============================================================================

fn print_progress(snapshot: &ProgressSnapshot) {
    let mut line = format!(
        "{:<16} {:>5}/{:<5} {:>6.1}%  ({} unverified)",
        snapshot.scope.to_string(),
        snapshot.verified,
        snapshot.total,
        snapshot.percentage,
        snapshot.unverified
    );
    if snapshot.indeterminate > 0 {
        line.push_str(&format!(", {} indeterminate", snapshot.indeterminate));
    }
    println!("{line}");
}

fn cmd_progress(data_dir: &DataDir, location: Option<String>, json: bool) -> Result<(), CliError> {
    let (_, collection) = data_dir.open()?;

    match location {
        Some(name) => {
            let snapshot = collection.progress(&checked_scope(&collection, &name)?);
            if json {
                print_json(&snapshot)?;
            } else {
                print_progress(&snapshot);
            }
        }
        None => {
            let snapshots = collection.progress_by_location();
            if json {
                print_json(&snapshots)?;
            } else {
                snapshots.iter().for_each(print_progress);
            }
        }
    }
    Ok(())
}

fn cmd_list(data_dir: &DataDir, location: Option<String>, json: bool) -> Result<(), CliError> {
    let (_, collection) = data_dir.open()?;
    let scope = optional_scope(&collection, location.as_deref())?;
    let records: Vec<_> = collection
        .ledger()
        .list_by_scope(&scope)
        .into_iter()
        .cloned()
        .collect();

    if json {
        print_json(&records)?;
    } else if records.is_empty() {
        println!("no verifications in {scope}");
    } else {
        print!("{}", inventa_io::report::render_text(&by_location(&records)));
    }
    Ok(())
}

fn cmd_info(data_dir: &DataDir, json: bool) -> Result<(), CliError> {
    let (_, collection) = data_dir.open()?;
    let info = collection.info();

    if json {
        return print_json(&info);
    }
    match info {
        Some(info) => {
            println!("catalog:      {}", info.file_name);
            println!("imported at:  {}", info.imported_at.format("%Y-%m-%d %H:%M:%S UTC"));
            println!("assets:       {}", info.total);
            println!("verifications: {}", collection.ledger().len());
            println!("locations:    {}", collection.locations().join(", "));
        }
        None => {
            println!("no catalog imported");
        }
    }
    Ok(())
}

// ============================================================================
// finalize / review / clear
// ============================================================================

fn cmd_finalize(
    data_dir: &DataDir,
    output: &Path,
    format: ReportFormat,
    clear: bool,
) -> Result<(), CliError> {
    let (mut store, collection) = data_dir.open()?;

    let rows = match collection.finalize() {
        FinalReport::Empty => {
            eprintln!("nothing to export: no catalog asset has been verified");
            return Err(CliError::quiet(EXIT_NOTHING_TO_EXPORT));
        }
        FinalReport::Ready(rows) => rows,
    };

    let written = match format {
        ReportFormat::Csv => {
            inventa_io::report::write_csv(&rows, output)?;
            format!("{} asset(s)", rows.len())
        }
        ReportFormat::Json => {
            inventa_io::report::write_json(&rows, output)?;
            format!("{} asset(s)", rows.len())
        }
        // Every sighting, so an asset seen in two locations is listed twice.
        ReportFormat::Text => {
            let known: Vec<_> = collection
                .ledger()
                .records()
                .iter()
                .filter(|r| collection.catalog().contains_id(&r.asset_id))
                .cloned()
                .collect();
            let sections = by_location(&known);
            inventa_io::report::write_text(&sections, output)?;
            format!(
                "{} verification(s) across {} location(s)",
                known.len(),
                sections.len()
            )
        }
    };
    println!("wrote {written} to {}", output.display());

    if clear {
        store.clear_collection()?;
        println!("collection cleared");
    }
    Ok(())
}

fn cmd_review(
    data_dir: &DataDir,
    location: Option<String>,
    json: bool,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let (_, collection) = data_dir.open()?;
    let scope = optional_scope(&collection, location.as_deref())?;
    let report = collection.reconcile(&scope);

    if let Some(path) = &output {
        inventa_io::report::write_review_json(&report, path)?;
    }

    if json {
        return print_json(&report);
    }

    print_progress(&report.summary);
    for (title, rows) in [
        ("present", &report.present),
        ("missing", &report.missing),
        ("unexpected", &report.unexpected),
    ] {
        println!("\n{title} ({})", rows.len());
        for row in rows {
            let key = AssetKey::from_raw(row.codigo.as_str());
            if key.code() == row.codigo {
                println!("  {}  {}", row.codigo, row.nome);
            } else {
                println!("  {}  {}  [{}]", key.code(), row.nome, row.codigo);
            }
        }
    }
    Ok(())
}

fn cmd_clear(data_dir: &DataDir, yes: bool) -> Result<(), CliError> {
    if !yes {
        return Err(CliError::args("clear deletes the catalog and every verification")
            .with_hint("re-run with --yes to confirm"));
    }
    let mut store = data_dir.open_store()?;
    store.clear_collection()?;
    println!("collection cleared");
    Ok(())
}
