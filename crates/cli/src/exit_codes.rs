//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Scripts driving a scanner through `inventa scan` rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain     | Description                                   |
//! |---------|------------|-----------------------------------------------|
//! | 0       | Universal  | Success                                       |
//! | 2       | Universal  | CLI usage error (bad args, missing --yes)     |
//! | 3-9     | data       | Files, store, config, catalog parsing         |
//! | 10-19   | capture    | Scan/undo outcomes that are not failures      |
//! | 20-29   | locations  | Location registry codes                       |
//! | 30-39   | export     | Finalize codes                                |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0, 2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing confirmation.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Data (3-9)
// =============================================================================

/// Reading or writing a file failed.
pub const EXIT_IO: u8 = 3;

/// The state store could not be opened, read or written.
pub const EXIT_STORE: u8 = 4;

/// `inventa.toml` is malformed or fails validation.
pub const EXIT_CONFIG: u8 = 5;

/// The catalog file could not be parsed as CSV.
pub const EXIT_CATALOG_PARSE: u8 = 6;

// =============================================================================
// Capture (10-19) — informational, nothing was damaged
// =============================================================================

/// No catalog asset matches the scanned code.
pub const EXIT_SCAN_NOT_FOUND: u8 = 10;

/// The asset is already verified in that location.
pub const EXIT_SCAN_ALREADY_RECORDED: u8 = 11;

/// `undo` found no verification for the pair.
pub const EXIT_UNDO_NOT_FOUND: u8 = 12;

// =============================================================================
// Locations (20-29)
// =============================================================================

/// The named location is not registered.
pub const EXIT_LOCATION_UNKNOWN: u8 = 20;

/// A location with that name already exists (or it names the general scope).
pub const EXIT_LOCATION_EXISTS: u8 = 21;

/// Location name is empty.
pub const EXIT_LOCATION_INVALID: u8 = 22;

// =============================================================================
// Export (30-39)
// =============================================================================

/// Finalize found no verified catalog asset; no file was written.
pub const EXIT_NOTHING_TO_EXPORT: u8 = 30;
