//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract - scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 60-69   | run / config     | Reconciliation run and config codes      |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Run / config (60-69)
// =============================================================================

/// Config file failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 60;

/// A required input column (readings date/time, bunker date/time/fuel/mass) is absent.
pub const EXIT_MISSING_COLUMN: u8 = 61;

/// An input file could not be read or a bunker mass could not be parsed.
pub const EXIT_INPUT_READ: u8 = 62;

/// The workbook or JSON report could not be written.
pub const EXIT_OUTPUT_WRITE: u8 = 63;

/// `--fail-on-missing` is set and some sheet's MISSING exceeds the tolerance.
/// The workbook is still written.
pub const EXIT_MISSING_FUEL: u8 = 64;

// =============================================================================
// Engine Error Mapping
// =============================================================================

use fuelcheck_recon::ReconError;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::MissingColumn { .. } => EXIT_MISSING_COLUMN,
        ReconError::MassParse { .. } | ReconError::Io(_) => EXIT_INPUT_READ,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_INVALID_CONFIG,
            EXIT_MISSING_COLUMN,
            EXIT_INPUT_READ,
            EXIT_OUTPUT_WRITE,
            EXIT_MISSING_FUEL,
        ];
        let unique: std::collections::HashSet<u8> = codes.iter().copied().collect();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn engine_errors_map_to_run_range() {
        let missing = ReconError::MissingColumn { dataset: "readings".into(), column: "Date_UTC".into() };
        assert_eq!(recon_exit_code(&missing), EXIT_MISSING_COLUMN);
        assert_eq!(recon_exit_code(&ReconError::ConfigValidation("x".into())), EXIT_INVALID_CONFIG);
        assert_eq!(
            recon_exit_code(&ReconError::MassParse { row: 3, value: "lots".into() }),
            EXIT_INPUT_READ
        );
    }
}
