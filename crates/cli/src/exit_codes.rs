//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 2       | Universal        | CLI usage error (bad args)               |
//! | 60-69   | audit            | Referral audit pipeline codes            |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `audit_exit_code` or the command's error handling

use refaudit_recon::ReconError;

// =============================================================================
// Universal (0, 2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Audit (60-69)
// =============================================================================

/// Config file unreadable, malformed, or fails validation.
pub const EXIT_AUDIT_CONFIG: u8 = 60;

/// Input table missing, missing a required column, or holding a value
/// that does not parse.
pub const EXIT_AUDIT_INPUT: u8 = 61;

/// Duplicate join keys under `on_duplicate = "error"`.
pub const EXIT_AUDIT_DUPLICATE: u8 = 62;

/// Report or summary could not be written.
pub const EXIT_AUDIT_OUTPUT: u8 = 63;

// =============================================================================
// Engine Error Mapping
// =============================================================================

/// Map an engine error to its exit code.
pub fn audit_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_AUDIT_CONFIG,
        ReconError::MissingColumn { .. }
        | ReconError::DateParse { .. }
        | ReconError::NumberParse { .. }
        | ReconError::BoolParse { .. }
        | ReconError::Csv { .. }
        | ReconError::Io(_) => EXIT_AUDIT_INPUT,
        ReconError::DuplicateKeys(_) => EXIT_AUDIT_DUPLICATE,
    }
}
