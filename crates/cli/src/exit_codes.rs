//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: month-end scripts branch on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | recon            | High-severity flags present              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 60-69   | recon            | Rule reconciliation outcomes             |
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

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Recon flagged (1)
// =============================================================================

/// At least one High-severity flag (high-risk transaction, unauthorized
/// access, unknown role), or a composite step errored.
pub const EXIT_RECON_FLAGGED: u8 = 1;

// =============================================================================
// Recon (60-69)
// =============================================================================

/// Only Medium-severity flags or rejected rows.
pub const EXIT_RECON_WARN: u8 = 60;

/// Config failed to parse or validate.
pub const EXIT_RECON_INVALID_CONFIG: u8 = 61;

/// Runtime error: unreadable file, malformed CSV, missing column, or a
/// reference table that breaks uniqueness.
pub const EXIT_RECON_RUNTIME: u8 = 62;
