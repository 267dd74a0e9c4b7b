use thiserror::Error;

/// Run-aborting engine errors.
///
/// Row-level data defects never surface here; they become rejections or
/// verdicts inside the report. Only configuration problems and reference
/// tables that break a required uniqueness end a run.
#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (missing table, rate out of range, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// A table the domain requires was not supplied.
    #[error("missing table: {0}")]
    MissingTable(String),

    /// Missing required column in input data.
    #[error("table '{table}': missing column '{column}'")]
    MissingColumn { table: String, column: String },

    /// A reference table that must be unique defines the same key twice.
    #[error("reference table '{table}': duplicate definition for key '{key}'")]
    DuplicateReference { table: String, key: String },

    /// CSV read error.
    #[error("table '{table}': {message}")]
    Csv { table: String, message: String },

    /// Report serialization failed.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
