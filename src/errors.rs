use std::path::PathBuf;
use thiserror::Error;

/// The central error type for raslog-audit.
///
/// Only structural misconfiguration and table I/O fail a run. Degraded switch
/// data (unresolved joins, unparseable dates, unrecognized messages) resolves
/// to nulls inside the pipeline and never reaches this type.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Pattern error: {0}")]
    Pattern(#[from] PatternError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum PatternError {
    #[error("Rule '{name}' has an invalid regex: {source}")]
    InvalidRegex {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid ignore_message pattern: {0}")]
    InvalidIgnorePattern(#[source] regex::Error),

    #[error("Rule '{name}' is defined more than once")]
    DuplicateRule { name: String },

    #[error("Rule '{name}' targets {fields} fields but its regex has {groups} capture groups")]
    GroupMismatch {
        name: String,
        fields: usize,
        groups: usize,
    },

    #[error("Rule '{name}' has neither target fields nor a condition")]
    EmptyRule { name: String },

    #[error("Enabled rule '{name}' is not defined")]
    UnknownRule { name: String },
}

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Input table '{table}' not found in {dir} (expected {table}.json or {table}.csv)")]
    Missing { table: String, dir: PathBuf },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed table '{table}': {message}")]
    Malformed { table: String, message: String },
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AuditError>;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_INPUT_ERROR: u8 = 3;
pub const EXIT_OUTPUT_ERROR: u8 = 4;

/// Determine the appropriate process exit code for an error.
pub fn get_exit_code(e: &anyhow::Error) -> u8 {
    if let Some(audit_err) = e.downcast_ref::<AuditError>() {
        return match audit_err {
            AuditError::Config(_) | AuditError::Pattern(_) => EXIT_CONFIG_ERROR,
            AuditError::Input(_) => EXIT_INPUT_ERROR,
            AuditError::Output(_) => EXIT_OUTPUT_ERROR,
            AuditError::Other(inner) => get_exit_code(inner),
            AuditError::Internal(_) => EXIT_ERROR,
        };
    }

    // Direct enum unwraps fallback
    if e.downcast_ref::<PatternError>().is_some() {
        return EXIT_CONFIG_ERROR;
    }
    if e.downcast_ref::<InputError>().is_some() {
        return EXIT_INPUT_ERROR;
    }
    if e.downcast_ref::<OutputError>().is_some() {
        return EXIT_OUTPUT_ERROR;
    }

    // Errors raised with .context() keep the typed cause in the chain
    for cause in e.chain() {
        if let Some(audit_err) = cause.downcast_ref::<AuditError>() {
            return match audit_err {
                AuditError::Config(_) | AuditError::Pattern(_) => EXIT_CONFIG_ERROR,
                AuditError::Input(_) => EXIT_INPUT_ERROR,
                AuditError::Output(_) => EXIT_OUTPUT_ERROR,
                _ => EXIT_ERROR,
            };
        }
        if cause.downcast_ref::<PatternError>().is_some() {
            return EXIT_CONFIG_ERROR;
        }
        if cause.downcast_ref::<InputError>().is_some() {
            return EXIT_INPUT_ERROR;
        }
        if cause.downcast_ref::<OutputError>().is_some() {
            return EXIT_OUTPUT_ERROR;
        }
    }

    // Fallback string matching only for cases where specific types aren't available
    let msg = e.to_string().to_lowercase();
    if msg.contains("config") {
        return EXIT_CONFIG_ERROR;
    }

    EXIT_ERROR
}
