use std::fmt;

use thiserror::Error;

use crate::join::DuplicateKey;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (empty file name, two tables on one file, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// Missing required column in an input table.
    #[error("table '{table}': missing column '{column}'")]
    MissingColumn { table: String, column: String },
    /// Date or timestamp parse error.
    #[error("table '{table}', record '{record_id}': cannot parse {column} '{value}'")]
    DateParse {
        table: String,
        record_id: String,
        column: String,
        value: String,
    },
    /// Numeric parse error.
    #[error("table '{table}', record '{record_id}': cannot parse {column} '{value}' as a number")]
    NumberParse {
        table: String,
        record_id: String,
        column: String,
        value: String,
    },
    /// Boolean parse error.
    #[error("table '{table}', record '{record_id}': cannot parse {column} '{value}' as a boolean")]
    BoolParse {
        table: String,
        record_id: String,
        column: String,
        value: String,
    },
    /// Malformed CSV (ragged row, bad quoting).
    #[error("table '{table}': {message}")]
    Csv { table: String, message: String },
    /// Right-hand join keys that would fan out referral rows.
    #[error("{}", DuplicateList(.0))]
    DuplicateKeys(Vec<DuplicateKey>),
    /// IO error (report write, etc.).
    #[error("IO error: {0}")]
    Io(String),
}

struct DuplicateList<'a>(&'a [DuplicateKey]);

impl fmt::Display for DuplicateList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "duplicate join keys found:")?;
        for dup in self.0 {
            write!(f, "\n  {} key {:?} appears {} times", dup.join, dup.key, dup.count)?;
        }
        Ok(())
    }
}

impl From<std::io::Error> for ReconError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
