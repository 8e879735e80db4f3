use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Missing required columns for {source_id}: {}", missing.join(", "))]
    Schema {
        source_id: String,
        missing: Vec<String>,
    },

    #[error("Could not clean column {column}: {reason}")]
    Cleaning { column: String, reason: String },

    #[error("Column {column} still holds an unclean value at row {row}: {value}")]
    UncleanData {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Table error: {0}")]
    Table(String),
}

pub type Result<T> = std::result::Result<T, EtlError>;

/// Which [`EtlError`] variant a failure was, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Schema,
    Cleaning,
    UncleanData,
    Persistence,
    Csv,
    Io,
    Toml,
    Json,
    Config,
    Table,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Schema => "schema",
            ErrorKind::Cleaning => "cleaning",
            ErrorKind::UncleanData => "unclean_data",
            ErrorKind::Persistence => "persistence",
            ErrorKind::Csv => "csv",
            ErrorKind::Io => "io",
            ErrorKind::Toml => "toml",
            ErrorKind::Json => "json",
            ErrorKind::Config => "config",
            ErrorKind::Table => "table",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EtlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EtlError::NotFound { .. } => ErrorKind::NotFound,
            EtlError::Schema { .. } => ErrorKind::Schema,
            EtlError::Cleaning { .. } => ErrorKind::Cleaning,
            EtlError::UncleanData { .. } => ErrorKind::UncleanData,
            EtlError::Persistence { .. } => ErrorKind::Persistence,
            EtlError::Csv(_) => ErrorKind::Csv,
            EtlError::Io(_) => ErrorKind::Io,
            EtlError::Toml(_) => ErrorKind::Toml,
            EtlError::Json(_) => ErrorKind::Json,
            EtlError::Config(_) => ErrorKind::Config,
            EtlError::Table(_) => ErrorKind::Table,
        }
    }
}
