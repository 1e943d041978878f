//!
//! src/errors.rs  Andrew Belles  Oct 12th, 2026
//!
//! Defines the error taxonomy of the etl job and conversions from
//! the http, json and sqlite layers
//!

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("config error: {0}")]
    Config(String),
    #[error("auth error: {0}")]
    Auth(String),
    #[error("failed to retrieve recently played tracks: status {status}")]
    Fetch { status: u16 },
    #[error("malformed item: {0}")]
    MalformedItem(String),
    #[error("primary key check violated: duplicate played_at {0}")]
    DuplicateKey(String),
    #[error("null value in record {index}: {field}")]
    NullValue { index: usize, field: &'static str },
    #[error("played at timestamp outside validation window: {0}")]
    TimestampOutOfRange(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("db error: {0}")]
    Db(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error)
}

impl EtlError {
    /// Short stable name used as the `error.kind` log field
    pub fn kind(&self) -> &'static str {
        match self {
            EtlError::Config(_)              => "config",
            EtlError::Auth(_)                => "auth",
            EtlError::Fetch { .. }           => "fetch",
            EtlError::MalformedItem(_)       => "malformed_item",
            EtlError::DuplicateKey(_)        => "duplicate_key",
            EtlError::NullValue { .. }       => "null_value",
            EtlError::TimestampOutOfRange(_) => "timestamp_out_of_range",
            EtlError::Http(_)                => "http",
            EtlError::Parse(_)               => "parse",
            EtlError::Db(_)                  => "db",
            EtlError::Io(_)                  => "io"
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EtlError::DuplicateKey(_)
                | EtlError::NullValue { .. }
                | EtlError::TimestampOutOfRange(_)
        )
    }
}

impl From<reqwest::Error> for EtlError {
    fn from(e: reqwest::Error) -> Self { EtlError::Http(e.to_string()) }
}

impl From<serde_json::Error> for EtlError {
    fn from(e: serde_json::Error) -> Self { EtlError::Parse(e.to_string()) }
}

impl From<sqlx::Error> for EtlError {
    fn from(e: sqlx::Error) -> Self { EtlError::Db(e.to_string()) }
}
