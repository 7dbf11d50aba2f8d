use crate::value::ValueKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("The data type is not supported: {0}")]
    UnsupportedType(ValueKind),

    #[error("The settings store has been disposed")]
    Disposed,

    #[error("The settings store is opened in read-only mode")]
    ReadOnly,

    #[error("Invalid settings schema {schema}, field '{field}': {reason}")]
    InvalidSchema {
        schema: &'static str,
        field: String,
        reason: String,
    },

    #[error("Malformed stored value for '{key}': {reason}")]
    MalformedStoredValue { key: String, reason: String },

    #[error("Invalid setting key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Invalid key pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Invalid store location: {0}")]
    InvalidLocation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, SettingsError>;
