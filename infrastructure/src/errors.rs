use aws_sdk_s3::primitives::ByteStreamError;
use serde_json::Error as SerdeError;
use std::io::Error as IOError;
use std::path::PathBuf;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    IOError(#[from] IOError),
    #[error("JSON error: {0}")]
    SerdeError(#[from] SerdeError),
    #[error("Template {file} has no field at {pointer}")]
    MissingField { file: PathBuf, pointer: String },
    #[error("Template {file} field at {pointer} is not a string")]
    NotAString { file: PathBuf, pointer: String },
    #[error("Unsupported template document {kind}: {source}")]
    UnsupportedTemplate {
        kind: &'static str,
        #[source]
        source: SerdeError,
    },
    #[error("Request build error: {0}")]
    BuildError(#[from] aws_sdk_quicksight::error::BuildError),
    #[error("S3 error: {0}")]
    S3Error(#[from] aws_sdk_s3::Error),
    #[error("QuickSight error: {0}")]
    QuickSightError(#[from] aws_sdk_quicksight::Error),
    #[error("Byte stream error: {0}")]
    ByteStreamError(#[from] ByteStreamError),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
