use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum TreemapError {
    #[error("invalid tree id: {0}")]
    InvalidTreeId(String),

    #[error("invalid species id: {0}")]
    InvalidSpeciesId(String),

    #[error("tree map request failed: {0}")]
    ApiHttp(String),

    #[error("tree map returned status {status}: {message}")]
    ApiStatus { status: u16, message: String },

    #[error("failed to decode tree map response: {0}")]
    ApiDecode(String),

    #[error("image request failed: {0}")]
    ImageHttp(String),

    #[error("image server returned status {status}")]
    ImageStatus { status: u16 },

    #[error("failed to read input {path}: {message}")]
    #[diagnostic(help("check that the input file exists and is readable"))]
    Input { path: String, message: String },

    #[error("failed to write output {path}: {message}")]
    Output { path: String, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),
}
