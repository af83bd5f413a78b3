//! Error types shared by the pipeline stages.

use std::path::PathBuf;

use thiserror::Error;

/// A request against the remote calendar that did not yield a body.
///
/// Callers log it and carry on with the next item.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request for {object} failed")]
    Transport {
        object: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request for {object} returned HTTP {status}")]
    Status { object: String, status: u16 },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("malformed image file name `{0}`")]
    Parse(String),
    #[error("directory `{}` not found", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
