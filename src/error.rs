/// Error types shared across the application
///
/// Nothing here is fatal to the UI: caption and intake failures are
/// recovered at the job boundary (see `intake::caption`), so these
/// errors mostly travel as far as a `warn!` line.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("caption service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("caption service did not answer within {0:?}")]
    Timeout(Duration),

    #[error("caption service returned no text")]
    EmptyResponse,

    #[error("environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("no memory with id {0}")]
    UnknownMemory(String),
}

pub type Result<T> = std::result::Result<T, Error>;
