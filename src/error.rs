use thiserror::Error;

/// Failures talking to the generative text service.
///
/// None of these ever escape the pipeline: the normalizer passes the input
/// through and the extractor switches to the regex heuristics.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("quota exhausted ({status}): {body}")]
    Quota { status: u16, body: String },

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("service returned no text")]
    EmptyResponse,

    #[error("{0} env var required for this backend")]
    MissingApiKey(String),

    #[error("no generative backend configured")]
    Disabled,
}

/// Errors surfaced by the collaborators around the core (config, storage,
/// document output).
#[derive(Error, Debug)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("PDF error: {0}")]
    Document(#[from] lopdf::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

pub type Result<T> = std::result::Result<T, AppError>;
