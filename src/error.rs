use thiserror::Error;

/// Failure talking to a remote collaborator (storage backend or compute server).
///
/// Every variant is transient from the save loop's point of view: a failed
/// `set_snapshot` is retried regardless of which variant it produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Non-2xx response without a structured description.
    #[error("HTTP error {status} {reason}")]
    Status { status: u16, reason: String },
    /// Non-2xx response whose body carried a `detail` message.
    #[error("{detail} (HTTP {status})")]
    Detail { status: u16, detail: String },
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),
    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The response arrived but could not be decoded.
    #[error(transparent)]
    Malformed(#[from] DecodeError),
}

/// A persisted document failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("unknown built-in search set `{0}`")]
    UnknownSearchSet(String),
    #[error("invalid document: {0}")]
    Invalid(String),
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::Invalid(err.to_string())
    }
}

/// Errors raised by the project model and its operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("invalid desired count {0}")]
    InvalidDesiredCount(i64),
    #[error("no scout images available to pad the negative set")]
    ScoutImagesExhausted,
    #[error("snapshot {0} not found")]
    SnapshotNotFound(String),
    #[error("image not found in training set")]
    ImageNotFound,
    #[error("can't save search set because it has no images")]
    EmptySearchSet,
    #[error("config error: {0}")]
    Config(String),
}
