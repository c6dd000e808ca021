use noshow_model::ModelError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to write dataset: {0}")]
    DatasetWrite(std::io::Error),
    #[error("failed to read dataset: {0}")]
    DatasetRead(std::io::Error),
    #[error("dataset header does not match the expected columns: {found}")]
    HeaderMismatch { found: String },
    #[error("malformed dataset row at line {line}: {reason}")]
    DatasetParse { line: usize, reason: String },
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("a generation session is already active")]
    GeneratorAlreadyActive,
    #[error("failed to spawn generator process: {0}")]
    GeneratorSpawn(std::io::Error),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Failures of a single prediction request.
///
/// Each variant corresponds to a distinct condition at the service boundary; none of them
/// affects any other request.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PredictionError {
    /// The request failed validation and never reached the model.
    #[error("invalid field '{field}': {reason}")]
    BadRequest { field: &'static str, reason: String },
    /// No artifact is loaded; only an operator restart can recover.
    #[error("the prediction model is not available; check the server logs")]
    ServiceUnavailable,
    /// The transform or classifier stage failed for this request.
    #[error("internal error while processing the request: {0}")]
    Internal(String),
}
