//! # No-show model
//!
//! The inference artifact used by the prediction service.
//!
//! An artifact is two fitted stages composed into one value:
//! - a [`FeatureTransformer`] that imputes, scales and one-hot encodes raw feature rows
//! - a [`LogisticRegression`] classifier over the encoded vector
//!
//! Artifacts are fitted once (see [`ModelArtifact::fit`]), persisted as a single JSON document
//! through [`ModelStore`], and then only ever read.
//!
//! **No domain concerns**: the appointment schema and dataset handling live in `noshow-core`.

mod artifact;
mod classifier;
mod metrics;
mod preprocessing;
mod store;

pub use artifact::{ModelArtifact, ARTIFACT_FORMAT_VERSION};
pub use classifier::{LogisticRegression, TrainingConfig};
pub use metrics::{stratified_split, ConfusionMatrix, Evaluation};
pub use preprocessing::{
    CategoricalColumn, FeatureRow, FeatureSchema, FeatureTransformer, NumericColumn,
};
pub use store::ModelStore;

pub use noshow_types::{Label, Probability};

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model artifact not found at {}", .0.display())]
    NotFound(PathBuf),
    #[error("model artifact at {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
    #[error("failed to read model artifact: {0}")]
    Read(std::io::Error),
    #[error("failed to write model artifact: {0}")]
    Write(std::io::Error),
    #[error("failed to serialize model artifact: {0}")]
    Serialization(serde_json::Error),
    #[error("cannot fit on an empty training set")]
    EmptyTrainingSet,
    #[error("got {rows} feature rows but {labels} labels")]
    LabelCountMismatch { rows: usize, labels: usize },
    #[error("feature row has {actual_numeric} numeric and {actual_categorical} categorical values, expected {expected_numeric} and {expected_categorical}")]
    SchemaMismatch {
        expected_numeric: usize,
        expected_categorical: usize,
        actual_numeric: usize,
        actual_categorical: usize,
    },
    #[error("column '{column}' has no observed values to fit on")]
    NoObservedValues { column: String },
    #[error("classifier expects {expected} inputs but the transformer produced {actual}")]
    WidthMismatch { expected: usize, actual: usize },
    #[error("classifier produced a non-finite score")]
    NonFiniteScore,
}

pub type ModelResult<T> = std::result::Result<T, ModelError>;
