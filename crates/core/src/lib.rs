//! # No-show Core
//!
//! Core logic for the appointment no-show prediction system.
//!
//! This crate contains the data pipeline and the inference service:
//! - Synthetic appointment records and their dataset file format
//! - The stream writer that seeds the dataset and keeps appending batches
//! - The process controller that runs the stream writer as a separate process
//! - The prediction service that validates requests and runs them through a loaded artifact
//!
//! **No API concerns**: HTTP servers and routing belong in `api-rest`.

pub mod config;
pub mod constants;
pub mod controller;
pub mod dataset;
pub mod error;
pub mod prediction;
pub mod record;
pub mod stream;
pub mod synthesizer;
pub mod training;
pub mod validation;

pub use api_shared::messages;

pub use config::{CoreConfig, GenerationSettings};
pub use constants::*;
pub use controller::{
    GenerationHandle, GenerationStatus, GeneratorCommand, ProcessController, SessionInfo,
};
pub use error::{CoreError, CoreResult, PredictionError};
pub use prediction::{Prediction, PredictionService};
pub use record::{AppointmentFeatures, AppointmentRecord};
pub use stream::{GenerationSession, StreamWriter};
pub use synthesizer::Synthesizer;

pub use noshow_model::{ModelArtifact, ModelError, ModelStore, TrainingConfig};
pub use noshow_types::{Label, Probability};
