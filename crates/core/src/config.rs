//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the services, so no
//! code path reads process-wide environment variables while handling a request. The parsing
//! helpers take `Option<String>` values rather than reading the environment themselves, which
//! keeps them testable without mutating global state.

use crate::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_DATASET_PATH, DEFAULT_GENERATOR_BIN, DEFAULT_INTERVAL_SECS,
    DEFAULT_MODEL_PATH, DEFAULT_SEED_COUNT, GENERATOR_SUBCOMMAND,
};
use crate::controller::GeneratorCommand;
use crate::{CoreError, CoreResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Size and cadence of a generation session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationSettings {
    pub seed_count: u64,
    pub batch_size: u64,
    pub interval: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            seed_count: DEFAULT_SEED_COUNT,
            batch_size: DEFAULT_BATCH_SIZE,
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
        }
    }
}

impl GenerationSettings {
    /// Builds settings from optional raw values, falling back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidInput` if a value is not a non-negative integer, or if the batch
    /// size or interval is zero.
    pub fn from_env_values(
        seed_count: Option<String>,
        batch_size: Option<String>,
        interval_secs: Option<String>,
    ) -> CoreResult<Self> {
        let settings = Self {
            seed_count: parse_u64_value("NOSHOW_SEED_COUNT", seed_count, DEFAULT_SEED_COUNT)?,
            batch_size: parse_u64_value("NOSHOW_BATCH_SIZE", batch_size, DEFAULT_BATCH_SIZE)?,
            interval: Duration::from_secs(parse_u64_value(
                "NOSHOW_INTERVAL_SECS",
                interval_secs,
                DEFAULT_INTERVAL_SECS,
            )?),
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> CoreResult<()> {
        if self.batch_size == 0 {
            return Err(CoreError::InvalidInput("batch size must be at least 1".into()));
        }
        if self.interval.is_zero() {
            return Err(CoreError::InvalidInput(
                "generation interval must be at least 1 second".into(),
            ));
        }
        Ok(())
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    dataset_path: PathBuf,
    model_path: PathBuf,
    generation: GenerationSettings,
    generator_program: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(
        dataset_path: PathBuf,
        model_path: PathBuf,
        generation: GenerationSettings,
        generator_program: PathBuf,
    ) -> CoreResult<Self> {
        generation.validate()?;
        if generator_program.as_os_str().is_empty() {
            return Err(CoreError::InvalidInput(
                "generator program cannot be empty".into(),
            ));
        }
        if dataset_path.as_os_str().is_empty() {
            return Err(CoreError::InvalidInput("dataset path cannot be empty".into()));
        }

        Ok(Self {
            dataset_path,
            model_path,
            generation,
            generator_program,
        })
    }

    pub fn dataset_path(&self) -> &Path {
        &self.dataset_path
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn generation(&self) -> &GenerationSettings {
        &self.generation
    }

    pub fn generator_program(&self) -> &Path {
        &self.generator_program
    }

    /// The command line the process controller launches for a generation session.
    pub fn generator_command(&self) -> GeneratorCommand {
        GeneratorCommand::new(
            self.generator_program.clone(),
            vec![
                GENERATOR_SUBCOMMAND.to_string(),
                "--path".into(),
                self.dataset_path.display().to_string(),
                "--seed-count".into(),
                self.generation.seed_count.to_string(),
                "--batch-size".into(),
                self.generation.batch_size.to_string(),
                "--interval-secs".into(),
                self.generation.interval.as_secs().to_string(),
            ],
        )
    }
}

/// Resolve a path setting, using `default` when the value is absent or blank.
pub fn path_from_env_value(value: Option<String>, default: &str) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

/// Resolve the dataset path, model path and generator program from optional raw values.
pub fn paths_from_env_values(
    dataset_path: Option<String>,
    model_path: Option<String>,
    generator_program: Option<String>,
) -> (PathBuf, PathBuf, PathBuf) {
    (
        path_from_env_value(dataset_path, DEFAULT_DATASET_PATH),
        path_from_env_value(model_path, DEFAULT_MODEL_PATH),
        path_from_env_value(generator_program, DEFAULT_GENERATOR_BIN),
    )
}

fn parse_u64_value(name: &str, value: Option<String>, default: u64) -> CoreResult<u64> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    match value {
        None => Ok(default),
        Some(v) => v.parse::<u64>().map_err(|_| {
            CoreError::InvalidInput(format!("{name} must be a non-negative integer, got '{v}'"))
        }),
    }
}
