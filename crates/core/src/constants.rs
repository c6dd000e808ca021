//! Constants used throughout the no-show core crate.
//!
//! Default locations and cadences, kept in one place so the binaries, the controller and the
//! tests agree on them.

/// Default path of the streamed dataset file.
pub const DEFAULT_DATASET_PATH: &str = "data/raw/dataset_noshow_stream.csv";

/// Default path of the serialized model artifact.
pub const DEFAULT_MODEL_PATH: &str = "models/model_pipeline.json";

/// Default number of records written by the initial seed.
pub const DEFAULT_SEED_COUNT: u64 = 10_000;

/// Default number of records appended per batch.
pub const DEFAULT_BATCH_SIZE: u64 = 50;

/// Default pause between appended batches, in seconds.
pub const DEFAULT_INTERVAL_SECS: u64 = 5;

/// Default program spawned by the process controller.
pub const DEFAULT_GENERATOR_BIN: &str = "noshow";

/// CLI subcommand the controller passes to the generator program.
pub const GENERATOR_SUBCOMMAND: &str = "stream";

/// How long a generator gets to exit after a termination request before it is killed.
pub const GENERATOR_STOP_GRACE_SECS: u64 = 5;

/// Seed for the hold-out split used when training.
pub const DEFAULT_SPLIT_SEED: u64 = 42;

/// Share of the dataset held out for evaluation when training.
pub const TEST_FRACTION: f64 = 0.2;
