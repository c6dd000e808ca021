use clap::{Parser, Subcommand};
use noshow_core::messages::PredictReq;
use noshow_core::training::train_from_dataset;
use noshow_core::{
    GenerationSettings, ModelStore, PredictionService, StreamWriter, Synthesizer, TrainingConfig,
    DEFAULT_BATCH_SIZE, DEFAULT_DATASET_PATH, DEFAULT_INTERVAL_SECS, DEFAULT_MODEL_PATH,
    DEFAULT_SEED_COUNT, DEFAULT_SPLIT_SEED,
};
use noshow_cli::{shutdown_signal, stream_until};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "noshow")]
#[command(about = "No-show appointment dataset and model CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Overwrite the dataset with freshly generated records
    Seed {
        #[arg(long, default_value = DEFAULT_DATASET_PATH)]
        path: PathBuf,
        #[arg(long, default_value_t = DEFAULT_SEED_COUNT)]
        count: u64,
        /// First patient id
        #[arg(long, default_value_t = 1)]
        start_id: u64,
        /// Seed for reproducible output
        #[arg(long)]
        rng_seed: Option<u64>,
    },
    /// Seed the dataset, then append a batch every interval until terminated
    Stream {
        #[arg(long, default_value = DEFAULT_DATASET_PATH)]
        path: PathBuf,
        #[arg(long, default_value_t = DEFAULT_SEED_COUNT)]
        seed_count: u64,
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: u64,
        #[arg(long, default_value_t = DEFAULT_INTERVAL_SECS)]
        interval_secs: u64,
        /// Seed for reproducible output
        #[arg(long)]
        rng_seed: Option<u64>,
    },
    /// Fit a model artifact on the dataset and report hold-out metrics
    Train {
        #[arg(long, default_value = DEFAULT_DATASET_PATH)]
        data: PathBuf,
        #[arg(long, default_value = DEFAULT_MODEL_PATH)]
        out: PathBuf,
        #[arg(long, default_value_t = DEFAULT_SPLIT_SEED)]
        split_seed: u64,
    },
    /// Score one JSON prediction request against a model artifact
    Predict {
        #[arg(long, default_value = DEFAULT_MODEL_PATH)]
        model: PathBuf,
        /// Request body, e.g. '{"age": 40, "sex": "Femenino", ...}'
        #[arg(long)]
        request: String,
    },
}

fn synthesizer(rng_seed: Option<u64>) -> anyhow::Result<Synthesizer> {
    Ok(match rng_seed {
        Some(seed) => Synthesizer::seeded(seed)?,
        None => Synthesizer::from_entropy()?,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("noshow=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Seed {
            path,
            count,
            start_id,
            rng_seed,
        }) => {
            let mut writer = StreamWriter::new(path, synthesizer(rng_seed)?);
            let next_id = writer.seed(count, start_id)?;
            println!(
                "Wrote {} records to {} (next id {})",
                count,
                writer.path().display(),
                next_id
            );
        }
        Some(Commands::Stream {
            path,
            seed_count,
            batch_size,
            interval_secs,
            rng_seed,
        }) => {
            let settings = GenerationSettings {
                seed_count,
                batch_size,
                interval: Duration::from_secs(interval_secs),
            };
            let writer = StreamWriter::new(path, synthesizer(rng_seed)?);
            stream_until(writer, settings, shutdown_signal()).await?;
        }
        Some(Commands::Train {
            data,
            out,
            split_seed,
        }) => {
            let report = train_from_dataset(&data, &TrainingConfig::default(), split_seed)?;
            ModelStore::save(&report.artifact, &out)?;

            let eval = &report.evaluation;
            let c = eval.confusion;
            println!("Trained on {} rows, tested on {}", report.train_rows, report.test_rows);
            println!("Accuracy: {:.4}", eval.accuracy);
            match eval.roc_auc {
                Some(auc) => println!("ROC AUC: {:.4}", auc),
                None => println!("ROC AUC: n/a (single class in test set)"),
            }
            println!(
                "Confusion matrix: tn={} fp={} fn={} tp={}",
                c.true_negatives, c.false_positives, c.false_negatives, c.true_positives
            );
            println!("Model saved to {}", out.display());
        }
        Some(Commands::Predict { model, request }) => {
            let artifact = ModelStore::load(&model)?;
            let req: PredictReq = serde_json::from_str(&request)?;
            let res = PredictionService::new(Arc::new(artifact)).predict(&req)?;
            println!("{}", serde_json::to_string_pretty(&res)?);
        }
        None => {
            println!("Use 'noshow --help' for commands");
        }
    }

    Ok(())
}
