//! Fitting a model artifact on the streamed dataset.

use crate::constants::TEST_FRACTION;
use crate::dataset::read_dataset;
use crate::record::{feature_schema, AppointmentRecord};
use crate::CoreResult;
use noshow_model::{stratified_split, Evaluation, FeatureRow, ModelArtifact, TrainingConfig};
use noshow_types::{Label, Probability};
use std::path::Path;

/// Outcome of a training run.
#[derive(Debug)]
pub struct TrainingReport {
    pub artifact: ModelArtifact,
    /// Scores on the held-out part of the dataset.
    pub evaluation: Evaluation,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Splits records into model inputs and targets. Patient ids are dropped.
pub fn training_data(records: &[AppointmentRecord]) -> (Vec<FeatureRow>, Vec<Label>) {
    records
        .iter()
        .map(|r| (r.features.to_feature_row(), r.label_no_show))
        .unzip()
}

/// Fits an artifact on a seeded hold-out split of `records` and evaluates it on the rest.
pub fn train_on_records(
    records: &[AppointmentRecord],
    config: &TrainingConfig,
    split_seed: u64,
) -> CoreResult<TrainingReport> {
    let (train, test) =
        stratified_split(records, |r| r.label_no_show, TEST_FRACTION, split_seed);

    let (rows, labels) = training_data(&train);
    let artifact = ModelArtifact::fit(&feature_schema(), &rows, &labels, config)?;

    let (test_rows, test_labels) = training_data(&test);
    let predictions = test_rows
        .iter()
        .map(|row| artifact.predict_proba(row))
        .collect::<Result<Vec<Probability>, _>>()?;
    let evaluation = Evaluation::compute(&predictions, &test_labels);

    tracing::info!(
        "trained on {} rows, evaluated on {}: accuracy {:.4}, roc auc {}",
        train.len(),
        test.len(),
        evaluation.accuracy,
        evaluation
            .roc_auc
            .map(|auc| format!("{auc:.4}"))
            .unwrap_or_else(|| "n/a".into())
    );

    Ok(TrainingReport {
        artifact,
        evaluation,
        train_rows: train.len(),
        test_rows: test.len(),
    })
}

/// Reads the dataset at `path` and trains on it.
pub fn train_from_dataset(
    path: &Path,
    config: &TrainingConfig,
    split_seed: u64,
) -> CoreResult<TrainingReport> {
    let records = read_dataset(path)?;
    train_on_records(&records, config, split_seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_SPLIT_SEED;
    use crate::stream::StreamWriter;
    use crate::synthesizer::Synthesizer;
    use crate::CoreError;
    use noshow_model::ModelError;
    use tempfile::TempDir;

    #[test]
    fn test_train_from_streamed_dataset() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("stream.csv");
        StreamWriter::new(&path, Synthesizer::seeded(11).unwrap())
            .seed(4_000, 1)
            .unwrap();

        let report =
            train_from_dataset(&path, &TrainingConfig::default(), DEFAULT_SPLIT_SEED).unwrap();
        assert_eq!(report.train_rows, 3_200);
        assert_eq!(report.test_rows, 800);

        let c = report.evaluation.confusion;
        assert_eq!(
            c.true_negatives + c.false_positives + c.false_negatives + c.true_positives,
            800
        );
        // The label is a noisy function of the features; beating chance is all that is stable.
        assert!(report.evaluation.roc_auc.unwrap() > 0.5);
    }

    #[test]
    fn test_training_data_drops_ids() {
        let records = Synthesizer::seeded(2).unwrap().generate(3, 100).unwrap();
        let (rows, labels) = training_data(&records);
        assert_eq!(rows.len(), 3);
        assert_eq!(labels[1], records[1].label_no_show);
        assert_eq!(rows[0].numeric[0], Some(f64::from(records[0].features.age)));
    }

    #[test]
    fn test_empty_dataset_cannot_train() {
        let result = train_on_records(&[], &TrainingConfig::default(), 1);
        assert!(matches!(
            result,
            Err(CoreError::Model(ModelError::EmptyTrainingSet))
        ));
    }
}
