//! The composed inference artifact.

use crate::classifier::{LogisticRegression, TrainingConfig};
use crate::preprocessing::{FeatureRow, FeatureSchema, FeatureTransformer};
use crate::{ModelError, ModelResult};
use noshow_types::{Label, Probability};
use serde::{Deserialize, Serialize};

/// Current on-disk format version written by [`crate::ModelStore::save`].
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Fitted feature transformer and classifier, composed so raw rows feed straight in.
///
/// An artifact is immutable once built. Share it behind an `Arc` for concurrent inference; no
/// locking is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    format_version: u32,
    transformer: FeatureTransformer,
    classifier: LogisticRegression,
}

impl ModelArtifact {
    /// Composes already fitted stages.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::WidthMismatch` if the classifier input width does not match the
    /// transformer output width.
    pub fn new(
        transformer: FeatureTransformer,
        classifier: LogisticRegression,
    ) -> ModelResult<Self> {
        if transformer.output_width() != classifier.input_width() {
            return Err(ModelError::WidthMismatch {
                expected: classifier.input_width(),
                actual: transformer.output_width(),
            });
        }
        Ok(Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            transformer,
            classifier,
        })
    }

    /// Fits both stages on raw rows.
    ///
    /// # Errors
    ///
    /// Returns a `ModelError` if either stage cannot be fitted (see
    /// [`FeatureTransformer::fit`] and [`LogisticRegression::fit`]).
    pub fn fit(
        schema: &FeatureSchema,
        rows: &[FeatureRow],
        labels: &[Label],
        config: &TrainingConfig,
    ) -> ModelResult<Self> {
        if rows.len() != labels.len() {
            return Err(ModelError::LabelCountMismatch {
                rows: rows.len(),
                labels: labels.len(),
            });
        }
        let transformer = FeatureTransformer::fit(schema, rows)?;
        let encoded = rows
            .iter()
            .map(|row| transformer.transform(row))
            .collect::<ModelResult<Vec<_>>>()?;
        let classifier = LogisticRegression::fit(&encoded, labels, config)?;

        tracing::info!(
            "fitted model artifact: {} rows, {} encoded features",
            rows.len(),
            transformer.output_width()
        );

        Self::new(transformer, classifier)
    }

    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    pub fn transformer(&self) -> &FeatureTransformer {
        &self.transformer
    }

    pub fn classifier(&self) -> &LogisticRegression {
        &self.classifier
    }

    pub fn transform(&self, row: &FeatureRow) -> ModelResult<Vec<f64>> {
        self.transformer.transform(row)
    }

    pub fn predict_proba(&self, row: &FeatureRow) -> ModelResult<Probability> {
        let encoded = self.transform(row)?;
        self.classifier.predict_proba(&encoded)
    }

    pub fn predict(&self, row: &FeatureRow) -> ModelResult<Label> {
        Ok(self.predict_proba(row)?.label())
    }

    /// Consistency checks applied to a freshly deserialised artifact.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(format!(
                "unsupported format version {} (expected {})",
                self.format_version, ARTIFACT_FORMAT_VERSION
            ));
        }
        self.transformer.validate()?;
        self.classifier.validate()?;
        if self.transformer.output_width() != self.classifier.input_width() {
            return Err(format!(
                "classifier expects {} inputs but the transformer produces {}",
                self.classifier.input_width(),
                self.transformer.output_width()
            ));
        }
        Ok(())
    }
}
