//! Classifier stage: L2-regularised logistic regression.

use crate::{ModelError, ModelResult};
use noshow_types::{Label, Probability};
use serde::{Deserialize, Serialize};

/// Hyperparameters for fitting the classifier.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Gradient descent step size.
    pub learning_rate: f64,
    /// Number of full passes over the training set.
    pub epochs: usize,
    /// L2 penalty applied to the weights (not the intercept).
    pub l2: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.5,
            epochs: 400,
            l2: 1e-4,
        }
    }
}

/// Fitted binary classifier over encoded feature vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    weights: Vec<f64>,
    intercept: f64,
}

impl LogisticRegression {
    pub fn from_parts(weights: Vec<f64>, intercept: f64) -> Self {
        Self { weights, intercept }
    }

    /// Fits the classifier with full-batch gradient descent on the log loss.
    ///
    /// # Errors
    ///
    /// Returns a `ModelError` if:
    /// - `features` is empty,
    /// - `features` and `labels` differ in length,
    /// - the feature vectors are not all the same width.
    pub fn fit(
        features: &[Vec<f64>],
        labels: &[Label],
        config: &TrainingConfig,
    ) -> ModelResult<Self> {
        if features.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if features.len() != labels.len() {
            return Err(ModelError::LabelCountMismatch {
                rows: features.len(),
                labels: labels.len(),
            });
        }
        let width = features[0].len();
        if let Some(bad) = features.iter().find(|x| x.len() != width) {
            return Err(ModelError::WidthMismatch {
                expected: width,
                actual: bad.len(),
            });
        }

        let n = features.len() as f64;
        let mut model = Self {
            weights: vec![0.0; width],
            intercept: 0.0,
        };
        let mut gradient = vec![0.0; width];

        for epoch in 0..config.epochs {
            gradient.iter_mut().for_each(|g| *g = 0.0);
            let mut intercept_gradient = 0.0;
            let mut loss = 0.0;

            for (x, label) in features.iter().zip(labels) {
                let p = sigmoid(model.score(x));
                let y = label.as_target();
                let error = p - y;
                for (g, xi) in gradient.iter_mut().zip(x) {
                    *g += error * xi;
                }
                intercept_gradient += error;
                loss -= y * p.max(f64::EPSILON).ln() + (1.0 - y) * (1.0 - p).max(f64::EPSILON).ln();
            }

            for (w, g) in model.weights.iter_mut().zip(&gradient) {
                *w -= config.learning_rate * (g / n + config.l2 * *w);
            }
            model.intercept -= config.learning_rate * intercept_gradient / n;

            if epoch % 100 == 0 {
                tracing::debug!("epoch {} log loss {:.5}", epoch, loss / n);
            }
        }

        Ok(model)
    }

    /// Number of inputs the classifier expects.
    pub fn input_width(&self) -> usize {
        self.weights.len()
    }

    fn score(&self, x: &[f64]) -> f64 {
        self.intercept
            + self
                .weights
                .iter()
                .zip(x)
                .map(|(w, xi)| w * xi)
                .sum::<f64>()
    }

    /// Probability of the positive ("no-show") class for an encoded vector.
    ///
    /// # Errors
    ///
    /// Returns a `ModelError` if the vector has the wrong width or the score is not finite.
    pub fn predict_proba(&self, x: &[f64]) -> ModelResult<Probability> {
        if x.len() != self.weights.len() {
            return Err(ModelError::WidthMismatch {
                expected: self.weights.len(),
                actual: x.len(),
            });
        }
        let score = self.score(x);
        if !score.is_finite() {
            return Err(ModelError::NonFiniteScore);
        }
        Probability::new(sigmoid(score)).map_err(|_| ModelError::NonFiniteScore)
    }

    pub fn predict(&self, x: &[f64]) -> ModelResult<Label> {
        Ok(self.predict_proba(x)?.label())
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if !self.intercept.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            return Err("classifier has non-finite coefficients".into());
        }
        Ok(())
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
