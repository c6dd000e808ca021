//! Feature-transformation stage.
//!
//! The transformer turns a raw [`FeatureRow`] into the dense vector the classifier consumes:
//!
//! - numeric columns: impute missing values with the fit-time median, then standardise with the
//!   fit-time mean and (population) standard deviation
//! - categorical columns: impute missing values with the fit-time mode, then one-hot encode
//!   against the fit-time vocabulary
//!
//! The encoded vector is the scaled numerics followed by one block per categorical column, in
//! schema order. A category that was never seen at fit time encodes as an all-zero block and is
//! never an error: serving traffic routinely carries values the training data did not.

use crate::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column names, in encoding order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

impl FeatureSchema {
    pub fn new(numeric: &[&str], categorical: &[&str]) -> Self {
        Self {
            numeric: numeric.iter().map(|c| c.to_string()).collect(),
            categorical: categorical.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// One raw observation. `None` marks a missing value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureRow {
    pub numeric: Vec<Option<f64>>,
    pub categorical: Vec<Option<String>>,
}

/// Fit-time statistics for a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericColumn {
    pub name: String,
    pub median: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl NumericColumn {
    fn encode(&self, value: Option<f64>) -> f64 {
        let value = value.filter(|v| v.is_finite()).unwrap_or(self.median);
        (value - self.mean) / self.std_dev
    }
}

/// Fit-time statistics and vocabulary for a categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub name: String,
    pub mode: String,
    /// Sorted, de-duplicated categories seen at fit time.
    pub vocabulary: Vec<String>,
}

impl CategoricalColumn {
    /// Position of `value` in the vocabulary, or `None` for an unseen category.
    pub fn lookup(&self, value: &str) -> Option<usize> {
        self.vocabulary
            .binary_search_by(|known| known.as_str().cmp(value))
            .ok()
    }

    fn encode_into(&self, value: Option<&str>, out: &mut Vec<f64>) {
        let start = out.len();
        out.resize(start + self.vocabulary.len(), 0.0);
        let value = value.unwrap_or(self.mode.as_str());
        if let Some(index) = self.lookup(value) {
            out[start + index] = 1.0;
        }
    }
}

/// Fitted feature-transformation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTransformer {
    numeric: Vec<NumericColumn>,
    categorical: Vec<CategoricalColumn>,
}

impl FeatureTransformer {
    /// Learns imputation, scaling and vocabulary statistics from `rows`.
    ///
    /// # Errors
    ///
    /// Returns a `ModelError` if:
    /// - `rows` is empty,
    /// - a row does not match `schema`,
    /// - a column has no observed (non-missing) value at all.
    pub fn fit(schema: &FeatureSchema, rows: &[FeatureRow]) -> ModelResult<Self> {
        if rows.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        for row in rows {
            check_row_shape(schema.numeric.len(), schema.categorical.len(), row)?;
        }

        let numeric = schema
            .numeric
            .iter()
            .enumerate()
            .map(|(index, name)| fit_numeric(name, rows.iter().map(|r| r.numeric[index])))
            .collect::<ModelResult<Vec<_>>>()?;

        let categorical = schema
            .categorical
            .iter()
            .enumerate()
            .map(|(index, name)| {
                fit_categorical(name, rows.iter().map(|r| r.categorical[index].as_deref()))
            })
            .collect::<ModelResult<Vec<_>>>()?;

        Ok(Self {
            numeric,
            categorical,
        })
    }

    /// Encodes a single row.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::SchemaMismatch` if the row has the wrong number of values. Unknown
    /// categories and missing values are never errors.
    pub fn transform(&self, row: &FeatureRow) -> ModelResult<Vec<f64>> {
        check_row_shape(self.numeric.len(), self.categorical.len(), row)?;

        let mut out = Vec::with_capacity(self.output_width());
        for (column, value) in self.numeric.iter().zip(&row.numeric) {
            out.push(column.encode(*value));
        }
        for (column, value) in self.categorical.iter().zip(&row.categorical) {
            column.encode_into(value.as_deref(), &mut out);
        }
        Ok(out)
    }

    /// Length of every vector produced by [`FeatureTransformer::transform`].
    pub fn output_width(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|c| c.vocabulary.len())
                .sum::<usize>()
    }

    pub fn numeric_columns(&self) -> &[NumericColumn] {
        &self.numeric
    }

    pub fn categorical_columns(&self) -> &[CategoricalColumn] {
        &self.categorical
    }

    /// Rebuilds the schema this transformer was fitted against.
    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema {
            numeric: self.numeric.iter().map(|c| c.name.clone()).collect(),
            categorical: self.categorical.iter().map(|c| c.name.clone()).collect(),
        }
    }

    /// Internal consistency checks for a deserialised transformer.
    pub(crate) fn validate(&self) -> Result<(), String> {
        for column in &self.numeric {
            if !column.std_dev.is_finite() || column.std_dev <= 0.0 {
                return Err(format!("column '{}' has an invalid scale", column.name));
            }
            if !column.mean.is_finite() || !column.median.is_finite() {
                return Err(format!("column '{}' has non-finite statistics", column.name));
            }
        }
        for column in &self.categorical {
            if column.vocabulary.windows(2).any(|w| w[0] >= w[1]) {
                return Err(format!(
                    "column '{}' vocabulary is not sorted and unique",
                    column.name
                ));
            }
        }
        Ok(())
    }
}

fn check_row_shape(numeric: usize, categorical: usize, row: &FeatureRow) -> ModelResult<()> {
    if row.numeric.len() != numeric || row.categorical.len() != categorical {
        return Err(ModelError::SchemaMismatch {
            expected_numeric: numeric,
            expected_categorical: categorical,
            actual_numeric: row.numeric.len(),
            actual_categorical: row.categorical.len(),
        });
    }
    Ok(())
}

fn fit_numeric(name: &str, values: impl Iterator<Item = Option<f64>>) -> ModelResult<NumericColumn> {
    let values: Vec<Option<f64>> = values.map(|v| v.filter(|v| v.is_finite())).collect();
    let mut observed: Vec<f64> = values.iter().flatten().copied().collect();
    if observed.is_empty() {
        return Err(ModelError::NoObservedValues {
            column: name.to_string(),
        });
    }
    observed.sort_by(f64::total_cmp);
    let median = median_of_sorted(&observed);

    // Scaling statistics are taken over the imputed column.
    let count = values.len() as f64;
    let imputed = values.iter().map(|v| v.unwrap_or(median));
    let mean = imputed.clone().sum::<f64>() / count;
    let variance = imputed.map(|v| (v - mean).powi(2)).sum::<f64>() / count;
    let std_dev = variance.sqrt();

    Ok(NumericColumn {
        name: name.to_string(),
        median,
        mean,
        std_dev: if std_dev > 0.0 { std_dev } else { 1.0 },
    })
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn fit_categorical<'a>(
    name: &str,
    values: impl Iterator<Item = Option<&'a str>>,
) -> ModelResult<CategoricalColumn> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values.flatten() {
        *counts.entry(value).or_default() += 1;
    }

    // BTreeMap iterates in ascending order, so keeping the first maximum breaks ties towards the
    // lexicographically smallest category.
    let mut mode: Option<(&str, usize)> = None;
    for (&value, &count) in &counts {
        match mode {
            Some((_, best)) if count <= best => {}
            _ => mode = Some((value, count)),
        }
    }
    let Some((mode, _)) = mode else {
        return Err(ModelError::NoObservedValues {
            column: name.to_string(),
        });
    };

    Ok(CategoricalColumn {
        name: name.to_string(),
        mode: mode.to_string(),
        vocabulary: counts.keys().map(|k| k.to_string()).collect(),
    })
}
