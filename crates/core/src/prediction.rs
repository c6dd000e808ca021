//! Prediction service.
//!
//! The service holds the artifact loaded at startup, or nothing if loading failed. Every request
//! is validated first; a valid request against a missing artifact is rejected as unavailable,
//! and failures inside the artifact are reported per request without affecting the process.

use crate::messages::{PredictReq, PredictRes};
use crate::record::AppointmentFeatures;
use crate::validation::validate_predict_req;
use crate::PredictionError;
use noshow_model::{ModelArtifact, ModelStore};
use noshow_types::{Label, Probability};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

pub const HIGH_RISK_MESSAGE: &str = "High no-show risk";
pub const LOW_RISK_MESSAGE: &str = "Low risk - attendance likely";

/// Outcome of a single inference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: Label,
    pub probability: Probability,
}

impl Prediction {
    pub fn message(&self) -> &'static str {
        match self.label {
            Label::NoShow => HIGH_RISK_MESSAGE,
            Label::Attends => LOW_RISK_MESSAGE,
        }
    }

    pub fn to_response(&self) -> PredictRes {
        PredictRes {
            label: self.label.as_u8(),
            probability: self.probability.rounded(),
            message: self.message().to_string(),
        }
    }
}

/// Read-only inference over a shared artifact. Cloning shares the artifact.
#[derive(Clone)]
pub struct PredictionService {
    artifact: Option<Arc<ModelArtifact>>,
}

impl PredictionService {
    pub fn new(artifact: Arc<ModelArtifact>) -> Self {
        Self {
            artifact: Some(artifact),
        }
    }

    /// A service with no artifact; every valid request fails with `ServiceUnavailable`.
    pub fn unavailable() -> Self {
        Self { artifact: None }
    }

    /// Loads the artifact at `path` once.
    ///
    /// A load failure is logged and yields an unavailable service rather than an error, so the
    /// process can still start and answer health checks.
    pub fn load(path: &Path) -> Self {
        match ModelStore::load(path) {
            Ok(artifact) => Self::new(Arc::new(artifact)),
            Err(e) => {
                tracing::error!("prediction service starting without a model: {}", e);
                Self::unavailable()
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.artifact.is_some()
    }

    /// Validates and scores a wire request.
    pub fn predict(&self, req: &PredictReq) -> Result<PredictRes, PredictionError> {
        let features = validate_predict_req(req)?;
        Ok(self.predict_features(&features)?.to_response())
    }

    /// Scores already validated features.
    pub fn predict_features(
        &self,
        features: &AppointmentFeatures,
    ) -> Result<Prediction, PredictionError> {
        let artifact = self
            .artifact
            .as_deref()
            .ok_or(PredictionError::ServiceUnavailable)?;

        let row = features.to_feature_row();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| artifact.predict_proba(&row)));
        let probability = match outcome {
            Ok(Ok(probability)) => probability,
            Ok(Err(e)) => {
                tracing::error!("prediction failed for {:?}: {}", features, e);
                return Err(PredictionError::Internal(e.to_string()));
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!("prediction panicked for {:?}: {}", features, message);
                return Err(PredictionError::Internal(message));
            }
        };

        Ok(Prediction {
            label: probability.label(),
            probability,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic during inference".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_SPLIT_SEED;
    use crate::synthesizer::Synthesizer;
    use crate::training::train_on_records;
    use noshow_model::{FeatureRow, FeatureSchema, TrainingConfig};
    use std::sync::OnceLock;
    use tempfile::TempDir;

    fn trained_service() -> PredictionService {
        static ARTIFACT: OnceLock<Arc<ModelArtifact>> = OnceLock::new();
        let artifact = ARTIFACT.get_or_init(|| {
            let records = Synthesizer::seeded(42).unwrap().generate(5_000, 1).unwrap();
            let report =
                train_on_records(&records, &TrainingConfig::default(), DEFAULT_SPLIT_SEED)
                    .unwrap();
            Arc::new(report.artifact)
        });
        PredictionService::new(Arc::clone(artifact))
    }

    fn neutral() -> PredictReq {
        PredictReq {
            age: Some(45),
            sex: Some("Femenino".into()),
            sector: Some("Norte".into()),
            coverage_tier: Some("Fonasa B".into()),
            specialty: Some("Medicina General".into()),
            weekday: Some("Lunes".into()),
            shift: Some("Mañana".into()),
            lead_time_days: Some(5),
            prior_no_shows: Some(0),
        }
    }

    #[test]
    fn test_high_risk_appointment_is_flagged() {
        let req = PredictReq {
            prior_no_shows: Some(10),
            lead_time_days: Some(30),
            specialty: Some("Dental".into()),
            ..neutral()
        };
        let res = trained_service().predict(&req).unwrap();
        assert_eq!(res.label, 1);
        assert!(res.probability > 0.5);
        assert_eq!(res.message, HIGH_RISK_MESSAGE);
    }

    #[test]
    fn test_unknown_category_is_accepted() {
        let req = PredictReq {
            sector: Some("UnknownZone".into()),
            ..neutral()
        };
        let res = trained_service().predict(&req).unwrap();
        assert!(res.label <= 1);
        assert!((0.0..=1.0).contains(&res.probability));
    }

    #[test]
    fn test_probability_is_rounded_to_four_digits() {
        let res = trained_service().predict(&neutral()).unwrap();
        let scaled = res.probability * 10_000.0;
        assert!((scaled - scaled.round()).abs() < 1e-6);
        let expected = if res.label == 1 {
            HIGH_RISK_MESSAGE
        } else {
            LOW_RISK_MESSAGE
        };
        assert_eq!(res.message, expected);
    }

    #[test]
    fn test_unavailable_without_model() {
        let service = PredictionService::unavailable();
        assert!(!service.is_ready());
        for _ in 0..3 {
            assert_eq!(
                service.predict(&neutral()),
                Err(PredictionError::ServiceUnavailable)
            );
        }
    }

    #[test]
    fn test_validation_precedes_availability() {
        let service = PredictionService::unavailable();
        let req = PredictReq {
            age: Some(130),
            ..neutral()
        };
        assert!(matches!(
            service.predict(&req),
            Err(PredictionError::BadRequest { field: "age", .. })
        ));
    }

    #[test]
    fn test_load_missing_artifact_is_unavailable() {
        let temp = TempDir::new().unwrap();
        let service = PredictionService::load(&temp.path().join("model.json"));
        assert!(!service.is_ready());
    }

    #[test]
    fn test_load_saved_artifact() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("model.json");
        let records = Synthesizer::seeded(3).unwrap().generate(300, 1).unwrap();
        let report = train_on_records(&records, &TrainingConfig::default(), 1).unwrap();
        ModelStore::save(&report.artifact, &path).unwrap();

        let service = PredictionService::load(&path);
        assert!(service.is_ready());
        assert!(service.predict(&neutral()).is_ok());
    }

    #[test]
    fn test_artifact_failure_is_internal_error() {
        // An artifact fitted on a different schema cannot transform appointment rows.
        let schema = FeatureSchema::new(&["x"], &["c"]);
        let rows: Vec<FeatureRow> = (0..6)
            .map(|i| FeatureRow {
                numeric: vec![Some(i as f64)],
                categorical: vec![Some("a".to_string())],
            })
            .collect();
        let labels: Vec<Label> = (0..6)
            .map(|i| if i < 3 { Label::Attends } else { Label::NoShow })
            .collect();
        let artifact =
            ModelArtifact::fit(&schema, &rows, &labels, &TrainingConfig::default()).unwrap();
        let service = PredictionService::new(Arc::new(artifact));

        assert!(matches!(
            service.predict(&neutral()),
            Err(PredictionError::Internal(_))
        ));
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic during inference");
    }
}
