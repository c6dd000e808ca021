//! Request and response messages exchanged over the APIs.
//!
//! Every field of [`PredictReq`] is optional at the serde level so that a missing field reaches
//! the prediction service's validator, which names it in the error, instead of failing inside
//! the JSON extractor with a positional message. The OpenAPI schema still lists each field as
//! required and non-nullable, matching what the validator accepts.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Appointment features submitted for a no-show prediction. All fields are required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PredictReq {
    /// Patient age in years, 0 to 120
    #[schema(example = 45, required = true, nullable = false)]
    pub age: Option<i64>,
    #[schema(example = "Femenino", required = true, nullable = false)]
    pub sex: Option<String>,
    /// Clinic sector (Norte, Sur, Centro, Rural)
    #[schema(example = "Norte", required = true, nullable = false)]
    pub sector: Option<String>,
    /// Coverage tier (Fonasa A, B, C, D)
    #[schema(example = "Fonasa B", required = true, nullable = false)]
    pub coverage_tier: Option<String>,
    #[schema(example = "Medicina General", required = true, nullable = false)]
    pub specialty: Option<String>,
    #[schema(example = "Lunes", required = true, nullable = false)]
    pub weekday: Option<String>,
    /// Mañana or Tarde
    #[schema(example = "Mañana", required = true, nullable = false)]
    pub shift: Option<String>,
    /// Days between booking and appointment
    #[schema(example = 5, required = true, nullable = false)]
    pub lead_time_days: Option<i64>,
    /// Count of previous missed appointments
    #[schema(example = 0, required = true, nullable = false)]
    pub prior_no_shows: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PredictRes {
    /// 1 = no-show predicted, 0 = attendance predicted
    pub label: u8,
    /// Probability of a no-show, rounded to 4 decimal digits
    pub probability: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GenerationStartRes {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GenerationStatusRes {
    /// "active" or "inactive"
    pub status: String,
    pub session_id: Option<String>,
    /// RFC 3339 start time of the active session
    pub started_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_req_accepts_partial_json() {
        let req: PredictReq = serde_json::from_str(r#"{"age": 30, "sex": "Femenino"}"#).unwrap();
        assert_eq!(req.age, Some(30));
        assert_eq!(req.sex.as_deref(), Some("Femenino"));
        assert_eq!(req.sector, None);
    }

    #[test]
    fn test_predict_req_rejects_wrong_types() {
        let result = serde_json::from_str::<PredictReq>(r#"{"age": "thirty"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_predict_req_schema_marks_every_field_required() {
        use utoipa::openapi::{RefOr, Schema};
        use utoipa::ToSchema;

        let (name, schema) = <PredictReq as ToSchema>::schema();
        assert_eq!(name, "PredictReq");
        let RefOr::T(Schema::Object(obj)) = schema else {
            panic!("PredictReq should render as an object schema");
        };

        let fields = [
            "age",
            "sex",
            "sector",
            "coverage_tier",
            "specialty",
            "weekday",
            "shift",
            "lead_time_days",
            "prior_no_shows",
        ];
        for field in fields {
            assert!(obj.required.iter().any(|r| r == field), "{field} not required");
            match obj.properties.get(field) {
                Some(RefOr::T(Schema::Object(prop))) => {
                    assert!(!prop.nullable, "{field} is nullable")
                }
                _ => panic!("{field} should be an inline object schema"),
            }
        }
    }
}
