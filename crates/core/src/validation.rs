//! Input validation for prediction requests.
//!
//! Validation happens before any model access. Only ranges and presence are checked here;
//! categorical values outside the generator's domains are passed through unchanged.

use crate::messages::PredictReq;
use crate::record::AppointmentFeatures;
use crate::PredictionError;

/// Oldest accepted patient age, in years.
pub const MAX_AGE: i64 = 120;

/// Validates `req` and converts it into appointment features.
///
/// # Errors
///
/// Returns `PredictionError::BadRequest` naming the first offending field, checked in request
/// field order.
pub fn validate_predict_req(req: &PredictReq) -> Result<AppointmentFeatures, PredictionError> {
    let age = required_int("age", req.age)?;
    if !(0..=MAX_AGE).contains(&age) {
        return Err(PredictionError::BadRequest {
            field: "age",
            reason: format!("must be between 0 and {MAX_AGE}, got {age}"),
        });
    }

    let sex = required_str("sex", &req.sex)?;
    let sector = required_str("sector", &req.sector)?;
    let coverage_tier = required_str("coverage_tier", &req.coverage_tier)?;
    let specialty = required_str("specialty", &req.specialty)?;
    let weekday = required_str("weekday", &req.weekday)?;
    let shift = required_str("shift", &req.shift)?;
    let lead_time_days = non_negative("lead_time_days", req.lead_time_days)?;
    let prior_no_shows = non_negative("prior_no_shows", req.prior_no_shows)?;

    Ok(AppointmentFeatures {
        // Range-checked above.
        age: age as u32,
        sex,
        sector,
        coverage_tier,
        specialty,
        weekday,
        shift,
        lead_time_days,
        prior_no_shows,
    })
}

fn missing(field: &'static str) -> PredictionError {
    PredictionError::BadRequest {
        field,
        reason: "field is required".into(),
    }
}

fn required_int(field: &'static str, value: Option<i64>) -> Result<i64, PredictionError> {
    value.ok_or_else(|| missing(field))
}

fn required_str(field: &'static str, value: &Option<String>) -> Result<String, PredictionError> {
    value.clone().ok_or_else(|| missing(field))
}

fn non_negative(field: &'static str, value: Option<i64>) -> Result<u64, PredictionError> {
    let value = required_int(field, value)?;
    u64::try_from(value).map_err(|_| PredictionError::BadRequest {
        field,
        reason: format!("must be greater than or equal to 0, got {value}"),
    })
}
