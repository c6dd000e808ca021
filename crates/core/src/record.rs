//! Appointment records and their fixed categorical domains.
//!
//! An [`AppointmentRecord`] is one row of the dataset. Its [`AppointmentFeatures`] are exactly
//! what a prediction request carries; the patient id and the label exist only in the dataset.
//!
//! Categorical values are kept as plain strings. The generator only ever emits values from the
//! domains below, but the prediction path has to accept values outside them.

use noshow_model::{FeatureRow, FeatureSchema};
use noshow_types::Label;

/// Weighted categorical domains used by the synthesizer.
pub mod domains {
    pub const SEX: &[(&str, f64)] = &[("Femenino", 0.55), ("Masculino", 0.45)];

    pub const SECTOR: &[(&str, f64)] = &[
        ("Norte", 0.3),
        ("Sur", 0.3),
        ("Centro", 0.3),
        ("Rural", 0.1),
    ];

    pub const COVERAGE_TIER: &[(&str, f64)] = &[
        ("Fonasa A", 0.25),
        ("Fonasa B", 0.25),
        ("Fonasa C", 0.25),
        ("Fonasa D", 0.25),
    ];

    pub const SPECIALTY: &[(&str, f64)] = &[
        ("Medicina General", 0.40),
        ("Dental", 0.20),
        ("Matrona", 0.15),
        ("Salud Mental", 0.10),
        ("Kinesiologia", 0.10),
        ("Nutricionista", 0.05),
    ];

    pub const WEEKDAY: &[(&str, f64)] = &[
        ("Lunes", 0.2),
        ("Martes", 0.2),
        ("Miercoles", 0.2),
        ("Jueves", 0.2),
        ("Viernes", 0.2),
    ];

    pub const SHIFT: &[(&str, f64)] = &[("Mañana", 0.5), ("Tarde", 0.5)];

    pub const FRIDAY: &str = "Viernes";
    pub const AFTERNOON: &str = "Tarde";
    pub const MENTAL_HEALTH: &str = "Salud Mental";
    pub const DENTAL: &str = "Dental";

    /// Returns true if `value` is one of the values of `domain`.
    pub fn contains(domain: &[(&str, f64)], value: &str) -> bool {
        domain.iter().any(|(known, _)| *known == value)
    }
}

/// Numeric feature columns, in encoding order.
pub const NUMERIC_FEATURES: [&str; 3] = ["age", "lead_time_days", "prior_no_shows"];

/// Categorical feature columns, in encoding order.
pub const CATEGORICAL_FEATURES: [&str; 6] = [
    "sex",
    "sector",
    "coverage_tier",
    "specialty",
    "weekday",
    "shift",
];

/// Dataset columns, in file order.
pub const DATASET_COLUMNS: [&str; 11] = [
    "patient_id",
    "age",
    "sex",
    "sector",
    "coverage_tier",
    "specialty",
    "weekday",
    "shift",
    "lead_time_days",
    "prior_no_shows",
    "label_no_show",
];

/// The feature schema the model artifact is fitted against.
pub fn feature_schema() -> FeatureSchema {
    FeatureSchema::new(&NUMERIC_FEATURES, &CATEGORICAL_FEATURES)
}

/// Appointment attributes shared by dataset rows and prediction requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentFeatures {
    pub age: u32,
    pub sex: String,
    pub sector: String,
    pub coverage_tier: String,
    pub specialty: String,
    pub weekday: String,
    pub shift: String,
    pub lead_time_days: u64,
    pub prior_no_shows: u64,
}

impl AppointmentFeatures {
    /// Converts the features into the raw row the model artifact consumes.
    pub fn to_feature_row(&self) -> FeatureRow {
        FeatureRow {
            numeric: vec![
                Some(f64::from(self.age)),
                Some(self.lead_time_days as f64),
                Some(self.prior_no_shows as f64),
            ],
            categorical: vec![
                Some(self.sex.clone()),
                Some(self.sector.clone()),
                Some(self.coverage_tier.clone()),
                Some(self.specialty.clone()),
                Some(self.weekday.clone()),
                Some(self.shift.clone()),
            ],
        }
    }

    /// Returns true if every categorical value belongs to its generation domain.
    pub fn is_within_domains(&self) -> bool {
        use domains::*;
        contains(SEX, &self.sex)
            && contains(SECTOR, &self.sector)
            && contains(COVERAGE_TIER, &self.coverage_tier)
            && contains(SPECIALTY, &self.specialty)
            && contains(WEEKDAY, &self.weekday)
            && contains(SHIFT, &self.shift)
    }
}

/// One row of the dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentRecord {
    pub patient_id: u64,
    pub features: AppointmentFeatures,
    pub label_no_show: Label,
}

impl AppointmentRecord {
    /// Appends this record as one CSV line (with trailing newline) to `out`.
    pub fn write_csv_row(&self, out: &mut String) {
        use std::fmt::Write as _;
        let f = &self.features;
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{}",
            self.patient_id,
            f.age,
            f.sex,
            f.sector,
            f.coverage_tier,
            f.specialty,
            f.weekday,
            f.shift,
            f.lead_time_days,
            f.prior_no_shows,
            self.label_no_show.as_u8()
        );
    }

    /// Parses one CSV line (without its newline).
    pub fn parse_csv_row(line: &str) -> Result<Self, String> {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != DATASET_COLUMNS.len() {
            return Err(format!(
                "expected {} fields, found {}",
                DATASET_COLUMNS.len(),
                fields.len()
            ));
        }

        fn number<T: std::str::FromStr>(column: &str, raw: &str) -> Result<T, String> {
            raw.parse::<T>()
                .map_err(|_| format!("column '{column}' is not a valid integer: '{raw}'"))
        }

        let label: i64 = number("label_no_show", fields[10])?;
        Ok(Self {
            patient_id: number("patient_id", fields[0])?,
            features: AppointmentFeatures {
                age: number("age", fields[1])?,
                sex: fields[2].to_string(),
                sector: fields[3].to_string(),
                coverage_tier: fields[4].to_string(),
                specialty: fields[5].to_string(),
                weekday: fields[6].to_string(),
                shift: fields[7].to_string(),
                lead_time_days: number("lead_time_days", fields[8])?,
                prior_no_shows: number("prior_no_shows", fields[9])?,
            },
            label_no_show: Label::from_int(label).map_err(|e| e.to_string())?,
        })
    }
}

/// The dataset header line, without newline.
pub fn csv_header() -> String {
    DATASET_COLUMNS.join(",")
}
