//! Shared value types for the no-show prediction workspace.
//!
//! These are small validated wrappers that travel between the model, the core services and the
//! API layer. Once constructed they are guaranteed to hold a value inside their domain.

/// Errors that can occur when creating validated values.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TypesError {
    /// A label outside the binary {0, 1} domain
    #[error("label must be 0 or 1, got {0}")]
    InvalidLabel(i64),
    /// A probability outside [0, 1] (or NaN)
    #[error("probability must be within [0, 1], got {0}")]
    InvalidProbability(f64),
}

/// Binary appointment outcome.
///
/// Serialised as the integer `0` (attends) or `1` (no-show), which is also the dataset column
/// encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Attends,
    NoShow,
}

impl Label {
    /// Returns the integer encoding used in the dataset and on the wire.
    pub fn as_u8(self) -> u8 {
        match self {
            Label::Attends => 0,
            Label::NoShow => 1,
        }
    }

    /// Parses the integer encoding.
    ///
    /// # Errors
    ///
    /// Returns `TypesError::InvalidLabel` for anything other than `0` or `1`.
    pub fn from_int(value: i64) -> Result<Self, TypesError> {
        match value {
            0 => Ok(Label::Attends),
            1 => Ok(Label::NoShow),
            other => Err(TypesError::InvalidLabel(other)),
        }
    }

    /// Numeric target value used when fitting a classifier.
    pub fn as_target(self) -> f64 {
        f64::from(self.as_u8())
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

impl serde::Serialize for Label {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> serde::Deserialize<'de> for Label {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = i64::deserialize(deserializer)?;
        Label::from_int(value).map_err(serde::de::Error::custom)
    }
}

/// Probability of the positive ("no-show") class.
///
/// Guaranteed finite and within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Probability(f64);

impl Probability {
    /// Number of decimal digits kept by [`Probability::rounded`].
    pub const RESPONSE_DIGITS: i32 = 4;

    /// Creates a new `Probability`.
    ///
    /// # Errors
    ///
    /// Returns `TypesError::InvalidProbability` if `value` is NaN or outside `[0, 1]`.
    pub fn new(value: f64) -> Result<Self, TypesError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(TypesError::InvalidProbability(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Returns the probability rounded half away from zero to four decimal digits.
    pub fn rounded(self) -> f64 {
        let factor = 10f64.powi(Self::RESPONSE_DIGITS);
        (self.0 * factor).round() / factor
    }

    /// The classification implied by this probability: no-show iff strictly above one half.
    pub fn label(self) -> Label {
        if self.0 > 0.5 {
            Label::NoShow
        } else {
            Label::Attends
        }
    }
}

impl std::fmt::Display for Probability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}
