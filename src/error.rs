//! Error taxonomy shared by the engine, the validator and the repositories.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Invalid growth or engine configuration. Raised at construction time and
/// never silently coerced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("maturity thresholds must be strictly increasing within [0, 1], got growing={growing}, mature={mature}, transcendent={transcendent}")]
    Thresholds {
        growing: f64,
        mature: f64,
        transcendent: f64,
    },
    #[error("{name} must be within [0, 1], got {value}")]
    WeightOutOfRange { name: &'static str, value: f64 },
    #[error("growth weights must sum to 1.0, got {sum}")]
    WeightSum { sum: f64 },
    #[error("growth_rate must be within (0, 1], got {0}")]
    GrowthRate(f64),
    #[error("decay_rate must be within [0, 1), got {0}")]
    DecayRate(f64),
    #[error("memory capacity must be greater than zero")]
    ZeroCapacity,
    #[error("prune threshold must be within [0, 1], got {0}")]
    PruneThreshold(f64),
}

/// A single failed constraint, addressed by a dotted field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Structured list of constraint failures for a rejected character value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![FieldError::new(field, message)])
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// True when any error is reported for `field` or one of its children.
    pub fn touches(&self, field: &str) -> bool {
        self.errors.iter().any(|e| {
            e.field == field
                || e.field
                    .strip_prefix(field)
                    .map(|rest| rest.starts_with('.') || rest.starts_with('['))
                    .unwrap_or(false)
        })
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.errors.len())?;
        for error in &self.errors {
            write!(f, "; {}", error)?;
        }
        Ok(())
    }
}

/// Failures surfaced by the evolution operators.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("amount must be a positive finite number, got {0}")]
    InvalidAmount(f64),
    #[error("{0} content cannot be empty")]
    EmptyContent(&'static str),
}

/// Failures surfaced by character repositories.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("character not found: {0}")]
    NotFound(Uuid),
    #[error("stale write for character {id}: stored version {stored}, attempted {attempted}")]
    StaleVersion { id: Uuid, stored: u64, attempted: u64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid character file {}: {}", .path.display(), .errors)]
    Invalid {
        path: std::path::PathBuf,
        #[source]
        errors: ValidationErrors,
    },
}
