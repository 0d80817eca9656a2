//! Growth Configuration - Stage Thresholds and Rates
//!
//! Tunable parameters governing stage transitions, cognitive growth
//! weighting and maturity decay. Values are validated once at
//! construction and immutable afterwards.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Tolerance used when checking that the growth weights sum to one.
pub const WEIGHT_EPSILON: f64 = 1e-6;

/// Maturity boundaries for the `growing`, `mature` and `transcendent` stages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaturityThresholds {
    pub growing: f64,
    pub mature: f64,
    pub transcendent: f64,
}

impl Default for MaturityThresholds {
    fn default() -> Self {
        Self {
            growing: 0.25,
            mature: 0.75,
            transcendent: 0.95,
        }
    }
}

impl MaturityThresholds {
    fn validate(&self) -> Result<(), ConfigurationError> {
        let in_range = |v: f64| (0.0..=1.0).contains(&v);
        let ordered = self.growing < self.mature && self.mature < self.transcendent;
        if in_range(self.growing) && in_range(self.mature) && in_range(self.transcendent) && ordered
        {
            Ok(())
        } else {
            Err(ConfigurationError::Thresholds {
                growing: self.growing,
                mature: self.mature,
                transcendent: self.transcendent,
            })
        }
    }
}

/// How the cognitive growth calculator combines its three factor scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingMode {
    /// Unweighted mean of the three scores.
    #[default]
    Equal,
    /// Each score scaled by its configured weight and by `growth_rate`.
    Configured,
}

/// Validated growth configuration.
///
/// Deserialization goes through the same validation as [`GrowthConfiguration::new`],
/// so an invalid TOML or JSON document never yields a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GrowthSettings", into = "GrowthSettings")]
pub struct GrowthConfiguration {
    thresholds: MaturityThresholds,
    knowledge_weight: f64,
    memory_weight: f64,
    emotional_weight: f64,
    growth_rate: f64,
    decay_rate: f64,
    weighting: WeightingMode,
}

/// Unvalidated form of [`GrowthConfiguration`], as read from config files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthSettings {
    pub maturity_thresholds: MaturityThresholds,
    pub knowledge_weight: f64,
    pub memory_weight: f64,
    pub emotional_weight: f64,
    pub growth_rate: f64,
    pub decay_rate: f64,
    pub weighting: WeightingMode,
}

impl Default for GrowthSettings {
    fn default() -> Self {
        GrowthConfiguration::default().into()
    }
}

impl TryFrom<GrowthSettings> for GrowthConfiguration {
    type Error = ConfigurationError;

    fn try_from(settings: GrowthSettings) -> Result<Self, Self::Error> {
        settings.maturity_thresholds.validate()?;

        for (name, value) in [
            ("knowledge_weight", settings.knowledge_weight),
            ("memory_weight", settings.memory_weight),
            ("emotional_weight", settings.emotional_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigurationError::WeightOutOfRange { name, value });
            }
        }

        let sum = settings.knowledge_weight + settings.memory_weight + settings.emotional_weight;
        if (sum - 1.0).abs() > WEIGHT_EPSILON {
            return Err(ConfigurationError::WeightSum { sum });
        }

        if !(settings.growth_rate > 0.0 && settings.growth_rate <= 1.0) {
            return Err(ConfigurationError::GrowthRate(settings.growth_rate));
        }
        if !(settings.decay_rate >= 0.0 && settings.decay_rate < 1.0) {
            return Err(ConfigurationError::DecayRate(settings.decay_rate));
        }

        Ok(Self {
            thresholds: settings.maturity_thresholds,
            knowledge_weight: settings.knowledge_weight,
            memory_weight: settings.memory_weight,
            emotional_weight: settings.emotional_weight,
            growth_rate: settings.growth_rate,
            decay_rate: settings.decay_rate,
            weighting: settings.weighting,
        })
    }
}

impl From<GrowthConfiguration> for GrowthSettings {
    fn from(config: GrowthConfiguration) -> Self {
        Self {
            maturity_thresholds: config.thresholds,
            knowledge_weight: config.knowledge_weight,
            memory_weight: config.memory_weight,
            emotional_weight: config.emotional_weight,
            growth_rate: config.growth_rate,
            decay_rate: config.decay_rate,
            weighting: config.weighting,
        }
    }
}

impl Default for GrowthConfiguration {
    fn default() -> Self {
        Self {
            thresholds: MaturityThresholds::default(),
            knowledge_weight: 0.4,
            memory_weight: 0.3,
            emotional_weight: 0.3,
            growth_rate: 0.1,
            decay_rate: 0.05,
            weighting: WeightingMode::Equal,
        }
    }
}

impl GrowthConfiguration {
    /// Validate and build a configuration from raw settings.
    pub fn new(settings: GrowthSettings) -> Result<Self, ConfigurationError> {
        Self::try_from(settings)
    }

    /// Default configuration with different thresholds.
    pub fn with_thresholds(thresholds: MaturityThresholds) -> Result<Self, ConfigurationError> {
        Self::new(GrowthSettings {
            maturity_thresholds: thresholds,
            ..GrowthSettings::default()
        })
    }

    pub fn thresholds(&self) -> &MaturityThresholds {
        &self.thresholds
    }

    pub fn knowledge_weight(&self) -> f64 {
        self.knowledge_weight
    }

    pub fn memory_weight(&self) -> f64 {
        self.memory_weight
    }

    pub fn emotional_weight(&self) -> f64 {
        self.emotional_weight
    }

    pub fn growth_rate(&self) -> f64 {
        self.growth_rate
    }

    pub fn decay_rate(&self) -> f64 {
        self.decay_rate
    }

    pub fn weighting(&self) -> WeightingMode {
        self.weighting
    }

    pub fn settings(&self) -> GrowthSettings {
        self.clone().into()
    }
}
