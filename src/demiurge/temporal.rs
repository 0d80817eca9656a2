//! Temporal State - Age, Maturity and Developmental Stage
//!
//! The stage is never stored independently of maturity: it is always
//! derived through [`resolve_stage`] under the active thresholds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::demiurge::growth::MaturityThresholds;

/// Ordered developmental phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Initial,
    Growing,
    Mature,
    Transcendent,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Initial => write!(f, "initial"),
            Stage::Growing => write!(f, "growing"),
            Stage::Mature => write!(f, "mature"),
            Stage::Transcendent => write!(f, "transcendent"),
        }
    }
}

impl std::str::FromStr for Stage {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "initial" => Ok(Stage::Initial),
            "growing" => Ok(Stage::Growing),
            "mature" => Ok(Stage::Mature),
            "transcendent" => Ok(Stage::Transcendent),
            _ => Err(format!("Unknown stage: {}", s)),
        }
    }
}

/// Map a maturity value onto a stage. Total: NaN resolves to `Initial`.
pub fn resolve_stage(maturity: f64, thresholds: &MaturityThresholds) -> Stage {
    if maturity >= thresholds.transcendent {
        Stage::Transcendent
    } else if maturity >= thresholds.mature {
        Stage::Mature
    } else if maturity >= thresholds.growing {
        Stage::Growing
    } else {
        Stage::Initial
    }
}

/// `Some((from, to))` when the stage changed, in either direction.
pub fn detect_transition(previous: Stage, next: Stage) -> Option<(Stage, Stage)> {
    (previous != next).then_some((previous, next))
}

/// Snapshot of a character's developmental state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalState {
    age: u32,
    maturity: f64,
    stage: Stage,
    last_evolved_at: DateTime<Utc>,
}

/// The subset of [`TemporalState`] recorded on history events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemporalSnapshot {
    pub age: u32,
    pub maturity: f64,
    pub stage: Stage,
}

impl TemporalState {
    /// Fresh state: age 0, maturity 0, stage resolved against `thresholds`.
    pub fn new(thresholds: &MaturityThresholds) -> Self {
        Self::at(0, 0.0, thresholds)
    }

    /// State at a given age and maturity; maturity is clamped to [0, 1].
    pub fn at(age: u32, maturity: f64, thresholds: &MaturityThresholds) -> Self {
        let maturity = clamp_unit(maturity);
        Self {
            age,
            maturity,
            stage: resolve_stage(maturity, thresholds),
            last_evolved_at: Utc::now(),
        }
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn maturity(&self) -> f64 {
        self.maturity
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn last_evolved_at(&self) -> DateTime<Utc> {
        self.last_evolved_at
    }

    pub fn snapshot(&self) -> TemporalSnapshot {
        TemporalSnapshot {
            age: self.age,
            maturity: self.maturity,
            stage: self.stage,
        }
    }

    /// New state with `maturity` (clamped) and a re-resolved stage.
    pub(crate) fn with_maturity(&self, maturity: f64, thresholds: &MaturityThresholds) -> Self {
        let maturity = clamp_unit(maturity);
        Self {
            maturity,
            stage: resolve_stage(maturity, thresholds),
            ..self.clone()
        }
    }

    /// Same maturity, stage re-resolved under `thresholds`.
    pub(crate) fn restaged(&self, thresholds: &MaturityThresholds) -> Self {
        Self {
            stage: resolve_stage(self.maturity, thresholds),
            ..self.clone()
        }
    }

    pub(crate) fn with_age(&self, age: u32) -> Self {
        Self {
            age,
            ..self.clone()
        }
    }

    pub(crate) fn stamped(&self, at: DateTime<Utc>) -> Self {
        Self {
            last_evolved_at: at,
            ..self.clone()
        }
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> MaturityThresholds {
        MaturityThresholds {
            growing: 0.25,
            mature: 0.75,
            transcendent: 0.95,
        }
    }

    #[test]
    fn test_stage_boundaries() {
        let t = thresholds();
        assert_eq!(resolve_stage(0.0, &t), Stage::Initial);
        assert_eq!(resolve_stage(0.2499, &t), Stage::Initial);
        assert_eq!(resolve_stage(0.25, &t), Stage::Growing);
        assert_eq!(resolve_stage(0.7, &t), Stage::Growing);
        assert_eq!(resolve_stage(0.75, &t), Stage::Mature);
        assert_eq!(resolve_stage(0.9, &t), Stage::Mature);
        assert_eq!(resolve_stage(0.95, &t), Stage::Transcendent);
        assert_eq!(resolve_stage(1.0, &t), Stage::Transcendent);
    }

    #[test]
    fn test_nan_maturity_resolves_initial() {
        assert_eq!(resolve_stage(f64::NAN, &thresholds()), Stage::Initial);
    }

    #[test]
    fn test_transition_in_both_directions() {
        assert_eq!(
            detect_transition(Stage::Growing, Stage::Mature),
            Some((Stage::Growing, Stage::Mature))
        );
        assert_eq!(
            detect_transition(Stage::Mature, Stage::Growing),
            Some((Stage::Mature, Stage::Growing))
        );
        assert_eq!(detect_transition(Stage::Mature, Stage::Mature), None);
    }

    #[test]
    fn test_with_maturity_reresolves_stage() {
        let t = thresholds();
        let state = TemporalState::at(3, 0.7, &t);
        assert_eq!(state.stage(), Stage::Growing);

        let next = state.with_maturity(1.4, &t);
        assert_eq!(next.maturity(), 1.0);
        assert_eq!(next.stage(), Stage::Transcendent);
        assert_eq!(next.age(), 3);
        // original untouched
        assert_eq!(state.maturity(), 0.7);
    }

    #[test]
    fn test_restaged_keeps_maturity() {
        let state = TemporalState::at(1, 0.5, &thresholds());
        let strict = MaturityThresholds {
            growing: 0.1,
            mature: 0.3,
            transcendent: 0.9,
        };
        let next = state.restaged(&strict);
        assert_eq!(next.stage(), Stage::Mature);
        assert_eq!(next.maturity(), 0.5);
        assert_eq!(next.age(), 1);
    }

    #[test]
    fn test_stage_display_and_parse() {
        assert_eq!(Stage::Transcendent.to_string(), "transcendent");
        assert_eq!("Mature".parse::<Stage>(), Ok(Stage::Mature));
        assert!("elder".parse::<Stage>().is_err());
        assert!(Stage::Initial < Stage::Growing && Stage::Mature < Stage::Transcendent);
    }
}
