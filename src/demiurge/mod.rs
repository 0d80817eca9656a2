//! Demiurge Level - Character State & Evolution
//!
//! The Demiurge owns the character value and everything that advances it:
//! temporal state and stages, growth configuration, cognitive growth,
//! the history log, versioned updates and the evolution engine itself.

pub mod cognition;
pub mod evolution;
pub mod growth;
pub mod history;
pub mod persona;
pub mod temporal;
pub mod validation;
pub mod versioning;

pub use cognition::{calculate_growth, FactorBreakdown, GrowthAssessment};
pub use evolution::{EvolutionEngine, EvolveOptions};
pub use growth::{GrowthConfiguration, GrowthSettings, MaturityThresholds, WeightingMode};
pub use history::{EventChange, EventType, History, HistoryEvent};
pub use persona::{Age, Character, CharacterDraft, EmotionalState, Identity, KnowledgeItem, Personality};
pub use temporal::{detect_transition, resolve_stage, Stage, TemporalSnapshot, TemporalState};
pub use validation::validate;
pub use versioning::{commit, update};

/// Create revision 1 of a character named `name` under `config`.
pub fn create_character(
    name: &str,
    config: &GrowthConfiguration,
) -> Result<Character, crate::error::ValidationErrors> {
    CharacterDraft::new(Identity::named(name)).build(config)
}
