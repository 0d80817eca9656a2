//! ZIGGURAT CHRONICLE - Versioned Character Evolution
//!
//! Levels:
//! - Initiation: configuration and startup wiring
//! - Demiurge: the character value, its stages, growth and history
//! - Totems: decaying memories and character persistence
//!
//! Every operation takes a character revision by reference and returns a
//! new revision (or an error); revisions are never modified in place.

pub mod demiurge;
pub mod error;
pub mod initiation;
pub mod totems;

pub use demiurge::{
    Age, Character, CharacterDraft, EventChange, EventType, EvolutionEngine, EvolveOptions,
    GrowthConfiguration, History, HistoryEvent, Identity, KnowledgeItem, Stage, TemporalState,
};
pub use error::{ConfigurationError, EngineError, FieldError, RepositoryError, ValidationErrors};
pub use initiation::{EngineConfig, InitiationManager};
pub use totems::{CharacterRepository, InMemoryRepository, JsonFileRepository, MemoryEntry, MemoryStore};
