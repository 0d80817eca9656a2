//! Character - The Versioned Persona Value
//!
//! A character bundles identity, personality, knowledge, emotional state,
//! temporal state, memories and history. Values are immutable: every
//! change goes through the evolution operators or the versioned update
//! wrapper and yields a new revision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::demiurge::growth::GrowthConfiguration;
use crate::demiurge::history::History;
use crate::demiurge::temporal::TemporalState;
use crate::demiurge::validation;
use crate::error::ValidationErrors;
use crate::totems::memory::MemoryStore;

/// Trait value assumed when a personality does not define it.
pub const DEFAULT_TRAIT_VALUE: f64 = 0.5;

/// Age as years, or a descriptive word such as "ancient".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Age {
    Years(u32),
    Descriptive(String),
}

impl fmt::Display for Age {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Age::Years(years) => write!(f, "{}", years),
            Age::Descriptive(word) => write!(f, "{}", word),
        }
    }
}

impl std::str::FromStr for Age {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().parse::<u32>() {
            Ok(years) => Age::Years(years),
            Err(_) => Age::Descriptive(s.trim().to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    #[serde(default)]
    pub age: Option<Age>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Identity {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            age: None,
            role: None,
            description: None,
        }
    }

    pub fn with_age(mut self, age: Age) -> Self {
        self.age = Some(age);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    /// Named traits (0.0 - 1.0)
    #[serde(default)]
    pub traits: BTreeMap<String, f64>,
    #[serde(default)]
    pub values: Vec<String>,
}

impl Personality {
    /// Trait value, or [`DEFAULT_TRAIT_VALUE`] when undefined.
    pub fn trait_value(&self, name: &str) -> f64 {
        self.traits
            .get(name)
            .copied()
            .unwrap_or(DEFAULT_TRAIT_VALUE)
    }
}

/// A known fact or skill with optional confidence (0.0 - 1.0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub topic: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl KnowledgeItem {
    pub fn new(topic: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            content: content.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }
}

fn default_mood() -> String {
    "neutral".to_string()
}

fn default_intensity() -> f64 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalState {
    #[serde(default = "default_mood")]
    pub mood: String,
    /// Intensity (0.0 - 1.0)
    #[serde(default = "default_intensity")]
    pub intensity: f64,
}

impl Default for EmotionalState {
    fn default() -> Self {
        Self {
            mood: default_mood(),
            intensity: default_intensity(),
        }
    }
}

/// A versioned character revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub(crate) id: Uuid,
    pub(crate) version: u64,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) identity: Identity,
    #[serde(default)]
    pub(crate) personality: Personality,
    #[serde(default)]
    pub(crate) knowledge: Vec<KnowledgeItem>,
    #[serde(default)]
    pub(crate) emotional_state: EmotionalState,
    pub(crate) temporal_state: TemporalState,
    #[serde(default)]
    pub(crate) memory_store: MemoryStore,
    #[serde(default)]
    pub(crate) history: History,
    #[serde(default)]
    pub(crate) growth_config: Option<GrowthConfiguration>,
}

impl Character {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn personality(&self) -> &Personality {
        &self.personality
    }

    pub fn knowledge(&self) -> &[KnowledgeItem] {
        &self.knowledge
    }

    pub fn emotional_state(&self) -> &EmotionalState {
        &self.emotional_state
    }

    pub fn temporal_state(&self) -> &TemporalState {
        &self.temporal_state
    }

    pub fn memory_store(&self) -> &MemoryStore {
        &self.memory_store
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn growth_config(&self) -> Option<&GrowthConfiguration> {
        self.growth_config.as_ref()
    }

    /// The character's own configuration, falling back to `shared`.
    pub fn effective_config<'a>(&'a self, shared: &'a GrowthConfiguration) -> &'a GrowthConfiguration {
        self.growth_config.as_ref().unwrap_or(shared)
    }
}

/// Initial attributes for a new character lineage.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterDraft {
    pub identity: Identity,
    pub personality: Personality,
    pub knowledge: Vec<KnowledgeItem>,
    pub emotional_state: EmotionalState,
    pub memory_store: MemoryStore,
    pub maturity: f64,
    pub growth_config: Option<GrowthConfiguration>,
}

impl CharacterDraft {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            personality: Personality::default(),
            knowledge: Vec::new(),
            emotional_state: EmotionalState::default(),
            memory_store: MemoryStore::default(),
            maturity: 0.0,
            growth_config: None,
        }
    }

    /// Validate the draft and create revision 1 of a new lineage.
    ///
    /// `shared` is used for stage resolution unless the draft carries its
    /// own configuration.
    pub fn build(self, shared: &GrowthConfiguration) -> Result<Character, ValidationErrors> {
        let config = self.growth_config.as_ref().unwrap_or(shared);
        let now = Utc::now();
        let character = Character {
            id: Uuid::new_v4(),
            version: 1,
            created_at: now,
            updated_at: now,
            temporal_state: TemporalState::at(0, self.maturity, config.thresholds()),
            identity: self.identity,
            personality: self.personality,
            knowledge: self.knowledge,
            emotional_state: self.emotional_state,
            memory_store: self.memory_store,
            history: History::new(),
            growth_config: self.growth_config,
        };
        validation::validate(&character, shared)?;
        Ok(character)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demiurge::temporal::Stage;

    #[test]
    fn test_build_first_revision() {
        let mut draft = CharacterDraft::new(Identity::named("Ishtar").with_age(Age::Years(30)));
        draft.maturity = 0.5;
        let character = draft.build(&GrowthConfiguration::default()).unwrap();

        assert_eq!(character.version(), 1);
        assert_eq!(character.created_at(), character.updated_at());
        assert_eq!(character.temporal_state().stage(), Stage::Growing);
        assert!(character.history().is_empty());
    }

    #[test]
    fn test_build_rejects_empty_name() {
        let draft = CharacterDraft::new(Identity::named(""));
        let errors = draft.build(&GrowthConfiguration::default()).unwrap_err();
        assert!(errors.touches("identity.name"));
    }

    #[test]
    fn test_age_parsing() {
        assert_eq!("42".parse::<Age>().unwrap(), Age::Years(42));
        assert_eq!(
            "ancient".parse::<Age>().unwrap(),
            Age::Descriptive("ancient".to_string())
        );
        let json = serde_json::to_value(Age::Years(7)).unwrap();
        assert_eq!(json, serde_json::json!(7));
    }

    #[test]
    fn test_trait_fallback() {
        let mut personality = Personality::default();
        personality.traits.insert("curious".to_string(), 0.9);
        assert_eq!(personality.trait_value("curious"), 0.9);
        assert_eq!(personality.trait_value("formal"), DEFAULT_TRAIT_VALUE);
    }
}
