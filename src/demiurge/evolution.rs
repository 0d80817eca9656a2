//! Evolution Engine - Time-Driven Character Development
//!
//! Advances a character over simulated time and applies the single-step
//! maturity operators. Every operator takes a revision by reference and
//! returns the next revision; nothing is modified in place.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info};

use crate::demiurge::cognition::{calculate_growth, GrowthAssessment};
use crate::demiurge::growth::{GrowthConfiguration, MaturityThresholds};
use crate::demiurge::history::{EventChange, HistoryEvent};
use crate::demiurge::persona::{Age, Character, KnowledgeItem};
use crate::demiurge::temporal::{detect_transition, TemporalState};
use crate::demiurge::versioning;
use crate::error::{ConfigurationError, EngineError, ValidationErrors};
use crate::totems::memory::{MemoryEntry, DEFAULT_PRUNE_THRESHOLD};

pub const DAYS_PER_YEAR: f64 = 365.0;

/// Parameters of a single [`EvolutionEngine::evolve`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct EvolveOptions {
    pub days: f64,
    pub years: f64,
    /// Advance the temporal age, and a numeric identity age, by whole elapsed years
    pub age_enabled: bool,
    /// Decay memory importance over the elapsed days
    pub memory_enabled: bool,
    /// Entries decayed strictly below this are dropped; `None` keeps all
    pub prune_threshold: Option<f64>,
    /// Apply cognitive growth in the same revision, after memory decay
    pub cognitive_growth: bool,
}

impl Default for EvolveOptions {
    fn default() -> Self {
        Self {
            days: 0.0,
            years: 0.0,
            age_enabled: true,
            memory_enabled: true,
            prune_threshold: Some(DEFAULT_PRUNE_THRESHOLD),
            cognitive_growth: false,
        }
    }
}

impl EvolveOptions {
    pub fn days(days: f64) -> Self {
        Self {
            days,
            ..Self::default()
        }
    }

    pub fn years(years: f64) -> Self {
        Self {
            years,
            ..Self::default()
        }
    }

    pub fn total_days(&self) -> f64 {
        self.days + self.years * DAYS_PER_YEAR
    }
}

/// Evolution engine bound to a shared growth configuration.
///
/// Characters carrying their own configuration use it instead.
#[derive(Debug, Clone, Default)]
pub struct EvolutionEngine {
    config: GrowthConfiguration,
}

impl EvolutionEngine {
    pub fn new(config: GrowthConfiguration) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GrowthConfiguration {
        &self.config
    }

    /// Advance `character` by the elapsed time in `options`.
    ///
    /// Returns the input unchanged when no time elapsed or nothing changed.
    pub fn evolve(
        &self,
        character: &Character,
        options: &EvolveOptions,
    ) -> Result<Character, EngineError> {
        let total_days = options.total_days();
        if !(total_days > 0.0) {
            debug!(character = %character.id(), total_days, "no elapsed time, skipping evolution");
            return Ok(character.clone());
        }

        if let Some(threshold) = options.prune_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ConfigurationError::PruneThreshold(threshold).into());
            }
        }

        let now = Utc::now();
        let config = character.effective_config(&self.config);
        let mut events = Vec::new();

        let mut identity = character.identity.clone();
        let mut temporal_state = character.temporal_state.clone();
        let whole_years = (total_days / DAYS_PER_YEAR).floor() as u32;
        if options.age_enabled && whole_years > 0 {
            if let Some(Age::Years(years)) = identity.age {
                identity.age = Some(Age::Years(years.saturating_add(whole_years)));
            }
            let aged = temporal_state.with_age(temporal_state.age().saturating_add(whole_years));
            events.push(HistoryEvent::new(
                EventChange::AgeIncrement {
                    amount: whole_years,
                },
                temporal_state.snapshot(),
                aged.snapshot(),
                now,
            ));
            temporal_state = aged;
        }

        let mut memory_store = character.memory_store.clone();
        if options.memory_enabled && !memory_store.is_empty() {
            let outcome = memory_store.decayed(total_days, options.prune_threshold);
            if outcome.pruned > 0 {
                debug!(
                    character = %character.id(),
                    pruned = outcome.pruned,
                    "pruned faded memories"
                );
            }
            memory_store = outcome.store;
        }

        if options.cognitive_growth {
            let assessment = calculate_growth(
                &character.knowledge,
                memory_store.entries(),
                character.emotional_state.intensity,
                config,
            );
            let (next, growth_events) = grow(&temporal_state, assessment, config.thresholds(), now);
            temporal_state = next;
            events.extend(growth_events);
        }

        let changed = identity != character.identity
            || memory_store != character.memory_store
            || temporal_state != character.temporal_state
            || !events.is_empty();
        if !changed {
            debug!(character = %character.id(), "evolution produced no change");
            return Ok(character.clone());
        }

        log_transitions(character, &events);
        let next = Character {
            identity,
            memory_store,
            temporal_state: temporal_state.stamped(now),
            history: character.history.extended(events),
            ..character.clone()
        };
        let revision = versioning::commit(character, next, &self.config)?;
        info!(
            character = %revision.id(),
            version = revision.version(),
            total_days,
            "evolved character"
        );
        Ok(revision)
    }

    /// Advance the temporal age by one.
    pub fn increment_age(&self, character: &Character) -> Result<Character, EngineError> {
        let now = Utc::now();
        let config = character.effective_config(&self.config);
        let previous = &character.temporal_state;
        let next = previous.with_age(previous.age().saturating_add(1));
        let events = record(previous, &next, EventChange::AgeIncrement { amount: 1 }, now);
        self.commit_temporal(character, next, events, now, config.thresholds())
    }

    /// Raise maturity by `amount`, capped at 1.0.
    pub fn increase_maturity(
        &self,
        character: &Character,
        amount: f64,
    ) -> Result<Character, EngineError> {
        if !(amount.is_finite() && amount > 0.0) {
            return Err(EngineError::InvalidAmount(amount));
        }
        let now = Utc::now();
        let thresholds = *character.effective_config(&self.config).thresholds();
        let previous = &character.temporal_state;
        let next = previous.with_maturity((previous.maturity() + amount).min(1.0), &thresholds);
        let events = record(previous, &next, EventChange::MaturityIncrease { amount }, now);
        self.commit_temporal(character, next, events, now, &thresholds)
    }

    /// Lower maturity by the configured decay rate, floored at 0.0.
    pub fn apply_decay(&self, character: &Character) -> Result<Character, EngineError> {
        let now = Utc::now();
        let config = character.effective_config(&self.config);
        let amount = config.decay_rate();
        let previous = &character.temporal_state;
        let next = previous.with_maturity((previous.maturity() - amount).max(0.0), config.thresholds());
        let events = record(previous, &next, EventChange::MaturityDecay { amount }, now);
        self.commit_temporal(character, next, events, now, config.thresholds())
    }

    /// Raise maturity by the growth derived from knowledge, memory volume
    /// and emotional intensity.
    pub fn apply_cognitive_growth(&self, character: &Character) -> Result<Character, EngineError> {
        let now = Utc::now();
        let config = character.effective_config(&self.config);
        let assessment = calculate_growth(
            &character.knowledge,
            character.memory_store.entries(),
            character.emotional_state.intensity,
            config,
        );
        let (next, events) = grow(&character.temporal_state, assessment, config.thresholds(), now);
        self.commit_temporal(character, next, events, now, config.thresholds())
    }

    /// Append a memory, evicting the oldest entries beyond capacity.
    pub fn remember(&self, character: &Character, entry: MemoryEntry) -> Result<Character, EngineError> {
        if entry.content.trim().is_empty() {
            return Err(EngineError::EmptyContent("memory"));
        }
        let (memory_store, evicted) = character.memory_store.with_entry(entry);
        if !evicted.is_empty() {
            debug!(
                character = %character.id(),
                evicted = evicted.len(),
                "memory store at capacity, evicted oldest entries"
            );
        }
        let next = Character {
            memory_store,
            ..character.clone()
        };
        Ok(versioning::commit(character, next, &self.config)?)
    }

    /// Append a knowledge item.
    pub fn learn(&self, character: &Character, item: KnowledgeItem) -> Result<Character, EngineError> {
        if item.topic.trim().is_empty() {
            return Err(EngineError::EmptyContent("knowledge topic"));
        }
        let mut knowledge = character.knowledge.clone();
        knowledge.push(item);
        let next = Character {
            knowledge,
            ..character.clone()
        };
        Ok(versioning::commit(character, next, &self.config)?)
    }

    /// Deep-merge `attrs` into a new revision. See [`versioning::update`].
    pub fn update(&self, character: &Character, attrs: &Value) -> Result<Character, ValidationErrors> {
        versioning::update(character, attrs, &self.config)
    }

    fn commit_temporal(
        &self,
        character: &Character,
        temporal_state: TemporalState,
        events: Vec<HistoryEvent>,
        now: DateTime<Utc>,
        thresholds: &MaturityThresholds,
    ) -> Result<Character, EngineError> {
        log_transitions(character, &events);
        debug!(
            character = %character.id(),
            maturity = temporal_state.maturity(),
            growing = thresholds.growing,
            mature = thresholds.mature,
            transcendent = thresholds.transcendent,
            "temporal state changed"
        );
        let next = Character {
            temporal_state: temporal_state.stamped(now),
            history: character.history.extended(events),
            ..character.clone()
        };
        Ok(versioning::commit(character, next, &self.config)?)
    }
}

/// Primary event for a temporal change, plus a stage transition if one occurred.
fn record(
    previous: &TemporalState,
    next: &TemporalState,
    change: EventChange,
    at: DateTime<Utc>,
) -> Vec<HistoryEvent> {
    let before = previous.snapshot();
    let after = next.snapshot();
    let mut events = vec![HistoryEvent::new(change, before, after, at)];
    if let Some((from_stage, to_stage)) = detect_transition(previous.stage(), next.stage()) {
        events.push(HistoryEvent::new(
            EventChange::StageTransition {
                from_stage,
                to_stage,
            },
            before,
            after,
            at,
        ));
    }
    events
}

fn grow(
    previous: &TemporalState,
    assessment: GrowthAssessment,
    thresholds: &MaturityThresholds,
    at: DateTime<Utc>,
) -> (TemporalState, Vec<HistoryEvent>) {
    let next = previous.with_maturity((previous.maturity() + assessment.amount).min(1.0), thresholds);
    let events = record(
        previous,
        &next,
        EventChange::CognitiveGrowth {
            amount: assessment.amount,
            factor_weights: assessment.factors,
        },
        at,
    );
    (next, events)
}

fn log_transitions(character: &Character, events: &[HistoryEvent]) {
    for event in events {
        if let EventChange::StageTransition {
            from_stage,
            to_stage,
        } = event.change
        {
            info!(
                character = %character.id(),
                from = %from_stage,
                to = %to_stage,
                "stage transition"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demiurge::growth::GrowthSettings;
    use crate::demiurge::history::EventType;
    use crate::demiurge::persona::{CharacterDraft, Identity};
    use crate::demiurge::temporal::Stage;

    fn engine() -> EvolutionEngine {
        EvolutionEngine::new(GrowthConfiguration::default())
    }

    fn character_at(maturity: f64) -> Character {
        let mut draft = CharacterDraft::new(Identity::named("Gilgamesh").with_age(Age::Years(27)));
        draft.maturity = maturity;
        draft.build(&GrowthConfiguration::default()).unwrap()
    }

    fn memory(importance: f64, decay_rate: f64) -> MemoryEntry {
        MemoryEntry::new("the cedar forest")
            .unwrap()
            .with_importance(importance)
            .with_decay_rate(decay_rate)
    }

    #[test]
    fn test_zero_elapsed_time_is_noop() {
        let engine = engine();
        let character = engine.remember(&character_at(0.3), memory(0.8, 0.2)).unwrap();
        let same = engine.evolve(&character, &EvolveOptions::default()).unwrap();
        assert_eq!(same, character);

        let negative = engine.evolve(&character, &EvolveOptions::days(-4.0)).unwrap();
        assert_eq!(negative, character);
    }

    #[test]
    fn test_increase_maturity_crosses_into_mature() {
        let engine = engine();
        let character = character_at(0.7);
        assert_eq!(character.temporal_state().stage(), Stage::Growing);

        let next = engine.increase_maturity(&character, 0.2).unwrap();
        assert!((next.temporal_state().maturity() - 0.9).abs() < 1e-12);
        assert_eq!(next.temporal_state().stage(), Stage::Mature);
        assert_eq!(next.version(), character.version() + 1);

        let types: Vec<EventType> = next.history().iter().map(|e| e.event_type()).collect();
        assert_eq!(types, vec![EventType::MaturityIncrease, EventType::StageTransition]);
        assert_eq!(next.history().stage_transitions(), vec![(Stage::Growing, Stage::Mature)]);
        assert!(character.history().is_empty());
    }

    #[test]
    fn test_increase_maturity_caps_at_one() {
        let next = engine().increase_maturity(&character_at(0.9), 5.0).unwrap();
        assert_eq!(next.temporal_state().maturity(), 1.0);
        assert_eq!(next.temporal_state().stage(), Stage::Transcendent);
    }

    #[test]
    fn test_increase_maturity_rejects_bad_amounts() {
        let engine = engine();
        let character = character_at(0.5);
        for amount in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                engine.increase_maturity(&character, amount),
                Err(EngineError::InvalidAmount(_))
            ));
        }
    }

    #[test]
    fn test_decay_floors_at_zero_and_can_regress_stage() {
        let config = GrowthConfiguration::new(GrowthSettings {
            decay_rate: 0.3,
            ..GrowthSettings::default()
        })
        .unwrap();
        let engine = EvolutionEngine::new(config.clone());
        let mut draft = CharacterDraft::new(Identity::named("Enkidu"));
        draft.maturity = 0.3;
        let character = draft.build(&config).unwrap();

        let decayed = engine.apply_decay(&character).unwrap();
        assert_eq!(decayed.temporal_state().maturity(), 0.0);
        assert_eq!(decayed.history().stage_transitions(), vec![(Stage::Growing, Stage::Initial)]);

        let again = engine.apply_decay(&decayed).unwrap();
        assert_eq!(again.temporal_state().maturity(), 0.0);
        assert_eq!(again.history().len(), 3);
        match again.history().last().map(|e| &e.change) {
            Some(EventChange::MaturityDecay { amount }) => assert_eq!(*amount, 0.3),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_increment_age() {
        let engine = engine();
        let character = character_at(0.1);
        let older = engine.increment_age(&engine.increment_age(&character).unwrap()).unwrap();
        assert_eq!(older.temporal_state().age(), 2);
        assert_eq!(older.version(), 3);
        assert_eq!(older.history().events_of(EventType::AgeIncrement).count(), 2);
    }

    #[test]
    fn test_cognitive_growth_logs_factors() {
        let engine = engine();
        let mut character = character_at(0.0);
        character = engine
            .learn(&character, KnowledgeItem::new("astronomy", "").with_confidence(0.8))
            .unwrap();
        character = engine
            .learn(&character, KnowledgeItem::new("poetry", "").with_confidence(0.9))
            .unwrap();
        character = engine.remember(&character, memory(0.5, 0.1)).unwrap();
        character = engine.remember(&character, memory(0.5, 0.1)).unwrap();
        character = engine
            .update(&character, &serde_json::json!({"emotional_state": {"intensity": 0.7}}))
            .unwrap();

        let grown = engine.apply_cognitive_growth(&character).unwrap();
        assert!((grown.temporal_state().maturity() - 0.55).abs() < 1e-9);
        assert_eq!(grown.temporal_state().stage(), Stage::Growing);

        let first = &grown.history().events()[0];
        match &first.change {
            EventChange::CognitiveGrowth {
                amount,
                factor_weights,
            } => {
                assert!((amount - 0.55).abs() < 1e-9);
                assert!((factor_weights.knowledge - 0.2833).abs() < 1e-3);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(grown.history().stage_transitions(), vec![(Stage::Initial, Stage::Growing)]);
    }

    #[test]
    fn test_evolve_ages_and_decays() {
        let engine = engine();
        let character = engine.remember(&character_at(0.3), memory(1.0, 0.1)).unwrap();
        let evolved = engine
            .evolve(
                &character,
                &EvolveOptions {
                    days: 10.0,
                    years: 2.0,
                    ..EvolveOptions::default()
                },
            )
            .unwrap();

        assert_eq!(evolved.identity().age, Some(Age::Years(29)));
        assert_eq!(evolved.version(), character.version() + 1);
        assert!(evolved.memory_store().is_empty(), "faded memory should be pruned");
        assert_eq!(evolved.history().events_of(EventType::AgeIncrement).count(), 1);
    }

    #[test]
    fn test_evolve_leaves_descriptive_age() {
        let engine = engine();
        let mut draft = CharacterDraft::new(Identity::named("Tiamat").with_age(Age::Descriptive("ancient".into())));
        draft.maturity = 0.5;
        let character = draft.build(engine.config()).unwrap();

        let evolved = engine.evolve(&character, &EvolveOptions::years(3.0)).unwrap();
        assert_eq!(evolved.identity().age, Some(Age::Descriptive("ancient".into())));
        assert_eq!(evolved.temporal_state().age(), 3);

        let idle = EvolveOptions {
            years: 3.0,
            age_enabled: false,
            ..EvolveOptions::default()
        };
        assert_eq!(engine.evolve(&character, &idle).unwrap(), character);
    }

    #[test]
    fn test_evolve_age_event_records_both_ages() {
        let engine = engine();
        let character = character_at(0.3);
        let evolved = engine.evolve(&character, &EvolveOptions::years(2.0)).unwrap();

        assert_eq!(evolved.identity().age, Some(Age::Years(29)));
        assert_eq!(evolved.temporal_state().age(), 2);
        let event = evolved.history().last().unwrap();
        assert_eq!(event.change, EventChange::AgeIncrement { amount: 2 });
        assert_eq!(event.previous_state.age, 0);
        assert_eq!(event.new_state.age, 2);
    }

    #[test]
    fn test_evolve_decays_surviving_memory() {
        let engine = engine();
        let character = engine.remember(&character_at(0.3), memory(1.0, 0.1)).unwrap();
        let evolved = engine.evolve(&character, &EvolveOptions::days(7.5)).unwrap();

        let entries = evolved.memory_store().entries();
        assert_eq!(entries.len(), 1);
        assert!((entries[0].importance - 0.9f64.powf(7.5)).abs() < 1e-12);
        assert_eq!(evolved.temporal_state().age(), 0);
        assert!(evolved.history().is_empty());
    }

    #[test]
    fn test_evolve_without_pruning_keeps_faint_memory() {
        let engine = engine();
        let character = engine.remember(&character_at(0.3), memory(0.1, 0.5)).unwrap();
        let options = EvolveOptions {
            days: 7.0,
            prune_threshold: None,
            ..EvolveOptions::default()
        };
        let evolved = engine.evolve(&character, &options).unwrap();

        let entries = evolved.memory_store().entries();
        assert_eq!(entries.len(), 1);
        assert!((entries[0].importance - 0.1 * 0.5f64.powi(7)).abs() < 1e-12);
    }

    #[test]
    fn test_evolve_with_memory_disabled_leaves_memories() {
        let engine = engine();
        let character = engine.remember(&character_at(0.3), memory(0.1, 0.5)).unwrap();
        let options = EvolveOptions {
            days: 30.0,
            memory_enabled: false,
            ..EvolveOptions::default()
        };
        let evolved = engine.evolve(&character, &options).unwrap();
        assert_eq!(evolved, character);
        assert_eq!(evolved.memory_store().entries()[0].importance, 0.1);
    }

    #[test]
    fn test_zero_elapsed_time_skips_threshold_check() {
        let engine = engine();
        let character = character_at(0.3);
        let options = EvolveOptions {
            days: 0.0,
            prune_threshold: Some(2.0),
            ..EvolveOptions::default()
        };
        assert_eq!(engine.evolve(&character, &options).unwrap(), character);
    }

    #[test]
    fn test_operations_survive_threshold_change() {
        let character = character_at(0.5);
        assert_eq!(character.temporal_state().stage(), Stage::Growing);

        let strict = GrowthConfiguration::with_thresholds(MaturityThresholds {
            growing: 0.1,
            mature: 0.3,
            transcendent: 0.9,
        })
        .unwrap();
        let engine = EvolutionEngine::new(strict);

        let remembered = engine.remember(&character, memory(0.8, 0.0)).unwrap();
        assert_eq!(remembered.temporal_state().stage(), Stage::Mature);
        assert_eq!(remembered.history().stage_transitions(), vec![(Stage::Growing, Stage::Mature)]);

        let evolved = engine.evolve(&character, &EvolveOptions::years(1.0)).unwrap();
        assert_eq!(evolved.temporal_state().stage(), Stage::Mature);
        assert_eq!(evolved.identity().age, Some(Age::Years(28)));

        let updated = engine
            .update(&character, &serde_json::json!({"identity": {"role": "king of Uruk"}}))
            .unwrap();
        assert_eq!(updated.temporal_state().stage(), Stage::Mature);
        assert_eq!(updated.history().len(), 1);

        let learned = engine
            .learn(&remembered, KnowledgeItem::new("walls", ""))
            .unwrap();
        assert_eq!(learned.history().len(), 1, "stage already current, no new transition");
    }

    #[test]
    fn test_evolve_with_cognitive_growth() {
        let engine = engine();
        let character = engine.remember(&character_at(0.0), memory(0.9, 0.0)).unwrap();
        let evolved = engine
            .evolve(
                &character,
                &EvolveOptions {
                    days: 1.0,
                    age_enabled: false,
                    cognitive_growth: true,
                    ..EvolveOptions::default()
                },
            )
            .unwrap();
        // emotional 0.5 default, one memory, no knowledge
        let expected = (0.0 + 1.0 / 20.0 + 0.5) / 3.0;
        assert!((evolved.temporal_state().maturity() - expected).abs() < 1e-9);
        assert_eq!(evolved.version(), character.version() + 1);
    }

    #[test]
    fn test_evolve_rejects_bad_prune_threshold() {
        let options = EvolveOptions {
            days: 1.0,
            prune_threshold: Some(1.5),
            ..EvolveOptions::default()
        };
        assert!(matches!(
            engine().evolve(&character_at(0.1), &options),
            Err(EngineError::Configuration(ConfigurationError::PruneThreshold(_)))
        ));
    }

    #[test]
    fn test_character_config_overrides_shared() {
        let own = GrowthConfiguration::with_thresholds(MaturityThresholds {
            growing: 0.1,
            mature: 0.2,
            transcendent: 0.3,
        })
        .unwrap();
        let engine = engine();
        let mut draft = CharacterDraft::new(Identity::named("Shamash"));
        draft.growth_config = Some(own);
        let character = draft.build(engine.config()).unwrap();

        let next = engine.increase_maturity(&character, 0.25).unwrap();
        assert_eq!(next.temporal_state().stage(), Stage::Mature);
    }

    #[test]
    fn test_remember_respects_capacity() {
        let engine = engine();
        let mut draft = CharacterDraft::new(Identity::named("Siduri"));
        draft.memory_store = crate::totems::memory::MemoryStore::new(2).unwrap();
        let mut character = draft.build(engine.config()).unwrap();
        for text in ["one", "two", "three"] {
            character = engine
                .remember(&character, MemoryEntry::new(text).unwrap())
                .unwrap();
        }
        let contents: Vec<&str> = character
            .memory_store()
            .entries()
            .iter()
            .map(|e| e.content.as_str())
            .collect();
        assert_eq!(contents, vec!["two", "three"]);
    }
}
