//! Character schema checks applied to every new revision.

use crate::demiurge::growth::GrowthConfiguration;
use crate::demiurge::persona::{Age, Character};
use crate::demiurge::temporal::resolve_stage;
use crate::error::{FieldError, ValidationErrors};

fn unit_range(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

/// Check every constraint on `character`, collecting all failures.
///
/// Stage consistency is checked against the character's own configuration
/// when it carries one, otherwise against `shared`.
pub fn validate(character: &Character, shared: &GrowthConfiguration) -> Result<(), ValidationErrors> {
    let mut errors = field_errors(character);
    let temporal = &character.temporal_state;
    if unit_range(temporal.maturity()) {
        let config = character.effective_config(shared);
        let expected = resolve_stage(temporal.maturity(), config.thresholds());
        if temporal.stage() != expected {
            errors.push(FieldError::new(
                "temporal_state.stage",
                format!(
                    "stage {} is inconsistent with maturity {} (expected {})",
                    temporal.stage(),
                    temporal.maturity(),
                    expected
                ),
            ));
        }
    }
    finish(errors)
}

/// Every check except stage consistency, for revisions read back from
/// storage. The stage is re-resolved on the next commit.
pub fn validate_stored(character: &Character) -> Result<(), ValidationErrors> {
    finish(field_errors(character))
}

fn finish(errors: Vec<FieldError>) -> Result<(), ValidationErrors> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors::new(errors))
    }
}

fn field_errors(character: &Character) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if character.version == 0 {
        errors.push(FieldError::new("version", "must be at least 1"));
    }
    if character.updated_at < character.created_at {
        errors.push(FieldError::new("updated_at", "must not precede created_at"));
    }

    let identity = &character.identity;
    if identity.name.trim().is_empty() {
        errors.push(FieldError::new("identity.name", "cannot be empty"));
    }
    if let Some(Age::Descriptive(word)) = &identity.age {
        if word.trim().is_empty() {
            errors.push(FieldError::new("identity.age", "descriptive age cannot be empty"));
        }
    }

    for (name, value) in &character.personality.traits {
        if !unit_range(*value) {
            errors.push(FieldError::new(
                format!("personality.traits.{}", name),
                format!("must be within [0, 1], got {}", value),
            ));
        }
    }

    for (i, item) in character.knowledge.iter().enumerate() {
        if item.topic.trim().is_empty() {
            errors.push(FieldError::new(format!("knowledge[{}].topic", i), "cannot be empty"));
        }
        if let Some(confidence) = item.confidence {
            if !unit_range(confidence) {
                errors.push(FieldError::new(
                    format!("knowledge[{}].confidence", i),
                    format!("must be within [0, 1], got {}", confidence),
                ));
            }
        }
    }

    let intensity = character.emotional_state.intensity;
    if !unit_range(intensity) {
        errors.push(FieldError::new(
            "emotional_state.intensity",
            format!("must be within [0, 1], got {}", intensity),
        ));
    }

    let maturity = character.temporal_state.maturity();
    if !unit_range(maturity) {
        errors.push(FieldError::new(
            "temporal_state.maturity",
            format!("must be within [0, 1], got {}", maturity),
        ));
    }

    let store = &character.memory_store;
    if store.capacity() == 0 {
        errors.push(FieldError::new("memory_store.capacity", "must be greater than zero"));
    } else if store.len() > store.capacity() {
        errors.push(FieldError::new(
            "memory_store.entries",
            format!("holds {} entries, capacity is {}", store.len(), store.capacity()),
        ));
    }
    for (i, entry) in store.entries().iter().enumerate() {
        if entry.content.trim().is_empty() {
            errors.push(FieldError::new(
                format!("memory_store.entries[{}].content", i),
                "cannot be empty",
            ));
        }
        if !unit_range(entry.importance) {
            errors.push(FieldError::new(
                format!("memory_store.entries[{}].importance", i),
                format!("must be within [0, 1], got {}", entry.importance),
            ));
        }
        if !unit_range(entry.decay_rate) {
            errors.push(FieldError::new(
                format!("memory_store.entries[{}].decay_rate", i),
                format!("must be within [0, 1], got {}", entry.decay_rate),
            ));
        }
    }

    errors
}
