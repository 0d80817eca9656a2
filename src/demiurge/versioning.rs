//! Versioned Update Wrapper
//!
//! Every accepted change produces a new revision: `version` grows by one,
//! `updated_at` is refreshed and the lineage identity (`id`, `created_at`)
//! is carried forward from the previous revision. The previous value is
//! never touched, so a rejected change leaves it valid and usable.

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::demiurge::growth::GrowthConfiguration;
use crate::demiurge::history::{EventChange, HistoryEvent};
use crate::demiurge::persona::Character;
use crate::demiurge::temporal::detect_transition;
use crate::demiurge::validation;
use crate::error::ValidationErrors;

/// Fields that callers cannot change through [`update`].
pub const PROTECTED_FIELDS: [&str; 4] = ["id", "created_at", "temporal_state", "history"];

/// Turn `next` into the revision following `previous`.
///
/// The stage is re-resolved under the revision's effective thresholds, so a
/// threshold change shows up as a `StageTransition` on the next commit.
pub fn commit(
    previous: &Character,
    next: Character,
    shared: &GrowthConfiguration,
) -> Result<Character, ValidationErrors> {
    let version = previous
        .version
        .checked_add(1)
        .ok_or_else(|| ValidationErrors::single("version", "version counter exhausted"))?;

    let mut revision = Character {
        id: previous.id,
        created_at: previous.created_at,
        version,
        updated_at: Utc::now().max(previous.updated_at),
        ..next
    };

    let thresholds = *revision.effective_config(shared).thresholds();
    let restaged = revision.temporal_state.restaged(&thresholds);
    if let Some((from_stage, to_stage)) =
        detect_transition(revision.temporal_state.stage(), restaged.stage())
    {
        info!(
            character = %revision.id,
            from = %from_stage,
            to = %to_stage,
            "stage re-resolved under current thresholds"
        );
        let event = HistoryEvent::new(
            EventChange::StageTransition {
                from_stage,
                to_stage,
            },
            revision.temporal_state.snapshot(),
            restaged.snapshot(),
            revision.updated_at,
        );
        revision.history = revision.history.extended([event]);
        revision.temporal_state = restaged;
    }

    validation::validate(&revision, shared)?;
    debug!(
        character = %revision.id,
        version = revision.version,
        "committed character revision"
    );
    Ok(revision)
}

/// Deep-merge `attrs` into `character` and commit the result.
///
/// Objects merge key by key; every other value, arrays included, replaces
/// the existing one wholesale. Keys in [`PROTECTED_FIELDS`] are ignored, and
/// `version`/`updated_at` are always recomputed.
pub fn update(
    character: &Character,
    attrs: &Value,
    shared: &GrowthConfiguration,
) -> Result<Character, ValidationErrors> {
    let patch = attrs
        .as_object()
        .ok_or_else(|| ValidationErrors::single("$", "update attributes must be an object"))?;

    let patch: Map<String, Value> = patch
        .iter()
        .filter(|(key, _)| !PROTECTED_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let mut document = serde_json::to_value(character)
        .map_err(|e| ValidationErrors::single("$", e.to_string()))?;
    merge_object(&mut document, &patch);

    let merged: Character = serde_json::from_value(document)
        .map_err(|e| ValidationErrors::single("$", e.to_string()))?;
    commit(character, merged, shared)
}

/// Recursive merge of `patch` into `target`.
pub fn deep_merge(target: &mut Value, patch: &Value) {
    match patch {
        Value::Object(patch) => merge_object(target, patch),
        other => *target = other.clone(),
    }
}

fn merge_object(target: &mut Value, patch: &Map<String, Value>) {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target) = target {
        for (key, value) in patch {
            let nested = value.is_object() && target.get(key).map_or(false, Value::is_object);
            if nested {
                if let Some(existing) = target.get_mut(key) {
                    deep_merge(existing, value);
                }
            } else {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}
