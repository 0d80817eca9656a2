//! History Log - Append-Only Audit of State Changes
//!
//! Every operator that changes temporal state records a typed event here.
//! Events are never mutated or removed once recorded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::demiurge::cognition::FactorBreakdown;
use crate::demiurge::temporal::{Stage, TemporalSnapshot};

/// Discriminant of [`EventChange`], for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    AgeIncrement,
    MaturityIncrease,
    MaturityDecay,
    StageTransition,
    CognitiveGrowth,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::AgeIncrement => write!(f, "age_increment"),
            EventType::MaturityIncrease => write!(f, "maturity_increase"),
            EventType::MaturityDecay => write!(f, "maturity_decay"),
            EventType::StageTransition => write!(f, "stage_transition"),
            EventType::CognitiveGrowth => write!(f, "cognitive_growth"),
        }
    }
}

/// Event-specific payload, one variant per event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "metadata", rename_all = "snake_case")]
pub enum EventChange {
    AgeIncrement { amount: u32 },
    MaturityIncrease { amount: f64 },
    MaturityDecay { amount: f64 },
    StageTransition { from_stage: Stage, to_stage: Stage },
    CognitiveGrowth {
        amount: f64,
        factor_weights: FactorBreakdown,
    },
}

impl EventChange {
    pub fn event_type(&self) -> EventType {
        match self {
            EventChange::AgeIncrement { .. } => EventType::AgeIncrement,
            EventChange::MaturityIncrease { .. } => EventType::MaturityIncrease,
            EventChange::MaturityDecay { .. } => EventType::MaturityDecay,
            EventChange::StageTransition { .. } => EventType::StageTransition,
            EventChange::CognitiveGrowth { .. } => EventType::CognitiveGrowth,
        }
    }

    fn describe(&self) -> String {
        match self {
            EventChange::AgeIncrement { amount } => format!("Aged by {} year(s)", amount),
            EventChange::MaturityIncrease { amount } => {
                format!("Maturity increased by {:.3}", amount)
            }
            EventChange::MaturityDecay { amount } => format!("Maturity decayed by {:.3}", amount),
            EventChange::StageTransition {
                from_stage,
                to_stage,
            } => format!("Stage changed from {} to {}", from_stage, to_stage),
            EventChange::CognitiveGrowth { amount, .. } => {
                format!("Cognitive growth of {:.3}", amount)
            }
        }
    }
}

/// Immutable record of a single state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub id: Uuid,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub previous_state: TemporalSnapshot,
    pub new_state: TemporalSnapshot,
    #[serde(flatten)]
    pub change: EventChange,
}

impl HistoryEvent {
    pub fn new(
        change: EventChange,
        previous_state: TemporalSnapshot,
        new_state: TemporalSnapshot,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: change.describe(),
            timestamp,
            previous_state,
            new_state,
            change,
        }
    }

    pub fn event_type(&self) -> EventType {
        self.change.event_type()
    }
}

/// Ordered event log, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    events: Vec<HistoryEvent>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HistoryEvent> {
        self.events.iter()
    }

    pub fn events(&self) -> &[HistoryEvent] {
        &self.events
    }

    pub fn last(&self) -> Option<&HistoryEvent> {
        self.events.last()
    }

    /// The last `n` events, oldest first.
    pub fn recent(&self, n: usize) -> &[HistoryEvent] {
        let start = self.events.len().saturating_sub(n);
        &self.events[start..]
    }

    pub fn events_of(&self, event_type: EventType) -> impl Iterator<Item = &HistoryEvent> {
        self.events
            .iter()
            .filter(move |e| e.event_type() == event_type)
    }

    /// `(from, to)` pairs for every recorded stage transition.
    pub fn stage_transitions(&self) -> Vec<(Stage, Stage)> {
        self.events
            .iter()
            .filter_map(|e| match e.change {
                EventChange::StageTransition {
                    from_stage,
                    to_stage,
                } => Some((from_stage, to_stage)),
                _ => None,
            })
            .collect()
    }

    /// New log with `events` appended after the existing ones.
    pub fn extended(&self, events: impl IntoIterator<Item = HistoryEvent>) -> Self {
        let mut next = self.events.clone();
        next.extend(events);
        Self { events: next }
    }

    /// True when `self` starts with every event of `earlier`, in order.
    pub fn extends(&self, earlier: &History) -> bool {
        self.events.starts_with(&earlier.events)
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a HistoryEvent;
    type IntoIter = std::slice::Iter<'a, HistoryEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
