//! Memory Store - Capacity-Bounded Decaying Memories
//!
//! Entries lose importance exponentially over elapsed time and are pruned
//! once they fall below a threshold. Capacity is enforced only when a new
//! entry is inserted, evicting the oldest entries first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConfigurationError, EngineError};

pub const DEFAULT_IMPORTANCE: f64 = 0.5;
pub const DEFAULT_DECAY_RATE: f64 = 0.1;
pub const DEFAULT_CAPACITY: usize = 100;
pub const DEFAULT_PRUNE_THRESHOLD: f64 = 0.05;

fn default_importance() -> f64 {
    DEFAULT_IMPORTANCE
}

fn default_decay_rate() -> f64 {
    DEFAULT_DECAY_RATE
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

/// A single remembered item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub content: String,
    /// Effective importance (0.0 - 1.0), recomputed on every evolution step
    #[serde(default = "default_importance")]
    pub importance: f64,
    /// Fraction of importance lost per elapsed day (0.0 - 1.0)
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl MemoryEntry {
    /// Create an entry with default importance and decay rate.
    pub fn new(content: impl Into<String>) -> Result<Self, EngineError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(EngineError::EmptyContent("memory"));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            content,
            importance: DEFAULT_IMPORTANCE,
            decay_rate: DEFAULT_DECAY_RATE,
            category: None,
            timestamp: Utc::now(),
        })
    }

    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance = importance.clamp(0.0, 1.0);
        self
    }

    pub fn with_decay_rate(mut self, decay_rate: f64) -> Self {
        self.decay_rate = decay_rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Importance after `elapsed_days` of exponential decay.
    pub fn effective_importance(&self, elapsed_days: f64) -> f64 {
        if elapsed_days <= 0.0 {
            return self.importance;
        }
        (self.importance * (1.0 - self.decay_rate).powf(elapsed_days)).max(0.0)
    }

    /// Copy of this entry with importance decayed by `elapsed_days`.
    pub fn decayed(&self, elapsed_days: f64) -> Self {
        Self {
            importance: self.effective_importance(elapsed_days),
            ..self.clone()
        }
    }
}

/// Decay every entry and drop those strictly below `prune_threshold`.
///
/// Capacity is not enforced here.
pub fn evolve_memory(
    entries: &[MemoryEntry],
    elapsed_days: f64,
    prune_threshold: Option<f64>,
) -> Vec<MemoryEntry> {
    entries
        .iter()
        .map(|entry| entry.decayed(elapsed_days))
        .filter(|entry| match prune_threshold {
            Some(threshold) => entry.importance >= threshold,
            None => true,
        })
        .collect()
}

/// Ordered memories, oldest first, bounded by `capacity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    entries: Vec<MemoryEntry>,
    #[serde(default = "default_capacity")]
    capacity: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Outcome of a decay pass over a store.
#[derive(Debug, Clone, PartialEq)]
pub struct DecayOutcome {
    pub store: MemoryStore,
    pub pruned: usize,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Result<Self, ConfigurationError> {
        if capacity == 0 {
            return Err(ConfigurationError::ZeroCapacity);
        }
        Ok(Self {
            entries: Vec::new(),
            capacity,
        })
    }

    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Entries whose category matches `category` exactly.
    pub fn by_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a MemoryEntry> {
        self.entries
            .iter()
            .filter(move |e| e.category.as_deref() == Some(category))
    }

    /// The `n` highest-importance entries, most important first.
    pub fn most_important(&self, n: usize) -> Vec<&MemoryEntry> {
        let mut ranked: Vec<&MemoryEntry> = self.entries.iter().collect();
        ranked.sort_by(|a, b| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(n);
        ranked
    }

    /// New store with `entry` appended, evicting the oldest entries while
    /// over capacity. Returns the evicted entries alongside.
    pub fn with_entry(&self, entry: MemoryEntry) -> (Self, Vec<MemoryEntry>) {
        let mut entries = self.entries.clone();
        entries.push(entry);

        let capacity = self.capacity.max(1);
        let over = entries.len().saturating_sub(capacity);
        let evicted: Vec<MemoryEntry> = entries.drain(0..over).collect();

        (
            Self {
                entries,
                capacity: self.capacity,
            },
            evicted,
        )
    }

    /// New store after `elapsed_days` of decay and optional pruning.
    pub fn decayed(&self, elapsed_days: f64, prune_threshold: Option<f64>) -> DecayOutcome {
        let entries = evolve_memory(&self.entries, elapsed_days, prune_threshold);
        let pruned = self.entries.len() - entries.len();
        DecayOutcome {
            store: Self {
                entries,
                capacity: self.capacity,
            },
            pruned,
        }
    }
}
