//! Cognitive Growth Calculator
//!
//! Derives a maturity increment from three factors: average knowledge
//! confidence, memory volume and current emotional intensity.

use serde::{Deserialize, Serialize};

use crate::demiurge::growth::{GrowthConfiguration, WeightingMode};
use crate::demiurge::persona::KnowledgeItem;
use crate::totems::memory::MemoryEntry;

/// Confidence assumed for knowledge items that carry none.
pub const DEFAULT_KNOWLEDGE_CONFIDENCE: f64 = 0.75;

/// Memory count at which the memory factor saturates.
pub const MEMORY_SATURATION: usize = 20;

/// Contribution of each factor to the growth amount.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FactorBreakdown {
    pub knowledge: f64,
    pub memory: f64,
    pub emotional: f64,
}

impl FactorBreakdown {
    pub fn total(&self) -> f64 {
        self.knowledge + self.memory + self.emotional
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthAssessment {
    pub amount: f64,
    pub factors: FactorBreakdown,
}

pub fn knowledge_score(knowledge: &[KnowledgeItem]) -> f64 {
    if knowledge.is_empty() {
        return 0.0;
    }
    let total: f64 = knowledge
        .iter()
        .map(|k| k.confidence.unwrap_or(DEFAULT_KNOWLEDGE_CONFIDENCE))
        .sum();
    total / knowledge.len() as f64
}

/// Saturating linear function of volume; importance is not considered.
pub fn memory_score(memories: &[MemoryEntry]) -> f64 {
    (memories.len() as f64 / MEMORY_SATURATION as f64).min(1.0)
}

pub fn calculate_growth(
    knowledge: &[KnowledgeItem],
    memories: &[MemoryEntry],
    emotional_intensity: f64,
    config: &GrowthConfiguration,
) -> GrowthAssessment {
    let k = knowledge_score(knowledge);
    let m = memory_score(memories);
    let e = if emotional_intensity.is_nan() {
        0.0
    } else {
        emotional_intensity.clamp(0.0, 1.0)
    };

    let factors = match config.weighting() {
        WeightingMode::Equal => FactorBreakdown {
            knowledge: k / 3.0,
            memory: m / 3.0,
            emotional: e / 3.0,
        },
        WeightingMode::Configured => {
            let rate = config.growth_rate();
            FactorBreakdown {
                knowledge: k * config.knowledge_weight() * rate,
                memory: m * config.memory_weight() * rate,
                emotional: e * config.emotional_weight() * rate,
            }
        }
    };

    let amount = match config.weighting() {
        WeightingMode::Equal => (k + m + e) / 3.0,
        WeightingMode::Configured => factors.total(),
    };

    GrowthAssessment { amount, factors }
}
