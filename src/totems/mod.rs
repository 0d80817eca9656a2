//! Totems Level - Memory and Persistence
//!
//! Decaying memory entries held by each character, and the repositories
//! that keep character revisions between runs.

pub mod memory;
pub mod persistence;

pub use memory::{evolve_memory, DecayOutcome, MemoryEntry, MemoryStore};
pub use persistence::{CharacterRepository, InMemoryRepository, JsonFileRepository};
