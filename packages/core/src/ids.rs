//! Identifier and Clock Provider Abstraction
//!
//! Every id in a Mew transaction is generated on the client, and every
//! timestamp doubles as an ordering token for relation positions. This module
//! puts both behind one trait so the update builder can be driven by a
//! deterministic source in tests.
//!
//! # Examples
//!
//! ```rust
//! use mew_clipper_core::ids::{IdGenerator, SystemIdGenerator};
//!
//! let ids = SystemIdGenerator::new();
//! let first = ids.now_millis();
//! assert_ne!(ids.new_id(), ids.new_id());
//! assert!(ids.now_millis() >= first);
//! ```

use chrono::Utc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use uuid::Uuid;

/// Source of unique ids and monotonic millisecond timestamps
pub trait IdGenerator: Send + Sync {
    /// Return a new collision-free identifier
    fn new_id(&self) -> String;

    /// Current time in milliseconds since the Unix epoch, never decreasing
    /// between calls on the same generator
    fn now_millis(&self) -> i64;
}

/// Production generator: UUID v4 ids and the system clock
///
/// The clock is clamped to a high-water mark so a wall-clock step backwards
/// never yields a timestamp smaller than one already handed out.
#[derive(Debug, Default)]
pub struct SystemIdGenerator {
    high_water: AtomicI64,
}

impl SystemIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SystemIdGenerator {
    fn new_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn now_millis(&self) -> i64 {
        let wall = Utc::now().timestamp_millis();
        let previous = self.high_water.fetch_max(wall, Ordering::SeqCst);
        previous.max(wall)
    }
}

/// Deterministic generator for reproducible transactions
///
/// Ids are `{prefix}-{n}` with `n` counting from 1. The clock stays at the
/// configured instant until [`SequentialIdGenerator::advance`] moves it.
///
/// ```rust
/// use mew_clipper_core::ids::{IdGenerator, SequentialIdGenerator};
///
/// let ids = SequentialIdGenerator::new("id", 1_000);
/// assert_eq!(ids.new_id(), "id-1");
/// assert_eq!(ids.new_id(), "id-2");
/// ids.advance(5);
/// assert_eq!(ids.now_millis(), 1_005);
/// ```
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    counter: AtomicU64,
    clock: AtomicI64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>, start_millis: i64) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
            clock: AtomicI64::new(start_millis),
        }
    }

    /// Move the clock forward by `millis`
    pub fn advance(&self, millis: i64) {
        self.clock.fetch_add(millis.max(0), Ordering::SeqCst);
    }

    /// Number of ids handed out so far
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn new_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{}", self.prefix, n)
    }

    fn now_millis(&self) -> i64 {
        self.clock.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_system_ids_are_unique() {
        let ids = SystemIdGenerator::new();
        let generated: HashSet<String> = (0..1000).map(|_| ids.new_id()).collect();
        assert_eq!(generated.len(), 1000);
    }

    #[test]
    fn test_system_clock_never_decreases() {
        let ids = SystemIdGenerator::new();
        let mut last = ids.now_millis();
        for _ in 0..1000 {
            let now = ids.now_millis();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn test_system_clock_respects_high_water_mark() {
        let ids = SystemIdGenerator::new();
        let future = Utc::now().timestamp_millis() + 60_000;
        ids.high_water.store(future, Ordering::SeqCst);
        assert_eq!(ids.now_millis(), future);
    }

    #[test]
    fn test_sequential_generator_counts_and_advances() {
        let ids = SequentialIdGenerator::new("node", 42);
        assert_eq!(ids.new_id(), "node-1");
        assert_eq!(ids.new_id(), "node-2");
        assert_eq!(ids.issued(), 2);
        assert_eq!(ids.now_millis(), 42);
        ids.advance(8);
        assert_eq!(ids.now_millis(), 50);
        ids.advance(-3);
        assert_eq!(ids.now_millis(), 50);
    }
}
