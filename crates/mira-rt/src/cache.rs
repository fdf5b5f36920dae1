//! Per-site inline caches.
//!
//! A front-end obtains one slot per static access site and threads it back
//! into every dispatch call for that site. Slots are monomorphic: they hold
//! exactly one `(predicate, function)` pair. A probe succeeds only while the
//! cached predicate still accepts the receiver, so staleness is detected
//! rather than assumed. A miss overwrites the pair; there is no polymorphic
//! tier, and a site that alternates between two classes re-resolves on
//! every call.
//!
//! Slots are taken by `&mut`, so each is owned by exactly one site.

use std::fmt;

use serde::Serialize;

use crate::builtins::IndexShape;
use crate::class::{Accessor, ClassId, Method, Mutator, Predicate};
use crate::value::Value;

/// Hit/miss counters for a single site.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

struct CacheEntry<F> {
    predicate: Predicate,
    class: ClassId,
    target: F,
}

/// Monomorphic cache cell: cold (empty) or warm (predicate + function).
pub struct CacheSlot<F> {
    entry: Option<CacheEntry<F>>,
    stats: CacheStats,
}

/// Site for field reads.
pub type FieldSite = CacheSlot<Accessor>;
/// Site for field writes.
pub type StoreSite = CacheSlot<Mutator>;
/// Site for method calls.
pub type CallSite = CacheSlot<Method>;

impl<F: Clone> CacheSlot<F> {
    /// A cold slot.
    pub fn new() -> Self {
        CacheSlot {
            entry: None,
            stats: CacheStats::default(),
        }
    }

    pub fn is_warm(&self) -> bool {
        self.entry.is_some()
    }

    /// The class whose member is currently cached.
    pub fn class(&self) -> Option<&ClassId> {
        self.entry.as_ref().map(|e| &e.class)
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Return the cached function if the cached predicate accepts
    /// `receiver`. Counts a hit or a miss.
    pub fn probe(&mut self, receiver: &Value) -> Option<F> {
        match &self.entry {
            Some(entry) if entry.predicate.accepts(receiver) => {
                self.stats.hits += 1;
                Some(entry.target.clone())
            }
            _ => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Overwrite the slot after a successful resolution.
    pub fn fill(&mut self, class: ClassId, predicate: Predicate, target: F) {
        self.entry = Some(CacheEntry {
            predicate,
            class,
            target,
        });
    }
}

impl<F: Clone> Default for CacheSlot<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> fmt::Debug for CacheSlot<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entry {
            Some(e) => f
                .debug_struct("CacheSlot")
                .field("class", &e.class)
                .field("predicate", &e.predicate)
                .field("stats", &self.stats)
                .finish(),
            None => f
                .debug_struct("CacheSlot")
                .field("cold", &true)
                .field("stats", &self.stats)
                .finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// Positional sites
// ---------------------------------------------------------------------------

/// Cache for positional access. Only the shape decision is cached; the
/// index is an argument of every call.
#[derive(Debug, Default, Clone)]
pub struct IndexSite {
    shape: Option<IndexShape>,
    stats: CacheStats,
}

impl IndexSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shape(&self) -> Option<IndexShape> {
        self.shape
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn probe(&mut self, receiver: &Value) -> Option<IndexShape> {
        match self.shape {
            Some(shape) if shape.accepts(receiver) => {
                self.stats.hits += 1;
                Some(shape)
            }
            _ => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn fill(&mut self, shape: IndexShape) {
        self.shape = Some(shape);
    }
}
