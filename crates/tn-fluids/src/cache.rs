//! Memoization of property lookups.
//!
//! Keys combine the evaluated quantity, the quantized composition and the
//! quantized state. Quantization keeps 44 mantissa bits, so keys only collide for
//! states closer than about 6e-14 relative: repeated queries (reference states,
//! fixed streams, untouched finite-difference columns) hit, while Newton
//! iterates never see a piecewise-constant property surface.
//!
//! Since nearly every Newton iterate is a new key, the table is bounded. Entries
//! live in two generations of at most half the capacity each; when the current
//! generation fills up it replaces the previous one, which is dropped. Lookups
//! still answered from the previous generation move back into the current one.
//!
//! The cache is owned by a [`MixtureEvaluator`](crate::MixtureEvaluator)
//! session. Concurrent writers may race on the same key; since both compute the
//! same value the last write wins.

use std::collections::HashMap;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use tn_core::numeric::quantize;

use crate::error::FluidResult;
use crate::mixture::MixtureProperty;
use crate::source::{PropertySource, PureProperty};
use crate::species::Species;

/// Quantity a cache entry stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CachedQuantity {
    /// Pure-species property at (p, T).
    Pure(PureProperty),
    /// Mixture property at (p, T), relative to the session reference where applicable.
    Mixture(MixtureProperty),
    /// Temperature from (p, h).
    TemperatureFromEnthalpy,
    /// Temperature from (p, s).
    TemperatureFromEntropy,
    /// Saturated enthalpy at p; the second state slot carries the quality.
    SaturatedEnthalpy,
}

/// Hashable cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    quantity: CachedQuantity,
    composition: Box<[(Species, i64)]>,
    p: i64,
    state: i64,
}

impl CacheKey {
    /// Key for `quantity` of `composition` (already quantized) at pressure `p`
    /// and second state variable `state` (temperature, enthalpy, entropy or quality).
    pub fn new(
        quantity: CachedQuantity,
        composition: Box<[(Species, i64)]>,
        p: f64,
        state: f64,
    ) -> Self {
        Self {
            quantity,
            composition,
            p: quantize(p),
            state: quantize(state),
        }
    }

    /// Key for a pure-species property.
    pub fn pure(species: Species, kind: PureProperty, p: f64, t: f64) -> Self {
        Self::new(
            CachedQuantity::Pure(kind),
            Box::new([(species, quantize(1.0))]),
            p,
            t,
        )
    }
}

/// Default bound on the number of cached values.
pub const DEFAULT_CAPACITY: usize = 1 << 16;

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    /// Entries dropped with a retired generation
    pub evicted: u64,
}

impl CacheStats {
    /// Fraction of lookups answered from the cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct Generations {
    current: HashMap<CacheKey, f64>,
    previous: HashMap<CacheKey, f64>,
}

/// Thread-safe, size-bounded property memo table.
#[derive(Debug)]
pub struct PropertyCache {
    entries: RwLock<Generations>,
    generation_size: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evicted: AtomicU64,
}

impl Default for PropertyCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl PropertyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache holding at most `capacity` values (at least two).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Generations::default()),
            generation_size: (capacity / 2).max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    /// Upper bound on [`len`](Self::len).
    pub fn capacity(&self) -> usize {
        2 * self.generation_size
    }

    /// Cached value for `key`, if present. Counts a hit or a miss.
    pub fn get(&self, key: &CacheKey) -> Option<f64> {
        let (value, stale) = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.current.get(key) {
                Some(value) => (Some(*value), false),
                None => (entries.previous.get(key).copied(), true),
            }
        };
        let counter = match value {
            Some(value) => {
                if stale {
                    self.insert(key.clone(), value);
                }
                &self.hits
            }
            None => &self.misses,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        value
    }

    /// Store `value` under `key`, replacing any earlier value.
    pub fn insert(&self, key: CacheKey, value: f64) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.previous.remove(&key);
        entries.current.insert(key, value);
        if entries.current.len() >= self.generation_size {
            let retired = mem::take(&mut entries.current);
            let dropped = mem::replace(&mut entries.previous, retired);
            self.evicted
                .fetch_add(dropped.len() as u64, Ordering::Relaxed);
        }
    }

    /// Return the cached value or compute, store and return it.
    ///
    /// Errors are returned to the caller and never cached.
    pub fn get_or_compute(
        &self,
        key: CacheKey,
        compute: impl FnOnce() -> FluidResult<f64>,
    ) -> FluidResult<f64> {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = compute()?;
        self.insert(key, value);
        Ok(value)
    }

    /// Pure-species property through the cache.
    pub fn lookup(
        &self,
        source: &dyn PropertySource,
        species: Species,
        kind: PureProperty,
        p: f64,
        t: f64,
    ) -> FluidResult<f64> {
        self.get_or_compute(CacheKey::pure(species, kind, p, t), || {
            source.property(species, kind, p, t)
        })
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let dropped = entries.current.len() + entries.previous.len();
        entries.current.clear();
        entries.previous.clear();
        self.evicted.fetch_add(dropped as u64, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.current.len() + entries.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }
}
