// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A generic transactional key/value + list + indexed-set substrate
//! (spec.md §5, §9 "global mutable state" design note). Non-goals exclude
//! the real persistent database and shared-memory layer the original relies
//! on; this module defines the interface the rest of the engine is written
//! against, plus a `dashmap`-backed in-memory implementation that satisfies
//! it for this crate's purposes.
//!
//! Cross-references between sessions, segments, and checkpoints are stable
//! ids into this store rather than pointers, per spec.md §9's
//! arena-allocation note.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// A monotonically increasing counter, used for session numbers,
/// checkpoint serials, and report serials. Each span owns one counter per
/// serial-number space (spec.md §6.3, §9 "rolling serial-number space").
#[derive(Debug, Default)]
pub struct SerialCounter(AtomicU64);

impl SerialCounter {
    pub fn new(start: u64) -> Self {
        Self(AtomicU64::new(start))
    }

    /// Returns the next serial. Callers are responsible for detecting
    /// rollover against the protocol's serial-number space (spec.md §9:
    /// rollover triggers cancellation, not wraparound-modulo).
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A transactional, concurrent key-value table. All mutating engine
/// operations are expected to read-then-write within the scope of a single
/// call, mirroring spec.md §5's "transactions are serialized; concurrent
/// readers observe consistent snapshots at transaction boundaries" —
/// `DashMap`'s per-shard locking gives us that for single-key read-modify-
/// write sequences, which is everything this engine needs.
#[derive(Debug)]
pub struct Table<K, V>
where K: std::hash::Hash + Eq
{
    inner: DashMap<K, V>,
}

impl<K, V> Default for Table<K, V>
where K: std::hash::Hash + Eq
{
    fn default() -> Self {
        Self { inner: DashMap::new() }
    }
}

impl<K, V> Table<K, V>
where K: std::hash::Hash + Eq + Clone
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, k: K, v: V) -> Option<V> {
        self.inner.insert(k, v)
    }

    pub fn remove(&self, k: &K) -> Option<(K, V)> {
        self.inner.remove(k)
    }

    pub fn contains_key(&self, k: &K) -> bool {
        self.inner.contains_key(k)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Mutates the value in place under the shard lock; returns `None` if
    /// absent.
    pub fn with_mut<R>(&self, k: &K, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        self.inner.get_mut(k).map(|mut v| f(&mut v))
    }

    pub fn with_ref<R>(&self, k: &K, f: impl FnOnce(&V) -> R) -> Option<R> {
        self.inner.get(k).map(|v| f(&v))
    }

    pub fn keys(&self) -> Vec<K> {
        self.inner.iter().map(|kv| kv.key().clone()).collect()
    }
}

impl<K, V> Table<K, V>
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    pub fn get_cloned(&self, k: &K) -> Option<V> {
        self.inner.get(k).map(|v| v.clone())
    }
}
