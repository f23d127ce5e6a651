// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Route Cache (RC), spec.md §2/§3: per-terminus lists of precomputed
//! routes, invalidated wholesale when the contact plan changes.

use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;

use crate::cgr::route::Route;

/// Per-terminus cached route list plus the load time it was computed at.
#[derive(Debug, Clone, Default)]
pub struct TerminusRoutes {
    pub routes: Vec<Route>,
    pub last_load_time: i64,
}

/// Keyed by `(terminus, payload_class)` since spec.md §4.1 builds one route
/// list per payload class per terminus.
#[derive(Debug, Default)]
pub struct RouteCache {
    entries: DashMap<(u64, u8), TerminusRoutes>,
    /// The contact plan's edit time this cache was last rebuilt against, per
    /// terminus/class key. Compared against `ContactPlanStore::last_edit_time`
    /// on every lookup (spec.md §8 invariant 6).
    global_last_rebuild: AtomicI64,
}

impl RouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached entry if it is fresh with respect to
    /// `contact_plan_edit_time`, else `None` (forcing the caller to
    /// rebuild).
    pub fn get_fresh(&self, terminus: u64, class: u8, contact_plan_edit_time: i64) -> Option<TerminusRoutes> {
        let entry = self.entries.get(&(terminus, class))?;
        if entry.last_load_time >= contact_plan_edit_time {
            Some(entry.clone())
        } else {
            None
        }
    }

    pub fn put(&self, terminus: u64, class: u8, routes: Vec<Route>, load_time: i64) {
        self.entries
            .insert((terminus, class), TerminusRoutes { routes, last_load_time: load_time });
        self.global_last_rebuild.store(load_time, Ordering::Release);
    }

    pub fn replace_routes(&self, terminus: u64, class: u8, routes: Vec<Route>) {
        if let Some(mut entry) = self.entries.get_mut(&(terminus, class)) {
            entry.routes = routes;
        }
    }

    /// Discards every cached route list. Called wholesale on a contact-plan
    /// edit (spec.md §2).
    pub fn invalidate_all(&self) {
        self.entries.clear();
    }
}
