// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;

use crate::contact_plan::{
    model::{Contact, Range},
    timeline::AdminEvent,
};

/// An indexed store of contacts and ranges (spec.md §2, §3), mutated only
/// through `apply_event` so that `last_edit_time` always reflects the
/// timeline position the in-memory state corresponds to. Consulted by the
/// CGR Planner, whose Route Cache invalidates whenever
/// `last_edit_time` advances past its own `last_load_time`.
#[derive(Debug, Default)]
pub struct ContactPlanStore {
    contacts: DashMap<(u64, u64, i64), Contact>,
    ranges: DashMap<(u64, u64, i64), Range>,
    last_edit_time: AtomicI64,
}

impl ContactPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one timeline event, bumping `last_edit_time` to `now`.
    /// Invariant (spec.md §3): `to_time > from_time`, `xmit_rate >= 0` for
    /// contacts created here; callers are expected to have validated that
    /// upstream (malformed admin input is an `InputValidation` error, spec.md
    /// §7, handled by the caller before reaching the store).
    pub fn apply_event(&self, event: AdminEvent, now: i64) {
        match event {
            AdminEvent::AddContact(c) => {
                self.contacts.insert(c.key(), c);
            },
            AdminEvent::DeleteContact { from_node, to_node, from_time } => {
                self.contacts.remove(&(from_node, to_node, from_time));
            },
            AdminEvent::AddRange(r) => {
                self.ranges.insert(r.key(), r);
            },
            AdminEvent::DeleteRange { from_node, to_node, from_time } => {
                self.ranges.remove(&(from_node, to_node, from_time));
            },
        }
        self.last_edit_time.store(now, Ordering::Release);
    }

    pub fn last_edit_time(&self) -> i64 {
        self.last_edit_time.load(Ordering::Acquire)
    }

    /// All contacts whose `to_time` has not yet elapsed at `now`, regardless
    /// of origin node (used by the CGR Dijkstra search, which roots at the
    /// local node but must consider every reachable contact).
    pub fn live_contacts(&self, now: i64) -> Vec<Contact> {
        self.contacts
            .iter()
            .map(|kv| *kv.value())
            .filter(|c| c.to_time > now)
            .collect()
    }

    /// All contacts whose `from_node == node`, in ascending `from_time`
    /// order — used by arrival-time evaluation's "walking the local node's
    /// contacts ... in time order" (spec.md §4.1.2).
    pub fn contacts_from(&self, node: u64) -> Vec<Contact> {
        let mut v: Vec<Contact> = self
            .contacts
            .iter()
            .map(|kv| *kv.value())
            .filter(|c| c.from_node == node)
            .collect();
        v.sort_unstable_by_key(|c| c.from_time);
        v
    }

    /// The range covering `contact`'s `from_time`, if any (spec.md §3:
    /// "each contact must have an applicable range whose interval covers
    /// the contact's from_time, else CGR treats the contact as unusable").
    pub fn applicable_range(&self, contact: &Contact) -> Option<Range> {
        self.ranges
            .iter()
            .map(|kv| *kv.value())
            .find(|r| {
                r.from_node == contact.from_node
                    && r.to_node == contact.to_node
                    && r.covers(contact.from_time)
            })
    }

    /// Purges contacts/ranges past their clearance window (spec.md §3:
    /// "destroyed when current time exceeds to_time + per-neighbor
    /// clearance or by admin").
    pub fn purge_expired(&self, now: i64, clearance_seconds: i64) {
        self.contacts
            .retain(|_, c| c.to_time + clearance_seconds > now);
        self.ranges.retain(|_, r| r.to_time + clearance_seconds > now);
    }
}
