// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Overbooking Manager (spec.md §4.2): per-outduct bulk/standard/urgent
//! priority queues with a bumping iterator that re-forwards bundles
//! displaced by higher-priority traffic.

use std::collections::VecDeque;

use dashmap::DashMap;

use crate::cfg::enums::Priority;

/// A bundle enqueued on an outduct, pending transmission.
#[derive(Debug, Clone)]
pub struct QueuedBundle {
    pub bundle_id: u64,
    pub length: u64,
    pub priority: Priority,
}

/// A queued bundle plus the monotonic ordinal it was enqueued under —
/// the "ordinal" bump_for's urgent-scan bound refers to (spec.md §4.2).
#[derive(Debug, Clone)]
struct Entry {
    bundle: QueuedBundle,
    ordinal: u64,
}

/// One neighbor's pending transmission queue, split by priority
/// (spec.md §4.2: "bulk, standard and urgent queues; capacity is
/// allotted top-down, bumping lower-priority bundles back to the
/// scheduler when a higher-priority bundle needs their slot").
#[derive(Debug, Default)]
pub struct Outduct {
    bulk: VecDeque<Entry>,
    standard: VecDeque<Entry>,
    urgent: VecDeque<Entry>,
    committed_bytes: u64,
    next_ordinal: u64,
}

impl Outduct {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues `bundle`, returning the ordinal it was assigned.
    pub fn enqueue(&mut self, bundle: QueuedBundle) -> u64 {
        self.committed_bytes = self.committed_bytes.saturating_add(bundle.length);
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        let entry = Entry { bundle, ordinal };
        match entry.bundle.priority {
            Priority::Bulk => self.bulk.push_back(entry),
            Priority::Standard => self.standard.push_back(entry),
            Priority::Urgent => self.urgent.push_back(entry),
        }
        ordinal
    }

    /// The ordinal the next `enqueue` call would assign.
    fn peek_next_ordinal(&self) -> u64 {
        self.next_ordinal
    }

    pub fn committed_bytes(&self) -> u64 {
        self.committed_bytes
    }

    pub fn len(&self) -> usize {
        self.bulk.len() + self.standard.len() + self.urgent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates queued bundles urgent-first, standard-second, bulk-last —
    /// the order capacity is allotted to a contact (spec.md §4.2).
    pub fn iter_by_priority(&self) -> impl Iterator<Item = &QueuedBundle> {
        self.urgent
            .iter()
            .chain(self.standard.iter())
            .chain(self.bulk.iter())
            .map(|e| &e.bundle)
    }

    /// Bumps bundles off the newest end of bulk, then standard, then
    /// urgent — urgent only among entries whose ordinal does not exceed
    /// `new_ordinal`, i.e. bundles already queued before the bundle
    /// triggering this bump (spec.md §4.2). Bundles whose length still
    /// fits within the running `protected` allowance are left alone: they
    /// are already scheduled for a later contact than the new bundle's
    /// initial one and do not need displacing.
    fn bump_for(&mut self, bytes_needed: u64, protected: u64, new_ordinal: u64) -> Vec<QueuedBundle> {
        let mut freed = 0u64;
        let mut protected_remaining = protected;
        let mut to_remove: Vec<(u8, usize)> = Vec::new();

        let scans: [(u8, &VecDeque<Entry>, Option<u64>); 3] = [
            (0, &self.bulk, None),
            (1, &self.standard, None),
            (2, &self.urgent, Some(new_ordinal)),
        ];
        for (tag, queue, ordinal_bound) in scans {
            if freed >= bytes_needed {
                break;
            }
            for i in (0..queue.len()).rev() {
                if freed >= bytes_needed {
                    break;
                }
                let entry = &queue[i];
                if let Some(bound) = ordinal_bound {
                    if entry.ordinal > bound {
                        continue;
                    }
                }
                if entry.bundle.length <= protected_remaining {
                    protected_remaining -= entry.bundle.length;
                    continue;
                }
                freed = freed.saturating_add(entry.bundle.length);
                to_remove.push((tag, i));
            }
        }

        let mut bumped = Vec::new();
        for (tag, idx) in to_remove {
            let queue = match tag {
                0 => &mut self.bulk,
                1 => &mut self.standard,
                _ => &mut self.urgent,
            };
            if let Some(entry) = queue.remove(idx) {
                self.committed_bytes = self.committed_bytes.saturating_sub(entry.bundle.length);
                bumped.push(entry.bundle);
            }
        }
        bumped
    }
}

/// Owns one `Outduct` per neighbor and exposes the ECCC-aware admission
/// check that decides whether a bundle fits without bumping, fits only by
/// bumping lower-priority traffic, or must itself be queued behind existing
/// higher-priority commitments (spec.md §4.2).
#[derive(Debug, Default)]
pub struct OverbookingManager {
    outducts: DashMap<u64, Outduct>,
}

/// Outcome of attempting to admit a bundle's ECCC onto a neighbor's
/// outduct against a given contact's remaining capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionResult {
    /// Fits without displacing anything already committed.
    Admitted,
    /// Fits only after bumping the returned lower-priority bundles.
    AdmittedWithBumps(Vec<QueuedBundle>),
    /// Does not fit even after bumping every bumpable bundle.
    Rejected,
}

impl OverbookingManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to admit `bundle` onto `neighbor`'s outduct, given the
    /// contact capacity available to that neighbor right now.
    pub fn try_admit(&self, neighbor: u64, bundle: QueuedBundle, contact_capacity: u64) -> AdmissionResult {
        let mut outduct = self.outducts.entry(neighbor).or_default();
        let projected = outduct.committed_bytes().saturating_add(bundle.length);

        if projected <= contact_capacity {
            outduct.enqueue(bundle);
            return AdmissionResult::Admitted;
        }

        if bundle.priority == Priority::Bulk {
            return AdmissionResult::Rejected;
        }

        let overbooked = projected.saturating_sub(contact_capacity);
        let ordinal = outduct.peek_next_ordinal();
        let bumped = outduct.bump_for(overbooked, 0, ordinal);
        let freed: u64 = bumped.iter().map(|b| b.length).sum();
        if outduct.committed_bytes().saturating_add(bundle.length) <= contact_capacity.saturating_add(freed) {
            outduct.enqueue(bundle);
            AdmissionResult::AdmittedWithBumps(bumped)
        } else {
            for bundle in bumped {
                outduct.enqueue(bundle);
            }
            AdmissionResult::Rejected
        }
    }

    /// Enqueues a bundle the CGR planner has already cleared via
    /// arrival-time evaluation (spec.md §4.1.2), then — if the planner
    /// found the initial contact overbooked — bumps lower-priority
    /// traffic off that neighbor's outduct until `overbooked` bytes have
    /// been freed or the queues are exhausted (spec.md §4.2). `protected`
    /// is the byte count already scheduled into a later contact than this
    /// bundle's initial one; bundles within that allowance are left in
    /// place rather than bumped. Bulk bundles are never overbooked by the
    /// planner (their ECCC is screened out beforehand), so this never
    /// bumps anything on their behalf.
    pub fn enqueue_and_bump(
        &self,
        neighbor: u64,
        bundle: QueuedBundle,
        overbooked: u64,
        protected: u64,
    ) -> Vec<QueuedBundle> {
        let mut outduct = self.outducts.entry(neighbor).or_default();
        let ordinal = outduct.enqueue(bundle);
        if overbooked == 0 {
            return Vec::new();
        }
        outduct.bump_for(overbooked, protected, ordinal)
    }

    /// Enqueues a clone of a critical bundle directly, bypassing the
    /// bumping queue (spec.md §4.1.3: critical bundles fan out to every
    /// proximate node; §4.2's bumping contract only covers non-critical
    /// enqueues).
    pub fn enqueue_critical(&self, neighbor: u64, bundle: QueuedBundle) {
        self.outducts.entry(neighbor).or_default().enqueue(bundle);
    }

    pub fn outduct_len(&self, neighbor: u64) -> usize {
        self.outducts.get(&neighbor).map(|o| o.len()).unwrap_or(0)
    }

    pub fn committed_bytes(&self, neighbor: u64) -> u64 {
        self.outducts.get(&neighbor).map(|o| o.committed_bytes()).unwrap_or(0)
    }
}
