// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Timer Wheel (spec.md §4.5): a single ordered timeline of events, driven
//! by the 1 Hz tick, with suspend/resume semantics for resend timers
//! riding out contact gaps. Ordering and dispatch grounded on the same
//! "process-wide lock, ascending-time dispatch" shape as the teacher's
//! `rfxclock.c`-style driver; counters use the teacher's AtomicU32 idiom
//! from `client/pool_sessions.rs`.

use std::{
    collections::BTreeMap,
    sync::{
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use dashmap::DashMap;

/// One scheduled event. Resend timers carry session/serial identity;
/// contact-plan events carry node pairs (spec.md §4.5).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    ResendCheckpoint { session_nbr: u64, cp_sn: u64 },
    ResendReport { session_nbr: u64, rpt_serial: u64 },
    ResendXmitCancel { session_nbr: u64 },
    ResendRecvCancel { session_nbr: u64 },
    ForgetSession { session_nbr: u64 },
    StartXmit { from: u64, to: u64 },
    StopXmit { from: u64, to: u64 },
    StartRecv { from: u64, to: u64 },
    StopRecv { from: u64, to: u64 },
    StartFire { node: u64 },
    StopFire { node: u64 },
    StartRange { from: u64, to: u64 },
    StopRange { from: u64, to: u64 },
    PurgeContact { from: u64, to: u64, from_time: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Running,
    Suspended,
}

/// Suspend/resume bookkeeping for a resend-class timer (spec.md §4.5).
/// Contact-plan events don't carry this — they're fire-once and not
/// subject to suspension.
#[derive(Debug, Clone, Copy)]
struct TimerRecord {
    seg_arrival_time: i64,
    qtime: i64,
    ack_deadline: i64,
    state: TimerState,
}

#[derive(Debug, Default)]
pub struct TimerWheel {
    /// Ascending `(scheduled_time, insertion_seq)` → event; ties broken by
    /// insertion order (spec.md §5: "Timeline events execute in ascending
    /// scheduled-time order; ties broken by insertion order").
    events: Mutex<BTreeMap<(i64, u64), EventKind>>,
    /// Reverse index so a timer can be found and removed by identity on
    /// suspend.
    index: DashMap<EventKind, (i64, u64)>,
    timers: DashMap<EventKind, TimerRecord>,
    seq: AtomicU64,
}

impl TimerWheel {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Schedules a fire-once event with no suspend/resume tracking
    /// (contact-plan transitions, spec.md §4.5).
    pub fn schedule(&self, kind: EventKind, at: i64) {
        let key = (at, self.next_seq());
        self.index.insert(kind.clone(), key);
        self.events.lock().unwrap().insert(key, kind);
    }

    /// Schedules a resend-class timer, recording the fields `suspend`/
    /// `resume` need (spec.md §4.3 "Checkpoint timing": `segArrivalTime`,
    /// `ackDeadline`).
    pub fn schedule_resend(&self, kind: EventKind, seg_arrival_time: i64, qtime: i64, ack_deadline: i64) {
        self.timers.insert(
            kind.clone(),
            TimerRecord { seg_arrival_time, qtime, ack_deadline, state: TimerState::Running },
        );
        self.schedule(kind, ack_deadline);
    }

    /// Removes an event outright (e.g. a checkpoint acknowledged before its
    /// resend deadline).
    pub fn cancel(&self, kind: &EventKind) {
        if let Some((_, key)) = self.index.remove(kind) {
            self.events.lock().unwrap().remove(&key);
        }
        self.timers.remove(kind);
    }

    /// Pops every event due at or before `now`, in ascending
    /// `(scheduled_time, insertion_seq)` order (spec.md §4.5 "Dispatch").
    pub fn dispatch(&self, now: i64) -> Vec<EventKind> {
        let mut events = self.events.lock().unwrap();
        let due_keys: Vec<(i64, u64)> = events.range(..=(now, u64::MAX)).map(|(&k, _)| k).collect();
        let mut due = Vec::with_capacity(due_keys.len());
        for key in due_keys {
            if let Some(kind) = events.remove(&key) {
                self.index.remove(&kind);
                due.push(kind);
            }
        }
        due
    }

    /// spec.md §4.5 "Suspend": when local transmit rate drops to zero,
    /// every timer whose `segArrivalTime + qtime >= suspend_time`
    /// transitions to Suspended and its event leaves the timeline.
    pub fn suspend(&self, suspend_time: i64) {
        let to_suspend: Vec<EventKind> = self
            .timers
            .iter()
            .filter(|kv| kv.value().state == TimerState::Running && kv.value().seg_arrival_time + kv.value().qtime >= suspend_time)
            .map(|kv| kv.key().clone())
            .collect();

        for kind in to_suspend {
            if let Some((_, key)) = self.index.remove(&kind) {
                self.events.lock().unwrap().remove(&key);
            }
            if let Some(mut record) = self.timers.get_mut(&kind) {
                record.state = TimerState::Suspended;
            }
        }
    }

    /// spec.md §4.5 "Resume": extends each suspended timer's deadline by
    /// the elapsed suspension and re-inserts its event.
    pub fn resume(&self, resume_time: i64) {
        let to_resume: Vec<EventKind> = self
            .timers
            .iter()
            .filter(|kv| kv.value().state == TimerState::Suspended)
            .map(|kv| kv.key().clone())
            .collect();

        for kind in to_resume {
            let new_deadline = {
                let mut record = self.timers.get_mut(&kind).unwrap();
                let extension = (resume_time - (record.seg_arrival_time + record.qtime)).max(0);
                record.ack_deadline += extension;
                record.state = TimerState::Running;
                record.ack_deadline
            };
            self.schedule(kind, new_deadline);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}
