// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Tick / Clock Driver (spec.md §2: "external 1 Hz tick source driving
//! Timer Wheel dispatch and contact-plan transitions"). Grounded on
//! `original_source/ici/daemon/rfxclock.c`'s single-threaded tick loop;
//! the teacher itself reaches for `tokio::time::{sleep, timeout}` in
//! `main.rs`, so `tokio::time::interval` is the idiomatic fit here.

use std::{sync::Arc, time::Duration};

use tokio::time;
use tracing::debug;

use crate::{contact_plan::store::ContactPlanStore, ltp::engine::LtpEngine, utils::now_unix};

/// How long past `to_time` a contact/range is kept before being purged
/// (spec.md §3: "destroyed when current time exceeds to_time + per-neighbor
/// clearance or by admin"). Fixed rather than per-neighbor-configurable —
/// no span-level override is named anywhere in spec.md's per-span table.
const CONTACT_CLEARANCE_SECONDS: i64 = 60;

/// Drives the Timer Wheel and Contact Plan Store purge at a fixed cadence.
/// Does not itself run on a background thread — callers `tokio::spawn` the
/// future `run` returns, same as any other long-running task in this
/// engine.
pub struct ClockDriver {
    tick_interval: Duration,
    engine: Arc<LtpEngine>,
    cps: Arc<ContactPlanStore>,
}

impl ClockDriver {
    pub fn new(tick_interval: Duration, engine: Arc<LtpEngine>, cps: Arc<ContactPlanStore>) -> Self {
        Self { tick_interval, engine, cps }
    }

    /// Runs until the task is aborted/dropped; each tick dispatches due
    /// timer events and purges expired contact-plan entries.
    pub async fn run(self) {
        let mut interval = time::interval(self.tick_interval);
        loop {
            interval.tick().await;
            let now = now_unix();
            let effects = self.engine.dispatch_timers(now);
            if !effects.is_empty() {
                debug!(tick = now, effect_count = effects.len(), "clock tick produced engine effects");
            }
            self.cps.purge_expired(now, CONTACT_CLEARANCE_SECONDS);
        }
    }

    /// One tick's worth of work, exposed separately so tests can drive the
    /// driver deterministically instead of waiting on a real interval.
    pub fn tick_once(&self, now: i64) {
        let effects = self.engine.dispatch_timers(now);
        if !effects.is_empty() {
            debug!(tick = now, effect_count = effects.len(), "clock tick produced engine effects");
        }
        self.cps.purge_expired(now, CONTACT_CLEARANCE_SECONDS);
    }
}
