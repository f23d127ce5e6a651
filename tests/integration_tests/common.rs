// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Shared fixtures for the scenario tests: a minimally valid `SpanConfig`
//! (the crate only exposes `SpanConfig::default_for_test()` under
//! `#[cfg(test)]` inside the crate itself, which an external `tests/`
//! binary cannot see) and the two-hop contact plan from spec.md §8's
//! scenario S1, reused by S1 and S4.

use std::{sync::Arc, time::Duration};

use dtn_core_rs::{
    cfg::enums::YesNo,
    cgr::CgrPlanner,
    contact_plan::{
        model::{Contact, Range},
        store::ContactPlanStore,
        timeline::AdminEvent,
    },
};

pub fn span_config() -> dtn_core_rs::cfg::config::SpanConfig {
    dtn_core_rs::cfg::config::SpanConfig {
        max_export_sessions: 10,
        max_import_sessions: 10,
        max_segment_size: 1400,
        aggr_size_limit: 65536,
        aggr_time_limit: Duration::from_secs(1),
        own_qtime: Duration::from_secs(1),
        remote_qtime: Duration::from_secs(1),
        errors_per_byte: 0.0000001,
        enforce_schedule: YesNo::No,
        max_acq_in_heap: 1_048_576,
        purge: YesNo::No,
    }
}

/// Node 1 -> 2 -> 3, both legs 1000 B/s, owlt=1s, matching spec.md §8 S1:
/// "A->B 0..100 @1000B/s, B->C 50..150 @1000B/s, owlt=1 both".
pub fn two_hop_contact_plan() -> Arc<ContactPlanStore> {
    let cps = Arc::new(ContactPlanStore::new());
    cps.apply_event(
        AdminEvent::AddContact(Contact { from_node: 1, to_node: 2, from_time: 0, to_time: 100, xmit_rate: 1000, probability_per_mille: 1000 }),
        0,
    );
    cps.apply_event(
        AdminEvent::AddContact(Contact { from_node: 2, to_node: 3, from_time: 50, to_time: 150, xmit_rate: 1000, probability_per_mille: 1000 }),
        0,
    );
    cps.apply_event(AdminEvent::AddRange(Range { from_node: 1, to_node: 2, from_time: 0, to_time: 100, owlt_seconds: 1 }), 0);
    cps.apply_event(AdminEvent::AddRange(Range { from_node: 2, to_node: 3, from_time: 50, to_time: 150, owlt_seconds: 1 }), 0);
    cps
}

pub fn planner_for(cps: Arc<ContactPlanStore>) -> CgrPlanner {
    CgrPlanner::new(1, 0.0, [1024, 1_048_576, 1_073_741_824], cps, Arc::new(dtn_core_rs::cgr::RouteCache::new()))
}
