// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Contact plan edit invalidates the route cache (spec.md §8, scenario S4):
//! a route lookup before an admin edit differs from one taken after it,
//! because the cache's freshness check is keyed off the contact plan's
//! last-edit time.

use dtn_core_rs::cfg::enums::PayloadClass;
use dtn_core_rs::contact_plan::{model::{Contact, Range}, timeline::AdminEvent};

#[path = "common.rs"]
mod common;

#[test]
fn faster_contact_inserted_between_lookups_appears_in_the_rebuilt_route_list() {
    let cps = common::two_hop_contact_plan();
    let planner = common::planner_for(cps);
    let trace = dtn_core_rs::cgr::planner::default_trace();

    let before = planner.route_list(3, PayloadClass::Small, 0, &trace);
    assert_eq!(before.len(), 1);
    assert!(before.iter().all(|r| r.to_node_nbr == 2), "only the two-hop-via-B route exists yet");

    let edit_time_before = planner.cps.last_edit_time();

    // Admin inserts a direct 1->3 contact, which both changes the best
    // route and must bump last_edit_time so the cache notices.
    planner.cps.apply_event(
        AdminEvent::AddContact(Contact { from_node: 1, to_node: 3, from_time: 0, to_time: 100, xmit_rate: 1000, probability_per_mille: 1000 }),
        5,
    );
    planner.cps.apply_event(
        AdminEvent::AddRange(Range { from_node: 1, to_node: 3, from_time: 0, to_time: 100, owlt_seconds: 1 }),
        5,
    );

    assert!(planner.cps.last_edit_time() > edit_time_before, "admin edit must advance last_edit_time");

    let after = planner.route_list(3, PayloadClass::Small, 1, &trace);
    assert!(after.iter().any(|r| r.to_node_nbr == 3), "the new direct contact must appear in the rebuilt route list");
}
