// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! `ContactPlanStore` against its public API (spec.md §3): admin events
//! mutate the store and advance `last_edit_time`, and lookups respect the
//! contact/range coverage invariants.

use dtn_core_rs::contact_plan::{
    model::{Contact, Range},
    store::ContactPlanStore,
    timeline::AdminEvent,
};

fn contact(from: u64, to: u64, from_time: i64, to_time: i64) -> Contact {
    Contact { from_node: from, to_node: to, from_time, to_time, xmit_rate: 1000, probability_per_mille: 1000 }
}

#[test]
fn deleting_a_range_removes_its_applicability_for_a_matching_contact() {
    let store = ContactPlanStore::new();
    let c = contact(1, 2, 0, 100);
    store.apply_event(AdminEvent::AddContact(c), 1);
    store.apply_event(
        AdminEvent::AddRange(Range { from_node: 1, to_node: 2, from_time: 0, to_time: 100, owlt_seconds: 2 }),
        1,
    );
    assert_eq!(store.applicable_range(&c).unwrap().owlt_seconds, 2);

    store.apply_event(AdminEvent::DeleteRange { from_node: 1, to_node: 2, from_time: 0 }, 2);
    assert!(store.applicable_range(&c).is_none());
}

#[test]
fn purge_expired_keeps_contacts_still_within_their_clearance_window() {
    let store = ContactPlanStore::new();
    store.apply_event(AdminEvent::AddContact(contact(1, 2, 0, 100)), 1);
    store.purge_expired(150, 60);
    assert_eq!(store.contacts_from(1).len(), 1, "to_time(100) + clearance(60) > now(150): must survive");

    store.purge_expired(161, 60);
    assert!(store.contacts_from(1).is_empty(), "to_time(100) + clearance(60) <= now(161): must be purged");
}

#[test]
fn contacts_from_a_node_are_returned_in_ascending_from_time_order() {
    let store = ContactPlanStore::new();
    store.apply_event(AdminEvent::AddContact(contact(1, 3, 50, 150)), 1);
    store.apply_event(AdminEvent::AddContact(contact(1, 2, 0, 100)), 2);
    let ordered: Vec<i64> = store.contacts_from(1).iter().map(|c| c.from_time).collect();
    assert_eq!(ordered, vec![0, 50]);
}
