// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Oversubscribed contact (spec.md §8, scenario S3): a standard bundle
//! that would overbook a contact's remaining capacity bumps the newest
//! lower-or-equal-priority bundle already queued, freeing enough room for
//! itself while leaving the bumped bundle to be re-forwarded.

use dtn_core_rs::cfg::enums::Priority;
use dtn_core_rs::cgr::overbooking::{AdmissionResult, OverbookingManager, QueuedBundle};

#[test]
fn new_standard_bundle_bumps_newest_standard_bundle_to_fit() {
    let om = OverbookingManager::new();
    const NEIGHBOR_B: u64 = 2;
    const CONTACT_CAPACITY: u64 = 1000;

    // 750 B + 150 B already committed to the outduct, totalling 900 B.
    let earlier = QueuedBundle { bundle_id: 1, length: 750, priority: Priority::Standard };
    let newest = QueuedBundle { bundle_id: 2, length: 150, priority: Priority::Standard };
    assert_eq!(om.try_admit(NEIGHBOR_B, earlier, CONTACT_CAPACITY), AdmissionResult::Admitted);
    assert_eq!(om.try_admit(NEIGHBOR_B, newest, CONTACT_CAPACITY), AdmissionResult::Admitted);
    assert_eq!(om.committed_bytes(NEIGHBOR_B), 900);

    // A new 200 B standard bundle overbooks by 100 B.
    let incoming = QueuedBundle { bundle_id: 3, length: 200, priority: Priority::Standard };
    let result = om.try_admit(NEIGHBOR_B, incoming, CONTACT_CAPACITY);

    match result {
        AdmissionResult::AdmittedWithBumps(bumped) => {
            assert_eq!(bumped.len(), 1, "only the newest standard bundle should need bumping");
            assert_eq!(bumped[0].bundle_id, 2);
            assert_eq!(bumped[0].length, 150);
        },
        other => panic!("expected AdmittedWithBumps, got {other:?}"),
    }

    // Bundle 1 (750) and bundle 3 (200) remain committed; bundle 2 is gone,
    // left for the caller to re-route.
    assert_eq!(om.committed_bytes(NEIGHBOR_B), 950);
    assert_eq!(om.outduct_len(NEIGHBOR_B), 2);
}

#[test]
fn bulk_bundle_is_rejected_outright_rather_than_bumping_anything() {
    let om = OverbookingManager::new();
    om.try_admit(2, QueuedBundle { bundle_id: 1, length: 900, priority: Priority::Standard }, 1000);
    let result = om.try_admit(2, QueuedBundle { bundle_id: 2, length: 200, priority: Priority::Bulk }, 1000);
    assert_eq!(result, AdmissionResult::Rejected);
    assert_eq!(om.committed_bytes(2), 900, "rejected bulk bundle must not be committed");
}
