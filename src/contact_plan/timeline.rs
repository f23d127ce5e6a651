// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The append-only admin-event timeline that mutates the Contact Plan Store
//! (spec.md §2: "Mutated by external admin events delivered as an
//! append-only timeline"). The event shape follows ION-DTN's `ionadmin`
//! `a`/`d` command grammar for contacts and ranges
//! (`original_source/ici/utils/ionadmin.c`'s `executeAdd`/`executeDelete`),
//! carried over as typed events rather than a parsed command line — the
//! admin CLI's line grammar itself is out of scope (spec.md §1).

use crate::contact_plan::model::{Contact, Range};

/// One entry in the append-only contact-plan timeline.
#[derive(Debug, Clone)]
pub enum AdminEvent {
    AddContact(Contact),
    DeleteContact { from_node: u64, to_node: u64, from_time: i64 },
    AddRange(Range),
    DeleteRange { from_node: u64, to_node: u64, from_time: i64 },
}

impl AdminEvent {
    /// The node pair this event concerns, used for Neighbor Directory
    /// refresh after applying the event.
    pub fn endpoints(&self) -> (u64, u64) {
        match self {
            AdminEvent::AddContact(c) => (c.from_node, c.to_node),
            AdminEvent::DeleteContact { from_node, to_node, .. } => {
                (*from_node, *to_node)
            },
            AdminEvent::AddRange(r) => (r.from_node, r.to_node),
            AdminEvent::DeleteRange { from_node, to_node, .. } => {
                (*from_node, *to_node)
            },
        }
    }
}
