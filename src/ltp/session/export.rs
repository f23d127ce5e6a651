// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Export session (LTP sender side), spec.md §3 and §4.3.

use std::collections::BTreeMap;

use bitflags::bitflags;

use crate::ltp::wire::ReasonCode;

bitflags! {
    /// `state_flags` from spec.md §3's Export session record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExportFlags: u8 {
        const EOB_SENT  = 0b0000_0001;
        const FINAL_ACK = 0b0000_0010;
    }
}

/// Export session lifecycle (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportSessionState {
    Buffering,
    Active,
    AwaitingFinalAck,
    Closed,
    Canceled,
    AwaitingCa,
    Dead,
}

/// One checkpoint this session has transmitted, tracking acknowledgement
/// and retransmission count (spec.md §4.3 "Checkpoint timing").
#[derive(Debug, Clone)]
pub struct CheckpointRecord {
    pub cp_sn: u64,
    /// The report serial this checkpoint was sent in response to; 0 for an
    /// initial transmission.
    pub responds_to_rpt_serial: u64,
    pub acked: bool,
    pub expiration_count: u32,
}

#[derive(Debug, Clone)]
pub struct ExportSession {
    pub session_nbr: u64,
    pub span_engine_id: u64,
    pub total_length: u64,
    pub red_part_length: u64,
    /// Reception claims merged from report segments, keyed by start offset
    /// mapping to end offset (exclusive), consolidating overlaps.
    pub claims: BTreeMap<u64, u64>,
    pub checkpoints: Vec<CheckpointRecord>,
    pub last_ckpt_serial: u64,
    pub state: ExportSessionState,
    pub flags: ExportFlags,
    pub reason_code: Option<ReasonCode>,
}

impl ExportSession {
    pub fn new(session_nbr: u64, span_engine_id: u64, total_length: u64, red_part_length: u64) -> Self {
        Self {
            session_nbr,
            span_engine_id,
            total_length,
            red_part_length,
            claims: BTreeMap::new(),
            checkpoints: Vec::new(),
            last_ckpt_serial: 0,
            state: ExportSessionState::Buffering,
            flags: ExportFlags::empty(),
            reason_code: None,
        }
    }

    /// Allocates the next checkpoint serial, spec.md §4.3: "rollover
    /// causing session cancellation on overflow".
    pub fn next_checkpoint_serial(&mut self) -> Option<u64> {
        let next = self.last_ckpt_serial.checked_add(1)?;
        if next > u32::MAX as u64 {
            return None;
        }
        self.last_ckpt_serial = next;
        Some(next)
    }

    pub fn find_checkpoint_mut(&mut self, cp_sn: u64) -> Option<&mut CheckpointRecord> {
        self.checkpoints.iter_mut().find(|c| c.cp_sn == cp_sn)
    }

    /// Merges one reception claim into the consolidated set, collapsing
    /// adjacent/overlapping extents (spec.md §8: "claim merge is
    /// idempotent").
    pub fn merge_claim(&mut self, offset: u64, length: u64) {
        let mut start = offset;
        let mut end = offset.saturating_add(length);

        let overlapping: Vec<u64> = self
            .claims
            .range(..end)
            .filter(|(&s, &e)| e >= start)
            .map(|(&s, _)| s)
            .collect();
        for key in overlapping {
            if let Some(existing_end) = self.claims.remove(&key) {
                start = start.min(key);
                end = end.max(existing_end);
            }
        }
        self.claims.insert(start, end);
    }

    /// True once the merged claims cover `[0, red_part_length)` in full
    /// (spec.md §4.3: "If the merged claim covers [0, red_part_length):
    /// mark session complete").
    pub fn red_part_fully_acked(&self) -> bool {
        if self.red_part_length == 0 {
            return true;
        }
        let mut covered = 0u64;
        for (&start, &end) in &self.claims {
            if start > covered {
                return false;
            }
            covered = covered.max(end);
        }
        covered >= self.red_part_length
    }

    /// spec.md §9 Open Question #3: checked atomically on every RS receipt
    /// and every EOB dequeue, rather than relying on event ordering.
    pub fn maybe_complete_on_final_ack(&mut self) -> bool {
        if self.flags.contains(ExportFlags::FINAL_ACK) && self.flags.contains(ExportFlags::EOB_SENT) {
            self.state = ExportSessionState::Closed;
            true
        } else {
            false
        }
    }

    pub fn is_pure_red(&self) -> bool {
        self.total_length == self.red_part_length
    }
}
