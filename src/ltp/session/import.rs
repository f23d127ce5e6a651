// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Import session (LTP receiver side), spec.md §3 and §4.4.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::ltp::wire::{ReasonCode, ReportContent};

/// A report this session is still awaiting a report-ack for, kept so it
/// can be resent verbatim on timeout (spec.md §4.4 "Retransmit limits").
#[derive(Debug, Clone)]
pub struct PendingReport {
    pub content: ReportContent,
    pub expiration_count: u32,
}

/// Import session lifecycle (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportSessionState {
    Open,
    Receiving,
    RedComplete,
    Closed,
    Canceled,
    AwaitingCar,
    Dead,
}

/// One contiguous received extent, keyed by start offset in
/// `red_segments` (spec.md §3: "ordered by offset").
#[derive(Debug, Clone)]
pub struct ReceivedExtent {
    pub offset: u64,
    pub length: u64,
    pub data: Bytes,
}

#[derive(Debug, Clone)]
pub struct ImportSession {
    pub session_nbr: u64,
    pub span_engine_id: u64,
    /// Non-overlapping, in-order extents (spec.md §8 invariant 1).
    pub red_segments: BTreeMap<u64, ReceivedExtent>,
    pub red_part_length: u64,
    pub red_part_received: u64,
    pub next_rpt_serial: u64,
    pub last_rpt_serial: u64,
    pub reports_count: u32,
    pub max_reports: u32,
    pub end_of_block_recd: bool,
    pub state: ImportSessionState,
    pub reason_code: Option<ReasonCode>,
    /// Whether any green segment has been observed for this session
    /// (used for the red/green miscolor check, spec.md §4.4 step 1).
    pub green_seen: bool,
    pub red_seen: bool,
    /// Reports awaiting a report-ack, keyed by `rpt_serial` (spec.md §4.4
    /// "Retransmit limits").
    pub pending_reports: BTreeMap<u64, PendingReport>,
}

impl ImportSession {
    pub fn new(session_nbr: u64, span_engine_id: u64) -> Self {
        Self {
            session_nbr,
            span_engine_id,
            red_segments: BTreeMap::new(),
            red_part_length: 0,
            red_part_received: 0,
            next_rpt_serial: 0,
            last_rpt_serial: 0,
            reports_count: 0,
            max_reports: 2,
            end_of_block_recd: false,
            state: ImportSessionState::Open,
            reason_code: None,
            green_seen: false,
            red_seen: false,
            pending_reports: BTreeMap::new(),
        }
    }

    /// spec.md §4.4 step 4: rejects a segment overlapping an already
    /// stored extent, else returns the insertion point.
    pub fn overlaps_existing(&self, offset: u64, length: u64) -> bool {
        let end = offset.saturating_add(length);
        for (&existing_offset, extent) in self.red_segments.range(..end) {
            let existing_end = existing_offset.saturating_add(extent.length);
            if existing_end > offset {
                return true;
            }
        }
        false
    }

    /// spec.md §4.4 step 4-7: records one red extent and updates
    /// `red_part_received`. Caller must have already checked
    /// `overlaps_existing`.
    pub fn insert_extent(&mut self, offset: u64, data: Bytes) {
        let length = data.len() as u64;
        self.red_segments.insert(offset, ReceivedExtent { offset, length, data });
        self.red_part_received += length;
    }

    /// True once every byte of `[0, red_part_length)` has been received
    /// (spec.md §4.4 "Red-part delivery").
    pub fn is_red_part_complete(&self) -> bool {
        self.red_part_length > 0 && self.red_part_received >= self.red_part_length
    }

    /// Rebuilds the deliverable red part by walking extents in offset
    /// order (spec.md §4.4 "Red-part delivery": "a reordering of
    /// already-accounted-for space; no new allocation").
    pub fn assemble_red_part(&self) -> Bytes {
        let mut out = Vec::with_capacity(self.red_part_length as usize);
        for extent in self.red_segments.values() {
            out.extend_from_slice(&extent.data);
        }
        Bytes::from(out)
    }

    /// spec.md §4.4: "unknown to closed_imports" and reception-claim
    /// coalescing — adjacent/overlapping extents within `[lower, upper)`
    /// merged into claims, offsets relative to `lower`.
    pub fn coalesce_claims_in(&self, lower: u64, upper: u64) -> Vec<(u64, u64)> {
        let mut claims: Vec<(u64, u64)> = Vec::new();
        for (&offset, extent) in self.red_segments.range(lower..upper) {
            let start = offset.max(lower);
            let end = (offset + extent.length).min(upper);
            if start >= end {
                continue;
            }
            if let Some(last) = claims.last_mut() {
                if last.0 + last.1 == start {
                    last.1 += end - start;
                    continue;
                }
            }
            claims.push((start, end - start));
        }
        claims.into_iter().map(|(start, len)| (start - lower, len)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_detection_rejects_overlapping_extent() {
        let mut session = ImportSession::new(1, 1);
        session.insert_extent(500, Bytes::from_static(&[0u8; 500]));
        assert!(session.overlaps_existing(400, 200));
        assert!(!session.overlaps_existing(0, 500));
    }

    #[test]
    fn red_part_completion_tracks_total_received() {
        let mut session = ImportSession::new(1, 1);
        session.red_part_length = 1000;
        session.insert_extent(500, Bytes::from_static(&[0u8; 500]));
        assert!(!session.is_red_part_complete());
        session.insert_extent(0, Bytes::from_static(&[0u8; 500]));
        assert!(session.is_red_part_complete());
    }

    #[test]
    fn assemble_red_part_is_permutation_independent() {
        let mut forward = ImportSession::new(1, 1);
        forward.insert_extent(0, Bytes::from_static(b"abcd"));
        forward.insert_extent(4, Bytes::from_static(b"efgh"));

        let mut backward = ImportSession::new(1, 1);
        backward.insert_extent(4, Bytes::from_static(b"efgh"));
        backward.insert_extent(0, Bytes::from_static(b"abcd"));

        assert_eq!(forward.assemble_red_part(), backward.assemble_red_part());
    }

    #[test]
    fn coalesces_adjacent_extents_into_one_claim() {
        let mut session = ImportSession::new(1, 1);
        session.insert_extent(500, Bytes::from_static(&[0u8; 500]));
        let claims = session.coalesce_claims_in(0, 1000);
        assert_eq!(claims, vec![(500, 500)]);
    }
}
