// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Span: per-remote-engine state (spec.md §3), holding the export/import
//! session tables, the outbound segment FIFO, and closed-session
//! bookkeeping. Mirrors the teacher's `Pool`/`Session` DashMap-plus-Arc
//! layout, scoped to one engine instead of one iSCSI TSIH.

use std::{collections::VecDeque, sync::Mutex};

use tokio::sync::Notify;

use crate::{
    cfg::{config::SpanConfig, enums::YesNo},
    ltp::{
        session::{export::ExportSession, import::ImportSession},
        wire::Segment,
    },
    store::{SerialCounter, Table},
};

/// Margin folded into the closed-import retention window alongside
/// `2 · MAX_TIMEOUTS · (owlt_out + owlt_in)` (spec.md §3/§4.4).
pub const CLOSED_IMPORT_FORGET_MARGIN_SECONDS: i64 = 10;

/// One segment queued for link-service output. Acks are priority-inserted
/// ahead of the first non-ack segment (spec.md §5: "acks are inserted
/// before the first non-ack segment").
#[derive(Debug, Clone)]
pub struct QueuedSegment {
    pub segment: Segment,
    pub is_ack: bool,
}

#[derive(Debug, Default)]
struct SegmentFifo {
    queue: Mutex<VecDeque<QueuedSegment>>,
}

impl SegmentFifo {
    fn push_data(&self, segment: Segment) {
        self.queue.lock().unwrap().push_back(QueuedSegment { segment, is_ack: false });
    }

    /// Priority-inserts an ack segment ahead of the first non-ack segment
    /// already queued (spec.md §5).
    fn push_ack(&self, segment: Segment) {
        let mut queue = self.queue.lock().unwrap();
        let pos = queue.iter().position(|s| !s.is_ack).unwrap_or(queue.len());
        queue.insert(pos, QueuedSegment { segment, is_ack: true });
    }

    fn pop(&self) -> Option<QueuedSegment> {
        self.queue.lock().unwrap().pop_front()
    }

    fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }
}

/// Ordered, deduplicated record of recently-closed import session numbers
/// (spec.md §3, §8 invariant 5: "strictly ascending").
#[derive(Debug, Default)]
pub struct ClosedImports {
    entries: Mutex<Vec<u64>>,
}

impl ClosedImports {
    pub fn insert(&self, session_nbr: u64) {
        let mut entries = self.entries.lock().unwrap();
        if let Err(pos) = entries.binary_search(&session_nbr) {
            entries.insert(pos, session_nbr);
        }
    }

    pub fn contains(&self, session_nbr: u64) -> bool {
        self.entries.lock().unwrap().binary_search(&session_nbr).is_ok()
    }

    pub fn remove(&self, session_nbr: u64) {
        let mut entries = self.entries.lock().unwrap();
        if let Ok(pos) = entries.binary_search(&session_nbr) {
            entries.remove(pos);
        }
    }

    pub fn is_strictly_ascending(&self) -> bool {
        self.entries.lock().unwrap().windows(2).all(|w| w[0] < w[1])
    }
}

/// FIFO of currently-open import session numbers in creation order, used
/// to find the oldest one to evict when `max_import_sessions` is reached
/// (spec.md §4.4 "Create").
#[derive(Debug, Default)]
pub struct ImportSessionOrder {
    order: Mutex<VecDeque<u64>>,
}

impl ImportSessionOrder {
    pub fn push(&self, session_nbr: u64) {
        self.order.lock().unwrap().push_back(session_nbr);
    }

    pub fn remove(&self, session_nbr: u64) {
        self.order.lock().unwrap().retain(|&n| n != session_nbr);
    }

    /// The oldest still-open session number, if any.
    pub fn oldest(&self) -> Option<u64> {
        self.order.lock().unwrap().front().copied()
    }
}

#[derive(Debug)]
pub struct Span {
    pub engine_id: u64,
    pub config: SpanConfig,
    pub export_sessions: Table<u64, ExportSession>,
    pub import_sessions: Table<u64, ImportSession>,
    pub closed_imports: ClosedImports,
    pub import_order: ImportSessionOrder,
    pub dead_imports: Table<u64, ()>,
    pub dead_exports: Table<u64, ()>,
    segments: SegmentFifo,
    next_session_number: SerialCounter,
    /// spec.md §5 "segments-available semaphore", re-architected as a
    /// `Notify` the Link Service Output task awaits instead of blocks on.
    pub segment_available: Notify,
}

impl Span {
    pub fn new(engine_id: u64, config: SpanConfig) -> Self {
        Self {
            engine_id,
            config,
            export_sessions: Table::new(),
            import_sessions: Table::new(),
            closed_imports: ClosedImports::default(),
            import_order: ImportSessionOrder::default(),
            dead_imports: Table::new(),
            dead_exports: Table::new(),
            segments: SegmentFifo::default(),
            next_session_number: SerialCounter::new(1),
            segment_available: Notify::new(),
        }
    }

    /// spec.md §6.3: "session-number counters (monotonic)".
    pub fn next_session_number(&self) -> u64 {
        self.next_session_number.next()
    }

    pub fn enqueue_data(&self, segment: Segment) {
        self.segments.push_data(segment);
        self.segment_available.notify_one();
    }

    pub fn enqueue_ack(&self, segment: Segment) {
        self.segments.push_ack(segment);
        self.segment_available.notify_one();
    }

    pub fn dequeue(&self) -> Option<QueuedSegment> {
        self.segments.pop()
    }

    pub fn queue_len(&self) -> usize {
        self.segments.len()
    }

    /// spec.md §3 invariant: active export sessions bounded by
    /// `max_export_sessions`.
    pub fn can_open_export_session(&self) -> bool {
        (self.export_sessions.len() as u64) < self.config.max_export_sessions
    }

    pub fn can_open_import_session(&self) -> bool {
        (self.import_sessions.len() as u64) < self.config.max_import_sessions
    }

    pub fn enforces_schedule(&self) -> bool {
        self.config.enforce_schedule == YesNo::Yes
    }

    pub fn purges_on_contact_end(&self) -> bool {
        self.config.purge == YesNo::Yes
    }
}
