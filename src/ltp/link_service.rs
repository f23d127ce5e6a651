// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Link Service Bridge (spec.md §2, §5): the thin boundary between LPSM
//! and whatever actually moves bytes between engines. The concrete wire
//! transport is a Non-goal (spec.md §1); this module only defines the
//! task shape and the channel contracts, grounded on the teacher's
//! `client/client.rs::ClientConnection` read/write-loop split and on
//! spec.md §9's instruction to re-architect semaphore-driven helper
//! tasks as bounded channels between named tasks.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::{
    ltp::{engine::LtpEngine, session::span::Span},
    utils::now_unix,
};

/// One outbound wire frame: which remote engine it's addressed to, and its
/// encoded bytes.
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    pub dest_engine_id: u64,
    pub bytes: Vec<u8>,
}

/// One inbound wire frame, tagged with the engine it arrived from.
#[derive(Debug, Clone)]
pub struct InboundFrame {
    pub source_engine_id: u64,
    pub bytes: Vec<u8>,
}

/// Link Service Output (LSO): one per span, drains the span's segment FIFO
/// and forwards each encoded segment to the transport's send channel
/// (spec.md §5 "One link-service output task per span").
pub struct LinkServiceOutput {
    span: Arc<Span>,
    out_tx: mpsc::Sender<OutboundFrame>,
}

impl LinkServiceOutput {
    pub fn new(span: Arc<Span>, out_tx: mpsc::Sender<OutboundFrame>) -> Self {
        Self { span, out_tx }
    }

    /// Runs until `out_tx` is dropped, mirroring spec.md §5 "channel
    /// closed → task exits cleanly" in place of a semaphore-ended signal.
    pub async fn run(self) {
        loop {
            while let Some(queued) = self.span.dequeue() {
                let bytes = queued.segment.encode();
                let frame = OutboundFrame { dest_engine_id: self.span.engine_id, bytes };
                if self.out_tx.send(frame).await.is_err() {
                    trace!(engine_id = self.span.engine_id, "LSO exiting: outbound channel closed");
                    return;
                }
            }
            self.span.segment_available.notified().await;
        }
    }
}

/// Link Service Input (LSI): one shared task that demultiplexes inbound
/// frames to the engine by `source_engine_id` (spec.md §5 "One
/// link-service input task").
pub struct LinkServiceInput {
    engine: Arc<LtpEngine>,
    in_rx: mpsc::Receiver<InboundFrame>,
}

impl LinkServiceInput {
    pub fn new(engine: Arc<LtpEngine>, in_rx: mpsc::Receiver<InboundFrame>) -> Self {
        Self { engine, in_rx }
    }

    /// Runs until the sender side of `in_rx` is dropped.
    pub async fn run(mut self) {
        while let Some(frame) = self.in_rx.recv().await {
            match self.engine.on_segment_received(frame.source_engine_id, &frame.bytes, now_unix()) {
                Ok(_effects) => {
                    // Wiring `_effects` (SendSegment/notifications) to the
                    // session-demuxer and application callbacks is left to
                    // the embedder; this bridge only guarantees delivery
                    // into the engine (spec.md §2 LSB scope).
                },
                Err(err) => warn!(source_engine_id = frame.source_engine_id, %err, "dropping unparseable inbound frame"),
            }
        }
        trace!("LSI exiting: inbound channel closed");
    }
}
