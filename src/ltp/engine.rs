// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! LTP Engine: ties the per-span session tables (spec.md §3) to the
//! sender/receiver state machines (spec.md §4.3, §4.4) and the Timer
//! Wheel (spec.md §4.5), giving callers a handful of verbs instead of
//! having to wire the pieces themselves. Grounded on the teacher's
//! `client/pool_sessions.rs::Pool` — a `DashMap`-of-spans keyed by
//! remote identity, same as `Pool`'s TSIH-keyed session table.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::{
    cfg::config::SpanConfig,
    error::{DtnError, DtnResult},
    ltp::{
        session::{
            export::{ExportSession, ExportSessionState},
            import::{ImportSession, ImportSessionState},
            span::{CLOSED_IMPORT_FORGET_MARGIN_SECONDS, QueuedSegment, Span},
        },
        state_machine::{
            common::StateMachineCtx,
            receiver::{ImportSessionMachine, ReceiverAction, ReceiverEvent},
            sender::{ExportSessionMachine, SenderAction, SenderEvent},
        },
        timer::{EventKind, TimerWheel},
        wire::{
            Segment, SegmentBody, SegmentHeader, SegmentTypeCode,
            cancel::{CancelAckContent, CancelContent, ReasonCode},
            data::DataSegmentContent,
            report::ReportContent,
            report_ack::ReportAckContent,
        },
    },
    neighbor::NeighborDirectory,
};

/// What the caller must do with the actions a segment intake or timer
/// dispatch produced: put bytes on the wire, or surface a delivery/cancel
/// notification to the application above LTP. The engine itself never
/// touches a socket (spec.md §2: link service is a separate module).
#[derive(Debug, Clone)]
pub enum EngineEffect {
    SendSegment { dest_engine_id: u64, segment: Segment },
    RedPartDelivered { session_nbr: u64, end_of_block: bool },
    ImportCanceled { session_nbr: u64, reason: ReasonCode },
    ExportComplete { session_nbr: u64 },
    ExportCanceled { session_nbr: u64, reason: ReasonCode },
}

pub struct LtpEngine {
    pub local_engine_id: u64,
    spans: DashMap<u64, Arc<Span>>,
    pub timers: TimerWheel,
    max_timeouts: u32,
    /// Live per-neighbor rates/light-times (spec.md §2), consulted for the
    /// §4.3 resend-deadline math. Populated by whatever wires contact-plan
    /// transitions through; degrades to all-zero defaults for a neighbor it
    /// has never heard from.
    neighbors: NeighborDirectory,
}

impl LtpEngine {
    pub fn new(local_engine_id: u64, max_timeouts: u32) -> Self {
        Self {
            local_engine_id,
            spans: DashMap::new(),
            timers: TimerWheel::new(),
            max_timeouts,
            neighbors: NeighborDirectory::new(),
        }
    }

    /// Live per-neighbor directory backing the resend-deadline math below;
    /// exposed so contact-plan transitions can be wired into it.
    pub fn neighbors(&self) -> &NeighborDirectory {
        &self.neighbors
    }

    /// spec.md §4.3 "Checkpoint timing": `segArrivalTime = now + radiation_time
    /// + owlt_out + own_qtime/2`, `ackDeadline = segArrivalTime + remote_qtime
    /// + owlt_in + own_qtime/2`. `radiation_time` is the time to radiate one
    /// max-size segment at the neighbor's current transmit rate, mirroring
    /// the radiation-latency computation the CGR planner does for bundles.
    fn resend_deadlines(&self, span: &Span, now: i64) -> (i64, i64, i64) {
        let neighbor = self.neighbors.get(span.engine_id);
        let own_qtime = span.config.own_qtime.as_secs() as i64;
        let remote_qtime = span.config.remote_qtime.as_secs() as i64;
        let radiation_time = span.config.max_segment_size as i64 / neighbor.xmit_rate.max(1) as i64;
        let seg_arrival_time = now + radiation_time + neighbor.owlt_out as i64 + own_qtime / 2;
        let ack_deadline = seg_arrival_time + remote_qtime + neighbor.owlt_in as i64 + own_qtime / 2;
        (seg_arrival_time, own_qtime, ack_deadline)
    }

    /// spec.md §3/§4.4: a closed import's session number is retained for
    /// `2 · MAX_TIMEOUTS · (owlt_out + owlt_in)` plus a fixed margin before
    /// `ForgetSession` drops it, so a stray retransmission arriving late
    /// still finds it in `closed_imports`.
    fn forget_session_delay(&self, span: &Span) -> i64 {
        let neighbor = self.neighbors.get(span.engine_id);
        2 * self.max_timeouts as i64 * (neighbor.owlt_out as i64 + neighbor.owlt_in as i64) + CLOSED_IMPORT_FORGET_MARGIN_SECONDS
    }

    pub fn span(&self, remote_engine_id: u64) -> Option<Arc<Span>> {
        self.spans.get(&remote_engine_id).map(|v| v.clone())
    }

    pub fn open_span(&self, remote_engine_id: u64, config: SpanConfig) -> Arc<Span> {
        self.spans
            .entry(remote_engine_id)
            .or_insert_with(|| Arc::new(Span::new(remote_engine_id, config)))
            .clone()
    }

    /// spec.md §4.3 "Start export session": admission-checked creation of
    /// a new export session, returning its session number.
    pub fn start_export_session(&self, remote_engine_id: u64, total_length: u64, red_part_length: u64) -> DtnResult<u64> {
        let span = self
            .span(remote_engine_id)
            .ok_or_else(|| DtnError::ConfigurationError(format!("no span configured for engine {remote_engine_id}")))?;

        if !span.can_open_export_session() {
            return Err(DtnError::CapacityExhaustion(format!(
                "span {remote_engine_id}: max_export_sessions reached"
            )));
        }

        let session_nbr = span.next_session_number();
        let session = ExportSession::new(session_nbr, remote_engine_id, total_length, red_part_length);
        span.export_sessions.insert(session_nbr, session);
        debug!(remote_engine_id, session_nbr, "export session opened");
        Ok(session_nbr)
    }

    /// spec.md §4.4: an import session is created lazily on first segment
    /// arrival rather than via an explicit start call; `ensure_import`
    /// implements that "session number unknown to closed_imports" check.
    /// When `max_import_sessions` is already reached, the oldest still-open
    /// import session is evicted (`CancelByEngine`) to make room, per
    /// spec.md §4.4 "Create" — rather than rejecting the new arrival.
    fn ensure_import(&self, span: &Span, session_nbr: u64, now: i64) -> DtnResult<Vec<EngineEffect>> {
        if span.closed_imports.contains(session_nbr) {
            return Err(DtnError::SessionState { session: session_nbr, detail: "session already closed".into() });
        }
        if span.import_sessions.contains_key(&session_nbr) {
            return Ok(Vec::new());
        }

        let mut effects = Vec::new();
        if !span.can_open_import_session() {
            let evicted = span.import_order.oldest().ok_or_else(|| {
                DtnError::CapacityExhaustion(format!("span {}: max_import_sessions reached", span.engine_id))
            })?;
            let actions = span
                .import_sessions
                .with_mut(&evicted, |session| {
                    ImportSessionMachine::new(session).step_many(ReceiverEvent::CancelRequested(ReasonCode::CancelByEngine))
                })
                .unwrap_or_default();
            effects.extend(self.translate_receiver_actions(span, evicted, actions, now));
            span.closed_imports.insert(evicted);
            span.import_sessions.remove(&evicted);
            span.import_order.remove(evicted);
            effects.push(EngineEffect::ImportCanceled { session_nbr: evicted, reason: ReasonCode::CancelByEngine });
            debug!(remote_engine_id = span.engine_id, evicted, session_nbr, "evicted oldest import session to admit new one");
        }

        span.import_sessions.insert(session_nbr, ImportSession::new(session_nbr, span.engine_id));
        span.import_order.push(session_nbr);
        Ok(effects)
    }

    /// spec.md §4.3/§4.4: decodes one inbound segment and dispatches it to
    /// the matching export or import session's state machine, translating
    /// the resulting actions into wire sends and upward notifications.
    pub fn on_segment_received(&self, remote_engine_id: u64, raw: &[u8], now: i64) -> DtnResult<Vec<EngineEffect>> {
        let segment = Segment::decode(raw).map_err(|e| DtnError::InputValidation(e.to_string()))?;
        let span = self
            .span(remote_engine_id)
            .ok_or_else(|| DtnError::ConfigurationError(format!("no span configured for engine {remote_engine_id}")))?;

        match &segment.body {
            SegmentBody::Report(report) => self.handle_report_at_sender(&span, segment.header, report.clone(), now),
            SegmentBody::ReportAck(ack) => self.handle_report_ack_at_receiver(&span, segment.header, ack.clone(), now),
            SegmentBody::Cancel(cancel) => self.handle_cancel(&span, segment.header, cancel.reason, now),
            SegmentBody::CancelAck(_) => self.handle_cancel_ack(&span, segment.header, now),
            SegmentBody::Data(data) => self.handle_data_at_receiver(&span, segment.header, data.clone(), now),
        }
    }

    fn handle_data_at_receiver(
        &self,
        span: &Span,
        header: SegmentHeader,
        data: DataSegmentContent,
        now: i64,
    ) -> DtnResult<Vec<EngineEffect>> {
        let session_nbr = header.session_number;
        if span.closed_imports.contains(session_nbr) {
            return Ok(vec![]);
        }
        let mut effects = self.ensure_import(span, session_nbr, now)?;

        let event = if header.type_code.is_green_data() {
            ReceiverEvent::GreenSegment { is_eob: header.type_code.is_eob() }
        } else {
            ReceiverEvent::RedSegment(crate::ltp::state_machine::receiver::RedSegmentArrival {
                offset: data.offset,
                data: data.data,
                is_checkpoint: header.type_code.is_checkpoint(),
                is_eorp: header.type_code.is_eorp(),
                is_eob: header.type_code.is_eob(),
                ckpt_serial: data.checkpoint.as_ref().map(|c| c.ckpt_serial).unwrap_or(0),
                rpt_serial_cited: data.checkpoint.as_ref().map(|c| c.rpt_serial).unwrap_or(0),
                initial_rpt_serial_hint: session_nbr,
                segment_size: span.config.max_segment_size as u64,
                errors_per_byte: span.config.errors_per_byte,
                max_claims_per_rs: 20,
            })
        };

        let actions = span
            .import_sessions
            .with_mut(&session_nbr, |session| ImportSessionMachine::new(session).step_many(event))
            .ok_or_else(|| DtnError::InternalError("import session vanished mid-dispatch".into()))?;

        effects.extend(self.translate_receiver_actions(span, session_nbr, actions, now));
        Ok(effects)
    }

    fn translate_receiver_actions(&self, span: &Span, session_nbr: u64, actions: Vec<ReceiverAction>, now: i64) -> Vec<EngineEffect> {
        let mut effects = Vec::new();
        for action in actions {
            match action {
                ReceiverAction::None | ReceiverAction::Dropped => {},
                ReceiverAction::SendReport(report) => {
                    effects.push(EngineEffect::SendSegment {
                        dest_engine_id: span.engine_id,
                        segment: report_segment(self.local_engine_id, session_nbr, report),
                    });
                },
                ReceiverAction::ResendReport(report) => {
                    let rpt_serial = report.rpt_serial;
                    effects.push(EngineEffect::SendSegment {
                        dest_engine_id: span.engine_id,
                        segment: report_segment(self.local_engine_id, session_nbr, report),
                    });
                    let (seg_arrival_time, qtime, ack_deadline) = self.resend_deadlines(span, now);
                    self.timers.schedule_resend(
                        EventKind::ResendReport { session_nbr, rpt_serial },
                        seg_arrival_time,
                        qtime,
                        ack_deadline,
                    );
                },
                ReceiverAction::ScheduleReportTimer { rpt_serial } => {
                    let (seg_arrival_time, qtime, ack_deadline) = self.resend_deadlines(span, now);
                    self.timers.schedule_resend(
                        EventKind::ResendReport { session_nbr, rpt_serial },
                        seg_arrival_time,
                        qtime,
                        ack_deadline,
                    );
                },
                ReceiverAction::DisarmReportTimer { rpt_serial } => {
                    self.timers.cancel(&EventKind::ResendReport { session_nbr, rpt_serial });
                },
                ReceiverAction::NotifyRecvRedPart { end_of_block_recd } => {
                    effects.push(EngineEffect::RedPartDelivered { session_nbr, end_of_block: end_of_block_recd });
                },
                ReceiverAction::NotifyRecvGreenSegment => {},
                ReceiverAction::NotifyImportComplete => {
                    span.closed_imports.insert(session_nbr);
                    span.import_sessions.remove(&session_nbr);
                },
                ReceiverAction::NotifyImportCanceled(reason) => {
                    span.closed_imports.insert(session_nbr);
                    span.import_sessions.remove(&session_nbr);
                    effects.push(EngineEffect::ImportCanceled { session_nbr, reason });
                },
                ReceiverAction::SendCancel(reason) => {
                    effects.push(EngineEffect::SendSegment {
                        dest_engine_id: span.engine_id,
                        segment: cancel_segment(self.local_engine_id, session_nbr, SegmentTypeCode::CancelByReceiver, reason),
                    });
                },
                ReceiverAction::SendCancelAck => {
                    effects.push(EngineEffect::SendSegment {
                        dest_engine_id: span.engine_id,
                        segment: cancel_ack_segment(self.local_engine_id, session_nbr, SegmentTypeCode::CancelAckFromReceiver),
                    });
                },
                ReceiverAction::ScheduleForgetSession => {
                    let delay = self.forget_session_delay(span);
                    self.timers.schedule(EventKind::ForgetSession { session_nbr }, now + delay);
                },
            }
        }
        effects
    }

    fn handle_report_at_sender(
        &self,
        span: &Span,
        header: SegmentHeader,
        report: ReportContent,
        now: i64,
    ) -> DtnResult<Vec<EngineEffect>> {
        let session_nbr = header.session_number;
        let actions = span
            .export_sessions
            .with_mut(&session_nbr, |session| ExportSessionMachine::new(session).step_many(SenderEvent::ReportReceived(report)))
            .ok_or_else(|| DtnError::SessionState { session: session_nbr, detail: "unknown export session".into() })?;
        Ok(self.translate_sender_actions(span, session_nbr, actions, now))
    }

    fn handle_report_ack_at_receiver(
        &self,
        span: &Span,
        header: SegmentHeader,
        ack: ReportAckContent,
        now: i64,
    ) -> DtnResult<Vec<EngineEffect>> {
        let session_nbr = header.session_number;
        let actions = span
            .import_sessions
            .with_mut(&session_nbr, |session| {
                ImportSessionMachine::new(session).step_many(ReceiverEvent::ReportAckReceived { rpt_serial: ack.rpt_serial })
            })
            .unwrap_or_default();
        Ok(self.translate_receiver_actions(span, session_nbr, actions, now))
    }

    fn handle_cancel(&self, span: &Span, header: SegmentHeader, reason: ReasonCode, now: i64) -> DtnResult<Vec<EngineEffect>> {
        let session_nbr = header.session_number;
        if let Some(actions) = span
            .export_sessions
            .with_mut(&session_nbr, |session| ExportSessionMachine::new(session).step_many(SenderEvent::CancelReceived(reason)))
        {
            return Ok(self.translate_sender_actions(span, session_nbr, actions, now));
        }
        let actions = span
            .import_sessions
            .with_mut(&session_nbr, |session| ImportSessionMachine::new(session).step_many(ReceiverEvent::CancelReceived(reason)))
            .unwrap_or_default();
        Ok(self.translate_receiver_actions(span, session_nbr, actions, now))
    }

    fn handle_cancel_ack(&self, span: &Span, header: SegmentHeader, now: i64) -> DtnResult<Vec<EngineEffect>> {
        let session_nbr = header.session_number;
        if span.export_sessions.contains_key(&session_nbr) {
            let actions = span
                .export_sessions
                .with_mut(&session_nbr, |session| ExportSessionMachine::new(session).step_many(SenderEvent::CancelAckReceived))
                .unwrap_or_default();
            span.export_sessions.remove(&session_nbr);
            return Ok(self.translate_sender_actions(span, session_nbr, actions, now));
        }
        span.import_sessions.remove(&session_nbr);
        Ok(vec![])
    }

    fn translate_sender_actions(&self, span: &Span, session_nbr: u64, actions: Vec<SenderAction>, now: i64) -> Vec<EngineEffect> {
        let mut effects = Vec::new();
        for action in actions {
            match action {
                SenderAction::None => {},
                SenderAction::ArmCheckpointTimer { cp_sn } => {
                    let (seg_arrival_time, qtime, ack_deadline) = self.resend_deadlines(span, now);
                    self.timers.schedule_resend(
                        EventKind::ResendCheckpoint { session_nbr, cp_sn },
                        seg_arrival_time,
                        qtime,
                        ack_deadline,
                    );
                },
                SenderAction::DisarmCheckpointTimer { cp_sn } => {
                    self.timers.cancel(&EventKind::ResendCheckpoint { session_nbr, cp_sn });
                },
                SenderAction::RetransmitGap { .. } => {
                    // Left to the link-service bridge: it owns the original
                    // block buffer needed to re-slice `[offset, offset+length)`.
                },
                SenderAction::SendReportAck { rpt_serial } => {
                    effects.push(EngineEffect::SendSegment {
                        dest_engine_id: span.engine_id,
                        segment: report_ack_segment(self.local_engine_id, session_nbr, rpt_serial),
                    });
                },
                SenderAction::NotifyExportComplete => {
                    span.export_sessions.remove(&session_nbr);
                    effects.push(EngineEffect::ExportComplete { session_nbr });
                },
                SenderAction::NotifyExportCanceled(reason) => {
                    span.export_sessions.remove(&session_nbr);
                    effects.push(EngineEffect::ExportCanceled { session_nbr, reason });
                },
                SenderAction::SendCancel(reason) => {
                    effects.push(EngineEffect::SendSegment {
                        dest_engine_id: span.engine_id,
                        segment: cancel_segment(self.local_engine_id, session_nbr, SegmentTypeCode::CancelBySender, reason),
                    });
                },
                SenderAction::SendCancelAck => {
                    effects.push(EngineEffect::SendSegment {
                        dest_engine_id: span.engine_id,
                        segment: cancel_ack_segment(self.local_engine_id, session_nbr, SegmentTypeCode::CancelAckFromSender),
                    });
                },
                SenderAction::ResendCheckpoint { .. } => {},
            }
        }
        effects
    }

    /// spec.md §4.5 "Dispatch": pops due timer events and turns resend
    /// timeouts into sender/receiver events.
    pub fn dispatch_timers(&self, now: i64) -> Vec<EngineEffect> {
        let mut effects = Vec::new();
        for event in self.timers.dispatch(now) {
            match event {
                EventKind::ResendCheckpoint { session_nbr, cp_sn } => {
                    for span in self.spans.iter() {
                        if let Some(actions) = span.export_sessions.with_mut(&session_nbr, |session| {
                            ExportSessionMachine::new(session)
                                .step_many(SenderEvent::CheckpointTimedOut { cp_sn, max_timeouts: self.max_timeouts })
                        }) {
                            effects.extend(self.translate_sender_actions(&span, session_nbr, actions, now));
                            break;
                        }
                    }
                },
                EventKind::ResendReport { session_nbr, rpt_serial } => {
                    for span in self.spans.iter() {
                        if let Some(actions) = span.import_sessions.with_mut(&session_nbr, |session| {
                            ImportSessionMachine::new(session)
                                .step_many(ReceiverEvent::ReportTimedOut { rpt_serial, max_timeouts: self.max_timeouts })
                        }) {
                            effects.extend(self.translate_receiver_actions(&span, session_nbr, actions, now));
                            break;
                        }
                    }
                },
                EventKind::ForgetSession { session_nbr } => {
                    for span in self.spans.iter() {
                        span.dead_imports.remove(&session_nbr);
                        span.dead_exports.remove(&session_nbr);
                        span.closed_imports.remove(session_nbr);
                    }
                },
                other => {
                    warn!(?other, "unhandled timer event kind in engine dispatch");
                },
            }
        }
        effects
    }
}

fn report_segment(local_engine_id: u64, session_nbr: u64, report: ReportContent) -> Segment {
    Segment { header: SegmentHeader::new(SegmentTypeCode::Report, local_engine_id, session_nbr), body: SegmentBody::Report(report) }
}

fn report_ack_segment(local_engine_id: u64, session_nbr: u64, rpt_serial: u64) -> Segment {
    Segment {
        header: SegmentHeader::new(SegmentTypeCode::ReportAck, local_engine_id, session_nbr),
        body: SegmentBody::ReportAck(ReportAckContent { rpt_serial }),
    }
}

fn cancel_segment(local_engine_id: u64, session_nbr: u64, type_code: SegmentTypeCode, reason: ReasonCode) -> Segment {
    Segment { header: SegmentHeader::new(type_code, local_engine_id, session_nbr), body: SegmentBody::Cancel(CancelContent { reason }) }
}

fn cancel_ack_segment(local_engine_id: u64, session_nbr: u64, type_code: SegmentTypeCode) -> Segment {
    Segment { header: SegmentHeader::new(type_code, local_engine_id, session_nbr), body: SegmentBody::CancelAck(CancelAckContent) }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::cfg::config::SpanConfig;

    fn engine_with_span() -> (LtpEngine, u64) {
        let engine = LtpEngine::new(1, 5);
        engine.open_span(2, SpanConfig::default_for_test());
        (engine, 2)
    }

    #[test]
    fn full_red_part_segment_is_delivered_and_acked() {
        let (engine, remote) = engine_with_span();
        let segment = Segment {
            header: SegmentHeader::new(SegmentTypeCode::RedDataCheckpointEorpEob, remote, 7),
            body: SegmentBody::Data(DataSegmentContent {
                client_service_id: 0,
                offset: 0,
                length: 4,
                checkpoint: Some(crate::ltp::wire::data::CheckpointInfo { ckpt_serial: 1, rpt_serial: 0 }),
                data: Bytes::from_static(b"data"),
            }),
        };
        let effects = engine.on_segment_received(remote, &segment.encode(), 1000).unwrap();
        assert!(effects.iter().any(|e| matches!(e, EngineEffect::RedPartDelivered { end_of_block: true, .. })));
        assert!(effects.iter().any(|e| matches!(e, EngineEffect::SendSegment { .. })));
    }

    #[test]
    fn export_session_completes_on_full_report_coverage() {
        let (engine, remote) = engine_with_span();
        let session_nbr = engine.start_export_session(remote, 1000, 1000).unwrap();
        let report = ReportContent {
            rpt_serial: 1,
            ckpt_serial: 1,
            upper_bound: 1000,
            lower_bound: 0,
            claims: vec![crate::ltp::wire::report::Claim { offset: 0, length: 1000 }],
        };
        let segment =
            Segment { header: SegmentHeader::new(SegmentTypeCode::Report, remote, session_nbr), body: SegmentBody::Report(report) };
        let effects = engine.on_segment_received(remote, &segment.encode(), 1000).unwrap();
        assert!(effects.iter().any(|e| matches!(e, EngineEffect::ExportComplete { .. })));
    }

    #[test]
    fn capacity_exhaustion_rejects_session_beyond_limit() {
        let engine = LtpEngine::new(1, 5);
        let mut config = SpanConfig::default_for_test();
        config.max_export_sessions = 1;
        engine.open_span(2, config);
        engine.start_export_session(2, 10, 10).unwrap();
        assert!(engine.start_export_session(2, 10, 10).is_err());
    }

    fn red_segment(session_nbr: u64) -> Segment {
        Segment {
            header: SegmentHeader::new(SegmentTypeCode::RedDataNotCheckpoint, 2, session_nbr),
            body: SegmentBody::Data(DataSegmentContent {
                client_service_id: 0,
                offset: 0,
                length: 10,
                checkpoint: None,
                data: Bytes::from_static(&[0u8; 10]),
            }),
        }
    }

    #[test]
    fn import_capacity_exhaustion_evicts_oldest_open_session() {
        let engine = LtpEngine::new(1, 5);
        let mut config = SpanConfig::default_for_test();
        config.max_import_sessions = 1;
        engine.open_span(2, config);

        engine.on_segment_received(2, &red_segment(10).encode(), 1000).unwrap();
        let span = engine.span(2).unwrap();
        assert!(span.import_sessions.contains_key(&10));

        let effects = engine.on_segment_received(2, &red_segment(20).encode(), 1000).unwrap();
        assert!(effects.iter().any(|e| matches!(
            e,
            EngineEffect::ImportCanceled { session_nbr: 10, reason: ReasonCode::CancelByEngine }
        )));
        assert!(effects.iter().any(|e| matches!(
            e,
            EngineEffect::SendSegment { segment, .. } if matches!(segment.body, SegmentBody::Cancel(_))
        )));
        assert!(!span.import_sessions.contains_key(&10));
        assert!(span.closed_imports.contains(10));
        assert!(span.import_sessions.contains_key(&20));
    }
}
