// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Import-session (receiver) state machine, spec.md §4.4.

use bytes::Bytes;

use crate::ltp::{
    session::{
        import::{ImportSession, ImportSessionState, PendingReport},
        reports::get_max_reports,
    },
    state_machine::common::{StateMachineCtx, Transition},
    wire::{ReasonCode, report::{Claim, ReportContent}},
};

#[derive(Debug, Clone)]
pub struct RedSegmentArrival {
    pub offset: u64,
    pub data: Bytes,
    pub is_checkpoint: bool,
    pub is_eorp: bool,
    pub is_eob: bool,
    pub ckpt_serial: u64,
    pub rpt_serial_cited: u64,
    /// Used only to seed `next_rpt_serial` on the session's first report
    /// (spec.md §4.4: "pick next_rpt_serial = random(1..2^32-1)"); the
    /// caller supplies the random draw since this module stays
    /// deterministic.
    pub initial_rpt_serial_hint: u64,
    pub segment_size: u64,
    pub errors_per_byte: f64,
    pub max_claims_per_rs: u32,
}

#[derive(Debug, Clone)]
pub enum ReceiverEvent {
    RedSegment(RedSegmentArrival),
    GreenSegment { is_eob: bool },
    ReportAckReceived { rpt_serial: u64 },
    ReportTimedOut { rpt_serial: u64, max_timeouts: u32 },
    CancelRequested(ReasonCode),
    CancelAckReceived,
    CancelReceived(ReasonCode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverAction {
    None,
    Dropped,
    SendReport(ReportContent),
    ResendReport(ReportContent),
    ScheduleReportTimer { rpt_serial: u64 },
    DisarmReportTimer { rpt_serial: u64 },
    NotifyRecvRedPart { end_of_block_recd: bool },
    NotifyRecvGreenSegment,
    NotifyImportComplete,
    NotifyImportCanceled(ReasonCode),
    SendCancel(ReasonCode),
    SendCancelAck,
    ScheduleForgetSession,
}

pub struct ImportSessionMachine<'a> {
    pub session: &'a mut ImportSession,
}

impl<'a> ImportSessionMachine<'a> {
    pub fn new(session: &'a mut ImportSession) -> Self {
        Self { session }
    }

    fn handle_red_segment(&mut self, arrival: RedSegmentArrival) -> Vec<ReceiverAction> {
        // Step 1 (partial): color contradiction (spec.md §4.4 step 1).
        if self.session.green_seen {
            self.session.state = ImportSessionState::Canceled;
            self.session.reason_code = Some(ReasonCode::MiscoloredSegment);
            return vec![ReceiverAction::SendCancel(ReasonCode::MiscoloredSegment)];
        }
        self.session.red_seen = true;

        let length = arrival.data.len() as u64;
        if self.session.overlaps_existing(arrival.offset, length) {
            return vec![ReceiverAction::Dropped];
        }
        self.session.insert_extent(arrival.offset, arrival.data);
        self.session.state = ImportSessionState::Receiving;

        let mut actions = Vec::new();

        if arrival.is_eorp || arrival.is_eob {
            self.session.red_part_length = arrival.offset + length;
            self.session.max_reports = get_max_reports(
                self.session.red_part_length,
                arrival.segment_size,
                arrival.errors_per_byte,
                arrival.max_claims_per_rs,
            );
        }
        if arrival.is_eob {
            self.session.end_of_block_recd = true;
        }

        if self.session.is_red_part_complete() {
            self.session.state = ImportSessionState::RedComplete;
            actions.push(ReceiverAction::NotifyRecvRedPart { end_of_block_recd: self.session.end_of_block_recd });
        }

        if arrival.is_checkpoint {
            actions.extend(self.build_report(&arrival, arrival.max_claims_per_rs));
        }

        actions
    }

    fn build_report(&mut self, arrival: &RedSegmentArrival, max_claims_per_rs: u32) -> Vec<ReceiverAction> {
        let rpt_serial = if self.session.next_rpt_serial == 0 {
            arrival.initial_rpt_serial_hint.max(1)
        } else {
            self.session.next_rpt_serial.wrapping_add(1)
        };
        if rpt_serial == 0 {
            self.session.state = ImportSessionState::Canceled;
            self.session.reason_code = Some(ReasonCode::RetransmitLimitExceeded);
            return vec![ReceiverAction::SendCancel(ReasonCode::RetransmitLimitExceeded)];
        }
        self.session.next_rpt_serial = rpt_serial;
        self.session.reports_count += 1;

        let mut actions = Vec::new();

        let content = if self.session.red_part_length > 0
            && self.session.red_part_received == self.session.red_part_length
        {
            ReportContent {
                rpt_serial,
                ckpt_serial: arrival.ckpt_serial,
                upper_bound: self.session.red_part_length,
                lower_bound: 0,
                claims: vec![Claim { offset: 0, length: self.session.red_part_length }],
            }
        } else {
            let lower_bound = 0;
            let upper_bound = arrival.offset + arrival.data_len_hint();
            let mut claims = self.session.coalesce_claims_in(lower_bound, upper_bound);
            claims.truncate(max_claims_per_rs as usize);
            ReportContent {
                rpt_serial,
                ckpt_serial: arrival.ckpt_serial,
                upper_bound,
                lower_bound,
                claims: claims.into_iter().map(|(offset, length)| Claim { offset, length }).collect(),
            }
        };

        self.session
            .pending_reports
            .insert(rpt_serial, PendingReport { content: content.clone(), expiration_count: 0 });
        actions.push(ReceiverAction::SendReport(content));
        actions.push(ReceiverAction::ScheduleReportTimer { rpt_serial });

        if self.session.reports_count > self.session.max_reports {
            self.session.state = ImportSessionState::Canceled;
            self.session.reason_code = Some(ReasonCode::RetransmitLimitExceeded);
            actions.push(ReceiverAction::SendCancel(ReasonCode::RetransmitLimitExceeded));
        }

        actions
    }

    pub fn step_many(&mut self, event: ReceiverEvent) -> Vec<ReceiverAction> {
        match event {
            ReceiverEvent::RedSegment(arrival) => self.handle_red_segment(arrival),
            ReceiverEvent::GreenSegment { is_eob } => {
                if self.session.red_seen && self.session.red_part_length == 0 {
                    self.session.state = ImportSessionState::Canceled;
                    self.session.reason_code = Some(ReasonCode::MiscoloredSegment);
                    return vec![ReceiverAction::SendCancel(ReasonCode::MiscoloredSegment)];
                }
                self.session.green_seen = true;
                if is_eob {
                    self.session.end_of_block_recd = true;
                }
                vec![ReceiverAction::NotifyRecvGreenSegment]
            },
            ReceiverEvent::ReportAckReceived { rpt_serial } => {
                self.session.pending_reports.remove(&rpt_serial);
                let mut actions = vec![ReceiverAction::DisarmReportTimer { rpt_serial }];
                if rpt_serial == self.session.next_rpt_serial && self.session.is_red_part_complete() {
                    self.session.state = ImportSessionState::Closed;
                    actions.push(ReceiverAction::NotifyImportComplete);
                    actions.push(ReceiverAction::ScheduleForgetSession);
                }
                actions
            },
            ReceiverEvent::ReportTimedOut { rpt_serial, max_timeouts } => {
                let Some(pending) = self.session.pending_reports.get_mut(&rpt_serial) else {
                    return vec![ReceiverAction::None];
                };
                pending.expiration_count += 1;
                if pending.expiration_count >= max_timeouts {
                    self.session.pending_reports.remove(&rpt_serial);
                    self.session.state = ImportSessionState::Canceled;
                    self.session.reason_code = Some(ReasonCode::RetransmitLimitExceeded);
                    return vec![ReceiverAction::SendCancel(ReasonCode::RetransmitLimitExceeded)];
                }
                vec![ReceiverAction::ResendReport(pending.content.clone())]
            },
            ReceiverEvent::CancelRequested(reason) => {
                self.session.state = ImportSessionState::Canceled;
                self.session.reason_code = Some(reason);
                vec![ReceiverAction::SendCancel(reason)]
            },
            ReceiverEvent::CancelAckReceived => {
                self.session.state = ImportSessionState::Dead;
                vec![ReceiverAction::None]
            },
            ReceiverEvent::CancelReceived(reason) => {
                self.session.state = ImportSessionState::Dead;
                self.session.reason_code = Some(reason);
                vec![ReceiverAction::SendCancelAck, ReceiverAction::NotifyImportCanceled(reason)]
            },
        }
    }
}

impl RedSegmentArrival {
    fn data_len_hint(&self) -> u64 {
        self.data.len() as u64
    }
}

impl<'a> StateMachineCtx for ImportSessionMachine<'a> {
    type State = ImportSessionState;
    type Event = ReceiverEvent;
    type Output = Vec<ReceiverAction>;

    fn state(&self) -> Self::State {
        self.session.state
    }

    fn step(&mut self, event: Self::Event) -> Transition<Self::State, Self::Output> {
        let actions = self.step_many(event);
        match self.session.state {
            ImportSessionState::Closed | ImportSessionState::Dead => Transition::Done(actions),
            state => Transition::Next(state, actions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arrival(offset: u64, data: &[u8], is_eorp: bool, is_checkpoint: bool) -> RedSegmentArrival {
        RedSegmentArrival {
            offset,
            data: Bytes::copy_from_slice(data),
            is_checkpoint,
            is_eorp,
            is_eob: is_eorp,
            ckpt_serial: 1,
            rpt_serial_cited: 0,
            initial_rpt_serial_hint: 42,
            segment_size: 500,
            errors_per_byte: 0.0,
            max_claims_per_rs: 100,
        }
    }

    #[test]
    fn miscolored_segment_triggers_cancel() {
        let mut session = ImportSession::new(1, 1);
        let mut machine = ImportSessionMachine::new(&mut session);
        machine.step_many(ReceiverEvent::GreenSegment { is_eob: false });
        let actions = machine.step_many(ReceiverEvent::RedSegment(arrival(0, &[0u8; 10], false, false)));
        assert!(matches!(actions[0], ReceiverAction::SendCancel(ReasonCode::MiscoloredSegment)));
        assert_eq!(session.state, ImportSessionState::Canceled);
    }

    #[test]
    fn eorp_checkpoint_sends_final_report_when_fully_received() {
        let mut session = ImportSession::new(1, 1);
        let mut machine = ImportSessionMachine::new(&mut session);
        let actions = machine.step_many(ReceiverEvent::RedSegment(arrival(0, &[0u8; 1000], true, true)));
        let report = actions.iter().find_map(|a| match a {
            ReceiverAction::SendReport(r) => Some(r),
            _ => None,
        });
        assert!(report.is_some());
        assert_eq!(report.unwrap().claims, vec![Claim { offset: 0, length: 1000 }]);
        assert!(actions.contains(&ReceiverAction::NotifyRecvRedPart { end_of_block_recd: true }));
    }

    #[test]
    fn duplicate_extent_is_dropped() {
        let mut session = ImportSession::new(1, 1);
        let mut machine = ImportSessionMachine::new(&mut session);
        machine.step_many(ReceiverEvent::RedSegment(arrival(0, &[0u8; 500], false, false)));
        let actions = machine.step_many(ReceiverEvent::RedSegment(arrival(0, &[0u8; 500], false, false)));
        assert_eq!(actions, vec![ReceiverAction::Dropped]);
    }

    #[test]
    fn report_timeout_resends_until_limit_then_cancels() {
        let mut session = ImportSession::new(1, 1);
        let mut machine = ImportSessionMachine::new(&mut session);
        machine.step_many(ReceiverEvent::RedSegment(arrival(0, &[0u8; 1000], true, true)));
        let rpt_serial = session.next_rpt_serial;

        let actions = machine.step_many(ReceiverEvent::ReportTimedOut { rpt_serial, max_timeouts: 2 });
        assert!(matches!(actions[0], ReceiverAction::ResendReport(_)));
        assert_eq!(session.state, ImportSessionState::RedComplete);

        let actions = machine.step_many(ReceiverEvent::ReportTimedOut { rpt_serial, max_timeouts: 2 });
        assert!(matches!(actions[0], ReceiverAction::SendCancel(ReasonCode::RetransmitLimitExceeded)));
        assert_eq!(session.state, ImportSessionState::Canceled);
    }

    #[test]
    fn report_ack_clears_pending_report() {
        let mut session = ImportSession::new(1, 1);
        let mut machine = ImportSessionMachine::new(&mut session);
        machine.step_many(ReceiverEvent::RedSegment(arrival(0, &[0u8; 1000], true, true)));
        let rpt_serial = session.next_rpt_serial;
        assert!(session.pending_reports.contains_key(&rpt_serial));

        machine.step_many(ReceiverEvent::ReportAckReceived { rpt_serial });
        assert!(!session.pending_reports.contains_key(&rpt_serial));
    }
}
