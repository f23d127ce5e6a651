// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Export-session (sender) state machine, spec.md §4.3.

use crate::ltp::{
    session::export::{ExportFlags, ExportSession, ExportSessionState},
    state_machine::common::{StateMachineCtx, Transition},
    wire::{ReasonCode, report::ReportContent},
};

#[derive(Debug, Clone)]
pub enum SenderEvent {
    /// A checkpoint has been dequeued by the link service for transmission
    /// (spec.md §4.3 "Checkpoint timing": arm its resend timer).
    CheckpointDequeued { cp_sn: u64, responds_to_rpt_serial: u64 },
    /// The final segment of the block has left the outduct.
    EobDequeued,
    /// A report segment arrived from the receiver (spec.md §4.3
    /// "Report-segment (RS) handling").
    ReportReceived(ReportContent),
    /// A checkpoint's resend deadline fired (spec.md §4.3 "Resend
    /// checkpoint on timeout").
    CheckpointTimedOut { cp_sn: u64, max_timeouts: u32 },
    CancelRequested(ReasonCode),
    CancelAckReceived,
    CancelReceived(ReasonCode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SenderAction {
    None,
    ArmCheckpointTimer { cp_sn: u64 },
    DisarmCheckpointTimer { cp_sn: u64 },
    /// Retransmit the gap `[offset, offset+length)`, marking the last such
    /// segment of this cycle as a checkpoint with the given serial.
    RetransmitGap { offset: u64, length: u64, checkpoint_serial: Option<u64> },
    SendReportAck { rpt_serial: u64 },
    NotifyExportComplete,
    NotifyExportCanceled(ReasonCode),
    SendCancel(ReasonCode),
    SendCancelAck,
    ResendCheckpoint { cp_sn: u64 },
}

pub struct ExportSessionMachine<'a> {
    pub session: &'a mut ExportSession,
}

impl<'a> ExportSessionMachine<'a> {
    pub fn new(session: &'a mut ExportSession) -> Self {
        Self { session }
    }

    fn handle_report(&mut self, report: ReportContent) -> Vec<SenderAction> {
        let mut actions = Vec::new();

        if let Some(ckpt) = self.session.find_checkpoint_mut(report.ckpt_serial) {
            ckpt.acked = true;
            actions.push(SenderAction::DisarmCheckpointTimer { cp_sn: report.ckpt_serial });
        }

        for claim in &report.claims {
            self.session.merge_claim(report.lower_bound + claim.offset, claim.length);
        }

        if self.session.red_part_fully_acked() {
            if self.session.is_pure_red() {
                self.session.flags.insert(ExportFlags::EOB_SENT);
            }
            self.session.flags.insert(ExportFlags::FINAL_ACK);
            if self.session.maybe_complete_on_final_ack() {
                actions.push(SenderAction::NotifyExportComplete);
            }
        } else {
            // Gaps in [lower_bound, upper_bound) not covered by any claim
            // must be retransmitted (spec.md §4.3).
            let mut cursor = report.lower_bound;
            let mut gaps = Vec::new();
            for claim in &report.claims {
                let claim_start = report.lower_bound + claim.offset;
                if claim_start > cursor {
                    gaps.push((cursor, claim_start - cursor));
                }
                cursor = claim_start + claim.length;
            }
            if cursor < report.upper_bound {
                gaps.push((cursor, report.upper_bound - cursor));
            }
            let last_idx = gaps.len().saturating_sub(1);
            for (i, (offset, length)) in gaps.into_iter().enumerate() {
                let checkpoint_serial =
                    if i == last_idx { self.session.next_checkpoint_serial() } else { None };
                actions.push(SenderAction::RetransmitGap { offset, length, checkpoint_serial });
            }
        }

        actions.push(SenderAction::SendReportAck { rpt_serial: report.rpt_serial });
        actions
    }

    pub fn step_many(&mut self, event: SenderEvent) -> Vec<SenderAction> {
        match event {
            SenderEvent::CheckpointDequeued { cp_sn, responds_to_rpt_serial } => {
                self.session.checkpoints.push(crate::ltp::session::export::CheckpointRecord {
                    cp_sn,
                    responds_to_rpt_serial,
                    acked: false,
                    expiration_count: 0,
                });
                self.session.state = ExportSessionState::Active;
                vec![SenderAction::ArmCheckpointTimer { cp_sn }]
            },
            SenderEvent::EobDequeued => {
                self.session.flags.insert(ExportFlags::EOB_SENT);
                if self.session.maybe_complete_on_final_ack() {
                    vec![SenderAction::NotifyExportComplete]
                } else {
                    vec![SenderAction::None]
                }
            },
            SenderEvent::ReportReceived(report) => self.handle_report(report),
            SenderEvent::CheckpointTimedOut { cp_sn, max_timeouts } => {
                if let Some(ckpt) = self.session.find_checkpoint_mut(cp_sn) {
                    if ckpt.acked {
                        return vec![SenderAction::None];
                    }
                    ckpt.expiration_count += 1;
                    if ckpt.expiration_count >= max_timeouts {
                        self.session.state = ExportSessionState::Canceled;
                        self.session.reason_code = Some(ReasonCode::RetransmitLimitExceeded);
                        return vec![SenderAction::SendCancel(ReasonCode::RetransmitLimitExceeded)];
                    }
                    vec![SenderAction::ResendCheckpoint { cp_sn }]
                } else {
                    vec![SenderAction::None]
                }
            },
            SenderEvent::CancelRequested(reason) => {
                self.session.state = ExportSessionState::Canceled;
                self.session.reason_code = Some(reason);
                vec![SenderAction::SendCancel(reason)]
            },
            SenderEvent::CancelAckReceived => {
                self.session.state = ExportSessionState::Dead;
                vec![SenderAction::None]
            },
            SenderEvent::CancelReceived(reason) => {
                self.session.state = ExportSessionState::Dead;
                self.session.reason_code = Some(reason);
                vec![SenderAction::SendCancelAck, SenderAction::NotifyExportCanceled(reason)]
            },
        }
    }
}

impl<'a> StateMachineCtx for ExportSessionMachine<'a> {
    type State = ExportSessionState;
    type Event = SenderEvent;
    type Output = Vec<SenderAction>;

    fn state(&self) -> Self::State {
        self.session.state
    }

    fn step(&mut self, event: Self::Event) -> Transition<Self::State, Self::Output> {
        let actions = self.step_many(event);
        match self.session.state {
            ExportSessionState::Closed | ExportSessionState::Dead => Transition::Done(actions),
            state => Transition::Next(state, actions),
        }
    }
}
