// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Red retransmission (spec.md §8, scenario S2): the initial checkpoint
//! only delivers the back half of the red part (the front half having been
//! lost), the receiver's partial report claims only what arrived, the
//! sender retransmits the missing front half as a new checkpoint, the
//! receiver's final report claims the full red part, and both sessions
//! close on the resulting report-ack round trip.
//!
//! Two engines stand in for the two ends of the span: `sender` holds the
//! export session, `receiver` holds the import session. Segments are
//! shuttled between them by hand, standing in for the link-service bridge
//! (wire transport itself is out of scope).

use bytes::Bytes;
use dtn_core_rs::ltp::{
    EngineEffect, LtpEngine,
    wire::{Segment, SegmentBody, SegmentHeader, SegmentTypeCode, data::CheckpointInfo, DataSegmentContent},
};

#[path = "common.rs"]
mod common;

const SENDER_ID: u64 = 1;
const RECEIVER_ID: u64 = 2;

fn find_effect<'a>(effects: &'a [EngineEffect], f: impl Fn(&EngineEffect) -> bool) -> &'a EngineEffect {
    effects.iter().find(|e| f(e)).expect("expected effect not found")
}

#[test]
fn retransmitted_gap_completes_the_red_part_and_closes_both_sessions() {
    let sender = LtpEngine::new(SENDER_ID, 5);
    sender.open_span(RECEIVER_ID, common::span_config());
    let receiver = LtpEngine::new(RECEIVER_ID, 5);
    receiver.open_span(SENDER_ID, common::span_config());

    let session_nbr = sender.start_export_session(RECEIVER_ID, 1000, 1000).unwrap();

    // Only [500, 1000) arrives first — [0, 500) was lost in transit. It
    // carries EORP+EOB since it's (as far as the receiver knows) the tail
    // of the block, and is a checkpoint.
    let first_segment = Segment {
        header: SegmentHeader::new(SegmentTypeCode::RedDataCheckpointEorpEob, SENDER_ID, session_nbr),
        body: SegmentBody::Data(DataSegmentContent {
            client_service_id: 0,
            offset: 500,
            length: 500,
            checkpoint: Some(CheckpointInfo { ckpt_serial: 1, rpt_serial: 0 }),
            data: Bytes::from(vec![0xAA; 500]),
        }),
    };
    let recv_effects_1 = receiver.on_segment_received(SENDER_ID, &first_segment.encode(), 1000).unwrap();
    let partial_report = match find_effect(&recv_effects_1, |e| matches!(e, EngineEffect::SendSegment { .. })) {
        EngineEffect::SendSegment { segment, .. } => segment.clone(),
        _ => unreachable!(),
    };
    let SegmentBody::Report(report) = partial_report.body.clone() else { panic!("expected a report segment") };
    assert_eq!(report.claims, vec![dtn_core_rs::ltp::wire::Claim { offset: 500, length: 500 }]);

    // Sender sees the partial report: asks for a retransmit of [0, 500).
    let send_effects_1 = sender.on_segment_received(RECEIVER_ID, &partial_report.encode(), 1001).unwrap();
    assert!(
        !send_effects_1.iter().any(|e| matches!(e, EngineEffect::ExportComplete { .. })),
        "session must not complete on a partial report"
    );

    // Sender (via its link service, modeled here by hand) retransmits
    // [0, 500) as a fresh checkpoint, not EORP/EOB since the tail was
    // already established.
    let retransmit_segment = Segment {
        header: SegmentHeader::new(SegmentTypeCode::RedDataCheckpointNotEorp, SENDER_ID, session_nbr),
        body: SegmentBody::Data(DataSegmentContent {
            client_service_id: 0,
            offset: 0,
            length: 500,
            checkpoint: Some(CheckpointInfo { ckpt_serial: 2, rpt_serial: report.rpt_serial }),
            data: Bytes::from(vec![0xBB; 500]),
        }),
    };
    let recv_effects_2 = receiver.on_segment_received(SENDER_ID, &retransmit_segment.encode(), 1002).unwrap();
    assert!(
        recv_effects_2
            .iter()
            .any(|e| matches!(e, EngineEffect::RedPartDelivered { end_of_block: true, .. })),
        "red part should now be fully assembled"
    );
    let final_report = match find_effect(&recv_effects_2, |e| matches!(e, EngineEffect::SendSegment { .. })) {
        EngineEffect::SendSegment { segment, .. } => segment.clone(),
        _ => unreachable!(),
    };
    let SegmentBody::Report(final_report_content) = final_report.body.clone() else { panic!("expected a report segment") };
    assert_eq!(final_report_content.claims, vec![dtn_core_rs::ltp::wire::Claim { offset: 0, length: 1000 }]);

    // Sender acks the full-coverage report: export completes, and a report
    // ack (RAS) is sent back.
    let send_effects_2 = sender.on_segment_received(RECEIVER_ID, &final_report.encode(), 1003).unwrap();
    assert!(send_effects_2.iter().any(|e| matches!(e, EngineEffect::ExportComplete { session_nbr: n } if *n == session_nbr)));
    let report_ack = match find_effect(&send_effects_2, |e| matches!(e, EngineEffect::SendSegment { .. })) {
        EngineEffect::SendSegment { segment, .. } => segment.clone(),
        _ => unreachable!(),
    };
    assert!(matches!(report_ack.body, SegmentBody::ReportAck(_)));

    // Receiver sees the report ack: import session closes.
    let recv_span = receiver.span(SENDER_ID).unwrap();
    assert!(!recv_span.closed_imports.contains(session_nbr));
    receiver.on_segment_received(SENDER_ID, &report_ack.encode(), 1004).unwrap();
    assert!(recv_span.closed_imports.contains(session_nbr));
    assert!(!recv_span.import_sessions.contains_key(&session_nbr));
}
