// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Miscolored segment (spec.md §8, scenario S5): a red segment ending at
//! offset 600 followed by a green segment starting at offset 400 violates
//! the red/green color ordering invariant. The receiver cancels the import
//! session with `MiscoloredSegment` and sends a cancel-by-receiver; the
//! sender replies with a cancel-ack of its own and surfaces the
//! cancellation upward.

use bytes::Bytes;
use dtn_core_rs::ltp::{
    EngineEffect, LtpEngine,
    wire::{DataSegmentContent, ReasonCode, Segment, SegmentBody, SegmentHeader, SegmentTypeCode},
};

#[path = "common.rs"]
mod common;

const SENDER_ID: u64 = 1;
const RECEIVER_ID: u64 = 2;

#[test]
fn green_after_red_triggers_cancel_by_receiver() {
    let sender = LtpEngine::new(SENDER_ID, 5);
    sender.open_span(RECEIVER_ID, common::span_config());
    let session_nbr = sender.start_export_session(RECEIVER_ID, 1000, 600).unwrap();

    let receiver = LtpEngine::new(RECEIVER_ID, 5);
    receiver.open_span(SENDER_ID, common::span_config());

    let red_segment = Segment {
        header: SegmentHeader::new(SegmentTypeCode::RedDataNotCheckpoint, SENDER_ID, session_nbr),
        body: SegmentBody::Data(DataSegmentContent {
            client_service_id: 0,
            offset: 0,
            length: 600,
            checkpoint: None,
            data: Bytes::from(vec![0u8; 600]),
        }),
    };
    let effects = receiver.on_segment_received(SENDER_ID, &red_segment.encode(), 1000).unwrap();
    assert!(effects.is_empty(), "a non-checkpoint red segment produces no immediate effects");

    let green_segment = Segment {
        header: SegmentHeader::new(SegmentTypeCode::GreenDataNotEob, SENDER_ID, session_nbr),
        body: SegmentBody::Data(DataSegmentContent {
            client_service_id: 0,
            offset: 400,
            length: 200,
            checkpoint: None,
            data: Bytes::from(vec![0u8; 200]),
        }),
    };
    let effects = receiver.on_segment_received(SENDER_ID, &green_segment.encode(), 1001).unwrap();

    let cancel_segment = match effects.iter().find(|e| matches!(e, EngineEffect::SendSegment { .. })) {
        Some(EngineEffect::SendSegment { segment, .. }) => segment.clone(),
        _ => panic!("expected a cancel segment to be sent"),
    };
    match cancel_segment.body {
        SegmentBody::Cancel(content) => assert_eq!(content.reason, ReasonCode::MiscoloredSegment),
        other => panic!("expected a cancel segment, got {other:?}"),
    }
    assert_eq!(cancel_segment.header.type_code, SegmentTypeCode::CancelByReceiver);

    // Sender receives the cancel-by-receiver: replies with a cancel-ack and
    // notifies the application that the export was canceled.
    let sender_effects = sender.on_segment_received(RECEIVER_ID, &cancel_segment.encode(), 1002).unwrap();
    assert!(sender_effects.iter().any(|e| matches!(
        e,
        EngineEffect::ExportCanceled { session_nbr: n, reason: ReasonCode::MiscoloredSegment } if *n == session_nbr
    )));
    let cancel_ack = match sender_effects.iter().find(|e| matches!(e, EngineEffect::SendSegment { .. })) {
        Some(EngineEffect::SendSegment { segment, .. }) => segment.clone(),
        _ => panic!("expected a cancel-ack segment to be sent"),
    };
    assert!(matches!(cancel_ack.body, SegmentBody::CancelAck(_)));
    assert_eq!(cancel_ack.header.type_code, SegmentTypeCode::CancelAckFromSender);
}
