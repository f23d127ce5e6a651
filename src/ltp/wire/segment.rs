// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Top-level segment dispatch: pairs a `SegmentHeader` with its typed
//! content and picks the right content codec from the header's type code,
//! mirroring the BHS/content split the teacher uses for PDUs.

use enum_dispatch::enum_dispatch;

use crate::ltp::wire::{
    cancel::{CancelAckContent, CancelContent},
    data::DataSegmentContent,
    header::{SegmentHeader, SegmentTypeCode},
    report::ReportContent,
    report_ack::ReportAckContent,
};

/// Common surface every segment content type offers, so `Segment::encode`
/// doesn't need to match on the variant twice.
#[enum_dispatch]
pub trait SegmentContent {
    fn encode_content(&self, out: &mut Vec<u8>);
}

impl SegmentContent for DataSegmentContent {
    fn encode_content(&self, out: &mut Vec<u8>) {
        self.encode(out);
    }
}

impl SegmentContent for ReportContent {
    fn encode_content(&self, out: &mut Vec<u8>) {
        self.encode(out);
    }
}

impl SegmentContent for ReportAckContent {
    fn encode_content(&self, out: &mut Vec<u8>) {
        self.encode(out);
    }
}

impl SegmentContent for CancelContent {
    fn encode_content(&self, out: &mut Vec<u8>) {
        self.encode(out);
    }
}

impl SegmentContent for CancelAckContent {
    fn encode_content(&self, out: &mut Vec<u8>) {
        self.encode(out);
    }
}

#[enum_dispatch(SegmentContent)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentBody {
    Data(DataSegmentContent),
    Report(ReportContent),
    ReportAck(ReportAckContent),
    Cancel(CancelContent),
    CancelAck(CancelAckContent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub header: SegmentHeader,
    pub body: SegmentBody,
}

impl Segment {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.header.encode(&mut out);
        self.body.encode_content(&mut out);
        self.header.encode_trailer(&mut out);
        out
    }

    pub fn decode(buf: &[u8]) -> anyhow::Result<Self> {
        let (header, consumed) = SegmentHeader::decode(buf)?;
        let rest = &buf[consumed..];
        let body = match header.type_code {
            SegmentTypeCode::RedDataNotCheckpoint | SegmentTypeCode::GreenDataNotEob | SegmentTypeCode::GreenDataEob => {
                let (content, _) = DataSegmentContent::decode(rest, false)?;
                SegmentBody::Data(content)
            },
            SegmentTypeCode::RedDataCheckpointNotEorp
            | SegmentTypeCode::RedDataCheckpointEorpNotEob
            | SegmentTypeCode::RedDataCheckpointEorpEob => {
                let (content, _) = DataSegmentContent::decode(rest, true)?;
                SegmentBody::Data(content)
            },
            SegmentTypeCode::Report => {
                let (content, _) = ReportContent::decode(rest)?;
                SegmentBody::Report(content)
            },
            SegmentTypeCode::ReportAck => {
                let (content, _) = ReportAckContent::decode(rest)?;
                SegmentBody::ReportAck(content)
            },
            SegmentTypeCode::CancelBySender | SegmentTypeCode::CancelByReceiver => {
                let (content, _) = CancelContent::decode(rest)?;
                SegmentBody::Cancel(content)
            },
            SegmentTypeCode::CancelAckFromReceiver | SegmentTypeCode::CancelAckFromSender => {
                let (content, _) = CancelAckContent::decode(rest)?;
                SegmentBody::CancelAck(content)
            },
        };
        Ok(Self { header, body })
    }
}
