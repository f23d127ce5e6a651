// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Segment header: byte 0 (version + type code), source engine id, session
//! number, header/trailer extensions (spec.md §6.1).

use thiserror::Error;

use crate::{
    ltp::wire::extension::Extension,
    utils::{sdnv_decode, sdnv_encode},
};

/// The 4-bit segment type code occupying the low nibble of byte 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentTypeCode {
    RedDataNotCheckpoint,
    RedDataCheckpointNotEorp,
    RedDataCheckpointEorpNotEob,
    RedDataCheckpointEorpEob,
    GreenDataNotEob,
    GreenDataEob,
    Report,
    ReportAck,
    CancelBySender,
    CancelAckFromReceiver,
    CancelByReceiver,
    CancelAckFromSender,
}

/// Raised when byte 0's low nibble does not correspond to any known
/// segment type.
#[derive(Debug, Error)]
#[error("unknown LTP segment type code: {0}")]
pub struct UnknownSegmentType(pub u8);

impl SegmentTypeCode {
    pub const fn code(self) -> u8 {
        match self {
            Self::RedDataNotCheckpoint => 0,
            Self::RedDataCheckpointNotEorp => 1,
            Self::RedDataCheckpointEorpNotEob => 2,
            Self::RedDataCheckpointEorpEob => 3,
            Self::GreenDataNotEob => 4,
            Self::GreenDataEob => 7,
            Self::Report => 8,
            Self::ReportAck => 9,
            Self::CancelBySender => 12,
            Self::CancelAckFromReceiver => 13,
            Self::CancelByReceiver => 14,
            Self::CancelAckFromSender => 15,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, UnknownSegmentType> {
        Ok(match code {
            0 => Self::RedDataNotCheckpoint,
            1 => Self::RedDataCheckpointNotEorp,
            2 => Self::RedDataCheckpointEorpNotEob,
            3 => Self::RedDataCheckpointEorpEob,
            4 => Self::GreenDataNotEob,
            7 => Self::GreenDataEob,
            8 => Self::Report,
            9 => Self::ReportAck,
            12 => Self::CancelBySender,
            13 => Self::CancelAckFromReceiver,
            14 => Self::CancelByReceiver,
            15 => Self::CancelAckFromSender,
            other => return Err(UnknownSegmentType(other)),
        })
    }

    pub const fn is_red_data(self) -> bool {
        matches!(
            self,
            Self::RedDataNotCheckpoint
                | Self::RedDataCheckpointNotEorp
                | Self::RedDataCheckpointEorpNotEob
                | Self::RedDataCheckpointEorpEob
        )
    }

    pub const fn is_green_data(self) -> bool {
        matches!(self, Self::GreenDataNotEob | Self::GreenDataEob)
    }

    pub const fn is_checkpoint(self) -> bool {
        matches!(
            self,
            Self::RedDataCheckpointNotEorp
                | Self::RedDataCheckpointEorpNotEob
                | Self::RedDataCheckpointEorpEob
        )
    }

    pub const fn is_eorp(self) -> bool {
        matches!(self, Self::RedDataCheckpointEorpNotEob | Self::RedDataCheckpointEorpEob)
    }

    pub const fn is_eob(self) -> bool {
        matches!(self, Self::RedDataCheckpointEorpEob | Self::GreenDataEob)
    }

    pub const fn is_control(self) -> bool {
        !self.is_red_data() && !self.is_green_data()
    }
}

/// Header common to every segment (spec.md §6.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentHeader {
    pub version: u8,
    pub type_code: SegmentTypeCode,
    pub source_engine_id: u64,
    pub session_number: u64,
    pub header_extensions: Vec<Extension>,
    pub trailer_extensions: Vec<Extension>,
}

impl SegmentHeader {
    pub fn new(type_code: SegmentTypeCode, source_engine_id: u64, session_number: u64) -> Self {
        Self {
            version: 0,
            type_code,
            source_engine_id,
            session_number,
            header_extensions: Vec::new(),
            trailer_extensions: Vec::new(),
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        let byte0 = (self.version << 4) | self.type_code.code();
        out.push(byte0);
        sdnv_encode(self.source_engine_id, out);
        sdnv_encode(self.session_number, out);
        let counts = ((self.header_extensions.len() as u8) << 4) | (self.trailer_extensions.len() as u8 & 0x0F);
        out.push(counts);
        for ext in &self.header_extensions {
            ext.encode(out);
        }
    }

    pub fn encode_trailer(&self, out: &mut Vec<u8>) {
        for ext in &self.trailer_extensions {
            ext.encode(out);
        }
    }

    /// Decodes the header fields up to and including header extensions.
    /// Returns the header and the number of bytes consumed.
    pub fn decode(buf: &[u8]) -> anyhow::Result<(Self, usize)> {
        anyhow::ensure!(!buf.is_empty(), "empty segment buffer");
        let byte0 = buf[0];
        let version = byte0 >> 4;
        let type_code = SegmentTypeCode::from_code(byte0 & 0x0F)?;
        let mut offset = 1;

        let (source_engine_id, n) = sdnv_decode(&buf[offset..])?;
        offset += n;
        let (session_number, n) = sdnv_decode(&buf[offset..])?;
        offset += n;
        anyhow::ensure!(session_number != 0, "session number 0 is invalid, segment must be dropped");

        anyhow::ensure!(offset < buf.len(), "truncated segment: missing extension-count byte");
        let counts = buf[offset];
        offset += 1;
        let header_ext_count = counts >> 4;
        let trailer_ext_count = counts & 0x0F;

        let mut header_extensions = Vec::with_capacity(header_ext_count as usize);
        for _ in 0..header_ext_count {
            let (ext, n) = Extension::decode(&buf[offset..])?;
            offset += n;
            header_extensions.push(ext);
        }

        Ok((
            Self {
                version,
                type_code,
                source_engine_id,
                session_number,
                header_extensions,
                trailer_extensions: Vec::with_capacity(trailer_ext_count as usize),
            },
            offset,
        ))
    }
}
