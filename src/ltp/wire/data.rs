// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Data segment content (spec.md §6.1): client service id, offset, length,
//! optional checkpoint fields, then the raw client data.

use bytes::Bytes;

use crate::utils::{sdnv_decode, sdnv_encode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointInfo {
    pub ckpt_serial: u64,
    /// The report serial this checkpoint responds to; 0 for an initial
    /// (non-retransmission) transmission (spec.md §4.3).
    pub rpt_serial: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSegmentContent {
    pub client_service_id: u64,
    pub offset: u64,
    pub length: u64,
    pub checkpoint: Option<CheckpointInfo>,
    pub data: Bytes,
}

impl DataSegmentContent {
    pub fn encode(&self, out: &mut Vec<u8>) {
        sdnv_encode(self.client_service_id, out);
        sdnv_encode(self.offset, out);
        sdnv_encode(self.length, out);
        if let Some(ckpt) = self.checkpoint {
            sdnv_encode(ckpt.ckpt_serial, out);
            sdnv_encode(ckpt.rpt_serial, out);
        }
        out.extend_from_slice(&self.data);
    }

    pub fn decode(buf: &[u8], is_checkpoint: bool) -> anyhow::Result<(Self, usize)> {
        let mut offset = 0;
        let (client_service_id, n) = sdnv_decode(&buf[offset..])?;
        offset += n;
        let (seg_offset, n) = sdnv_decode(&buf[offset..])?;
        offset += n;
        let (length, n) = sdnv_decode(&buf[offset..])?;
        offset += n;

        let checkpoint = if is_checkpoint {
            let (ckpt_serial, n) = sdnv_decode(&buf[offset..])?;
            offset += n;
            let (rpt_serial, n) = sdnv_decode(&buf[offset..])?;
            offset += n;
            Some(CheckpointInfo { ckpt_serial, rpt_serial })
        } else {
            None
        };

        let data_len = length as usize;
        anyhow::ensure!(buf.len() >= offset + data_len, "data segment content length mismatch");
        let data = Bytes::copy_from_slice(&buf[offset..offset + data_len]);
        offset += data_len;

        Ok((Self { client_service_id, offset: seg_offset, length, checkpoint, data }, offset))
    }
}
