// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Report segment content (spec.md §6.1): a reception-claim list bounded
//! by [lower_bound, upper_bound), claim offsets relative to lower_bound.

use crate::utils::{sdnv_decode, sdnv_encode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    /// Offset relative to the report's `lower_bound`.
    pub offset: u64,
    pub length: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportContent {
    pub rpt_serial: u64,
    pub ckpt_serial: u64,
    pub upper_bound: u64,
    pub lower_bound: u64,
    pub claims: Vec<Claim>,
}

impl ReportContent {
    pub fn encode(&self, out: &mut Vec<u8>) {
        sdnv_encode(self.rpt_serial, out);
        sdnv_encode(self.ckpt_serial, out);
        sdnv_encode(self.upper_bound, out);
        sdnv_encode(self.lower_bound, out);
        sdnv_encode(self.claims.len() as u64, out);
        for claim in &self.claims {
            sdnv_encode(claim.offset, out);
            sdnv_encode(claim.length, out);
        }
    }

    pub fn decode(buf: &[u8]) -> anyhow::Result<(Self, usize)> {
        let mut offset = 0;
        let (rpt_serial, n) = sdnv_decode(&buf[offset..])?;
        offset += n;
        let (ckpt_serial, n) = sdnv_decode(&buf[offset..])?;
        offset += n;
        let (upper_bound, n) = sdnv_decode(&buf[offset..])?;
        offset += n;
        let (lower_bound, n) = sdnv_decode(&buf[offset..])?;
        offset += n;
        let (claim_count, n) = sdnv_decode(&buf[offset..])?;
        offset += n;

        let mut claims = Vec::with_capacity(claim_count as usize);
        for _ in 0..claim_count {
            let (claim_offset, n) = sdnv_decode(&buf[offset..])?;
            offset += n;
            let (claim_length, n) = sdnv_decode(&buf[offset..])?;
            offset += n;
            claims.push(Claim { offset: claim_offset, length: claim_length });
        }

        Ok((Self { rpt_serial, ckpt_serial, upper_bound, lower_bound, claims }, offset))
    }
}
