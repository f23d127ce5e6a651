// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Report-ack segment content (spec.md §6.1): a single SDNV report serial.

use crate::utils::{sdnv_decode, sdnv_encode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportAckContent {
    pub rpt_serial: u64,
}

impl ReportAckContent {
    pub fn encode(&self, out: &mut Vec<u8>) {
        sdnv_encode(self.rpt_serial, out);
    }

    pub fn decode(buf: &[u8]) -> anyhow::Result<(Self, usize)> {
        let (rpt_serial, n) = sdnv_decode(buf)?;
        Ok((Self { rpt_serial }, n))
    }
}
