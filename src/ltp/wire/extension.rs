// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Header/trailer extension blocks (spec.md §6.1, §9 "Dynamic-dispatch
//! extension blocks"): `{ byte tag, SDNV length, length bytes of value }`.
//! Security extension semantics are out of scope (spec.md §1 Non-goals);
//! unknown tags round-trip opaquely.

use crate::utils::{sdnv_decode, sdnv_encode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub tag: u8,
    pub value: Vec<u8>,
}

impl Extension {
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.tag);
        sdnv_encode(self.value.len() as u64, out);
        out.extend_from_slice(&self.value);
    }

    pub fn decode(buf: &[u8]) -> anyhow::Result<(Self, usize)> {
        anyhow::ensure!(!buf.is_empty(), "truncated extension: missing tag byte");
        let tag = buf[0];
        let (len, n) = sdnv_decode(&buf[1..])?;
        let mut offset = 1 + n;
        let len = len as usize;
        anyhow::ensure!(buf.len() >= offset + len, "truncated extension value");
        let value = buf[offset..offset + len].to_vec();
        offset += len;
        Ok((Self { tag, value }, offset))
    }
}
