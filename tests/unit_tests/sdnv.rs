// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! SDNV encoding against the crate's public API (spec.md §6.1), exercised
//! here as an external consumer rather than via the internal `#[cfg(test)]`
//! module in `utils.rs`.

use dtn_core_rs::utils::{sdnv_decode, sdnv_encode};

#[test]
fn multi_byte_values_set_the_continuation_bit_on_every_byte_but_the_last() {
    let mut buf = Vec::new();
    sdnv_encode(16384, &mut buf);
    assert!(buf.len() > 1);
    for byte in &buf[..buf.len() - 1] {
        assert_eq!(byte & 0x80, 0x80);
    }
    assert_eq!(buf[buf.len() - 1] & 0x80, 0);
}

#[test]
fn decode_is_the_left_inverse_of_encode_across_a_range_of_magnitudes() {
    for v in [0u64, 1, 127, 128, 300, u32::MAX as u64, u64::MAX] {
        let mut buf = Vec::new();
        sdnv_encode(v, &mut buf);
        let (decoded, consumed) = sdnv_decode(&buf).expect("well-formed SDNV must decode");
        assert_eq!(decoded, v);
        assert_eq!(consumed, buf.len());
    }
}

#[test]
fn empty_buffer_is_rejected() {
    assert!(sdnv_decode(&[]).is_err());
}
