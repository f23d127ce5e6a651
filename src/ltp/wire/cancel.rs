// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Cancel / cancel-ack segment content (spec.md §6.1): a single reason-code
//! byte, and an empty body respectively.

use thiserror::Error;

/// Reason a session was canceled (spec.md §6.1, non-exhaustive per spec but
/// this is the full enumerated set named there).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonCode {
    UserCancel,
    Unreachable,
    RetransmitLimitExceeded,
    MiscoloredSegment,
    SystemCancelled,
    CancelByEngine,
    ClientSvcUnreachable,
    InactivityDetected,
}

#[derive(Debug, Error)]
#[error("unknown LTP cancel reason code: {0}")]
pub struct UnknownReasonCode(pub u8);

impl ReasonCode {
    pub const fn code(self) -> u8 {
        match self {
            Self::UserCancel => 0,
            Self::Unreachable => 1,
            Self::RetransmitLimitExceeded => 2,
            Self::MiscoloredSegment => 3,
            Self::SystemCancelled => 4,
            Self::CancelByEngine => 5,
            Self::ClientSvcUnreachable => 6,
            Self::InactivityDetected => 7,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, UnknownReasonCode> {
        Ok(match code {
            0 => Self::UserCancel,
            1 => Self::Unreachable,
            2 => Self::RetransmitLimitExceeded,
            3 => Self::MiscoloredSegment,
            4 => Self::SystemCancelled,
            5 => Self::CancelByEngine,
            6 => Self::ClientSvcUnreachable,
            7 => Self::InactivityDetected,
            other => return Err(UnknownReasonCode(other)),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelContent {
    pub reason: ReasonCode,
}

impl CancelContent {
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.reason.code());
    }

    pub fn decode(buf: &[u8]) -> anyhow::Result<(Self, usize)> {
        anyhow::ensure!(!buf.is_empty(), "truncated cancel content: missing reason byte");
        let reason = ReasonCode::from_code(buf[0])?;
        Ok((Self { reason }, 1))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CancelAckContent;

impl CancelAckContent {
    pub fn encode(&self, _out: &mut Vec<u8>) {}

    pub fn decode(_buf: &[u8]) -> anyhow::Result<(Self, usize)> {
        Ok((Self, 0))
    }
}
