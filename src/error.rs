// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Typed error surface for the routing and session layers (spec.md §7).
//!
//! Wire-level and transient errors are handled locally (dropped, tallied, or
//! turned into a session cancellation) and never bubble past the module that
//! detected them; this enum exists for the errors a *caller* must branch on.

use thiserror::Error;

use crate::ltp::wire::cancel::ReasonCode;

/// Errors surfaced across the CGR and LTP module boundaries.
#[derive(Debug, Error)]
pub enum DtnError {
    #[error("input validation failed: {0}")]
    InputValidation(String),

    #[error("session {session} is in an unexpected state: {detail}")]
    SessionState { session: u64, detail: String },

    #[error("capacity exhausted: {0}")]
    CapacityExhaustion(String),

    #[error("protocol violation on session {session}: {reason:?}")]
    ProtocolViolation { session: u64, reason: ReasonCode },

    #[error("timer expired past retransmission limit for session {session}")]
    TimerExpiration { session: u64 },

    #[error("transaction failed: {0}")]
    TransactionFailure(String),

    #[error("configuration error: {0}")]
    ConfigurationError(String),

    #[error("no route found to terminus {terminus}")]
    NoRouteFound { terminus: u64 },

    #[error("terminus {0} is not reachable from any contact")]
    UnknownTerminus(u64),

    #[error("internal CGR error: {0}")]
    InternalError(String),
}

pub type DtnResult<T> = Result<T, DtnError>;
