// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! LTP Protocol State Machine (spec.md §2, §4.3, §4.4): the sender and
//! receiver session transition logic, decoupled from segment I/O.

pub mod common;
pub mod receiver;
pub mod sender;

pub use common::{StateMachineCtx, Transition};
pub use receiver::{ImportSessionMachine, ReceiverAction, ReceiverEvent};
pub use sender::{ExportSessionMachine, SenderAction, SenderEvent};
