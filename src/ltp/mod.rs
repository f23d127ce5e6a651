// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Licklider Transmission Protocol (spec.md §2-§6): reliable session
//! engine sitting under Contact Graph Routing. Submodules mirror spec.md's
//! own module boundaries (wire format, session tables, state machines,
//! timers, the engine tying them together, and the link-service seam).

pub mod engine;
pub mod link_service;
pub mod session;
pub mod state_machine;
pub mod timer;
pub mod wire;

pub use engine::{EngineEffect, LtpEngine};
pub use timer::TimerWheel;
