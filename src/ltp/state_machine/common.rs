// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The sender/receiver state-machine trio. `Transition`/`StateMachineCtx`
//! mirror the teacher's state-machine module shape, adapted to synchronous,
//! event-driven session stepping rather than async PDU exchange: an LTP
//! session advances on segment arrival or timer firing, never by awaiting
//! I/O itself (that happens at the Link Service Bridge boundary instead).

/// Outcome of one state-machine step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition<S, R> {
    /// Move to a new state, producing an output.
    Next(S, R),
    /// Remain in the current state, producing an output.
    Stay(R),
    /// Terminal: the session is finished and should be removed from its
    /// table.
    Done(R),
}

impl<S, R> Transition<S, R> {
    pub fn output(self) -> R {
        match self {
            Transition::Next(_, r) => r,
            Transition::Stay(r) => r,
            Transition::Done(r) => r,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Transition::Done(_))
    }
}

/// A context that advances session state in response to one `Event`,
/// yielding one `Output` describing what the caller (engine/link-service
/// bridge) must now do.
pub trait StateMachineCtx {
    type State;
    type Event;
    type Output;

    fn state(&self) -> Self::State;

    fn step(&mut self, event: Self::Event) -> Transition<Self::State, Self::Output>;
}
