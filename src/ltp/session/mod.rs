// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! LTP Session Tables (spec.md §3, §4.3, §4.4): export/import session
//! records and the per-span tables holding them.

pub mod export;
pub mod import;
pub mod reports;
pub mod span;

pub use export::{ExportSession, ExportSessionState};
pub use import::{ImportSession, ImportSessionState};
pub use reports::get_max_reports;
pub use span::Span;
