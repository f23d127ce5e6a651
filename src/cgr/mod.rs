// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Contact Graph Routing (CGR): time-varying graph shortest-path resolver
//! (spec.md §4.1) plus the Overbooking Manager (spec.md §4.2).

pub mod cache;
pub mod overbooking;
pub mod planner;
pub mod route;
pub mod trace;

pub use cache::RouteCache;
pub use overbooking::OverbookingManager;
pub use planner::CgrPlanner;
pub use route::{ProximateNode, Route};
