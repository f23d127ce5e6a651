// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::{Context, Result};
use dtn_core_rs::{
    cfg::{cli::resolve_config_path, config::Config, logger::init_logger},
    cgr::{CgrPlanner, RouteCache},
    clock::ClockDriver,
    contact_plan::store::ContactPlanStore,
    ltp::{
        LtpEngine,
        link_service::{InboundFrame, LinkServiceInput, LinkServiceOutput, OutboundFrame},
    },
};
use tokio::sync::mpsc;
use tracing::info;

/// Boots one DTN node: loads its engine/span/runtime configuration, wires
/// up the contact plan store and CGR planner, spawns the clock driver and
/// one link-service output task per configured span, and runs until
/// interrupted. Wire transport itself stays out of scope (spec.md §1); the
/// inbound/outbound channels here stand in for whatever carries frames
/// to/from the network.
#[tokio::main]
async fn main() -> Result<()> {
    let _init_logger = init_logger("tests/config_logger.yaml")?;

    let cfg = resolve_config_path("config/node.yaml")
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;

    let cps = Arc::new(ContactPlanStore::new());
    let _planner = Arc::new(CgrPlanner::new(
        cfg.engine.local_node_number,
        cfg.runtime.max_speed_mph,
        cfg.engine.payload_class_floors,
        cps.clone(),
        Arc::new(RouteCache::new()),
    ));

    let engine = Arc::new(LtpEngine::new(cfg.engine.local_node_number, cfg.runtime.max_timeouts));

    let (in_tx, in_rx) = mpsc::channel::<InboundFrame>(1024);
    let lsi = LinkServiceInput::new(engine.clone(), in_rx);
    tokio::spawn(lsi.run());

    let mut lso_handles = Vec::new();
    for (&remote_engine_id, span_cfg) in &cfg.spans {
        let span = engine.open_span(remote_engine_id, span_cfg.clone());
        let (out_tx, mut out_rx) = mpsc::channel::<OutboundFrame>(1024);
        let lso = LinkServiceOutput::new(span, out_tx);
        lso_handles.push(tokio::spawn(lso.run()));
        // Stand-in transport: log outbound frames until a real link exists.
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                info!(dest_engine_id = frame.dest_engine_id, bytes = frame.bytes.len(), "outbound frame ready for transport");
            }
        });
    }
    info!(spans = cfg.spans.len(), "opened spans from configuration");

    let clock = ClockDriver::new(cfg.engine.tick_interval, engine.clone(), cps.clone());
    tokio::spawn(clock.run());

    // A real deployment would feed `in_tx` from the network transport;
    // holding it here for the rest of `main` keeps the LSI task alive
    // instead of exiting on channel close.
    let _in_tx = in_tx;

    for handle in lso_handles {
        handle.await.context("link-service output task panicked")?;
    }

    Ok(())
}
