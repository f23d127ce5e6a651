// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::cfg::enums::YesNo;

/// Top-level engine configuration: local identity, per-span remote-engine
/// settings, and runtime constants that do not travel on the wire.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// This engine's own identity and contact-plan source.
    pub engine: EngineConfig,
    /// Per-remote-engine session limits and timing, keyed by engine id.
    #[serde(default)]
    pub spans: HashMap<u64, SpanConfig>,
    /// Implementation/runtime parameters that live outside the LTP protocol.
    pub runtime: RuntimeConfig,
}

/// Local-node identity and contact-plan ingestion settings.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EngineConfig {
    #[serde(rename = "LocalNodeNumber")]
    /// This engine's own node number.
    pub local_node_number: u64,

    #[serde(rename = "ContactPlanSource")]
    /// Path to the append-only admin-event timeline file (see
    /// `contact_plan::timeline`).
    pub contact_plan_source: String,

    #[serde(rename = "TickIntervalMs", with = "serde_millis")]
    /// Interval of the 1 Hz-nominal clock driver tick.
    pub tick_interval: Duration,

    #[serde(rename = "PayloadClassFloors")]
    /// Capacity floor in bytes per payload class, indexed
    /// [small, medium, large].
    pub payload_class_floors: [u64; 3],
}

/// Per-span (per remote engine) configuration, spec.md §6.4.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SpanConfig {
    #[serde(rename = "MaxExportSessions")]
    /// Concurrent active export sessions; senders block beyond it.
    pub max_export_sessions: u32,

    #[serde(rename = "MaxImportSessions")]
    /// Concurrent active import sessions; oldest is canceled when exceeded.
    pub max_import_sessions: u32,

    #[serde(rename = "MaxSegmentSize")]
    /// Upper bound on wire segment length.
    pub max_segment_size: u32,

    #[serde(rename = "AggrSizeLimit")]
    /// Bytes buffered before the current block is closed for segmentation.
    pub aggr_size_limit: u64,

    #[serde(rename = "AggrTimeLimit", with = "serde_millis")]
    /// Time buffered before the current block is closed for segmentation.
    pub aggr_time_limit: Duration,

    #[serde(rename = "OwnQtime", with = "serde_millis")]
    /// Half-duplex telecom turnaround time on the local end.
    pub own_qtime: Duration,

    #[serde(rename = "RemoteQtime", with = "serde_millis")]
    /// Half-duplex telecom turnaround time on the remote end.
    pub remote_qtime: Duration,

    #[serde(rename = "ErrorsPerByte")]
    /// Feeds `getMaxReports`.
    pub errors_per_byte: f64,

    #[serde(rename = "EnforceSchedule")]
    /// Silently drop segments received while no contact is scheduled.
    pub enforce_schedule: YesNo,

    #[serde(rename = "MaxAcqInHeap")]
    /// Threshold for spilling inbound red content to a block file.
    pub max_acq_in_heap: u64,

    #[serde(rename = "Purge")]
    /// On contact end, cancel in-flight exports to enable re-forwarding.
    pub purge: YesNo,
}

/// Runtime-only settings that do not map to per-span keys.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RuntimeConfig {
    #[serde(rename = "EstimatedMaxExportSessions")]
    /// Sizes the export-session hash table.
    pub estimated_max_export_sessions: u32,

    #[serde(rename = "MaxTimeouts")]
    /// Retransmission ladder length before a timer escalates to cancellation.
    pub max_timeouts: u32,

    #[serde(rename = "MaxSpeedMph")]
    /// Receiver-motion-margin constant for CGR OWLT relaxation (spec.md
    /// §4.1, Open Question #2 — kept planner-wide, not per-span).
    pub max_speed_mph: f64,

    #[serde(rename = "BlockFileDir")]
    /// Directory for spilled import-session block files
    /// (`ltpblock.<engine>.<session>`).
    pub block_file_dir: String,
}

#[cfg(test)]
impl SpanConfig {
    /// A minimally valid `SpanConfig` for unit tests outside this module
    /// that need a `Span` but aren't exercising config parsing itself.
    pub fn default_for_test() -> Self {
        Self {
            max_export_sessions: 10,
            max_import_sessions: 10,
            max_segment_size: 1400,
            aggr_size_limit: 65536,
            aggr_time_limit: Duration::from_secs(1),
            own_qtime: Duration::from_secs(1),
            remote_qtime: Duration::from_secs(1),
            errors_per_byte: 0.0000001,
            enforce_schedule: YesNo::No,
            max_acq_in_heap: 1_048_576,
            purge: YesNo::No,
        }
    }
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: Config =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants and normalizes derived fields.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(
            self.engine.local_node_number > 0,
            "LocalNodeNumber must be > 0"
        );
        ensure!(
            !self.engine.tick_interval.is_zero(),
            "TickIntervalMs must be > 0"
        );
        for floor in self.engine.payload_class_floors {
            ensure!(floor > 0, "PayloadClassFloors entries must be > 0");
        }

        ensure!(
            self.runtime.max_timeouts >= 1,
            "MaxTimeouts must be >= 1"
        );
        ensure!(
            self.runtime.estimated_max_export_sessions >= 1,
            "EstimatedMaxExportSessions must be >= 1"
        );
        ensure!(
            self.runtime.max_speed_mph >= 0.0,
            "MaxSpeedMph must be >= 0"
        );

        for (engine_id, span) in &self.spans {
            ensure!(
                span.max_export_sessions >= 1,
                "span {engine_id}: MaxExportSessions must be >= 1"
            );
            ensure!(
                span.max_import_sessions >= 1,
                "span {engine_id}: MaxImportSessions must be >= 1"
            );
            ensure!(
                span.max_segment_size >= 1,
                "span {engine_id}: MaxSegmentSize must be >= 1"
            );
            ensure!(
                span.errors_per_byte >= 0.0,
                "span {engine_id}: ErrorsPerByte must be >= 0"
            );
        }

        Ok(())
    }
}

/// Serde helper for representing `Duration` as a number of milliseconds.
mod serde_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(d)?;
        Ok(Duration::from_millis(ms))
    }
}
