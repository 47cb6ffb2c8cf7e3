//! Machine-readable status artifact written after every refresh

use std::fs;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use serde::Serialize;

use crate::usage::config::Settings;
use crate::usage::models::Snapshot;

/// Error type for status file operations
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON encode error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level status document
#[derive(Debug, Clone, Serialize)]
pub struct StatusFile {
    pub daily: DailyStatus,
    pub weekly: WeeklyStatus,
    pub updated: String,
    pub block: BlockStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyStatus {
    pub cost: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyStatus {
    pub cost: f64,
    pub limit: f64,
    pub pct: f64,
}

/// Only an active block carries metrics; the inactive shape is just the
/// flag, so consumers cannot mistake zeroed fields for data.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BlockStatus {
    Active {
        active: bool,
        cost: f64,
        limit: f64,
        pct: f64,
        remaining_min: i64,
        burn_rate: f64,
    },
    Inactive {
        active: bool,
    },
}

/// Round currency to cents
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round percentage points to one decimal
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Percentage points of `cost` against `limit`
fn pct(cost: f64, limit: f64) -> f64 {
    if limit <= 0.0 {
        0.0
    } else {
        round1(cost / limit * 100.0)
    }
}

/// Render a snapshot into the published status document
pub fn render_status(snapshot: &Snapshot, settings: &Settings, now: DateTime<Utc>) -> StatusFile {
    let block = match &snapshot.active_block {
        Some(block) => BlockStatus::Active {
            active: true,
            cost: round2(block.total_cost),
            limit: round2(settings.block_limit_usd),
            pct: pct(block.total_cost, settings.block_limit_usd),
            remaining_min: block.projection.remaining_minutes,
            burn_rate: round2(block.burn_rate.cost_per_hour),
        },
        None => BlockStatus::Inactive { active: false },
    };

    StatusFile {
        daily: DailyStatus {
            cost: round2(snapshot.daily_cost),
        },
        weekly: WeeklyStatus {
            cost: round2(snapshot.weekly_cost),
            limit: round2(settings.weekly_limit_usd),
            pct: pct(snapshot.weekly_cost, settings.weekly_limit_usd),
        },
        updated: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        block,
    }
}

/// Write the status file with replace-on-write semantics so external
/// readers never observe a partially written document
pub fn write_status(path: &Path, status: &StatusFile) -> Result<(), StatusError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(status)?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, json)?;
    fs::rename(&tmp_path, path)?;

    debug!("status written to {:?}", path);
    Ok(())
}
