//! Data models for Claude Code usage monitoring

use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Raw event from a single JSONL line, as Claude Code writes it
#[derive(Debug, Clone, Deserialize)]
pub struct SessionEvent {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    #[serde(alias = "requestId")]
    pub request_id: Option<String>,
    pub timestamp: Option<String>,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub model: Option<String>,
    pub usage: Option<Usage>,
}

/// Token counts for one request; absent categories count as zero
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default, rename = "cache_creation_input_tokens")]
    pub cache_creation_tokens: u64,
    #[serde(default, rename = "cache_read_input_tokens")]
    pub cache_read_tokens: u64,
}

/// Processed usage record, deduplicated by request id and immutable once
/// ingested
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_tokens: u64,
    pub cache_read_tokens: u64,
    pub request_id: String,
}

impl UsageRecord {
    /// Total tokens across all four categories
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens + self.cache_creation_tokens + self.cache_read_tokens
    }
}

/// Burn rate metrics for the active block
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnRate {
    pub tokens_per_minute: f64,
    pub cost_per_hour: f64,
}

/// Linear extrapolation of the active block to its full five-hour window
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub total_tokens: u64,
    pub total_cost: f64,
    pub remaining_minutes: i64,
}

/// The currently open billing session.
///
/// A `Block` value only ever describes an active session; "no active block"
/// is `Option::<Block>::None`, never a block with zeroed fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// The contiguous record subsequence composing this session
    pub records: Vec<UsageRecord>,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub models: BTreeSet<String>,
    pub burn_rate: BurnRate,
    pub projection: Projection,
}

impl Block {
    /// Stable identity derived from the block's start hour; alert state is
    /// keyed on this so a new session re-arms the thresholds.
    pub fn id(&self) -> String {
        self.start_time.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// Result of one refresh cycle, published as a whole
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub active_block: Option<Block>,
    pub daily_cost: f64,
    pub weekly_cost: f64,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Day-to-date and week-to-date cost totals, recomputed every refresh
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeriodTotals {
    pub daily_cost: f64,
    pub weekly_cost: f64,
}
