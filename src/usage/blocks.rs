//! Billing block segmentation and projection
//!
//! Groups the record stream into five-hour sessions separated by inactivity
//! gaps and computes burn rate plus a linear projection for the open one.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Timelike, Utc};

use crate::usage::models::{Block, BurnRate, Projection, UsageRecord};
use crate::usage::pricing::PricingCalculator;

/// Fixed block duration in minutes (5 hours)
pub const BLOCK_DURATION_MINUTES: i64 = 300;

/// Inactivity gap that separates two sessions, same length as the block
const GAP_THRESHOLD_MINUTES: i64 = BLOCK_DURATION_MINUTES;

/// Find the currently open block, if any.
///
/// `records` must be ascending by timestamp. Consecutive records more than
/// five hours apart belong to different sessions; a gap of exactly five
/// hours does not split. Only the trailing session can be open: it must
/// have activity within the gap threshold and `now` must fall before its
/// end time. Everything else yields `None`.
pub fn find_active_block(
    records: &[UsageRecord],
    pricing: &PricingCalculator,
    now: DateTime<Utc>,
) -> Option<Block> {
    let gap = Duration::minutes(GAP_THRESHOLD_MINUTES);

    // Sessions before the last oversized gap can never be the open one, so
    // only the trailing group is materialized.
    let mut group_start = 0;
    for i in 1..records.len() {
        if records[i].timestamp - records[i - 1].timestamp > gap {
            group_start = i;
        }
    }
    let group = &records[group_start..];
    let first = group.first()?;
    let last = group.last()?;

    let start_time = floor_to_hour(first.timestamp);
    let end_time = start_time + Duration::minutes(BLOCK_DURATION_MINUTES);

    if now - last.timestamp >= gap || now >= end_time {
        return None;
    }

    let total_tokens: u64 = group.iter().map(UsageRecord::total_tokens).sum();
    let total_cost: f64 = group.iter().map(|r| pricing.record_cost(r)).sum();
    let models: BTreeSet<String> = group.iter().map(|r| r.model.clone()).collect();

    let elapsed_seconds = (now - start_time).num_seconds() as f64;
    // Clamped so a block that just opened cannot divide by a near-zero
    // interval.
    let elapsed_minutes = (elapsed_seconds / 60.0).max(1.0);
    let elapsed_hours = (elapsed_seconds / 3600.0).max(1.0 / 60.0);

    let tokens_per_minute = total_tokens as f64 / elapsed_minutes;
    let cost_per_hour = total_cost / elapsed_hours;

    let remaining_minutes = (end_time - now).num_minutes().max(0);

    // Known simplification: the rate observed so far is extrapolated
    // linearly across the whole window, not decayed or re-weighted.
    let projection = Projection {
        total_tokens: (tokens_per_minute * BLOCK_DURATION_MINUTES as f64) as u64,
        total_cost: cost_per_hour * (BLOCK_DURATION_MINUTES as f64 / 60.0),
        remaining_minutes,
    };

    Some(Block {
        start_time,
        end_time,
        records: group.to_vec(),
        total_tokens,
        total_cost,
        models,
        burn_rate: BurnRate {
            tokens_per_minute,
            cost_per_hour,
        },
        projection,
    })
}

/// Floor a timestamp to the top of its UTC hour
fn floor_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(ts: DateTime<Utc>, request_id: &str, input: u64, output: u64) -> UsageRecord {
        UsageRecord {
            timestamp: ts,
            model: "claude-sonnet-4-5-20250929".to_string(),
            input_tokens: input,
            output_tokens: output,
            cache_creation_tokens: 0,
            cache_read_tokens: 0,
            request_id: request_id.to_string(),
        }
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, s).unwrap()
    }

    #[test]
    fn test_empty_sequence_has_no_block() {
        let pricing = PricingCalculator::new();
        assert!(find_active_block(&[], &pricing, at(12, 0, 0)).is_none());
    }

    #[test]
    fn test_start_time_floors_to_utc_hour() {
        let pricing = PricingCalculator::new();
        let records = [record(at(10, 37, 42), "r1", 10, 0)];
        let block = find_active_block(&records, &pricing, at(11, 0, 0)).unwrap();
        assert_eq!(block.start_time, at(10, 0, 0));
        assert_eq!(block.end_time, at(15, 0, 0));
    }

    #[test]
    fn test_gap_over_threshold_starts_new_block() {
        let pricing = PricingCalculator::new();
        // 301 minutes apart: the second record opens a fresh session
        let records = [
            record(at(1, 30, 0), "r1", 1_000, 0),
            record(at(6, 31, 0), "r2", 50, 0),
        ];
        let block = find_active_block(&records, &pricing, at(6, 32, 0)).unwrap();
        assert_eq!(block.start_time, at(6, 0, 0));
        assert_eq!(block.total_tokens, 50);
    }

    #[test]
    fn test_gap_exactly_at_threshold_does_not_split() {
        let pricing = PricingCalculator::new();
        // Exactly 300 minutes apart: still one session, whose window
        // (01:00 + 5h) has already closed by the time we look
        let records = [
            record(at(1, 30, 0), "r1", 1_000, 0),
            record(at(6, 30, 0), "r2", 50, 0),
        ];
        assert!(find_active_block(&records, &pricing, at(6, 32, 0)).is_none());
    }

    #[test]
    fn test_two_records_six_hours_apart_only_later_counts() {
        let pricing = PricingCalculator::new();
        let records = [
            record(at(2, 0, 0), "r1", 1_000, 0),
            record(at(8, 0, 0), "r2", 200, 100),
        ];
        let block = find_active_block(&records, &pricing, at(8, 30, 0)).unwrap();
        assert_eq!(block.start_time, at(8, 0, 0));
        assert_eq!(block.total_tokens, 300);
        assert_eq!(block.records.len(), 1);
        assert_eq!(block.records[0].request_id, "r2");
    }

    #[test]
    fn test_active_just_before_window_end() {
        let pricing = PricingCalculator::new();
        let now = at(14, 59, 59); // T + 299m59s for a block starting 10:00
        let records = [
            record(at(10, 0, 0), "r1", 10, 0),
            record(at(14, 59, 58), "r2", 10, 0),
        ];
        let block = find_active_block(&records, &pricing, now).unwrap();
        assert_eq!(block.start_time, at(10, 0, 0));
        assert_eq!(block.projection.remaining_minutes, 0);
    }

    #[test]
    fn test_inactive_past_window_end_despite_recent_activity() {
        let pricing = PricingCalculator::new();
        let now = at(15, 0, 1); // T + 5h00m01s
        let records = [
            record(at(10, 0, 0), "r1", 10, 0),
            record(at(15, 0, 0), "r2", 10, 0),
        ];
        assert!(find_active_block(&records, &pricing, now).is_none());
    }

    #[test]
    fn test_quiet_block_stays_active_inside_window() {
        let pricing = PricingCalculator::new();
        // Hours of idle time, but less than the gap threshold and still
        // inside the window
        let records = [record(at(0, 30, 0), "r1", 10, 0)];
        assert!(find_active_block(&records, &pricing, at(4, 0, 0)).is_some());
    }

    #[test]
    fn test_burn_rate_and_projection_math() {
        let pricing = PricingCalculator::new();
        // 6000 tokens one hour into the block
        let records = [record(at(10, 0, 0), "r1", 6_000, 0)];
        let now = at(11, 0, 0);
        let block = find_active_block(&records, &pricing, now).unwrap();

        assert!((block.burn_rate.tokens_per_minute - 100.0).abs() < 1e-9);
        let expected_cost = 6_000.0 * 3.0 / 1e6;
        assert!((block.burn_rate.cost_per_hour - expected_cost).abs() < 1e-9);

        // Linear extrapolation to the full 300-minute window
        assert_eq!(block.projection.total_tokens, 30_000);
        assert!((block.projection.total_cost - expected_cost * 5.0).abs() < 1e-9);
        assert_eq!(block.projection.remaining_minutes, 240);
    }

    #[test]
    fn test_elapsed_clamp_at_block_start() {
        let pricing = PricingCalculator::new();
        let records = [record(at(10, 0, 0), "r1", 500, 0)];
        // Zero elapsed time clamps to one minute / one sixtieth of an hour
        let block = find_active_block(&records, &pricing, at(10, 0, 0)).unwrap();
        assert!((block.burn_rate.tokens_per_minute - 500.0).abs() < 1e-9);
        let expected_cost_per_hour = (500.0 * 3.0 / 1e6) * 60.0;
        assert!((block.burn_rate.cost_per_hour - expected_cost_per_hour).abs() < 1e-9);
    }

    #[test]
    fn test_models_are_distinct() {
        let pricing = PricingCalculator::new();
        let mut a = record(at(10, 0, 0), "r1", 1, 0);
        a.model = "claude-opus-4-6".to_string();
        let mut b = record(at(10, 5, 0), "r2", 1, 0);
        b.model = "claude-opus-4-6".to_string();
        let c = record(at(10, 10, 0), "r3", 1, 0);
        let block = find_active_block(&[a, b, c], &pricing, at(10, 15, 0)).unwrap();
        assert_eq!(block.models.len(), 2);
    }

    #[test]
    fn test_block_id_is_derived_from_start_hour() {
        let pricing = PricingCalculator::new();
        let records = [record(at(10, 20, 0), "r1", 1, 0)];
        let block = find_active_block(&records, &pricing, at(10, 30, 0)).unwrap();
        assert_eq!(block.id(), "2026-03-02T10:00:00Z");
    }
}
