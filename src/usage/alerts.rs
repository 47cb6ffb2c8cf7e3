//! One-shot spend threshold alerts for the active block

use std::collections::HashSet;

use log::warn;

use crate::usage::pace::format_currency;

/// A threshold crossing detected during a refresh
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    /// Threshold percentage that was crossed
    pub threshold: u8,
    pub cost: f64,
    pub limit: f64,
}

/// Destination for fired alerts. Delivery mechanics (OS notifications,
/// webhooks) belong to the collaborator behind this trait.
pub trait AlertSink: Send + Sync {
    fn notify(&self, event: &AlertEvent);
}

/// Sink that records alerts in the process log
#[derive(Debug, Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn notify(&self, event: &AlertEvent) {
        warn!(
            "block usage at {}%: {} / {}",
            event.threshold,
            format_currency(event.cost),
            format_currency(event.limit)
        );
    }
}

/// Tracks which thresholds already fired for the current block.
///
/// Owned by the refresh coordinator, one instance per monitor; a changed or
/// vanished block identity re-arms every threshold.
#[derive(Debug, Default)]
pub struct ThresholdAlerter {
    fired: HashSet<u8>,
    current_block: Option<String>,
}

impl ThresholdAlerter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the block the next `check` call refers to
    pub fn observe_block(&mut self, block_id: Option<&str>) {
        if self.current_block.as_deref() != block_id {
            self.fired.clear();
            self.current_block = block_id.map(str::to_string);
        }
    }

    /// Evaluate the enabled thresholds against the current spend; each
    /// fires at most once per block.
    pub fn check(&mut self, cost: f64, limit: f64, thresholds: &[(u8, bool)]) -> Vec<AlertEvent> {
        if self.current_block.is_none() || limit <= 0.0 {
            return Vec::new();
        }

        let fraction = cost / limit;
        let mut events = Vec::new();
        for &(threshold, enabled) in thresholds {
            if enabled
                && fraction >= f64::from(threshold) / 100.0
                && self.fired.insert(threshold)
            {
                events.push(AlertEvent {
                    threshold,
                    cost,
                    limit,
                });
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ENABLED: [(u8, bool); 3] = [(50, true), (75, true), (90, true)];

    #[test]
    fn test_fires_reached_thresholds_only() {
        let mut alerter = ThresholdAlerter::new();
        alerter.observe_block(Some("2026-03-02T10:00:00Z"));

        // $40 of a $50 limit is 80%: crosses 50 and 75, not 90
        let events = alerter.check(40.0, 50.0, &ALL_ENABLED);
        let thresholds: Vec<u8> = events.iter().map(|e| e.threshold).collect();
        assert_eq!(thresholds, vec![50, 75]);
    }

    #[test]
    fn test_each_threshold_fires_once_per_block() {
        let mut alerter = ThresholdAlerter::new();
        alerter.observe_block(Some("2026-03-02T10:00:00Z"));

        assert_eq!(alerter.check(30.0, 50.0, &ALL_ENABLED).len(), 1);
        // Same spend next refresh: nothing new
        alerter.observe_block(Some("2026-03-02T10:00:00Z"));
        assert!(alerter.check(30.0, 50.0, &ALL_ENABLED).is_empty());
        // Spend grows past the next threshold
        let events = alerter.check(38.0, 50.0, &ALL_ENABLED);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].threshold, 75);
    }

    #[test]
    fn test_new_block_rearms_thresholds() {
        let mut alerter = ThresholdAlerter::new();
        alerter.observe_block(Some("2026-03-02T10:00:00Z"));
        assert_eq!(alerter.check(45.0, 50.0, &ALL_ENABLED).len(), 2);

        alerter.observe_block(Some("2026-03-02T16:00:00Z"));
        assert_eq!(alerter.check(45.0, 50.0, &ALL_ENABLED).len(), 2);
    }

    #[test]
    fn test_disabled_thresholds_are_skipped() {
        let mut alerter = ThresholdAlerter::new();
        alerter.observe_block(Some("2026-03-02T10:00:00Z"));

        let events = alerter.check(49.0, 50.0, &[(50, true), (75, false), (90, true)]);
        let thresholds: Vec<u8> = events.iter().map(|e| e.threshold).collect();
        assert_eq!(thresholds, vec![50, 90]);
    }

    #[test]
    fn test_no_block_or_no_limit_means_no_alerts() {
        let mut alerter = ThresholdAlerter::new();
        assert!(alerter.check(100.0, 50.0, &ALL_ENABLED).is_empty());

        alerter.observe_block(Some("2026-03-02T10:00:00Z"));
        assert!(alerter.check(100.0, 0.0, &ALL_ENABLED).is_empty());
    }
}
