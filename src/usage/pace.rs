//! Pace evaluation and display formatting shared by presentation layers
//!
//! One continuous signal (spend pace vs. elapsed time) for color cues and
//! labels; the discrete one-shot alerts live in `alerts`.

use chrono::{DateTime, Utc};

use crate::usage::blocks::BLOCK_DURATION_MINUTES;
use crate::usage::periods::{weekly_reset_point, WEEK_SECONDS};

/// Below this elapsed fraction the period has effectively just begun and a
/// pace ratio would be meaningless
const EARLY_TIME_FRACTION: f64 = 0.01;

/// Relation of spend pace to the period budget pace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// Nothing spent and the period has barely started
    NoUsage,
    /// Spend registered before the period is long enough to pace against
    Early,
    Under,
    Near,
    Over,
    WellOver,
}

impl Pace {
    pub fn label(&self) -> &'static str {
        match self {
            Pace::NoUsage => "No usage yet",
            Pace::Early => "Early usage",
            Pace::Under => "Under budget pace",
            Pace::Near => "Near budget pace",
            Pace::Over => "Over budget pace",
            Pace::WellOver => "Well over pace",
        }
    }
}

/// Fraction of the budget consumed; zero when no limit is configured
pub fn usage_fraction(cost: f64, limit: f64) -> f64 {
    if limit <= 0.0 {
        0.0
    } else {
        cost / limit
    }
}

/// Fraction of the five-hour block elapsed
pub fn block_time_fraction(start_time: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let elapsed = (now - start_time).num_seconds() as f64;
    let total = (BLOCK_DURATION_MINUTES * 60) as f64;
    (elapsed / total).clamp(0.0, 1.0)
}

/// Fraction of the billing week elapsed since the weekly reset point
pub fn weekly_time_fraction(reset_weekday: u32, reset_hour: u32, now: DateTime<Utc>) -> f64 {
    let reset = weekly_reset_point(reset_weekday, reset_hour, now);
    let elapsed = (now - reset).num_seconds() as f64;
    (elapsed / WEEK_SECONDS as f64).clamp(0.0, 1.0)
}

/// Classify spend pace against elapsed time
pub fn pace_band(usage: f64, time: f64) -> Pace {
    if time <= EARLY_TIME_FRACTION {
        return if usage > 0.0 { Pace::Early } else { Pace::NoUsage };
    }
    let ratio = usage / time;
    if ratio < 0.8 {
        Pace::Under
    } else if ratio < 1.0 {
        Pace::Near
    } else if ratio < 1.3 {
        Pace::Over
    } else {
        Pace::WellOver
    }
}

pub fn format_currency(value: f64) -> String {
    format!("${:.2}", value)
}

pub fn format_percentage(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

pub fn format_time_remaining(minutes: i64) -> String {
    let h = minutes / 60;
    let m = minutes % 60;
    if h > 0 {
        format!("{}h {}m left", h, m)
    } else {
        format!("{}m left", m)
    }
}

pub fn format_burn_rate(cost_per_hour: f64) -> String {
    format!("${:.2}/hr", cost_per_hour)
}
