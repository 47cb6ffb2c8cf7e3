//! Daily and weekly cost totals anchored to configurable reset points

use chrono::{DateTime, Datelike, Duration, Local, NaiveTime, TimeZone, Utc};

use crate::usage::models::{PeriodTotals, UsageRecord};
use crate::usage::pricing::PricingCalculator;

/// Length of the billing week in seconds
pub const WEEK_SECONDS: i64 = 7 * 24 * 3600;

/// Compute day-to-date and week-to-date cost totals.
///
/// Both totals rescan the full record sequence every call; there is no
/// incremental state to carry between refreshes.
pub fn period_totals(
    records: &[UsageRecord],
    pricing: &PricingCalculator,
    reset_weekday: u32,
    reset_hour: u32,
    now: DateTime<Utc>,
) -> PeriodTotals {
    let day_start = start_of_local_day(now);
    let week_start = weekly_reset_point(reset_weekday, reset_hour, now);

    let mut totals = PeriodTotals::default();
    for record in records {
        let cost = pricing.record_cost(record);
        if record.timestamp >= day_start {
            totals.daily_cost += cost;
        }
        if record.timestamp >= week_start {
            totals.weekly_cost += cost;
        }
    }
    totals
}

/// Midnight of the current calendar day in the host's local time zone
pub fn start_of_local_day(now: DateTime<Utc>) -> DateTime<Utc> {
    let midnight = now.with_timezone(&Local).date_naive().and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        // A DST transition can skip local midnight outright; the day then
        // has no earlier instant than now
        .unwrap_or(now)
}

/// Most recent instant at or before `now` whose UTC weekday and hour match
/// the configured reset anchor.
///
/// `reset_weekday` is 0 = Sunday through 6 = Saturday; `reset_hour` is a
/// UTC hour. Out-of-range values wrap rather than fail.
pub fn weekly_reset_point(reset_weekday: u32, reset_hour: u32, now: DateTime<Utc>) -> DateTime<Utc> {
    let reset_weekday = reset_weekday % 7;
    let reset_hour = reset_hour % 24;

    let days_back = (now.weekday().num_days_from_sunday() + 7 - reset_weekday) % 7;
    let date = now.date_naive() - Duration::days(i64::from(days_back));
    let anchor = date
        .and_hms_opt(reset_hour, 0, 0)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN));

    let reset = anchor.and_utc();
    // Same-weekday instants before the reset hour anchor to the previous
    // week
    if reset > now {
        reset - Duration::days(7)
    } else {
        reset
    }
}
