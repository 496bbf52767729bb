//! Daily/weekly aggregation over [`TimerStat`] maps and retention pruning.
//!
//! All bucketing is done on the UTC calendar so totals do not shift when
//! the host machine changes time zone.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};

use crate::models::TimerStat;

/// Days of daily buckets kept before pruning.
pub const RETENTION_DAYS: i64 = 7;

const DAY_MS: i64 = 86_400_000;
const DATE_FMT: &str = "%Y-%m-%d";

/// Calendar-day key (`YYYY-MM-DD`) of a timestamp.
pub fn date_key(at: DateTime<Utc>) -> String {
    at.date_naive().format(DATE_FMT).to_string()
}

/// Week key of a date key: the date key of the Monday starting the week
/// containing it. Weeks begin Monday 00:00, not Sunday.
pub fn week_key(day: &str) -> Option<String> {
    let date = NaiveDate::parse_from_str(day, DATE_FMT).ok()?;
    let monday = date.week(Weekday::Mon).first_day();
    Some(monday.format(DATE_FMT).to_string())
}

/// Time tracked today, in milliseconds.
pub fn today_total(stat: &TimerStat, now: DateTime<Utc>) -> i64 {
    stat.daily.get(&date_key(now)).copied().unwrap_or(0)
}

/// Today's total plus the elapsed portion of a running session.
///
/// Display only; nothing is persisted until the timer stops.
pub fn live_total(stat: &TimerStat, now: DateTime<Utc>) -> i64 {
    let running = stat
        .current_start
        .map(|started| (now - started).num_milliseconds().max(0))
        .unwrap_or(0);
    today_total(stat, now) + running
}

/// Sum of all retained daily buckets.
///
/// There is no separately stored all-time total: older buckets are pruned,
/// so this figure decays past the retention window. That is a property of
/// the design, not a defect.
pub fn total_tracked(stat: &TimerStat) -> i64 {
    stat.daily.values().sum()
}

/// Daily entries folded into Monday-keyed weekly sums. Read-only.
pub fn weekly_totals(stat: &TimerStat) -> BTreeMap<String, i64> {
    let mut weeks = BTreeMap::new();
    for (day, ms) in &stat.daily {
        if let Some(week) = week_key(day) {
            *weeks.entry(week).or_insert(0) += ms;
        }
    }
    weeks
}

/// Drops daily buckets more than `retention_days` full days before `now`.
///
/// The day difference is `floor((now - midnight(key)) / 86_400_000)`; a
/// bucket exactly at the boundary is kept, only strictly older ones go.
/// Keys that do not parse as dates are left alone.
pub fn prune_older_than(stat: &mut TimerStat, retention_days: i64, now: DateTime<Utc>) {
    stat.daily.retain(|day, _| {
        let Ok(date) = NaiveDate::parse_from_str(day, DATE_FMT) else {
            return true;
        };
        let midnight = date.and_time(NaiveTime::MIN).and_utc();
        let diff_days = (now - midnight).num_milliseconds().div_euclid(DAY_MS);
        diff_days <= retention_days
    });
}

/// Formats a millisecond duration as `H:MM:SS`.
pub fn format_duration(ms: i64) -> String {
    if ms <= 0 {
        return "0:00:00".to_string();
    }
    let seconds = (ms / 1_000) % 60;
    let minutes = (ms / 60_000) % 60;
    let hours = ms / 3_600_000;
    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}
