// History analytics for the sensor detail views
//
// Everything here is best-effort arithmetic over possibly-sparse history:
// missing or short history degrades to 0 / stable / not-computable, never
// to an error. `now` is always passed in by the caller so that results
// are reproducible in tests.
use chrono::{DateTime, Duration, Local, NaiveTime, Timelike, Utc};
use serde::Serialize;

use crate::domain::reading::{power_watts, DoorParams};
use crate::domain::sensor::{HistoryEntry, Reading};

/// Lookback window selectable in the detail views (8h / 24h / 7d).
pub const WINDOW_HOURS: [i64; 3] = [8, 24, 168];

/// Rolling timeframes for door opening counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    /// Since local midnight.
    Today,
    /// Rolling 7 days.
    Week,
    /// Rolling 30 days.
    Month,
}

impl Timeframe {
    pub fn cutoff(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Timeframe::Today => local_midnight(now),
            Timeframe::Week => now - Duration::days(7),
            Timeframe::Month => now - Duration::days(30),
        }
    }
}

fn local_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    let midnight = now
        .with_timezone(&Local)
        .date_naive()
        .and_time(NaiveTime::MIN);
    midnight
        .and_local_timezone(Local)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or(now)
}

/// One reading field within the lookback window, oldest first.
/// `history` follows the newest-first invariant; chronological consumers
/// reverse exactly once, here.
pub fn window_series(
    history: &[HistoryEntry],
    hours: i64,
    now: DateTime<Utc>,
    extract: impl Fn(&Reading) -> Option<f64>,
) -> Vec<(DateTime<Utc>, f64)> {
    let cutoff = now - Duration::hours(hours);
    history
        .iter()
        .rev()
        .filter(|entry| entry.timestamp > cutoff)
        .filter_map(|entry| extract(&entry.data).map(|value| (entry.timestamp, value)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowStats {
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

pub fn window_stats(values: &[f64]) -> Option<WindowStats> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().sum();
    Some(WindowStats {
        average: sum / values.len() as f64,
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    })
}

/// Total-window trend in percent, `(newest - oldest) / oldest * 100` over
/// chronological values. Defined as 0 when the window has fewer than two
/// points or the oldest value is 0.
pub fn trend_percent(chronological: &[f64]) -> f64 {
    let (Some(first), Some(last)) = (chronological.first(), chronological.last()) else {
        return 0.0;
    };
    if chronological.len() < 2 || *first == 0.0 {
        return 0.0;
    }
    (last - first) / first * 100.0
}

/// Fill-level change per hour over the most recent ~4 hours of samples,
/// assuming roughly 4 samples per hour. Negative while the container
/// drains.
pub fn consumption_rate(chronological_levels: &[f64]) -> f64 {
    let recent = &chronological_levels
        [chronological_levels.len().saturating_sub(16)..];
    if recent.len() < 2 {
        return 0.0;
    }
    let hours = recent.len() as f64 / 4.0;
    (recent[recent.len() - 1] - recent[0]) / hours
}

/// Projection of when a draining fill level crosses its critical
/// threshold. Not computable while the level is flat or rising.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeUntilCritical {
    NotComputable,
    Hours(f64),
}

impl TimeUntilCritical {
    pub fn project(current_level: f64, rate_per_hour: f64, critical_threshold: f64) -> Self {
        if rate_per_hour >= 0.0 {
            return TimeUntilCritical::NotComputable;
        }
        let remaining = current_level - critical_threshold;
        TimeUntilCritical::Hours((remaining / rate_per_hour).abs())
    }

    /// Banded label: minutes under an hour, hours under a day, days
    /// beyond that.
    pub fn label(&self) -> String {
        match self {
            TimeUntilCritical::NotComputable => "not computable".to_string(),
            TimeUntilCritical::Hours(hours) if *hours < 1.0 => {
                format!("{} minutes", (hours * 60.0).round() as i64)
            }
            TimeUntilCritical::Hours(hours) if *hours < 24.0 => {
                format!("{} hours", hours.round() as i64)
            }
            TimeUntilCritical::Hours(hours) => {
                format!("{} days", (hours / 24.0).round() as i64)
            }
        }
    }
}

fn door_events<'a>(
    history: &'a [HistoryEntry],
    params: &'a DoorParams,
) -> impl Iterator<Item = (DateTime<Utc>, bool)> + 'a {
    history.iter().rev().filter_map(|entry| {
        entry
            .data
            .distance
            .map(|distance| (entry.timestamp, params.is_open(distance)))
    })
}

/// Counts Closed→Open transitions inside the timeframe. A reading that is
/// already open at the start of the window counts as one opening.
pub fn open_count(
    history: &[HistoryEntry],
    params: &DoorParams,
    timeframe: Timeframe,
    now: DateTime<Utc>,
) -> usize {
    if history.len() < 2 {
        return 0;
    }
    let cutoff = timeframe.cutoff(now);
    let mut count = 0;
    let mut was_open = false;
    for (timestamp, is_open) in door_events(history, params) {
        if timestamp < cutoff {
            continue;
        }
        if is_open && !was_open {
            count += 1;
        }
        was_open = is_open;
    }
    count
}

/// Whole minutes the door has currently been open, 0 when it is closed.
/// Walks from the latest reading back to the most recent closed one; a
/// history that never shows the door closed yields 0.
pub fn current_open_minutes(
    history: &[HistoryEntry],
    params: &DoorParams,
    now: DateTime<Utc>,
) -> i64 {
    if history.len() < 2 {
        return 0;
    }
    let currently_open = history
        .first()
        .and_then(|entry| entry.data.distance)
        .is_some_and(|distance| params.is_open(distance));
    if !currently_open {
        return 0;
    }
    let last_closed = history
        .iter()
        .filter_map(|entry| entry.data.distance.map(|d| (entry.timestamp, d)))
        .find(|(_, distance)| !params.is_open(*distance))
        .map(|(timestamp, _)| timestamp);
    match last_closed {
        Some(timestamp) => (now - timestamp).num_minutes(),
        None => 0,
    }
}

/// Mean duration of completed Open→Closed intervals, rounded to whole
/// minutes.
pub fn average_open_minutes(history: &[HistoryEntry], params: &DoorParams) -> f64 {
    let mut total_minutes = 0.0;
    let mut completed = 0u32;
    let mut opened_at: Option<DateTime<Utc>> = None;
    let mut was_open = false;
    for (timestamp, is_open) in door_events(history, params) {
        if is_open && !was_open {
            opened_at = Some(timestamp);
        } else if !is_open && was_open {
            if let Some(start) = opened_at.take() {
                total_minutes += (timestamp - start).num_seconds() as f64 / 60.0;
                completed += 1;
            }
        }
        was_open = is_open;
    }
    if completed > 0 {
        (total_minutes / completed as f64).round()
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BusyHour {
    /// Local hour of day, 0-23.
    pub hour: u32,
    pub count: usize,
}

/// The three local hours of day with the most open readings, busiest
/// first. Hours without any open reading are omitted.
pub fn busy_hours(history: &[HistoryEntry], params: &DoorParams) -> Vec<BusyHour> {
    let mut counts = [0usize; 24];
    for (timestamp, is_open) in door_events(history, params) {
        if is_open {
            counts[timestamp.with_timezone(&Local).hour() as usize] += 1;
        }
    }
    let mut buckets: Vec<BusyHour> = counts
        .iter()
        .enumerate()
        .map(|(hour, &count)| BusyHour {
            hour: hour as u32,
            count,
        })
        .collect();
    buckets.sort_by(|a, b| b.count.cmp(&a.count));
    buckets.truncate(3);
    buckets.retain(|bucket| bucket.count > 0);
    buckets
}

/// Opening statistics shown on the door detail card.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoorStats {
    pub today: usize,
    pub week: usize,
    pub month: usize,
    /// Mean openings per day, derived from the weekly count.
    pub avg_daily_openings: usize,
    pub avg_open_minutes: f64,
    pub current_open_minutes: i64,
    pub busy_hours: Vec<BusyHour>,
}

pub fn door_stats(history: &[HistoryEntry], params: &DoorParams, now: DateTime<Utc>) -> DoorStats {
    let week = open_count(history, params, Timeframe::Week, now);
    DoorStats {
        today: open_count(history, params, Timeframe::Today, now),
        week,
        month: open_count(history, params, Timeframe::Month, now),
        avg_daily_openings: ((week as f64) / 7.0).round() as usize,
        avg_open_minutes: average_open_minutes(history, params),
        current_open_minutes: current_open_minutes(history, params, now),
        busy_hours: busy_hours(history, params),
    }
}

/// Energy drawn since local midnight plus a naive full-day forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyConsumption {
    pub today_kwh: f64,
    pub forecast_kwh: f64,
}

pub fn energy_consumption(history: &[HistoryEntry], now: DateTime<Utc>) -> EnergyConsumption {
    let midnight = local_midnight(now);
    let samples: Vec<(DateTime<Utc>, f64)> = history
        .iter()
        .rev()
        .filter(|entry| entry.timestamp >= midnight)
        .filter_map(|entry| {
            match (entry.data.voltage, entry.data.current) {
                (Some(v), Some(c)) => Some((entry.timestamp, power_watts(v, c))),
                _ => None,
            }
        })
        .collect();

    let today_kwh: f64 = samples
        .windows(2)
        .map(|pair| {
            let hours = (pair[1].0 - pair[0].0).num_seconds() as f64 / 3600.0;
            pair[1].1 * hours / 1000.0
        })
        .sum();

    let local_now = now.with_timezone(&Local);
    let hours_elapsed = local_now.hour() as f64 + local_now.minute() as f64 / 60.0;
    let forecast_kwh = if hours_elapsed > 0.0 {
        today_kwh * 24.0 / hours_elapsed
    } else {
        today_kwh
    };
    EnergyConsumption {
        today_kwh,
        forecast_kwh,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn door_params() -> DoorParams {
        DoorParams {
            target_distance: 10.0,
            tolerance: 5.0,
        }
    }

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn door_entry(timestamp: DateTime<Utc>, open: bool) -> HistoryEntry {
        HistoryEntry {
            timestamp,
            data: Reading {
                // target 10 + tolerance 5: 30 is open, 5 is closed
                distance: Some(if open { 30.0 } else { 5.0 }),
                ..Reading::default()
            },
        }
    }

    /// Newest-first history from chronological (timestamp, open) pairs.
    fn door_history(entries: &[(DateTime<Utc>, bool)]) -> Vec<HistoryEntry> {
        let mut history: Vec<HistoryEntry> = entries
            .iter()
            .map(|&(t, open)| door_entry(t, open))
            .collect();
        history.reverse();
        history
    }

    #[test]
    fn test_window_series_is_chronological_and_bounded() {
        let history: Vec<HistoryEntry> = (0..10)
            .map(|i| HistoryEntry {
                timestamp: local(2026, 3, 2, 12, 0) - Duration::hours(i),
                data: Reading {
                    temperature: Some(20.0 + i as f64),
                    ..Reading::default()
                },
            })
            .collect();
        let now = local(2026, 3, 2, 12, 0);
        let series = window_series(&history, 4, now, |r| r.temperature);
        assert_eq!(series.len(), 4);
        assert!(series.windows(2).all(|p| p[0].0 < p[1].0));
        // oldest value in window is the largest temperature offset
        assert_eq!(series[0].1, 23.0);
    }

    #[test]
    fn test_window_stats_empty_is_none() {
        assert_eq!(window_stats(&[]), None);
        let stats = window_stats(&[10.0, 30.0, 20.0]).unwrap();
        assert_eq!(stats.average, 20.0);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 30.0);
    }

    #[test]
    fn test_trend_percent_edges() {
        assert_eq!(trend_percent(&[]), 0.0);
        assert_eq!(trend_percent(&[50.0]), 0.0);
        assert_eq!(trend_percent(&[0.0, 10.0]), 0.0);
        assert_eq!(trend_percent(&[50.0, 60.0]), 20.0);
        assert_eq!(trend_percent(&[50.0, 70.0, 40.0]), -20.0);
    }

    #[test]
    fn test_consumption_rate_uses_recent_window() {
        // 20 chronological samples: flat at 80, then draining 2%/sample
        let mut levels = vec![80.0; 4];
        for i in 0..16 {
            levels.push(80.0 - 2.0 * (i + 1) as f64);
        }
        // recent 16 samples span 4h and drop 78 -> 48
        let rate = consumption_rate(&levels);
        assert!((rate - (48.0 - 78.0) / 4.0).abs() < 1e-9);
        assert!(rate < 0.0);
        assert_eq!(consumption_rate(&[50.0]), 0.0);
    }

    #[test]
    fn test_time_until_critical_bands() {
        assert_eq!(
            TimeUntilCritical::project(50.0, 0.0, 20.0),
            TimeUntilCritical::NotComputable
        );
        assert_eq!(
            TimeUntilCritical::project(50.0, 1.5, 20.0),
            TimeUntilCritical::NotComputable
        );
        assert_eq!(
            TimeUntilCritical::project(50.0, -10.0, 20.0).label(),
            "3 hours"
        );
        assert_eq!(
            TimeUntilCritical::project(21.0, -2.0, 20.0).label(),
            "30 minutes"
        );
        assert_eq!(
            TimeUntilCritical::project(90.0, -1.0, 20.0).label(),
            "3 days"
        );
    }

    #[test]
    fn test_open_count_today_respects_local_midnight() {
        // closed at 23:50 on day 1, open at 00:10 on day 2
        let history = door_history(&[
            (local(2026, 3, 1, 23, 50), false),
            (local(2026, 3, 2, 0, 10), true),
        ]);
        let now = local(2026, 3, 2, 9, 0);
        let params = door_params();
        assert_eq!(open_count(&history, &params, Timeframe::Today, now), 1);
        assert_eq!(open_count(&history, &params, Timeframe::Week, now), 1);
        assert_eq!(open_count(&history, &params, Timeframe::Month, now), 1);
    }

    #[test]
    fn test_open_count_counts_rising_edges_only() {
        let t0 = local(2026, 3, 2, 8, 0);
        let history = door_history(&[
            (t0, false),
            (t0 + Duration::minutes(15), true),
            (t0 + Duration::minutes(30), true),
            (t0 + Duration::minutes(45), false),
            (t0 + Duration::minutes(60), true),
        ]);
        let now = t0 + Duration::hours(2);
        assert_eq!(
            open_count(&history, &door_params(), Timeframe::Today, now),
            2
        );
    }

    #[test]
    fn test_open_count_short_history_is_zero() {
        let history = door_history(&[(local(2026, 3, 2, 8, 0), true)]);
        let now = local(2026, 3, 2, 9, 0);
        assert_eq!(
            open_count(&history, &door_params(), Timeframe::Today, now),
            0
        );
    }

    #[test]
    fn test_current_open_minutes() {
        let t0 = local(2026, 3, 2, 8, 0);
        let params = door_params();
        let history = door_history(&[
            (t0, false),
            (t0 + Duration::minutes(10), true),
            (t0 + Duration::minutes(20), true),
        ]);
        let now = t0 + Duration::minutes(30);
        // most recent closed reading was at t0
        assert_eq!(current_open_minutes(&history, &params, now), 30);

        // currently closed -> 0
        let closed = door_history(&[(t0, true), (t0 + Duration::minutes(10), false)]);
        assert_eq!(current_open_minutes(&closed, &params, now), 0);

        // never closed in history -> 0 (no reference point)
        let always_open =
            door_history(&[(t0, true), (t0 + Duration::minutes(10), true)]);
        assert_eq!(current_open_minutes(&always_open, &params, now), 0);
    }

    #[test]
    fn test_average_open_minutes_over_completed_intervals() {
        let t0 = local(2026, 3, 2, 8, 0);
        let history = door_history(&[
            (t0, false),
            (t0 + Duration::minutes(10), true), // open 10 min
            (t0 + Duration::minutes(20), false),
            (t0 + Duration::minutes(30), true), // open 20 min
            (t0 + Duration::minutes(50), false),
            (t0 + Duration::minutes(55), true), // still open, not counted
        ]);
        let params = door_params();
        assert_eq!(average_open_minutes(&history, &params), 15.0);
        assert_eq!(average_open_minutes(&[], &params), 0.0);
    }

    #[test]
    fn test_average_open_minutes_rounds_to_whole_minutes() {
        let t0 = local(2026, 3, 2, 8, 0);
        let history = door_history(&[
            (t0, false),
            (t0 + Duration::minutes(10), true), // open 10 min
            (t0 + Duration::minutes(20), false),
            (t0 + Duration::minutes(30), true), // open 15 min
            (t0 + Duration::minutes(45), false),
        ]);
        let params = door_params();
        // mean is 12.5, reported as 13
        assert_eq!(average_open_minutes(&history, &params), 13.0);
    }

    #[test]
    fn test_busy_hours_top_three_non_zero() {
        let params = door_params();
        let mut entries = Vec::new();
        let day = |h, m| local(2026, 3, 2, h, m);
        for m in [0, 10, 20, 30] {
            entries.push((day(9, m), true));
        }
        for m in [0, 10, 20] {
            entries.push((day(12, m), true));
        }
        entries.push((day(15, 0), true));
        entries.push((day(16, 0), false));
        entries.sort_by_key(|&(t, _)| t);
        let history = door_history(&entries);

        let hours = busy_hours(&history, &params);
        assert_eq!(hours.len(), 3);
        assert_eq!(hours[0].count, 4);
        assert_eq!(hours[1].count, 3);
        assert_eq!(hours[2].count, 1);
        assert!(hours.iter().all(|b| b.count > 0));
    }

    #[test]
    fn test_door_stats_aggregate() {
        let t0 = local(2026, 3, 2, 8, 0);
        let history = door_history(&[
            (t0, false),
            (t0 + Duration::minutes(10), true),
            (t0 + Duration::minutes(20), false),
        ]);
        let stats = door_stats(&history, &door_params(), t0 + Duration::minutes(30));
        assert_eq!(stats.today, 1);
        assert_eq!(stats.week, 1);
        assert_eq!(stats.avg_daily_openings, 0); // round(1/7)
        assert_eq!(stats.current_open_minutes, 0);
        assert_eq!(stats.avg_open_minutes, 10.0);
    }

    #[test]
    fn test_energy_consumption_since_midnight() {
        let entry = |t, voltage: f64, current: f64| HistoryEntry {
            timestamp: t,
            data: Reading {
                voltage: Some(voltage),
                current: Some(current),
                ..Reading::default()
            },
        };
        // constant 2300 W from 04:00 to 06:00 local
        let mut history = vec![
            entry(local(2026, 3, 1, 23, 0), 230.0, 10.0), // yesterday, ignored
            entry(local(2026, 3, 2, 4, 0), 230.0, 10.0),
            entry(local(2026, 3, 2, 5, 0), 230.0, 10.0),
            entry(local(2026, 3, 2, 6, 0), 230.0, 10.0),
        ];
        history.reverse();
        let now = local(2026, 3, 2, 6, 0);
        let consumption = energy_consumption(&history, now);
        assert!((consumption.today_kwh - 4.6).abs() < 1e-9);
        assert!((consumption.forecast_kwh - 4.6 * 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_energy_consumption_empty_history() {
        let consumption = energy_consumption(&[], local(2026, 3, 2, 6, 0));
        assert_eq!(consumption.today_kwh, 0.0);
        assert_eq!(consumption.forecast_kwh, 0.0);
    }
}
