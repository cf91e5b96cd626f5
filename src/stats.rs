use crate::models::{GroupBy, ReadingRecord, ReadingStats, TrendPoint};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeDelta, Utc};
use std::collections::BTreeMap;

pub const DEFAULT_WINDOW_DAYS: i64 = 30;

pub fn build_stats(readings: &[ReadingRecord], days: i64) -> Option<ReadingStats> {
    build_stats_at(Utc::now(), readings, days)
}

pub fn build_stats_at(now: DateTime<Utc>, readings: &[ReadingRecord], days: i64) -> Option<ReadingStats> {
    let window: Vec<&ReadingRecord> = in_window(now, readings, days).collect();
    let first = window.first()?;

    let mut stats = ReadingStats {
        avg_systolic: 0.0,
        avg_diastolic: 0.0,
        max_systolic: first.systolic,
        max_diastolic: first.diastolic,
        min_systolic: first.systolic,
        min_diastolic: first.diastolic,
        total_readings: window.len(),
        avg_pulse: None,
    };

    let mut totals = Totals::default();
    for reading in &window {
        stats.max_systolic = stats.max_systolic.max(reading.systolic);
        stats.max_diastolic = stats.max_diastolic.max(reading.diastolic);
        stats.min_systolic = stats.min_systolic.min(reading.systolic);
        stats.min_diastolic = stats.min_diastolic.min(reading.diastolic);
        totals.add(reading);
    }

    stats.avg_systolic = totals.avg_systolic();
    stats.avg_diastolic = totals.avg_diastolic();
    stats.avg_pulse = totals.avg_pulse();
    Some(stats)
}

pub fn build_trends(readings: &[ReadingRecord], days: i64, group_by: GroupBy) -> Vec<TrendPoint> {
    build_trends_at(Utc::now(), readings, days, group_by)
}

/// Per-period averages over the window, oldest period first.
pub fn build_trends_at(
    now: DateTime<Utc>,
    readings: &[ReadingRecord],
    days: i64,
    group_by: GroupBy,
) -> Vec<TrendPoint> {
    let mut periods: BTreeMap<String, (Totals, DateTime<Utc>)> = BTreeMap::new();
    for reading in in_window(now, readings, days) {
        let key = period_key(reading.timestamp.date_naive(), group_by);
        let entry = periods
            .entry(key)
            .or_insert_with(|| (Totals::default(), reading.timestamp));
        entry.0.add(reading);
        entry.1 = entry.1.min(reading.timestamp);
    }

    periods
        .into_iter()
        .map(|(period, (totals, date))| TrendPoint {
            period,
            avg_systolic: totals.avg_systolic(),
            avg_diastolic: totals.avg_diastolic(),
            avg_pulse: totals.avg_pulse(),
            count: totals.count,
            date,
        })
        .collect()
}

fn in_window<'a>(
    now: DateTime<Utc>,
    readings: &'a [ReadingRecord],
    days: i64,
) -> impl Iterator<Item = &'a ReadingRecord> + 'a {
    let start = window_start(now, days);
    readings.iter().filter(move |reading| reading.timestamp >= start)
}

/// Start of a `days`-long window ending at `now`. Windows reaching past the
/// representable range cover everything.
fn window_start(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    TimeDelta::try_days(days.max(0))
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[derive(Default)]
struct Totals {
    count: usize,
    systolic: u64,
    diastolic: u64,
    pulse: u64,
    pulse_count: usize,
}

impl Totals {
    fn add(&mut self, reading: &ReadingRecord) {
        self.count += 1;
        self.systolic = self.systolic.saturating_add(u64::from(reading.systolic));
        self.diastolic = self.diastolic.saturating_add(u64::from(reading.diastolic));
        if let Some(pulse) = reading.pulse {
            self.pulse = self.pulse.saturating_add(u64::from(pulse));
            self.pulse_count += 1;
        }
    }

    fn avg_systolic(&self) -> f64 {
        average(self.systolic, self.count)
    }

    fn avg_diastolic(&self) -> f64 {
        average(self.diastolic, self.count)
    }

    fn avg_pulse(&self) -> Option<f64> {
        (self.pulse_count > 0).then(|| average(self.pulse, self.pulse_count))
    }
}

fn average(sum: u64, count: usize) -> f64 {
    let denom = if count == 0 { 1.0 } else { count as f64 };
    sum as f64 / denom
}

fn period_key(date: NaiveDate, group_by: GroupBy) -> String {
    match group_by {
        GroupBy::Day => date_key(date),
        GroupBy::Week => week_label(week_start(date)),
        GroupBy::Month => date.format("%Y-%m").to_string(),
    }
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn week_label(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}
