//! Consecutive-day logging streaks.
//!
//! A streak is a maximal run of calendar days with at least one reading,
//! ending at the most recent logged day. The tracker keeps the set of logged
//! days so it can always recompute from scratch; forward insertions take an
//! incremental shortcut that yields the same result.

use chrono::{NaiveDate, TimeDelta};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakData {
    pub current_streak: u32,
    pub best_streak: u32,
    pub last_reading_date: Option<NaiveDate>,
}

impl StreakData {
    /// Walks the distinct days in ascending order.
    pub fn from_days<'a, I>(days: I) -> Self
    where
        I: IntoIterator<Item = &'a NaiveDate>,
    {
        let mut streak = Self::default();
        for &day in days {
            streak.current_streak = match streak.last_reading_date {
                Some(last) if day - last == TimeDelta::days(1) => streak.current_streak + 1,
                _ => 1,
            };
            streak.best_streak = streak.best_streak.max(streak.current_streak);
            streak.last_reading_date = Some(day);
        }
        streak
    }

    /// Reports the current streak as broken when more than a day has passed
    /// since the last logged day. The best streak is left alone.
    pub fn as_of(mut self, today: NaiveDate) -> Self {
        if let Some(last) = self.last_reading_date {
            if today - last > TimeDelta::days(1) {
                self.current_streak = 0;
            }
        }
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct StreakTracker {
    days: BTreeSet<NaiveDate>,
    data: StreakData,
}

impl StreakTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_days<I>(days: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let days: BTreeSet<NaiveDate> = days.into_iter().collect();
        let data = StreakData::from_days(&days);
        Self { days, data }
    }

    pub fn record(&mut self, day: NaiveDate) {
        if !self.days.insert(day) {
            return;
        }

        match self.data.last_reading_date {
            None => {
                self.data = StreakData {
                    current_streak: 1,
                    best_streak: 1,
                    last_reading_date: Some(day),
                };
            }
            Some(last) if day > last => {
                self.data.current_streak = if day - last == TimeDelta::days(1) {
                    self.data.current_streak + 1
                } else {
                    1
                };
                self.data.best_streak = self.data.best_streak.max(self.data.current_streak);
                self.data.last_reading_date = Some(day);
            }
            // Backdated day: it may bridge a gap, so recompute.
            Some(_) => self.data = StreakData::from_days(&self.days),
        }
    }

    /// Raw streak state as of the last recorded day.
    pub fn data(&self) -> StreakData {
        self.data
    }

    pub fn as_of(&self, today: NaiveDate) -> StreakData {
        self.data.as_of(today)
    }

    pub fn days(&self) -> &BTreeSet<NaiveDate> {
        &self.days
    }

    pub fn clear(&mut self) {
        self.days.clear();
        self.data = StreakData::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn consecutive_days_build_matching_streaks() {
        let mut tracker = StreakTracker::new();
        for d in 1..=3 {
            tracker.record(day(2024, 1, d));
        }
        let data = tracker.as_of(day(2024, 1, 3));
        assert_eq!(data.current_streak, 3);
        assert_eq!(data.best_streak, 3);
        assert_eq!(data.last_reading_date, Some(day(2024, 1, 3)));

        tracker.record(day(2024, 1, 5));
        let data = tracker.as_of(day(2024, 1, 5));
        assert_eq!(data.current_streak, 1);
        assert_eq!(data.best_streak, 3);
    }

    #[test]
    fn run_of_k_days_gives_k() {
        for k in 1..=10u32 {
            let start = day(2024, 2, 20);
            let tracker = StreakTracker::from_days((0..k).map(|offset| start + TimeDelta::days(offset as i64)));
            let last = start + TimeDelta::days(k as i64 - 1);
            let data = tracker.as_of(last);
            assert_eq!((data.current_streak, data.best_streak), (k, k));
        }
    }

    #[test]
    fn elapsed_gap_breaks_current_streak_only() {
        let tracker = StreakTracker::from_days([day(2024, 1, 1), day(2024, 1, 2)]);

        assert_eq!(tracker.as_of(day(2024, 1, 3)).current_streak, 2);

        let stale = tracker.as_of(day(2024, 1, 4));
        assert_eq!(stale.current_streak, 0);
        assert_eq!(stale.best_streak, 2);
        assert_eq!(tracker.data().current_streak, 2);
    }

    #[test]
    fn same_day_repeat_is_a_no_op() {
        let mut tracker = StreakTracker::from_days([day(2024, 1, 1), day(2024, 1, 2)]);
        let before = tracker.data();
        tracker.record(day(2024, 1, 2));
        tracker.record(day(2024, 1, 1));
        assert_eq!(tracker.data(), before);
    }

    #[test]
    fn backdated_day_recomputes_from_the_full_set() {
        let mut tracker = StreakTracker::from_days([day(2024, 1, 1), day(2024, 1, 3), day(2024, 1, 4)]);
        assert_eq!(tracker.data().current_streak, 2);

        tracker.record(day(2024, 1, 2));
        let data = tracker.data();
        assert_eq!(data.current_streak, 4);
        assert_eq!(data.best_streak, 4);
        assert_eq!(data.last_reading_date, Some(day(2024, 1, 4)));

        // A backdated day far in the past leaves the forward state intact.
        tracker.record(day(2023, 6, 1));
        assert_eq!(tracker.data(), data);
    }

    #[test]
    fn incremental_matches_full_recompute() {
        let days = [
            day(2024, 3, 10),
            day(2024, 3, 11),
            day(2024, 3, 9),
            day(2024, 3, 15),
            day(2024, 3, 11),
            day(2024, 3, 14),
            day(2024, 3, 16),
            day(2024, 3, 12),
            day(2024, 3, 13),
        ];
        let mut tracker = StreakTracker::new();
        let mut best = 0;
        for (i, d) in days.iter().enumerate() {
            tracker.record(*d);
            let expected = StreakData::from_days(&days[..=i].iter().copied().collect::<BTreeSet<_>>());
            assert_eq!(tracker.data(), expected);
            assert!(tracker.data().best_streak >= best);
            best = tracker.data().best_streak;
        }
        assert_eq!(best, 8);
    }

    #[test]
    fn cleared_tracker_is_empty() {
        let mut tracker = StreakTracker::from_days([day(2024, 1, 1)]);
        tracker.clear();
        assert_eq!(tracker.data(), StreakData::default());
        assert!(tracker.days().is_empty());
    }
}
