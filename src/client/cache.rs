use super::error::{ClientError, Result};
use super::notes::NoteBook;
use super::streak::{StreakData, StreakTracker};
use crate::models::{NewReading, ReadingRecord};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

pub const SYSTOLIC_RANGE: (u16, u16) = (70, 250);
pub const DIASTOLIC_RANGE: (u16, u16) = (40, 150);
pub const PULSE_RANGE: (u16, u16) = (30, 220);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub id: String,
    pub systolic: u16,
    pub diastolic: u16,
    pub pulse: Option<u16>,
    pub note: String,
    pub tags: BTreeSet<String>,
    pub timestamp: DateTime<Utc>,
    /// Set once the backend has confirmed the record.
    pub server_id: Option<String>,
    pub user_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Reading {
    /// Client-only record built from a draft the backend never accepted.
    pub fn local(draft: ReadingDraft) -> Self {
        Self {
            id: format!("local-{}", Uuid::new_v4()),
            systolic: draft.systolic,
            diastolic: draft.diastolic,
            pulse: draft.pulse,
            note: draft.note,
            tags: draft.tags,
            timestamp: draft.timestamp,
            server_id: None,
            user_id: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.server_id.is_some()
    }

    /// Calendar day of the reading in the device's time zone.
    pub fn local_date(&self) -> NaiveDate {
        self.timestamp.with_timezone(&Local).date_naive()
    }
}

impl From<ReadingRecord> for Reading {
    fn from(record: ReadingRecord) -> Self {
        Self {
            id: record.id.clone(),
            systolic: record.systolic,
            diastolic: record.diastolic,
            pulse: record.pulse,
            note: record.notes,
            tags: record.tags.into_iter().collect(),
            timestamp: record.timestamp,
            server_id: Some(record.id),
            user_id: Some(record.user_id),
            created_at: Some(record.created_at),
            updated_at: Some(record.updated_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadingDraft {
    pub systolic: u16,
    pub diastolic: u16,
    pub pulse: Option<u16>,
    pub note: String,
    pub tags: BTreeSet<String>,
    pub timestamp: DateTime<Utc>,
}

impl ReadingDraft {
    pub fn new(systolic: u16, diastolic: u16) -> Self {
        Self {
            systolic,
            diastolic,
            pulse: None,
            note: String::new(),
            tags: BTreeSet::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_pulse(mut self, pulse: u16) -> Self {
        self.pulse = Some(pulse);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Form-entry checks. The cache never calls this; entry screens do.
    pub fn validate(&self) -> Result<()> {
        let (min, max) = SYSTOLIC_RANGE;
        if !(min..=max).contains(&self.systolic) {
            return Err(ClientError::Validation(format!(
                "Systolic pressure must be between {min}-{max} mmHg"
            )));
        }
        let (min, max) = DIASTOLIC_RANGE;
        if !(min..=max).contains(&self.diastolic) {
            return Err(ClientError::Validation(format!(
                "Diastolic pressure must be between {min}-{max} mmHg"
            )));
        }
        if self.systolic <= self.diastolic {
            return Err(ClientError::Validation(
                "Systolic pressure must be higher than diastolic pressure".into(),
            ));
        }
        if let Some(pulse) = self.pulse {
            let (min, max) = PULSE_RANGE;
            if !(min..=max).contains(&pulse) {
                return Err(ClientError::Validation(format!("Pulse must be between {min}-{max} bpm")));
            }
        }
        Ok(())
    }

    pub fn to_wire(&self) -> NewReading {
        NewReading {
            systolic: Some(self.systolic),
            diastolic: Some(self.diastolic),
            pulse: self.pulse,
            notes: Some(self.note.clone()),
            tags: Some(self.tags.iter().cloned().collect()),
            timestamp: Some(self.timestamp),
        }
    }
}

/// Partial edit of a reading; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingUpdate {
    pub systolic: Option<u16>,
    pub diastolic: Option<u16>,
    pub pulse: Option<u16>,
    pub note: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ReadingUpdate {
    pub fn apply(&self, reading: &mut Reading) {
        if let Some(systolic) = self.systolic {
            reading.systolic = systolic;
        }
        if let Some(diastolic) = self.diastolic {
            reading.diastolic = diastolic;
        }
        if self.pulse.is_some() {
            reading.pulse = self.pulse;
        }
        if let Some(note) = &self.note {
            reading.note = note.clone();
        }
        if let Some(tags) = &self.tags {
            reading.tags = tags.clone();
        }
        if let Some(timestamp) = self.timestamp {
            reading.timestamp = timestamp;
        }
    }

    pub fn to_wire(&self) -> NewReading {
        NewReading {
            systolic: self.systolic,
            diastolic: self.diastolic,
            pulse: self.pulse,
            notes: self.note.clone(),
            tags: self.tags.as_ref().map(|tags| tags.iter().cloned().collect()),
            timestamp: self.timestamp,
        }
    }
}

/// Readings (newest first), notes and the streak for one session.
#[derive(Debug, Clone, Default)]
pub struct ReadingCache {
    readings: Vec<Reading>,
    notes: NoteBook,
    streak: StreakTracker,
}

impl ReadingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts keeping newest-first order: the head for a fresh reading,
    /// after any newer entries for a backdated one.
    pub fn insert(&mut self, reading: Reading) {
        self.streak.record(reading.local_date());
        let index = self
            .readings
            .partition_point(|existing| existing.timestamp > reading.timestamp);
        self.readings.insert(index, reading);
    }

    pub fn replace_readings(&mut self, mut readings: Vec<Reading>) {
        readings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        self.readings = readings;
        self.rebuild_streak();
    }

    pub fn get(&self, id: &str) -> Option<&Reading> {
        self.readings.iter().find(|reading| reading.id == id)
    }

    /// Swaps in a new version of a cached reading, re-sorting it and
    /// recomputing the streak. Returns `false` when `id` is not cached.
    pub fn replace(&mut self, id: &str, reading: Reading) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        self.readings.remove(index);
        let index = self
            .readings
            .partition_point(|existing| existing.timestamp > reading.timestamp);
        self.readings.insert(index, reading);
        self.rebuild_streak();
        true
    }

    /// Removing a reading can empty a day, so the streak is rebuilt.
    pub fn remove(&mut self, id: &str) -> Option<Reading> {
        let index = self.position(id)?;
        let removed = self.readings.remove(index);
        self.rebuild_streak();
        Some(removed)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.readings.iter().position(|reading| reading.id == id)
    }

    fn rebuild_streak(&mut self) {
        self.streak = StreakTracker::from_days(self.readings.iter().map(Reading::local_date));
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.readings.first()
    }

    pub fn recent(&self, n: usize) -> &[Reading] {
        &self.readings[..n.min(self.readings.len())]
    }

    pub fn streak_as_of(&self, today: NaiveDate) -> StreakData {
        self.streak.as_of(today)
    }

    pub fn notes(&self) -> &NoteBook {
        &self.notes
    }

    pub fn notes_mut(&mut self) -> &mut NoteBook {
        &mut self.notes
    }

    pub fn clear(&mut self) {
        self.readings.clear();
        self.notes.clear();
        self.streak.clear();
    }
}
