//! Free-standing notes. These live only in memory and are never sent to the backend.

use super::error::{ClientError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteCategory {
    #[default]
    General,
    Symptoms,
    Medication,
    Lifestyle,
    Doctor,
    Reminder,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub enabled: bool,
    pub date: DateTime<Utc>,
    pub recurring: Recurrence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: NoteCategory,
    pub tags: BTreeSet<String>,
    pub is_favorite: bool,
    pub reminder: Option<Reminder>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub category: NoteCategory,
    pub tags: BTreeSet<String>,
    pub is_favorite: bool,
    pub reminder: Option<Reminder>,
}

/// Partial update; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<NoteCategory>,
    pub tags: Option<BTreeSet<String>>,
    pub is_favorite: Option<bool>,
    /// `Some(None)` removes the reminder.
    pub reminder: Option<Option<Reminder>>,
}

/// Notes ordered newest first.
#[derive(Debug, Clone, Default)]
pub struct NoteBook {
    notes: Vec<Note>,
}

impl NoteBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, draft: NoteDraft, now: DateTime<Utc>) -> Note {
        let note = Note {
            id: Uuid::new_v4().to_string(),
            title: draft.title,
            content: draft.content,
            category: draft.category,
            tags: draft.tags,
            is_favorite: draft.is_favorite,
            reminder: draft.reminder,
            created_at: now,
            updated_at: now,
        };
        self.notes.insert(0, note.clone());
        note
    }

    pub fn update(&mut self, id: &str, update: NoteUpdate, now: DateTime<Utc>) -> Result<Note> {
        let note = self.find_mut(id)?;
        if let Some(title) = update.title {
            note.title = title;
        }
        if let Some(content) = update.content {
            note.content = content;
        }
        if let Some(category) = update.category {
            note.category = category;
        }
        if let Some(tags) = update.tags {
            note.tags = tags;
        }
        if let Some(is_favorite) = update.is_favorite {
            note.is_favorite = is_favorite;
        }
        if let Some(reminder) = update.reminder {
            note.reminder = reminder;
        }
        note.updated_at = now;
        Ok(note.clone())
    }

    pub fn delete(&mut self, id: &str) -> Result<Note> {
        let index = self
            .notes
            .iter()
            .position(|note| note.id == id)
            .ok_or_else(|| not_found(id))?;
        Ok(self.notes.remove(index))
    }

    /// Flips the favourite flag and returns the new value.
    pub fn toggle_favorite(&mut self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        let note = self.find_mut(id)?;
        note.is_favorite = !note.is_favorite;
        note.updated_at = now;
        Ok(note.is_favorite)
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn all(&self) -> &[Note] {
        &self.notes
    }

    /// Case-insensitive match against title, content and tags.
    pub fn search(&self, query: &str) -> Vec<Note> {
        let query = query.to_lowercase();
        self.filter(|note| {
            note.title.to_lowercase().contains(&query)
                || note.content.to_lowercase().contains(&query)
                || note.tags.iter().any(|tag| tag.to_lowercase().contains(&query))
        })
    }

    pub fn by_category(&self, category: NoteCategory) -> Vec<Note> {
        self.filter(|note| note.category == category)
    }

    pub fn favorites(&self) -> Vec<Note> {
        self.filter(|note| note.is_favorite)
    }

    pub fn with_reminders(&self) -> Vec<Note> {
        self.filter(|note| note.reminder.as_ref().is_some_and(|reminder| reminder.enabled))
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn clear(&mut self) {
        self.notes.clear();
    }

    fn filter(&self, keep: impl Fn(&Note) -> bool) -> Vec<Note> {
        self.notes.iter().filter(|&note| keep(note)).cloned().collect()
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut Note> {
        self.notes
            .iter_mut()
            .find(|note| note.id == id)
            .ok_or_else(|| not_found(id))
    }
}

fn not_found(id: &str) -> ClientError {
    ClientError::NotFound(format!("Note {id} not found"))
}
