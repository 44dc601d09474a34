//! Persisted assistant state: reminders, notes and preferences.
//!
//! The whole document lives behind one mutex and is written to disk in full
//! on every mutation, while the lock is still held. The foreground router and
//! the reminder watcher share a single `Arc<Store>`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::AssistantConfig;
use crate::error::{ScanError, StorageError, UserError};
use crate::resolver;

/// On-disk timestamp layout for reminders and notes.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// A one-shot spoken reminder.
///
/// Timestamps stay in their persisted text form so one bad entry in the data
/// file cannot take the rest of the document down with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub what: String,
    pub when: String,
    pub created: String,
}

impl Reminder {
    pub fn new(what: impl Into<String>, when: NaiveDateTime, created: NaiveDateTime) -> Self {
        Self {
            what: what.into(),
            when: format_timestamp(when),
            created: format_timestamp(created),
        }
    }

    /// Parsed due time.
    pub fn due_at(&self) -> Result<NaiveDateTime, ScanError> {
        NaiveDateTime::parse_from_str(&self.when, TIMESTAMP_FORMAT).map_err(|source| {
            ScanError::MalformedTimestamp {
                what: self.what.clone(),
                when: self.when.clone(),
                source,
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub text: String,
    pub time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub wake_word: String,
    pub user_name: String,
}

/// The persisted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantData {
    pub reminders: Vec<Reminder>,
    pub notes: Vec<Note>,
    pub preferences: Preferences,
}

impl AssistantData {
    fn seeded(config: &AssistantConfig) -> Self {
        Self {
            preferences: Preferences {
                wake_word: config.wake_word.to_lowercase(),
                user_name: config.user_name.clone(),
            },
            ..Self::default()
        }
    }

    /// Fill blank preferences from config; stored values win.
    fn apply_defaults(&mut self, config: &AssistantConfig) {
        if self.preferences.wake_word.trim().is_empty() {
            self.preferences.wake_word = config.wake_word.to_lowercase();
        }
        if self.preferences.user_name.trim().is_empty() {
            self.preferences.user_name = config.user_name.clone();
        }
    }

    /// Remove the first reminder equal to `reminder`.
    fn remove_reminder(&mut self, reminder: &Reminder) -> bool {
        match self.reminders.iter().position(|r| r == reminder) {
            Some(index) => {
                self.reminders.remove(index);
                true
            }
            None => false,
        }
    }
}

/// Read and parse a data file.
pub fn load_data(path: &Path) -> Result<AssistantData, StorageError> {
    let contents = fs::read_to_string(path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| StorageError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `data` to `path` via a sibling temp file and rename.
pub fn save_data(path: &Path, data: &AssistantData) -> Result<(), StorageError> {
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let json = serde_json::to_string_pretty(data)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}

/// Outcome of one due-reminder scan.
#[derive(Debug, Default)]
pub struct DueScan {
    /// Due reminders, already removed from the store, in store order.
    pub fired: Vec<Reminder>,
    /// Entries whose time could not be read; left in place.
    pub skipped: Vec<ScanError>,
}

pub struct Store {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    data: Mutex<AssistantData>,
}

impl Store {
    /// Open the data file at `path`.
    ///
    /// A missing, unreadable or corrupt file yields an empty document seeded
    /// with the configured preferences; startup never fails here.
    pub fn open(path: impl Into<PathBuf>, clock: Arc<dyn Clock>, config: &AssistantConfig) -> Self {
        let path = path.into();

        let data = if path.exists() {
            match load_data(&path) {
                Ok(mut data) => {
                    data.apply_defaults(config);
                    info!(
                        "Loaded {} reminder(s) and {} note(s) from {}",
                        data.reminders.len(),
                        data.notes.len(),
                        path.display()
                    );
                    data
                }
                Err(e) => {
                    warn!("{e}, starting with an empty store");
                    AssistantData::seeded(config)
                }
            }
        } else {
            info!("No data file at {}, starting fresh", path.display());
            AssistantData::seeded(config)
        };

        Self {
            path,
            clock,
            data: Mutex::new(data),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, AssistantData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write-through; a failed save keeps the in-memory change.
    fn persist(&self, data: &AssistantData) {
        match save_data(&self.path, data) {
            Ok(()) => debug!("Saved assistant data to {}", self.path.display()),
            Err(e) => warn!("Failed to save assistant data: {e}"),
        }
    }

    /// Write the current document to disk.
    pub fn flush(&self) {
        let data = self.lock();
        self.persist(&data);
    }

    /// Copy of the whole document.
    pub fn snapshot(&self) -> AssistantData {
        self.lock().clone()
    }

    // --- Reminders ---

    /// Schedule a reminder and return the confirmation to speak.
    pub fn add(&self, what: &str, when_text: &str) -> Result<String, UserError> {
        let what = what.trim();
        if what.is_empty() {
            return Err(UserError::MissingDescription);
        }

        // One whole-second sample for resolution, the past check and the reply.
        let now = self.clock.now();
        let now = now.with_nanosecond(0).unwrap_or(now);
        let when = resolver::resolve(when_text, now)?;
        if when <= now {
            return Err(UserError::PastTime);
        }

        {
            let mut data = self.lock();
            data.reminders.push(Reminder::new(what, when, now));
            self.persist(&data);
        }
        info!("Reminder scheduled for {}: {what}", format_timestamp(when));

        let secs = (when - now).num_seconds();
        let message = if secs < 60 {
            format!("I'll remind you to {what} in {secs} seconds")
        } else if secs < 3600 {
            format!("I'll remind you to {what} in {} minutes", secs / 60)
        } else {
            format!(
                "Reminder set for {} to {what}",
                when.format("%I:%M %p on %A")
            )
        };
        Ok(message)
    }

    /// All reminders, earliest first. Entries with unreadable times sort last.
    pub fn list(&self) -> Vec<Reminder> {
        let mut reminders = self.lock().reminders.clone();
        reminders.sort_by_key(|r| match r.due_at() {
            Ok(when) => (false, Some(when)),
            Err(_) => (true, None),
        });
        reminders
    }

    /// Remove the first reminder structurally equal to `reminder`.
    pub fn remove(&self, reminder: &Reminder) -> bool {
        let mut data = self.lock();
        let removed = data.remove_reminder(reminder);
        if removed {
            self.persist(&data);
        }
        removed
    }

    /// Reminders due on `date`, by time of day.
    pub fn for_date(&self, date: NaiveDate) -> Vec<Reminder> {
        let data = self.lock();
        let mut events: Vec<(NaiveDateTime, Reminder)> = data
            .reminders
            .iter()
            .filter_map(|r| r.due_at().ok().map(|when| (when, r.clone())))
            .filter(|(when, _)| when.date() == date)
            .collect();
        events.sort_by_key(|(when, _)| *when);
        events.into_iter().map(|(_, r)| r).collect()
    }

    /// Remove and return every reminder due at or before `now`.
    ///
    /// Scan, removal and the single save all happen under one lock, so a
    /// reminder can be handed out at most once.
    pub fn take_due(&self, now: NaiveDateTime) -> DueScan {
        let mut data = self.lock();
        let mut scan = DueScan::default();

        for reminder in &data.reminders {
            match reminder.due_at() {
                Ok(when) if when <= now => scan.fired.push(reminder.clone()),
                Ok(_) => {}
                Err(e) => scan.skipped.push(e),
            }
        }

        if !scan.fired.is_empty() {
            for reminder in &scan.fired {
                data.remove_reminder(reminder);
            }
            self.persist(&data);
        }

        scan
    }

    // --- Notes ---

    pub fn add_note(&self, text: &str) -> Result<Note, UserError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(UserError::EmptyNote);
        }

        let note = Note {
            text: text.to_string(),
            time: format_timestamp(self.clock.now()),
        };
        let mut data = self.lock();
        data.notes.push(note.clone());
        self.persist(&data);
        Ok(note)
    }

    /// Notes in the order they were taken.
    pub fn notes(&self) -> Vec<Note> {
        self.lock().notes.clone()
    }

    // --- Preferences ---

    pub fn preferences(&self) -> Preferences {
        self.lock().preferences.clone()
    }

    pub fn set_wake_word(&self, wake_word: &str) {
        let mut data = self.lock();
        data.preferences.wake_word = wake_word.trim().to_lowercase();
        self.persist(&data);
    }

    pub fn set_user_name(&self, user_name: &str) {
        let mut data = self.lock();
        data.preferences.user_name = user_name.trim().to_string();
        self.persist(&data);
    }
}
