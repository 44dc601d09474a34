//! Command routing: recognized text → intent → spoken reply.

use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::resolver;
use crate::search::WebSearch;
use crate::store::{Reminder, Store, TIMESTAMP_FORMAT};

const REMINDER_USAGE: &str =
    "Try: 'remind me to [action] at [time]' or 'remind me in [time] to [action]'";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    SetWakeWord(String),
    SetName(String),
    /// Web search; the query may be empty.
    Search(String),
    Remind(String),
    ListReminders,
    AddNote(String),
    ListNotes,
    /// Calendar lookup; `None` means today.
    Calendar(Option<String>),
    Greeting,
    Time,
    Date,
    Shutdown,
    Unknown,
}

impl Intent {
    /// Classify a lowercased utterance. First match wins.
    pub fn parse(command: &str) -> Self {
        let command = command.trim();
        let has_word = |words: &[&str]| command.split_whitespace().any(|w| words.contains(&w));

        if let Some(rest) = command.strip_prefix("set wake word") {
            Self::SetWakeWord(rest.trim().to_string())
        } else if let Some(rest) = command.strip_prefix("set name") {
            Self::SetName(rest.trim().to_string())
        } else if let Some(query) = search_query(command) {
            Self::Search(query)
        } else if command.contains("remind me") || command.contains("set reminder") {
            Self::Remind(command.to_string())
        } else if command.contains("my reminders") || command.contains("show reminders") {
            Self::ListReminders
        } else if command.contains("add note") {
            Self::AddNote(command.replacen("add note", "", 1).trim().to_string())
        } else if command.contains("my notes") || command.contains("show notes") {
            Self::ListNotes
        } else if command.contains("show calendar") {
            Self::Calendar(None)
        } else if let Some((_, day)) = command.rsplit_once("calendar for") {
            Self::Calendar(Some(day.trim().to_string()))
        } else if has_word(&["hello", "hi", "hey"]) {
            Self::Greeting
        } else if has_word(&["time"]) {
            Self::Time
        } else if has_word(&["date"]) || command.contains("what day") {
            Self::Date
        } else if has_word(&["goodbye", "exit", "quit", "stop"]) {
            Self::Shutdown
        } else {
            Self::Unknown
        }
    }
}

/// "search rust traits" or "search for rust traits".
fn search_query(command: &str) -> Option<String> {
    let rest = command.strip_prefix("search")?;
    if !(rest.is_empty() || rest.starts_with(' ')) {
        return None;
    }

    let rest = rest.trim();
    let query = match rest.strip_prefix("for") {
        Some(query) if query.is_empty() || query.starts_with(' ') => query.trim(),
        _ => rest,
    };
    Some(query.to_string())
}

/// A reminder command split into description and time fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderRequest {
    pub what: String,
    pub when: String,
}

impl ReminderRequest {
    /// Split "remind me ..." phrasing on the keywords "in", "to", "about", "at".
    pub fn parse(command: &str) -> Option<Self> {
        let request = |what: &str, when: String| {
            Some(Self {
                what: what.trim().to_string(),
                when,
            })
        };

        // "remind me in 10 minutes to stretch"
        if command.contains(" in ") && (command.contains(" to ") || command.contains(" about ")) {
            let (_, rest) = command.split_once(" in ")?;
            if let Some((time, what)) = rest
                .split_once(" to ")
                .or_else(|| rest.split_once(" about "))
            {
                return request(what, format!("in {}", time.trim()));
            }
        }

        // "remind me to stretch in 10 minutes"
        if command.contains(" to ") && command.contains(" in ") {
            let (_, rest) = command.split_once(" to ")?;
            let (what, time) = rest.split_once(" in ")?;
            return request(what, format!("in {}", time.trim()));
        }

        // "remind me tomorrow at 9 to call the bank", or "remind me to call the bank at 9"
        if let Some((when, what)) = command.split_once(" to ") {
            let when = strip_trigger(when);
            if when.is_empty() {
                if let Some((what, when)) = what.rsplit_once(" at ") {
                    return request(what, when.trim().to_string());
                }
            }
            return request(what, when.to_string());
        }

        // "remind me call the bank at 9am"
        if let Some((what, when)) = command.split_once(" at ") {
            return request(strip_trigger(what), when.trim().to_string());
        }

        None
    }
}

fn strip_trigger(text: &str) -> &str {
    let text = text.trim();
    ["remind me", "set reminder", "set a reminder"]
        .iter()
        .find_map(|trigger| text.strip_prefix(trigger))
        .unwrap_or(text)
        .trim()
}

/// A spoken reply and whether the assistant should shut down after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub shutdown: bool,
}

impl Reply {
    fn say(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            shutdown: false,
        }
    }
}

pub struct Router {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    search: Option<WebSearch>,
}

impl Router {
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            search: None,
        }
    }

    pub fn with_search(mut self, search: WebSearch) -> Self {
        self.search = Some(search);
        self
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Handle one utterance. Returns `None` for empty input.
    pub fn handle(&self, command: &str) -> Option<Reply> {
        let command = command.trim().to_lowercase();
        if command.is_empty() {
            return None;
        }

        let intent = Intent::parse(&command);
        debug!("Intent: {intent:?}");

        let user_name = self.store.preferences().user_name;
        let reply = match intent {
            Intent::SetWakeWord(word) if word.is_empty() => Reply::say("Please tell me the new wake word"),
            Intent::SetWakeWord(word) => {
                self.store.set_wake_word(&word);
                Reply::say(format!("Wake word updated to: {word}"))
            }
            Intent::SetName(name) if name.is_empty() => Reply::say("Please tell me what to call you"),
            Intent::SetName(name) => {
                self.store.set_user_name(&name);
                Reply::say(format!("Okay, I'll call you {name}"))
            }
            Intent::Search(query) => Reply::say(self.search(&query)),
            Intent::Remind(text) => Reply::say(self.remind(&text)),
            Intent::ListReminders => Reply::say(self.show_reminders()),
            Intent::AddNote(text) => Reply::say(match self.store.add_note(&text) {
                Ok(note) => format!("Note added: {}", note.text),
                Err(e) => e.to_string(),
            }),
            Intent::ListNotes => Reply::say(self.show_notes()),
            Intent::Calendar(day) => Reply::say(self.show_calendar(day.as_deref().unwrap_or("today"))),
            Intent::Greeting => Reply::say(format!("Hello {user_name}! How can I help?")),
            Intent::Time => Reply::say(format!("It's {}", self.clock.now().format("%I:%M %p"))),
            Intent::Date => Reply::say(format!("Today is {}", self.clock.now().format("%A, %B %d"))),
            Intent::Shutdown => Reply {
                text: format!("Goodbye {user_name}! Shutting down..."),
                shutdown: true,
            },
            Intent::Unknown => {
                Reply::say("I didn't understand that. Try saying 'remind me to...' or 'add note...'")
            }
        };
        Some(reply)
    }

    fn search(&self, query: &str) -> String {
        if query.is_empty() {
            return "What should I search for?".to_string();
        }
        let Some(search) = &self.search else {
            return "Web search is not available".to_string();
        };

        match search.search(query) {
            Ok(_) => format!("Searching the web for {query}"),
            Err(e) => {
                warn!("Web search failed: {e}");
                "Sorry, I couldn't open the browser".to_string()
            }
        }
    }

    fn remind(&self, command: &str) -> String {
        let Some(request) = ReminderRequest::parse(command) else {
            return REMINDER_USAGE.to_string();
        };
        debug!("Reminder request: {request:?}");

        match self.store.add(&request.what, &request.when) {
            Ok(confirmation) => confirmation,
            Err(e) => e.to_string(),
        }
    }

    fn show_reminders(&self) -> String {
        let reminders = self.store.list();
        if reminders.is_empty() {
            return "You have no reminders set".to_string();
        }

        let now = self.clock.now();
        let mut response = String::from("Your reminders:");
        for (i, reminder) in reminders.iter().enumerate() {
            response.push_str(&format!(
                "\n{}. {} ({})",
                i + 1,
                reminder.what,
                describe_due(reminder, now)
            ));
        }
        response
    }

    fn show_notes(&self) -> String {
        let notes = self.store.notes();
        if notes.is_empty() {
            return "You have no notes".to_string();
        }

        let mut response = String::from("Your notes:");
        for (i, note) in notes.iter().rev().enumerate() {
            let taken = NaiveDateTime::parse_from_str(&note.time, TIMESTAMP_FORMAT)
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|_| note.time.clone());
            response.push_str(&format!("\n{}. {} ({taken})", i + 1, note.text));
        }
        response
    }

    fn show_calendar(&self, day: &str) -> String {
        let Ok(date) = resolver::resolve_date(day, self.clock.now()) else {
            return "I couldn't understand the date you said.".to_string();
        };

        let date_str = date.format("%Y-%m-%d");
        let events = self.store.for_date(date);
        if events.is_empty() {
            return format!("You have no events on {date_str}");
        }

        let mut response = format!("Events for {date_str}:");
        for event in &events {
            if let Ok(when) = event.due_at() {
                response.push_str(&format!("\n- {}: {}", when.format("%I:%M %p"), event.what));
            }
        }
        response
    }
}

/// "in 40 seconds", "in 12 minutes" or "Fri 05:00 PM".
fn describe_due(reminder: &Reminder, now: NaiveDateTime) -> String {
    let Ok(when) = reminder.due_at() else {
        return reminder.when.clone();
    };

    let secs = (when - now).num_seconds();
    if secs < 60 {
        format!("in {} seconds", secs.max(0))
    } else if secs < 3600 {
        format!("in {} minutes", secs / 60)
    } else {
        when.format("%a %I:%M %p").to_string()
    }
}
