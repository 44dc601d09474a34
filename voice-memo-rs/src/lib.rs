//! voice-memo: a voice-driven personal assistant with spoken reminders.
//!
//! Components:
//! - `resolver`: free-text time expressions → timestamps
//! - `store`: the persisted document (reminders, notes, preferences)
//! - `watcher`: background task that speaks due reminders
//! - `router`: utterance → intent → reply
//! - `search`: spoken web search opened in the browser
//! - `service`: foreground wake-word loop
//! - `speech`: speech input/output collaborators

pub mod clock;
pub mod config;
pub mod error;
pub mod notifier;
pub mod resolver;
pub mod router;
pub mod search;
pub mod service;
pub mod speech;
pub mod store;
pub mod watcher;
