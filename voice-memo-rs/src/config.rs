//! Configuration management for voice-memo-rs.
//!
//! Loads config from YAML files in standard locations. Every section and
//! field is optional and falls back to its default.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub wake_word: String,
    pub user_name: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            wake_word: "hey assistant".into(),
            user_name: "User".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// Seconds to wait for an utterance; 0 waits forever.
    pub timeout: f64,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self { timeout: 10.0 }
    }
}

impl ListenConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout > 0.0).then(|| Duration::from_secs_f64(self.timeout))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechBackend {
    #[default]
    Console,
    Command,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub backend: SpeechBackend,
    pub command: String,
    pub args: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            backend: SpeechBackend::Console,
            command: "espeak-ng".into(),
            args: vec!["-s".into(), "170".into()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    pub poll_interval_ms: u64,
    pub settle_delay_ms: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            settle_delay_ms: 2000,
        }
    }
}

impl ReminderConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_file: Option<PathBuf>,
}

impl StorageConfig {
    /// Configured data file, else `<data dir>/voice-memo/assistant_data.json`,
    /// else `./assistant_data/assistant_data.json`.
    pub fn data_file(&self) -> PathBuf {
        self.data_file.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("voice-memo"))
                .unwrap_or_else(|| PathBuf::from("assistant_data"))
                .join("assistant_data.json")
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Base URL; the query is appended as `q`.
    pub engine: String,
    pub opener: String,
    pub args: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            engine: "https://www.google.com/search".into(),
            opener: "xdg-open".into(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub notifications: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub assistant: AssistantConfig,
    pub listen: ListenConfig,
    pub speech: SpeechConfig,
    pub reminders: ReminderConfig,
    pub storage: StorageConfig,
    pub search: SearchConfig,
    pub feedback: FeedbackConfig,
}

impl Config {
    /// Load configuration from YAML file.
    ///
    /// Searches standard locations if no path is provided:
    /// 1. ./config.yaml
    /// 2. ~/.config/voice-memo/config.yaml
    /// 3. /etc/voice-memo/config.yaml
    pub fn load(path: Option<&Path>) -> Self {
        let resolved = path.map(PathBuf::from).or_else(|| {
            let candidates = [
                std::env::current_dir().ok().map(|d| d.join("config.yaml")),
                dirs::home_dir().map(|h| h.join(".config/voice-memo/config.yaml")),
                Some(PathBuf::from("/etc/voice-memo/config.yaml")),
            ];
            candidates.into_iter().flatten().find(|p| p.exists())
        });

        let Some(config_path) = resolved else {
            info!("No config file found, using defaults");
            return Self::default();
        };

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match Self::from_yaml(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", config_path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", config_path.display());
                Self::default()
            }
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = Config::from_yaml(
            "assistant:\n  user_name: Ada\nspeech:\n  backend: command\nreminders:\n  poll_interval_ms: 250\n",
        )
        .unwrap();

        assert_eq!(config.assistant.user_name, "Ada");
        assert_eq!(config.assistant.wake_word, "hey assistant");
        assert_eq!(config.speech.backend, SpeechBackend::Command);
        assert_eq!(config.speech.command, "espeak-ng");
        assert_eq!(config.reminders.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.reminders.settle_delay(), Duration::from_secs(2));
        assert!(!config.feedback.notifications);
        assert_eq!(config.search.engine, "https://www.google.com/search");
        assert_eq!(config.search.opener, "xdg-open");
    }

    #[test]
    fn zero_listen_timeout_waits_forever() {
        let config = Config::from_yaml("listen:\n  timeout: 0\n").unwrap();
        assert_eq!(config.listen.timeout(), None);
        assert_eq!(ListenConfig::default().timeout(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn explicit_data_file_wins() {
        let storage = StorageConfig {
            data_file: Some(PathBuf::from("/tmp/memo.json")),
        };
        assert_eq!(storage.data_file(), PathBuf::from("/tmp/memo.json"));
        assert!(StorageConfig::default()
            .data_file()
            .ends_with("assistant_data.json"));
    }
}
