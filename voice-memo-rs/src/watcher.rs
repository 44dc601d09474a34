//! Background reminder watcher.
//!
//! Polls the store once per interval, speaks every due reminder and pauses
//! an extra settle delay after a cycle that fired anything, so reminders
//! landing in the same second are not read out back to back at full speed.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::ReminderConfig;
use crate::notifier::Notifier;
use crate::speech::SpeechOutput;
use crate::store::Store;

pub struct ReminderWatcher {
    store: Arc<Store>,
    speaker: Arc<dyn SpeechOutput>,
    clock: Arc<dyn Clock>,
    notifier: Notifier,
    poll_interval: Duration,
    settle_delay: Duration,
}

impl ReminderWatcher {
    pub fn new(
        store: Arc<Store>,
        speaker: Arc<dyn SpeechOutput>,
        clock: Arc<dyn Clock>,
        config: &ReminderConfig,
    ) -> Self {
        Self {
            store,
            speaker,
            clock,
            notifier: Notifier::new(false),
            poll_interval: config.poll_interval(),
            settle_delay: config.settle_delay(),
        }
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    /// One poll cycle. Returns how many reminders fired.
    pub async fn poll_once(&self) -> usize {
        let scan = self.store.take_due(self.clock.now());

        for err in &scan.skipped {
            warn!("Skipping reminder: {err}");
        }

        for reminder in &scan.fired {
            info!("Reminder due: {}", reminder.what);
            self.speaker
                .speak(&format!("Reminder! {}", reminder.what))
                .await;
            self.notifier.notify("Reminder", &reminder.what);
        }

        scan.fired.len()
    }

    /// Poll until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            "Reminder watcher started (poll every {:?}, settle {:?}, notifications {})",
            self.poll_interval,
            self.settle_delay,
            if self.notifier.is_enabled() { "on" } else { "off" }
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let fired = self.poll_once().await;
            let pause = if fired > 0 {
                self.poll_interval + self.settle_delay
            } else {
                self.poll_interval
            };

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        info!("Reminder watcher stopped");
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::AssistantConfig;
    use crate::store::TIMESTAMP_FORMAT;
    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Transcript(Mutex<Vec<String>>);

    impl Transcript {
        fn lines(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SpeechOutput for Transcript {
        async fn speak(&self, text: &str) {
            self.0.lock().unwrap().push(text.to_string());
        }
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        clock: Arc<ManualClock>,
        store: Arc<Store>,
        transcript: Arc<Transcript>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let clock = Arc::new(ManualClock::new(at("2024-01-01 10:00:00")));
            let store = Arc::new(Store::open(
                dir.path().join("assistant_data.json"),
                clock.clone(),
                &AssistantConfig::default(),
            ));
            Self {
                _dir: dir,
                clock,
                store,
                transcript: Arc::new(Transcript::default()),
            }
        }

        fn watcher(&self) -> ReminderWatcher {
            ReminderWatcher::new(
                self.store.clone(),
                self.transcript.clone(),
                self.clock.clone(),
                &ReminderConfig::default(),
            )
        }
    }

    #[tokio::test]
    async fn same_cycle_fires_everything_due() {
        let fx = Fixture::new();
        fx.store.add("stand up", "in 1 second").unwrap();
        fx.store.add("sit down", "in 2 seconds").unwrap();
        let watcher = fx.watcher();

        assert_eq!(watcher.poll_once().await, 0);

        fx.clock.set(at("2024-01-01 10:00:02"));
        assert_eq!(watcher.poll_once().await, 2);
        assert_eq!(
            fx.transcript.lines(),
            ["Reminder! stand up", "Reminder! sit down"]
        );
        assert!(fx.store.list().is_empty());

        assert_eq!(watcher.poll_once().await, 0);
        assert_eq!(fx.transcript.lines().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn run_fires_once_and_stops_on_cancel() {
        let fx = Fixture::new();
        fx.store.add("take out trash", "in 5 minutes").unwrap();

        let shutdown = CancellationToken::new();
        let handle = fx.watcher().spawn(shutdown.clone());

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(fx.transcript.lines().is_empty());

        fx.clock.set(at("2024-01-01 10:05:00"));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fx.transcript.lines(), ["Reminder! take out trash"]);
        assert!(fx.store.list().is_empty());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fx.transcript.lines().len(), 1);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("watcher should stop promptly")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn settle_pause_delays_next_poll() {
        let fx = Fixture::new();
        fx.store.add("first", "in 1 second").unwrap();
        fx.store.add("second", "in 1 hour").unwrap();

        let shutdown = CancellationToken::new();
        fx.clock.set(at("2024-01-01 10:00:01"));
        let handle = fx.watcher().spawn(shutdown.clone());

        // First poll at t=0 fires "first"; next poll waits 1s + 2s settle.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fx.transcript.lines(), ["Reminder! first"]);

        fx.clock.set(at("2024-01-01 11:00:01"));
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(fx.transcript.lines().len(), 1);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(
            fx.transcript.lines(),
            ["Reminder! first", "Reminder! second"]
        );

        shutdown.cancel();
        handle.await.unwrap();
    }
}
