//! Foreground assistant loop with a wake-word state machine.
//!
//! ASLEEP → AWAKE → ASLEEP

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::router::Router;
use crate::speech::{Heard, SpeechInput, SpeechOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistantState {
    Asleep,
    Awake,
}

impl std::fmt::Display for AssistantState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asleep => write!(f, "ASLEEP"),
            Self::Awake => write!(f, "AWAKE"),
        }
    }
}

pub struct AssistantService {
    router: Router,
    speaker: Arc<dyn SpeechOutput>,
    listener: Box<dyn SpeechInput>,
    state: AssistantState,
}

impl AssistantService {
    pub fn new(
        router: Router,
        speaker: Arc<dyn SpeechOutput>,
        listener: Box<dyn SpeechInput>,
    ) -> Self {
        Self {
            router,
            speaker,
            listener,
            state: AssistantState::Asleep,
        }
    }

    pub fn state(&self) -> AssistantState {
        self.state
    }

    fn transition(&mut self, next: AssistantState) {
        if self.state != next {
            info!("State: {} → {}", self.state, next);
            self.state = next;
        }
    }

    /// Listen, or give up as soon as shutdown is requested.
    async fn listen(&mut self, shutdown: &CancellationToken) -> Option<Heard> {
        tokio::select! {
            _ = shutdown.cancelled() => None,
            heard = self.listener.listen() => Some(heard),
        }
    }

    /// Run until the user says goodbye, input closes, or `shutdown` fires.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        let prefs = self.router.store().preferences();
        self.speaker
            .speak(&format!(
                "Hello {}! Say '{}' when you need me.",
                prefs.user_name, prefs.wake_word
            ))
            .await;

        while !shutdown.is_cancelled() {
            let Some(heard) = self.listen(&shutdown).await else {
                break;
            };

            match self.state {
                AssistantState::Asleep => match heard {
                    Heard::Text(text) => {
                        let wake_word = self.router.store().preferences().wake_word;
                        let Some((_, rest)) = text.split_once(wake_word.as_str()) else {
                            continue;
                        };
                        self.transition(AssistantState::Awake);

                        let rest = rest.trim_start_matches([',', ' ']).trim();
                        if rest.is_empty() {
                            self.speaker.speak("Yes?").await;
                        } else {
                            self.respond(rest, &shutdown).await;
                        }
                    }
                    Heard::Nothing => {}
                    Heard::Closed => break,
                },
                AssistantState::Awake => match heard {
                    Heard::Text(text) => self.respond(&text, &shutdown).await,
                    Heard::Nothing => {
                        self.speaker
                            .speak("I didn't hear anything. Going back to sleep.")
                            .await;
                        self.transition(AssistantState::Asleep);
                    }
                    Heard::Closed => break,
                },
            }
        }

        self.transition(AssistantState::Asleep);
        info!("Assistant loop finished");
    }

    async fn respond(&mut self, command: &str, shutdown: &CancellationToken) {
        let Some(reply) = self.router.handle(command) else {
            return;
        };

        self.speaker.speak(&reply.text).await;
        if reply.shutdown {
            info!("Shutdown requested by user");
            shutdown.cancel();
        }
    }
}
