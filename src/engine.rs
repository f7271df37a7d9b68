//! Conversational state engine for the shopping chat widget.
//!
//! The engine owns the transcript and the quick actions offered for the most
//! recent bot message. At most one chat request is in flight at a time.

use crate::chat_transport::ChatTransport;
use crate::config::ChatConfig;
use crate::intent::IntentRecognizer;
use crate::transcript::Transcript;
use crate::types::{ChatReply, QuickAction, QuickActionSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const CONNECTION_FALLBACK: &str =
    "Sorry, I'm having trouble connecting to the server. Please try again later.";

pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, target: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Awaiting,
}

#[derive(Debug, Default)]
pub struct ConversationState {
    pub transcript: Transcript,
    pub quick_actions: QuickActionSet,
    pub phase: Phase,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("a message is already awaiting a reply")]
    Busy,
}

/// Outcome of choosing a quick action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The action was not on offer (already consumed or replaced).
    Ignored,
    Navigated(String),
    Dismissed,
    Submitted(String),
}

/// Delayed navigation; aborted when dropped.
pub struct RedirectTimer {
    target: String,
    handle: JoinHandle<()>,
}

impl RedirectTimer {
    fn schedule(navigator: Arc<dyn Navigator>, target: String, delay: Duration) -> Self {
        let task_target = target.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            info!(target = %task_target, "engine: redirecting");
            navigator.navigate(&task_target);
        });
        Self { target, handle }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn is_pending(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for RedirectTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub greeting: String,
    pub checkout_path: String,
    pub redirect_delay: Duration,
}

impl From<&ChatConfig> for EngineSettings {
    fn from(cfg: &ChatConfig) -> Self {
        Self {
            greeting: cfg.greeting.clone(),
            checkout_path: cfg.checkout_path.clone(),
            redirect_delay: Duration::from_millis(cfg.redirect_delay_ms),
        }
    }
}

pub struct Engine<T> {
    state: ConversationState,
    transport: T,
    recognizer: IntentRecognizer,
    navigator: Arc<dyn Navigator>,
    settings: EngineSettings,
    redirect: Option<RedirectTimer>,
}

impl<T: ChatTransport> Engine<T> {
    /// Starts a session and greets the shopper.
    pub fn open(
        transport: T,
        recognizer: IntentRecognizer,
        navigator: Arc<dyn Navigator>,
        settings: EngineSettings,
    ) -> Self {
        let mut state = ConversationState::default();
        if !settings.greeting.trim().is_empty() {
            state.transcript.push_bot(settings.greeting.clone());
        }
        Self {
            state,
            transport,
            recognizer,
            navigator,
            settings,
            redirect: None,
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn pending_redirect(&self) -> Option<&RedirectTimer> {
        self.redirect.as_ref().filter(|timer| timer.is_pending())
    }

    /// Records user input and returns the text to send, or `None` for blank input.
    pub fn on_user_input(&mut self, text: &str) -> Result<Option<String>, EngineError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        if self.state.phase == Phase::Awaiting {
            warn!("engine: input rejected while awaiting a reply");
            return Err(EngineError::Busy);
        }

        self.state.transcript.push_user(text);
        self.state.quick_actions.clear();
        self.state.phase = Phase::Awaiting;
        Ok(Some(text.to_string()))
    }

    pub fn on_bot_response(&mut self, reply: ChatReply) {
        self.state.transcript.push_bot(reply.response.as_str());

        if let Some(target) = reply.redirect.filter(|target| !target.trim().is_empty()) {
            self.state
                .transcript
                .push_bot(format!("Taking you to checkout ({target})..."));
            debug!(%target, delay_ms = self.settings.redirect_delay.as_millis() as u64, "engine: redirect scheduled");
            // Replacing the handle drops, and so aborts, any earlier timer.
            self.redirect = Some(RedirectTimer::schedule(
                self.navigator.clone(),
                target,
                self.settings.redirect_delay,
            ));
        }

        self.state.quick_actions = self.recognizer.recognize(&reply.response);
        self.state.phase = Phase::Idle;
    }

    pub fn on_transport_failure(&mut self) {
        self.state.transcript.push_bot(CONNECTION_FALLBACK);
        self.state.quick_actions.clear();
        self.state.phase = Phase::Idle;
    }

    /// Runs one full round trip for `text`.
    pub async fn submit(&mut self, text: &str) -> Result<(), EngineError> {
        let message = match self.on_user_input(text)? {
            Some(message) => message,
            None => return Ok(()),
        };

        match self.transport.send(&message).await {
            Ok(reply) => self.on_bot_response(reply),
            Err(err) => {
                warn!(error = %err, "engine: chat transport failed");
                self.on_transport_failure();
            }
        }
        Ok(())
    }

    pub async fn select_quick_action(
        &mut self,
        action: &QuickAction,
    ) -> Result<Selection, EngineError> {
        if !self.state.quick_actions.contains(action) {
            debug!(?action, "engine: quick action no longer offered");
            return Ok(Selection::Ignored);
        }
        self.state.quick_actions.clear();

        match action {
            QuickAction::Checkout => {
                self.state.transcript.push_user("Checkout");
                self.redirect = None;
                let target = self.settings.checkout_path.clone();
                self.navigator.navigate(&target);
                Ok(Selection::Navigated(target))
            }
            QuickAction::ContinueShopping => Ok(Selection::Dismissed),
            QuickAction::ConfirmOrder(_) | QuickAction::CancelOrder(_) => {
                let text = action.follow_up_text().unwrap_or_default();
                self.submit(&text).await?;
                Ok(Selection::Submitted(text))
            }
        }
    }

    /// Tears the session down, cancelling any scheduled redirect.
    pub fn close(&mut self) {
        if let Some(timer) = self.redirect.take() {
            if timer.is_pending() {
                info!(target = %timer.target(), "engine: cancelled pending redirect");
            }
        }
    }
}
