//! Conversation controller.
//!
//! Owns the message list and the [`Phase`] state machine, runs one
//! generation (fetch + typing animation) at a time, and publishes every
//! change as a [`ConversationEvent`].
//!
//! A generation is a spawned task holding a [`CancellationToken`]. Every
//! mutation the task makes is applied under the state lock and only while its
//! token is still live. [`ConversationController::stop`] cancels the token
//! under that same lock, so once `stop` returns the task can no longer touch
//! visible state.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

use crate::conversation::{ConversationEvent, ConversationSnapshot, Phase};
use crate::ids::MessageId;
use crate::message::{Message, Role};
use crate::provider::{AnswerProvider, StubAnswerProvider};
use crate::typing::TypingCadence;

/// Text shown when a generation is stopped before any answer text arrived.
pub const STOPPED_TEXT: &str = "Generation stopped.";

/// Capacity of the event channel. Slow subscribers lag and re-read the snapshot.
const EVENT_CAPACITY: usize = 1024;

/// The generation currently in flight.
#[derive(Debug)]
struct RunningGeneration {
    id: u64,
    token: CancellationToken,
}

/// How a generation ended.
#[derive(Debug)]
enum Outcome {
    Completed,
    Cancelled,
    Failed(String),
}

#[derive(Debug)]
struct State {
    input_text: String,
    messages: Vec<Message>,
    phase: Phase,
    running: Option<RunningGeneration>,
    next_generation: u64,
    events: broadcast::Sender<ConversationEvent>,
}

impl State {
    fn emit(&self, event: ConversationEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            self.phase = phase;
            self.emit(ConversationEvent::PhaseChanged(phase));
        }
    }

    fn set_input(&mut self, text: String) {
        if self.input_text != text {
            self.input_text.clone_from(&text);
            self.emit(ConversationEvent::InputChanged(text));
        }
    }

    fn append(&mut self, message: Message) {
        self.messages.push(message.clone());
        self.emit(ConversationEvent::MessageAppended(message));
    }

    fn update_message(&mut self, id: MessageId, f: impl FnOnce(&mut Message)) -> bool {
        let updated = match self.messages.iter_mut().rev().find(|m| m.id == id) {
            Some(message) => {
                f(message);
                message.clone()
            }
            None => return false,
        };
        self.emit(ConversationEvent::MessageUpdated(updated));
        true
    }

    fn in_flight_message(&self, id: MessageId) -> bool {
        self.messages
            .iter()
            .rev()
            .any(|m| m.id == id && m.is_in_flight())
    }

    fn release(&mut self, generation: u64) -> bool {
        if self.running.as_ref().is_some_and(|g| g.id == generation) {
            self.running = None;
            true
        } else {
            false
        }
    }

    fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            input_text: self.input_text.clone(),
            messages: self.messages.clone(),
            phase: self.phase,
        }
    }
}

struct Shared {
    state: Mutex<State>,
    provider: Arc<dyn AnswerProvider>,
    cadence: TypingCadence,
}

impl Shared {
    /// Run `f` on the state unless `token` has been cancelled.
    fn apply_if_live<R>(
        &self,
        token: &CancellationToken,
        f: impl FnOnce(&mut State) -> R,
    ) -> Option<R> {
        let mut state = self.state.lock();
        if token.is_cancelled() {
            return None;
        }
        Some(f(&mut state))
    }

    /// Spawn the generation task and a watcher that turns a panicked task into
    /// a failed answer, so the phase never sticks in `Loading`.
    fn supervise(
        self: Arc<Self>,
        generation: u64,
        token: CancellationToken,
        message_id: MessageId,
        question: String,
    ) {
        let task = tokio::spawn(Arc::clone(&self).run_generation(
            generation,
            token.clone(),
            message_id,
            question,
        ));

        tokio::spawn(async move {
            if let Err(e) = task.await {
                tracing::error!(generation, error = %e, "Generation task aborted");
                self.finish(
                    generation,
                    &token,
                    message_id,
                    Outcome::Failed("the answer could not be generated".to_string()),
                );
            }
        });
    }

    async fn run_generation(
        self: Arc<Self>,
        generation: u64,
        token: CancellationToken,
        message_id: MessageId,
        question: String,
    ) {
        let fetched = tokio::select! {
            biased;
            () = token.cancelled() => None,
            result = self.provider.ask(&question) => Some(result),
        };

        let outcome = match fetched {
            None => Outcome::Cancelled,
            Some(Err(e)) => Outcome::Failed(e.to_string()),
            Some(Ok(answer)) => {
                if self.animate(&answer, message_id, &token).await {
                    Outcome::Completed
                } else {
                    Outcome::Cancelled
                }
            }
        };

        self.finish(generation, &token, message_id, outcome);
    }

    /// Type `answer` into the message one character at a time.
    ///
    /// Returns `false` if the generation was cancelled before the last
    /// character was written. Partial text is left for the stop path.
    async fn animate(&self, answer: &str, message_id: MessageId, token: &CancellationToken) -> bool {
        let started = self.apply_if_live(token, |state| {
            let found = state.update_message(message_id, |m| {
                m.is_loading = false;
                m.is_animating = true;
                m.text.clear();
            });
            if found {
                state.set_phase(Phase::Animating);
            }
            found
        });
        if started != Some(true) {
            return false;
        }

        let mut typed = String::with_capacity(answer.len());
        for ch in answer.chars() {
            if token.is_cancelled() {
                return false;
            }

            typed.push(ch);
            let written = self.apply_if_live(token, |state| {
                state.update_message(message_id, |m| m.text.clone_from(&typed))
            });
            if written != Some(true) {
                return false;
            }

            let delay = self.cadence.delay_for(ch);
            if delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::select! {
                    biased;
                    () = token.cancelled() => return false,
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }

        true
    }

    fn finish(
        &self,
        generation: u64,
        token: &CancellationToken,
        message_id: MessageId,
        outcome: Outcome,
    ) {
        let mut state = self.state.lock();

        match outcome {
            Outcome::Cancelled => {
                // stop() usually got here first; only finish what it left behind.
                if state.in_flight_message(message_id) {
                    state.update_message(message_id, |m| m.finalize_stopped(STOPPED_TEXT));
                }
                if state.release(generation) {
                    state.set_phase(Phase::Idle);
                }
                tracing::debug!(message_id = %message_id, "Generation cancelled");
            }
            _ if token.is_cancelled() => {
                // Stopped or superseded after the work finished; the canceller owns the message.
                state.release(generation);
            }
            Outcome::Failed(description) => {
                tracing::warn!(message_id = %message_id, error = %description, "Answer provider failed");
                state.update_message(message_id, |m| m.finalize_failed(&description));
                state.release(generation);
                state.set_phase(Phase::Idle);
            }
            Outcome::Completed => {
                state.update_message(message_id, |m| {
                    m.is_loading = false;
                    m.is_animating = false;
                });
                state.release(generation);
                state.set_phase(Phase::Idle);
                tracing::debug!(message_id = %message_id, "Generation complete");
            }
        }
    }
}

/// Drives a single conversation with the search agent.
///
/// Cloning yields another handle to the same conversation.
#[derive(Clone)]
pub struct ConversationController {
    shared: Arc<Shared>,
}

impl ConversationController {
    /// Create a controller that asks `provider` and types answers with `cadence`.
    #[must_use]
    pub fn new(provider: Arc<dyn AnswerProvider>, cadence: TypingCadence) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let state = State {
            input_text: String::new(),
            messages: Vec::new(),
            phase: Phase::Idle,
            running: None,
            next_generation: 0,
            events,
        };

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                provider,
                cadence,
            }),
        }
    }

    /// Create a controller backed by the stub provider with default timings.
    #[must_use]
    pub fn with_stub() -> Self {
        Self::new(
            Arc::new(StubAnswerProvider::default()),
            TypingCadence::default(),
        )
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Replace the input buffer.
    pub fn set_input(&self, text: impl Into<String>) {
        self.shared.state.lock().set_input(text.into());
    }

    /// Send the current input buffer.
    ///
    /// Returns `false` without changing anything if the input is blank or a
    /// generation is already in progress.
    pub fn send(&self) -> bool {
        let input = self.shared.state.lock().input_text.clone();
        self.send_question(&input)
    }

    /// Send `question` directly, bypassing the input buffer.
    ///
    /// Must be called from within a tokio runtime. Returns `false` without
    /// changing anything if the trimmed question is empty or a generation is
    /// already in progress.
    pub fn send_question(&self, question: &str) -> bool {
        let question = question.trim();
        if question.is_empty() {
            return false;
        }

        let mut state = self.shared.state.lock();
        if state.phase.is_busy() {
            tracing::debug!(phase = ?state.phase, "Ignoring send while busy");
            return false;
        }

        state.set_input(String::new());
        state.append(Message::user(question));
        let placeholder = Message::assistant_placeholder();
        let message_id = placeholder.id;
        state.append(placeholder);
        state.set_phase(Phase::Loading);

        if let Some(previous) = state.running.take() {
            tracing::warn!(generation = previous.id, "Cancelling stale generation");
            previous.token.cancel();
        }

        state.next_generation += 1;
        let generation = state.next_generation;
        let token = CancellationToken::new();
        state.running = Some(RunningGeneration {
            id: generation,
            token: token.clone(),
        });

        tracing::debug!(
            generation,
            message_id = %message_id,
            question_len = question.len(),
            "Starting generation"
        );

        Arc::clone(&self.shared).supervise(generation, token, message_id, question.to_string());

        true
    }

    /// Stop the running generation, if any.
    ///
    /// The in-flight assistant message is finalized immediately: flags are
    /// cleared and an empty answer is replaced with [`STOPPED_TEXT`]. Returns
    /// `true` if there was anything to stop.
    pub fn stop(&self) -> bool {
        let mut state = self.shared.state.lock();

        let running = state.running.take();
        if let Some(generation) = &running {
            generation.token.cancel();
        }

        let in_flight = state
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant && m.is_in_flight())
            .map(|m| m.id);
        if let Some(id) = in_flight {
            state.update_message(id, |m| m.finalize_stopped(STOPPED_TEXT));
        }

        let was_busy = state.phase.is_busy();
        state.set_phase(Phase::Idle);

        let stopped = running.is_some() || in_flight.is_some() || was_busy;
        if stopped {
            tracing::info!(generation = running.map(|g| g.id), "Generation stopped");
        }
        stopped
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Subscribe to change notifications.
    ///
    /// A subscriber that falls behind receives `RecvError::Lagged` and should
    /// re-read [`snapshot`](Self::snapshot).
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.shared.state.lock().events.subscribe()
    }

    /// Copy of the full conversation state.
    #[must_use]
    pub fn snapshot(&self) -> ConversationSnapshot {
        self.shared.state.lock().snapshot()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.shared.state.lock().phase
    }

    /// Copy of the messages in display order.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.shared.state.lock().messages.clone()
    }

    /// Copy of the input buffer.
    #[must_use]
    pub fn input_text(&self) -> String {
        self.shared.state.lock().input_text.clone()
    }

    /// Whether a generation is in progress.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.phase().is_busy()
    }

    /// Whether the input field should reject edits.
    #[must_use]
    pub fn is_input_locked(&self) -> bool {
        self.is_busy()
    }

    /// Whether the stop button should be shown.
    #[must_use]
    pub fn show_stop_button(&self) -> bool {
        self.is_busy()
    }

    /// Whether [`send`](Self::send) would start a generation.
    #[must_use]
    pub fn can_send(&self) -> bool {
        self.snapshot().can_send()
    }

    /// Wait until the phase is idle.
    pub async fn wait_until_idle(&self) {
        let mut events = self.subscribe();
        loop {
            if !self.is_busy() {
                return;
            }
            match events.recv().await {
                Ok(ConversationEvent::PhaseChanged(Phase::Idle)) | Err(RecvError::Closed) => {
                    return;
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
            }
        }
    }
}

impl std::fmt::Debug for ConversationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("ConversationController")
            .field("phase", &state.phase)
            .field("messages", &state.messages.len())
            .field("generation", &state.running.as_ref().map(|g| g.id))
            .finish_non_exhaustive()
    }
}
