//! Application state.
//!
//! The TUI keeps a mirror of the controller's [`ConversationSnapshot`],
//! updated from [`ConversationEvent`]s, plus purely visual state such as the
//! cursor, scroll position and spinner frame.

use std::time::Duration;

use search_agent_core::{ConversationController, ConversationEvent, ConversationSnapshot, Phase};
use tokio::sync::broadcast::error::RecvError;

/// Tick rate while a generation is running (keeps the spinner and typing smooth).
pub const BUSY_TICK: Duration = Duration::from_millis(50);

/// Tick rate while idle.
pub const IDLE_TICK: Duration = Duration::from_millis(100);

/// Application state.
pub struct App {
    /// Conversation controller.
    controller: ConversationController,
    /// Mirror of the conversation state.
    pub snapshot: ConversationSnapshot,
    /// Cursor position in the input, in characters.
    pub cursor_position: usize,
    /// Chat scroll position (0 = pinned to the newest message).
    pub chat_scroll: usize,
    /// Status message to display.
    pub status_message: Option<String>,
    /// Where answers come from, for the header.
    pub backend_label: String,
    /// Whether the app should quit.
    pub should_quit: bool,
    /// Esc was pressed once while idle; a second Esc quits.
    pub quit_armed: bool,
    /// Animation frame counter for loading indicators.
    pub animation_frame: usize,
}

impl App {
    /// Create a new application.
    #[must_use]
    pub fn new(controller: ConversationController, backend_label: impl Into<String>) -> Self {
        let snapshot = controller.snapshot();
        Self {
            controller,
            snapshot,
            cursor_position: 0,
            chat_scroll: 0,
            status_message: None,
            backend_label: backend_label.into(),
            should_quit: false,
            quit_armed: false,
            animation_frame: 0,
        }
    }

    /// The underlying controller.
    #[must_use]
    pub fn controller(&self) -> &ConversationController {
        &self.controller
    }

    /// Tick the animation frame (call on each render).
    pub fn tick_animation(&mut self) {
        self.animation_frame = self.animation_frame.wrapping_add(1);
    }

    /// Get current spinner character for loading animation.
    #[must_use]
    pub fn spinner_char(&self) -> &'static str {
        const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
        SPINNER[self.animation_frame % SPINNER.len()]
    }

    /// Tick rate for the event loop.
    #[must_use]
    pub fn tick_rate(&self) -> Duration {
        if self.snapshot.is_busy() {
            BUSY_TICK
        } else {
            IDLE_TICK
        }
    }

    /// Set the status message.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    // =========================================================================
    // Controller Events
    // =========================================================================

    /// Apply a controller event to the local mirror.
    pub fn handle_event(&mut self, event: Result<ConversationEvent, RecvError>) {
        match event {
            Ok(ConversationEvent::InputChanged(text)) => {
                self.snapshot.input_text = text;
                self.cursor_position = self.cursor_position.min(self.input_len());
            }
            Ok(ConversationEvent::MessageAppended(message) | ConversationEvent::MessageUpdated(message)) => {
                match self.snapshot.messages.iter_mut().rev().find(|m| m.id == message.id) {
                    Some(existing) => *existing = message,
                    None => self.snapshot.messages.push(message),
                }
                self.chat_scroll = 0;
            }
            Ok(ConversationEvent::PhaseChanged(phase)) => {
                self.snapshot.phase = phase;
                match phase {
                    Phase::Loading => self.set_status("Searching... (Esc to stop)"),
                    Phase::Animating => self.set_status("Answering... (Esc to stop)"),
                    Phase::Idle => self.status_message = None,
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Event subscriber lagged, resyncing");
                self.resync();
            }
            Err(RecvError::Closed) => {
                self.resync();
            }
        }
    }

    /// Replace the mirror with a fresh snapshot.
    pub fn resync(&mut self) {
        self.snapshot = self.controller.snapshot();
        self.cursor_position = self.cursor_position.min(self.input_len());
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Send the current input.
    pub fn submit(&mut self) {
        if self.controller.send() {
            self.cursor_position = 0;
            self.chat_scroll = 0;
            self.resync();
        }
    }

    /// Stop the running generation.
    pub fn stop(&mut self) {
        if self.controller.stop() {
            self.resync();
            self.set_status("Stopped");
        }
    }

    /// Esc: stop a running generation, otherwise quit on the second press.
    pub fn escape(&mut self) {
        if self.snapshot.show_stop_button() {
            self.quit_armed = false;
            self.stop();
        } else if self.quit_armed {
            self.quit();
        } else {
            self.quit_armed = true;
            self.set_status("Press Esc again to quit");
        }
    }

    /// Forget a pending Esc.
    pub fn disarm_quit(&mut self) {
        if self.quit_armed {
            self.quit_armed = false;
            self.status_message = None;
        }
    }

    /// Stop anything in flight and quit.
    pub fn quit(&mut self) {
        self.controller.stop();
        self.should_quit = true;
    }

    // =========================================================================
    // Chat Scrolling
    // =========================================================================

    /// Scroll chat up (view older messages).
    pub fn scroll_chat_up(&mut self, amount: usize) {
        self.chat_scroll = self.chat_scroll.saturating_add(amount);
    }

    /// Scroll chat down (view newer messages).
    pub fn scroll_chat_down(&mut self, amount: usize) {
        self.chat_scroll = self.chat_scroll.saturating_sub(amount);
    }

    // =========================================================================
    // Input Handling
    // =========================================================================

    fn input_len(&self) -> usize {
        self.snapshot.input_text.chars().count()
    }

    /// Byte offset of the cursor within the input.
    fn cursor_byte_index(&self) -> usize {
        self.snapshot
            .input_text
            .char_indices()
            .nth(self.cursor_position)
            .map_or(self.snapshot.input_text.len(), |(i, _)| i)
    }

    /// Push an edited input to the controller, unless input is locked.
    fn edit_input(&mut self, edit: impl FnOnce(&mut String, usize)) -> bool {
        if self.snapshot.is_input_locked() {
            return false;
        }
        let mut input = self.snapshot.input_text.clone();
        edit(&mut input, self.cursor_byte_index());
        self.controller.set_input(input.clone());
        self.snapshot.input_text = input;
        true
    }

    /// Insert a character at the cursor position.
    pub fn insert_char(&mut self, c: char) {
        if self.edit_input(|input, at| input.insert(at, c)) {
            self.cursor_position += 1;
        }
    }

    /// Delete the character before the cursor.
    pub fn delete_char(&mut self) {
        if self.cursor_position == 0 {
            return;
        }
        self.cursor_position -= 1;
        if !self.edit_input(|input, at| {
            input.remove(at);
        }) {
            self.cursor_position += 1;
        }
    }

    /// Delete the character at the cursor.
    pub fn delete_char_forward(&mut self) {
        if self.cursor_position < self.input_len() {
            self.edit_input(|input, at| {
                input.remove(at);
            });
        }
    }

    /// Delete the word before the cursor.
    pub fn delete_word(&mut self) {
        while self.cursor_position > 0 && !self.snapshot.is_input_locked() {
            self.delete_char();
            let prev = self
                .cursor_position
                .checked_sub(1)
                .and_then(|i| self.snapshot.input_text.chars().nth(i));
            if prev == Some(' ') {
                break;
            }
        }
    }

    /// Move cursor left.
    pub fn move_cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    /// Move cursor right.
    pub fn move_cursor_right(&mut self) {
        if self.cursor_position < self.input_len() {
            self.cursor_position += 1;
        }
    }

    /// Move cursor to the start.
    pub fn move_cursor_start(&mut self) {
        self.cursor_position = 0;
    }

    /// Move cursor to the end.
    pub fn move_cursor_end(&mut self) {
        self.cursor_position = self.input_len();
    }

    /// Clear the input.
    pub fn clear_input(&mut self) {
        if self.edit_input(|input, _| input.clear()) {
            self.cursor_position = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use search_agent_core::{StubAnswerProvider, TypingCadence, STOPPED_TEXT};

    use super::*;

    fn app() -> App {
        let controller = ConversationController::new(
            Arc::new(StubAnswerProvider::new(Duration::from_millis(200))),
            TypingCadence::instant(),
        );
        App::new(controller, "stub")
    }

    fn drain_events(app: &mut App, rx: &mut tokio::sync::broadcast::Receiver<ConversationEvent>) {
        while let Ok(event) = rx.try_recv() {
            app.handle_event(Ok(event));
        }
    }

    #[test]
    fn typing_edits_controller_input() {
        let mut app = app();
        for c in "héllo".chars() {
            app.insert_char(c);
        }
        assert_eq!(app.snapshot.input_text, "héllo");
        assert_eq!(app.controller().input_text(), "héllo");
        assert_eq!(app.cursor_position, 5);

        app.move_cursor_left();
        app.move_cursor_left();
        app.delete_char();
        assert_eq!(app.snapshot.input_text, "hélo");
        assert_eq!(app.cursor_position, 2);

        app.move_cursor_start();
        app.delete_char_forward();
        assert_eq!(app.controller().input_text(), "élo");
    }

    #[test]
    fn delete_word_stops_at_space() {
        let mut app = app();
        for c in "search agent".chars() {
            app.insert_char(c);
        }
        app.delete_word();
        assert_eq!(app.snapshot.input_text, "search ");
    }

    #[tokio::test(start_paused = true)]
    async fn submit_locks_input_until_idle() {
        let mut app = app();
        let mut rx = app.controller().subscribe();
        for c in "hello".chars() {
            app.insert_char(c);
        }

        app.submit();
        assert_eq!(app.snapshot.messages.len(), 2);
        assert!(app.snapshot.is_input_locked());
        assert_eq!(app.cursor_position, 0);

        app.insert_char('x');
        assert!(app.snapshot.input_text.is_empty());

        app.controller().clone().wait_until_idle().await;
        drain_events(&mut app, &mut rx);

        assert_eq!(app.snapshot.phase, Phase::Idle);
        assert_eq!(app.snapshot.messages.len(), 2);
        assert_eq!(app.snapshot, app.controller().snapshot());
        assert!(app.status_message.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_finalizes_mirror() {
        let mut app = app();
        app.insert_char('q');
        app.submit();

        app.stop();

        assert_eq!(app.snapshot.phase, Phase::Idle);
        assert_eq!(app.snapshot.messages[1].text, STOPPED_TEXT);
        assert_eq!(app.status_message.as_deref(), Some("Stopped"));
    }

    #[test]
    fn second_escape_quits_when_idle() {
        let mut app = app();

        app.escape();
        assert!(!app.should_quit);
        assert!(app.quit_armed);
        assert_eq!(app.status_message.as_deref(), Some("Press Esc again to quit"));

        app.disarm_quit();
        assert!(!app.quit_armed);
        assert!(app.status_message.is_none());

        app.escape();
        app.escape();
        assert!(app.should_quit);
    }

    #[tokio::test(start_paused = true)]
    async fn escape_stops_while_busy() {
        let mut app = app();
        app.insert_char('q');
        app.submit();

        app.escape();
        assert!(!app.should_quit);
        assert!(!app.quit_armed);
        assert_eq!(app.snapshot.phase, Phase::Idle);
        assert_eq!(app.snapshot.messages[1].text, STOPPED_TEXT);
    }

    #[test]
    fn lagged_subscriber_resyncs() {
        let mut app = app();
        app.controller().set_input("typed elsewhere");
        assert!(app.snapshot.input_text.is_empty());

        app.handle_event(Err(RecvError::Lagged(3)));
        assert_eq!(app.snapshot.input_text, "typed elsewhere");
    }
}
