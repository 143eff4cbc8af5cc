//! Search Agent - terminal chat front-end.
//!
//! This is the entry point for the `search-agent` binary.

mod app;
mod ui;

use std::io::{self, Write};
use std::time::Duration;

use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use search_agent_core::{
    AgentConfig, ConversationController, ConversationEvent, Phase, ProviderConfig,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{Interval, MissedTickBehavior};

use app::App;

/// Search Agent - ask questions, watch the answers type out.
#[derive(Parser, Debug)]
#[command(name = "search-agent")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backend endpoint. Without one, answers come from a built-in stub.
    #[arg(long, env = "SEARCH_AGENT_ENDPOINT")]
    endpoint: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, env = "SEARCH_AGENT_TIMEOUT", default_value = "30")]
    timeout: u64,

    /// Simulated latency of the stub backend in milliseconds.
    #[arg(long, default_value = "1600")]
    stub_delay_ms: u64,

    /// Ask a single question, print the answer and exit.
    #[arg(long)]
    ask: Option<String>,

    /// Enable debug logging.
    #[arg(long, default_value = "false")]
    debug: bool,
}

impl Args {
    fn config(&self) -> AgentConfig {
        AgentConfig {
            provider: ProviderConfig {
                endpoint: self.endpoint.clone(),
                request_timeout_seconds: self.timeout,
                stub_delay_ms: self.stub_delay_ms,
            },
            ..Default::default()
        }
    }

    fn backend_label(&self) -> String {
        match self.endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => endpoint.to_string(),
            _ => "stub backend".to_string(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse arguments
    let args = Args::parse();

    // Initialize logging
    if args.debug {
        tracing_subscriber::fmt()
            .with_env_filter("search_agent_cli=debug,search_agent_core=debug,warn")
            .with_writer(std::io::stderr)
            .init();
    }

    // Create controller
    let config = args.config();
    let provider = config.provider.build()?;
    let controller = ConversationController::new(provider, config.typing);

    if let Some(question) = args.ask.as_deref() {
        return run_headless(&controller, question).await;
    }

    // Setup terminal with mouse capture enabled
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app
    let mut app = App::new(controller, args.backend_label());

    // Run the event loop
    let result = run_event_loop(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

/// What woke the event loop.
enum Wake {
    /// Time to read pending terminal input.
    Input,
    /// The controller published a change.
    Controller(Result<ConversationEvent, RecvError>),
}

/// Ticker for terminal input. It keeps its schedule across loop iterations,
/// so a busy controller stream cannot push the next input poll back.
fn input_ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Swap in a ticker with the new period if the tick rate changed.
fn retune(ticker: &mut Interval, period: Duration) {
    if ticker.period() != period {
        *ticker = input_ticker(period);
    }
}

async fn next_wake(
    ticker: &mut Interval,
    events: &mut broadcast::Receiver<ConversationEvent>,
) -> Wake {
    tokio::select! {
        _ = ticker.tick() => Wake::Input,
        event = events.recv() => Wake::Controller(event),
    }
}

/// Main event loop.
///
/// Redraws on every controller event so typing appears character by character.
async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> anyhow::Result<()> {
    let mut events = app.controller().subscribe();
    let mut ticker = input_ticker(app.tick_rate());

    loop {
        // Tick animation frame
        app.tick_animation();

        // Render
        terminal.draw(|f| ui::render(f, app))?;

        // Handle events
        match next_wake(&mut ticker, &mut events).await {
            Wake::Input => {
                while event::poll(Duration::from_millis(0))? {
                    handle_input(app, event::read()?);
                }
            }
            Wake::Controller(event) => app.handle_event(event),
        }

        // Faster ticks while busy keep the spinner smooth
        retune(&mut ticker, app.tick_rate());

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Handle terminal input events.
fn handle_input(app: &mut App, event: Event) {
    match event {
        Event::Key(key) => {
            if key.kind != KeyEventKind::Press {
                return;
            }
            handle_key(app, key.code, key.modifiers);
        }
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::ScrollUp => app.scroll_chat_up(3),
            MouseEventKind::ScrollDown => app.scroll_chat_down(3),
            _ => {}
        },
        _ => {}
    }
}

fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    let ctrl = modifiers.contains(KeyModifiers::CONTROL);

    // Any other key cancels a pending quit
    if code != KeyCode::Esc {
        app.disarm_quit();
    }

    match code {
        KeyCode::Char('c') if ctrl => app.quit(),
        KeyCode::Esc => app.escape(),
        KeyCode::Enter => app.submit(),
        KeyCode::PageUp => app.scroll_chat_up(10),
        KeyCode::PageDown => app.scroll_chat_down(10),
        KeyCode::Char('a') if ctrl => app.move_cursor_start(),
        KeyCode::Char('e') if ctrl => app.move_cursor_end(),
        KeyCode::Char('u') if ctrl => app.clear_input(),
        KeyCode::Char('w') if ctrl => app.delete_word(),
        KeyCode::Char(c) => app.insert_char(c),
        KeyCode::Backspace => app.delete_char(),
        KeyCode::Delete => app.delete_char_forward(),
        KeyCode::Left => app.move_cursor_left(),
        KeyCode::Right => app.move_cursor_right(),
        KeyCode::Home => app.move_cursor_start(),
        KeyCode::End => app.move_cursor_end(),
        _ => {}
    }
}

/// Ask one question and stream the answer to stdout.
///
/// Ctrl-C stops the generation; whatever was typed so far is kept.
async fn run_headless(controller: &ConversationController, question: &str) -> anyhow::Result<()> {
    let mut events = controller.subscribe();
    if !controller.send_question(question) {
        anyhow::bail!("question is empty");
    }

    let mut stdout = io::stdout();
    let mut shown = String::new();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            result = &mut ctrl_c, if !interrupted => {
                result?;
                interrupted = true;
                controller.stop();
            }

            event = events.recv() => match event {
                Ok(ConversationEvent::MessageUpdated(message)) if !message.is_user() && !message.is_loading => {
                    print_progress(&mut stdout, &mut shown, &message.text)?;
                }
                Ok(ConversationEvent::PhaseChanged(Phase::Idle)) | Err(RecvError::Closed) => break,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
            }
        }

        if !controller.is_busy() {
            break;
        }
    }

    if let Some(last) = controller.snapshot().last_assistant() {
        print_progress(&mut stdout, &mut shown, &last.text)?;
    }
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

/// Print whatever part of `text` has not been shown yet.
///
/// When the text was replaced rather than extended (error or stopped
/// message), it is printed on a fresh line.
fn print_progress(out: &mut impl Write, shown: &mut String, text: &str) -> io::Result<()> {
    if let Some(rest) = text.strip_prefix(shown.as_str()) {
        write!(out, "{rest}")?;
    } else {
        write!(out, "\n{text}")?;
    }
    out.flush()?;
    text.clone_into(shown);
    Ok(())
}
