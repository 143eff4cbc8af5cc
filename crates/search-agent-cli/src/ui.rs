//! UI rendering with ratatui.
//!
//! Single-column chat layout: header, conversation, input line, status bar.

use chrono::Local;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap,
};
use ratatui::Frame;
use search_agent_core::{Message, Phase};

use crate::app::App;

/// Horizontal padding inside the chat area.
const CHAT_PADDING: u16 = 1;

/// Render the UI.
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header bar
            Constraint::Min(3),    // Conversation
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_header_bar(frame, app, main_layout[0]);
    render_chat_column(frame, app, main_layout[1]);
    render_status_bar(frame, app, main_layout[2]);
}

fn render_header_bar(frame: &mut Frame, app: &App, area: Rect) {
    let header = Line::from(vec![
        Span::styled(" Search Agent ", Style::default().fg(Color::Black).bg(Color::Cyan).bold()),
        Span::styled(format!(" {} ", app.backend_label), Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(header), area);
}

fn render_chat_column(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Chat ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    let inner_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Chat messages
            Constraint::Length(1), // Separator line
            Constraint::Length(1), // Input line
        ])
        .split(inner_area);

    let chat_area_full = inner_layout[0];
    let chat_area = Rect::new(
        chat_area_full.x + CHAT_PADDING,
        chat_area_full.y,
        chat_area_full.width.saturating_sub(CHAT_PADDING * 2 + 1), // +1 for scrollbar
        chat_area_full.height,
    );

    if app.snapshot.messages.is_empty() {
        let help = Paragraph::new("Ask a question and press Enter to search")
            .style(Style::default().fg(Color::DarkGray))
            .wrap(Wrap { trim: true });
        frame.render_widget(help, chat_area);
    } else {
        render_messages(frame, app, chat_area, chat_area_full);
    }

    render_input_line(frame, app, inner_layout[1], inner_layout[2]);
}

fn render_messages(frame: &mut Frame, app: &App, chat_area: Rect, scrollbar_area: Rect) {
    let mut lines: Vec<Line> = Vec::new();
    for message in &app.snapshot.messages {
        lines.extend(message_lines(message, app.spinner_char()));
        lines.push(Line::from(""));
    }

    let text = Text::from(lines);
    let content_width = chat_area.width as usize;
    let visible_lines = chat_area.height as usize;

    let total_wrapped_lines = calculate_wrapped_line_count(&text, content_width);
    let max_scroll = total_wrapped_lines.saturating_sub(visible_lines);
    let effective_scroll = app.chat_scroll.min(max_scroll);

    // chat_scroll counts up from the bottom; Paragraph scrolls down from the top.
    let scroll_offset = max_scroll.saturating_sub(effective_scroll);

    let paragraph = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .scroll((u16::try_from(scroll_offset).unwrap_or(u16::MAX), 0));
    frame.render_widget(paragraph, chat_area);

    if total_wrapped_lines > visible_lines {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("▲"))
            .end_symbol(Some("▼"));
        let mut scrollbar_state = ScrollbarState::new(total_wrapped_lines)
            .position(scroll_offset)
            .viewport_content_length(visible_lines);
        frame.render_stateful_widget(scrollbar, scrollbar_area, &mut scrollbar_state);
    }
}

/// Lines for a single message, including its header.
fn message_lines<'a>(message: &'a Message, spinner: &'static str) -> Vec<Line<'a>> {
    let time = message.created_at.with_timezone(&Local).format("%H:%M").to_string();

    if message.is_user() {
        return vec![Line::from(vec![
            Span::styled("[You] ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::styled(message.text.as_str(), Style::default().fg(Color::White)),
            Span::styled(format!("  {time}"), Style::default().fg(Color::DarkGray)),
        ])];
    }

    let mut lines = vec![Line::from(vec![
        Span::styled("[Agent]", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        Span::styled(format!("  {time}"), Style::default().fg(Color::DarkGray)),
    ])];

    if message.is_loading {
        lines.push(Line::from(vec![
            Span::styled(spinner, Style::default().fg(Color::Yellow)),
            Span::styled(" searching...", Style::default().fg(Color::DarkGray)),
        ]));
        return lines;
    }

    let style = if message.text.starts_with("Error: ") {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };
    lines.extend(
        message
            .text
            .split('\n')
            .map(|line| Line::from(Span::styled(line, style))),
    );

    if message.is_animating {
        if let Some(last) = lines.last_mut() {
            last.push_span(Span::styled("▌", Style::default().fg(Color::Yellow)));
        }
    }

    lines
}

fn render_input_line(frame: &mut Frame, app: &App, separator_area: Rect, input_area: Rect) {
    let separator = Paragraph::new("─".repeat(separator_area.width as usize))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(separator, separator_area);

    let prompt = "> ";
    let input_line = if app.snapshot.is_input_locked() {
        Line::from(vec![
            Span::styled(prompt, Style::default().fg(Color::DarkGray)),
            Span::styled("waiting for the answer (Esc to stop)", Style::default().fg(Color::DarkGray).italic()),
        ])
    } else {
        Line::from(vec![
            Span::styled(prompt, Style::default().fg(Color::Cyan)),
            Span::styled(app.snapshot.input_text.as_str(), Style::default().fg(Color::White)),
        ])
    };
    frame.render_widget(Paragraph::new(input_line), input_area);

    // Hide the cursor while busy to prevent flickering.
    if !app.snapshot.is_input_locked() {
        let offset = cursor_column(prompt, &app.snapshot.input_text, app.cursor_position);
        frame.set_cursor_position((input_area.x.saturating_add(offset), input_area.y));
    }
}

/// Screen column of the input cursor, in display cells.
fn cursor_column(prompt: &str, input: &str, cursor: usize) -> u16 {
    let before: String = input.chars().take(cursor).collect();
    let width = Line::from(vec![Span::raw(prompt), Span::raw(before)]).width();
    u16::try_from(width).unwrap_or(u16::MAX)
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let phase = app.snapshot.phase;
    let phase_indicator = match phase {
        Phase::Idle => Span::styled(" IDLE ", Style::default().fg(Color::Black).bg(Color::Green)),
        Phase::Loading | Phase::Animating => Span::styled(
            format!(" {} ", phase.as_str().to_uppercase()),
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ),
    };

    let mut spans = vec![phase_indicator, Span::raw(" ")];
    if let Some(ref status) = app.status_message {
        spans.push(Span::styled(status.as_str(), Style::default().fg(Color::Green)));
    } else if app.snapshot.show_stop_button() {
        spans.push(Span::styled("Esc", Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(":stop"));
    } else {
        if app.snapshot.can_send() {
            spans.push(Span::styled("Enter", Style::default().fg(Color::Yellow)));
            spans.push(Span::raw(":send "));
        }
        spans.push(Span::styled("PgUp/PgDn", Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(":scroll "));
        spans.push(Span::styled("Esc", Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(":quit"));
    }

    let status_bar = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(status_bar, area);
}

/// Calculate the number of visual lines after text wrapping.
fn calculate_wrapped_line_count(text: &Text, available_width: usize) -> usize {
    if available_width == 0 {
        return text.lines.len();
    }

    text.lines
        .iter()
        .map(|line| line.width().div_ceil(available_width).max(1))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_line_count() {
        let text = Text::from(vec![Line::from("abcdefghij"), Line::from(""), Line::from("abc")]);
        assert_eq!(calculate_wrapped_line_count(&text, 4), 3 + 1 + 1);
        assert_eq!(calculate_wrapped_line_count(&text, 0), 3);
    }

    #[test]
    fn cursor_column_counts_display_width() {
        assert_eq!(cursor_column("> ", "abc", 2), 4);
        assert_eq!(cursor_column("> ", "你好吗", 2), 6);
        assert_eq!(cursor_column("> ", "héllo", 5), 7);
        assert_eq!(cursor_column("> ", "", 3), 2);
    }

    #[test]
    fn loading_message_shows_spinner() {
        let message = Message::assistant_placeholder();
        let lines = message_lines(&message, "⠋");
        assert_eq!(lines.len(), 2);
        assert!(lines[1].to_string().contains("searching"));
    }

    #[test]
    fn animating_message_has_cursor() {
        let mut message = Message::assistant_placeholder();
        message.is_loading = false;
        message.is_animating = true;
        message.text = "line one\nline".to_string();
        let lines = message_lines(&message, "⠋");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2].to_string(), "line▌");
    }
}
