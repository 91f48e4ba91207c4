//! Pure view/render functions for the TUI.
//!
//! Functions here take `&AppState` by immutable reference, draw to a
//! ratatui Frame, and never mutate state or return effects. Each draw
//! rebuilds the whole screen from state, so a render pass is atomic:
//! no partial list states are observable.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use unicode_width::UnicodeWidthStr;

use revu_core::review::MAX_REVIEW_CHARS;

use crate::state::AppState;

/// Height of the bordered input box.
const INPUT_HEIGHT: u16 = 3;

/// Height of the status line below the input.
const STATUS_HEIGHT: u16 = 1;

/// Spinner frames for status line animation.
const SPINNER_FRAMES: &[&str] = &["◐", "◓", "◑", "◒"];

/// Renders the entire TUI to the frame.
pub fn render(state: &AppState, frame: &mut Frame) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(area);

    render_feed(state, frame, chunks[0]);
    render_input(state, frame, chunks[1]);
    render_status(state, frame, chunks[2]);

    if state.captcha.dialog_open {
        render_captcha_dialog(state, frame, area);
    }
    if let Some(alert) = &state.alert {
        render_alert(&alert.message, frame, area);
    }
}

fn render_feed(state: &AppState, frame: &mut Frame, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Review Wall ");

    let lines: Vec<Line<'_>> = if !state.feed.is_connected() {
        vec![Line::from(Span::styled(
            "Connecting to the wall…",
            Style::default().fg(Color::DarkGray),
        ))]
    } else if state.feed.is_empty() {
        vec![Line::from(Span::styled(
            "No reviews yet.",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        state
            .feed
            .reviews()
            .iter()
            .map(|review| {
                Line::from(vec![
                    Span::styled(
                        format!("{}: ", review.user),
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(review.text.as_str()),
                ])
            })
            .collect()
    };

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_input(state: &AppState, frame: &mut Frame, area: Rect) {
    let over_limit = state.input.char_count() > MAX_REVIEW_CHARS;
    let counter_style = if over_limit {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Leave your thoughts ")
        .title_bottom(
            Line::from(Span::styled(
                format!(" {} ", state.input.counter_label()),
                counter_style,
            ))
            .alignment(Alignment::Right),
        );

    let paragraph = Paragraph::new(state.input.text()).block(block);
    frame.render_widget(paragraph, area);
}

fn render_status(state: &AppState, frame: &mut Frame, area: Rect) {
    let mut spans: Vec<Span<'_>> = Vec::new();
    let dim = Style::default().fg(Color::DarkGray);

    if state.publishing {
        spans.push(Span::raw(spinner(state.spinner_frame)));
        spans.push(Span::raw(" Posting…  "));
    }

    if state.auth.signing_in {
        spans.push(Span::raw(spinner(state.spinner_frame)));
        spans.push(Span::raw(" Signing in…  "));
    } else if state.auth.sign_in_visible() {
        spans.push(Span::styled("[Ctrl+G] Sign in  ", dim));
    } else {
        // Exactly one of the two controls is offered.
        let name = state
            .auth
            .session()
            .map(revu_core::auth::Session::display_name_or_default)
            .unwrap_or_default();
        spans.push(Span::styled(
            format!("{name}  "),
            Style::default().fg(Color::Green),
        ));
        spans.push(Span::styled("[Ctrl+O] Sign out  ", dim));
    }

    if state.captcha.widget.is_verified() {
        spans.push(Span::styled("Human ✓  ", Style::default().fg(Color::Green)));
    } else {
        spans.push(Span::styled("[Ctrl+B] Verify you're human  ", dim));
    }

    spans.push(Span::styled("[Enter] Post  [Esc] Quit", dim));

    if let Some(url) = &state.auth.redirect_hint {
        spans.push(Span::styled(
            format!("  Finish sign-in in your browser: {}", truncated(url, 40)),
            Style::default().fg(Color::Yellow),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_captcha_dialog(state: &AppState, frame: &mut Frame, area: Rect) {
    let dialog = centered_rect(area, 50, 7);
    frame.render_widget(Clear, dialog);

    let mut lines: Vec<Line<'_>> = Vec::new();
    match &state.captcha.challenge {
        Some(challenge) => lines.push(Line::from(challenge.prompt.as_str())),
        None => lines.push(Line::from(Span::styled(
            "Loading challenge…",
            Style::default().fg(Color::DarkGray),
        ))),
    }
    lines.push(Line::from(format!("> {}", state.captcha.answer)));
    if let Some(error) = &state.captcha.error {
        lines.push(Line::from(Span::styled(
            error.as_str(),
            Style::default().fg(Color::Red),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Verify you're human ")
        .title_bottom(Line::from(" [Enter] Verify  [Esc] Cancel ").alignment(Alignment::Center));
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        dialog,
    );
}

fn render_alert(message: &str, frame: &mut Frame, area: Rect) {
    let dialog = centered_rect(area, 60, 6);
    frame.render_widget(Clear, dialog);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Notice ")
        .title_bottom(Line::from(" [Enter] OK ").alignment(Alignment::Center));
    frame.render_widget(
        Paragraph::new(message)
            .block(block)
            .wrap(Wrap { trim: false }),
        dialog,
    );
}

fn spinner(frame: u8) -> &'static str {
    SPINNER_FRAMES[frame as usize % SPINNER_FRAMES.len()]
}

/// Centers a fixed-size rect within `area`, clamped to fit.
fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn truncated(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > max_width.saturating_sub(1) {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}
