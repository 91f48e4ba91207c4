//! TUI reducer (update function).
//!
//! All state mutations happen here. The runtime calls `update(state,
//! event)` and executes the returned effects. This is the single source
//! of truth for how events modify state.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use revu_core::validate::validate_submission;

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::state::AppState;

/// The main reducer function.
///
/// Takes the current state and an event, mutates state, and returns
/// effects for the runtime to execute.
pub fn update(state: &mut AppState, event: UiEvent) -> Vec<UiEffect> {
    match event {
        UiEvent::Tick => {
            state.spinner_frame = state.spinner_frame.wrapping_add(1);
            vec![]
        }
        UiEvent::Terminal(term_event) => handle_terminal_event(state, &term_event),
        UiEvent::FeedSnapshot(snapshot) => {
            state.feed.apply_snapshot(&snapshot);
            vec![]
        }
        UiEvent::SessionChanged(session) => {
            // Sole driver of control visibility, whatever caused the change.
            state.auth.apply_session(session);
            vec![]
        }
        UiEvent::SignInFinished(result) => {
            state.auth.signing_in = false;
            match result {
                Ok(session) => {
                    state.raise_alert(format!("Welcome {}!", session.display_name_or_default()));
                    vec![]
                }
                Err(err) if err.is_recoverable() => {
                    tracing::info!("Falling back to redirect sign-in ({})", err.code);
                    vec![UiEffect::StartRedirectSignIn]
                }
                Err(err) => {
                    state.raise_alert(format!("Error: {err}"));
                    vec![]
                }
            }
        }
        UiEvent::RedirectStarted(result) => {
            match result {
                Ok(url) => state.auth.redirect_hint = Some(url),
                Err(err) => state.raise_alert(format!("Error: {err}")),
            }
            vec![]
        }
        UiEvent::RedirectResult(result) => {
            match result {
                Ok(Some(session)) => {
                    state.raise_alert(format!("Welcome {}!", session.display_name_or_default()));
                }
                // Nothing was pending: the usual case, no feedback.
                Ok(None) => {}
                Err(err) => tracing::warn!("Redirect sign-in failed: {err}"),
            }
            vec![]
        }
        UiEvent::ChallengeLoaded(result) => {
            state.captcha.busy = false;
            match result {
                Ok(challenge) => state.captcha.challenge = Some(challenge),
                Err(message) => state.captcha.error = Some(message),
            }
            vec![]
        }
        UiEvent::ChallengeVerified(result) => {
            state.captcha.busy = false;
            match result {
                Ok(token) => {
                    state.captcha.complete(token);
                    vec![]
                }
                Err(_) => {
                    // A challenge is single-use; fetch a fresh one to retry.
                    state.captcha.error =
                        Some("That answer didn't pass. Try the new challenge.".to_string());
                    state.captcha.answer.clear();
                    state.captcha.challenge = None;
                    state.captcha.busy = true;
                    vec![UiEffect::LoadChallenge]
                }
            }
        }
        UiEvent::PublishFinished(result) => {
            state.publishing = false;
            match result {
                Ok(key) => {
                    tracing::info!("Review stored under {key}");
                    // Reset only now that the publish call was issued
                    // successfully; the next submission needs a fresh pass.
                    state.input.clear();
                    state.captcha.widget.reset();
                }
                Err(message) => {
                    state.raise_alert(format!("Could not post your review: {message}"));
                }
            }
            vec![]
        }
    }
}

fn handle_terminal_event(state: &mut AppState, event: &Event) -> Vec<UiEffect> {
    let Event::Key(key) = event else {
        return vec![];
    };
    if key.kind != KeyEventKind::Press {
        return vec![];
    }

    // A modal alert swallows everything until dismissed.
    if state.alert.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            state.alert = None;
        }
        return vec![];
    }

    if state.captcha.dialog_open {
        return handle_captcha_key(state, key);
    }

    handle_main_key(state, key)
}

fn handle_captcha_key(state: &mut AppState, key: &KeyEvent) -> Vec<UiEffect> {
    match key.code {
        KeyCode::Esc => {
            state.captcha.close_dialog();
            vec![]
        }
        KeyCode::Enter => {
            let answer = state.captcha.answer.trim().to_string();
            if state.captcha.busy || answer.is_empty() {
                return vec![];
            }
            let Some(challenge) = &state.captcha.challenge else {
                return vec![];
            };
            state.captcha.busy = true;
            state.captcha.error = None;
            vec![UiEffect::VerifyChallenge {
                id: challenge.id.clone(),
                answer,
            }]
        }
        KeyCode::Backspace => {
            state.captcha.answer.pop();
            vec![]
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            state.captcha.answer.push(ch);
            vec![]
        }
        _ => vec![],
    }
}

fn handle_main_key(state: &mut AppState, key: &KeyEvent) -> Vec<UiEffect> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('c' | 'q') if ctrl => {
            state.should_quit = true;
            vec![]
        }
        KeyCode::Esc => {
            state.should_quit = true;
            vec![]
        }
        KeyCode::Enter => submit(state),
        KeyCode::Char('g') if ctrl => {
            if state.auth.sign_in_visible() && !state.auth.signing_in {
                state.auth.signing_in = true;
                state.auth.redirect_hint = None;
                vec![UiEffect::StartSignIn]
            } else {
                vec![]
            }
        }
        KeyCode::Char('o') if ctrl => {
            if state.auth.sign_out_visible() {
                vec![UiEffect::SignOut]
            } else {
                vec![]
            }
        }
        KeyCode::Char('b') if ctrl => {
            if state.captcha.widget.is_verified() {
                return vec![];
            }
            state.captcha.open_dialog();
            state.captcha.busy = true;
            vec![UiEffect::LoadChallenge]
        }
        KeyCode::Backspace => {
            state.input.backspace();
            vec![]
        }
        KeyCode::Char(ch) if !ctrl => {
            state.input.insert_char(ch);
            vec![]
        }
        _ => vec![],
    }
}

/// Runs the submission gates; a pass produces the publish effect, a
/// failure raises the gate's alert and nothing else happens.
fn submit(state: &mut AppState) -> Vec<UiEffect> {
    if state.publishing {
        return vec![];
    }

    match validate_submission(
        state.input.text(),
        state.captcha.widget.response_token(),
        &state.filter,
    ) {
        Err(gate) => {
            state.raise_alert(gate.to_string());
            vec![]
        }
        Ok(trimmed) => {
            state.publishing = true;
            let user = state
                .auth
                .session()
                .and_then(|session| session.display_name.clone());
            vec![UiEffect::Publish {
                text: trimmed.to_string(),
                user,
            }]
        }
    }
}
