//! Application state composition.
//!
//! ```text
//! AppState
//! ├── input: InputState       (review text, character counter)
//! ├── feed: FeedState         (projection of the store snapshot)
//! ├── auth: AuthState         (session, control visibility)
//! ├── captcha: CaptchaState   (bot-check widget + dialog)
//! └── alert: Option<Alert>    (modal message)
//! ```
//!
//! The reducer in `update` is the only writer; the runtime executes the
//! effects it returns and renders from an immutable borrow.

use revu_core::moderation::ProfanityFilter;

use crate::features::auth::AuthState;
use crate::features::captcha::CaptchaState;
use crate::features::feed::FeedState;
use crate::features::input::InputState;

/// A blocking message, dismissed with Enter or Esc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub message: String,
}

/// Combined application state for the TUI.
pub struct AppState {
    /// Flag indicating the app should quit.
    pub should_quit: bool,
    pub input: InputState,
    pub feed: FeedState,
    pub auth: AuthState,
    pub captcha: CaptchaState,
    /// Active modal alert, if any.
    pub alert: Option<Alert>,
    /// A publish call is in flight.
    pub publishing: bool,
    /// Content filter consulted by the submission gates.
    pub filter: ProfanityFilter,
    /// Spinner animation frame counter.
    pub spinner_frame: u8,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            should_quit: false,
            input: InputState::default(),
            feed: FeedState::default(),
            auth: AuthState::default(),
            captcha: CaptchaState::default(),
            alert: None,
            publishing: false,
            filter: ProfanityFilter::new(),
            spinner_frame: 0,
        }
    }

    /// Raises a modal alert.
    pub fn raise_alert(&mut self, message: impl Into<String>) {
        self.alert = Some(Alert {
            message: message.into(),
        });
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
