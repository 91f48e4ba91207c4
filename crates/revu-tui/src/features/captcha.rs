//! Bot-check overlay state.
//!
//! Holds the verification widget plus the modal challenge dialog the user
//! answers to earn a response token.

use revu_core::captcha::{CaptchaWidget, Challenge};

/// Bot-check display state.
#[derive(Debug, Default)]
pub struct CaptchaState {
    /// The response-token holder the submission gates read.
    pub widget: CaptchaWidget,
    /// Whether the challenge dialog is open.
    pub dialog_open: bool,
    /// Challenge currently shown, once loaded.
    pub challenge: Option<Challenge>,
    /// Answer being typed.
    pub answer: String,
    /// A challenge fetch or verification is in flight.
    pub busy: bool,
    /// Last verification error, shown inside the dialog.
    pub error: Option<String>,
}

impl CaptchaState {
    /// Opens the dialog for a fresh pass.
    pub fn open_dialog(&mut self) {
        self.dialog_open = true;
        self.challenge = None;
        self.answer.clear();
        self.error = None;
    }

    /// Closes the dialog without changing the widget.
    pub fn close_dialog(&mut self) {
        self.dialog_open = false;
        self.challenge = None;
        self.answer.clear();
        self.busy = false;
        self.error = None;
    }

    /// Stores a verified token and closes the dialog.
    pub fn complete(&mut self, token: String) {
        self.widget.set_token(token);
        self.close_dialog();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A completed challenge verifies the widget and closes the dialog.
    #[test]
    fn test_complete_sets_token_and_closes() {
        let mut captcha = CaptchaState::default();
        captcha.open_dialog();
        assert!(captcha.dialog_open);

        captcha.complete("tok-1".to_string());
        assert!(!captcha.dialog_open);
        assert!(captcha.widget.is_verified());
        assert_eq!(captcha.widget.response_token(), "tok-1");
    }

    /// Opening the dialog clears a previous error and answer.
    #[test]
    fn test_open_dialog_resets() {
        let mut captcha = CaptchaState {
            answer: "stale".to_string(),
            error: Some("wrong".to_string()),
            ..Default::default()
        };
        captcha.open_dialog();
        assert!(captcha.answer.is_empty());
        assert!(captcha.error.is_none());
    }
}
