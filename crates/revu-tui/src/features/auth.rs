//! Session display state.
//!
//! Two states, Anonymous and Authenticated, driven entirely by the auth
//! client's session-change notifications. Exactly one of the sign-in /
//! sign-out controls is offered at any time.

use revu_core::auth::Session;

/// Auth display state.
#[derive(Debug, Default)]
pub struct AuthState {
    session: Option<Session>,
    /// An interactive challenge is in flight (modal; no second challenge).
    pub signing_in: bool,
    /// Authorization URL of a started redirect flow, shown as a hint.
    pub redirect_hint: Option<String>,
}

impl AuthState {
    /// Applies a session-change notification. Sole entry point for
    /// transitions; the cause of the change is deliberately not
    /// distinguished.
    pub fn apply_session(&mut self, session: Option<Session>) {
        self.session = session;
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Whether the sign-in control is offered.
    pub fn sign_in_visible(&self) -> bool {
        self.session.is_none()
    }

    /// Whether the sign-out control is offered.
    pub fn sign_out_visible(&self) -> bool {
        self.session.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Exactly one of the two controls is visible in either state.
    #[test]
    fn test_visibility_toggle() {
        let mut auth = AuthState::default();
        assert!(auth.sign_in_visible());
        assert!(!auth.sign_out_visible());

        auth.apply_session(Some(Session {
            display_name: Some("Ana".to_string()),
        }));
        assert!(!auth.sign_in_visible());
        assert!(auth.sign_out_visible());

        auth.apply_session(None);
        assert!(auth.sign_in_visible());
        assert!(!auth.sign_out_visible());
    }
}
