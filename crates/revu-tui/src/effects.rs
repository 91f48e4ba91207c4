//! UI effect types.
//!
//! Effects are commands returned by the reducer that the runtime
//! executes. They represent I/O and task spawning only; the reducer stays
//! pure and never performs I/O itself.

/// Effects returned by the reducer for the runtime to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEffect {
    /// Start the interactive sign-in challenge.
    StartSignIn,

    /// Start the redirect fallback flow.
    StartRedirectSignIn,

    /// Terminate the session.
    SignOut,

    /// Fetch a bot-check challenge for the dialog.
    LoadChallenge,

    /// Verify the typed bot-check answer.
    VerifyChallenge { id: String, answer: String },

    /// Publish a validated review.
    Publish {
        text: String,
        /// Display name of the active session; `None` publishes as the
        /// anonymous sentinel.
        user: Option<String>,
    },
}
