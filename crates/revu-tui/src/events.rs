//! UI event types.
//!
//! Everything the reducer reacts to arrives as a `UiEvent`: terminal
//! input, the frame tick, and completions forwarded from async tasks
//! through the inbox channel.

use revu_core::auth::{AuthError, Session};
use revu_core::captcha::Challenge;
use revu_core::store::Snapshot;

/// Events processed by the reducer.
#[derive(Debug)]
pub enum UiEvent {
    /// Frame tick (drives the spinner).
    Tick,

    /// Raw terminal event.
    Terminal(crossterm::event::Event),

    /// A fresh snapshot from the store subscription (including the
    /// initial state push).
    FeedSnapshot(Snapshot),

    /// Session-change notification from the auth client. Fires for every
    /// transition, regardless of cause.
    SessionChanged(Option<Session>),

    /// The interactive sign-in challenge finished.
    SignInFinished(Result<Session, AuthError>),

    /// The redirect fallback was started (carries the authorization URL).
    RedirectStarted(Result<String, AuthError>),

    /// The startup check for a pending redirect flow finished.
    /// `Ok(None)` means nothing was pending — a normal no-op.
    RedirectResult(Result<Option<Session>, AuthError>),

    /// A bot-check challenge arrived (or failed to load).
    ChallengeLoaded(Result<Challenge, String>),

    /// The bot-check answer was verified (token) or rejected.
    ChallengeVerified(Result<String, String>),

    /// The publish call finished with the server-assigned key, or failed.
    PublishFinished(Result<String, String>),
}
