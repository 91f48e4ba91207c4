//! TUI runtime - owns terminal, runs event loop, executes effects.
//!
//! This is the "Elm runtime" boundary: all side effects happen here.
//! The reducer stays pure and produces effects; this module executes them.
//!
//! ## Inbox Pattern
//!
//! Async completions use an "inbox" channel:
//! - Spawned tasks send `UiEvent`s directly to `inbox_tx`
//! - The loop drains `inbox_rx` each frame to collect results
//!
//! The loop itself is synchronous (crossterm polling) and runs on the
//! tokio runtime's driver thread; spawned work progresses on the worker
//! threads.

use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use revu_core::auth::AuthClient;
use revu_core::captcha::CaptchaClient;
use revu_core::config::Config;
use revu_core::review::Review;
use revu_core::store::StoreClient;

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::state::AppState;
use crate::{render, terminal, update};

/// Spinner cadence while something is in flight.
const FRAME_DURATION: Duration = Duration::from_millis(120);

/// How long each loop iteration waits for terminal input.
const POLL_DURATION: Duration = Duration::from_millis(50);

/// Full-screen TUI runtime.
///
/// Owns the terminal, the state, and the service clients. Terminal state
/// is restored on exit and on panic.
pub struct TuiRuntime {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    pub state: AppState,
    /// Inbox sender - spawned tasks send events here.
    inbox_tx: mpsc::UnboundedSender<UiEvent>,
    /// Inbox receiver - the loop drains this each frame.
    inbox_rx: mpsc::UnboundedReceiver<UiEvent>,
    store: StoreClient,
    auth: Arc<AuthClient>,
    captcha: CaptchaClient,
    /// Cancels the store subscription on exit.
    shutdown: CancellationToken,
    last_tick: Instant,
}

impl TuiRuntime {
    /// Creates the runtime and spawns the long-lived listeners.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: Config) -> Result<Self> {
        // Set up panic hook BEFORE entering alternate screen
        terminal::install_panic_hook();
        let terminal = terminal::setup_terminal().context("Failed to setup terminal")?;

        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();

        let runtime = Self {
            terminal,
            state: AppState::new(),
            inbox_tx,
            inbox_rx,
            store: StoreClient::new(&config.store),
            auth: Arc::new(AuthClient::new(config.auth)),
            captcha: CaptchaClient::new(&config.captcha),
            shutdown: CancellationToken::new(),
            last_tick: Instant::now(),
        };

        runtime.spawn_listeners();
        Ok(runtime)
    }

    /// Spawns the startup listeners: store subscription, session watch,
    /// and the one-shot pending-redirect check.
    fn spawn_listeners(&self) {
        // Store subscription → full snapshots, initial state included.
        let mut snapshots = self.store.subscribe(self.shutdown.child_token());
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            while let Some(snapshot) = snapshots.recv().await {
                if tx.send(UiEvent::FeedSnapshot(snapshot)).is_err() {
                    break;
                }
            }
        });

        // Session-change notifications. The current state is delivered
        // first so control visibility is right from the first frame.
        let mut sessions = self.auth.subscribe();
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let current = sessions.borrow_and_update().clone();
            if tx.send(UiEvent::SessionChanged(current)).is_err() {
                return;
            }
            while sessions.changed().await.is_ok() {
                let session = sessions.borrow_and_update().clone();
                if tx.send(UiEvent::SessionChanged(session)).is_err() {
                    break;
                }
            }
        });

        // Always check for a pending redirect-flow result on startup.
        let auth = Arc::clone(&self.auth);
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let result = auth.pending_redirect_result().await;
            let _ = tx.send(UiEvent::RedirectResult(result));
        });
    }

    /// Runs the main event loop, restoring the terminal afterwards.
    pub fn run(&mut self) -> Result<()> {
        let result = self.event_loop();

        self.shutdown.cancel();
        let restore = terminal::restore_terminal();

        result.and(restore)
    }

    fn event_loop(&mut self) -> Result<()> {
        let mut dirty = true; // Start dirty to ensure initial render

        while !self.state.should_quit {
            // Drain async completions first.
            while let Ok(inbox_event) = self.inbox_rx.try_recv() {
                let effects = update::update(&mut self.state, inbox_event);
                self.execute_effects(effects);
                dirty = true;
            }

            // Terminal input (bounded wait keeps the loop responsive).
            if event::poll(POLL_DURATION).context("Failed to poll terminal events")? {
                let term_event = event::read().context("Failed to read terminal event")?;
                let effects = update::update(&mut self.state, UiEvent::Terminal(term_event));
                self.execute_effects(effects);
                dirty = true;
            }

            // Advance the spinner only while something is in flight.
            let busy =
                self.state.publishing || self.state.auth.signing_in || self.state.captcha.busy;
            if busy && self.last_tick.elapsed() >= FRAME_DURATION {
                self.last_tick = Instant::now();
                let effects = update::update(&mut self.state, UiEvent::Tick);
                self.execute_effects(effects);
                dirty = true;
            }

            // Only render if something changed.
            if dirty {
                self.terminal.draw(|frame| {
                    render::render(&self.state, frame);
                })?;
                dirty = false;
            }
        }

        Ok(())
    }

    fn execute_effects(&mut self, effects: Vec<UiEffect>) {
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&mut self, effect: UiEffect) {
        match effect {
            UiEffect::StartSignIn => {
                let auth = Arc::clone(&self.auth);
                let tx = self.inbox_tx.clone();
                tokio::spawn(async move {
                    let result = auth.sign_in_interactive().await;
                    let _ = tx.send(UiEvent::SignInFinished(result));
                });
            }
            UiEffect::StartRedirectSignIn => {
                let auth = Arc::clone(&self.auth);
                let tx = self.inbox_tx.clone();
                // File writes plus the browser launch; keep it off the
                // async workers.
                tokio::task::spawn_blocking(move || {
                    let result = auth.sign_in_via_redirect();
                    let _ = tx.send(UiEvent::RedirectStarted(result));
                });
            }
            UiEffect::SignOut => {
                // Synchronous; the session watch delivers the transition.
                self.auth.sign_out();
            }
            UiEffect::LoadChallenge => {
                let captcha = self.captcha.clone();
                let tx = self.inbox_tx.clone();
                tokio::spawn(async move {
                    let result = captcha.challenge().await.map_err(|err| format!("{err:#}"));
                    let _ = tx.send(UiEvent::ChallengeLoaded(result));
                });
            }
            UiEffect::VerifyChallenge { id, answer } => {
                let captcha = self.captcha.clone();
                let tx = self.inbox_tx.clone();
                tokio::spawn(async move {
                    let result = captcha
                        .verify(&id, &answer)
                        .await
                        .map_err(|err| format!("{err:#}"));
                    let _ = tx.send(UiEvent::ChallengeVerified(result));
                });
            }
            UiEffect::Publish { text, user } => {
                let store = self.store.clone();
                let tx = self.inbox_tx.clone();
                tokio::spawn(async move {
                    // Timestamp is assigned at publish time.
                    let review = Review::new(text, user.as_deref());
                    let result = store.append(&review).await.map_err(|err| format!("{err:#}"));
                    let _ = tx.send(UiEvent::PublishFinished(result));
                });
            }
        }
    }
}
