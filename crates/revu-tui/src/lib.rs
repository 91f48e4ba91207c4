//! Full-screen TUI for the revu wall.

pub mod effects;
pub mod events;
pub mod features;
pub mod render;
pub mod runtime;
pub mod state;
pub mod terminal;
pub mod update;

use std::io::{IsTerminal, stderr};

use anyhow::Result;
pub use runtime::TuiRuntime;
use revu_core::config::Config;

/// Runs the interactive wall.
pub fn run_wall(config: &Config) -> Result<()> {
    // The wall requires a terminal to render the TUI
    if !stderr().is_terminal() {
        anyhow::bail!(
            "The wall requires a terminal.\n\
             Use `revu wall` for a one-shot listing or `revu post` to submit."
        );
    }

    let mut runtime = TuiRuntime::new(config.clone())?;
    runtime.run()
}
