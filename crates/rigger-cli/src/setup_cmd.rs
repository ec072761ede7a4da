//! `rigger run` and `rigger resume`: drive the setup steps interactively.

use std::io;

use anyhow::Result;

use rigger_core::{
    Catalog, RealFs, RunOutcome, SetupContext, SetupPaths, SetupState, StateStore,
    StepRunner,
};

use crate::config::RiggerConfig;
use crate::terminal::TerminalPrompter;

/// Where the run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// From step 0, reusing earlier answers as defaults.
    Run,
    /// From the last saved step.
    Resume,
}

/// Build the setup context from the resolved configuration.
pub fn setup_context(config: &RiggerConfig) -> SetupContext {
    let paths = SetupPaths::new(&config.claude_home, &config.project_dir);
    let mut ctx = SetupContext::new(paths, Catalog::embedded(), env!("CARGO_PKG_VERSION"));
    ctx.status_line_command = config.status_line_command.clone();
    ctx
}

/// Run the setup command.
pub fn run_setup(config: &RiggerConfig, mode: Mode) -> Result<()> {
    let store = StateStore::new(&config.state_file);
    let ctx = setup_context(config);
    let mut fs = RealFs;
    let stdin = io::stdin();
    let mut prompter = TerminalPrompter::new(stdin.lock(), io::stdout());

    tracing::debug!(state_file = %config.state_file.display(), ?mode, "setup starting");

    let outcome = {
        let mut runner = StepRunner::new(&store, &mut fs, &mut prompter, &ctx);
        match mode {
            Mode::Run => runner.run()?,
            Mode::Resume => runner.resume()?,
        }
    };

    match outcome {
        RunOutcome::Completed(state) => {
            println!();
            println!("Setup complete.");
            print_targets(&ctx, &state);
        }
        RunOutcome::Aborted { step, .. } => {
            println!();
            println!("Setup stopped before step {step}.");
            println!("Run `rigger resume` to continue where you left off.");
        }
        RunOutcome::AlreadyComplete(state) => {
            if let Some(done) = &state.completed {
                println!(
                    "Setup already complete ({}, version {}).",
                    done.at.format("%Y-%m-%d %H:%M:%S UTC"),
                    done.version
                );
            }
            println!("Run `rigger run` to reconfigure.");
        }
    }

    Ok(())
}

fn print_targets(ctx: &SetupContext, state: &SetupState) {
    let Some(scope) = state.scope else {
        return;
    };
    let config_doc = state
        .config_path
        .clone()
        .unwrap_or_else(|| ctx.paths.config_document(scope));
    println!("  scope:     {scope}");
    println!("  CLAUDE.md: {}", config_doc.display());
    println!("  settings:  {}", ctx.paths.settings_document(scope).display());
}
