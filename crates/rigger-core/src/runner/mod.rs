//! The setup state machine.
//!
//! Steps run in a fixed order. After each one the runner bumps
//! [`SetupState::step`] and saves the state, so an interrupted setup resumes
//! at the first step that did not finish:
//!
//! ```text
//! 0 Scope -> 1 Conflicts -> 2 WriteConfig -> 3 TestHook -> 4 GitHooks
//!   -> 5 StatusLine -> 6 AgentTeams -> 7 (complete marker)
//! ```

mod steps;

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use chrono::Utc;
use thiserror::Error;

use crate::catalog::Catalog;
use crate::fs::{Filesystem, FsError};
use crate::paths::SetupPaths;
use crate::prompt::{PromptError, Prompter};
use crate::settings::SettingsError;
use crate::state::{Completion, Scope, SetupState, StateError, StateStore};

/// Index written once every step has run.
pub const TERMINAL_STEP: u32 = 7;

/// Errors that stop a setup run.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Fs(#[from] FsError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// A step that needs the scope ran without one.
    #[error("step {step} requires a scope; rerun setup from the beginning")]
    MissingScope { step: SetupStep },
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// One setup step, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetupStep {
    Scope,
    Conflicts,
    WriteConfig,
    TestHook,
    GitHooks,
    StatusLine,
    AgentTeams,
}

impl SetupStep {
    pub const ALL: [SetupStep; 7] = [
        Self::Scope,
        Self::Conflicts,
        Self::WriteConfig,
        Self::TestHook,
        Self::GitHooks,
        Self::StatusLine,
        Self::AgentTeams,
    ];

    pub fn index(self) -> u32 {
        self as u32
    }

    /// The step at `index`, or `None` at or past [`TERMINAL_STEP`].
    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Scope => "choose scope",
            Self::Conflicts => "check for conflicts",
            Self::WriteConfig => "write CLAUDE.md",
            Self::TestHook => "verification hooks",
            Self::GitHooks => "git hooks",
            Self::StatusLine => "status line",
            Self::AgentTeams => "agent teams",
        }
    }
}

impl fmt::Display for SetupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.index(), self.title())
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every step ran and the completion marker was saved.
    Completed(SetupState),
    /// The user stopped at `step`. `state` is what was last saved.
    Aborted { step: SetupStep, state: SetupState },
    /// `resume` on a state that already carries the completion marker.
    AlreadyComplete(SetupState),
}

/// Fixed inputs for a run.
#[derive(Debug, Clone)]
pub struct SetupContext {
    pub paths: SetupPaths,
    pub catalog: Catalog,
    /// Recorded in the completion marker.
    pub version: String,
    /// Overrides the catalog's status line command.
    pub status_line_command: Option<String>,
}

impl SetupContext {
    pub fn new(paths: SetupPaths, catalog: Catalog, version: impl Into<String>) -> Self {
        Self {
            paths,
            catalog,
            version: version.into(),
            status_line_command: None,
        }
    }

    pub fn status_line_command(&self) -> &str {
        self.status_line_command
            .as_deref()
            .unwrap_or(&self.catalog.status_line_command)
    }
}

/// Result of a single step.
enum Flow {
    Next(SetupState),
    Abort,
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Drives the steps against one state file, filesystem and prompter.
pub struct StepRunner<'a> {
    store: &'a StateStore,
    fs: &'a mut dyn Filesystem,
    prompter: &'a mut dyn Prompter,
    ctx: &'a SetupContext,
    /// Settings documents already backed up during this run.
    backed_up: HashSet<PathBuf>,
}

impl<'a> StepRunner<'a> {
    pub fn new(
        store: &'a StateStore,
        fs: &'a mut dyn Filesystem,
        prompter: &'a mut dyn Prompter,
        ctx: &'a SetupContext,
    ) -> Self {
        Self {
            store,
            fs,
            prompter,
            ctx,
            backed_up: HashSet::new(),
        }
    }

    /// Reconfigure: start at step 0, offering earlier answers as defaults.
    pub fn run(&mut self) -> Result<RunOutcome, SetupError> {
        let state = self.store.load().restart();
        self.run_from(state)
    }

    /// Continue from the last saved step.
    pub fn resume(&mut self) -> Result<RunOutcome, SetupError> {
        let state = self.store.load();
        if state.is_complete() {
            return Ok(RunOutcome::AlreadyComplete(state));
        }
        self.run_from(state)
    }

    /// Run every step from `state.step` onward.
    pub fn run_from(&mut self, mut state: SetupState) -> Result<RunOutcome, SetupError> {
        if state.step > 0 && state.scope.is_none() {
            tracing::warn!(step = state.step, "saved state has no scope, starting over");
            state.step = 0;
        }

        tracing::info!(step = state.step, "starting setup");

        while let Some(step) = SetupStep::from_index(state.step) {
            tracing::debug!(%step, "running step");
            match self.run_step(step, &state)? {
                Flow::Next(mut next) => {
                    next.step = step.index() + 1;
                    self.store.save(&next)?;
                    tracing::info!(%step, "step complete");
                    state = next;
                }
                Flow::Abort => {
                    tracing::info!(%step, "setup aborted by user");
                    return Ok(RunOutcome::Aborted { step, state });
                }
            }
        }

        state.step = TERMINAL_STEP;
        state.completed = Some(Completion {
            at: Utc::now(),
            version: self.ctx.version.clone(),
        });
        self.store.save(&state)?;
        tracing::info!(version = %self.ctx.version, "setup complete");

        Ok(RunOutcome::Completed(state))
    }

    fn run_step(&mut self, step: SetupStep, state: &SetupState) -> Result<Flow, SetupError> {
        match step {
            SetupStep::Scope => self.choose_scope(state),
            SetupStep::Conflicts => self.check_conflicts(state),
            SetupStep::WriteConfig => self.write_config(state),
            SetupStep::TestHook => self.test_hook(state),
            SetupStep::GitHooks => self.git_hooks(state),
            SetupStep::StatusLine => self.status_line(state),
            SetupStep::AgentTeams => self.agent_teams(state),
        }
    }
}

fn require_scope(state: &SetupState, step: SetupStep) -> Result<Scope, SetupError> {
    state.scope.ok_or(SetupError::MissingScope { step })
}
