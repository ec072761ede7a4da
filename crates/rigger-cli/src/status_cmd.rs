//! `rigger status` command: show setup progress and the decisions made so far.

use std::fmt;

use anyhow::{Context, Result};

use rigger_core::runner::TERMINAL_STEP;
use rigger_core::state::StateError;
use rigger_core::{SetupState, SetupStep, StateStore};

use crate::config::RiggerConfig;

/// Run the status command.
pub fn run_status(config: &RiggerConfig, json: bool) -> Result<()> {
    let store = StateStore::new(&config.state_file);

    let state = match store.try_load() {
        Ok(Some(state)) => state,
        Ok(None) => {
            println!("No setup has been run yet.");
            println!("State file: {}", store.path().display());
            return Ok(());
        }
        Err(e @ StateError::Corrupt { .. }) => {
            println!("{e}");
            println!("The next `rigger resume` will start over from step 0.");
            return Ok(());
        }
        Err(e) => return Err(e).context("failed to load setup state"),
    };

    if json {
        let text = serde_json::to_string_pretty(&state).context("failed to serialize state")?;
        println!("{text}");
    } else {
        println!("State file: {}", store.path().display());
        print!("{}", StatusView(&state));
    }
    Ok(())
}

fn yes_no(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "yes",
        Some(false) => "no",
        None => "not asked",
    }
}

/// Human-readable summary of a [`SetupState`].
pub struct StatusView<'a>(pub &'a SetupState);

impl fmt::Display for StatusView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0;

        write!(f, "Progress:    ")?;
        match (&state.completed, SetupStep::from_index(state.step)) {
            (Some(done), _) => writeln!(
                f,
                "complete ({}, version {})",
                done.at.format("%Y-%m-%d %H:%M:%S UTC"),
                done.version
            )?,
            (None, Some(next)) => {
                writeln!(f, "{}/{TERMINAL_STEP}, next: {}", state.step, next.title())?
            }
            (None, None) => writeln!(f, "{}/{TERMINAL_STEP}, completion not recorded", state.step)?,
        }

        match state.scope {
            Some(scope) => writeln!(f, "Scope:       {scope}")?,
            None => writeln!(f, "Scope:       not chosen")?,
        }
        if let Some(path) = &state.config_path {
            writeln!(f, "CLAUDE.md:   {}", path.display())?;
        }
        if let Some(resolution) = state.resolution {
            writeln!(f, "Conflicts:   {resolution}")?;
        }

        let features = &state.features;
        writeln!(f, "Test hook:   {}", yes_no(features.test_hook))?;
        if features.git_hooks.is_empty() {
            writeln!(f, "Git hooks:   not asked")?;
        } else {
            let on: Vec<&str> = features
                .git_hooks
                .iter()
                .filter(|(_, enabled)| **enabled)
                .map(|(name, _)| name.as_str())
                .collect();
            let list = if on.is_empty() { "none".to_string() } else { on.join(", ") };
            writeln!(f, "Git hooks:   {list}")?;
        }
        writeln!(f, "Status line: {}", yes_no(features.status_line))?;
        writeln!(f, "Agent teams: {}", yes_no(features.agent_teams))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::{TimeZone, Utc};
    use rigger_core::state::Completion;
    use rigger_core::{Resolution, Scope};

    use super::*;

    #[test]
    fn fresh_state() {
        let text = StatusView(&SetupState::new()).to_string();
        assert!(text.contains("Progress:    0/7, next: choose scope"));
        assert!(text.contains("Scope:       not chosen"));
        assert!(text.contains("Git hooks:   not asked"));
    }

    #[test]
    fn partial_state() {
        let mut state = SetupState::new();
        state.step = 4;
        state.scope = Some(Scope::Local);
        state.config_path = Some(PathBuf::from("/p/.claude/CLAUDE.md"));
        state.resolution = Some(Resolution::Replace);
        state.features.test_hook = Some(false);
        state.features.git_hooks.insert("pushGuard".into(), true);
        state.features.git_hooks.insert("preCommitReview".into(), false);

        let text = StatusView(&state).to_string();
        assert!(text.contains("4/7, next: git hooks"));
        assert!(text.contains("Scope:       local"));
        assert!(text.contains("Conflicts:   replace"));
        assert!(text.contains("Test hook:   no"));
        assert!(text.contains("Git hooks:   pushGuard"));
        assert!(text.contains("Agent teams: not asked"));
    }

    #[test]
    fn complete_state() {
        let mut state = SetupState::new();
        state.step = TERMINAL_STEP;
        state.completed = Some(Completion {
            at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            version: "0.1.0".into(),
        });
        let text = StatusView(&state).to_string();
        assert!(text.contains("complete (2026-03-01 12:00:00 UTC, version 0.1.0)"));
    }
}
