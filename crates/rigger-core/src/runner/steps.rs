//! The work done by each [`SetupStep`].
//!
//! Every step takes the current state and returns the next one. Side effects
//! are safe to repeat: a step that crashed before its state was saved simply
//! runs again on resume.

use std::collections::BTreeMap;
use std::path::PathBuf;

use super::{Flow, SetupError, SetupStep, StepRunner, require_scope};
use crate::conflict::{self, ConflictReport, Resolution, Resolved};
use crate::paths::backup_path;
use crate::prompt::{Choice, Question, Reply};
use crate::settings::{MergeMode, SettingsDocument, StatusLine, merge_hooks};
use crate::state::{Scope, SetupState};

/// Scope choices in display order.
const SCOPES: [Scope; 2] = [Scope::Local, Scope::Global];

impl StepRunner<'_> {
    // -----------------------------------------------------------------------
    // 0: scope
    // -----------------------------------------------------------------------

    pub(super) fn choose_scope(&mut self, state: &SetupState) -> Result<Flow, SetupError> {
        let paths = &self.ctx.paths;
        let choices = SCOPES
            .iter()
            .map(|&scope| {
                let label = match scope {
                    Scope::Local => "local: this project only",
                    Scope::Global => "global: every project on this machine",
                };
                Choice::new(label).describe(paths.config_document(scope).display().to_string())
            })
            .collect();

        let default = SCOPES
            .iter()
            .position(|s| Some(*s) == state.scope)
            .unwrap_or(0);
        let question = Question::new("scope", "Where should the bundle be installed?", choices)
            .with_default(Some(default));

        let index = match self.prompter.select(&question)? {
            Reply::Answered(i) => question.check(i)?,
            Reply::Unanswered => default,
            Reply::Aborted => return Ok(Flow::Abort),
        };
        let scope = SCOPES[index];

        let mut next = state.clone();
        next.scope = Some(scope);
        next.config_path = Some(self.ctx.paths.config_document(scope));
        tracing::debug!(%scope, "scope chosen");
        Ok(Flow::Next(next))
    }

    // -----------------------------------------------------------------------
    // 1: conflicts
    // -----------------------------------------------------------------------

    pub(super) fn check_conflicts(&mut self, state: &SetupState) -> Result<Flow, SetupError> {
        let path = self.config_path(state, SetupStep::Conflicts)?;
        let document = self.fs.read(&path)?.unwrap_or_default();
        // A document that is exactly the bundle content conflicts only with itself.
        let report = if document.trim_end() == self.ctx.catalog.template.trim_end() {
            ConflictReport::default()
        } else {
            conflict::detect(&document)
        };

        let mut next = state.clone();
        if report.is_empty() {
            tracing::debug!(path = %path.display(), "no conflicts");
            next.resolution = None;
            return Ok(Flow::Next(next));
        }

        self.prompter.notify(&describe_conflicts(&path, &report));

        let choices = Resolution::ALL
            .iter()
            .map(|r| {
                let text = match r {
                    Resolution::Merge => "keep your sections and append the bundle",
                    Resolution::Replace => {
                        "comment out the conflicting sections, then append the bundle"
                    }
                    Resolution::Skip => "leave CLAUDE.md untouched",
                };
                Choice::new(r.to_string()).describe(text)
            })
            .collect();
        let skip = Resolution::ALL
            .iter()
            .position(|r| *r == Resolution::Skip)
            .unwrap_or(Resolution::ALL.len() - 1);
        let question = Question::new(
            "conflicts",
            "How should the existing sections be handled?",
            choices,
        )
        .with_default(Some(skip));

        let resolution = match self.prompter.select(&question)? {
            Reply::Answered(i) => Resolution::ALL[question.check(i)?],
            Reply::Unanswered => {
                self.prompter
                    .notify("No choice made; CLAUDE.md will be left as it is (skip).");
                Resolution::Skip
            }
            Reply::Aborted => return Ok(Flow::Abort),
        };

        tracing::debug!(%resolution, conflicts = report.len(), "resolution chosen");
        next.resolution = Some(resolution);
        Ok(Flow::Next(next))
    }

    // -----------------------------------------------------------------------
    // 2: write CLAUDE.md
    // -----------------------------------------------------------------------

    pub(super) fn write_config(&mut self, state: &SetupState) -> Result<Flow, SetupError> {
        let path = self.config_path(state, SetupStep::WriteConfig)?;
        let document = self.fs.read(&path)?;
        let report = conflict::detect(document.as_deref().unwrap_or_default());
        let resolution = state.resolution.unwrap_or(Resolution::Merge);

        match conflict::resolve(
            document.as_deref(),
            &report,
            resolution,
            &self.ctx.catalog.template,
        ) {
            Resolved::Unchanged => {
                tracing::info!(path = %path.display(), %resolution, "CLAUDE.md unchanged");
            }
            Resolved::Write(text) => {
                self.fs.write(&path, &text)?;
                tracing::info!(path = %path.display(), %resolution, "CLAUDE.md written");
                self.prompter
                    .notify(&format!("Updated {}", path.display()));
            }
        }

        Ok(Flow::Next(state.clone()))
    }

    // -----------------------------------------------------------------------
    // 3-6: settings.json features
    // -----------------------------------------------------------------------

    pub(super) fn test_hook(&mut self, state: &SetupState) -> Result<Flow, SetupError> {
        let scope = require_scope(state, SetupStep::TestHook)?;
        let question = Question::yes_no(
            "testHook",
            "Install hooks that check tests were run before an agent stops?",
            Some(state.features.test_hook.unwrap_or(true)),
        );
        let Some(enabled) = self.confirm(&question)? else {
            return Ok(Flow::Abort);
        };

        if enabled {
            let hooks = self.ctx.catalog.test_hook.clone();
            self.edit_settings(scope, |doc| {
                merge_hooks(doc, &hooks, MergeMode::SkipIdentical) > 0
            })?;
        }

        let mut next = state.clone();
        next.features.test_hook = Some(enabled);
        Ok(Flow::Next(next))
    }

    pub(super) fn git_hooks(&mut self, state: &SetupState) -> Result<Flow, SetupError> {
        let scope = require_scope(state, SetupStep::GitHooks)?;
        let options = &self.ctx.catalog.git_hooks;

        let choices = options
            .iter()
            .map(|o| Choice::new(o.name.clone()).describe(o.description.clone()))
            .collect();
        let defaults: Vec<usize> = options
            .iter()
            .enumerate()
            .filter(|(_, o)| state.features.git_hooks.get(&o.name).copied() == Some(true))
            .map(|(i, _)| i)
            .collect();
        let question = Question::new("gitHooks", "Which git hooks should be installed?", choices)
            .with_defaults(defaults.clone());

        let chosen = match self.prompter.multi_select(&question)? {
            Reply::Answered(indices) => indices
                .into_iter()
                .map(|i| question.check(i))
                .collect::<Result<Vec<_>, _>>()?,
            Reply::Unanswered => defaults,
            Reply::Aborted => return Ok(Flow::Abort),
        };

        let selected: BTreeMap<String, bool> = options
            .iter()
            .enumerate()
            .map(|(i, o)| (o.name.clone(), chosen.contains(&i)))
            .collect();

        let hooks: Vec<_> = options
            .iter()
            .filter(|o| selected.get(&o.name).copied().unwrap_or(false))
            .flat_map(|o| o.hooks.iter().cloned())
            .collect();
        if !hooks.is_empty() {
            self.edit_settings(scope, |doc| {
                merge_hooks(doc, &hooks, MergeMode::SkipIdentical) > 0
            })?;
        }

        let mut next = state.clone();
        next.features.git_hooks = selected;
        Ok(Flow::Next(next))
    }

    pub(super) fn status_line(&mut self, state: &SetupState) -> Result<Flow, SetupError> {
        let scope = require_scope(state, SetupStep::StatusLine)?;
        let command = self.ctx.status_line_command().to_string();
        let question = Question::yes_no(
            "statusLine",
            format!("Use the bundle status line (`{command}`)?"),
            Some(state.features.status_line.unwrap_or(true)),
        );
        let Some(enabled) = self.confirm(&question)? else {
            return Ok(Flow::Abort);
        };

        if enabled {
            self.edit_settings(scope, |doc| {
                doc.set_status_line(StatusLine::command(command.as_str()))
            })?;
        }

        let mut next = state.clone();
        next.features.status_line = Some(enabled);
        Ok(Flow::Next(next))
    }

    pub(super) fn agent_teams(&mut self, state: &SetupState) -> Result<Flow, SetupError> {
        let scope = require_scope(state, SetupStep::AgentTeams)?;
        let key = self.ctx.catalog.agent_teams_env.clone();
        let question = Question::yes_no(
            "agentTeams",
            "Enable experimental agent teams?",
            Some(state.features.agent_teams.unwrap_or(false)),
        );
        let Some(enabled) = self.confirm(&question)? else {
            return Ok(Flow::Abort);
        };

        if enabled {
            self.edit_settings(scope, |doc| doc.set_env(&key, "1"))?;
        }

        let mut next = state.clone();
        next.features.agent_teams = Some(enabled);
        Ok(Flow::Next(next))
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// The recorded `CLAUDE.md` path, or the scope's default.
    fn config_path(&self, state: &SetupState, step: SetupStep) -> Result<PathBuf, SetupError> {
        if let Some(path) = &state.config_path {
            return Ok(path.clone());
        }
        let scope = require_scope(state, step)?;
        Ok(self.ctx.paths.config_document(scope))
    }

    /// Ask a yes/no question. `None` means the user aborted.
    fn confirm(&mut self, question: &Question) -> Result<Option<bool>, SetupError> {
        let index = match self.prompter.select(question)? {
            Reply::Answered(i) => question.check(i)?,
            Reply::Unanswered => question.default.unwrap_or(1),
            Reply::Aborted => return Ok(None),
        };
        Ok(Some(index == 0))
    }

    /// Load the scope's settings document, apply `edit`, and write it back
    /// if `edit` reports a change. The original is copied to `*.bak` before
    /// its first change in this run.
    fn edit_settings(
        &mut self,
        scope: Scope,
        edit: impl FnOnce(&mut SettingsDocument) -> bool,
    ) -> Result<bool, SetupError> {
        let path = self.ctx.paths.settings_document(scope);
        let original = self.fs.read(&path)?;
        let mut doc = SettingsDocument::parse(original.as_deref().unwrap_or_default(), &path)?;

        if !edit(&mut doc) {
            tracing::debug!(path = %path.display(), "settings unchanged");
            return Ok(false);
        }

        if let Some(original) = &original
            && self.backed_up.insert(path.clone())
        {
            let backup = backup_path(&path);
            self.fs.write(&backup, original)?;
            tracing::info!(backup = %backup.display(), "settings backed up");
        }

        self.fs.write(&path, &doc.to_json_string()?)?;
        tracing::info!(path = %path.display(), "settings updated");
        Ok(true)
    }
}

fn describe_conflicts(path: &std::path::Path, report: &ConflictReport) -> String {
    let mut out = format!(
        "{} already has sections the bundle also provides:\n",
        path.display()
    );
    for m in report.iter() {
        let label = conflict::PATTERNS
            .iter()
            .find(|p| p.id == m.pattern_id)
            .map_or(m.pattern_id.as_str(), |p| p.label);
        out.push_str(&format!("  line {}: {label}\n", m.line));
        for line in &m.context_lines {
            out.push_str(&format!("      | {line}\n"));
        }
    }
    out
}
