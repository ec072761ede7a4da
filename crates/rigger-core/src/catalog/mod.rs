//! The bundle content installed by setup.
//!
//! The `CLAUDE.md` template and the hook definitions are defined in
//! `claude.md` and `hooks.toml` next to this file and embedded in the binary
//! at compile time.

use serde::Deserialize;

use crate::settings::HookDefinition;

/// The embedded `CLAUDE.md` template.
static TEMPLATE_MD: &str = include_str!("claude.md");

/// The embedded hook and toggle definitions.
static HOOKS_TOML: &str = include_str!("hooks.toml");

/// One selectable git hook.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GitHookOption {
    /// Key under `features.gitHooks` in the state file.
    pub name: String,
    pub description: String,
    pub hooks: Vec<HookDefinition>,
}

#[derive(Debug, Deserialize)]
struct HookLibrary {
    status_line_command: String,
    agent_teams_env: String,
    #[serde(default)]
    test_hook: Vec<HookDefinition>,
    #[serde(default)]
    git_hooks: Vec<GitHookOption>,
}

/// Everything the setup steps install.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    /// Content merged into the configuration document.
    pub template: String,
    /// Hooks installed by the verification (test hook) step.
    pub test_hook: Vec<HookDefinition>,
    /// Options offered by the git hooks step, in display order.
    pub git_hooks: Vec<GitHookOption>,
    /// Default `statusLine` command.
    pub status_line_command: String,
    /// Environment variable set to `"1"` by the agent teams step.
    pub agent_teams_env: String,
}

impl Catalog {
    /// Load the catalog embedded in the binary.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed. This is a compile-time
    /// invariant -- if the binary was built and tested, the TOML is valid.
    pub fn embedded() -> Self {
        Self::from_parts(TEMPLATE_MD, HOOKS_TOML).expect("embedded hooks.toml is invalid")
    }

    /// Build a catalog from a template and a `hooks.toml` document.
    pub fn from_parts(template: &str, hooks_toml: &str) -> Result<Self, toml::de::Error> {
        let lib: HookLibrary = toml::from_str(hooks_toml)?;
        Ok(Self {
            template: template.to_string(),
            test_hook: lib.test_hook,
            git_hooks: lib.git_hooks,
            status_line_command: lib.status_line_command,
            agent_teams_env: lib.agent_teams_env,
        })
    }

    pub fn git_hook(&self, name: &str) -> Option<&GitHookOption> {
        self.git_hooks.iter().find(|g| g.name == name)
    }
}

#[cfg(test)]
mod tests {
    use crate::conflict::detect;

    use super::*;

    #[test]
    fn embedded_catalog_loads() {
        let catalog = Catalog::embedded();
        assert!(catalog.template.contains("## Model Tiering"));
        assert_eq!(catalog.agent_teams_env, "CLAUDE_CODE_EXPERIMENTAL_AGENT_TEAMS");
        assert!(!catalog.status_line_command.is_empty());
    }

    #[test]
    fn test_hook_covers_stop_and_subagent_stop() {
        let catalog = Catalog::embedded();
        let triggers: Vec<&str> = catalog
            .test_hook
            .iter()
            .map(|h| h.trigger.as_str())
            .collect();
        assert_eq!(triggers, vec!["Stop", "SubagentStop"]);
        for def in &catalog.test_hook {
            assert_eq!(def.handlers[0].kind, "prompt");
            assert_eq!(def.handlers[0].timeout, Some(30));
        }
    }

    #[test]
    fn git_hooks_are_bash_pre_tool_use() {
        let catalog = Catalog::embedded();
        assert!(catalog.git_hook("preCommitReview").is_some());
        assert!(catalog.git_hook("pushGuard").is_some());
        for option in &catalog.git_hooks {
            for def in &option.hooks {
                assert_eq!(def.trigger, "PreToolUse");
                assert_eq!(def.matcher.as_deref(), Some("Bash"));
            }
        }
    }

    #[test]
    fn git_hook_names_are_unique() {
        let catalog = Catalog::embedded();
        let mut names: Vec<&str> = catalog.git_hooks.iter().map(|g| g.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), catalog.git_hooks.len());
    }

    #[test]
    fn template_sections_are_detected_as_conflicts() {
        let report = detect(&Catalog::embedded().template);
        assert!(report.get("model_tiering").is_some());
        assert!(report.get("verification_policy").is_some());
        assert!(!report.has_previous_setup());
    }

    #[test]
    fn from_parts_rejects_bad_toml() {
        assert!(Catalog::from_parts("x", "status_line_command = ").is_err());
    }
}
