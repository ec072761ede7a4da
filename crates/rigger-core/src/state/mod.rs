//! Persisted setup progress.
//!
//! [`SetupState`] is the whole of what survives between runs: the index of
//! the next step to execute plus every decision made so far. The
//! [`StateStore`] reads and writes it as a single JSON document.

pub mod store;

pub use store::{StateError, StateStore};

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conflict::Resolution;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Where the configuration changes apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Machine-wide: `~/.claude/CLAUDE.md` and `~/.claude/settings.json`.
    Global,
    /// One project: `<project>/.claude/CLAUDE.md` and `<project>/.claude/settings.json`.
    Local,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Global => "global",
            Self::Local => "local",
        };
        f.write_str(s)
    }
}

impl FromStr for Scope {
    type Err = ScopeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(Self::Global),
            "local" => Ok(Self::Local),
            other => Err(ScopeParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Scope`] string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid scope: {0:?} (expected global or local)")]
pub struct ScopeParseError(pub String);

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Feature toggles decided during setup. `None` means "not asked yet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureToggles {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_hook: Option<bool>,
    /// Keyed by git hook option name (`gitHooks.<name>` in user-facing text).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub git_hooks: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_line: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_teams: Option<bool>,
}

/// The "setup complete" marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub at: DateTime<Utc>,
    pub version: String,
}

/// Setup progress as persisted in `setup-state.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupState {
    /// Index of the next step to run. At or beyond the terminal step the
    /// setup is complete.
    #[serde(default)]
    pub step: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    /// The `CLAUDE.md` chosen for `scope`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    #[serde(default)]
    pub features: FeatureToggles,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<Completion>,
}

impl SetupState {
    /// A fresh state at step 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start over at step 0 while keeping every earlier decision, so they can
    /// be offered as defaults when reconfiguring.
    pub fn restart(&self) -> Self {
        Self {
            step: 0,
            completed: None,
            ..self.clone()
        }
    }

    /// Whether the completion marker has been written.
    pub fn is_complete(&self) -> bool {
        self.completed.is_some()
    }
}
