//! Typed model of a Claude Code `settings.json`.
//!
//! Only the keys this tool edits are typed: `hooks`, `env` and
//! `statusLine`. Everything else, at every level, is carried through
//! `extra` maps untouched and in its original order.

pub mod merge;

pub use merge::{HookDefinition, MergeMode, merge_hooks};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from parsing or serializing a settings document.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The existing file is not something we can safely rewrite.
    #[error("cannot parse settings file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize settings: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// One handler inside a hook group (`{"type": "prompt", "prompt": ..., "timeout": 30}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookHandler {
    /// `prompt` or `command`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HookHandler {
    pub fn prompt(text: impl Into<String>, timeout: u64) -> Self {
        Self {
            kind: "prompt".to_string(),
            prompt: Some(text.into()),
            command: None,
            timeout: Some(timeout),
            extra: Map::new(),
        }
    }

    pub fn command(command: impl Into<String>, timeout: u64) -> Self {
        Self {
            kind: "command".to_string(),
            prompt: None,
            command: Some(command.into()),
            timeout: Some(timeout),
            extra: Map::new(),
        }
    }
}

/// One element of a trigger's array: an optional tool matcher plus handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matcher: Option<String>,
    #[serde(default)]
    pub hooks: Vec<HookHandler>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `statusLine` setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusLine {
    #[serde(rename = "type")]
    pub kind: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StatusLine {
    pub fn command(command: impl Into<String>) -> Self {
        Self {
            kind: "command".to_string(),
            command: command.into(),
            padding: None,
            extra: Map::new(),
        }
    }
}

/// A Claude Code settings document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsDocument {
    /// Trigger name (`Stop`, `PreToolUse`, ...) to hook groups.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub hooks: Map<String, Value>,
    /// Environment variables. Values other than strings are kept as-is.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub env: Map<String, Value>,
    #[serde(
        default,
        rename = "statusLine",
        skip_serializing_if = "Option::is_none"
    )]
    pub status_line: Option<StatusLine>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SettingsDocument {
    /// Parse settings text. Blank text is an empty document.
    pub fn parse(text: &str, path: &Path) -> Result<Self, SettingsError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Pretty JSON with a trailing newline.
    pub fn to_json_string(&self) -> Result<String, SettingsError> {
        let mut s = serde_json::to_string_pretty(self).map_err(SettingsError::Serialize)?;
        s.push('\n');
        Ok(s)
    }

    /// Set `statusLine`. Returns whether anything changed.
    pub fn set_status_line(&mut self, status_line: StatusLine) -> bool {
        if self.status_line.as_ref() == Some(&status_line) {
            return false;
        }
        self.status_line = Some(status_line);
        true
    }

    /// Set one `env` entry. Returns whether anything changed.
    pub fn set_env(&mut self, key: &str, value: &str) -> bool {
        if self.env.get(key).and_then(Value::as_str) == Some(value) {
            return false;
        }
        self.env
            .insert(key.to_string(), Value::String(value.to_string()));
        true
    }

    /// Hook groups registered for `trigger`, skipping entries that do not
    /// have the hook-group shape.
    pub fn hook_groups(&self, trigger: &str) -> Vec<HookGroup> {
        self.hooks
            .get(trigger)
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| serde_json::from_value(v.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}
