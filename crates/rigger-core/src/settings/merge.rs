//! Additive merge of hook definitions into a [`SettingsDocument`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::{HookGroup, HookHandler, SettingsDocument};

/// A named hook to install: the trigger it runs on plus one hook group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookDefinition {
    /// Lifecycle event, e.g. `Stop`, `SubagentStop`, `PreToolUse`.
    pub trigger: String,
    /// Tool matcher for tool events (`Bash`, `Edit|Write`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matcher: Option<String>,
    pub handlers: Vec<HookHandler>,
}

impl HookDefinition {
    pub fn new(trigger: impl Into<String>, handlers: Vec<HookHandler>) -> Self {
        Self {
            trigger: trigger.into(),
            matcher: None,
            handlers,
        }
    }

    pub fn matcher(mut self, matcher: impl Into<String>) -> Self {
        self.matcher = Some(matcher.into());
        self
    }

    /// The entry appended to the trigger's array.
    pub fn to_group(&self) -> HookGroup {
        HookGroup {
            matcher: self.matcher.clone(),
            hooks: self.handlers.clone(),
            extra: Map::new(),
        }
    }
}

/// What to do when an identical group is already registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Always append. Re-running with the same definition duplicates it.
    #[default]
    Append,
    /// Skip a definition whose group is already present verbatim.
    SkipIdentical,
}

/// Merge `definitions` into `settings.hooks`.
///
/// For each definition, the trigger's array is created if missing, otherwise
/// the new group is appended after the existing entries. Existing entries are
/// never removed or reordered. Returns how many groups were added.
pub fn merge_hooks(
    settings: &mut SettingsDocument,
    definitions: &[HookDefinition],
    mode: MergeMode,
) -> usize {
    let mut added = 0;

    for def in definitions {
        let group = match serde_json::to_value(def.to_group()) {
            Ok(v) => v,
            Err(e) => {
                // HookGroup holds only strings, numbers and maps.
                debug!(trigger = %def.trigger, error = %e, "skipping unserializable hook");
                continue;
            }
        };

        let slot = settings
            .hooks
            .entry(def.trigger.clone())
            .or_insert_with(|| Value::Array(Vec::new()));

        // A non-array value under a trigger is kept as the array's first entry
        // rather than discarded.
        if !slot.is_array() {
            let previous = std::mem::take(slot);
            *slot = Value::Array(vec![previous]);
        }
        let Some(entries) = slot.as_array_mut() else {
            continue;
        };

        if mode == MergeMode::SkipIdentical && entries.contains(&group) {
            debug!(trigger = %def.trigger, "hook already present");
            continue;
        }

        entries.push(group);
        added += 1;
    }

    added
}
