//! Where the configuration and settings documents live for each [`Scope`].

use std::path::{Path, PathBuf};

use crate::state::Scope;

/// File name of the configuration document in either scope.
pub const CONFIG_DOCUMENT: &str = "CLAUDE.md";
/// File name of the settings document in either scope.
pub const SETTINGS_DOCUMENT: &str = "settings.json";
/// Per-project directory holding local-scope files.
pub const PROJECT_DIR: &str = ".claude";

/// The two roots a setup can target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupPaths {
    /// Machine-wide Claude Code directory (usually `~/.claude`).
    pub claude_home: PathBuf,
    /// The project a local-scope setup applies to.
    pub project_dir: PathBuf,
}

impl SetupPaths {
    pub fn new(claude_home: impl Into<PathBuf>, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            claude_home: claude_home.into(),
            project_dir: project_dir.into(),
        }
    }

    /// Directory holding both documents for `scope`.
    pub fn scope_dir(&self, scope: Scope) -> PathBuf {
        match scope {
            Scope::Global => self.claude_home.clone(),
            Scope::Local => self.project_dir.join(PROJECT_DIR),
        }
    }

    /// `CLAUDE.md` for `scope`.
    pub fn config_document(&self, scope: Scope) -> PathBuf {
        self.scope_dir(scope).join(CONFIG_DOCUMENT)
    }

    /// `settings.json` for `scope`.
    pub fn settings_document(&self, scope: Scope) -> PathBuf {
        self.scope_dir(scope).join(SETTINGS_DOCUMENT)
    }
}

/// Backup path written next to a settings document before its first change.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    path.with_file_name(name)
}
