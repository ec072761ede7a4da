//! Configuration file management for rigger.
//!
//! Provides an optional TOML config file at `~/.config/rigger/config.toml`
//! and a resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use rigger_core::state::store::STATE_FILE_NAME;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub status_line: StatusLineSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PathsSection {
    /// Claude Code home directory (global scope target).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claude_home: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StatusLineSection {
    /// Replaces the bundle's status line command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

/// Keys accepted by `rigger config set`.
pub const KNOWN_KEYS: [&str; 3] = ["paths.claude_home", "paths.state_file", "status_line.command"];

/// Written by `rigger config init`.
const CONFIG_TEMPLATE: &str = r#"# rigger configuration
#
# Precedence: command-line flag > environment variable > this file > default.

[paths]
# Claude Code home, target of the global scope (env: RIGGER_CLAUDE_HOME, CLAUDE_CONFIG_DIR).
# claude_home = "~/.claude"

# Where setup progress is saved (env: RIGGER_STATE_FILE).
# state_file = "~/.config/rigger/setup-state.json"

[status_line]
# Command installed as the Claude Code status line.
# command = "npx -y ccstatusline@latest"
"#;

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the rigger config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/rigger` or `~/.config/rigger`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME")
        && !xdg.is_empty()
    {
        return PathBuf::from(xdg).join("rigger");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("rigger")
}

/// Return the path to the rigger config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Expand a leading `~/` against the home directory.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file at `path`. A missing file is `None`.
pub fn load_config_from(path: &Path) -> Result<Option<ConfigFile>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e)
                .with_context(|| format!("failed to read config file at {}", path.display()));
        }
    };
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(Some(config))
}

/// Write `contents` to `path`, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
fn write_config_text(path: &Path, contents: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

/// Write the commented default config to `path`.
pub fn init_config_at(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }
    write_config_text(path, CONFIG_TEMPLATE)
}

/// Set `key` (`section.name`) to `value` in the config file at `path`,
/// preserving all other content including comments and formatting.
pub fn set_config_value(path: &Path, key: &str, value: &str) -> Result<()> {
    if !KNOWN_KEYS.contains(&key) {
        bail!(
            "unknown config key {key:?} (expected one of: {})",
            KNOWN_KEYS.join(", ")
        );
    }
    let Some((section, name)) = key.split_once('.') else {
        bail!("config key {key:?} must look like section.name");
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };

    let mut doc: toml_edit::DocumentMut = content
        .parse::<toml_edit::DocumentMut>()
        .with_context(|| format!("failed to parse {} as TOML document", path.display()))?;

    let table = doc
        .entry(section)
        .or_insert_with(toml_edit::table)
        .as_table_mut()
        .with_context(|| format!("[{section}] in {} is not a table", path.display()))?;
    table.insert(name, toml_edit::value(value));

    write_config_text(path, &doc.to_string())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given on the command line.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub claude_home: Option<PathBuf>,
    pub state_file: Option<PathBuf>,
    pub project_dir: Option<PathBuf>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug, Clone)]
pub struct RiggerConfig {
    pub claude_home: PathBuf,
    pub state_file: PathBuf,
    pub project_dir: PathBuf,
    pub status_line_command: Option<String>,
    /// The config file consulted, and whether it existed.
    pub config_file: PathBuf,
    pub config_file_found: bool,
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

impl RiggerConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - Claude home: `--claude-home` > `RIGGER_CLAUDE_HOME` > `CLAUDE_CONFIG_DIR`
    ///   > `paths.claude_home` > `~/.claude`
    /// - State file: `--state-file` > `RIGGER_STATE_FILE` > `paths.state_file`
    ///   > `<config dir>/setup-state.json`
    /// - Project dir: `--project-dir` > current directory
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let config_file = config_path();
        let file_config = load_config_from(&config_file)?;
        let config_file_found = file_config.is_some();
        let file_config = file_config.unwrap_or_default();

        let claude_home = if let Some(p) = &cli.claude_home {
            p.clone()
        } else if let Some(p) = env_path("RIGGER_CLAUDE_HOME") {
            p
        } else if let Some(p) = env_path("CLAUDE_CONFIG_DIR") {
            p
        } else if let Some(p) = &file_config.paths.claude_home {
            expand_home(p)
        } else {
            dirs::home_dir()
                .context("cannot determine home directory; pass --claude-home")?
                .join(".claude")
        };

        let state_file = if let Some(p) = &cli.state_file {
            p.clone()
        } else if let Some(p) = env_path("RIGGER_STATE_FILE") {
            p
        } else if let Some(p) = &file_config.paths.state_file {
            expand_home(p)
        } else {
            config_dir().join(STATE_FILE_NAME)
        };

        let project_dir = match &cli.project_dir {
            Some(p) => p.clone(),
            None => std::env::current_dir().context("failed to read current directory")?,
        };

        Ok(Self {
            claude_home,
            state_file,
            project_dir,
            status_line_command: file_config.status_line.command,
            config_file,
            config_file_found,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        crate::test_util::lock_env()
    }

    const VARS: [&str; 5] = [
        "XDG_CONFIG_HOME",
        "HOME",
        "RIGGER_CLAUDE_HOME",
        "CLAUDE_CONFIG_DIR",
        "RIGGER_STATE_FILE",
    ];

    /// Point the config dir at a temp dir and clear rigger env vars, running
    /// `f` and restoring the environment afterwards.
    fn with_clean_env<T>(f: impl FnOnce(&Path) -> T) -> T {
        let _lock = lock_env();
        let saved: Vec<(&str, Option<std::ffi::OsString>)> =
            VARS.iter().map(|v| (*v, std::env::var_os(v))).collect();

        let tmp = tempfile::TempDir::new().unwrap();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path().join("xdg")) };
        unsafe { std::env::set_var("HOME", tmp.path().join("home")) };
        for v in &VARS[2..] {
            unsafe { std::env::remove_var(v) };
        }

        let result = f(tmp.path());

        for (name, value) in saved {
            match value {
                Some(v) => unsafe { std::env::set_var(name, v) },
                None => unsafe { std::env::remove_var(name) },
            }
        }
        result
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        with_clean_env(|_| {
            let path = config_path();
            assert!(
                path.ends_with("rigger/config.toml"),
                "unexpected config path: {}",
                path.display()
            );
        });
    }

    #[test]
    fn defaults_when_nothing_set() {
        with_clean_env(|tmp| {
            let cfg = RiggerConfig::resolve(&CliOverrides::default()).unwrap();
            assert_eq!(cfg.claude_home, tmp.join("home/.claude"));
            assert_eq!(cfg.state_file, tmp.join("xdg/rigger/setup-state.json"));
            assert!(!cfg.config_file_found);
            assert_eq!(cfg.status_line_command, None);
        });
    }

    #[test]
    fn cli_flag_overrides_env_and_file() {
        with_clean_env(|tmp| {
            set_config_value(&config_path(), "paths.claude_home", "/from/file").unwrap();
            unsafe { std::env::set_var("RIGGER_CLAUDE_HOME", "/from/env") };

            let cli = CliOverrides {
                claude_home: Some(tmp.join("cli")),
                ..CliOverrides::default()
            };
            let cfg = RiggerConfig::resolve(&cli).unwrap();
            assert_eq!(cfg.claude_home, tmp.join("cli"));

            let cfg = RiggerConfig::resolve(&CliOverrides::default()).unwrap();
            assert_eq!(cfg.claude_home, PathBuf::from("/from/env"));
        });
    }

    #[test]
    fn rigger_env_var_wins_over_claude_config_dir() {
        with_clean_env(|_| {
            unsafe { std::env::set_var("CLAUDE_CONFIG_DIR", "/claude/dir") };
            let cfg = RiggerConfig::resolve(&CliOverrides::default()).unwrap();
            assert_eq!(cfg.claude_home, PathBuf::from("/claude/dir"));

            unsafe { std::env::set_var("RIGGER_CLAUDE_HOME", "/rigger/home") };
            let cfg = RiggerConfig::resolve(&CliOverrides::default()).unwrap();
            assert_eq!(cfg.claude_home, PathBuf::from("/rigger/home"));
        });
    }

    #[test]
    fn config_file_values_are_used_and_tilde_expanded() {
        with_clean_env(|tmp| {
            let path = config_path();
            set_config_value(&path, "paths.state_file", "~/state.json").unwrap();
            set_config_value(&path, "status_line.command", "my-status").unwrap();

            let cfg = RiggerConfig::resolve(&CliOverrides::default()).unwrap();
            assert!(cfg.config_file_found);
            assert_eq!(cfg.state_file, tmp.join("home/state.json"));
            assert_eq!(cfg.status_line_command.as_deref(), Some("my-status"));
        });
    }

    #[test]
    fn invalid_config_file_is_an_error() {
        with_clean_env(|_| {
            write_config_text(&config_path(), "[paths\n").unwrap();
            let err = RiggerConfig::resolve(&CliOverrides::default()).unwrap_err();
            assert!(format!("{err:#}").contains("failed to parse config file"));
        });
    }

    #[test]
    fn set_preserves_comments() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        init_config_at(&path, false).unwrap();

        set_config_value(&path, "paths.claude_home", "/x").unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("# rigger configuration"));
        assert!(text.contains("claude_home = \"/x\""));

        let parsed = load_config_from(&path).unwrap().unwrap();
        assert_eq!(parsed.paths.claude_home, Some(PathBuf::from("/x")));
    }

    #[test]
    fn set_rejects_unknown_keys() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = set_config_value(&tmp.path().join("c.toml"), "paths.nope", "1").unwrap_err();
        assert!(err.to_string().contains("unknown config key"));
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        init_config_at(&path, false).unwrap();
        assert!(init_config_at(&path, false).is_err());
        init_config_at(&path, true).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn written_config_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested/config.toml");
        init_config_at(&path, false).unwrap();

        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }
}
