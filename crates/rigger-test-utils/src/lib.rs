//! Shared test utilities for rigger integration tests.
//!
//! - [`Sandbox`]: a temp directory holding a fake Claude home, a project and
//!   a state file, plus a [`SetupContext`] pointing at them.
//! - [`ScriptedPrompter`]: answers questions from a queue and records what
//!   was asked.
//! - [`RecordingFs`]: the real filesystem, with a write log and optional
//!   injected write failures.

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use rigger_core::fs::{Filesystem, FsError, RealFs};
use rigger_core::prompt::{PromptError, Prompter, Question, Reply};
use rigger_core::{Catalog, SetupContext, SetupPaths, StateStore};

/// Version string written into completion markers by sandbox contexts.
pub const TEST_VERSION: &str = "0.0.0-test";

// ---------------------------------------------------------------------------
// Sandbox
// ---------------------------------------------------------------------------

/// Isolated directory tree for one test.
pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create sandbox dir");
        std::fs::create_dir_all(dir.path().join("home/.claude")).expect("create claude home");
        std::fs::create_dir_all(dir.path().join("project")).expect("create project");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn claude_home(&self) -> PathBuf {
        self.root().join("home/.claude")
    }

    pub fn project_dir(&self) -> PathBuf {
        self.root().join("project")
    }

    pub fn state_file(&self) -> PathBuf {
        self.root().join("config/rigger/setup-state.json")
    }

    pub fn paths(&self) -> SetupPaths {
        SetupPaths::new(self.claude_home(), self.project_dir())
    }

    pub fn store(&self) -> StateStore {
        StateStore::new(self.state_file())
    }

    /// Context with the embedded catalog.
    pub fn context(&self) -> SetupContext {
        SetupContext::new(self.paths(), Catalog::embedded(), TEST_VERSION)
    }

    /// Write `contents` to `path`, creating parent directories.
    pub fn write(&self, path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(path, contents).expect("write sandbox file");
    }

    /// Read `path`, `None` if it does not exist.
    pub fn read(&self, path: &Path) -> Option<String> {
        match std::fs::read_to_string(path) {
            Ok(s) => Some(s),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => panic!("failed to read {}: {e}", path.display()),
        }
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Prompter
// ---------------------------------------------------------------------------

/// One scripted reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scripted {
    /// Pick one choice by index.
    Pick(usize),
    /// Pick several choices (multi-select only).
    Many(Vec<usize>),
    /// Give no answer.
    Default,
    /// Stop the setup.
    Abort,
}

/// Yes on a yes/no question.
pub const YES: Scripted = Scripted::Pick(0);
/// No on a yes/no question.
pub const NO: Scripted = Scripted::Pick(1);

/// Answers questions in order from a fixed script.
///
/// Panics if asked more questions than scripted, so a test notices when the
/// runner asks something it should not have.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    script: VecDeque<Scripted>,
    /// Every question asked, in order.
    pub asked: Vec<Question>,
    /// Every notice shown, in order.
    pub notices: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Ids of the questions asked so far.
    pub fn asked_ids(&self) -> Vec<&str> {
        self.asked.iter().map(|q| q.id.as_str()).collect()
    }

    /// Scripted replies that were never used.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    fn next(&mut self, question: &Question) -> Scripted {
        self.asked.push(question.clone());
        self.script
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted question {:?}", question.id))
    }
}

impl Prompter for ScriptedPrompter {
    fn select(&mut self, question: &Question) -> Result<Reply<usize>, PromptError> {
        Ok(match self.next(question) {
            Scripted::Pick(i) => Reply::Answered(i),
            Scripted::Default => Reply::Unanswered,
            Scripted::Abort => Reply::Aborted,
            Scripted::Many(v) => panic!("multi answer {v:?} for single question {:?}", question.id),
        })
    }

    fn multi_select(&mut self, question: &Question) -> Result<Reply<Vec<usize>>, PromptError> {
        Ok(match self.next(question) {
            Scripted::Pick(i) => Reply::Answered(vec![i]),
            Scripted::Many(v) => Reply::Answered(v),
            Scripted::Default => Reply::Unanswered,
            Scripted::Abort => Reply::Aborted,
        })
    }

    fn notify(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}

// ---------------------------------------------------------------------------
// Filesystem
// ---------------------------------------------------------------------------

/// [`RealFs`] plus a log of every write.
#[derive(Debug, Default)]
pub struct RecordingFs {
    inner: RealFs,
    /// Paths written, in order.
    pub writes: Vec<PathBuf>,
    fail_on: Option<PathBuf>,
}

impl RecordingFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write to `path` fail.
    pub fn fail_writes_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.fail_on = Some(path.into());
        self
    }

    /// How many times `path` was written.
    pub fn writes_to(&self, path: &Path) -> usize {
        self.writes.iter().filter(|p| p.as_path() == path).count()
    }
}

impl Filesystem for RecordingFs {
    fn read(&self, path: &Path) -> Result<Option<String>, FsError> {
        self.inner.read(path)
    }

    fn write(&mut self, path: &Path, contents: &str) -> Result<(), FsError> {
        if self.fail_on.as_deref() == Some(path) {
            return Err(FsError::Write {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "injected failure"),
            });
        }
        self.inner.write(path, contents)?;
        self.writes.push(path.to_path_buf());
        Ok(())
    }
}
