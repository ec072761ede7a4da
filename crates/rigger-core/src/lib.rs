//! Core library for `rigger`, the resumable Claude Code bundle installer.
//!
//! The pieces, leaves first:
//!
//! - [`state`]: the persisted [`SetupState`] and its [`StateStore`].
//! - [`conflict`]: pattern-based conflict detection in a `CLAUDE.md` and the
//!   merge / replace / skip resolver.
//! - [`settings`]: typed Claude Code `settings.json` model and the additive
//!   hook merger.
//! - [`catalog`]: the embedded bundle content (template, hooks, toggles).
//! - [`runner`]: the step state machine that ties everything together.
//!
//! ```text
//! StepRunner --prompts--> dyn Prompter
//!     |
//!     +--reads/writes--> dyn Filesystem (CLAUDE.md, settings.json)
//!     |
//!     +--after each step--> StateStore (setup-state.json)
//! ```

pub mod catalog;
pub mod conflict;
pub mod fs;
pub mod paths;
pub mod prompt;
pub mod runner;
pub mod settings;
pub mod state;

pub use catalog::Catalog;
pub use conflict::{ConflictReport, Resolution};
pub use fs::{Filesystem, FsError, RealFs};
pub use paths::SetupPaths;
pub use prompt::{Choice, PromptError, Prompter, Question, Reply};
pub use runner::{RunOutcome, SetupContext, SetupError, SetupStep, StepRunner};
pub use settings::{HookDefinition, SettingsDocument};
pub use state::{Scope, SetupState, StateStore};
