//! Conflict handling for the target `CLAUDE.md`.
//!
//! [`detect`] reports which known sections the user's document already has;
//! [`resolve`] turns a [`Resolution`] choice into the new document text.

pub mod detector;
pub mod resolver;

pub use detector::{ConflictMatch, ConflictPattern, ConflictReport, PATTERNS, detect};
pub use resolver::{
    BLOCK_BEGIN_PREFIX, BLOCK_END, Resolved, SEPARATOR, content_fingerprint, managed_block,
    resolve,
};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How to reconcile the bundle content with an existing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Append the bundle content after a separator.
    Merge,
    /// Comment out the conflicting regions, then append.
    Replace,
    /// Leave the document alone.
    Skip,
}

impl Resolution {
    pub const ALL: [Resolution; 3] = [Self::Merge, Self::Replace, Self::Skip];
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Merge => "merge",
            Self::Replace => "replace",
            Self::Skip => "skip",
        };
        f.write_str(s)
    }
}

impl FromStr for Resolution {
    type Err = ResolutionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "merge" => Ok(Self::Merge),
            "replace" => Ok(Self::Replace),
            "skip" => Ok(Self::Skip),
            other => Err(ResolutionParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Resolution`] string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid resolution: {0:?} (expected merge, replace, or skip)")]
pub struct ResolutionParseError(pub String);
