//! Whole-file text I/O behind a small trait.
//!
//! The runner never touches `std::fs` directly; it goes through
//! [`Filesystem`] so tests can count writes or fail them on purpose.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Errors from reading or writing a configuration file.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// The path the failed operation was attempted on.
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. } | Self::Write { path, .. } => path,
        }
    }
}

/// Read and overwrite whole text files.
pub trait Filesystem {
    /// Read a file. A missing file is `Ok(None)`, not an error.
    fn read(&self, path: &Path) -> Result<Option<String>, FsError>;

    /// Replace the file's contents, creating parent directories as needed.
    fn write(&mut self, path: &Path, contents: &str) -> Result<(), FsError>;
}

/// The real filesystem. Writes are atomic (temp file + rename).
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl Filesystem for RealFs {
    fn read(&self, path: &Path) -> Result<Option<String>, FsError> {
        match std::fs::read_to_string(path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(FsError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn write(&mut self, path: &Path, contents: &str) -> Result<(), FsError> {
        write_atomic(path, contents).map_err(|source| FsError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Write `contents` to a temp file next to `path`, then rename it over
/// `path`. Readers see either the old or the new file, never a torn one.
pub fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;

    // Temp files start out 0600; keep the mode of the file being replaced.
    match std::fs::metadata(path) {
        Ok(meta) => tmp.as_file().set_permissions(meta.permissions())?,
        #[cfg(unix)]
        Err(_) => {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o644))?;
        }
        #[cfg(not(unix))]
        Err(_) => {}
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    debug!(path = %path.display(), bytes = contents.len(), "wrote file");
    Ok(())
}
