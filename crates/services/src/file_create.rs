//! Persistence rules for files generated by `/create`.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const FALLBACK_FILE_NAME: &str = "gemini_generated_file.txt";

const MAX_COLLISION_SUFFIX: u32 = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum FileCreateError {
    #[error("Could not determine a directory to save into: {0}")]
    NoTargetDir(#[source] io::Error),
    #[error("No free file name left for '{0}'")]
    NoFreeName(String),
    #[error("Failed to save file {name}: {source}")]
    Write {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Sanitizes the name typed after `/create`. Spaces survive here; they are
/// dropped by [`sanitize_for_disk`] at write time. A name without a single
/// alphanumeric character becomes [`FALLBACK_FILE_NAME`].
pub fn sanitize_requested_name(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | ' '))
        .collect();
    let kept = kept.trim();
    if kept.chars().any(char::is_alphanumeric) {
        kept.to_string()
    } else {
        FALLBACK_FILE_NAME.to_string()
    }
}

/// Final on-disk name: alphanumerics, `.`, `_` and `-` only, never hidden.
pub fn sanitize_for_disk(name: &str) -> String {
    let safe: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    if safe.is_empty() || safe.starts_with('.') {
        FALLBACK_FILE_NAME.to_string()
    } else {
        safe
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveLocation {
    BrowserDir,
    /// The browser directory was usable in principle but not writable.
    WorkingDirNotWritable,
    WorkingDir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDir {
    pub path: PathBuf,
    pub location: SaveLocation,
}

/// The browser's directory when it exists, is not a filesystem root and is
/// writable; the process working directory otherwise.
pub fn resolve_target_dir(browser_dir: Option<&Path>) -> Result<TargetDir, FileCreateError> {
    if let Some(dir) = browser_dir {
        if dir.is_dir() && dir.parent().is_some() {
            if is_writable(dir) {
                return Ok(TargetDir {
                    path: dir.to_path_buf(),
                    location: SaveLocation::BrowserDir,
                });
            }
            tracing::warn!("no write permission in {}, using working dir", dir.display());
            return Ok(TargetDir {
                path: std::env::current_dir().map_err(FileCreateError::NoTargetDir)?,
                location: SaveLocation::WorkingDirNotWritable,
            });
        }
    }
    Ok(TargetDir {
        path: std::env::current_dir().map_err(FileCreateError::NoTargetDir)?,
        location: SaveLocation::WorkingDir,
    })
}

/// Whether the current user can create files in `dir`, checked by creating
/// (and dropping) a temporary file there.
pub fn is_writable(dir: &Path) -> bool {
    match tempfile::NamedTempFile::new_in(dir) {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!("{} is not writable: {}", dir.display(), e);
            false
        }
    }
}

/// Splits like `name.ext` → (`name`, `.ext`); only the last extension counts.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// `name.ext`, then `name_1.ext`, `name_2.ext`, ...
pub fn collision_candidate(name: &str, n: u32) -> String {
    if n == 0 {
        return name.to_string();
    }
    let (base, ext) = split_extension(name);
    format!("{base}_{n}{ext}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub path: PathBuf,
    /// Name actually written.
    pub file_name: String,
    /// Name after disk sanitizing, before collision suffixing.
    pub sanitized_name: String,
    /// True when the sanitizer had to substitute [`FALLBACK_FILE_NAME`].
    pub used_fallback_name: bool,
    pub location: SaveLocation,
}

impl SavedFile {
    pub fn was_renamed(&self) -> bool {
        self.file_name != self.sanitized_name
    }

    /// Short human-readable location, e.g. `project/notes.md`.
    pub fn display_name(&self) -> String {
        match self.location {
            SaveLocation::BrowserDir => {
                let dir = self
                    .path
                    .parent()
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned());
                match dir {
                    Some(dir) => format!("{}/{}", dir, self.file_name),
                    None => self.file_name.clone(),
                }
            }
            SaveLocation::WorkingDir | SaveLocation::WorkingDirNotWritable => {
                format!("{} (in app directory)", self.file_name)
            }
        }
    }
}

/// Writes `content` as a new file. Never overwrites: an existing name gets a
/// numeric suffix. Write failures are returned, not retried.
pub fn save_generated_file(
    requested_name: &str,
    content: &str,
    browser_dir: Option<&Path>,
) -> Result<SavedFile, FileCreateError> {
    let target = resolve_target_dir(browser_dir)?;
    save_into(&target, requested_name, content)
}

pub fn save_into(
    target: &TargetDir,
    requested_name: &str,
    content: &str,
) -> Result<SavedFile, FileCreateError> {
    let sanitized = sanitize_for_disk(requested_name);
    let used_fallback_name = sanitized == FALLBACK_FILE_NAME && requested_name != FALLBACK_FILE_NAME;

    for n in 0..=MAX_COLLISION_SUFFIX {
        let candidate = collision_candidate(&sanitized, n);
        let path = target.path.join(&candidate);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(source) => {
                return Err(FileCreateError::Write {
                    name: candidate,
                    source,
                })
            }
        };
        file.write_all(content.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|source| FileCreateError::Write {
                name: candidate.clone(),
                source,
            })?;
        tracing::info!("created {}", path.display());
        return Ok(SavedFile {
            path,
            file_name: candidate,
            sanitized_name: sanitized,
            used_fallback_name,
            location: target.location,
        });
    }
    Err(FileCreateError::NoFreeName(sanitized))
}
