//! File system helpers for writing rendered documents.
//!
//! Output files are never overwritten. [`unique_output_path`] picks a free
//! name next to any existing output and [`atomic_write`] writes it through a
//! temporary file so a reader never sees a partial document.

use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Create a directory and its parents if missing.
///
/// # Errors
///
/// Fails when the directory cannot be created or the path exists and is not a directory.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// The content goes to a `.tmp` sibling first, is synced to disk, then the
/// temporary file is renamed over the target. Parent directories are created.
///
/// ```rust,no_run
/// use memofill::utils::fs::atomic_write;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// atomic_write(Path::new("out/memo.md"), b"# Credit Memo")?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Fails when any step of the write fails. The temporary file is removed on a failed rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }

    let temp_path = temp_sibling(path);
    {
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
        file.write_all(content)
            .with_context(|| format!("Failed to write to temp file: {}", temp_path.display()))?;
        file.sync_all().with_context(|| "Failed to sync file to disk")?;
    }

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(err).with_context(|| format!("Failed to rename temp file to: {}", path.display()));
    }
    debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// First free output path for `stem.ext` in `dir`.
///
/// Returns `stem.ext` when free. Otherwise numbered names are tried,
/// `stem_2.ext` through `stem_{limit}.ext`. A stem that already ends in
/// `_N` continues from `N + 1` on its base name. When every numbered name is
/// taken the name gets a `%Y%m%d_%H%M%S` timestamp instead.
pub fn unique_output_path(dir: &Path, stem: &str, ext: &str, limit: u32) -> PathBuf {
    let file_name = |name: &str| {
        if ext.is_empty() {
            name.to_string()
        } else {
            format!("{name}.{ext}")
        }
    };

    let candidate = dir.join(file_name(stem));
    if !candidate.exists() {
        return candidate;
    }

    let (base, start) = split_counter(stem);
    for counter in start..=limit {
        let candidate = dir.join(file_name(&format!("{base}_{counter}")));
        if !candidate.exists() {
            return candidate;
        }
    }

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    debug!("Numbered names for '{stem}' exhausted at {limit}, using timestamp");
    dir.join(file_name(&format!("{base}_{timestamp}")))
}

/// Split a trailing `_N` counter off a stem: the base and the next counter.
fn split_counter(stem: &str) -> (&str, u32) {
    if let Some((base, digits)) = stem.rsplit_once('_') {
        if !base.is_empty() && !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(counter) = digits.parse::<u32>() {
                return (base, counter.saturating_add(1).max(2));
            }
        }
    }
    (stem, 2)
}
