//! Path-validated, two-phase file writing for bundle outputs.
//!
//! Every output is first written to `<name>.tmp` and only renamed into place
//! once all temp files exist, so a watcher never observes a half-written
//! stylesheet or bundle. If any step fails the temp files are removed.

use std::fs;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use rolldown::BundleOutput;
use rolldown_common::Output;

use crate::{Error, Result};

/// One file produced by the bundler, not yet on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    /// Path relative to the output directory, as named by rolldown.
    pub filename: String,
    pub contents: Vec<u8>,
}

impl OutputFile {
    pub fn new(filename: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            contents: contents.into(),
        }
    }

    pub fn is_stylesheet(&self) -> bool {
        self.filename.ends_with(".css")
    }
}

/// A file the writer put in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub size: u64,
}

/// Flatten rolldown's chunks and assets into [`OutputFile`]s.
pub fn collect_outputs(output: &BundleOutput) -> Vec<OutputFile> {
    output
        .assets
        .iter()
        .map(|item| match item {
            Output::Chunk(chunk) => OutputFile::new(chunk.filename.as_str(), chunk.code.as_bytes()),
            Output::Asset(asset) => {
                OutputFile::new(asset.filename.as_str(), asset.source.as_bytes())
            }
        })
        .collect()
}

/// Write `files` into `dir`, prefixing stylesheets with `css_banner`.
///
/// # Errors
///
/// - `InvalidOutputPath` if a filename escapes `dir`
/// - `WriteFailure` if a directory, temp file or rename fails
pub fn write_outputs(files: &[OutputFile], dir: &Path, css_banner: &str) -> Result<Vec<WrittenFile>> {
    let dir = dir.clean();

    fs::create_dir_all(&dir).map_err(|e| {
        Error::WriteFailure(format!(
            "Failed to create output directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let mut operations = Vec::with_capacity(files.len());
    for file in files {
        let target = validate_output_path(&dir, &file.filename)?;
        let contents = if file.is_stylesheet() && !css_banner.is_empty() {
            let mut with_banner = Vec::with_capacity(css_banner.len() + file.contents.len());
            with_banner.extend_from_slice(css_banner.as_bytes());
            with_banner.extend_from_slice(&file.contents);
            with_banner
        } else {
            file.contents.clone()
        };
        operations.push((target, contents));
    }

    write_files_atomic(&operations)?;

    Ok(operations
        .into_iter()
        .map(|(path, contents)| WrittenFile {
            path,
            size: contents.len() as u64,
        })
        .collect())
}

/// Join `filename` onto `base_dir`, rejecting anything that leaves it.
fn validate_output_path(base_dir: &Path, filename: &str) -> Result<PathBuf> {
    if filename.contains('\0') {
        return Err(Error::InvalidOutputPath(
            "Filename contains null byte".to_string(),
        ));
    }

    let full_path = base_dir.join(Path::new(filename).clean()).clean();

    if !full_path.starts_with(base_dir) || full_path == base_dir {
        return Err(Error::InvalidOutputPath(format!(
            "Path '{}' escapes output directory '{}' (resolved to '{}')",
            filename,
            base_dir.display(),
            full_path.display()
        )));
    }

    Ok(full_path)
}

/// `main.js` -> `main.js.tmp`. Appending keeps `main.js` and `main.css` apart.
fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    target.with_file_name(name)
}

fn write_files_atomic(operations: &[(PathBuf, Vec<u8>)]) -> Result<()> {
    let mut temp_files = Vec::with_capacity(operations.len());

    for (target, contents) in operations {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                cleanup_temp_files(&temp_files);
                Error::WriteFailure(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let temp = temp_path_for(target);
        fs::write(&temp, contents).map_err(|e| {
            cleanup_temp_files(&temp_files);
            Error::WriteFailure(format!(
                "Failed to write temporary file '{}': {}",
                temp.display(),
                e
            ))
        })?;

        temp_files.push((temp, target.clone()));
    }

    for (temp, target) in &temp_files {
        fs::rename(temp, target).map_err(|e| {
            cleanup_temp_files(&temp_files);
            Error::WriteFailure(format!(
                "Failed to rename '{}' to '{}': {}",
                temp.display(),
                target.display(),
                e
            ))
        })?;
        tracing::trace!(path = %target.display(), "wrote output");
    }

    Ok(())
}

fn cleanup_temp_files(temp_files: &[(PathBuf, PathBuf)]) {
    for (temp, _) in temp_files {
        if temp.exists() {
            if let Err(e) = fs::remove_file(temp) {
                tracing::warn!(path = %temp.display(), error = %e, "failed to clean up temporary file");
            }
        }
    }
}
