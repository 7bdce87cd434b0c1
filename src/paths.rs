use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Result, VidToolsError};

pub const VIDEO_EXTENSIONS: [&str; 9] = ["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm", "m4v", "ts"];

/// A video file to process and where it sits relative to the directory it was found in
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    /// Directory of `path` relative to the walked input directory; empty for direct file inputs
    pub relative_dir: PathBuf,
}

pub fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn require_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(VidToolsError::FileNotFound(path.display().to_string()))
    }
}

/// Expand files and directories into the list of video files to process.
/// Directories named in `skip_dirs` (earlier outputs) are not descended into.
pub fn discover_videos(inputs: &[PathBuf], skip_dirs: &[&str]) -> Result<Vec<DiscoveredFile>> {
    let mut files = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<DiscoveredFile> = WalkDir::new(input)
                .into_iter()
                .filter_entry(|e| {
                    e.depth() == 0
                        || !e.file_type().is_dir()
                        || !skip_dirs.iter().any(|d| e.file_name() == *d)
                })
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_video(e.path()))
                .map(|e| {
                    let parent = e.path().parent().unwrap_or(input.as_path());
                    DiscoveredFile {
                        path: e.path().to_path_buf(),
                        relative_dir: pathdiff::diff_paths(parent, input).unwrap_or_default(),
                    }
                })
                .collect();
            found.sort_by(|a, b| a.path.cmp(&b.path));
            debug!("Found {} video files under {}", found.len(), input.display());
            files.extend(found);
        } else if input.is_file() {
            files.push(DiscoveredFile {
                path: input.clone(),
                relative_dir: PathBuf::new(),
            });
        } else {
            return Err(VidToolsError::FileNotFound(input.display().to_string()));
        }
    }

    Ok(files)
}

/// `<parent>/<subdir>/<file_name>`, or `<override>/<relative_dir>/<file_name>` when an output directory is given
pub fn derived_output(
    file: &DiscoveredFile,
    output_dir: Option<&Path>,
    conventional_dir: &str,
    file_name: &str,
) -> PathBuf {
    match output_dir {
        Some(dir) => dir.join(&file.relative_dir).join(file_name),
        None => sibling_output(&file.path, conventional_dir, file_name),
    }
}

/// `<parent of input>/<subdir>/<file_name>`
pub fn sibling_output(input: &Path, conventional_dir: &str, file_name: &str) -> PathBuf {
    input
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(conventional_dir)
        .join(file_name)
}

pub fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| VidToolsError::InvalidArgument(format!("Invalid filename: {}", path.display())))
}

pub fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| VidToolsError::InvalidArgument(format!("Invalid filename: {}", path.display())))
}

/// Create the parent directory of `path` and refuse to overwrite `input` in place
pub async fn prepare_output(input: &Path, output: &Path) -> Result<()> {
    if output == input {
        return Err(VidToolsError::InvalidArgument(format!(
            "Output would overwrite input: {}",
            input.display()
        )));
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    // Catches `./a.mp4`, `x/../a.mp4` and symlinks that name the input
    if let (Ok(input), Ok(existing)) = (tokio::fs::canonicalize(input).await, tokio::fs::canonicalize(output).await) {
        if input == existing {
            return Err(VidToolsError::InvalidArgument(format!(
                "Output would overwrite input: {}",
                input.display()
            )));
        }
    }
    Ok(())
}
