use crate::model::Track;
use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::Path;
use walkdir::WalkDir;

pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "ogg", "m4a", "aac", "opus"];

/// Lists the audio files directly inside `dir`, sorted by path.
/// Subdirectories are not descended into.
pub fn list_audio_files(dir: &Path) -> Result<Vec<Track>> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
        let path = entry.path();
        if entry.file_type().is_file() && is_audio_file(path) {
            paths.push(path.to_path_buf());
        }
    }

    paths.sort();
    tracing::debug!(dir = %dir.display(), tracks = paths.len(), "directory listed");
    Ok(paths.iter().map(|path| Track::from_path(path)).collect())
}

pub fn is_audio_file(path: &Path) -> bool {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    AUDIO_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}
