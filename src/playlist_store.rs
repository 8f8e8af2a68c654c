use crate::library::is_audio_file;
use crate::model::Track;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const PLAYLIST_EXTENSION: &str = "playlist";

/// Named playlists stored as `<name>.playlist` files, one track per line.
#[derive(Debug, Clone)]
pub struct PlaylistStore {
    root: PathBuf,
}

impl PlaylistStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.contains(['/', '\\']) || trimmed.starts_with('.') {
            anyhow::bail!("invalid playlist name: {name:?}");
        }
        Ok(self.root.join(format!("{trimmed}.{PLAYLIST_EXTENSION}")))
    }

    pub fn save(&self, name: &str, tracks: &[Track]) -> Result<()> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        let mut body = String::new();
        for track in tracks {
            body.push_str(track.uri());
            body.push('\n');
        }
        fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))?;
        tracing::debug!(playlist = name, tracks = tracks.len(), "playlist saved");
        Ok(())
    }

    /// A missing playlist loads as empty. Blank lines and entries that are not
    /// audio files are skipped.
    pub fn load(&self, name: &str) -> Result<Vec<Track>> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Ok(Vec::new());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read playlist {}", path.display()))?;
        Ok(raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && is_audio_file(Path::new(line)))
            .map(Track::new)
            .collect())
    }

    pub fn names(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("failed to list {}", self.root.display()))?;
        for entry in entries {
            let path = entry?.path();
            let is_playlist = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(PLAYLIST_EXTENSION));
            if !is_playlist || !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("failed to delete {}", path.display()))?;
        }
        Ok(())
    }

    /// Appends `track` unless it is already listed or is not an audio file.
    /// Returns whether the playlist changed.
    pub fn add_track(&self, name: &str, track: &Track) -> Result<bool> {
        let mut tracks = self.load(name)?;
        if tracks.contains(track) || !is_audio_file(Path::new(track.uri())) {
            return Ok(false);
        }
        tracks.push(track.clone());
        self.save(name, &tracks)?;
        Ok(true)
    }

    pub fn remove_track(&self, name: &str, track: &Track) -> Result<bool> {
        let mut tracks = self.load(name)?;
        let Some(index) = tracks.iter().position(|candidate| candidate == track) else {
            return Ok(false);
        };
        tracks.remove(index);
        self.save(name, &tracks)?;
        Ok(true)
    }

    /// Moves the entry at `from` to `to`. Out-of-range or equal indices leave
    /// the playlist untouched.
    pub fn reorder(&self, name: &str, from: usize, to: usize) -> Result<bool> {
        let mut tracks = self.load(name)?;
        if from >= tracks.len() || to >= tracks.len() || from == to {
            return Ok(false);
        }
        let track = tracks.remove(from);
        tracks.insert(to, track);
        self.save(name, &tracks)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tracks(uris: &[&str]) -> Vec<Track> {
        uris.iter().map(|uri| Track::new(*uri)).collect()
    }

    #[test]
    fn save_then_load_keeps_order() {
        let dir = tempdir().expect("tempdir");
        let store = PlaylistStore::new(dir.path().join("lists"));
        let saved = tracks(&["/music/b.flac", "/music/a.mp3"]);

        store.save("evening", &saved).expect("save");

        assert_eq!(store.load("evening").expect("load"), saved);
    }

    #[test]
    fn missing_playlist_loads_empty() {
        let dir = tempdir().expect("tempdir");
        let store = PlaylistStore::new(dir.path());
        assert!(store.load("nope").expect("load").is_empty());
    }

    #[test]
    fn load_skips_blank_and_non_audio_lines() {
        let dir = tempdir().expect("tempdir");
        let store = PlaylistStore::new(dir.path());
        fs::write(
            dir.path().join("mixed.playlist"),
            "/music/a.wav\n\n   \n/music/cover.jpg\n/music/b.OGG\n",
        )
        .expect("write");

        assert_eq!(
            store.load("mixed").expect("load"),
            tracks(&["/music/a.wav", "/music/b.OGG"])
        );
    }

    #[test]
    fn add_track_rejects_duplicates_and_non_audio() {
        let dir = tempdir().expect("tempdir");
        let store = PlaylistStore::new(dir.path());

        assert!(store.add_track("mix", &Track::new("/m/a.mp3")).expect("add"));
        assert!(!store.add_track("mix", &Track::new("/m/a.mp3")).expect("add"));
        assert!(!store.add_track("mix", &Track::new("/m/readme.txt")).expect("add"));

        assert_eq!(store.load("mix").expect("load"), tracks(&["/m/a.mp3"]));
    }

    #[test]
    fn remove_track_reports_whether_it_was_listed() {
        let dir = tempdir().expect("tempdir");
        let store = PlaylistStore::new(dir.path());
        store
            .save("mix", &tracks(&["/m/a.mp3", "/m/b.mp3"]))
            .expect("save");

        assert!(store.remove_track("mix", &Track::new("/m/a.mp3")).expect("remove"));
        assert!(!store.remove_track("mix", &Track::new("/m/z.mp3")).expect("remove"));
        assert_eq!(store.load("mix").expect("load"), tracks(&["/m/b.mp3"]));
    }

    #[test]
    fn reorder_moves_entries_and_ignores_bad_indices() {
        let dir = tempdir().expect("tempdir");
        let store = PlaylistStore::new(dir.path());
        store
            .save("mix", &tracks(&["/m/a.mp3", "/m/b.mp3", "/m/c.mp3"]))
            .expect("save");

        assert!(store.reorder("mix", 0, 2).expect("reorder"));
        assert_eq!(
            store.load("mix").expect("load"),
            tracks(&["/m/b.mp3", "/m/c.mp3", "/m/a.mp3"])
        );

        assert!(!store.reorder("mix", 1, 1).expect("reorder"));
        assert!(!store.reorder("mix", 3, 0).expect("reorder"));
        assert_eq!(
            store.load("mix").expect("load"),
            tracks(&["/m/b.mp3", "/m/c.mp3", "/m/a.mp3"])
        );
    }

    #[test]
    fn names_are_sorted_and_delete_is_idempotent() {
        let dir = tempdir().expect("tempdir");
        let store = PlaylistStore::new(dir.path());
        store.save("zeta", &[]).expect("save");
        store.save("alpha", &[]).expect("save");
        fs::write(dir.path().join("notes.txt"), "x").expect("write");

        assert_eq!(store.names().expect("names"), vec!["alpha", "zeta"]);

        store.delete("zeta").expect("delete");
        store.delete("zeta").expect("second delete is a no-op");
        assert_eq!(store.names().expect("names"), vec!["alpha"]);
    }

    #[test]
    fn rejects_path_like_names() {
        let dir = tempdir().expect("tempdir");
        let store = PlaylistStore::new(dir.path());
        assert!(store.save("../escape", &[]).is_err());
        assert!(store.load("").is_err());
    }
}
