// ── Playlist store ──
//
// Flat directory scan plus a cyclic cursor. The list is rebuilt on every
// new voice session and never mutated in between.

use std::path::{Path, PathBuf};

use tracing::{error, warn};

use crate::model::Track;

/// Sorted track list with a wrapping cursor.
#[derive(Debug, Clone)]
pub struct PlaylistStore {
    dir: PathBuf,
    extensions: Vec<String>,
    tracks: Vec<Track>,
    cursor: usize,
}

impl PlaylistStore {
    pub fn new(dir: impl Into<PathBuf>, extensions: &[String]) -> Self {
        Self {
            dir: dir.into(),
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
            tracks: Vec::new(),
            cursor: 0,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Rescan the directory and reset the cursor to the first track.
    ///
    /// A directory that cannot be read yields an empty playlist.
    pub fn refresh(&mut self) -> usize {
        self.cursor = 0;
        self.tracks = match scan(&self.dir, &self.extensions) {
            Ok(tracks) => tracks,
            Err(e) => {
                error!(dir = %self.dir.display(), error = %e, "failed to read audio directory");
                Vec::new()
            }
        };

        if self.tracks.is_empty() {
            warn!(dir = %self.dir.display(), "no playable tracks found");
        }
        self.tracks.len()
    }

    /// Track under the cursor; advances the cursor, wrapping to the start.
    pub fn next(&mut self) -> Option<Track> {
        let track = self.tracks.get(self.cursor)?.clone();
        self.cursor = (self.cursor + 1) % self.tracks.len();
        Some(track)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn reset_cursor(&mut self) {
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }
}

fn scan(dir: &Path, extensions: &[String]) -> std::io::Result<Vec<Track>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if has_extension(&name, extensions) {
            names.push(name);
        }
    }

    // Raw name breaks ties between names that differ only by case.
    names.sort_by(|a, b| {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });

    Ok(names
        .into_iter()
        .map(|name| Track::new(dir.join(name)))
        .collect())
}

fn has_extension(name: &str, extensions: &[String]) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.iter().any(|e| *e == ext))
}
