//! Playlist construction
//!
//! Turns the caller-supplied song list into an immutable, ordered playlist.
//! Every entry is checked once, up front; a single bad entry rejects the whole
//! list so the server never starts with a partial queue.

use crate::error::{Error, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// A validated, readable media file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaReference {
    /// Entry exactly as supplied by the caller
    entry: String,
    /// Filesystem path the entry resolved to
    path: PathBuf,
    /// Size at build time
    size_bytes: u64,
}

impl MediaReference {
    /// Resolve a path or `file://` URI to a readable regular file
    pub fn resolve(entry: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidMediaReference {
            entry: entry.to_string(),
            reason,
        };

        if entry.is_empty() {
            return Err(invalid("empty entry".to_string()));
        }

        let path = if entry.contains("://") {
            let url = Url::parse(entry).map_err(|e| invalid(format!("malformed URI: {}", e)))?;
            if url.scheme() != "file" {
                return Err(invalid(format!("unsupported URI scheme '{}'", url.scheme())));
            }
            url.to_file_path()
                .map_err(|_| invalid("URI does not name a local file".to_string()))?
        } else {
            PathBuf::from(entry)
        };

        let metadata = std::fs::metadata(&path).map_err(|e| invalid(e.to_string()))?;
        if !metadata.is_file() {
            return Err(invalid("not a regular file".to_string()));
        }
        File::open(&path).map_err(|e| invalid(format!("not readable: {}", e)))?;

        Ok(Self {
            entry: entry.to_string(),
            path,
            size_bytes: metadata.len(),
        })
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// File name used in listings
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.entry.clone())
    }

    /// MIME type guessed from the file extension
    pub fn content_type(&self) -> &'static str {
        let ext = self
            .path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "mp3" => "audio/mpeg",
            "ogg" | "oga" => "audio/ogg",
            "flac" => "audio/flac",
            "wav" => "audio/wav",
            "m4a" | "aac" => "audio/mp4",
            _ => "application/octet-stream",
        }
    }
}

/// Ordered, non-empty list of media references
///
/// Insertion order is play order. There is no way to build an empty
/// playlist or to modify one after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    tracks: Vec<MediaReference>,
}

impl Playlist {
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// True when the playlist has no tracks
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MediaReference> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[MediaReference] {
        &self.tracks
    }

    pub fn iter(&self) -> impl Iterator<Item = &MediaReference> {
        self.tracks.iter()
    }

    /// Content type of the continuous stream (first track's type)
    pub fn stream_content_type(&self) -> &'static str {
        self.tracks[0].content_type()
    }

    /// Sum of all track sizes
    pub fn total_bytes(&self) -> u64 {
        self.tracks.iter().map(MediaReference::size_bytes).sum()
    }
}

/// Validates song entries into a [`Playlist`]
pub struct PlaylistBuilder;

impl PlaylistBuilder {
    /// Build a playlist, failing on the first entry that does not resolve
    pub fn build<I, S>(refs: I) -> Result<Playlist>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tracks = Vec::new();
        for entry in refs {
            let media = MediaReference::resolve(entry.as_ref())?;
            debug!(index = tracks.len(), path = %media.path().display(), "Accepted playlist entry");
            tracks.push(media);
        }

        if tracks.is_empty() {
            return Err(Error::EmptyPlaylist);
        }

        info!("Playlist built with {} track(s)", tracks.len());
        Ok(Playlist { tracks })
    }
}
