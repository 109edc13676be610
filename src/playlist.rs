use crate::error::{Error, Result};
use crate::track::Track;
use serde::{Deserialize, Serialize};

/// A named, ordered sequence of tracks. Order is navigation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub name: String,
    tracks: Vec<Track>,
}

impl Playlist {
    pub fn new(name: String) -> Self {
        Playlist {
            name,
            tracks: Vec::new(),
        }
    }

    /// Append tracks in the given order. Returns true if the playlist was
    /// empty before the call.
    pub fn add_tracks(&mut self, tracks: Vec<Track>) -> bool {
        let was_empty = self.tracks.is_empty();
        self.tracks.extend(tracks);
        was_empty
    }

    /// Remove a track by index, shifting later tracks down. Returns the removed track.
    pub fn remove_track(&mut self, index: usize) -> Result<Track> {
        if index >= self.tracks.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.tracks.len(),
            });
        }
        Ok(self.tracks.remove(index))
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
