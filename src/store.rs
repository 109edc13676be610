//! Playlist bookkeeping.
//!
//! [`PlaylistStore`] owns every playlist, the active-playlist selector and the
//! current track index. The index is only ever changed here, so it cannot drift
//! out of range after removals or deletions.

use crate::error::{Error, Result};
use crate::playlist::Playlist;
use crate::track::Track;
use tracing::{debug, info};

/// Navigation direction for [`PlaylistStore::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

pub struct PlaylistStore {
    /// Kept in creation order; the first remaining entry takes over when the
    /// active playlist is deleted.
    playlists: Vec<Playlist>,
    active: Option<String>,
    current_index: usize,
    rng: fastrand::Rng,
}

impl PlaylistStore {
    pub fn new() -> Self {
        PlaylistStore {
            playlists: Vec::new(),
            active: None,
            current_index: 0,
            rng: fastrand::Rng::new(),
        }
    }

    /// A store whose shuffle picks are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        PlaylistStore {
            rng: fastrand::Rng::with_seed(seed),
            ..Self::new()
        }
    }

    /// Create an empty playlist and make it active. Surrounding whitespace is
    /// trimmed from the name.
    pub fn create_playlist(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() || self.find(name).is_some() {
            return Err(Error::DuplicateName(name.to_string()));
        }
        self.playlists.push(Playlist::new(name.to_string()));
        self.active = Some(name.to_string());
        self.current_index = 0;
        info!(playlist = name, "playlist created");
        Ok(())
    }

    /// Delete a playlist. If it was active, the first remaining playlist (or
    /// none) becomes active and the current index resets to 0.
    pub fn delete_playlist(&mut self, name: &str) -> Result<()> {
        let pos = self
            .playlists
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        self.playlists.remove(pos);
        if self.active.as_deref() == Some(name) {
            self.active = self.playlists.first().map(|p| p.name.clone());
            self.current_index = 0;
        }
        info!(playlist = name, active = ?self.active, "playlist deleted");
        Ok(())
    }

    /// Append tracks to a playlist. Returns whether it was empty beforehand.
    pub fn add_tracks(&mut self, name: &str, tracks: Vec<Track>) -> Result<bool> {
        let count = tracks.len();
        let pl = self
            .find_mut(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        let was_empty = pl.add_tracks(tracks);
        debug!(playlist = name, count, "tracks added");
        Ok(was_empty)
    }

    /// Remove the track at `index`. On the active playlist the current index
    /// keeps pointing at the same track when an earlier one is removed, and is
    /// clamped into range when the current track itself is removed.
    pub fn remove_track(&mut self, name: &str, index: usize) -> Result<Track> {
        let is_active = self.active.as_deref() == Some(name);
        let pl = self
            .find_mut(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        let removed = pl.remove_track(index)?;
        let remaining = pl.track_count();
        if is_active {
            let ci = self.current_index;
            if index < ci {
                self.current_index = ci - 1;
            } else if index == ci {
                self.current_index = ci.min(remaining.saturating_sub(1));
            }
        }
        debug!(playlist = name, index, track = %removed.name, "track removed");
        Ok(removed)
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        if self.find(name).is_none() {
            return Err(Error::NotFound(name.to_string()));
        }
        self.active = Some(name.to_string());
        self.current_index = 0;
        Ok(())
    }

    pub fn set_current_index(&mut self, index: usize) -> Result<()> {
        let len = self.active_playlist().map_or(0, Playlist::track_count);
        if index >= len {
            return Err(Error::IndexOutOfRange { index, len });
        }
        self.current_index = index;
        Ok(())
    }

    /// The track at the current index of the active playlist.
    pub fn current_track(&self) -> Option<&Track> {
        self.active_playlist()?.get(self.current_index)
    }

    /// Move the current index and return it.
    ///
    /// In shuffle mode any index other than the current one is picked with
    /// equal probability; a single-track playlist stays put. Otherwise the
    /// index steps by one and wraps at both ends. Returns `None` when the
    /// active playlist is empty or missing.
    pub fn advance(&mut self, direction: Direction, shuffle: bool) -> Option<usize> {
        let len = self.active_playlist()?.track_count();
        if len == 0 {
            return None;
        }
        let ci = self.current_index;
        let next = if shuffle {
            if len > 1 {
                let pick = self.rng.usize(..len - 1);
                if pick >= ci { pick + 1 } else { pick }
            } else {
                ci
            }
        } else {
            match direction {
                Direction::Next => (ci + 1) % len,
                Direction::Previous => (ci + len - 1) % len,
            }
        };
        self.current_index = next;
        Some(next)
    }

    pub fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }

    pub fn find(&self, name: &str) -> Option<&Playlist> {
        self.playlists.iter().find(|p| p.name == name)
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut Playlist> {
        self.playlists.iter_mut().find(|p| p.name == name)
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_playlist(&self) -> Option<&Playlist> {
        self.active.as_deref().and_then(|name| self.find(name))
    }

    /// Tracks of the active playlist; empty when there is none.
    pub fn active_tracks(&self) -> &[Track] {
        self.active_playlist().map(Playlist::tracks).unwrap_or(&[])
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }
}

impl Default for PlaylistStore {
    fn default() -> Self {
        Self::new()
    }
}
