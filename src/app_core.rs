//! AppCore: central command dispatcher for tunebox.
//!
//! Owns the playlist store, the playback controller and the session store.
//! Front ends send a [`Command`] (or call the matching method), feed host
//! events through [`AppCore::on_host_event`], and then pull whatever they need
//! to redraw from the read accessors. The core never pushes updates.

use crate::config::Config;
use crate::controller::{PlaybackController, PlayerPhase};
use crate::error::{Error, Result};
use crate::host::{HostEvent, MediaHost};
use crate::persist::{ACTIVE_PLAYLIST_KEY, KeyValueStore};
use crate::store::{Direction, PlaylistStore};
use crate::track::{MediaCandidate, accept_audio};
use chrono::Local;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{info, warn};

// ── Notice buffer ───────────────────────────────────────────────────────────

const NOTICE_BUFFER_MAX: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A short user-facing message, e.g. "3 song(s) added".
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub timestamp: String,
    pub level: NoticeLevel,
    pub message: String,
}

pub struct NoticeBuffer {
    entries: VecDeque<Notice>,
    /// Number of entries ever pushed; lets readers poll with a cursor even
    /// after old entries were dropped.
    pushed: usize,
}

impl NoticeBuffer {
    pub fn new() -> Self {
        NoticeBuffer {
            entries: VecDeque::new(),
            pushed: 0,
        }
    }

    pub fn push(&mut self, level: NoticeLevel, message: String) {
        let timestamp = Local::now().format("%H:%M:%S").to_string();
        self.entries.push_back(Notice {
            timestamp,
            level,
            message,
        });
        self.pushed += 1;
        while self.entries.len() > NOTICE_BUFFER_MAX {
            self.entries.pop_front();
        }
    }

    /// Notices pushed after the first `since` ever pushed.
    pub fn since(&self, since: usize) -> Vec<Notice> {
        let first_kept = self.pushed - self.entries.len();
        let skip = since.saturating_sub(first_kept);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn latest(&self) -> Option<&Notice> {
        self.entries.back()
    }

    /// Total number of notices ever pushed.
    pub fn cursor(&self) -> usize {
        self.pushed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for NoticeBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ── Commands ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreatePlaylist(String),
    DeletePlaylist(String),
    DeleteActivePlaylist,
    SetActive(String),
    AddFiles(Vec<MediaCandidate>),
    RemoveTrack(usize),
    SelectTrack(usize),
    Play,
    Pause,
    TogglePlay,
    Next,
    Previous,
    SeekForward,
    SeekBackward,
    SeekToFraction(f64),
    SetVolume(f32),
    SetRate(f32),
    ToggleShuffle,
}

// ── Response data types ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct PlaylistData {
    pub name: String,
    pub track_count: usize,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackData {
    pub index: usize,
    pub name: String,
    pub artist: String,
    pub url: String,
    pub is_current: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransportData {
    pub is_playing: bool,
    pub is_loaded: bool,
    pub is_shuffle: bool,
    pub volume: f32,
    pub rate: f32,
    pub track_index: Option<usize>,
    pub track_name: Option<String>,
    pub track_artist: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressData {
    pub position_secs: f64,
    pub duration_secs: f64,
    /// Position as a fraction of the track, 0.0..=1.0.
    pub fraction: f64,
    pub position_display: String,
    pub duration_display: String,
}

/// Format seconds as `m:ss`.
pub fn format_clock(secs: f64) -> String {
    let secs = secs.max(0.0) as u64;
    format!("{}:{:02}", secs / 60, secs % 60)
}

// ── AppCore ─────────────────────────────────────────────────────────────────

/// Owns the store and the controller together; neither is reachable mutably
/// from outside, so playback state cannot drift from the playlists.
pub struct AppCore<H: MediaHost> {
    store: PlaylistStore,
    controller: PlaybackController<H>,
    notices: NoticeBuffer,
    session: Box<dyn KeyValueStore>,
    config: Config,
}

impl<H: MediaHost> AppCore<H> {
    /// Build the core, apply the configured volume and rate, and restore the
    /// last active playlist name from `session`.
    pub fn new(host: H, session: Box<dyn KeyValueStore>, config: Config) -> Self {
        Self::with_store(PlaylistStore::new(), host, session, config)
    }

    /// Like [`AppCore::new`] but with a caller-supplied store, e.g. a seeded one.
    pub fn with_store(
        store: PlaylistStore,
        host: H,
        session: Box<dyn KeyValueStore>,
        config: Config,
    ) -> Self {
        let mut core = AppCore {
            store,
            controller: PlaybackController::new(host),
            notices: NoticeBuffer::new(),
            session,
            config,
        };
        if let Err(e) = core.controller.set_volume(core.config.volume) {
            warn!("ignoring configured volume: {}", e);
        }
        if let Err(e) = core.controller.set_rate(core.config.playback_rate) {
            warn!("ignoring configured playback rate: {}", e);
        }
        core.restore();
        core
    }

    /// Bring back the persisted active playlist name. Contents are not
    /// persisted, so the playlist comes back empty.
    fn restore(&mut self) {
        let name = self.session.get(ACTIVE_PLAYLIST_KEY).unwrap_or_default();
        let name = name.trim();
        if !name.is_empty() {
            match self.store.create_playlist(name) {
                Ok(()) => info!(playlist = name, "restored active playlist"),
                Err(e) => warn!("could not restore active playlist: {}", e),
            }
        }
        self.controller.load_track(self.store.current_track());
    }

    fn save_active(&mut self) {
        let name = self.store.active_name().unwrap_or("").to_string();
        if let Err(e) = self.session.set(ACTIVE_PLAYLIST_KEY, &name) {
            warn!("could not persist active playlist: {}", e);
        }
    }

    fn notify(&mut self, message: String) {
        self.notices.push(NoticeLevel::Info, message);
    }

    fn active_name_owned(&self) -> Result<String> {
        self.store
            .active_name()
            .map(str::to_string)
            .ok_or(Error::NoActivePlaylist)
    }

    /// Resume after a change that has already been applied. A refused play
    /// does not undo that change, so it becomes an error notice instead.
    fn reload_after_change(&mut self, resume: bool) -> Result<()> {
        match self.controller.reload(&self.store, resume) {
            Err(Error::PlaybackRejected(reason)) => {
                self.notices.push(
                    NoticeLevel::Error,
                    format!("Playback was blocked: {}", reason),
                );
                Ok(())
            }
            other => other,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &PlaylistStore {
        &self.store
    }

    pub fn controller(&self) -> &PlaybackController<H> {
        &self.controller
    }

    /// Direct access to the media host, e.g. to configure a `RecordingHost`.
    pub fn host_mut(&mut self) -> &mut H {
        self.controller.host_mut()
    }

    // ── Command dispatch ────────────────────────────────────────────────

    pub fn handle(&mut self, command: Command) -> Result<()> {
        match command {
            Command::CreatePlaylist(name) => self.create_playlist(&name),
            Command::DeletePlaylist(name) => self.delete_playlist(&name),
            Command::DeleteActivePlaylist => self.delete_active_playlist(),
            Command::SetActive(name) => self.set_active_playlist(&name),
            Command::AddFiles(files) => self.add_files(files).map(|_| ()),
            Command::RemoveTrack(index) => self.remove_track(index),
            Command::SelectTrack(index) => self.select_track(index),
            Command::Play => self.play(),
            Command::Pause => {
                self.pause();
                Ok(())
            }
            Command::TogglePlay => self.toggle_play(),
            Command::Next => self.next().map(|_| ()),
            Command::Previous => self.previous().map(|_| ()),
            Command::SeekForward => {
                self.seek_forward();
                Ok(())
            }
            Command::SeekBackward => {
                self.seek_backward();
                Ok(())
            }
            Command::SeekToFraction(fraction) => self.seek_to_fraction(fraction),
            Command::SetVolume(volume) => self.set_volume(volume),
            Command::SetRate(rate) => self.set_rate(rate),
            Command::ToggleShuffle => {
                self.toggle_shuffle();
                Ok(())
            }
        }
    }

    /// Apply a host notification. Rejected play requests come back as
    /// [`Error::PlaybackRejected`]; everything else is handled internally.
    pub fn on_host_event(&mut self, event: HostEvent) -> Result<()> {
        self.controller.on_host_event(&mut self.store, event)
    }

    // ── Playlist CRUD ───────────────────────────────────────────────────

    pub fn create_playlist(&mut self, name: &str) -> Result<()> {
        if let Err(e) = self.store.create_playlist(name) {
            if !name.trim().is_empty() {
                self.notices.push(
                    NoticeLevel::Error,
                    "A playlist with this name already exists.".to_string(),
                );
            }
            return Err(e);
        }
        self.save_active();
        self.controller.load_track(self.store.current_track());
        Ok(())
    }

    /// Delete a playlist. When the active one goes, the next active
    /// playlist's first track is loaded; it keeps playing only if something
    /// was playing before and there is a track to play. A refused resume is
    /// reported as a notice; the playlist is gone either way.
    pub fn delete_playlist(&mut self, name: &str) -> Result<()> {
        let was_active = self.store.active_name() == Some(name);
        let was_playing = self.controller.is_playing();
        self.store.delete_playlist(name)?;
        self.save_active();
        if was_active {
            let resume = was_playing && self.store.current_track().is_some();
            self.reload_after_change(resume)?;
        }
        Ok(())
    }

    pub fn delete_active_playlist(&mut self) -> Result<()> {
        let name = self.active_name_owned()?;
        self.delete_playlist(&name)
    }

    /// Switch playlists. The first track is loaded but not started.
    pub fn set_active_playlist(&mut self, name: &str) -> Result<()> {
        self.store.set_active(name)?;
        self.save_active();
        self.controller.load_track(self.store.current_track());
        Ok(())
    }

    // ── Track operations ────────────────────────────────────────────────

    /// Add the audio files among `files` to the active playlist. Returns how
    /// many were added. If the playlist was empty, the first new track starts
    /// playing; if the host refuses, the tracks stay added and a notice says so.
    pub fn add_files(&mut self, files: Vec<MediaCandidate>) -> Result<usize> {
        let name = match self.active_name_owned() {
            Ok(name) => name,
            Err(e) => {
                self.notices.push(
                    NoticeLevel::Error,
                    "Please create and select a playlist first!".to_string(),
                );
                return Err(e);
            }
        };
        let tracks = accept_audio(files);
        let count = tracks.len();
        if count == 0 {
            return Ok(0);
        }
        let was_empty = self.store.add_tracks(&name, tracks)?;
        self.notify(format!("{} song(s) added to \"{}\"!", count, name));
        if was_empty {
            self.store.set_current_index(0)?;
            self.reload_after_change(true)?;
        }
        Ok(count)
    }

    /// Remove a track from the active playlist. Removing the loaded track
    /// loads its successor (resuming if it was playing); removing the last
    /// remaining track leaves the player idle. A refused resume only produces
    /// a notice.
    pub fn remove_track(&mut self, index: usize) -> Result<()> {
        let name = self.active_name_owned()?;
        let was_current = index == self.store.current_index();
        let was_playing = self.controller.is_playing();
        self.store.remove_track(&name, index)?;
        if was_current {
            let resume = was_playing && self.store.current_track().is_some();
            self.reload_after_change(resume)?;
        }
        Ok(())
    }

    pub fn select_track(&mut self, index: usize) -> Result<()> {
        self.controller.select_track(&mut self.store, index)
    }

    // ── Transport ───────────────────────────────────────────────────────

    pub fn play(&mut self) -> Result<()> {
        self.controller.play(&self.store)
    }

    pub fn pause(&mut self) {
        self.controller.pause();
    }

    pub fn toggle_play(&mut self) -> Result<()> {
        self.controller.toggle_play(&self.store)
    }

    pub fn next(&mut self) -> Result<Option<usize>> {
        self.controller.change_track(&mut self.store, Direction::Next)
    }

    pub fn previous(&mut self) -> Result<Option<usize>> {
        self.controller
            .change_track(&mut self.store, Direction::Previous)
    }

    pub fn seek_forward(&mut self) {
        self.controller.seek_relative(self.config.seek_step_secs);
    }

    pub fn seek_backward(&mut self) {
        self.controller.seek_relative(-self.config.seek_step_secs);
    }

    pub fn seek_to_fraction(&mut self, fraction: f64) -> Result<()> {
        self.controller.seek_to_fraction(fraction)
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.controller.set_volume(volume)
    }

    pub fn set_rate(&mut self, rate: f32) -> Result<()> {
        self.controller.set_rate(rate)
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.controller.toggle_shuffle()
    }

    // ── Read accessors ──────────────────────────────────────────────────

    pub fn playlists(&self) -> Vec<PlaylistData> {
        let active = self.store.active_name();
        self.store
            .playlists()
            .iter()
            .map(|p| PlaylistData {
                name: p.name.clone(),
                track_count: p.track_count(),
                is_active: active == Some(p.name.as_str()),
            })
            .collect()
    }

    pub fn active_playlist_name(&self) -> Option<String> {
        self.store.active_name().map(str::to_string)
    }

    /// Tracks of the active playlist.
    pub fn tracks(&self) -> Vec<TrackData> {
        let current = self.current_index();
        self.store
            .active_tracks()
            .iter()
            .enumerate()
            .map(|(i, t)| TrackData {
                index: i,
                name: t.name.clone(),
                artist: t.artist.clone(),
                url: t.url.clone(),
                is_current: current == Some(i),
            })
            .collect()
    }

    /// Index of the loaded track, or `None` when the active playlist is empty.
    pub fn current_index(&self) -> Option<usize> {
        self.store
            .current_track()
            .map(|_| self.store.current_index())
    }

    pub fn is_playing(&self) -> bool {
        self.controller.is_playing()
    }

    pub fn is_shuffle(&self) -> bool {
        self.controller.is_shuffle()
    }

    pub fn transport(&self) -> TransportData {
        let track = self.store.current_track();
        TransportData {
            is_playing: self.controller.is_playing(),
            is_loaded: self.controller.phase() != PlayerPhase::Idle,
            is_shuffle: self.controller.is_shuffle(),
            volume: self.controller.volume(),
            rate: self.controller.rate(),
            track_index: self.current_index(),
            track_name: track.map(|t| t.name.clone()),
            track_artist: track.map(|t| t.artist.clone()),
        }
    }

    /// Playback progress, once the host has reported a duration.
    pub fn progress(&self) -> Option<ProgressData> {
        let duration = self.controller.duration_secs().filter(|d| *d > 0.0)?;
        let position = self.controller.position_secs().min(duration);
        Some(ProgressData {
            position_secs: position,
            duration_secs: duration,
            fraction: position / duration,
            position_display: format_clock(position),
            duration_display: format_clock(duration),
        })
    }

    pub fn speed_presets(&self) -> &[f32] {
        &self.config.speed_presets
    }

    pub fn notices(&self, since: usize) -> Vec<Notice> {
        self.notices.since(since)
    }

    /// Pass to [`AppCore::notices`] later to get only what arrived since now.
    pub fn notice_cursor(&self) -> usize {
        self.notices.cursor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostCall, LoadId, RecordingHost};
    use crate::persist::MemoryStore;

    fn make_core() -> AppCore<RecordingHost> {
        AppCore::with_store(
            PlaylistStore::with_seed(11),
            RecordingHost::new(),
            Box::new(MemoryStore::new()),
            Config::default(),
        )
    }

    fn audio(name: &str) -> MediaCandidate {
        MediaCandidate::new(format!("{}.mp3", name), "audio/mpeg", format!("blob:{}", name))
    }

    // -- Notices --

    #[test]
    fn notice_buffer_caps_and_tracks_cursor() {
        let mut buf = NoticeBuffer::new();
        for i in 0..(NOTICE_BUFFER_MAX + 5) {
            buf.push(NoticeLevel::Info, format!("n{}", i));
        }
        assert_eq!(buf.len(), NOTICE_BUFFER_MAX);
        assert_eq!(buf.cursor(), NOTICE_BUFFER_MAX + 5);
        let tail = buf.since(NOTICE_BUFFER_MAX + 3);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[1].message, format!("n{}", NOTICE_BUFFER_MAX + 4));
        assert_eq!(buf.since(0).len(), NOTICE_BUFFER_MAX);
    }

    #[test]
    fn format_clock_pads_seconds() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(65.9), "1:05");
        assert_eq!(format_clock(600.0), "10:00");
        assert_eq!(format_clock(-3.0), "0:00");
    }

    // -- Playlist CRUD --

    #[test]
    fn create_and_list_playlists() {
        let mut core = make_core();
        core.create_playlist("Main").unwrap();
        let playlists = core.playlists();
        assert_eq!(playlists.len(), 1);
        assert_eq!(playlists[0].name, "Main");
        assert_eq!(playlists[0].track_count, 0);
        assert!(playlists[0].is_active);
        assert!(core.tracks().is_empty());
        assert_eq!(core.current_index(), None);
    }

    #[test]
    fn create_duplicate_playlist_errors_with_notice() {
        let mut core = make_core();
        core.create_playlist("Main").unwrap();
        assert!(matches!(
            core.create_playlist("Main"),
            Err(Error::DuplicateName(_))
        ));
        assert_eq!(
            core.notices.latest().unwrap().message,
            "A playlist with this name already exists."
        );
    }

    #[test]
    fn create_blank_name_errors_silently() {
        let mut core = make_core();
        assert!(core.create_playlist("  ").is_err());
        assert!(core.notices.is_empty());
    }

    #[test]
    fn create_resets_player_to_idle() {
        let mut core = make_core();
        core.create_playlist("A").unwrap();
        core.add_files(vec![audio("one")]).unwrap();
        assert!(core.is_playing());
        core.create_playlist("B").unwrap();
        assert!(!core.is_playing());
        assert!(!core.transport().is_loaded);
    }

    #[test]
    fn delete_nonexistent_playlist_errors() {
        let mut core = make_core();
        assert!(matches!(core.delete_playlist("Ghost"), Err(Error::NotFound(_))));
    }

    #[test]
    fn delete_active_without_playlists_errors() {
        let mut core = make_core();
        assert!(matches!(
            core.delete_active_playlist(),
            Err(Error::NoActivePlaylist)
        ));
    }

    #[test]
    fn set_active_loads_first_track_paused() {
        let mut core = make_core();
        core.create_playlist("A").unwrap();
        core.add_files(vec![audio("a1"), audio("a2")]).unwrap();
        core.create_playlist("B").unwrap();
        core.set_active_playlist("A").unwrap();
        assert_eq!(core.current_index(), Some(0));
        assert!(!core.is_playing());
        assert!(core.transport().is_loaded);
        assert!(core.set_active_playlist("nope").is_err());
    }

    // -- Tracks --

    #[test]
    fn add_files_without_playlist_errors() {
        let mut core = make_core();
        assert!(matches!(
            core.add_files(vec![audio("x")]),
            Err(Error::NoActivePlaylist)
        ));
        assert_eq!(
            core.notices.latest().unwrap().message,
            "Please create and select a playlist first!"
        );
    }

    #[test]
    fn add_files_skips_non_audio() {
        let mut core = make_core();
        core.create_playlist("A").unwrap();
        let added = core
            .add_files(vec![
                MediaCandidate::new("cover.png", "image/png", "blob:png"),
                audio("song"),
            ])
            .unwrap();
        assert_eq!(added, 1);
        assert_eq!(core.tracks()[0].name, "song");
        assert_eq!(core.tracks()[0].artist, "Local");
        assert_eq!(
            core.notices.latest().unwrap().message,
            "1 song(s) added to \"A\"!"
        );
    }

    #[test]
    fn add_only_non_audio_is_noop() {
        let mut core = make_core();
        core.create_playlist("A").unwrap();
        let added = core
            .add_files(vec![MediaCandidate::new("a.txt", "text/plain", "blob:t")])
            .unwrap();
        assert_eq!(added, 0);
        assert!(core.notices.is_empty());
        assert!(!core.is_playing());
    }

    #[test]
    fn first_tracks_autostart_later_ones_do_not_interrupt() {
        let mut core = make_core();
        core.create_playlist("A").unwrap();
        core.add_files(vec![audio("1"), audio("2")]).unwrap();
        assert!(core.is_playing());
        core.next().unwrap();
        let loaded = core.controller.load_id();

        core.add_files(vec![audio("3")]).unwrap();
        assert_eq!(core.controller.load_id(), loaded);
        assert_eq!(core.current_index(), Some(1));
    }

    #[test]
    fn remove_current_track_while_playing_plays_successor() {
        let mut core = make_core();
        core.create_playlist("A").unwrap();
        core.add_files(vec![audio("0"), audio("1"), audio("2")])
            .unwrap();
        core.select_track(1).unwrap();
        core.remove_track(1).unwrap();
        assert_eq!(core.current_index(), Some(1));
        assert_eq!(core.transport().track_name.as_deref(), Some("2"));
        assert!(core.is_playing());
    }

    #[test]
    fn remove_other_track_keeps_playback() {
        let mut core = make_core();
        core.create_playlist("A").unwrap();
        core.add_files(vec![audio("0"), audio("1")]).unwrap();
        let loaded = core.controller.load_id();
        core.remove_track(1).unwrap();
        assert_eq!(core.controller.load_id(), loaded);
        assert!(core.is_playing());
    }

    #[test]
    fn remove_only_track_goes_idle() {
        let mut core = make_core();
        core.create_playlist("A").unwrap();
        core.add_files(vec![audio("0")]).unwrap();
        core.remove_track(0).unwrap();
        assert!(!core.is_playing());
        assert!(!core.transport().is_loaded);
        assert_eq!(core.current_index(), None);
    }

    // -- Transport --

    #[test]
    fn handle_dispatches_commands() {
        let mut core = make_core();
        core.handle(Command::CreatePlaylist("Mix".to_string()))
            .unwrap();
        core.handle(Command::AddFiles(vec![audio("a"), audio("b")]))
            .unwrap();
        core.handle(Command::TogglePlay).unwrap();
        assert!(!core.is_playing());
        core.handle(Command::Next).unwrap();
        assert!(core.is_playing());
        assert_eq!(core.current_index(), Some(1));
        core.handle(Command::ToggleShuffle).unwrap();
        assert!(core.is_shuffle());
        core.handle(Command::SetVolume(0.25)).unwrap();
        assert_eq!(core.transport().volume, 0.25);
        assert!(core.handle(Command::SetRate(-2.0)).is_err());
        core.handle(Command::Pause).unwrap();
        assert!(!core.is_playing());
    }

    #[test]
    fn seek_buttons_use_configured_step() {
        let mut core = make_core();
        core.create_playlist("A").unwrap();
        core.add_files(vec![audio("a")]).unwrap();
        let id = core.controller.load_id();
        core.on_host_event(HostEvent::PositionChanged {
            id,
            position_secs: 30.0,
            duration_secs: Some(100.0),
        })
        .unwrap();
        core.controller.host_mut().take_calls();

        core.handle(Command::SeekForward).unwrap();
        core.handle(Command::SeekBackward).unwrap();
        core.handle(Command::SeekBackward).unwrap();
        assert_eq!(
            core.controller.host().calls,
            [
                HostCall::SeekTo(40.0),
                HostCall::SeekTo(30.0),
                HostCall::SeekTo(20.0)
            ]
        );
    }

    #[test]
    fn progress_needs_duration() {
        let mut core = make_core();
        core.create_playlist("A").unwrap();
        core.add_files(vec![audio("a")]).unwrap();
        assert!(core.progress().is_none());

        let id = core.controller.load_id();
        core.on_host_event(HostEvent::PositionChanged {
            id,
            position_secs: 45.0,
            duration_secs: Some(180.0),
        })
        .unwrap();
        let p = core.progress().unwrap();
        assert_eq!(p.fraction, 0.25);
        assert_eq!(p.position_display, "0:45");
        assert_eq!(p.duration_display, "3:00");
    }

    #[test]
    fn refused_resume_after_applied_change_is_a_notice() {
        let mut core = make_core();
        core.create_playlist("A").unwrap();
        core.add_files(vec![audio("a1")]).unwrap();
        core.create_playlist("B").unwrap();
        core.add_files(vec![audio("b1"), audio("b2")]).unwrap();
        assert!(core.is_playing());

        core.host_mut().refuse_play = Some("blocked".to_string());
        core.delete_playlist("B").unwrap();
        assert_eq!(core.playlists().len(), 1);
        assert!(!core.is_playing());
        let latest = core.notices.latest().unwrap();
        assert_eq!(latest.level, NoticeLevel::Error);
        assert_eq!(latest.message, "Playback was blocked: blocked");

        core.create_playlist("C").unwrap();
        assert_eq!(core.add_files(vec![audio("c1"), audio("c2")]).unwrap(), 2);
        assert_eq!(core.tracks().len(), 2);
        assert!(core.transport().is_loaded);
        assert!(!core.is_playing());
    }

    #[test]
    fn notice_cursor_skips_seen_notices() {
        let mut core = make_core();
        core.create_playlist("A").unwrap();
        core.add_files(vec![audio("a")]).unwrap();
        let cursor = core.notice_cursor();
        assert!(core.notices(cursor).is_empty());
        core.add_files(vec![audio("b")]).unwrap();
        let fresh = core.notices(cursor);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].message, "1 song(s) added to \"A\"!");
    }

    #[test]
    fn configured_volume_and_rate_reach_host() {
        let config = Config {
            volume: 0.5,
            playback_rate: 1.5,
            ..Config::default()
        };
        let core = AppCore::new(RecordingHost::new(), Box::new(MemoryStore::new()), config);
        assert_eq!(
            &core.controller.host().calls[..2],
            [HostCall::SetVolume(0.5), HostCall::SetRate(1.5)]
        );
        assert_eq!(core.controller.host().last_load(), Some((LoadId(1), None)));
    }
}
