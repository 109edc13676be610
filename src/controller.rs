//! Transport state and the commands it sends to the media host.
//!
//! [`PlaybackController`] is a small state machine:
//!
//! * `Idle`: nothing loaded.
//! * `Paused`: a track is loaded but not playing.
//! * `Playing`: a track is loaded and playback was requested.
//!
//! `load_track` moves to `Paused` (or back to `Idle` for no track); `play` and
//! `pause` move between `Paused` and `Playing`. Track changes load and then
//! play, so they land in `Playing` unless there is nothing to play.
//!
//! A play request the host refuses, immediately or through a later
//! [`HostEvent::PlaySettled`], rolls the state back to `Paused` and is reported
//! as [`Error::PlaybackRejected`].

use crate::error::{Error, Result};
use crate::host::{HostEvent, LoadId, MediaHost};
use crate::store::{Direction, PlaylistStore};
use crate::track::Track;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerPhase {
    Idle,
    Paused,
    Playing,
}

pub struct PlaybackController<H: MediaHost> {
    host: H,
    phase: PlayerPhase,
    shuffle: bool,
    volume: f32,
    rate: f32,
    /// Id of the most recent load; events carrying any other id are stale.
    load_id: LoadId,
    position_secs: f64,
    duration_secs: Option<f64>,
}

impl<H: MediaHost> PlaybackController<H> {
    pub fn new(host: H) -> Self {
        PlaybackController {
            host,
            phase: PlayerPhase::Idle,
            shuffle: false,
            volume: 1.0,
            rate: 1.0,
            load_id: LoadId::default(),
            position_secs: 0.0,
            duration_secs: None,
        }
    }

    /// Load a track without playing it. `None` unloads and returns to `Idle`.
    pub fn load_track(&mut self, track: Option<&Track>) {
        self.load_id = LoadId(self.load_id.0 + 1);
        self.position_secs = 0.0;
        self.duration_secs = None;
        match track {
            Some(t) => {
                debug!(id = %self.load_id, track = %t.name, "loading track");
                self.host.load(self.load_id, Some(&t.url));
                self.phase = PlayerPhase::Paused;
            }
            None => {
                debug!(id = %self.load_id, "unloading");
                self.host.load(self.load_id, None);
                self.phase = PlayerPhase::Idle;
            }
        }
    }

    /// Start playback of the current track. Does nothing if the store has no
    /// current track.
    pub fn play(&mut self, store: &PlaylistStore) -> Result<()> {
        let Some(track) = store.current_track() else {
            return Ok(());
        };
        if self.phase == PlayerPhase::Idle {
            self.load_track(Some(track));
        }
        self.phase = PlayerPhase::Playing;
        if let Err(reason) = self.host.play(self.load_id) {
            warn!(id = %self.load_id, %reason, "play request refused");
            self.phase = PlayerPhase::Paused;
            return Err(Error::PlaybackRejected(reason));
        }
        info!(track = %track.name, artist = %track.artist, "playing");
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.phase == PlayerPhase::Playing {
            self.phase = PlayerPhase::Paused;
        }
        self.host.pause();
    }

    pub fn toggle_play(&mut self, store: &PlaylistStore) -> Result<()> {
        if self.is_playing() {
            self.pause();
            Ok(())
        } else {
            self.play(store)
        }
    }

    /// Step to the next or previous track (honoring shuffle) and play it.
    /// Returns the new index, or `None` if the active playlist is empty.
    pub fn change_track(
        &mut self,
        store: &mut PlaylistStore,
        direction: Direction,
    ) -> Result<Option<usize>> {
        let Some(index) = store.advance(direction, self.shuffle) else {
            return Ok(None);
        };
        self.load_track(store.current_track());
        self.play(store)?;
        Ok(Some(index))
    }

    /// Jump to a track. Selecting the track that is already loaded toggles
    /// play/pause instead of restarting it.
    pub fn select_track(&mut self, store: &mut PlaylistStore, index: usize) -> Result<()> {
        if index == store.current_index() && self.phase != PlayerPhase::Idle {
            return self.toggle_play(store);
        }
        store.set_current_index(index)?;
        self.load_track(store.current_track());
        self.play(store)
    }

    /// Load the store's current track and play it only if `resume` is set.
    pub fn reload(&mut self, store: &PlaylistStore, resume: bool) -> Result<()> {
        self.load_track(store.current_track());
        if resume {
            self.play(store)
        } else {
            Ok(())
        }
    }

    /// Seek relative to the last reported position, clamped to the track.
    pub fn seek_relative(&mut self, delta_secs: f64) {
        if self.phase == PlayerPhase::Idle {
            return;
        }
        let mut target = (self.position_secs + delta_secs).max(0.0);
        if let Some(duration) = self.duration_secs {
            target = target.min(duration);
        }
        self.position_secs = target;
        self.host.seek_to(target);
    }

    /// Seek to a fraction of the track length. Ignored while the length is unknown.
    pub fn seek_to_fraction(&mut self, fraction: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(Error::InvalidFraction(fraction));
        }
        if let Some(duration) = self.duration_secs {
            let target = fraction * duration;
            self.position_secs = target;
            self.host.seek_to(target);
        }
        Ok(())
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(Error::InvalidVolume(volume));
        }
        self.volume = volume;
        self.host.set_volume(volume);
        Ok(())
    }

    pub fn set_rate(&mut self, rate: f32) -> Result<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(Error::InvalidRate(rate));
        }
        self.rate = rate;
        self.host.set_rate(rate);
        Ok(())
    }

    /// Flip shuffle mode and return the new value.
    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffle = !self.shuffle;
        self.shuffle
    }

    /// Apply one host notification. Events for anything but the latest load
    /// are ignored.
    pub fn on_host_event(&mut self, store: &mut PlaylistStore, event: HostEvent) -> Result<()> {
        if event.load_id() != self.load_id {
            debug!(stale = %event.load_id(), current = %self.load_id, "dropping stale host event");
            return Ok(());
        }
        match event {
            HostEvent::PositionChanged {
                position_secs,
                duration_secs,
                ..
            } => {
                self.position_secs = position_secs;
                if duration_secs.is_some() {
                    self.duration_secs = duration_secs;
                }
            }
            HostEvent::Ended { .. } => {
                debug!("track ended");
                self.change_track(store, Direction::Next)?;
            }
            HostEvent::Error { message, .. } => {
                warn!(%message, "media host error");
                if self.phase == PlayerPhase::Playing {
                    self.phase = PlayerPhase::Paused;
                }
            }
            HostEvent::PlaySettled { outcome, .. } => {
                if let Err(reason) = outcome {
                    warn!(%reason, "play request rejected");
                    if self.phase == PlayerPhase::Playing {
                        self.phase = PlayerPhase::Paused;
                    }
                    return Err(Error::PlaybackRejected(reason));
                }
            }
        }
        Ok(())
    }

    pub fn phase(&self) -> PlayerPhase {
        self.phase
    }

    pub fn is_playing(&self) -> bool {
        self.phase == PlayerPhase::Playing
    }

    pub fn is_shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn load_id(&self) -> LoadId {
        self.load_id
    }

    pub fn position_secs(&self) -> f64 {
        self.position_secs
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.duration_secs
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostCall, RecordingHost};

    fn setup(tracks: &[&str]) -> (PlaybackController<RecordingHost>, PlaylistStore) {
        let mut store = PlaylistStore::with_seed(3);
        store.create_playlist("Mix").unwrap();
        store
            .add_tracks(
                "Mix",
                tracks
                    .iter()
                    .map(|t| Track::new(*t, format!("blob:{}", t), "Local"))
                    .collect(),
            )
            .unwrap();
        (PlaybackController::new(RecordingHost::new()), store)
    }

    fn position(ctl: &PlaybackController<RecordingHost>, pos: f64, dur: Option<f64>) -> HostEvent {
        HostEvent::PositionChanged {
            id: ctl.load_id(),
            position_secs: pos,
            duration_secs: dur,
        }
    }

    #[test]
    fn starts_idle() {
        let (ctl, _) = setup(&[]);
        assert_eq!(ctl.phase(), PlayerPhase::Idle);
        assert!(!ctl.is_playing());
        assert!(!ctl.is_shuffle());
    }

    #[test]
    fn play_without_track_is_noop() {
        let (mut ctl, store) = setup(&[]);
        ctl.play(&store).unwrap();
        assert_eq!(ctl.phase(), PlayerPhase::Idle);
        assert!(ctl.host().calls.is_empty());
    }

    #[test]
    fn load_then_play_then_pause() {
        let (mut ctl, store) = setup(&["A"]);
        ctl.load_track(store.current_track());
        assert_eq!(ctl.phase(), PlayerPhase::Paused);
        ctl.play(&store).unwrap();
        assert_eq!(ctl.phase(), PlayerPhase::Playing);
        ctl.pause();
        assert_eq!(ctl.phase(), PlayerPhase::Paused);
        assert_eq!(
            ctl.host().calls,
            [
                HostCall::Load(LoadId(1), Some("blob:A".to_string())),
                HostCall::Play(LoadId(1)),
                HostCall::Pause,
            ]
        );
    }

    #[test]
    fn load_none_returns_to_idle() {
        let (mut ctl, store) = setup(&["A"]);
        ctl.load_track(store.current_track());
        ctl.load_track(None);
        assert_eq!(ctl.phase(), PlayerPhase::Idle);
        assert_eq!(ctl.host().last_load(), Some((LoadId(2), None)));
    }

    #[test]
    fn play_from_idle_loads_current_track() {
        let (mut ctl, store) = setup(&["A", "B"]);
        ctl.play(&store).unwrap();
        assert!(ctl.is_playing());
        assert_eq!(ctl.host().last_load(), Some((LoadId(1), Some("blob:A"))));
    }

    #[test]
    fn refused_play_rolls_back() {
        let (mut ctl, store) = setup(&["A"]);
        ctl.host_mut().refuse_play = Some("autoplay blocked".to_string());
        let err = ctl.play(&store).unwrap_err();
        assert!(matches!(err, Error::PlaybackRejected(ref r) if r == "autoplay blocked"));
        assert_eq!(ctl.phase(), PlayerPhase::Paused);
    }

    #[test]
    fn late_rejection_for_current_load_rolls_back() {
        let (mut ctl, mut store) = setup(&["A"]);
        ctl.play(&store).unwrap();
        let id = ctl.load_id();
        let res = ctl.on_host_event(
            &mut store,
            HostEvent::PlaySettled {
                id,
                outcome: Err("NotAllowedError".to_string()),
            },
        );
        assert!(matches!(res, Err(Error::PlaybackRejected(_))));
        assert_eq!(ctl.phase(), PlayerPhase::Paused);
    }

    #[test]
    fn stale_settlement_is_ignored() {
        let (mut ctl, mut store) = setup(&["A", "B"]);
        ctl.play(&store).unwrap();
        let stale = ctl.load_id();
        ctl.change_track(&mut store, Direction::Next).unwrap();
        assert_ne!(ctl.load_id(), stale);

        let res = ctl.on_host_event(
            &mut store,
            HostEvent::PlaySettled {
                id: stale,
                outcome: Err("aborted".to_string()),
            },
        );
        assert!(res.is_ok());
        assert!(ctl.is_playing());

        ctl.on_host_event(&mut store, HostEvent::Ended { id: stale })
            .unwrap();
        assert_eq!(store.current_index(), 1);
    }

    #[test]
    fn ended_advances_and_plays() {
        let (mut ctl, mut store) = setup(&["A", "B", "C"]);
        ctl.play(&store).unwrap();
        let id = ctl.load_id();
        ctl.on_host_event(&mut store, HostEvent::Ended { id }).unwrap();
        assert_eq!(store.current_index(), 1);
        assert!(ctl.is_playing());
        assert_eq!(ctl.host().last_load(), Some((ctl.load_id(), Some("blob:B"))));
    }

    #[test]
    fn ended_with_shuffle_picks_another_track() {
        let (mut ctl, mut store) = setup(&["A", "B", "C"]);
        ctl.toggle_shuffle();
        ctl.play(&store).unwrap();
        for _ in 0..20 {
            let before = store.current_index();
            let id = ctl.load_id();
            ctl.on_host_event(&mut store, HostEvent::Ended { id }).unwrap();
            assert_ne!(store.current_index(), before);
        }
    }

    #[test]
    fn host_error_pauses_without_failing() {
        let (mut ctl, mut store) = setup(&["A"]);
        ctl.play(&store).unwrap();
        let id = ctl.load_id();
        ctl.on_host_event(
            &mut store,
            HostEvent::Error {
                id,
                message: "decode failed".to_string(),
            },
        )
        .unwrap();
        assert_eq!(ctl.phase(), PlayerPhase::Paused);
    }

    #[test]
    fn change_track_on_empty_playlist_stays_idle() {
        let (mut ctl, mut store) = setup(&[]);
        assert_eq!(ctl.change_track(&mut store, Direction::Next).unwrap(), None);
        assert_eq!(ctl.phase(), PlayerPhase::Idle);
    }

    #[test]
    fn previous_wraps_to_last() {
        let (mut ctl, mut store) = setup(&["A", "B", "C"]);
        ctl.play(&store).unwrap();
        assert_eq!(
            ctl.change_track(&mut store, Direction::Previous).unwrap(),
            Some(2)
        );
        assert_eq!(ctl.host().last_load(), Some((ctl.load_id(), Some("blob:C"))));
    }

    #[test]
    fn select_same_track_toggles() {
        let (mut ctl, mut store) = setup(&["A", "B"]);
        ctl.select_track(&mut store, 1).unwrap();
        assert!(ctl.is_playing());
        let id = ctl.load_id();
        ctl.select_track(&mut store, 1).unwrap();
        assert!(!ctl.is_playing());
        assert_eq!(ctl.load_id(), id);
        ctl.select_track(&mut store, 1).unwrap();
        assert!(ctl.is_playing());
    }

    #[test]
    fn select_out_of_range_keeps_state() {
        let (mut ctl, mut store) = setup(&["A"]);
        ctl.play(&store).unwrap();
        assert!(matches!(
            ctl.select_track(&mut store, 3),
            Err(Error::IndexOutOfRange { .. })
        ));
        assert!(ctl.is_playing());
        assert_eq!(store.current_index(), 0);
    }

    #[test]
    fn seek_relative_clamps_to_track() {
        let (mut ctl, mut store) = setup(&["A"]);
        ctl.play(&store).unwrap();
        let evt = position(&ctl, 5.0, Some(120.0));
        ctl.on_host_event(&mut store, evt).unwrap();

        ctl.seek_relative(-10.0);
        assert_eq!(ctl.position_secs(), 0.0);
        ctl.seek_relative(500.0);
        assert_eq!(ctl.position_secs(), 120.0);
        assert_eq!(ctl.host().calls.last(), Some(&HostCall::SeekTo(120.0)));
    }

    #[test]
    fn seek_when_idle_is_ignored() {
        let (mut ctl, _) = setup(&[]);
        ctl.seek_relative(10.0);
        assert!(ctl.host().calls.is_empty());
    }

    #[test]
    fn seek_to_fraction_needs_duration() {
        let (mut ctl, mut store) = setup(&["A"]);
        ctl.play(&store).unwrap();
        ctl.host_mut().take_calls();

        ctl.seek_to_fraction(0.5).unwrap();
        assert!(ctl.host().calls.is_empty());

        let evt = position(&ctl, 0.0, Some(200.0));
        ctl.on_host_event(&mut store, evt).unwrap();
        ctl.seek_to_fraction(0.25).unwrap();
        assert_eq!(ctl.host().calls, [HostCall::SeekTo(50.0)]);
        assert!(matches!(ctl.seek_to_fraction(1.5), Err(Error::InvalidFraction(_))));
    }

    #[test]
    fn new_load_forgets_duration() {
        let (mut ctl, mut store) = setup(&["A", "B"]);
        ctl.play(&store).unwrap();
        let evt = position(&ctl, 30.0, Some(200.0));
        ctl.on_host_event(&mut store, evt).unwrap();
        ctl.change_track(&mut store, Direction::Next).unwrap();
        assert_eq!(ctl.duration_secs(), None);
        assert_eq!(ctl.position_secs(), 0.0);
    }

    #[test]
    fn volume_and_rate_are_validated() {
        let (mut ctl, _) = setup(&[]);
        ctl.set_volume(0.4).unwrap();
        assert_eq!(ctl.volume(), 0.4);
        assert!(matches!(ctl.set_volume(1.2), Err(Error::InvalidVolume(_))));
        assert!(ctl.set_volume(f32::NAN).is_err());
        assert_eq!(ctl.volume(), 0.4);

        ctl.set_rate(1.5).unwrap();
        assert_eq!(ctl.rate(), 1.5);
        assert!(matches!(ctl.set_rate(0.0), Err(Error::InvalidRate(_))));
        assert!(ctl.set_rate(-1.0).is_err());
        assert_eq!(ctl.rate(), 1.5);
        assert_eq!(
            ctl.host().calls,
            [HostCall::SetVolume(0.4), HostCall::SetRate(1.5)]
        );
    }

    #[test]
    fn toggle_shuffle_flips() {
        let (mut ctl, _) = setup(&[]);
        assert!(ctl.toggle_shuffle());
        assert!(!ctl.toggle_shuffle());
    }
}
