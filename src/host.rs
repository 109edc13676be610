//! The seam between the core and whatever actually makes sound.
//!
//! A [`MediaHost`] accepts commands and reports back through [`HostEvent`]s,
//! which the caller feeds to
//! [`PlaybackController::on_host_event`](crate::controller::PlaybackController::on_host_event)
//! one at a time. Every load is tagged with a [`LoadId`] and every event carries
//! the id of the load it belongs to, so late events from an abandoned track can
//! be recognized and dropped.

use std::fmt;

/// Identifies one `load` call. Strictly increasing per controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LoadId(pub u64);

impl fmt::Display for LoadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub trait MediaHost {
    /// Point the host at a resource, replacing whatever was loaded.
    /// `None` unloads and silences the host.
    fn load(&mut self, id: LoadId, url: Option<&str>);

    /// Ask the host to start playback of load `id`.
    ///
    /// An immediate refusal is returned as `Err`. Hosts that decide later
    /// return `Ok` and report the outcome with [`HostEvent::PlaySettled`].
    fn play(&mut self, id: LoadId) -> Result<(), String>;

    fn pause(&mut self);

    /// Jump to an absolute position in seconds.
    fn seek_to(&mut self, position_secs: f64);

    fn set_volume(&mut self, volume: f32);

    fn set_rate(&mut self, rate: f32);
}

/// Notifications delivered by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    PositionChanged {
        id: LoadId,
        position_secs: f64,
        /// `None` until the host knows the length of the resource.
        duration_secs: Option<f64>,
    },
    Ended {
        id: LoadId,
    },
    Error {
        id: LoadId,
        message: String,
    },
    PlaySettled {
        id: LoadId,
        outcome: Result<(), String>,
    },
}

impl HostEvent {
    pub fn load_id(&self) -> LoadId {
        match self {
            HostEvent::PositionChanged { id, .. }
            | HostEvent::Ended { id }
            | HostEvent::Error { id, .. }
            | HostEvent::PlaySettled { id, .. } => *id,
        }
    }
}

/// A command received by a [`RecordingHost`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Load(LoadId, Option<String>),
    Play(LoadId),
    Pause,
    SeekTo(f64),
    SetVolume(f32),
    SetRate(f32),
}

/// A silent host that records every command. Used for `--dry-run` and by
/// headless tests.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub calls: Vec<HostCall>,
    /// When set, every `play` is refused with this message.
    pub refuse_play: Option<String>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent load, if any.
    pub fn last_load(&self) -> Option<(LoadId, Option<&str>)> {
        self.calls.iter().rev().find_map(|c| match c {
            HostCall::Load(id, url) => Some((*id, url.as_deref())),
            _ => None,
        })
    }

    pub fn take_calls(&mut self) -> Vec<HostCall> {
        std::mem::take(&mut self.calls)
    }
}

impl MediaHost for RecordingHost {
    fn load(&mut self, id: LoadId, url: Option<&str>) {
        self.calls.push(HostCall::Load(id, url.map(str::to_string)));
    }

    fn play(&mut self, id: LoadId) -> Result<(), String> {
        self.calls.push(HostCall::Play(id));
        match &self.refuse_play {
            Some(reason) => Err(reason.clone()),
            None => Ok(()),
        }
    }

    fn pause(&mut self) {
        self.calls.push(HostCall::Pause);
    }

    fn seek_to(&mut self, position_secs: f64) {
        self.calls.push(HostCall::SeekTo(position_secs));
    }

    fn set_volume(&mut self, volume: f32) {
        self.calls.push(HostCall::SetVolume(volume));
    }

    fn set_rate(&mut self, rate: f32) {
        self.calls.push(HostCall::SetRate(rate));
    }
}
