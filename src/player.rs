//! RodioHost: the real [`MediaHost`], playing local files through rodio.
//!
//! rodio's `OutputStream` is not `Send`, so everything audio lives on a
//! dedicated "audio-runtime" thread. `RodioHost` only holds the sending half of
//! a channel. The thread polls with `recv_timeout` so it can notice the end of
//! a track and report the position between commands. Events go back through
//! the `on_event` callback, tagged with the load they belong to.

use crate::error::Result;
use crate::host::{HostEvent, LoadId, MediaHost};
use lofty::file::AudioFile;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const POSITION_INTERVAL: Duration = Duration::from_millis(250);
/// `try_seek` flushes the sink, so `empty()` can read true right after a seek.
const SEEK_COOLDOWN: Duration = Duration::from_millis(500);

// ── Output ──────────────────────────────────────────────────────────────────

/// An open audio output device.
struct Output {
    _stream: OutputStream,
    handle: OutputStreamHandle,
}

impl Output {
    fn open() -> std::result::Result<Self, String> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| format!("Failed to open audio output: {}", e))?;
        Ok(Output {
            _stream: stream,
            handle,
        })
    }

    /// Decode `path` onto a fresh, paused sink.
    fn load_file(&self, path: &Path) -> std::result::Result<(Sink, Option<Duration>), String> {
        let sink = Sink::try_new(&self.handle)
            .map_err(|e| format!("Failed to create audio sink: {}", e))?;
        let file = File::open(path)
            .map_err(|e| format!("Cannot open '{}': {}", path.display(), e))?;
        let source = Decoder::new(BufReader::new(file))
            .map_err(|e| format!("Cannot decode '{}': {}", path.display(), e))?;
        let duration = probe_duration(path).or_else(|| source.total_duration());
        sink.pause();
        sink.append(source);
        Ok((sink, duration))
    }
}

/// Track length from the file's metadata, if lofty can read it.
pub fn probe_duration(path: &Path) -> Option<Duration> {
    let tagged = lofty::read_from_path(path).ok()?;
    let duration = tagged.properties().duration();
    (!duration.is_zero()).then_some(duration)
}

// ── Commands ────────────────────────────────────────────────────────────────

enum AudioCmd {
    Load { id: LoadId, path: Option<PathBuf> },
    Play(LoadId),
    Pause,
    Seek(f64),
    SetVolume(f32),
    SetRate(f32),
    Shutdown,
}

// ── Host ────────────────────────────────────────────────────────────────────

pub struct RodioHost {
    tx: mpsc::Sender<AudioCmd>,
}

impl RodioHost {
    /// Start the audio thread. The output device is opened on the first load,
    /// so this succeeds on machines without sound hardware.
    ///
    /// `on_event` runs on the audio thread.
    pub fn spawn<F>(on_event: F) -> Result<Self>
    where
        F: Fn(HostEvent) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<AudioCmd>();
        std::thread::Builder::new()
            .name("audio-runtime".into())
            .spawn(move || audio_thread_loop(rx, on_event))?;
        Ok(RodioHost { tx })
    }

    fn send(&self, cmd: AudioCmd) -> std::result::Result<(), String> {
        self.tx
            .send(cmd)
            .map_err(|_| "audio thread has stopped".to_string())
    }
}

impl MediaHost for RodioHost {
    fn load(&mut self, id: LoadId, url: Option<&str>) {
        let path = url.map(PathBuf::from);
        if let Err(e) = self.send(AudioCmd::Load { id, path }) {
            warn!("{}", e);
        }
    }

    fn play(&mut self, id: LoadId) -> std::result::Result<(), String> {
        self.send(AudioCmd::Play(id))
    }

    fn pause(&mut self) {
        let _ = self.send(AudioCmd::Pause);
    }

    fn seek_to(&mut self, position_secs: f64) {
        let _ = self.send(AudioCmd::Seek(position_secs));
    }

    fn set_volume(&mut self, volume: f32) {
        let _ = self.send(AudioCmd::SetVolume(volume));
    }

    fn set_rate(&mut self, rate: f32) {
        let _ = self.send(AudioCmd::SetRate(rate));
    }
}

impl Drop for RodioHost {
    fn drop(&mut self) {
        let _ = self.tx.send(AudioCmd::Shutdown);
    }
}

// ── Audio thread ────────────────────────────────────────────────────────────

struct Loaded {
    id: LoadId,
    sink: Sink,
    duration: Option<Duration>,
    started: bool,
}

impl Loaded {
    fn position_event(&self) -> HostEvent {
        HostEvent::PositionChanged {
            id: self.id,
            position_secs: self.sink.get_pos().as_secs_f64(),
            duration_secs: self.duration.map(|d| d.as_secs_f64()),
        }
    }
}

fn audio_thread_loop<F>(rx: mpsc::Receiver<AudioCmd>, on_event: F)
where
    F: Fn(HostEvent),
{
    let mut output: Option<Output> = None;
    let mut current: Option<Loaded> = None;
    let mut volume = 1.0_f32;
    let mut rate = 1.0_f32;
    let mut last_seek: Option<Instant> = None;
    let mut last_report = Instant::now();

    loop {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(cmd) => match cmd {
                AudioCmd::Load { id, path } => {
                    if let Some(old) = current.take() {
                        old.sink.stop();
                    }
                    let Some(path) = path else {
                        debug!(%id, "unloaded");
                        continue;
                    };
                    if output.is_none() {
                        match Output::open() {
                            Ok(o) => output = Some(o),
                            Err(message) => {
                                on_event(HostEvent::Error { id, message });
                                continue;
                            }
                        }
                    }
                    let Some(out) = &output else { continue };
                    match out.load_file(&path) {
                        Ok((sink, duration)) => {
                            sink.set_volume(volume);
                            sink.set_speed(rate);
                            let loaded = Loaded {
                                id,
                                sink,
                                duration,
                                started: false,
                            };
                            on_event(loaded.position_event());
                            current = Some(loaded);
                        }
                        Err(message) => on_event(HostEvent::Error { id, message }),
                    }
                }

                AudioCmd::Play(id) => {
                    let outcome = match current.as_mut() {
                        Some(loaded) if loaded.id == id => {
                            loaded.sink.play();
                            loaded.started = true;
                            Ok(())
                        }
                        _ => Err(format!("load {} is not ready", id)),
                    };
                    on_event(HostEvent::PlaySettled { id, outcome });
                }

                AudioCmd::Pause => {
                    if let Some(loaded) = &current {
                        loaded.sink.pause();
                    }
                }

                AudioCmd::Seek(secs) => {
                    if let Some(loaded) = &current {
                        match loaded.sink.try_seek(Duration::from_secs_f64(secs.max(0.0))) {
                            Ok(()) => {
                                last_seek = Some(Instant::now());
                                on_event(loaded.position_event());
                            }
                            Err(e) => on_event(HostEvent::Error {
                                id: loaded.id,
                                message: format!("Seek failed: {}", e),
                            }),
                        }
                    }
                }

                AudioCmd::SetVolume(v) => {
                    volume = v;
                    if let Some(loaded) = &current {
                        loaded.sink.set_volume(v);
                    }
                }

                AudioCmd::SetRate(r) => {
                    rate = r;
                    if let Some(loaded) = &current {
                        loaded.sink.set_speed(r);
                    }
                }

                AudioCmd::Shutdown => {
                    if let Some(loaded) = &current {
                        loaded.sink.stop();
                    }
                    break;
                }
            },

            Err(mpsc::RecvTimeoutError::Timeout) => {
                let Some(loaded) = &current else { continue };
                if !loaded.started || loaded.sink.is_paused() {
                    continue;
                }
                let cooling = last_seek.is_some_and(|t| t.elapsed() < SEEK_COOLDOWN);
                if loaded.sink.empty() && !cooling {
                    let id = loaded.id;
                    current = None;
                    on_event(HostEvent::Ended { id });
                } else if last_report.elapsed() >= POSITION_INTERVAL {
                    last_report = Instant::now();
                    on_event(loaded.position_event());
                }
            }

            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}
