use lofty::file::FileType;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Artist shown for tracks that arrive without one.
pub const DEFAULT_ARTIST: &str = "Local";

const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

/// One playable audio item. Never mutated after it is added to a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    /// Resource locator handed to the media host.
    pub url: String,
    pub artist: String,
}

impl Track {
    pub fn new(name: impl Into<String>, url: impl Into<String>, artist: impl Into<String>) -> Self {
        Track {
            name: name.into(),
            url: url.into(),
            artist: artist.into(),
        }
    }

    /// Build a track from an accepted candidate, deriving the display name
    /// from the file name.
    pub fn from_candidate(candidate: MediaCandidate) -> Self {
        Track {
            name: default_track_name(&candidate.name),
            url: candidate.locator,
            artist: DEFAULT_ARTIST.to_string(),
        }
    }
}

/// A resource offered by file intake, before it is accepted as a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaCandidate {
    /// File name as shown to the user, extension included.
    pub name: String,
    /// Declared media type, e.g. `audio/mpeg`.
    pub media_type: String,
    pub locator: String,
}

impl MediaCandidate {
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        locator: impl Into<String>,
    ) -> Self {
        MediaCandidate {
            name: name.into(),
            media_type: media_type.into(),
            locator: locator.into(),
        }
    }

    /// Describe a file on disk. The media type is guessed from the extension.
    pub fn from_path(path: &Path) -> Result<Self, std::io::Error> {
        let path = path.canonicalize()?;
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let media_type = FileType::from_path(&path)
            .and_then(audio_media_type)
            .unwrap_or(UNKNOWN_MEDIA_TYPE);
        Ok(MediaCandidate {
            name,
            media_type: media_type.to_string(),
            locator: path.to_string_lossy().to_string(),
        })
    }

    pub fn is_audio(&self) -> bool {
        self.media_type.starts_with("audio/")
    }
}

/// Keep only audio candidates, in order, and turn them into tracks.
/// Anything else is dropped without an error.
pub fn accept_audio(candidates: Vec<MediaCandidate>) -> Vec<Track> {
    candidates
        .into_iter()
        .filter(|c| {
            let ok = c.is_audio();
            if !ok {
                debug!(name = %c.name, media_type = %c.media_type, "skipping non-audio file");
            }
            ok
        })
        .map(Track::from_candidate)
        .collect()
}

/// Strip the last extension from a file name: `"a.b.mp3"` becomes `"a.b"`.
/// Names without an extension, and names that would strip to nothing, are
/// returned unchanged.
pub fn default_track_name(file_name: &str) -> String {
    match file_name.rfind('.') {
        Some(pos) if pos > 0 && pos + 1 < file_name.len() && !file_name[pos..].contains('/') => {
            file_name[..pos].to_string()
        }
        _ => file_name.to_string(),
    }
}

fn audio_media_type(file_type: FileType) -> Option<&'static str> {
    match file_type {
        FileType::Aac => Some("audio/aac"),
        FileType::Aiff => Some("audio/aiff"),
        FileType::Ape => Some("audio/ape"),
        FileType::Flac => Some("audio/flac"),
        FileType::Mpeg => Some("audio/mpeg"),
        FileType::Mp4 => Some("audio/mp4"),
        FileType::Mpc => Some("audio/musepack"),
        FileType::Opus => Some("audio/opus"),
        FileType::Vorbis => Some("audio/ogg"),
        FileType::Speex => Some("audio/speex"),
        FileType::Wav => Some("audio/wav"),
        FileType::WavPack => Some("audio/wavpack"),
        _ => None,
    }
}
