use std::time::Duration;

use crate::track::{IdentityStrategy, PlaybackState, TrackId, TransportStatus};

/// Where the artwork of the current item can be read from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArtworkSource {
    /// Encoded image bytes handed over by the platform
    Bytes(Vec<u8>),
    /// `file://`, absolute path or `http(s)://` location
    Url(String),
}

/// One cheap read of a platform's current media session.
///
/// Artwork bytes are deliberately absent; they are fetched separately and
/// only when the track changes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionSnapshot {
    /// Numeric ID the platform keeps stable for the item, if it has one
    pub persistent_id: Option<u64>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub duration: Option<Duration>,
    pub position: Option<Duration>,
    pub status: TransportStatus,
    /// Cheap pointer to the artwork when the platform exposes one (MPRIS artUrl)
    pub art_url: Option<String>,
    /// Player that owns the session (e.g. "Spotify")
    pub source_app: String,
}

impl SessionSnapshot {
    pub fn track_id(&self, strategy: IdentityStrategy) -> TrackId {
        match (strategy, self.persistent_id) {
            (IdentityStrategy::Auto, Some(id)) => TrackId::Persistent(id),
            _ => TrackId::composite(
                self.title.as_deref(),
                self.artist.as_deref(),
                self.album.as_deref(),
            ),
        }
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState::from(self.status)
    }

    /// True when the session carries nothing worth reporting
    pub fn is_empty(&self) -> bool {
        self.persistent_id.is_none()
            && self.title.as_deref().map_or(true, str::is_empty)
            && self.artist.as_deref().map_or(true, str::is_empty)
            && self.album.as_deref().map_or(true, str::is_empty)
    }
}

/// Pick the session to report when several players are alive.
///
/// A playing session wins over a paused one, which wins over a stopped
/// one. Sessions without metadata are never picked. Among equals the
/// first candidate wins, so callers should pass players in discovery order.
pub fn select_session<I>(candidates: I) -> Option<SessionSnapshot>
where
    I: IntoIterator<Item = SessionSnapshot>,
{
    let mut paused: Option<SessionSnapshot> = None;
    let mut stopped: Option<SessionSnapshot> = None;

    for candidate in candidates {
        if candidate.is_empty() {
            continue;
        }
        match candidate.state() {
            PlaybackState::Playing => return Some(candidate),
            PlaybackState::Paused => {
                paused.get_or_insert(candidate);
            }
            PlaybackState::Stopped => {
                stopped.get_or_insert(candidate);
            }
        }
    }

    paused.or(stopped)
}

/// Case-insensitive match of a player against an ignore list
pub fn is_ignored(ignored: &[String], names: &[&str]) -> bool {
    ignored.iter().any(|pattern| {
        names
            .iter()
            .any(|name| name.to_lowercase().contains(&pattern.to_lowercase()))
    })
}
