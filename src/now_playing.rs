use std::time::Duration;

use crate::artwork::{Artwork, ArtworkLoader};
use crate::config::Settings;
use crate::media::MediaSource;
use crate::session::{is_ignored, SessionSnapshot};
use crate::track::{IdentityStrategy, PlaybackState, TrackId, TrackRecord};

/// Answers `track` requests from one media backend.
///
/// The last record is cached: as long as the backend reports the same
/// track identifier only state and position are refreshed, so artwork is
/// decoded once per track. A track first seen stopped gets its artwork on
/// the first refresh where it is no longer stopped. The cache is dropped
/// whenever nothing plays.
pub struct NowPlaying<S> {
    source: S,
    artwork: ArtworkLoader,
    identity: IdentityStrategy,
    source_tag: Option<String>,
    include_position: bool,
    ignored_players: Vec<String>,
    current: Option<TrackRecord>,
    artwork_pending: bool,
}

fn millis(d: Duration) -> u64 {
    d.as_millis().min(u64::MAX as u128) as u64
}

impl<S: MediaSource> NowPlaying<S> {
    pub fn new(source: S, settings: &Settings) -> Self {
        tracing::info!("[NowPlaying] Using '{}' media backend", source.name());
        Self {
            source,
            artwork: ArtworkLoader::new(settings.artwork.clone()),
            identity: settings.identity,
            source_tag: settings.source_tag.clone(),
            include_position: settings.include_position,
            ignored_players: settings.ignored_players.clone(),
            current: None,
            artwork_pending: false,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Whether the backend can answer at all
    pub fn is_enabled(&self) -> bool {
        self.source.is_available()
    }

    /// Ask the OS for access to media sessions
    pub fn request_permissions(&self) -> bool {
        tracing::info!("[NowPlaying] Requesting media access from '{}'", self.source.name());
        self.source.request_permissions()
    }

    /// Record from the previous `track` call, without querying
    pub fn current(&self) -> Option<&TrackRecord> {
        self.current.as_ref()
    }

    /// Query the backend and return the up-to-date record, if any
    pub fn track(&mut self) -> Option<&TrackRecord> {
        let snapshot = match self.source.now_playing() {
            Ok(Some(snapshot)) if !self.is_ignored(&snapshot) => snapshot,
            Ok(_) => {
                self.clear();
                return None;
            }
            Err(e) => {
                tracing::warn!("[NowPlaying] {} query failed: {}", self.source.name(), e);
                self.clear();
                return None;
            }
        };

        let id = snapshot.track_id(self.identity);
        let position_ms = self.position_of(&snapshot);

        let same_track = self.current.as_ref().is_some_and(|record| record.id == id);
        if same_track {
            let artwork = (self.artwork_pending && snapshot.state() != PlaybackState::Stopped)
                .then(|| self.load_artwork(&snapshot));
            if let Some(record) = self.current.as_mut() {
                record.state = snapshot.state();
                record.position_ms = position_ms;
                if let Some(artwork) = artwork {
                    record.image = artwork.image;
                    record.image_uri = artwork.uri;
                    self.artwork_pending = false;
                }
            }
        } else {
            let stopped = snapshot.state() == PlaybackState::Stopped;
            let record = self.build_record(id, &snapshot, position_ms, !stopped);
            self.artwork_pending = stopped;
            tracing::info!(
                "[NowPlaying] Now playing: {} - {} ({})",
                record.artist.as_deref().unwrap_or("?"),
                record.title.as_deref().unwrap_or("?"),
                record.source
            );
            self.current = Some(record);
        }

        self.current.as_ref()
    }

    fn is_ignored(&self, snapshot: &SessionSnapshot) -> bool {
        is_ignored(&self.ignored_players, &[snapshot.source_app.as_str()])
    }

    fn position_of(&self, snapshot: &SessionSnapshot) -> Option<u64> {
        if self.include_position {
            snapshot.position.map(millis)
        } else {
            None
        }
    }

    fn clear(&mut self) {
        self.artwork_pending = false;
        if let Some(previous) = self.current.take() {
            tracing::debug!("[NowPlaying] Session ended ({})", previous.id);
        }
    }

    fn build_record(
        &self,
        id: TrackId,
        snapshot: &SessionSnapshot,
        position_ms: Option<u64>,
        with_artwork: bool,
    ) -> TrackRecord {
        let artwork = if with_artwork {
            self.load_artwork(snapshot)
        } else {
            Artwork::default()
        };

        TrackRecord {
            id,
            album: snapshot.album.clone(),
            title: snapshot.title.clone(),
            artist: snapshot.artist.clone(),
            genre: snapshot.genre.clone(),
            duration_ms: snapshot.duration.map(millis),
            position_ms,
            image: artwork.image,
            image_uri: artwork.uri,
            source: self
                .source_tag
                .clone()
                .unwrap_or_else(|| snapshot.source_app.clone()),
            state: snapshot.state(),
        }
    }

    fn load_artwork(&self, snapshot: &SessionSnapshot) -> Artwork {
        if !self.artwork.enabled() {
            return Artwork::default();
        }
        match self.source.artwork(snapshot) {
            Ok(Some(source)) => self.artwork.load(&source),
            Ok(None) => Artwork::default(),
            Err(e) => {
                tracing::warn!("[NowPlaying] Artwork lookup failed: {}", e);
                Artwork::default()
            }
        }
    }
}
