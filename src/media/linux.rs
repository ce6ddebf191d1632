use std::cell::RefCell;

use mpris::{MetadataValue, PlaybackStatus, Player, PlayerFinder};

use super::MediaSource;
use crate::error::MediaError;
use crate::session::{is_ignored, select_session, SessionSnapshot};
use crate::track::TransportStatus;

const BACKEND: &str = "mpris";

/// MPRIS over the D-Bus session bus.
///
/// The bus connection is opened on first use and dropped after a D-Bus
/// failure so the next query reconnects.
pub struct LinuxMediaSource {
    finder: RefCell<Option<PlayerFinder>>,
    ignored_players: Vec<String>,
}

impl LinuxMediaSource {
    pub fn new(ignored_players: Vec<String>) -> Self {
        Self {
            finder: RefCell::new(None),
            ignored_players,
        }
    }

    fn with_finder<T>(
        &self,
        f: impl FnOnce(&PlayerFinder) -> Result<T, MediaError>,
    ) -> Result<T, MediaError> {
        let mut slot = self.finder.borrow_mut();
        if slot.is_none() {
            let finder = PlayerFinder::new().map_err(|e| MediaError::backend(BACKEND, e))?;
            tracing::debug!("[Media/Linux] Connected to session bus");
            *slot = Some(finder);
        }

        let result = match slot.as_ref() {
            Some(finder) => f(finder),
            None => Err(MediaError::Unavailable(BACKEND)),
        };
        if result.is_err() {
            *slot = None;
        }
        result
    }
}

fn transport_status(status: PlaybackStatus) -> TransportStatus {
    match status {
        PlaybackStatus::Playing => TransportStatus::Playing,
        PlaybackStatus::Paused => TransportStatus::Paused,
        PlaybackStatus::Stopped => TransportStatus::Stopped,
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// First string of a `xesam:` list field (genre arrives as `as`, some players send `s`)
fn first_string(value: Option<&MetadataValue>) -> Option<String> {
    match value? {
        MetadataValue::String(s) => non_empty(Some(s.as_str())),
        MetadataValue::Array(items) => items.iter().find_map(|item| first_string(Some(item))),
        _ => None,
    }
}

/// Read one player. A player without metadata still yields its status.
fn snapshot_of(player: &Player) -> SessionSnapshot {
    let status = player
        .get_playback_status()
        .map(transport_status)
        .unwrap_or(TransportStatus::Unknown);

    let mut snapshot = SessionSnapshot {
        status,
        source_app: player.identity().to_string(),
        ..Default::default()
    };

    // Get metadata
    if let Ok(meta) = player.get_metadata() {
        snapshot.title = non_empty(meta.title());
        snapshot.artist = meta
            .artists()
            .map(|a| a.join(", "))
            .and_then(|a| non_empty(Some(a.as_str())));
        snapshot.album = non_empty(meta.album_name());
        snapshot.genre = first_string(meta.get("xesam:genre"));
        snapshot.duration = meta.length();
        snapshot.art_url = non_empty(meta.art_url());
    }

    if status != TransportStatus::Stopped {
        snapshot.position = player.get_position().ok();
    }

    snapshot
}

impl MediaSource for LinuxMediaSource {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn is_available(&self) -> bool {
        self.with_finder(|_| Ok(())).is_ok()
    }

    fn now_playing(&self) -> Result<Option<SessionSnapshot>, MediaError> {
        let players = self.with_finder(|finder| match finder.find_all() {
            Ok(players) => Ok(players),
            // No player on the bus is not an error
            Err(mpris::FindingError::NoPlayerFound) => Ok(Vec::new()),
            Err(e) => Err(MediaError::backend(BACKEND, e)),
        })?;

        let candidates = players
            .iter()
            .filter(|p| {
                let ignored = is_ignored(&self.ignored_players, &[p.identity(), p.bus_name()]);
                if ignored {
                    tracing::trace!("[Media/Linux] Skipping ignored player {}", p.identity());
                }
                !ignored
            })
            .map(snapshot_of);

        Ok(select_session(candidates))
    }
}
