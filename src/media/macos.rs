use std::process::Command;
use std::time::Duration;

// We need base64 decoding to handle the image data from JXA
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;

use super::MediaSource;
use crate::error::MediaError;
use crate::session::{ArtworkSource, SessionSnapshot};
use crate::track::TransportStatus;

const BACKEND: &str = "jxa";

/// Reads the first running scriptable player through JavaScript for Automation.
///
/// Players are never launched; a player that is not running is skipped.
pub struct MacMediaSource;

impl MacMediaSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MacMediaSource {
    fn default() -> Self {
        Self::new()
    }
}

// Shared prelude: finds the active app. Spotify reports duration in ms,
// Music in seconds; both are normalized to ms here.
const JXA_PRELUDE: &str = r#"
    var appNames = ["Music", "Spotify"];
    var activeApp = null;

    for (var i = 0; i < appNames.length; i++) {
        try {
            if (Application(appNames[i]).running()) {
                activeApp = Application(appNames[i]);
                break;
            }
        } catch(e) {}
    }

    if (!activeApp) return "null";
    var isSpotify = activeApp.name() === "Spotify";
"#;

const JXA_TRACK_SCRIPT: &str = r#"
(function() {
    __PRELUDE__
    try {
        var state = activeApp.playerState();
        var track = activeApp.currentTrack;
        var pid = null;
        var genre = null;
        var duration = null;
        var position = null;

        try { pid = isSpotify ? null : track.persistentID(); } catch (e) {}
        try { genre = isSpotify ? null : track.genre(); } catch (e) {}
        try { duration = isSpotify ? track.duration() : track.duration() * 1000; } catch (e) {}
        try { position = activeApp.playerPosition() * 1000; } catch (e) {}

        return JSON.stringify({
            app: activeApp.name(),
            state: state,
            pid: pid,
            title: track.name(),
            artist: track.artist(),
            album: track.album(),
            genre: genre,
            duration_ms: duration,
            position_ms: position
        });
    } catch(e) {
        return "null";
    }
})();
"#;

const JXA_ARTWORK_SCRIPT: &str = r#"
(function() {
    __PRELUDE__
    function toBase64(data) {
        if (!data) return null;
        try {
            var nsData = ObjC.unwrap(data);
            var base64Str = nsData.base64EncodedStringWithOptions(0);
            return ObjC.unwrap(base64Str);
        } catch (e) { return null; }
    }

    try {
        var track = activeApp.currentTrack;
        if (isSpotify) {
            return JSON.stringify({ url: track.artworkUrl() });
        }
        var artworks = track.artworks();
        if (artworks.length > 0) {
            return JSON.stringify({ art: toBase64(artworks[0].rawData()) });
        }
    } catch (e) {}
    return "null";
})();
"#;

#[derive(Debug, Deserialize)]
struct RawTrackInfo {
    app: Option<String>,
    state: Option<String>,
    pid: Option<String>,
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    genre: Option<String>,
    duration_ms: Option<f64>,
    position_ms: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawArtwork {
    art: Option<String>,
    url: Option<String>,
}

fn run_jxa(body: &str) -> Result<Option<String>, MediaError> {
    let script = body.replace("__PRELUDE__", JXA_PRELUDE);
    let output = Command::new("osascript")
        .arg("-l")
        .arg("JavaScript")
        .arg("-e")
        .arg(script)
        .output()?;

    if !output.status.success() {
        return Err(MediaError::backend(
            BACKEND,
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    let json_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if json_str == "null" || json_str.is_empty() {
        return Ok(None);
    }
    Ok(Some(json_str))
}

fn transport_status(state: &str) -> TransportStatus {
    match state {
        "playing" => TransportStatus::Playing,
        "fast forwarding" => TransportStatus::SeekingForward,
        "rewinding" => TransportStatus::SeekingBackward,
        "paused" => TransportStatus::Paused,
        "stopped" => TransportStatus::Stopped,
        _ => TransportStatus::Unknown,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn millis(value: Option<f64>) -> Option<Duration> {
    value
        .filter(|ms| ms.is_finite() && *ms > 0.0)
        .map(|ms| Duration::from_millis(ms as u64))
}

/// Music's persistentID is a 16-digit hex string
fn parse_persistent_id(raw: &str) -> Option<u64> {
    u64::from_str_radix(raw.trim(), 16).ok()
}

fn parse_track(json_str: &str) -> Result<Option<SessionSnapshot>, MediaError> {
    let raw: RawTrackInfo =
        serde_json::from_str(json_str).map_err(|e| MediaError::backend(BACKEND, e))?;

    let snapshot = SessionSnapshot {
        persistent_id: raw.pid.as_deref().and_then(parse_persistent_id),
        title: non_empty(raw.title),
        artist: non_empty(raw.artist),
        album: non_empty(raw.album),
        genre: non_empty(raw.genre),
        duration: millis(raw.duration_ms),
        position: millis(raw.position_ms),
        status: raw
            .state
            .as_deref()
            .map(transport_status)
            .unwrap_or(TransportStatus::Unknown),
        art_url: None,
        source_app: raw.app.unwrap_or_else(|| "Unknown".to_string()),
    };

    // A stopped Music.app still answers with an empty current track
    Ok((!snapshot.is_empty()).then_some(snapshot))
}

fn parse_artwork(json_str: &str) -> Result<Option<ArtworkSource>, MediaError> {
    let raw: RawArtwork =
        serde_json::from_str(json_str).map_err(|e| MediaError::backend(BACKEND, e))?;

    if let Some(b64) = raw.art {
        let bytes = general_purpose::STANDARD
            .decode(b64)
            .map_err(|e| MediaError::backend(BACKEND, e))?;
        return Ok(Some(ArtworkSource::Bytes(bytes)));
    }
    Ok(non_empty(raw.url).map(ArtworkSource::Url))
}

impl MediaSource for MacMediaSource {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn is_available(&self) -> bool {
        Command::new("osascript")
            .arg("-e")
            .arg("return 1")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn request_permissions(&self) -> bool {
        // The first scripted read of Music/Spotify raises the Automation prompt
        if let Err(e) = run_jxa(JXA_TRACK_SCRIPT) {
            tracing::debug!("[Media/macOS] Permission request script failed: {}", e);
        }
        true
    }

    fn now_playing(&self) -> Result<Option<SessionSnapshot>, MediaError> {
        match run_jxa(JXA_TRACK_SCRIPT)? {
            Some(json_str) => parse_track(&json_str),
            None => Ok(None),
        }
    }

    fn artwork(&self, _snapshot: &SessionSnapshot) -> Result<Option<ArtworkSource>, MediaError> {
        tracing::debug!("[Media/MacOS] Fetching artwork");
        match run_jxa(JXA_ARTWORK_SCRIPT)? {
            Some(json_str) => parse_artwork(&json_str),
            None => Ok(None),
        }
    }
}
