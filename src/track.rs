use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize, Serializer};

/// How a track identifier is derived from a session snapshot
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityStrategy {
    /// Platform persistent ID when the backend has one, composite key otherwise
    #[default]
    Auto,
    /// Always `title:artist:album`
    Composite,
}

/// Identifier used to decide whether the cached record is still current
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum TrackId {
    Persistent(u64),
    Composite(String),
}

impl TrackId {
    /// Build the `title:artist:album` key. Missing parts render as "".
    pub fn composite(title: Option<&str>, artist: Option<&str>, album: Option<&str>) -> Self {
        TrackId::Composite(format!(
            "{}:{}:{}",
            title.unwrap_or_default(),
            artist.unwrap_or_default(),
            album.unwrap_or_default()
        ))
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackId::Persistent(id) => write!(f, "{:#018x}", id),
            TrackId::Composite(key) => f.write_str(key),
        }
    }
}

/// Raw transport status as reported by a platform media API
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransportStatus {
    Playing,
    SeekingForward,
    SeekingBackward,
    Paused,
    Interrupted,
    Stopped,
    #[default]
    Unknown,
}

/// Normalized tri-state sent over the wire as 0, 1 or 2
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Playing = 0,
    Paused = 1,
    Stopped = 2,
}

impl PlaybackState {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            PlaybackState::Playing => "▶ Playing",
            PlaybackState::Paused => "⏸ Paused",
            PlaybackState::Stopped => "⏹ Stopped",
        }
    }
}

impl From<TransportStatus> for PlaybackState {
    fn from(status: TransportStatus) -> Self {
        match status {
            TransportStatus::Playing
            | TransportStatus::SeekingForward
            | TransportStatus::SeekingBackward => PlaybackState::Playing,
            TransportStatus::Paused | TransportStatus::Interrupted => PlaybackState::Paused,
            TransportStatus::Stopped | TransportStatus::Unknown => PlaybackState::Stopped,
        }
    }
}

impl Serialize for PlaybackState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// The record handed back to the caller of `track`.
///
/// Descriptive fields survive between calls as long as `id` does not
/// change; `state` and `position_ms` are refreshed on every call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrackRecord {
    pub id: TrackId,
    pub album: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
    #[serde(rename = "duration")]
    pub duration_ms: Option<u64>,
    #[serde(rename = "position", skip_serializing_if = "Option::is_none")]
    pub position_ms: Option<u64>,
    #[serde(serialize_with = "serialize_image")]
    pub image: Option<Vec<u8>>,
    #[serde(rename = "imageUri", skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
    pub source: String,
    pub state: PlaybackState,
}

// JSON has no byte strings, so artwork travels as base64
fn serialize_image<S: Serializer>(image: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
    match image {
        Some(bytes) => serializer.serialize_str(&general_purpose::STANDARD.encode(bytes)),
        None => serializer.serialize_none(),
    }
}

impl TrackRecord {
    /// Wire form of the record as a JSON map
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            tracing::error!("[Track] Failed to encode record {}: {}", self.id, e);
            serde_json::Value::Object(serde_json::Map::new())
        })
    }
}
