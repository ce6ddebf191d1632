//! Bridge from the operating system's "now playing" session to apps.
//!
//! A [`NowPlaying`] handler polls the platform backend ([`PlatformMedia`])
//! on every `track` call, caches the descriptive fields of the current
//! item and hands back a flat [`TrackRecord`]. The [`bridge`] module puts
//! that behind a line-delimited JSON request/response loop.

pub mod artwork;
pub mod bridge;
pub mod config;
pub mod error;
pub mod logging;
pub mod media;
pub mod now_playing;
pub mod session;
pub mod track;
pub mod watch;

pub use config::Settings;
pub use error::{ConfigError, MediaError};
pub use media::{platform_source, MediaSource, PlatformMedia};
pub use now_playing::NowPlaying;
pub use session::{ArtworkSource, SessionSnapshot};
pub use track::{IdentityStrategy, PlaybackState, TrackId, TrackRecord, TransportStatus};
