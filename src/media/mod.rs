use crate::config::Settings;
use crate::error::MediaError;
use crate::session::{ArtworkSource, SessionSnapshot};

/// Read access to the OS "now playing" session.
///
/// Calls are synchronous and made on every `track` request, so
/// `now_playing` has to stay cheap. Anything expensive (artwork bytes)
/// belongs in `artwork`, which is only asked for on track change.
pub trait MediaSource {
    /// Backend tag for logs
    fn name(&self) -> &'static str;

    /// Whether the OS media API can be reached at all
    fn is_available(&self) -> bool;

    /// Current session, or `None` when nothing is loaded
    fn now_playing(&self) -> Result<Option<SessionSnapshot>, MediaError>;

    /// Artwork of the item described by `snapshot`
    fn artwork(&self, snapshot: &SessionSnapshot) -> Result<Option<ArtworkSource>, MediaError> {
        Ok(snapshot.art_url.clone().map(ArtworkSource::Url))
    }

    /// Trigger whatever consent prompt the OS needs before sessions can be read.
    ///
    /// Answers `true` once the request has been made, whether or not the
    /// user grants it; `is_available` reports the outcome.
    fn request_permissions(&self) -> bool {
        true
    }
}

impl<T: MediaSource + ?Sized> MediaSource for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn now_playing(&self) -> Result<Option<SessionSnapshot>, MediaError> {
        (**self).now_playing()
    }

    fn artwork(&self, snapshot: &SessionSnapshot) -> Result<Option<ArtworkSource>, MediaError> {
        (**self).artwork(snapshot)
    }

    fn request_permissions(&self) -> bool {
        (**self).request_permissions()
    }
}

// ==============================================================
// OS SELECTION FACTORY
// ==============================================================

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
pub type PlatformMedia = windows::WindowsMediaSource;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub type PlatformMedia = linux::LinuxMediaSource;

// Parsing is plain Rust, so it is compiled (and tested) everywhere
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
mod macos;
#[cfg(target_os = "macos")]
pub type PlatformMedia = macos::MacMediaSource;

#[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
mod dummy;
#[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
pub type PlatformMedia = dummy::DummyMediaSource;

/// Build the backend for the OS this binary was compiled for
pub fn platform_source(settings: &Settings) -> PlatformMedia {
    #[cfg(target_os = "linux")]
    {
        PlatformMedia::new(settings.ignored_players.clone())
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = settings;
        PlatformMedia::new()
    }
}
