use std::sync::OnceLock;
use std::time::Duration;

use tokio::runtime::Runtime;
use windows::Foundation::TimeSpan;
use windows::Media::Control::{
    GlobalSystemMediaTransportControlsSession, GlobalSystemMediaTransportControlsSessionManager,
    GlobalSystemMediaTransportControlsSessionPlaybackStatus as SmtcStatus,
};
use windows::Storage::Streams::DataReader;

use super::MediaSource;
use crate::error::MediaError;
use crate::session::{ArtworkSource, SessionSnapshot};
use crate::track::TransportStatus;

const BACKEND: &str = "smtc";

static MEDIA_RUNTIME: OnceLock<Option<Runtime>> = OnceLock::new();

/// Global System Media Transport Controls.
///
/// WinRT calls are async; each query blocks on a shared current-thread
/// runtime. The session manager is requested once (an expensive IPC call)
/// and reused.
pub struct WindowsMediaSource {
    manager: OnceLock<Option<GlobalSystemMediaTransportControlsSessionManager>>,
}

impl WindowsMediaSource {
    pub fn new() -> Self {
        Self {
            manager: OnceLock::new(),
        }
    }

    fn runtime() -> Result<&'static Runtime, MediaError> {
        MEDIA_RUNTIME
            .get_or_init(|| {
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(|e| tracing::error!("[Media/Windows] Failed to create runtime: {}", e))
                    .ok()
            })
            .as_ref()
            .ok_or(MediaError::Unavailable(BACKEND))
    }

    fn manager(&self) -> Result<&GlobalSystemMediaTransportControlsSessionManager, MediaError> {
        let rt = Self::runtime()?;
        self.manager
            .get_or_init(|| {
                rt.block_on(async {
                    match GlobalSystemMediaTransportControlsSessionManager::RequestAsync() {
                        Ok(op) => op.await.ok(),
                        Err(e) => {
                            tracing::error!("[Media/Windows] Failed to request SessionManager: {}", e);
                            None
                        }
                    }
                })
            })
            .as_ref()
            .ok_or(MediaError::Unavailable(BACKEND))
    }

    fn current_session(&self) -> Result<Option<GlobalSystemMediaTransportControlsSession>, MediaError> {
        // GetCurrentSession fails when no app owns a session
        Ok(self.manager()?.GetCurrentSession().ok())
    }
}

impl Default for WindowsMediaSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper function to clean up Windows App Ids
fn clean_app_name(raw_id: &str) -> String {
    let stage1 = raw_id.split('!').last().unwrap_or(raw_id);
    let stage2 = stage1.split('.').next().unwrap_or(stage1);
    let mut chars = stage2.chars();
    match chars.next() {
        None => String::new(),
        Some(f) => format!("{}{}", f.to_uppercase(), chars.as_str().to_lowercase()),
    }
}

fn transport_status(status: SmtcStatus) -> TransportStatus {
    match status {
        SmtcStatus::Playing => TransportStatus::Playing,
        SmtcStatus::Paused => TransportStatus::Paused,
        SmtcStatus::Stopped | SmtcStatus::Closed => TransportStatus::Stopped,
        _ => TransportStatus::Unknown,
    }
}

const TICKS_PER_SEC: u64 = 10_000_000;

/// WinRT TimeSpan ticks are 100ns
fn timespan(ts: TimeSpan) -> Option<Duration> {
    let ticks = u64::try_from(ts.Duration).ok().filter(|&t| t > 0)?;
    Some(Duration::new(
        ticks / TICKS_PER_SEC,
        ((ticks % TICKS_PER_SEC) * 100) as u32,
    ))
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl MediaSource for WindowsMediaSource {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn is_available(&self) -> bool {
        self.manager().is_ok()
    }

    fn now_playing(&self) -> Result<Option<SessionSnapshot>, MediaError> {
        let rt = Self::runtime()?;
        let session = match self.current_session()? {
            Some(s) => s,
            None => return Ok(None),
        };

        rt.block_on(async {
            let app_id_raw = session
                .SourceAppUserModelId()
                .map(|h| h.to_string())
                .unwrap_or_default();

            let status = session
                .GetPlaybackInfo()
                .and_then(|i| i.PlaybackStatus())
                .map(transport_status)
                .unwrap_or(TransportStatus::Unknown);

            let props = session
                .TryGetMediaPropertiesAsync()
                .map_err(|e| MediaError::backend(BACKEND, e))?
                .await
                .map_err(|e| MediaError::backend(BACKEND, e))?;

            let genre = props
                .Genres()
                .ok()
                .filter(|g| g.Size().unwrap_or(0) > 0)
                .and_then(|g| g.GetAt(0).ok())
                .and_then(|h| non_empty(h.to_string()));

            let (duration, position) = match session.GetTimelineProperties() {
                Ok(timeline) => (
                    timeline.EndTime().ok().and_then(timespan),
                    timeline.Position().ok().and_then(timespan),
                ),
                Err(_) => (None, None),
            };

            let snapshot = SessionSnapshot {
                persistent_id: None,
                title: props.Title().ok().and_then(|h| non_empty(h.to_string())),
                artist: props.Artist().ok().and_then(|h| non_empty(h.to_string())),
                album: props.AlbumTitle().ok().and_then(|h| non_empty(h.to_string())),
                genre,
                duration,
                position,
                status,
                art_url: None,
                source_app: clean_app_name(&app_id_raw),
            };

            // Browsers keep an empty session around after a tab stops
            Ok::<_, MediaError>((!snapshot.is_empty()).then_some(snapshot))
        })
    }

    fn artwork(&self, _snapshot: &SessionSnapshot) -> Result<Option<ArtworkSource>, MediaError> {
        let rt = Self::runtime()?;
        let session = match self.current_session()? {
            Some(s) => s,
            None => return Ok(None),
        };

        rt.block_on(async {
            let props = session
                .TryGetMediaPropertiesAsync()
                .map_err(|e| MediaError::backend(BACKEND, e))?
                .await
                .map_err(|e| MediaError::backend(BACKEND, e))?;

            let thumb_ref = match props.Thumbnail() {
                Ok(t) => t,
                Err(_) => return Ok(None),
            };
            let stream = thumb_ref
                .OpenReadAsync()
                .map_err(|e| MediaError::backend(BACKEND, e))?
                .await
                .map_err(|e| MediaError::backend(BACKEND, e))?;

            let size = stream.Size().unwrap_or(0);
            if size == 0 {
                return Ok(None);
            }

            let reader = DataReader::CreateDataReader(&stream).map_err(|e| MediaError::backend(BACKEND, e))?;
            reader
                .LoadAsync(size as u32)
                .map_err(|e| MediaError::backend(BACKEND, e))?
                .await
                .map_err(|e| MediaError::backend(BACKEND, e))?;

            let mut bytes = vec![0u8; size as usize];
            reader
                .ReadBytes(&mut bytes)
                .map_err(|e| MediaError::backend(BACKEND, e))?;
            Ok::<_, MediaError>(Some(ArtworkSource::Bytes(bytes)))
        })
    }
}
