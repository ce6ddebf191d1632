use super::MediaSource;
use crate::error::MediaError;
use crate::session::SessionSnapshot;

pub struct DummyMediaSource;

impl DummyMediaSource {
    pub fn new() -> Self {
        Self
    }
}

impl MediaSource for DummyMediaSource {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn now_playing(&self) -> Result<Option<SessionSnapshot>, MediaError> {
        Ok(None)
    }
}
