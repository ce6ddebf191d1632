//! Change detection for the `watch` command.

use crate::track::{PlaybackState, TrackId, TrackRecord};

/// What was last printed: the track and the state it was in
pub type LastSeen = Option<(TrackId, PlaybackState)>;

pub const NOTHING_PLAYING: &str = "⏹  Nothing playing";

/// Line to print for this poll, if anything changed since `last_seen`.
///
/// A line is produced when the track id or its state differs from the
/// previous poll, and once when the session goes away.
pub fn change_line(last_seen: &mut LastSeen, record: Option<&TrackRecord>) -> Option<String> {
    let Some(record) = record else {
        return last_seen.take().map(|_| NOTHING_PLAYING.to_string());
    };

    let key = (record.id.clone(), record.state);
    if last_seen.as_ref() == Some(&key) {
        return None;
    }
    *last_seen = Some(key);

    Some(format!(
        "{}  {} - {}  [{}]",
        record.state.label(),
        record.artist.as_deref().unwrap_or("Unknown Artist"),
        record.title.as_deref().unwrap_or("Unknown"),
        record.source
    ))
}
