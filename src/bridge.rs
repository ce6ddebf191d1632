//! Request/response surface for the app framework.
//!
//! One JSON object per line in each direction. A request names a method
//! and may carry an `id` that is echoed back untouched:
//!
//! ```text
//! > {"id": 1, "method": "track"}
//! < {"id":1,"result":{"id":"So What:Miles Davis:Kind of Blue","album":...,"state":0}}
//! > {"method": "shuffle"}
//! < {"error":{"code":"notImplemented","message":"unknown method 'shuffle'"}}
//! ```

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::media::MediaSource;
use crate::now_playing::NowPlaying;

pub const METHOD_TRACK: &str = "track";
pub const METHOD_ENABLED: &str = "isEnabled";
pub const METHOD_REQUEST_PERMISSIONS: &str = "requestPermissions";

#[derive(Debug, Deserialize)]
pub struct MethodCall {
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct CallError {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct MethodResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CallError>,
}

impl MethodResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Option<Value>, code: &'static str, message: String) -> Self {
        Self {
            id,
            result: None,
            error: Some(CallError { code, message }),
        }
    }
}

/// Answer one call. `track` with nothing playing answers an empty map.
pub fn handle<S: MediaSource>(now_playing: &mut NowPlaying<S>, call: MethodCall) -> MethodResponse {
    match call.method.as_str() {
        METHOD_TRACK => {
            let result = now_playing
                .track()
                .map(|record| record.to_json())
                .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
            MethodResponse::success(call.id, result)
        }
        METHOD_ENABLED => MethodResponse::success(call.id, Value::Bool(now_playing.is_enabled())),
        METHOD_REQUEST_PERMISSIONS => {
            MethodResponse::success(call.id, Value::Bool(now_playing.request_permissions()))
        }
        other => {
            tracing::debug!("[Bridge] Unknown method '{}'", other);
            MethodResponse::failure(call.id, "notImplemented", format!("unknown method '{}'", other))
        }
    }
}

/// Decode one request line. A well-formed object with a bad `method`
/// still gets its `id` echoed in the error.
fn parse_call(line: &str) -> Result<MethodCall, MethodResponse> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| MethodResponse::failure(None, "badRequest", e.to_string()))?;
    let id = value.get("id").filter(|id| !id.is_null()).cloned();
    serde_json::from_value(value).map_err(|e| MethodResponse::failure(id, "badRequest", e.to_string()))
}

/// Serve line-delimited calls until `input` hits EOF
pub fn serve<S, R, W>(now_playing: &mut NowPlaying<S>, input: R, mut output: W) -> std::io::Result<()>
where
    S: MediaSource,
    R: BufRead,
    W: Write,
{
    tracing::info!("[Bridge] Serving requests");
    let mut handled = 0u64;

    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match parse_call(line) {
            Ok(call) => handle(now_playing, call),
            Err(response) => {
                if let Some(error) = &response.error {
                    tracing::warn!("[Bridge] Bad request: {}", error.message);
                }
                response
            }
        };

        serde_json::to_writer(&mut output, &response)?;
        output.write_all(b"\n")?;
        output.flush()?;
        handled += 1;
    }

    tracing::info!("[Bridge] Input closed after {} requests", handled);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::media::testing::ScriptedSource;
    use crate::session::SessionSnapshot;
    use crate::track::TransportStatus;
    use serde_json::json;
    use std::io::Cursor;

    fn run(source: ScriptedSource, input: &str) -> Vec<Value> {
        let mut np = NowPlaying::new(source, &Settings::default());
        let mut out = Vec::new();
        serve(&mut np, Cursor::new(input), &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn playing() -> SessionSnapshot {
        SessionSnapshot {
            title: Some("So What".to_string()),
            artist: Some("Miles Davis".to_string()),
            album: Some("Kind of Blue".to_string()),
            status: TransportStatus::Playing,
            source_app: "Music".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_track_call() {
        let source = ScriptedSource::new();
        source.push(Some(playing()));

        let responses = run(source, "{\"id\": 7, \"method\": \"track\"}\n");
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], 7);
        assert_eq!(responses[0]["result"]["id"], "So What:Miles Davis:Kind of Blue");
        assert_eq!(responses[0]["result"]["state"], 0);
        assert_eq!(responses[0]["result"]["source"], "Music");
    }

    #[test]
    fn test_nothing_playing_is_empty_map() {
        let source = ScriptedSource::new();
        let responses = run(source, "{\"method\": \"track\"}\n");
        assert_eq!(responses[0], json!({ "result": {} }));
    }

    #[test]
    fn test_is_enabled() {
        let source = ScriptedSource::new();
        source.set_available(false);
        let responses = run(source, "{\"method\": \"isEnabled\"}\n");
        assert_eq!(responses[0]["result"], false);
    }

    #[test]
    fn test_request_permissions() {
        let source = ScriptedSource::new();
        source.set_available(false);
        let mut np = NowPlaying::new(source.clone(), &Settings::default());

        let call = MethodCall {
            id: Some(json!(3)),
            method: METHOD_REQUEST_PERMISSIONS.to_string(),
        };
        let response = handle(&mut np, call);
        assert_eq!(response, MethodResponse::success(Some(json!(3)), Value::Bool(true)));
        assert_eq!(source.permission_requests(), 1);
    }

    #[test]
    fn test_bad_method_keeps_id() {
        let source = ScriptedSource::new();
        let input = "{\"id\": 9}\n{\"id\": \"x\", \"method\": 4}\n{\"id\": null}\n[1, 2]\n";
        let responses = run(source, input);

        assert_eq!(responses.len(), 4);
        assert_eq!(responses[0]["id"], 9);
        assert_eq!(responses[0]["error"]["code"], "badRequest");
        assert_eq!(responses[1]["id"], "x");
        assert_eq!(responses[1]["error"]["code"], "badRequest");
        assert!(responses[2].get("id").is_none());
        assert!(responses[3].get("id").is_none());
        assert_eq!(responses[3]["error"]["code"], "badRequest");
    }

    #[test]
    fn test_unknown_method_and_bad_lines() {
        let source = ScriptedSource::new();
        let input = "{\"id\": \"a\", \"method\": \"shuffle\"}\n\n   \nnot json\n{\"method\": \"isEnabled\"}\n";
        let responses = run(source, input);

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["id"], "a");
        assert_eq!(responses[0]["error"]["code"], "notImplemented");
        assert_eq!(responses[1]["error"]["code"], "badRequest");
        assert_eq!(responses[2]["result"], true);
    }
}
