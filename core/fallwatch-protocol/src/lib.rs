//! HTTP contract types for the fall-detection appliance.
//!
//! This crate is shared by the session controller and the CLI so both agree on
//! the wire shape. The appliance remains the authority on these payloads; the
//! client only validates what it needs to act on.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const STATUS_PATH: &str = "/status";
pub const PING_PATH: &str = "/ping";
pub const MODE_PATH: &str = "/mode";
pub const FALLS_PATH: &str = "/falls";
pub const VIDEO_FEED_PATH: &str = "/video_feed";
pub const NOCACHE_PARAM: &str = "nocache";

pub const CLIPS_PATH: &str = "/api/videos";
pub const CLIP_HEALTH_PATH: &str = "/api/health";

/// Format the appliance uses for fall timestamps.
pub const FALL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const FALLS_STATUS_SUCCESS: &str = "success";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// `GET /status`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub armed: bool,
    #[serde(default)]
    pub camera_active: bool,
    #[serde(default)]
    pub fall_detection_active: bool,
}

/// `POST /mode` body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ModeRequest {
    pub armed: bool,
}

/// `POST /mode` acknowledgement. Only the HTTP status is authoritative; the
/// body is kept for logging.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModeResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub armed: Option<bool>,
}

/// A single detected fall as logged by the appliance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FallEvent {
    #[serde(rename = "person_id")]
    pub subject_id: i64,
    #[serde(rename = "frame")]
    pub frame_index: i64,
    #[serde(rename = "time")]
    pub timestamp: String,
}

impl FallEvent {
    /// Parses the timestamp for display. The poller never relies on this and
    /// compares timestamps as opaque strings.
    pub fn recorded_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.timestamp, FALL_TIME_FORMAT).ok()
    }
}

/// `GET /falls`, as received. An uninitialized detector answers with
/// `status: "error"` and a message instead of a log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FallsResponse {
    pub status: String,
    #[serde(default)]
    pub falls: Vec<FallEvent>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Validated fall log. `falls` keeps the appliance's order; the last element is
/// the most recent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallLog {
    pub falls: Vec<FallEvent>,
    pub count: u64,
}

impl FallLog {
    pub fn most_recent(&self) -> Option<&FallEvent> {
        self.falls.last()
    }
}

impl FallsResponse {
    pub fn into_log(self) -> Result<FallLog, ErrorInfo> {
        if self.status != FALLS_STATUS_SUCCESS {
            let message = self
                .message
                .unwrap_or_else(|| format!("fall log unavailable (status {})", self.status));
            return Err(ErrorInfo::new("falls_unavailable", message));
        }

        let count = self.count.unwrap_or(self.falls.len() as u64);
        Ok(FallLog {
            falls: self.falls,
            count,
        })
    }
}

/// One entry of `GET /api/videos` on the clip server. `url` is relative to the
/// clip server base address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClipEntry {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub size_mb: Option<f64>,
}

/// `GET /api/health` on the clip server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClipHealth {
    pub status: String,
}

impl ClipHealth {
    pub fn is_online(&self) -> bool {
        self.status == "online"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_response_maps_wire_names() {
        let body = r#"{
            "status": "success",
            "falls": [
                {"person_id": 1, "frame": 120, "time": "2025-03-01 10:00:00"},
                {"person_id": 2, "frame": 480, "time": "2025-03-01 10:00:12"}
            ],
            "count": 2
        }"#;

        let response: FallsResponse = serde_json::from_str(body).expect("parse falls");
        let log = response.into_log().expect("valid log");

        assert_eq!(log.count, 2);
        let latest = log.most_recent().expect("latest fall");
        assert_eq!(latest.subject_id, 2);
        assert_eq!(latest.frame_index, 480);
        assert_eq!(latest.timestamp, "2025-03-01 10:00:12");
    }

    #[test]
    fn falls_error_body_is_rejected_with_server_message() {
        let body = r#"{"status": "error", "message": "Fall detector not initialized or no falls detected"}"#;
        let response: FallsResponse = serde_json::from_str(body).expect("parse error body");

        let err = response.into_log().unwrap_err();
        assert_eq!(err.code, "falls_unavailable");
        assert!(err.message.contains("not initialized"));
    }

    #[test]
    fn falls_count_defaults_to_log_length() {
        let response = FallsResponse {
            status: "success".to_string(),
            falls: vec![FallEvent {
                subject_id: 0,
                frame_index: 3,
                timestamp: "2025-03-01 10:00:00".to_string(),
            }],
            count: None,
            message: None,
        };

        assert_eq!(response.into_log().expect("log").count, 1);
    }

    #[test]
    fn mode_request_serializes_armed_flag_only() {
        let value = serde_json::to_value(ModeRequest { armed: true }).expect("serialize");
        assert_eq!(value, serde_json::json!({ "armed": true }));
    }

    #[test]
    fn status_tolerates_missing_optional_flags() {
        let status: StatusResponse = serde_json::from_str(r#"{"armed": true}"#).expect("parse");
        assert!(status.armed);
        assert!(!status.camera_active);
    }

    #[test]
    fn fall_timestamp_parses_for_display() {
        let event = FallEvent {
            subject_id: 4,
            frame_index: 10,
            timestamp: "2025-03-01 22:15:09".to_string(),
        };
        let parsed = event.recorded_at().expect("timestamp");
        assert_eq!(parsed.format("%H:%M").to_string(), "22:15");

        let opaque = FallEvent {
            timestamp: "not-a-time".to_string(),
            ..event
        };
        assert!(opaque.recorded_at().is_none());
    }

    #[test]
    fn clip_entry_accepts_missing_size() {
        let clip: ClipEntry = serde_json::from_str(
            r#"{"name": "fall_0001.mp4", "url": "/videos/fall_0001.mp4", "date": "2025-03-01", "time": "10:00 AM", "duration": "00:42"}"#,
        )
        .expect("parse clip");
        assert_eq!(clip.size_mb, None);
        assert_eq!(clip.duration, "00:42");
    }
}
