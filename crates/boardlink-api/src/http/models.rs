// Wire models for the agent's HTTP endpoints
//
// Field names follow the agent's JSON verbatim (snake_case already), so
// most structs need no serde renames.

use serde::{Deserialize, Serialize};

// ── /info ───────────────────────────────────────────────────────────

/// Body of `GET /info`.
///
/// Every field is optional: older agents omit `wss`/`https`, and a
/// spoofing service may omit anything. Validation happens in the core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfoResponse {
    #[serde(default)]
    pub http: Option<String>,
    #[serde(default)]
    pub https: Option<String>,
    #[serde(default)]
    pub ws: Option<String>,
    #[serde(default)]
    pub wss: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub update_url: Option<String>,
    #[serde(default)]
    pub origins: Option<String>,
}

// ── /update ─────────────────────────────────────────────────────────

/// Result of `POST /update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The reply was not JSON: the agent is restarting into the new build.
    Restarting,
    /// The agent answered with JSON, possibly carrying an error string.
    Responded { error: Option<String> },
}

// ── /v2/pkgs/tools/installed ────────────────────────────────────────

/// A tool entry as understood by the v2 tool API and by board compute
/// results (`name`, `version`, `packager`, plus optional download data).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPayload {
    pub name: String,
    pub version: String,
    pub packager: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

// ── /upload ─────────────────────────────────────────────────────────

/// Body of `POST /upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPayload {
    pub board: String,
    pub port: String,
    pub filename: String,
    pub hex: String,
    pub signature: String,
    pub commandline: String,
    pub extra: UploadExtra,
    pub extrafiles: Vec<ExtraFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadExtra {
    pub auth: UploadAuth,
    pub wait_for_upload_port: bool,
    pub use_1200bps_touch: bool,
    pub network: bool,
    pub params_verbose: String,
    pub params_quiet: String,
    pub verbose: bool,
}

impl Default for UploadExtra {
    fn default() -> Self {
        Self {
            auth: UploadAuth::default(),
            wait_for_upload_port: false,
            use_1200bps_touch: false,
            network: false,
            params_verbose: "-v".into(),
            params_quiet: "-q -q".into(),
            verbose: true,
        }
    }
}

/// Network upload credentials. Serial uploads send `{"password": null}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadAuth {
    pub password: Option<String>,
}

/// An additional file shipped with the upload (base64 content in `hex`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraFile {
    pub filename: String,
    pub hex: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn info_response_tolerates_missing_fields() {
        let info: AgentInfoResponse =
            serde_json::from_str(r#"{"http":"http://127.0.0.1:8991","version":"1.2.7"}"#)
                .unwrap();
        assert_eq!(info.http.as_deref(), Some("http://127.0.0.1:8991"));
        assert_eq!(info.version.as_deref(), Some("1.2.7"));
        assert!(info.ws.is_none());
        assert!(info.update_url.is_none());
    }

    #[test]
    fn upload_extra_defaults_match_serial_upload() {
        let value = serde_json::to_value(UploadExtra::default()).unwrap();
        assert_eq!(value["auth"]["password"], serde_json::Value::Null);
        assert_eq!(value["network"], false);
        assert_eq!(value["params_verbose"], "-v");
        assert_eq!(value["params_quiet"], "-q -q");
        assert_eq!(value["verbose"], true);
    }

    #[test]
    fn tool_payload_skips_absent_download_data() {
        let tool = ToolPayload {
            name: "bossac".into(),
            version: "1.7.0".into(),
            packager: "arduino".into(),
            ..ToolPayload::default()
        };
        let value = serde_json::to_value(&tool).unwrap();
        assert!(value.get("url").is_none());
        assert_eq!(value["packager"], "arduino");
    }
}
