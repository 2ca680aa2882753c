// ── Upload request and status ──

use boardlink_api::http::ToolPayload;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Single-slot upload status. Moves none → in-progress → {error | done}.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum UploadStatus {
    #[default]
    None,
    InProgress,
    Error,
    Done,
}

impl UploadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Error | Self::Done)
    }
}

/// A named file shipped alongside the main artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SketchFile {
    pub name: String,
    /// Base64 content.
    pub data: String,
}

/// Build output of a compile, base64 encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileArtifacts {
    #[serde(default)]
    pub hex: Option<String>,
    #[serde(default)]
    pub bin: Option<String>,
    #[serde(default)]
    pub elf: Option<String>,
    #[serde(default)]
    pub files: Vec<SketchFile>,
}

impl CompileArtifacts {
    /// Artifact data for an extension (`hex`, `bin` or `elf`).
    pub fn for_extension(&self, ext: &str) -> Option<&str> {
        match ext {
            "hex" => self.hex.as_deref(),
            "bin" => self.bin.as_deref(),
            "elf" => self.elf.as_deref(),
            _ => None,
        }
    }
}

/// Board-specific upload flags from the compute result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOptions {
    #[serde(default)]
    pub wait_for_upload_port: bool,
    #[serde(default)]
    pub use_1200bps_touch: bool,
}

/// What the cloud compute step says about uploading to a board.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeUploadInfo {
    /// Upload recipe containing `{build.project_name}.<ext>`.
    #[serde(default)]
    pub commandline: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    /// Tools the recipe needs on the agent side.
    #[serde(default)]
    pub tools: Vec<ToolPayload>,
    #[serde(default)]
    pub files: Vec<SketchFile>,
    #[serde(default)]
    pub options: UploadOptions,
}

/// Everything needed to upload a compiled sketch to a port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub fqbn: String,
    pub port: String,
    pub sketch_name: String,
    pub compile_data: CompileArtifacts,
    pub compute: ComputeUploadInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_error_and_done_are_terminal() {
        assert!(!UploadStatus::None.is_terminal());
        assert!(!UploadStatus::InProgress.is_terminal());
        assert!(UploadStatus::Error.is_terminal());
        assert!(UploadStatus::Done.is_terminal());
        assert_eq!(UploadStatus::InProgress.to_string(), "in-progress");
    }

    #[test]
    fn artifacts_select_by_extension() {
        let artifacts = CompileArtifacts {
            hex: Some("HEX".into()),
            bin: None,
            elf: Some("ELF".into()),
            files: Vec::new(),
        };
        assert_eq!(artifacts.for_extension("hex"), Some("HEX"));
        assert_eq!(artifacts.for_extension("bin"), None);
        assert_eq!(artifacts.for_extension("elf"), Some("ELF"));
        assert_eq!(artifacts.for_extension("uf2"), None);
    }
}
