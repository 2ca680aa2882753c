// ── Firmware upload ──
//
// Validate the request, make sure the tools are on the agent, claim the
// single upload slot, post the payload, then follow the programmer status
// frames until a terminal state or the timeout.

use boardlink_api::http::{ExtraFile, ToolPayload, UploadExtra, UploadPayload};
use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::agent::Agent;
use crate::error::CoreError;
use crate::model::{
    CompileArtifacts, DownloadRequest, Ticket, UploadRequest, UploadStatus, remove_ticket,
};

/// Where the upload recipe names the artifact file.
const PROJECT_NAME_PLACEHOLDER: &str = "{build.project_name}.";

const DEFAULT_ARTIFACT_EXTENSION: &str = "bin";

impl Agent {
    /// Upload a compiled sketch and wait for the programmer to finish.
    ///
    /// Resolves with `Done` or `Error`; a rejected HTTP request, a missing
    /// recipe and the upload timeout all resolve to `Error`.
    pub async fn upload(&self, request: &UploadRequest) -> Result<UploadStatus, CoreError> {
        let signature = request
            .compute
            .signature
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or(CoreError::MissingSignature)?;

        let store = &self.inner.store;
        if store.snapshot().upload_status == UploadStatus::InProgress {
            return Err(CoreError::UploadInProgress);
        }

        let Some(commandline) = request.compute.commandline.clone().filter(|c| !c.is_empty())
        else {
            warn!(port = %request.port, "no upload recipe for this board");
            return Ok(UploadStatus::Error);
        };

        let (extension, data) = select_artifact(&commandline, &request.compile_data)?;
        let client = self.http_client()?;

        self.ensure_tools(&request.compute.tools).await;

        let network = store
            .snapshot()
            .network_ports
            .iter()
            .any(|p| p.name == request.port);
        let payload = build_payload(request, signature, commandline, &extension, data, network);

        let ticket = Ticket::new();
        let id = ticket.id;
        let claimed = store.update(|s| {
            if s.upload_status == UploadStatus::InProgress || !s.upload_quota.is_empty() {
                return false;
            }
            s.upload_status = UploadStatus::None;
            s.upload_quota.push(ticket);
            true
        });
        if !claimed {
            return Err(CoreError::UploadInProgress);
        }

        let timeout = self.inner.config.upload_timeout;
        let finished = store.wait_for(
            |_, next| next.upload_status.is_terminal(),
            |s| s.upload_status,
            UploadStatus::Error,
            timeout,
        );

        info!(port = %payload.port, board = %payload.board, filename = %payload.filename, "uploading");
        if let Err(e) = client.upload(&payload).await {
            warn!(error = %e, "upload request failed");
            store.update_if(|s| remove_ticket(&mut s.upload_quota, id));
            return Ok(UploadStatus::Error);
        }

        let waited = finished.await;
        if waited.is_timed_out() {
            warn!(
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                "upload timed out"
            );
        }
        store.update_if(|s| {
            let ours = remove_ticket(&mut s.upload_quota, id);
            // Release the slot a timed-out upload still holds.
            if ours && s.upload_status == UploadStatus::InProgress {
                s.upload_status = UploadStatus::Error;
            }
            ours
        });

        let status = waited.into_inner();
        info!(%status, "upload finished");
        Ok(status)
    }

    /// Get the recipe's tools onto the agent. Failures are logged; the
    /// upload itself reports whether anything was missing.
    async fn ensure_tools(&self, tools: &[ToolPayload]) {
        if tools.is_empty() {
            return;
        }

        if self.inner.store.snapshot().config.use_v2 {
            let results = join_all(tools.iter().map(|tool| self.install_tool_v2(tool))).await;
            for (tool, result) in tools.iter().zip(results) {
                if let Err(e) = result {
                    warn!(tool = %tool.name, error = %e, "tool install failed");
                }
            }
            return;
        }

        let requests: Vec<_> = tools.iter().filter_map(DownloadRequest::from_tool).collect();
        if requests.is_empty() {
            debug!("no downloadable tools in recipe");
            return;
        }
        self.download_tools(&requests).await;
    }
}

/// Extension named after `{build.project_name}.` in the recipe.
fn artifact_extension(commandline: &str) -> Option<&str> {
    let start = commandline.find(PROJECT_NAME_PLACEHOLDER)? + PROJECT_NAME_PLACEHOLDER.len();
    let rest = commandline.get(start..)?;
    let end = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    rest.get(..end).filter(|ext| !ext.is_empty())
}

/// The artifact extension and its data. Recipes that name no known
/// artifact fall back to the `bin` output.
fn select_artifact(
    commandline: &str,
    artifacts: &CompileArtifacts,
) -> Result<(String, String), CoreError> {
    let named = artifact_extension(commandline)
        .filter(|ext| artifacts.for_extension(ext).is_some_and(|d| !d.is_empty()));
    let extension = named.unwrap_or(DEFAULT_ARTIFACT_EXTENSION);

    artifacts
        .for_extension(extension)
        .filter(|data| !data.is_empty())
        .map(|data| (extension.to_owned(), data.to_owned()))
        .ok_or_else(|| CoreError::InvalidUploadPayload {
            message: format!("compile output has no {extension} artifact"),
        })
}

fn build_payload(
    request: &UploadRequest,
    signature: String,
    commandline: String,
    extension: &str,
    data: String,
    network: bool,
) -> UploadPayload {
    let options = request.compute.options;
    UploadPayload {
        board: request.fqbn.clone(),
        port: request.port.clone(),
        filename: format!("{}.{extension}", request.sketch_name),
        hex: data,
        signature,
        commandline,
        extra: UploadExtra {
            wait_for_upload_port: options.wait_for_upload_port,
            use_1200bps_touch: options.use_1200bps_touch,
            network,
            ..UploadExtra::default()
        },
        extrafiles: request
            .compile_data
            .files
            .iter()
            .chain(&request.compute.files)
            .map(|f| ExtraFile {
                filename: f.name.clone(),
                hex: f.data.clone(),
            })
            .collect(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::model::{AgentInfo, ComputeUploadInfo, SketchFile, UploadOptions};
    use crate::test_support::{RecordingSink, attached_agent};

    fn request() -> UploadRequest {
        UploadRequest {
            fqbn: "arduino:samd:mkrwifi1010".into(),
            port: "/dev/ttyACM0".into(),
            sketch_name: "blink".into(),
            compile_data: CompileArtifacts {
                hex: Some("HEXDATA".into()),
                bin: Some("BINDATA".into()),
                elf: None,
                files: vec![SketchFile {
                    name: "blink.ino.with_bootloader.bin".into(),
                    data: "BOOT".into(),
                }],
            },
            compute: ComputeUploadInfo {
                commandline: Some(
                    r#""{runtime.tools.bossac.path}/bossac" -U true -e -w "{build.path}/{build.project_name}.bin" -R"#
                        .into(),
                ),
                signature: Some("deadbeef".into()),
                tools: Vec::new(),
                files: Vec::new(),
                options: UploadOptions {
                    wait_for_upload_port: true,
                    use_1200bps_touch: true,
                },
            },
        }
    }

    #[test]
    fn extension_comes_from_recipe() {
        assert_eq!(artifact_extension("avrdude -Uflash:w:{build.project_name}.hex:i"), Some("hex"));
        assert_eq!(artifact_extension("cp {build.project_name}.elf /tmp"), Some("elf"));
        assert_eq!(artifact_extension("no placeholder here"), None);
        assert_eq!(artifact_extension("{build.project_name}."), None);
    }

    #[test]
    fn selects_named_artifact_or_falls_back_to_bin() {
        let artifacts = request().compile_data;
        assert_eq!(
            select_artifact("avrdude {build.project_name}.hex", &artifacts).unwrap(),
            ("hex".to_owned(), "HEXDATA".to_owned())
        );
        assert_eq!(
            select_artifact("picotool {build.project_name}.uf2", &artifacts).unwrap(),
            ("bin".to_owned(), "BINDATA".to_owned())
        );

        let empty = CompileArtifacts::default();
        assert!(matches!(
            select_artifact("avrdude {build.project_name}.hex", &empty),
            Err(CoreError::InvalidUploadPayload { .. })
        ));
    }

    #[test]
    fn payload_carries_options_and_extra_files() {
        let req = request();
        let payload = build_payload(
            &req,
            "deadbeef".into(),
            "bossac".into(),
            "bin",
            "BINDATA".into(),
            false,
        );

        assert_eq!(payload.filename, "blink.bin");
        assert_eq!(payload.board, "arduino:samd:mkrwifi1010");
        assert!(payload.extra.wait_for_upload_port);
        assert!(payload.extra.use_1200bps_touch);
        assert!(!payload.extra.network);
        assert_eq!(payload.extra.params_quiet, "-q -q");
        assert_eq!(
            payload.extrafiles,
            vec![ExtraFile {
                filename: "blink.ino.with_bootloader.bin".into(),
                hex: "BOOT".into(),
            }]
        );
    }

    #[tokio::test]
    async fn preconditions() {
        let agent = attached_agent(&RecordingSink::default());

        let unsigned = UploadRequest {
            compute: ComputeUploadInfo {
                signature: None,
                ..request().compute
            },
            ..request()
        };
        assert!(matches!(agent.upload(&unsigned).await, Err(CoreError::MissingSignature)));

        let no_recipe = UploadRequest {
            compute: ComputeUploadInfo {
                commandline: None,
                ..request().compute
            },
            ..request()
        };
        assert_eq!(agent.upload(&no_recipe).await.unwrap(), UploadStatus::Error);

        agent.store().update(|s| s.upload_status = UploadStatus::InProgress);
        assert!(matches!(agent.upload(&request()).await, Err(CoreError::UploadInProgress)));
    }

    async fn agent_with_server() -> (crate::agent::Agent, MockServer) {
        let server = MockServer::start().await;
        let agent = attached_agent(&RecordingSink::default());
        agent.store().update(|s| {
            s.agent_info = Some(AgentInfo {
                http: Some(server.uri()),
                ..AgentInfo::default()
            });
        });
        (agent, server)
    }

    #[tokio::test]
    async fn done_is_reached_through_in_progress() {
        let (agent, server) = agent_with_server().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let mut changes = agent.store().subscribe();
        let responder = agent.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            responder.handle_frame(r#"{"ProgrammerStatus":"Done","Flash":"Ok","Msg":"Verify successful"}"#);
        });

        let status = agent.upload(&request()).await.unwrap();
        assert_eq!(status, UploadStatus::Done);

        let mut seen = Vec::new();
        while let Ok(change) = changes.try_recv() {
            if seen.last() != Some(&change.current.upload_status) {
                seen.push(change.current.upload_status);
            }
        }
        assert_eq!(
            seen,
            [UploadStatus::None, UploadStatus::InProgress, UploadStatus::Done]
        );
        assert!(agent.store().snapshot().upload_quota.is_empty());
        assert_eq!(*agent.streams().upload_log().borrow(), "Verify successful\nOk");
    }

    #[tokio::test]
    async fn rejected_post_resolves_to_error() {
        let (agent, server) = agent_with_server().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert_eq!(agent.upload(&request()).await.unwrap(), UploadStatus::Error);
        assert!(agent.store().snapshot().upload_quota.is_empty());
    }

    #[tokio::test]
    async fn timeout_resolves_to_error_and_frees_the_slot() {
        let (agent, server) = agent_with_server().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let responder = agent.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            responder.handle_frame(r#"{"ProgrammerStatus":"Busy","Msg":"Erasing"}"#);
        });

        assert_eq!(agent.upload(&request()).await.unwrap(), UploadStatus::Error);
        let snap = agent.store().snapshot();
        assert!(snap.upload_quota.is_empty());
        assert_eq!(snap.upload_status, UploadStatus::Error);
    }
}
