//! Firmware upload handler.

use futures_util::StreamExt;
use serde::Serialize;

use boardlink_core::{Agent, UploadStatus};

use crate::cli::{GlobalOpts, UploadArgs};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Serialize)]
struct UploadResult {
    port: String,
    sketch: String,
    status: UploadStatus,
}

pub async fn handle(agent: &Agent, args: UploadArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut request = util::read_upload_request(&args.request)?;
    if let Some(port) = args.port {
        request.port = port;
    }

    // Uploader output is relayed above the spinner while the agent works.
    let messages = agent.streams().upload_message_stream();
    let bar = output::spinner(
        format!("Uploading {} to {}", request.sketch_name, request.port),
        global.quiet,
    );
    let log = bar.clone();
    let relay = tokio::spawn(async move {
        let mut messages = std::pin::pin!(messages);
        while let Some(line) = messages.next().await {
            log.println(line);
        }
    });

    let status = agent.upload(&request).await;
    relay.abort();
    bar.finish_and_clear();
    let status = status?;

    let result = UploadResult {
        port: request.port.clone(),
        sketch: request.sketch_name.clone(),
        status,
    };
    let color = output::should_color(global.color);
    let out = output::render_single(
        global.output,
        &result,
        |r| {
            format!(
                "Upload of {} to {}: {}",
                r.sketch,
                r.port,
                output::paint_status(&r.status.to_string(), color)
            )
        },
        |r| r.status.to_string(),
    );
    output::print_output(&out, global.quiet);

    if status == UploadStatus::Done {
        Ok(())
    } else {
        Err(CliError::UploadFailed { port: request.port })
    }
}
