//! Serial monitor handlers.

use std::pin::pin;
use std::time::Duration;

use futures_util::StreamExt;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use boardlink_core::{Agent, MonitorEvent};

use crate::cli::{GlobalOpts, MonitorArgs, SendArgs};
use crate::error::CliError;
use crate::output;

/// Stream a port to stdout until Ctrl-C, end of stream or `--duration`.
pub async fn handle(agent: &Agent, args: &MonitorArgs, global: &GlobalOpts) -> Result<(), CliError> {
    agent.refresh_ports().await?;

    let mut events = pin!(agent.open_monitor(&args.port, Some(args.baud)));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut stdout = tokio::io::stdout();

    let limit = args.duration.map(Duration::from_secs);
    let mut deadline = pin!(async move {
        match limit {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    });

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(Ok(MonitorEvent::Ready)) => {
                    if !global.quiet {
                        eprintln!("── {} @ {} baud, Ctrl-C to quit ──", args.port, args.baud);
                    }
                }
                Some(Ok(MonitorEvent::Data(chunk))) => {
                    stdout.write_all(chunk.as_bytes()).await?;
                    stdout.flush().await?;
                }
                Some(Err(e)) => return Err(e.into()),
                // Closed from elsewhere; nothing left to close.
                None => return Ok(()),
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if let Err(e) = agent.send(&args.port, &line) {
                        tracing::warn!(error = %e, "line not sent");
                    }
                }
                Ok(None) | Err(_) => stdin_open = false,
            },
            () = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    agent.close_monitor(&args.port).await?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct SendResult {
    port: String,
    sent: String,
    reply: String,
}

/// Open `port`, write one line, collect the reply for `--wait-ms` and close.
pub async fn send(agent: &Agent, args: SendArgs, global: &GlobalOpts) -> Result<(), CliError> {
    agent.refresh_ports().await?;

    let mut events = pin!(agent.open_monitor(&args.port, Some(args.baud)));
    match events.next().await {
        Some(Ok(MonitorEvent::Ready)) => {}
        Some(Ok(MonitorEvent::Data(_))) | None => {
            return Err(CliError::Monitor {
                message: format!("Serial monitor on {} ended before it opened", args.port),
            });
        }
        Some(Err(e)) => return Err(e.into()),
    }

    agent.send(&args.port, &args.data)?;

    let mut reply = String::new();
    let mut window = pin!(tokio::time::sleep(Duration::from_millis(args.wait_ms)));
    loop {
        tokio::select! {
            () = &mut window => break,
            event = events.next() => match event {
                Some(Ok(MonitorEvent::Data(chunk))) => reply.push_str(&chunk),
                Some(Ok(MonitorEvent::Ready)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
        }
    }

    agent.close_monitor(&args.port).await?;

    let result = SendResult {
        port: args.port,
        sent: args.data,
        reply,
    };
    let out = output::render_single(
        global.output,
        &result,
        |r| r.reply.trim_end().to_owned(),
        |r| r.reply.trim_end().to_owned(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
