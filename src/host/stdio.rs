//! Stdin/stdout JSON bridge for the reminders facade.
//!
//! Reads newline-delimited JSON `CommandEnvelope` messages, runs each one
//! through the facade, and writes the `ResponseEnvelope` followed by any
//! delegate `EventEnvelope`s the command produced, one JSON document per
//! line.
//!
//! Stdout is exclusively reserved for the JSON protocol; all diagnostic
//! output (tracing, logs) must be routed to stderr.

use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::{mpsc, oneshot};

use super::contract::{CommandEnvelope, EventEnvelope, ResponseEnvelope};
use super::handler::{EventForwarder, handle_command};
use crate::error::{ReminderError, Result};
use crate::facade::ReminderFacade;

/// Run the bridge over the process's stdin and stdout until stdin closes.
pub async fn run_stdio_bridge(facade: Arc<ReminderFacade>) -> Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    let mut writer = BufWriter::new(tokio::io::stdout());
    run_bridge(facade, reader, &mut writer).await
}

/// Run the bridge over arbitrary line-oriented streams until `reader` hits EOF.
///
/// The bridge installs itself as the facade's delegate for its lifetime.
pub async fn run_bridge<R, W>(facade: Arc<ReminderFacade>, reader: R, writer: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (forwarder, mut events) = EventForwarder::channel();
    let weak = Arc::downgrade(&forwarder);
    facade.set_delegate(weak);

    let mut lines = reader.lines();
    loop {
        let line = lines
            .next_line()
            .await
            .map_err(|e| ReminderError::Host(format!("failed to read command: {e}")))?;
        let Some(line) = line else {
            tracing::info!("input closed (EOF); shutting down reminders bridge");
            break;
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<CommandEnvelope>(trimmed) {
            Ok(envelope) => handle_command(&facade, &envelope).await,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    raw_line = %trimmed,
                    "failed to parse command envelope"
                );
                ResponseEnvelope::error(
                    "parse-error",
                    format!("failed to parse command envelope: {e}"),
                )
            }
        };

        write_json(writer, &response).await?;
        forward_events(&facade, &mut events, writer).await?;
    }

    facade.clear_delegate();
    Ok(())
}

/// Write every delegate event raised so far.
///
/// Delegate hooks run on the main queue after the completion that answered
/// the command, so the queue is drained first.
async fn forward_events<W: AsyncWrite + Unpin>(
    facade: &ReminderFacade,
    events: &mut mpsc::UnboundedReceiver<EventEnvelope>,
    writer: &mut W,
) -> Result<()> {
    let (tx, rx) = oneshot::channel();
    if facade.main_queue().submit(move || {
        let _ = tx.send(());
    }) {
        let _ = rx.await;
    }

    while let Ok(event) = events.try_recv() {
        write_json(writer, &event).await?;
    }
    Ok(())
}

async fn write_json<W: AsyncWrite + Unpin, T: Serialize>(writer: &mut W, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)
        .map_err(|e| ReminderError::Host(format!("failed to serialize envelope: {e}")))?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
