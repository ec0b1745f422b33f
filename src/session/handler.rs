use chrono::Utc;
use log::{error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::sync::Mutex;

use crate::config::SharedRuntimeConfig;
use crate::protocol::responses::{SYNTAX_ERROR, format_response};
use crate::protocol::{
    CommandStatus, TransferSettings, handle_command, handle_transfer_command, parse_command,
};
use crate::session::{Session, SessionRegistry};

/// Per-connection settings taken from the server configuration.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub max_command_length: usize,
    pub download_dir: PathBuf,
    pub runtime: SharedRuntimeConfig,
}

/// Runs one session over a command stream until the client quits or
/// disconnects.
///
/// - Reads one command per line.
/// - Storage commands run synchronously against the session.
/// - Transfer commands run on the blocking pool under the runtime timeout.
///
/// The connection is removed from `registry` on exit.
pub async fn handle_session<S>(
    stream: S,
    client_addr: SocketAddr,
    mut session: Session,
    registry: Arc<Mutex<SessionRegistry>>,
    settings: ConnectionSettings,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);

    loop {
        let line = match read_command(&mut reader, settings.max_command_length).await {
            Ok(Incoming::Line(line)) => line,
            Ok(Incoming::Closed) => {
                info!("Connection closed by client {}", client_addr);
                break;
            }
            Ok(rejected) => {
                let reply = match rejected {
                    Incoming::TooLong => {
                        warn!(
                            "Command from {} exceeds {} bytes",
                            client_addr, settings.max_command_length
                        );
                        "Command too long"
                    }
                    _ => {
                        warn!("Command from {} is not valid UTF-8", client_addr);
                        "Invalid command encoding"
                    }
                };
                let reply = format_response(SYNTAX_ERROR, reply);
                if write_half.write_all(reply.as_bytes()).await.is_err() {
                    break;
                }
                continue;
            }
            Err(e) => {
                error!("Failed to read from {}: {}", client_addr, e);
                break;
            }
        };

        let command = parse_command(&line);
        info!("Received from {}: {:?}", client_addr, &command);
        registry.lock().await.record_command(&client_addr);

        let result = if command.is_transfer() {
            let transfer = TransferSettings {
                timeout: settings.runtime.read().await.transfer_timeout(),
                download_dir: settings.download_dir.clone(),
            };
            handle_transfer_command(&session, &command, &transfer).await
        } else {
            handle_command(&mut session, &command)
        };

        if let Some(msg) = &result.message {
            if let Err(e) = write_half.write_all(msg.as_bytes()).await {
                error!("Failed to write to {}: {}", client_addr, e);
                break;
            }
        }

        if result.status == CommandStatus::CloseConnection {
            info!("Client {} requested to quit", client_addr);
            break;
        }
    }

    let _ = write_half.flush().await;
    match registry.lock().await.remove(&client_addr) {
        Some(entry) => info!(
            "Client {} disconnected after {} commands ({}s)",
            client_addr,
            entry.commands,
            (Utc::now() - entry.connected_at).num_seconds()
        ),
        None => info!("Client {} disconnected", client_addr),
    }
}

/// One line read from the command stream.
enum Incoming {
    Line(String),
    TooLong,
    NotUtf8,
    Closed,
}

/// Reads one command line, never buffering more than `max_len` bytes plus
/// the line terminator. The rest of an oversized line is skipped.
async fn read_command<R>(reader: &mut R, max_len: usize) -> io::Result<Incoming>
where
    R: AsyncBufRead + Unpin,
{
    let limit = max_len as u64 + 2;
    let mut buf = Vec::new();
    let read = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;
    if read == 0 {
        return Ok(Incoming::Closed);
    }

    if buf.last() != Some(&b'\n') && read as u64 == limit {
        discard_line(reader).await?;
        return Ok(Incoming::TooLong);
    }

    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    if buf.len() > max_len {
        return Ok(Incoming::TooLong);
    }

    Ok(String::from_utf8(buf).map_or(Incoming::NotUtf8, Incoming::Line))
}

async fn discard_line<R>(reader: &mut R) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                return Ok(());
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}
