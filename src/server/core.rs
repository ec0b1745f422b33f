use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::config::{SharedRuntimeConfig, StartupConfig};
use crate::error::ServiceError;
use crate::protocol::responses::{READY, SERVICE_UNAVAILABLE, format_response};
use crate::session::{ConnectionSettings, Session, SessionRegistry, handle_session};
use crate::storage::SharedStorage;
use crate::transfer::TransferGateway;

pub struct Server {
    session_registry: Arc<Mutex<SessionRegistry>>,
    storage: SharedStorage,
    gateway: Arc<dyn TransferGateway>,
    listener: TcpListener,
    settings: ConnectionSettings,
}

impl Server {
    /// Bind the command listener. Every accepted connection gets its own
    /// session over `storage`.
    pub async fn new(
        startup: &StartupConfig,
        runtime: SharedRuntimeConfig,
        storage: SharedStorage,
        gateway: Arc<dyn TransferGateway>,
    ) -> Result<Self, ServiceError> {
        let socket = startup.command_socket();
        let listener = TcpListener::bind(&socket).await.inspect_err(|e| {
            error!("Failed to bind to {}: {}", socket, e);
        })?;
        info!("Server bound to {}", listener.local_addr()?);

        Ok(Self {
            session_registry: Arc::new(Mutex::new(SessionRegistry::new())),
            storage,
            gateway,
            listener,
            settings: ConnectionSettings {
                max_command_length: startup.max_command_length,
                download_dir: startup.download_dir_path(),
                runtime,
            },
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServiceError> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn start(&self) {
        info!(
            "Starting RAX storage server (max {} sessions)",
            self.settings.runtime.read().await.max_sessions
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let registry = Arc::clone(&self.session_registry);
                    let session = Session::new(Arc::clone(&self.storage), Arc::clone(&self.gateway));
                    let settings = self.settings.clone();

                    // Spawn a task for each client so accept loop doesn't block
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_new_client(stream, addr, session, registry, settings).await
                        {
                            warn!("Failed to handle client {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }
}

/// Greets a new client, registers it, and hands off to the session loop.
///
/// A client whose greeting cannot be delivered gives its slot back.
async fn handle_new_client<S>(
    mut stream: S,
    client_addr: SocketAddr,
    session: Session,
    registry: Arc<Mutex<SessionRegistry>>,
    settings: ConnectionSettings,
) -> Result<(), std::io::Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let limit = settings.runtime.read().await.max_sessions;

    let registered = {
        let mut sessions = registry.lock().await;
        let registered = sessions.try_register(client_addr, limit);
        if registered {
            info!(
                "Session opened for {} ({}/{} sessions)",
                client_addr,
                sessions.len(),
                limit
            );
        }
        registered
    };

    if !registered {
        warn!("Refusing {}: session limit {} reached", client_addr, limit);
        stream
            .write_all(format_response(SERVICE_UNAVAILABLE, "Too many sessions. Try again later.").as_bytes())
            .await?;
        return Ok(());
    }

    if let Err(e) = greet(&mut stream).await {
        registry.lock().await.remove(&client_addr);
        return Err(e);
    }

    handle_session(stream, client_addr, session, registry, settings).await;
    Ok(())
}

async fn greet<S: AsyncWrite + Unpin>(stream: &mut S) -> Result<(), std::io::Error> {
    stream
        .write_all(format_response(READY, "RAX storage ready").as_bytes())
        .await?;
    stream.flush().await
}
