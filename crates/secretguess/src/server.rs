//! `Server` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → room registry.

use std::sync::Arc;
use std::time::Duration;

use secretguess_protocol::{Codec, JsonCodec};
use secretguess_room::{RoomConfig, RoomRegistry};
use secretguess_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{SecretGuessError, ServerConfig};

/// Shared state handed to every connection task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: RoomRegistry,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a server.
///
/// ```rust,no_run
/// # async fn run() -> Result<(), secretguess::SecretGuessError> {
/// use secretguess::ServerBuilder;
///
/// let server = ServerBuilder::new().bind("0.0.0.0:3000").build().await?;
/// server.run().await
/// # }
/// ```
pub struct ServerBuilder {
    config: ServerConfig,
}

impl ServerBuilder {
    /// A builder with default settings.
    pub fn new() -> Self {
        Self::from_config(ServerConfig::default())
    }

    /// A builder seeded from an existing configuration.
    pub fn from_config(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Sets the address to listen on.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind = addr.to_string();
        self
    }

    /// Sets the configuration every room is spawned with.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    /// Sets how long a silent, unattached connection is kept open.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Binds the listener. Uses `JsonCodec` over `WebSocketTransport`.
    pub async fn build(self) -> Result<Server<JsonCodec>, SecretGuessError> {
        let transport = WebSocketTransport::bind(&self.config.bind).await?;

        let state = Arc::new(ServerState {
            registry: RoomRegistry::new(self.config.room.clone()),
            codec: JsonCodec,
            config: self.config,
        });

        Ok(Server { transport, state })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound server. Call [`run()`](Self::run) to start accepting players.
pub struct Server<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl Server<JsonCodec> {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }
}

impl<C: Codec> Server<C> {
    /// The address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The registry shared by every connection.
    pub fn registry(&self) -> RoomRegistry {
        self.state.registry.clone()
    }

    /// Accepts connections and spawns a handler task for each, forever.
    pub async fn run(mut self) -> Result<(), SecretGuessError> {
        tracing::info!(bind = %self.state.config.bind, "SecretGuess server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
