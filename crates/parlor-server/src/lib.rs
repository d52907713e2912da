//! Parlor production server.
//!
//! Coordinates real-time two-player board-game sessions: named rooms with
//! membership snapshots, a point-to-point invitation handshake, lazily
//! created server-authoritative games with two colored seats, move relay,
//! and disconnect cleanup.
//!
//! # Architecture
//!
//! The [`ServerDriver`] follows the sans-IO pattern: it owns every
//! registry, consumes [`ServerEvent`]s, and produces [`ServerAction`]s
//! without touching the network. [`Server`] is the production glue that
//! executes those actions over Quinn QUIC with Tokio, and [`SystemEnv`]
//! supplies real time and cryptographic randomness.
//!
//! All driver state sits behind a single async mutex, so enumeration,
//! seat assignment, and broadcast planning for one event are one atomic
//! step; there is no window in which two joins can observe each other's
//! half-applied state.

use std::{collections::HashMap, sync::Arc, time::Duration};

use bytes::BytesMut;
use parlor_core::Environment;
use parlor_proto::{Frame, FrameHeader};
use tokio::sync::RwLock;

mod driver;
mod error;
mod games;
mod registry;
mod system_env;
mod transport;

pub use driver::{
    DriverConfig, DriverError, LogLevel, ServerAction, ServerDriver, ServerEvent,
};
pub use error::ServerError;
pub use games::GameRegistry;
pub use registry::{ConnectionRegistry, Player};
pub use system_env::SystemEnv;
pub use transport::{QuinnConnection, QuinnTransport};

/// Driver handle shared between connection tasks and expiry timers.
type SharedDriver = Arc<tokio::sync::Mutex<ServerDriver<SystemEnv>>>;

/// Shared state for all connections.
///
/// Holds connection and stream maps for message routing.
struct SharedState {
    /// Map of session id to QUIC connection (for closing).
    connections: RwLock<HashMap<u64, QuinnConnection>>,
    /// Map of session id to persistent outbound stream. All messages to a
    /// client go through this single stream, ensuring ordering.
    outbound_streams: RwLock<HashMap<u64, tokio::sync::Mutex<quinn::SendStream>>>,
}

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:4433").
    pub bind_address: String,
    /// Path to TLS certificate (PEM format).
    pub cert_path: Option<String>,
    /// Path to TLS private key (PEM format).
    pub key_path: Option<String>,
    /// Driver configuration (limits, lobby name, expiry delay).
    pub driver: DriverConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4433".to_string(),
            cert_path: None,
            key_path: None,
            driver: DriverConfig::default(),
        }
    }
}

/// Production parlor server.
///
/// Wraps [`ServerDriver`] with Quinn QUIC transport and the system
/// environment.
pub struct Server {
    /// The action-based server driver.
    driver: ServerDriver<SystemEnv>,
    /// QUIC endpoint.
    transport: QuinnTransport,
    /// Environment.
    env: SystemEnv,
}

impl Server {
    /// Create and bind a new server.
    pub fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        let env = SystemEnv::new();
        let driver = ServerDriver::new(env.clone(), config.driver);

        let transport =
            QuinnTransport::bind(&config.bind_address, config.cert_path, config.key_path)?;

        Ok(Self { driver, transport, env })
    }

    /// Run the server, accepting connections and processing frames.
    ///
    /// Runs until the endpoint is closed or an accept error occurs.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Server starting on {}", self.transport.local_addr()?);

        let env = self.env;
        let driver: SharedDriver = Arc::new(tokio::sync::Mutex::new(self.driver));
        let shared = Arc::new(SharedState {
            connections: RwLock::new(HashMap::new()),
            outbound_streams: RwLock::new(HashMap::new()),
        });

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let driver = Arc::clone(&driver);
                    let shared = Arc::clone(&shared);
                    let env = env.clone();

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, driver, shared, env).await {
                            tracing::error!("Connection error: {}", e);
                        }
                    });
                },
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                },
            }
        }
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ServerError> {
        self.transport.local_addr()
    }
}

/// Mint a nonzero session id.
///
/// Zero is the "absent" sentinel in handshake payloads, so it is never
/// handed to a connection.
fn mint_session_id(env: &SystemEnv) -> u64 {
    loop {
        let id = env.random_u64();
        if id != 0 {
            return id;
        }
    }
}

/// Handle a single QUIC connection.
async fn handle_connection(
    conn: QuinnConnection,
    driver: SharedDriver,
    shared: Arc<SharedState>,
    env: SystemEnv,
) -> Result<(), ServerError> {
    let session_id = mint_session_id(&env);

    tracing::debug!("New connection: {}", session_id);

    let outbound_stream = conn
        .open_uni()
        .await
        .map_err(|e| ServerError::Internal(format!("failed to open outbound stream: {e}")))?;

    {
        let mut connections = shared.connections.write().await;
        connections.insert(session_id, conn.clone());
    }

    {
        let mut streams = shared.outbound_streams.write().await;
        streams.insert(session_id, tokio::sync::Mutex::new(outbound_stream));
    }

    {
        let mut driver_guard = driver.lock().await;
        let actions = driver_guard.process_event(ServerEvent::ConnectionAccepted { session_id })?;
        execute_actions(&mut driver_guard, actions, &shared, &driver, &env).await;
    }

    loop {
        match conn.accept_bi().await {
            Ok((send, recv)) => {
                let driver = Arc::clone(&driver);
                let shared = Arc::clone(&shared);
                let env = env.clone();

                tokio::spawn(async move {
                    if let Err(e) =
                        handle_stream(session_id, send, recv, driver, shared, env).await
                    {
                        tracing::debug!("Stream error: {}", e);
                    }
                });
            },
            Err(e) => {
                tracing::debug!("Connection closed: {}", e);
                break;
            },
        }
    }

    {
        let mut connections = shared.connections.write().await;
        connections.remove(&session_id);
    }

    {
        let mut streams = shared.outbound_streams.write().await;
        streams.remove(&session_id);
    }

    {
        let mut driver_guard = driver.lock().await;
        let actions = driver_guard.process_event(ServerEvent::ConnectionClosed {
            session_id,
            reason: "connection closed".to_string(),
        })?;
        execute_actions(&mut driver_guard, actions, &shared, &driver, &env).await;
    }

    Ok(())
}

/// Handle a single bidirectional stream.
async fn handle_stream(
    session_id: u64,
    send: quinn::SendStream,
    mut recv: quinn::RecvStream,
    driver: SharedDriver,
    shared: Arc<SharedState>,
    env: SystemEnv,
) -> Result<(), ServerError> {
    drop(send); // responses go over the persistent outbound stream

    let mut buf = BytesMut::with_capacity(4096);

    loop {
        buf.clear();
        buf.resize(FrameHeader::SIZE, 0);

        match recv.read_exact(&mut buf[..FrameHeader::SIZE]).await {
            Ok(()) => {},
            Err(e) => {
                tracing::debug!("Read error: {}", e);
                break;
            },
        }

        let payload_size = match FrameHeader::from_bytes(&buf[..FrameHeader::SIZE]) {
            Ok(header) => header.payload_size() as usize,
            Err(e) => {
                tracing::warn!("Invalid frame header: {}", e);
                break;
            },
        };

        if payload_size > 0 {
            buf.resize(FrameHeader::SIZE + payload_size, 0);
            if let Err(e) = recv.read_exact(&mut buf[FrameHeader::SIZE..]).await {
                tracing::debug!("Payload read error: {}", e);
                break;
            }
        }

        let frame = match Frame::decode(&buf) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Frame decode error: {}", e);
                break;
            },
        };

        let mut driver_guard = driver.lock().await;
        match driver_guard.process_event(ServerEvent::FrameReceived { session_id, frame }) {
            Ok(actions) => {
                execute_actions(&mut driver_guard, actions, &shared, &driver, &env).await;
            },
            Err(e) => {
                tracing::warn!("Frame processing error: {}", e);
            },
        }
    }

    Ok(())
}

/// Execute server actions.
///
/// `driver_handle` is the same driver the caller holds locked; it is only
/// captured by expiry timer tasks, which lock it long after the current
/// guard is released.
async fn execute_actions(
    driver: &mut ServerDriver<SystemEnv>,
    actions: Vec<ServerAction>,
    shared: &Arc<SharedState>,
    driver_handle: &SharedDriver,
    env: &SystemEnv,
) {
    for action in actions {
        match action {
            ServerAction::SendToSession { session_id, frame } => {
                send_frame(shared, session_id, &frame).await;
            },

            ServerAction::BroadcastToRoom { room, frame } => {
                let sessions = driver.sessions_in_room(&room);
                for session_id in sessions {
                    send_frame(shared, session_id, &frame).await;
                }
            },

            ServerAction::CloseConnection { session_id, reason } => {
                tracing::info!("Closing connection {}: {}", session_id, reason);
                let mut connections = shared.connections.write().await;
                if let Some(conn) = connections.remove(&session_id) {
                    conn.close(0u32.into(), reason.as_bytes());
                }
            },

            ServerAction::ScheduleGameExpiry { game_id, delay } => {
                spawn_expiry_timer(
                    Arc::clone(driver_handle),
                    env.clone(),
                    game_id,
                    delay,
                );
            },

            ServerAction::Log { level, message } => emit_log(level, &message),
        }
    }
}

/// Write one frame to a session's outbound stream.
///
/// Send failures are logged and dropped; the client owns reconnection.
async fn send_frame(shared: &Arc<SharedState>, session_id: u64, frame: &Frame) {
    let mut buf = Vec::new();
    if let Err(e) = frame.encode(&mut buf) {
        tracing::error!("Failed to encode frame for {}: {}", session_id, e);
        return;
    }

    let streams = shared.outbound_streams.read().await;
    if let Some(stream_mutex) = streams.get(&session_id) {
        let mut stream = stream_mutex.lock().await;
        if let Err(e) = stream.write_all(&buf).await {
            tracing::warn!("Send failed for {}: {}", session_id, e);
        }
    } else {
        tracing::debug!("Send: session {} not connected", session_id);
    }
}

/// Start the detached post-completion timer for one game.
///
/// Timers for distinct game ids are independent. Expiry produces only
/// log actions (removal is internal to the driver), so the timer task
/// does not need the stream maps.
fn spawn_expiry_timer(driver: SharedDriver, env: SystemEnv, game_id: String, delay: Duration) {
    tokio::spawn(async move {
        env.sleep(delay).await;

        let mut driver = driver.lock().await;
        match driver.process_event(ServerEvent::GameExpired { game_id }) {
            Ok(actions) => {
                for action in actions {
                    if let ServerAction::Log { level, message } = action {
                        emit_log(level, &message);
                    }
                }
            },
            Err(e) => tracing::warn!("Expiry processing error: {}", e),
        }
    });
}

/// Forward a driver log action to tracing.
fn emit_log(level: LogLevel, message: &str) {
    match level {
        LogLevel::Debug => tracing::debug!("{}", message),
        LogLevel::Info => tracing::info!("{}", message),
        LogLevel::Warn => tracing::warn!("{}", message),
        LogLevel::Error => tracing::error!("{}", message),
    }
}
