//! Server driver.
//!
//! Ties together the connection registry, the game registry, and the
//! message surface. The driver is sans-IO: it consumes [`ServerEvent`]s
//! and produces [`ServerAction`]s for the runtime to execute, and it owns
//! every piece of mutable state, so membership enumeration, seat
//! assignment, and broadcast planning for one event happen as a single
//! atomic step.
//!
//! Per-request validation failures are not Rust errors. They become
//! `fail` response payloads addressed to the requester only; nothing here
//! is fatal to the process.

use std::{collections::HashSet, time::Duration};

use parlor_core::Environment;
use parlor_proto::{
    Frame, FrameHeader, Opcode, Payload,
    payloads::{
        Outcome,
        game::{GameOver, GameStartResponse, GameUpdate, PlayTokenResponse},
        invite::{Invited, InviteResponse, Uninvited},
        room::{ChatMessageResponse, JoinRoomResponse, PlayerDisconnected},
    },
};

use crate::{games::GameRegistry, registry::ConnectionRegistry};

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Name of the lobby room. Joining the lobby never creates a game.
    pub lobby: String,
    /// Delay between a game finishing and its record being destroyed.
    pub game_expiry: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_connections: 10_000,
            lobby: "Lobby".to_string(),
            game_expiry: Duration::from_secs(60 * 60),
        }
    }
}

/// Events that the server driver processes.
///
/// These are produced by the runtime: connection lifecycle from the
/// transport, frames from the per-stream readers, and expiry ticks from
/// the detached timers.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A new connection was accepted.
    ConnectionAccepted {
        /// Unique session id assigned by the runtime.
        session_id: u64,
    },

    /// A frame was received from a connection.
    FrameReceived {
        /// Session that sent the frame.
        session_id: u64,
        /// The received frame.
        frame: Frame,
    },

    /// A connection was closed (by peer or error).
    ConnectionClosed {
        /// Session that was closed.
        session_id: u64,
        /// Reason for closure.
        reason: String,
    },

    /// A game's post-completion expiry delay elapsed.
    GameExpired {
        /// Id of the expired game.
        game_id: String,
    },
}

/// Actions that the server driver produces.
///
/// Executed by runtime-specific code (production transport or tests).
#[derive(Debug, Clone)]
pub enum ServerAction {
    /// Send a frame to a specific session.
    SendToSession {
        /// Target session id.
        session_id: u64,
        /// Frame to send.
        frame: Frame,
    },

    /// Broadcast a frame to every current member of a room.
    BroadcastToRoom {
        /// Target room.
        room: String,
        /// Frame to broadcast.
        frame: Frame,
    },

    /// Close a connection.
    CloseConnection {
        /// Session to close.
        session_id: u64,
        /// Reason for closure.
        reason: String,
    },

    /// Arrange for a `GameExpired` event after the delay.
    ///
    /// Timers for distinct game ids are independent; the removal they
    /// trigger is idempotent, so a game reaped earlier makes the timer a
    /// no-op.
    ScheduleGameExpiry {
        /// Id of the finished game.
        game_id: String,
        /// How long to wait before expiring it.
        delay: Duration,
    },

    /// Log a message (keeps tracing out of the pure logic).
    Log {
        /// Log level.
        level: LogLevel,
        /// Message to log.
        message: String,
    },
}

/// Log levels for server actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information.
    Debug,
    /// Informational message.
    Info,
    /// Warning.
    Warn,
    /// Error.
    Error,
}

/// Errors from driver event processing.
///
/// Client mistakes never land here; they are answered with `fail`
/// responses. This is reserved for runtime/driver disagreements.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    /// A frame arrived for a session the driver does not know.
    #[error("session not found: {0}")]
    SessionNotFound(u64),
}

/// Action-based server driver.
///
/// Orchestrates room membership, the invitation handshake, game sessions,
/// and disconnect cleanup.
pub struct ServerDriver<E: Environment> {
    /// Live connections.
    connections: HashSet<u64>,
    /// Player records and room subscriptions.
    registry: ConnectionRegistry,
    /// Live games.
    games: GameRegistry,
    /// Environment (time, RNG).
    env: E,
    /// Driver configuration.
    config: DriverConfig,
}

impl<E: Environment> ServerDriver<E> {
    /// Create a new server driver.
    pub fn new(env: E, config: DriverConfig) -> Self {
        Self {
            connections: HashSet::new(),
            registry: ConnectionRegistry::new(),
            games: GameRegistry::new(),
            env,
            config,
        }
    }

    /// Process a server event and return the actions to execute.
    ///
    /// This is the driver's single entry point.
    pub fn process_event(&mut self, event: ServerEvent) -> Result<Vec<ServerAction>, DriverError> {
        match event {
            ServerEvent::ConnectionAccepted { session_id } => {
                Ok(self.handle_connection_accepted(session_id))
            },
            ServerEvent::FrameReceived { session_id, frame } => {
                self.handle_frame_received(session_id, &frame)
            },
            ServerEvent::ConnectionClosed { session_id, reason } => {
                Ok(self.handle_connection_closed(session_id, &reason))
            },
            ServerEvent::GameExpired { game_id } => Ok(self.handle_game_expired(&game_id)),
        }
    }

    fn handle_connection_accepted(&mut self, session_id: u64) -> Vec<ServerAction> {
        if self.connections.len() >= self.config.max_connections {
            return vec![ServerAction::CloseConnection {
                session_id,
                reason: "max connections exceeded".to_string(),
            }];
        }

        self.connections.insert(session_id);

        vec![ServerAction::Log {
            level: LogLevel::Debug,
            message: format!("connection accepted, session_id={session_id}"),
        }]
    }

    fn handle_frame_received(
        &mut self,
        session_id: u64,
        frame: &Frame,
    ) -> Result<Vec<ServerAction>, DriverError> {
        if !self.connections.contains(&session_id) {
            return Err(DriverError::SessionNotFound(session_id));
        }

        let Some(opcode) = frame.header.opcode_enum() else {
            return Ok(vec![ServerAction::Log {
                level: LogLevel::Warn,
                message: format!(
                    "unknown opcode {:#06x} from session {session_id}",
                    frame.header.opcode()
                ),
            }]);
        };

        let request_id = frame.header.request_id();

        let payload = match Payload::decode(opcode, &frame.payload) {
            Ok(payload) => payload,
            Err(e) => return Ok(self.reject_malformed(session_id, request_id, opcode, &e.to_string())),
        };

        let actions = match payload {
            Payload::JoinRoom(req) => self.handle_join_room(session_id, request_id, &req),
            Payload::ChatMessage(req) => self.handle_chat_message(session_id, request_id, &req),
            Payload::Invite(req) => self.handle_invite(session_id, request_id, req.requested_user),
            Payload::Uninvite(req) => {
                self.handle_uninvite(session_id, request_id, req.requested_user)
            },
            Payload::GameStart(req) => {
                self.handle_game_start(session_id, request_id, req.requested_user)
            },
            Payload::PlayToken(req) => self.handle_play_token(session_id, request_id, &req),
            other => vec![ServerAction::Log {
                level: LogLevel::Warn,
                message: format!(
                    "server-emitted opcode {:?} received from session {session_id}",
                    other.opcode()
                ),
            }],
        };

        Ok(actions)
    }

    /// Answer an undecodable request with the matching `fail` response.
    ///
    /// Only the originator hears about it; malformed input is never
    /// broadcast and has no side effects.
    fn reject_malformed(
        &self,
        session_id: u64,
        request_id: u32,
        opcode: Opcode,
        detail: &str,
    ) -> Vec<ServerAction> {
        let reason = "client did not send a valid payload";
        let response = match opcode {
            Opcode::JoinRoom => Some(Payload::JoinRoomResponse(JoinRoomResponse::fail(reason))),
            Opcode::ChatMessage => {
                Some(Payload::ChatMessageResponse(ChatMessageResponse::fail(reason)))
            },
            Opcode::Invite => Some(Payload::InviteResponse(InviteResponse::fail(reason))),
            Opcode::Uninvite => Some(Payload::Uninvited(Uninvited::fail(reason))),
            Opcode::GameStart => Some(Payload::GameStartResponse(GameStartResponse::fail(reason))),
            Opcode::PlayToken => Some(Payload::PlayTokenResponse(PlayTokenResponse::fail(reason))),
            _ => None,
        };

        let mut actions = vec![ServerAction::Log {
            level: LogLevel::Warn,
            message: format!("malformed {opcode:?} from session {session_id}: {detail}"),
        }];

        if let Some(payload) = response {
            actions.push(self.send(session_id, request_id, payload));
        }

        actions
    }

    /// Handle a `join_room` request.
    ///
    /// On success the room receives one membership-snapshot broadcast per
    /// current member, so every client rebuilds the same roster; for
    /// non-lobby rooms each member additionally triggers a full game-state
    /// push, which lazily creates the game and re-syncs late joiners.
    fn handle_join_room(
        &mut self,
        session_id: u64,
        request_id: u32,
        req: &parlor_proto::payloads::room::JoinRoom,
    ) -> Vec<ServerAction> {
        if req.room.is_empty() {
            return vec![self.send(
                session_id,
                request_id,
                Payload::JoinRoomResponse(JoinRoomResponse::fail(
                    "client did not send a valid room to join",
                )),
            )];
        }
        if req.username.is_empty() {
            return vec![self.send(
                session_id,
                request_id,
                Payload::JoinRoomResponse(JoinRoomResponse::fail(
                    "client did not send a valid username to join with",
                )),
            )];
        }

        self.registry.subscribe(session_id, req.room.clone());

        let members = self.registry.members_of(&req.room);
        if !members.contains(&session_id) {
            return vec![
                ServerAction::Log {
                    level: LogLevel::Error,
                    message: format!(
                        "session {session_id} missing from {} after subscribe",
                        req.room
                    ),
                },
                self.send(
                    session_id,
                    request_id,
                    Payload::JoinRoomResponse(JoinRoomResponse::fail(
                        "server internal error joining the room",
                    )),
                ),
            ];
        }

        self.registry.register(session_id, req.username.clone(), req.room.clone());

        let count = members.len() as u32;
        let roster: Vec<(u64, String, String)> = members
            .iter()
            .filter_map(|id| {
                self.registry.lookup(*id).map(|p| (*id, p.username.clone(), p.room.clone()))
            })
            .collect();

        let mut actions = vec![ServerAction::Log {
            level: LogLevel::Info,
            message: format!(
                "session {session_id} joined {} as '{}' ({count} present)",
                req.room, req.username
            ),
        }];

        for (member, username, room) in roster {
            actions.push(self.broadcast(
                &req.room,
                Payload::JoinRoomResponse(JoinRoomResponse::member(room, username, count, member)),
            ));

            if req.room != self.config.lobby {
                actions.extend(self.push_game_state(&req.room, "initial update"));
            }
        }

        actions
    }

    /// Handle a `send_chat_message` request.
    ///
    /// The sender's presence in the named room is deliberately not
    /// checked; the relay is fire-and-forget.
    fn handle_chat_message(
        &mut self,
        session_id: u64,
        request_id: u32,
        req: &parlor_proto::payloads::room::ChatMessage,
    ) -> Vec<ServerAction> {
        if req.room.is_empty() {
            return vec![self.send(
                session_id,
                request_id,
                Payload::ChatMessageResponse(ChatMessageResponse::fail(
                    "client did not send a valid room to message",
                )),
            )];
        }
        if req.username.is_empty() {
            return vec![self.send(
                session_id,
                request_id,
                Payload::ChatMessageResponse(ChatMessageResponse::fail(
                    "client did not send a valid username as a message source",
                )),
            )];
        }

        vec![
            ServerAction::Log {
                level: LogLevel::Debug,
                message: format!("chat from '{}' to {}", req.username, req.room),
            },
            self.broadcast(
                &req.room,
                Payload::ChatMessageResponse(ChatMessageResponse::relayed(
                    req.username.clone(),
                    req.room.clone(),
                    req.message.clone(),
                )),
            ),
        ]
    }

    /// Look up the requester of a point-to-point handshake and confirm
    /// the target is currently enumerated in the requester's room.
    ///
    /// Returns the requester's room on success, or the failure message to
    /// relay back.
    fn validate_handshake(&self, session_id: u64, target: u64) -> Result<String, &'static str> {
        let Some(player) = self.registry.lookup(session_id) else {
            return Err("sender has no registered room or username");
        };

        if target == 0 {
            return Err("client did not name a player");
        }

        if !self.registry.is_member(target, &player.room) {
            return Err("the requested player is no longer in the room");
        }

        Ok(player.room.clone())
    }

    /// Handle an `invite` request.
    fn handle_invite(&mut self, session_id: u64, request_id: u32, target: u64) -> Vec<ServerAction> {
        match self.validate_handshake(session_id, target) {
            Err(reason) => vec![self.send(
                session_id,
                request_id,
                Payload::InviteResponse(InviteResponse::fail(reason)),
            )],
            Ok(room) => vec![
                ServerAction::Log {
                    level: LogLevel::Info,
                    message: format!("session {session_id} invited {target} in {room}"),
                },
                self.send(session_id, request_id, Payload::InviteResponse(InviteResponse::ok(target))),
                self.send(target, 0, Payload::Invited(Invited::by(session_id))),
            ],
        }
    }

    /// Handle an `uninvite` request.
    ///
    /// Both parties receive an `uninvited` event; the requester's names
    /// the target, the target's names the requester.
    fn handle_uninvite(
        &mut self,
        session_id: u64,
        request_id: u32,
        target: u64,
    ) -> Vec<ServerAction> {
        match self.validate_handshake(session_id, target) {
            Err(reason) => {
                vec![self.send(session_id, request_id, Payload::Uninvited(Uninvited::fail(reason)))]
            },
            Ok(room) => vec![
                ServerAction::Log {
                    level: LogLevel::Info,
                    message: format!("session {session_id} uninvited {target} in {room}"),
                },
                self.send(session_id, request_id, Payload::Uninvited(Uninvited::ok(target))),
                self.send(target, 0, Payload::Uninvited(Uninvited::ok(session_id))),
            ],
        }
    }

    /// Handle a `game_start` request.
    ///
    /// Mints a game id unique among live games and notifies both parties
    /// with the identical payload. No game record is created and neither
    /// session is moved: creation is deferred to the first state push for
    /// the new room, and the client must follow up with a `join_room`
    /// where room == game_id.
    fn handle_game_start(
        &mut self,
        session_id: u64,
        request_id: u32,
        target: u64,
    ) -> Vec<ServerAction> {
        match self.validate_handshake(session_id, target) {
            Err(reason) => vec![self.send(
                session_id,
                request_id,
                Payload::GameStartResponse(GameStartResponse::fail(reason)),
            )],
            Ok(room) => {
                let game_id = self.games.mint_id(&self.env);
                let response = GameStartResponse::ok(game_id.clone(), target);

                vec![
                    ServerAction::Log {
                        level: LogLevel::Info,
                        message: format!(
                            "session {session_id} engaged {target} in {room}, game {game_id}"
                        ),
                    },
                    self.send(
                        session_id,
                        request_id,
                        Payload::GameStartResponse(response.clone()),
                    ),
                    self.send(target, 0, Payload::GameStartResponse(response)),
                ]
            },
        }
    }

    /// Handle a `play_token` request.
    ///
    /// The game is resolved from the sender's current room and must
    /// already exist. The claimed color must match the sender's seat and
    /// the cell must be an empty, in-range square; turn order is tracked
    /// but not enforced. An accepted move is acknowledged to the sender,
    /// applied, and followed by a full state push to the room.
    fn handle_play_token(
        &mut self,
        session_id: u64,
        request_id: u32,
        req: &parlor_proto::payloads::game::PlayToken,
    ) -> Vec<ServerAction> {
        let Some(player) = self.registry.lookup(session_id) else {
            return vec![self.send(
                session_id,
                request_id,
                Payload::PlayTokenResponse(PlayTokenResponse::fail(
                    "play_token came from an unregistered player",
                )),
            )];
        };
        let game_id = player.room.clone();

        let now_ms = self.env.wall_clock_ms();
        let Some(game) = self.games.get_mut(&game_id) else {
            return vec![self.send(
                session_id,
                request_id,
                Payload::PlayTokenResponse(PlayTokenResponse::fail(
                    "no game in progress for this room",
                )),
            )];
        };

        if let Err(e) =
            game.place(session_id, req.row as usize, req.column as usize, req.color, now_ms)
        {
            return vec![self.send(
                session_id,
                request_id,
                Payload::PlayTokenResponse(PlayTokenResponse::fail(e.to_string())),
            )];
        }

        let mut actions =
            vec![self.send(session_id, request_id, Payload::PlayTokenResponse(PlayTokenResponse::ok()))];
        actions.extend(self.push_game_state(&game_id, "played a token"));
        actions
    }

    /// Handle a connection being closed.
    ///
    /// Removes the player record and subscription, then announces the
    /// departure to the captured room. `count` is the total registered
    /// player population after removal, not a per-room occupancy. Game
    /// records are never reaped here; only the expiry timer removes them.
    fn handle_connection_closed(&mut self, session_id: u64, reason: &str) -> Vec<ServerAction> {
        self.connections.remove(&session_id);
        let removed = self.registry.remove(session_id);
        self.registry.unsubscribe(session_id);

        let Some(player) = removed else {
            return vec![ServerAction::Log {
                level: LogLevel::Debug,
                message: format!("connection {session_id} closed before joining: {reason}"),
            }];
        };

        let count = self.registry.player_count() as u32;

        vec![
            ServerAction::Log {
                level: LogLevel::Info,
                message: format!(
                    "session {session_id} ('{}') left {}: {reason}",
                    player.username, player.room
                ),
            },
            self.broadcast(
                &player.room.clone(),
                Payload::PlayerDisconnected(PlayerDisconnected {
                    username: player.username,
                    room: player.room,
                    count,
                    session_id,
                }),
            ),
        ]
    }

    /// Handle a game's expiry delay elapsing.
    fn handle_game_expired(&mut self, game_id: &str) -> Vec<ServerAction> {
        if self.games.remove(game_id) {
            vec![ServerAction::Log {
                level: LogLevel::Info,
                message: format!("expired game {game_id} removed"),
            }]
        } else {
            vec![ServerAction::Log {
                level: LogLevel::Debug,
                message: format!("expiry for game {game_id}: already gone"),
            }]
        }
    }

    /// Push the authoritative game state for a room.
    ///
    /// Creates the game lazily, settles seat assignment against the
    /// current membership enumeration (evicting every session beyond the
    /// two seats before the broadcast goes out), then broadcasts the full
    /// snapshot unconditionally. When the board has just filled, the
    /// terminal broadcast and the expiry timer fire, exactly once per
    /// game.
    fn push_game_state(&mut self, game_id: &str, cause: &str) -> Vec<ServerAction> {
        let now_ms = self.env.wall_clock_ms();
        let mut actions = Vec::new();

        if !self.games.contains(game_id) {
            actions.push(ServerAction::Log {
                level: LogLevel::Debug,
                message: format!("no game with id {game_id}, creating one"),
            });
        }

        let seated: Vec<(u64, String)> = self
            .registry
            .members_of(game_id)
            .into_iter()
            .filter_map(|id| self.registry.lookup(id).map(|p| (id, p.username.clone())))
            .collect();

        let game = self.games.get_or_create(game_id, now_ms);
        let evicted = game.assign_seats(&seated);
        let snapshot = game.snapshot();
        let finished_now = game.complete_if_full();

        for session_id in evicted {
            self.registry.unsubscribe(session_id);
            actions.push(ServerAction::Log {
                level: LogLevel::Info,
                message: format!("evicting session {session_id} from game {game_id}"),
            });
        }

        actions.push(self.broadcast(
            game_id,
            Payload::GameUpdate(GameUpdate {
                result: Outcome::Success,
                game_id: game_id.to_string(),
                game: snapshot.clone(),
                message: cause.to_string(),
            }),
        ));

        if finished_now {
            actions.push(ServerAction::Log {
                level: LogLevel::Info,
                message: format!("game {game_id} is over, board is full"),
            });
            actions.push(self.broadcast(
                game_id,
                Payload::GameOver(GameOver {
                    result: Outcome::Success,
                    game_id: game_id.to_string(),
                    game: snapshot,
                    who_won: "everyone".to_string(),
                }),
            ));
            actions.push(ServerAction::ScheduleGameExpiry {
                game_id: game_id.to_string(),
                delay: self.config.game_expiry,
            });
        }

        actions
    }

    /// Build a direct send action, echoing the request's correlation id.
    fn send(&self, session_id: u64, request_id: u32, payload: Payload) -> ServerAction {
        let mut header = FrameHeader::new(payload.opcode());
        header.set_request_id(request_id);

        match payload.into_frame(header) {
            Ok(frame) => ServerAction::SendToSession { session_id, frame },
            Err(e) => ServerAction::Log {
                level: LogLevel::Error,
                message: format!("failed to encode response for session {session_id}: {e}"),
            },
        }
    }

    /// Build a room broadcast action.
    fn broadcast(&self, room: &str, payload: Payload) -> ServerAction {
        let header = FrameHeader::new(payload.opcode());

        match payload.into_frame(header) {
            Ok(frame) => ServerAction::BroadcastToRoom { room: room.to_string(), frame },
            Err(e) => ServerAction::Log {
                level: LogLevel::Error,
                message: format!("failed to encode broadcast for room {room}: {e}"),
            },
        }
    }

    /// Current membership snapshot of a room.
    #[must_use]
    pub fn sessions_in_room(&self, room: &str) -> Vec<u64> {
        self.registry.members_of(room)
    }

    /// Player record for a session, if registered.
    #[must_use]
    pub fn player(&self, session_id: u64) -> Option<&crate::registry::Player> {
        self.registry.lookup(session_id)
    }

    /// Live game for an id, if any.
    #[must_use]
    pub fn game(&self, game_id: &str) -> Option<&parlor_core::Game> {
        self.games.get(game_id)
    }

    /// Number of live connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of registered players.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.registry.player_count()
    }
}

impl<E: Environment> std::fmt::Debug for ServerDriver<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerDriver")
            .field("connection_count", &self.connections.len())
            .field("player_count", &self.registry.player_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicU64, Ordering},
        },
        time::Duration,
    };

    use parlor_proto::payloads::room::JoinRoom;

    use super::*;

    #[derive(Clone)]
    struct TestEnv {
        next: Arc<AtomicU64>,
    }

    impl TestEnv {
        fn new() -> Self {
            Self { next: Arc::new(AtomicU64::new(1)) }
        }
    }

    impl Environment for TestEnv {
        fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            async {}
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            let value = self.next.fetch_add(1, Ordering::Relaxed);
            let bytes = value.to_be_bytes();
            for (i, slot) in buffer.iter_mut().enumerate() {
                *slot = bytes[i % 8];
            }
        }

        fn wall_clock_ms(&self) -> u64 {
            self.next.load(Ordering::Relaxed) * 1_000
        }
    }

    fn driver() -> ServerDriver<TestEnv> {
        ServerDriver::new(TestEnv::new(), DriverConfig::default())
    }

    fn join_frame(room: &str, username: &str) -> Frame {
        Payload::JoinRoom(JoinRoom { room: room.to_string(), username: username.to_string() })
            .into_frame(FrameHeader::new(Opcode::JoinRoom))
            .unwrap()
    }

    #[test]
    fn server_accepts_connection() {
        let mut server = driver();

        let actions =
            server.process_event(ServerEvent::ConnectionAccepted { session_id: 1 }).unwrap();

        assert_eq!(server.connection_count(), 1);
        assert!(matches!(actions[0], ServerAction::Log { level: LogLevel::Debug, .. }));
    }

    #[test]
    fn server_rejects_when_max_connections_exceeded() {
        let config = DriverConfig { max_connections: 2, ..Default::default() };
        let mut server = ServerDriver::new(TestEnv::new(), config);

        server.process_event(ServerEvent::ConnectionAccepted { session_id: 1 }).unwrap();
        server.process_event(ServerEvent::ConnectionAccepted { session_id: 2 }).unwrap();

        let actions =
            server.process_event(ServerEvent::ConnectionAccepted { session_id: 3 }).unwrap();

        assert_eq!(server.connection_count(), 2);
        assert!(matches!(actions[0], ServerAction::CloseConnection { .. }));
    }

    #[test]
    fn frame_from_unknown_session_is_an_error() {
        let mut server = driver();

        let result = server.process_event(ServerEvent::FrameReceived {
            session_id: 99,
            frame: join_frame("Lobby", "alice"),
        });

        assert_eq!(result.unwrap_err(), DriverError::SessionNotFound(99));
    }

    #[test]
    fn join_registers_player_and_subscribes() {
        let mut server = driver();
        server.process_event(ServerEvent::ConnectionAccepted { session_id: 1 }).unwrap();

        server
            .process_event(ServerEvent::FrameReceived {
                session_id: 1,
                frame: join_frame("Lobby", "alice"),
            })
            .unwrap();

        let player = server.player(1).unwrap();
        assert_eq!(player.username, "alice");
        assert_eq!(player.room, "Lobby");
        assert_eq!(server.sessions_in_room("Lobby"), vec![1]);
    }

    #[test]
    fn join_with_empty_room_fails_locally() {
        let mut server = driver();
        server.process_event(ServerEvent::ConnectionAccepted { session_id: 1 }).unwrap();

        let actions = server
            .process_event(ServerEvent::FrameReceived {
                session_id: 1,
                frame: join_frame("", "alice"),
            })
            .unwrap();

        // One direct response, no broadcast, no registration.
        assert_eq!(actions.len(), 1);
        assert!(matches!(&actions[0], ServerAction::SendToSession { session_id: 1, .. }));
        assert!(server.player(1).is_none());
    }

    #[test]
    fn connection_closed_before_join_is_quiet() {
        let mut server = driver();
        server.process_event(ServerEvent::ConnectionAccepted { session_id: 1 }).unwrap();

        let actions = server
            .process_event(ServerEvent::ConnectionClosed {
                session_id: 1,
                reason: "peer went away".to_string(),
            })
            .unwrap();

        assert_eq!(server.connection_count(), 0);
        assert!(actions.iter().all(|a| matches!(a, ServerAction::Log { .. })));
    }

    #[test]
    fn expiry_for_unknown_game_is_noop() {
        let mut server = driver();

        let actions = server
            .process_event(ServerEvent::GameExpired { game_id: "gone".to_string() })
            .unwrap();

        assert!(matches!(actions[0], ServerAction::Log { level: LogLevel::Debug, .. }));
    }
}
