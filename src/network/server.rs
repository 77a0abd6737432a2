//! WebSocket Game Server
//!
//! Async WebSocket server for lobby and game traffic.
//! Each connection gets a reader loop and a writer task; all game logic
//! goes through the lobby's session under that lobby's lock.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::interval;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use tracing::{debug, error, info, instrument, warn};

use crate::game::error::ActionError;
use crate::game::session::{GameConfig, GameSession};
use crate::network::lobby::{parse_lobby_id, LobbyArena, LobbyError, LobbyId};
use crate::network::protocol::{ClientMessage, ErrorCode, ServerMessage};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Maximum concurrent lobbies.
    pub max_lobbies: usize,
    /// Token required for admin force-end. Disabled when `None`.
    pub admin_token: Option<String>,
    /// How often the arena is swept.
    pub cleanup_interval: Duration,
    /// How long a finished lobby lingers before it is reaped.
    pub finished_linger: Duration,
    /// Rules for new lobbies.
    pub game: GameConfig,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            max_lobbies: 200,
            admin_token: None,
            cleanup_interval: Duration::from_secs(60),
            finished_linger: Duration::from_secs(300),
            game: GameConfig::default(),
            version: crate::VERSION.to_string(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `CLUEDO_*` environment variables.
    pub fn from_env() -> Result<Self, GameServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GameServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("CLUEDO_BIND_ADDR") {
            config.bind_addr = parse_setting("CLUEDO_BIND_ADDR", &value)?;
        }
        if let Some(value) = lookup("CLUEDO_MAX_CONNECTIONS") {
            config.max_connections = parse_setting("CLUEDO_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = lookup("CLUEDO_MAX_LOBBIES") {
            config.max_lobbies = parse_setting("CLUEDO_MAX_LOBBIES", &value)?;
        }
        config.admin_token = lookup("CLUEDO_ADMIN_TOKEN").filter(|t| !t.is_empty());

        Ok(config)
    }
}

fn parse_setting<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, GameServerError> {
    value.trim().parse().map_err(|_| GameServerError::InvalidSetting {
        key,
        value: value.to_string(),
    })
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Environment setting could not be parsed.
    #[error("Invalid value for {key}: {value:?}")]
    InvalidSetting {
        /// Variable name
        key: &'static str,
        /// Raw value
        value: String,
    },

    /// Lobby error.
    #[error("Lobby error: {0}")]
    Lobby(#[from] LobbyError),
}

/// Connected client state.
struct ConnectedClient {
    /// Lobby and member name, once joined.
    membership: Option<(LobbyId, String)>,
    /// Message sender (for direct messaging to client).
    sender: mpsc::Sender<ServerMessage>,
}

fn server_time_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// 32 bytes of start-of-game entropy.
fn fresh_entropy() -> [u8; 32] {
    let mut entropy = [0u8; 32];
    rand::thread_rng().fill(&mut entropy);
    entropy
}

// =============================================================================
// SHARED STATE AND DISPATCH
// =============================================================================

/// State shared by every connection task.
pub struct ServerState {
    config: ServerConfig,
    arena: LobbyArena,
    clients: RwLock<BTreeMap<SocketAddr, ConnectedClient>>,
}

impl ServerState {
    /// Create empty state.
    pub fn new(config: ServerConfig) -> Self {
        let arena = LobbyArena::new(config.game.clone(), config.max_lobbies);
        Self {
            config,
            arena,
            clients: RwLock::new(BTreeMap::new()),
        }
    }

    /// The lobby arena.
    pub fn arena(&self) -> &LobbyArena {
        &self.arena
    }

    /// Register a connection. Returns false at the connection limit.
    pub async fn connect(&self, addr: SocketAddr, sender: mpsc::Sender<ServerMessage>) -> bool {
        let mut clients = self.clients.write().await;
        if clients.len() >= self.config.max_connections {
            return false;
        }
        clients.insert(addr, ConnectedClient {
            membership: None,
            sender,
        });
        true
    }

    /// Drop a connection, forfeiting or leaving its lobby.
    pub async fn disconnect(&self, addr: SocketAddr) {
        self.leave_lobby(addr).await;
        self.clients.write().await.remove(&addr);
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    async fn membership(&self, addr: SocketAddr) -> Option<(LobbyId, String)> {
        let clients = self.clients.read().await;
        clients.get(&addr).and_then(|c| c.membership.clone())
    }

    async fn set_membership(&self, addr: SocketAddr, membership: Option<(LobbyId, String)>) {
        let mut clients = self.clients.write().await;
        if let Some(client) = clients.get_mut(&addr) {
            client.membership = membership;
        }
    }

    /// Dispatch one client message.
    pub async fn handle_message(&self, addr: SocketAddr, msg: ClientMessage) {
        let sender = {
            let clients = self.clients.read().await;
            match clients.get(&addr) {
                Some(client) => client.sender.clone(),
                None => return,
            }
        };

        match msg {
            ClientMessage::CreateLobby { player_name } => {
                self.handle_create(addr, &player_name, &sender).await;
            }
            ClientMessage::JoinLobby { lobby_id, player_name } => {
                self.handle_join(addr, &lobby_id, &player_name, &sender).await;
            }
            ClientMessage::ListLobbies => {
                let lobbies = self.arena.list().await;
                let _ = sender.send(ServerMessage::LobbyList { lobbies }).await;
            }
            ClientMessage::StartGame => {
                self.handle_start(addr, &sender).await;
            }
            ClientMessage::RollDice => {
                self.game_action(addr, &sender, |game, actor| game.roll_dice(actor).map(|_| ()))
                    .await;
            }
            ClientMessage::Move { steps } => {
                self.game_action(addr, &sender, |game, actor| {
                    game.move_player(actor, &steps[..]).map(|_| ())
                })
                .await;
            }
            ClientMessage::Suggest { suspect, weapon } => {
                self.game_action(addr, &sender, |game, actor| {
                    game.suggest(actor, &suspect, &weapon).map(|_| ())
                })
                .await;
            }
            ClientMessage::Accuse { suspect, weapon, room } => {
                self.game_action(addr, &sender, |game, actor| {
                    game.accuse(actor, &suspect, &weapon, &room).map(|_| ())
                })
                .await;
            }
            ClientMessage::EndTurn => {
                self.game_action(addr, &sender, |game, actor| game.end_turn(actor)).await;
            }
            ClientMessage::ReportCheating { suspect } => {
                self.game_action(addr, &sender, |game, actor| {
                    game.report_cheating(actor, &suspect).map(|_| ())
                })
                .await;
            }
            ClientMessage::ForceEnd { token } => {
                let authorized = self
                    .config
                    .admin_token
                    .as_deref()
                    .is_some_and(|expected| expected == token);
                if !authorized {
                    warn!("Rejected force-end from {}", addr);
                    let _ = sender
                        .send(ServerMessage::error(ErrorCode::Unauthorized, "Invalid admin token"))
                        .await;
                    return;
                }
                self.game_action(addr, &sender, |game, _| game.force_end()).await;
            }
            ClientMessage::SyncRequest => {
                self.handle_sync(addr, &sender).await;
            }
            ClientMessage::Ping { timestamp } => {
                let _ = sender
                    .send(ServerMessage::Pong {
                        timestamp,
                        server_time: server_time_ms(),
                    })
                    .await;
            }
            ClientMessage::Leave => {
                self.leave_lobby(addr).await;
            }
        }
    }

    async fn handle_create(&self, addr: SocketAddr, name: &str, sender: &mpsc::Sender<ServerMessage>) {
        if self.membership(addr).await.is_some() {
            let _ = sender
                .send(ServerMessage::error(ErrorCode::AlreadyInLobby, "Already in a lobby"))
                .await;
            return;
        }

        let (lobby_id, lobby) = match self.arena.create_lobby(name, sender.clone()).await {
            Ok(created) => created,
            Err(err) => {
                let _ = sender.send(ServerMessage::error(err.code(), err.to_string())).await;
                return;
            }
        };

        let mut lobby = lobby.write().await;
        info!(lobby = %lobby.id_hex(), host = name.trim(), "lobby created");
        self.set_membership(addr, Some((lobby_id, name.trim().to_string()))).await;
        lobby.broadcast(ServerMessage::Lobby(lobby.info())).await;
        lobby.flush_events().await;
    }

    async fn handle_join(
        &self,
        addr: SocketAddr,
        lobby_id: &str,
        name: &str,
        sender: &mpsc::Sender<ServerMessage>,
    ) {
        if self.membership(addr).await.is_some() {
            let _ = sender
                .send(ServerMessage::error(ErrorCode::AlreadyInLobby, "Already in a lobby"))
                .await;
            return;
        }
        let Some(id) = parse_lobby_id(lobby_id) else {
            let _ = sender
                .send(ServerMessage::error(ErrorCode::InvalidInput, "Malformed lobby id"))
                .await;
            return;
        };
        let Some(lobby) = self.arena.get(&id).await else {
            let _ = sender
                .send(ServerMessage::error(ErrorCode::LobbyNotFound, LobbyError::NotFound.to_string()))
                .await;
            return;
        };

        let mut lobby = lobby.write().await;
        if let Err(err) = lobby.add_member(name, sender.clone()) {
            debug!("Join rejected for {}: {}", addr, err);
            let _ = sender.send(ServerMessage::error(err.code(), err.to_string())).await;
            return;
        }

        self.set_membership(addr, Some((id, name.trim().to_string()))).await;
        lobby.broadcast(ServerMessage::Lobby(lobby.info())).await;
        lobby.flush_events().await;
    }

    async fn handle_start(&self, addr: SocketAddr, sender: &mpsc::Sender<ServerMessage>) {
        let Some((lobby_id, name)) = self.membership(addr).await else {
            let _ = sender
                .send(ServerMessage::error(ErrorCode::NotInLobby, "Not in a lobby"))
                .await;
            return;
        };
        let Some(lobby) = self.arena.get(&lobby_id).await else {
            let _ = sender
                .send(ServerMessage::error(ErrorCode::LobbyNotFound, LobbyError::NotFound.to_string()))
                .await;
            return;
        };

        let mut lobby = lobby.write().await;
        match lobby.start(&name, &fresh_entropy()) {
            Ok(()) => {
                lobby.announce_start().await;
                lobby.flush_events().await;
            }
            Err(err) => {
                debug!("Start rejected for {}: {}", name, err);
                let _ = sender.send(ServerMessage::error(err.code(), err.to_string())).await;
            }
        }
    }

    async fn handle_sync(&self, addr: SocketAddr, sender: &mpsc::Sender<ServerMessage>) {
        let Some((lobby_id, name)) = self.membership(addr).await else {
            let _ = sender
                .send(ServerMessage::error(ErrorCode::NotInLobby, "Not in a lobby"))
                .await;
            return;
        };
        if let Some(lobby) = self.arena.get(&lobby_id).await {
            let lobby = lobby.read().await;
            let _ = sender.send(lobby.sync_for(&name)).await;
        }
    }

    /// Run one game action under the lobby lock and deliver its events.
    ///
    /// A rejected action sends an error to `sender` only.
    async fn game_action<F>(&self, addr: SocketAddr, sender: &mpsc::Sender<ServerMessage>, action: F)
    where
        F: FnOnce(&mut GameSession, &str) -> Result<(), ActionError>,
    {
        let Some((lobby_id, name)) = self.membership(addr).await else {
            let _ = sender
                .send(ServerMessage::error(ErrorCode::NotInLobby, "Not in a lobby"))
                .await;
            return;
        };
        let Some(lobby) = self.arena.get(&lobby_id).await else {
            let _ = sender
                .send(ServerMessage::error(ErrorCode::LobbyNotFound, LobbyError::NotFound.to_string()))
                .await;
            return;
        };

        let mut lobby = lobby.write().await;
        match action(lobby.session_mut(), &name) {
            Ok(()) => {
                lobby.flush_events().await;
            }
            Err(err) => {
                debug!("Action by {} rejected: {}", name, err);
                let _ = sender
                    .send(ServerMessage::error(err.kind().into(), err.to_string()))
                    .await;
            }
        }
    }

    async fn leave_lobby(&self, addr: SocketAddr) {
        let Some((lobby_id, name)) = self.membership(addr).await else {
            return;
        };
        self.set_membership(addr, None).await;

        let Some(lobby) = self.arena.get(&lobby_id).await else {
            return;
        };
        let now_empty = {
            let mut lobby = lobby.write().await;
            if let Err(err) = lobby.remove_member(&name) {
                warn!("Leave failed for {}: {}", name, err);
            }
            lobby.broadcast(ServerMessage::Lobby(lobby.info())).await;
            lobby.flush_events().await;
            lobby.is_empty()
        };

        if now_empty {
            self.arena.remove(&lobby_id).await;
            debug!(lobby = %hex::encode(lobby_id), "empty lobby removed");
        }
    }

    /// Sweep finished and empty lobbies.
    pub async fn cleanup(&self) -> usize {
        self.arena.cleanup(self.config.finished_linger).await
    }
}

// =============================================================================
// SERVER
// =============================================================================

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Shared connection and lobby state.
    state: Arc<ServerState>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            state: Arc::new(ServerState::new(config.clone())),
            config,
            shutdown_tx,
        }
    }

    /// Run the server.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Game server listening on {}", self.config.bind_addr);

        let cleanup_state = self.state.clone();
        let cleanup_every = self.config.cleanup_interval;
        let cleanup_handle = tokio::spawn(async move {
            Self::run_cleanup_loop(cleanup_state, cleanup_every).await;
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        cleanup_handle.abort();

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let state = self.state.clone();
        let version = self.config.version.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);

            if !state.connect(addr, msg_tx.clone()).await {
                warn!("Connection limit reached, rejecting {}", addr);
                if let Ok(text) = ServerMessage::error(ErrorCode::ServerOverloaded, "Too many connections").to_json() {
                    let _ = ws_sender.send(Message::Text(text)).await;
                }
                let _ = ws_sender.close().await;
                return;
            }

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            let _ = msg_tx
                .send(ServerMessage::Welcome {
                    connection_id: addr.to_string(),
                    server_version: version,
                })
                .await;

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                match ClientMessage::from_json(&text) {
                                    Ok(client_msg) => state.handle_message(addr, client_msg).await,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        let _ = msg_tx
                                            .send(ServerMessage::error(ErrorCode::InvalidInput, "Invalid message format"))
                                            .await;
                                    }
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            state.disconnect(addr).await;
            drop(msg_tx);
            // Let queued messages (e.g. Shutdown) drain before the socket drops.
            let _ = tokio::time::timeout(Duration::from_secs(1), sender_task).await;

            info!("Client {} cleaned up", addr);
        });
    }

    /// Run cleanup loop.
    async fn run_cleanup_loop(state: Arc<ServerState>, every: Duration) {
        let mut interval = interval(every);

        loop {
            interval.tick().await;
            let removed = state.cleanup().await;
            if removed > 0 {
                info!("Reaped {} lobbies", removed);
            }
        }
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.state.connection_count().await
    }

    /// Get active lobby count.
    pub async fn lobby_count(&self) -> usize {
        self.state.arena().lobby_count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::turn::TurnState;
    use crate::network::protocol::{ServerError, SessionEvent};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    async fn client(state: &ServerState, port: u16) -> mpsc::Receiver<ServerMessage> {
        let (tx, rx) = mpsc::channel(256);
        assert!(state.connect(addr(port), tx).await);
        rx
    }

    fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn last_error(msgs: &[ServerMessage]) -> Option<ErrorCode> {
        msgs.iter().rev().find_map(|m| match m {
            ServerMessage::Error(ServerError { code, .. }) => Some(*code),
            _ => None,
        })
    }

    /// Three clients in one lobby; returns the receivers and the lobby id hex.
    async fn three_player_lobby(state: &ServerState) -> (Vec<mpsc::Receiver<ServerMessage>>, String) {
        let mut rxs = vec![client(state, 1).await, client(state, 2).await, client(state, 3).await];
        state
            .handle_message(addr(1), ClientMessage::CreateLobby { player_name: "alice".into() })
            .await;
        let lobby_id = drain(&mut rxs[0])
            .into_iter()
            .find_map(|m| match m {
                ServerMessage::Lobby(info) => Some(info.lobby_id),
                _ => None,
            })
            .unwrap();
        for (port, name) in [(2, "bob"), (3, "carol")] {
            state
                .handle_message(addr(port), ClientMessage::JoinLobby {
                    lobby_id: lobby_id.clone(),
                    player_name: name.into(),
                })
                .await;
        }
        for rx in rxs.iter_mut() {
            drain(rx);
        }
        (rxs, lobby_id)
    }

    #[test]
    fn test_fresh_entropy_differs() {
        let a = fresh_entropy();
        let b = fresh_entropy();
        assert_ne!(a, b);
        assert_ne!(a, [0u8; 32]);
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(config.admin_token.is_none());
        assert_eq!(config.game.max_players, 6);
    }

    #[test]
    fn test_server_config_from_lookup() {
        let env: BTreeMap<&str, &str> = [
            ("CLUEDO_BIND_ADDR", "127.0.0.1:9000"),
            ("CLUEDO_MAX_LOBBIES", "5"),
            ("CLUEDO_ADMIN_TOKEN", "s3cret"),
        ]
        .into_iter()
        .collect();

        let config = ServerConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.bind_addr, addr(9000));
        assert_eq!(config.max_lobbies, 5);
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.admin_token.as_deref(), Some("s3cret"));

        let err = ServerConfig::from_lookup(|k| (k == "CLUEDO_MAX_CONNECTIONS").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, GameServerError::InvalidSetting { key: "CLUEDO_MAX_CONNECTIONS", .. }));
    }

    #[tokio::test]
    async fn test_server_creation() {
        let config = ServerConfig {
            bind_addr: addr(0),
            ..Default::default()
        };
        let server = GameServer::new(config);

        assert_eq!(server.connection_count().await, 0);
        assert_eq!(server.lobby_count().await, 0);
        server.shutdown();
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let state = ServerState::new(ServerConfig {
            max_connections: 1,
            ..Default::default()
        });
        let _a = client(&state, 1).await;
        let (tx, _rx) = mpsc::channel(4);
        assert!(!state.connect(addr(2), tx).await);
        assert_eq!(state.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_join_and_list() {
        let state = ServerState::new(ServerConfig::default());
        let (mut rxs, lobby_id) = three_player_lobby(&state).await;

        state.handle_message(addr(1), ClientMessage::ListLobbies).await;
        match drain(&mut rxs[0]).pop() {
            Some(ServerMessage::LobbyList { lobbies }) => {
                assert_eq!(lobbies.len(), 1);
                assert_eq!(lobbies[0].lobby_id, lobby_id);
                assert_eq!(lobbies[0].players, 3);
            }
            other => panic!("Wrong message type: {:?}", other),
        }

        state
            .handle_message(addr(2), ClientMessage::CreateLobby { player_name: "bob".into() })
            .await;
        assert_eq!(last_error(&drain(&mut rxs[1])), Some(ErrorCode::AlreadyInLobby));
    }

    #[tokio::test]
    async fn test_created_lobby_survives_sweep() {
        let state = ServerState::new(ServerConfig::default());
        let mut alice = client(&state, 1).await;
        state
            .handle_message(addr(1), ClientMessage::CreateLobby { player_name: "alice".into() })
            .await;
        assert!(matches!(drain(&mut alice).first(), Some(ServerMessage::Lobby(_))));

        assert_eq!(state.cleanup().await, 0);
        assert_eq!(state.arena().lobby_count().await, 1);

        let mut bob = client(&state, 2).await;
        state
            .handle_message(addr(2), ClientMessage::CreateLobby { player_name: " ".into() })
            .await;
        assert_eq!(last_error(&drain(&mut bob)), Some(ErrorCode::InvalidInput));
        assert_eq!(state.arena().lobby_count().await, 1);
    }

    #[tokio::test]
    async fn test_join_errors() {
        let state = ServerState::new(ServerConfig::default());
        let (_rxs, lobby_id) = three_player_lobby(&state).await;
        let mut dave = client(&state, 4).await;

        state
            .handle_message(addr(4), ClientMessage::JoinLobby {
                lobby_id: "zz".into(),
                player_name: "dave".into(),
            })
            .await;
        assert_eq!(last_error(&drain(&mut dave)), Some(ErrorCode::InvalidInput));

        state
            .handle_message(addr(4), ClientMessage::JoinLobby {
                lobby_id: hex::encode([9u8; 16]),
                player_name: "dave".into(),
            })
            .await;
        assert_eq!(last_error(&drain(&mut dave)), Some(ErrorCode::LobbyNotFound));

        state
            .handle_message(addr(4), ClientMessage::JoinLobby {
                lobby_id,
                player_name: "Bob".into(),
            })
            .await;
        assert_eq!(last_error(&drain(&mut dave)), Some(ErrorCode::NameTaken));
    }

    #[tokio::test]
    async fn test_start_and_turn_errors() {
        let state = ServerState::new(ServerConfig::default());
        let (mut rxs, _) = three_player_lobby(&state).await;

        state.handle_message(addr(2), ClientMessage::StartGame).await;
        assert_eq!(last_error(&drain(&mut rxs[1])), Some(ErrorCode::IllegalState));

        state.handle_message(addr(1), ClientMessage::StartGame).await;
        for rx in rxs.iter_mut() {
            let msgs = drain(rx);
            assert!(matches!(msgs[0], ServerMessage::GameStart(_)));
        }

        state.handle_message(addr(2), ClientMessage::RollDice).await;
        assert_eq!(last_error(&drain(&mut rxs[1])), Some(ErrorCode::IllegalState));
        assert!(drain(&mut rxs[0]).is_empty());

        state.handle_message(addr(1), ClientMessage::RollDice).await;
        for rx in rxs.iter_mut() {
            let msgs = drain(rx);
            assert!(msgs.iter().any(|m| matches!(
                m,
                ServerMessage::Event(SessionEvent::DiceRolled { .. })
            )));
        }
    }

    #[tokio::test]
    async fn test_action_outside_lobby() {
        let state = ServerState::new(ServerConfig::default());
        let mut rx = client(&state, 1).await;
        state.handle_message(addr(1), ClientMessage::RollDice).await;
        assert_eq!(last_error(&drain(&mut rx)), Some(ErrorCode::NotInLobby));
    }

    #[tokio::test]
    async fn test_force_end_requires_token() {
        let state = ServerState::new(ServerConfig {
            admin_token: Some("s3cret".into()),
            ..Default::default()
        });
        let (mut rxs, lobby_id) = three_player_lobby(&state).await;
        state.handle_message(addr(1), ClientMessage::StartGame).await;
        drain(&mut rxs[1]);

        state
            .handle_message(addr(2), ClientMessage::ForceEnd { token: "guess".into() })
            .await;
        assert_eq!(last_error(&drain(&mut rxs[1])), Some(ErrorCode::Unauthorized));

        state
            .handle_message(addr(2), ClientMessage::ForceEnd { token: "s3cret".into() })
            .await;
        let msgs = drain(&mut rxs[1]);
        match msgs.last() {
            Some(ServerMessage::GameEnd(info)) => {
                assert_eq!(info.winner, None);
                assert!(info.solution.is_some());
            }
            other => panic!("Wrong message type: {:?}", other),
        }

        let id = parse_lobby_id(&lobby_id).unwrap();
        let lobby = state.arena().get(&id).await.unwrap();
        assert_eq!(lobby.read().await.session().state(), TurnState::PlayerHasWon);
    }

    #[tokio::test]
    async fn test_disconnect_forfeits_and_empties() {
        let state = ServerState::new(ServerConfig::default());
        let (mut rxs, lobby_id) = three_player_lobby(&state).await;
        state.handle_message(addr(1), ClientMessage::StartGame).await;
        drain(&mut rxs[1]);

        state.disconnect(addr(1)).await;
        let msgs = drain(&mut rxs[1]);
        assert!(msgs.iter().any(|m| matches!(
            m,
            ServerMessage::Event(SessionEvent::PlayerEliminated { player, .. }) if player == "alice"
        )));

        state.disconnect(addr(2)).await;
        state.disconnect(addr(3)).await;
        let id = parse_lobby_id(&lobby_id).unwrap();
        assert!(state.arena().get(&id).await.is_none());
        assert_eq!(state.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_sync_and_ping() {
        let state = ServerState::new(ServerConfig::default());
        let (mut rxs, _) = three_player_lobby(&state).await;
        state.handle_message(addr(1), ClientMessage::StartGame).await;
        drain(&mut rxs[2]);

        state.handle_message(addr(3), ClientMessage::SyncRequest).await;
        match drain(&mut rxs[2]).pop() {
            Some(ServerMessage::State(sync)) => {
                assert_eq!(sync.hand.len(), 6);
                assert_eq!(sync.snapshot.current_player.as_deref(), Some("alice"));
            }
            other => panic!("Wrong message type: {:?}", other),
        }

        state.handle_message(addr(3), ClientMessage::Ping { timestamp: 42 }).await;
        match drain(&mut rxs[2]).pop() {
            Some(ServerMessage::Pong { timestamp, .. }) => assert_eq!(timestamp, 42),
            other => panic!("Wrong message type: {:?}", other),
        }
    }
}
