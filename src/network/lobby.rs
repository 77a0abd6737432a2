//! Lobby Management
//!
//! A lobby is the membership wrapper around one [`GameSession`]: who is
//! connected, who is host, and where to send their messages. The arena
//! owns every lobby behind its own lock; one action holds that lock from
//! validation until its events are delivered.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::core::rng::derive_session_seed;
use crate::game::error::ActionError;
use crate::game::player::standard_roster;
use crate::game::session::{GameConfig, GameSession};
use crate::network::protocol::{
    message_for_viewer, ErrorCode, GameStartInfo, LobbyInfo, LobbySummary, ServerMessage, StateSync,
};

/// Unique lobby identifier.
pub type LobbyId = [u8; 16];

/// Longest accepted player name.
pub const MAX_NAME_LEN: usize = 32;

/// Parse a hex lobby id from the wire.
pub fn parse_lobby_id(s: &str) -> Option<LobbyId> {
    let bytes = hex::decode(s.trim()).ok()?;
    if bytes.len() != 16 {
        return None;
    }
    let mut id = [0u8; 16];
    id.copy_from_slice(&bytes);
    Some(id)
}

/// Lobby errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LobbyError {
    /// No lobby with that id.
    #[error("Lobby not found")]
    NotFound,

    /// All seats taken.
    #[error("Lobby is full")]
    Full,

    /// Joins are closed once the game starts.
    #[error("Game already in progress")]
    GameInProgress,

    /// Name already used in this lobby.
    #[error("Name already taken: {0}")]
    NameTaken(String),

    /// Empty or overlong name.
    #[error("Invalid player name")]
    InvalidName,

    /// Name not in this lobby.
    #[error("Not a member: {0}")]
    NotMember(String),

    /// Server-wide lobby limit reached.
    #[error("Too many lobbies")]
    TooManyLobbies,

    /// Game rules rejected the action.
    #[error(transparent)]
    Action(#[from] ActionError),
}

impl LobbyError {
    /// Wire error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            LobbyError::NotFound => ErrorCode::LobbyNotFound,
            LobbyError::Full => ErrorCode::LobbyFull,
            LobbyError::GameInProgress => ErrorCode::GameInProgress,
            LobbyError::NameTaken(_) => ErrorCode::NameTaken,
            LobbyError::InvalidName => ErrorCode::InvalidInput,
            LobbyError::NotMember(_) => ErrorCode::NotInLobby,
            LobbyError::TooManyLobbies => ErrorCode::ServerOverloaded,
            LobbyError::Action(err) => err.kind().into(),
        }
    }
}

/// A connected lobby member.
#[derive(Debug)]
pub struct LobbyMember {
    /// Display name (actor identity).
    pub name: String,
    /// Message channel to this member.
    pub sender: mpsc::Sender<ServerMessage>,
}

// =============================================================================
// LOBBY
// =============================================================================

/// One lobby and its game.
pub struct Lobby {
    /// Unique lobby identifier.
    pub id: LobbyId,
    /// Connected members in join order.
    members: Vec<LobbyMember>,
    /// Current host.
    host: Option<String>,
    /// The game.
    session: GameSession,
    /// When the lobby last saw an action.
    last_activity: Instant,
}

impl Lobby {
    /// Create an empty lobby.
    pub fn new(id: LobbyId, config: GameConfig) -> Self {
        Self {
            id,
            members: Vec::new(),
            host: None,
            session: GameSession::new(config),
            last_activity: Instant::now(),
        }
    }

    /// Hex form of the id.
    pub fn id_hex(&self) -> String {
        hex::encode(self.id)
    }

    /// The game session.
    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// Mutable access to the game session.
    ///
    /// Callers should follow up with [`Lobby::flush_events`].
    pub fn session_mut(&mut self) -> &mut GameSession {
        self.last_activity = Instant::now();
        &mut self.session
    }

    /// Current host.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Member names in join order.
    pub fn member_names(&self) -> Vec<String> {
        self.members.iter().map(|m| m.name.clone()).collect()
    }

    /// Get member count.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// True if nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// True once the host has started the game.
    pub fn is_started(&self) -> bool {
        !self.session.state().is_lobby()
    }

    /// True once the game is over.
    pub fn is_finished(&self) -> bool {
        self.session.state().is_terminal()
    }

    /// Time since the last action.
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Add a member. The first member becomes host.
    pub fn add_member(&mut self, name: &str, sender: mpsc::Sender<ServerMessage>) -> Result<(), LobbyError> {
        let name = name.trim();
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(LobbyError::InvalidName);
        }
        if self.is_started() {
            return Err(LobbyError::GameInProgress);
        }
        if self.members.len() >= self.session.config().max_players {
            return Err(LobbyError::Full);
        }
        if self.members.iter().any(|m| m.name.eq_ignore_ascii_case(name)) {
            return Err(LobbyError::NameTaken(name.to_string()));
        }

        self.members.push(LobbyMember {
            name: name.to_string(),
            sender,
        });
        if self.host.is_none() {
            self.host = Some(name.to_string());
        }
        self.session.set_player_count(self.members.len());
        self.last_activity = Instant::now();

        debug!(lobby = %self.id_hex(), player = name, "member joined");
        Ok(())
    }

    /// Remove a member.
    ///
    /// Before the game starts the seat is freed and the host passes to the
    /// next member in join order. Mid-game the player forfeits.
    pub fn remove_member(&mut self, name: &str) -> Result<(), LobbyError> {
        let pos = self
            .members
            .iter()
            .position(|m| m.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| LobbyError::NotMember(name.to_string()))?;
        let member = self.members.remove(pos);
        self.last_activity = Instant::now();

        if !self.is_started() {
            let was_host = self
                .host
                .as_deref()
                .is_some_and(|h| h.eq_ignore_ascii_case(&member.name));
            if was_host {
                self.host = self.members.first().map(|m| m.name.clone());
                debug!(lobby = %self.id_hex(), host = ?self.host, "host passed on");
            }
            self.session.set_player_count(self.members.len());
        } else if !self.is_finished() {
            match self.session.forfeit(&member.name) {
                Ok(()) => info!(lobby = %self.id_hex(), player = %member.name, "player forfeited"),
                Err(ActionError::Eliminated(_)) => {}
                Err(err) => warn!(lobby = %self.id_hex(), player = %member.name, %err, "forfeit failed"),
            }
        }

        Ok(())
    }

    /// Start the game on behalf of `actor`.
    ///
    /// The roster is the member list in join order; the seed mixes
    /// `entropy` with the lobby id and names.
    pub fn start(&mut self, actor: &str, entropy: &[u8; 32]) -> Result<(), LobbyError> {
        let names = self.member_names();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let seed = derive_session_seed(entropy, &self.id, &name_refs);
        let roster = standard_roster(&names[..], self.session.board());
        let host = self.host.clone().unwrap_or_default();

        self.session.start(actor, &host, roster, seed)?;
        self.last_activity = Instant::now();
        info!(lobby = %self.id_hex(), players = names.len(), "lobby started");
        Ok(())
    }

    /// Lobby membership payload.
    pub fn info(&self) -> LobbyInfo {
        LobbyInfo {
            lobby_id: self.id_hex(),
            host: self.host.clone(),
            members: self.member_names(),
            state: self.session.state(),
        }
    }

    /// Lobby list entry.
    pub fn summary(&self) -> LobbySummary {
        LobbySummary {
            lobby_id: self.id_hex(),
            players: self.members.len() as u32,
            max_players: self.session.config().max_players as u32,
            started: self.is_started(),
        }
    }

    /// Card names held by `name`.
    pub fn hand_names(&self, name: &str) -> Vec<String> {
        self.session
            .hand_of(name)
            .map(|hand| hand.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Resync payload for `name`.
    pub fn sync_for(&self, name: &str) -> ServerMessage {
        ServerMessage::State(StateSync {
            snapshot: self.session.snapshot(),
            hand: self.hand_names(name),
        })
    }

    /// Broadcast a message to all members.
    pub async fn broadcast(&self, message: ServerMessage) {
        for member in &self.members {
            let _ = member.sender.send(message.clone()).await;
        }
    }

    /// Send each member their personal game-start message.
    pub async fn announce_start(&self) {
        let snapshot = self.session.snapshot();
        let first_player = snapshot.current_player.clone().unwrap_or_default();
        for member in &self.members {
            let msg = ServerMessage::GameStart(GameStartInfo {
                lobby_id: self.id_hex(),
                players: snapshot.players.clone(),
                hand: self.hand_names(&member.name),
                first_player: first_player.clone(),
            });
            let _ = member.sender.send(msg).await;
        }
    }

    /// Deliver pending session events, filtered per member.
    ///
    /// Returns the number of events delivered.
    pub async fn flush_events(&mut self) -> usize {
        let events = self.session.take_events();
        for event in &events {
            for member in &self.members {
                let msg = message_for_viewer(event, Some(&member.name));
                let _ = member.sender.send(msg).await;
            }
        }
        events.len()
    }
}

// =============================================================================
// LOBBY ARENA
// =============================================================================

/// Owns every lobby, each behind its own lock.
pub struct LobbyArena {
    /// Active lobbies.
    lobbies: RwLock<BTreeMap<LobbyId, Arc<RwLock<Lobby>>>>,
    /// Rules for new lobbies.
    config: GameConfig,
    /// Maximum concurrent lobbies.
    max_lobbies: usize,
}

impl LobbyArena {
    /// Create a new arena.
    pub fn new(config: GameConfig, max_lobbies: usize) -> Self {
        Self {
            lobbies: RwLock::new(BTreeMap::new()),
            config,
            max_lobbies,
        }
    }

    /// Create a lobby with `name` seated as host.
    ///
    /// The lobby is only inserted once it has its first member, so
    /// [`cleanup`](Self::cleanup) never sees it empty.
    pub async fn create_lobby(
        &self,
        name: &str,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<(LobbyId, Arc<RwLock<Lobby>>), LobbyError> {
        let mut lobbies = self.lobbies.write().await;
        if lobbies.len() >= self.max_lobbies {
            return Err(LobbyError::TooManyLobbies);
        }
        let id = uuid::Uuid::new_v4().into_bytes();
        let mut lobby = Lobby::new(id, self.config.clone());
        lobby.add_member(name, sender)?;
        let lobby = Arc::new(RwLock::new(lobby));
        lobbies.insert(id, lobby.clone());
        Ok((id, lobby))
    }

    /// Get a lobby by ID.
    pub async fn get(&self, id: &LobbyId) -> Option<Arc<RwLock<Lobby>>> {
        let lobbies = self.lobbies.read().await;
        lobbies.get(id).cloned()
    }

    /// Remove a lobby.
    pub async fn remove(&self, id: &LobbyId) {
        let mut lobbies = self.lobbies.write().await;
        lobbies.remove(id);
    }

    /// Get active lobby count.
    pub async fn lobby_count(&self) -> usize {
        let lobbies = self.lobbies.read().await;
        lobbies.len()
    }

    /// Summaries of every lobby, in id order.
    pub async fn list(&self) -> Vec<LobbySummary> {
        let lobbies = self.lobbies.read().await;
        let mut out = Vec::with_capacity(lobbies.len());
        for lobby in lobbies.values() {
            out.push(lobby.read().await.summary());
        }
        out
    }

    /// Remove empty lobbies, and finished ones idle longer than `linger`.
    ///
    /// Returns the number of lobbies removed.
    pub async fn cleanup(&self, linger: Duration) -> usize {
        let mut lobbies = self.lobbies.write().await;
        let mut to_remove = Vec::new();

        for (id, lobby) in lobbies.iter() {
            let l = lobby.read().await;
            if l.is_empty() || (l.is_finished() && l.idle_for() >= linger) {
                to_remove.push(*id);
            }
        }

        for id in &to_remove {
            lobbies.remove(id);
        }
        to_remove.len()
    }
}
