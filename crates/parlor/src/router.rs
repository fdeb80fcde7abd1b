//! The router: owns every room and the session table, and updates them
//! once per tick in a fixed order.

use std::time::Instant;

use parlor_protocol::MessageChannel;
use parlor_room::{
    Destination, GameId, GameOverRoom, GameRoom, LobbyRoom, LoginRoom, Room, RoomConfig,
    RoomContext, RouterCommand, ServerEvent,
};
use parlor_session::{PlayerInfo, SessionRegistry};
use parlor_transport::ConnectionId;
use tokio::sync::broadcast;

/// How many events a slow subscriber may fall behind before it starts
/// missing some.
const EVENT_CAPACITY: usize = 256;

/// Owns the login, lobby, and game-over rooms plus one room per running
/// game.
///
/// Rooms only talk to the router through the [`RouterCommand`]s they
/// leave in the shared [`RoomContext`]. Those are applied right after the
/// room that issued them finishes its update, so a transferred player is
/// never in two rooms, or none, between updates.
#[derive(Debug)]
pub struct Router {
    login: LoginRoom,
    lobby: LobbyRoom,
    game_over: GameOverRoom,
    games: Vec<GameRoom>,
    next_game_id: u64,
    ctx: RoomContext,
    events: broadcast::Sender<ServerEvent>,
}

impl Router {
    pub fn new(config: RoomConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            login: LoginRoom::new(),
            lobby: LobbyRoom::new(),
            game_over: GameOverRoom::new(),
            games: Vec::new(),
            next_game_id: 0,
            ctx: RoomContext::new(config, Instant::now()),
            events,
        }
    }

    /// Receives every [`ServerEvent`] published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    /// The clock rooms currently see.
    pub fn now(&self) -> Instant {
        self.ctx.now
    }

    /// Moves the room clock forward. Never moves it back.
    pub fn advance_clock(&mut self, now: Instant) {
        self.ctx.now = self.ctx.now.max(now);
    }

    /// Every new connection starts in the login room.
    pub fn accept_connection(&mut self, channel: MessageChannel) {
        self.login.add_member(channel, &mut self.ctx);
        self.apply_commands();
        self.publish_events();
    }

    /// Runs one tick: login, lobby, game-over, then each game that exists
    /// once the lobby is done, each updated exactly once.
    pub fn tick(&mut self, now: Instant) {
        self.advance_clock(now);

        self.login.update(&mut self.ctx);
        self.apply_commands();
        self.lobby.update(&mut self.ctx);
        self.apply_commands();
        self.game_over.update(&mut self.ctx);
        self.apply_commands();

        let games: Vec<GameId> = self.games.iter().map(GameRoom::id).collect();
        for id in games {
            if let Some(game) = self.games.iter_mut().find(|g| g.id() == id) {
                game.update(&mut self.ctx);
            }
            self.apply_commands();
        }

        self.publish_events();
    }

    /// Allocates an empty game room.
    pub fn create_game_room(&mut self) -> &mut GameRoom {
        self.next_game_id += 1;
        let id = GameId::new(self.next_game_id);
        tracing::debug!(game = %id, "game room created");
        self.games.push(GameRoom::new(id));
        let last = self.games.len() - 1;
        &mut self.games[last]
    }

    /// Stops tracking a game room. Returns it if it existed.
    pub fn retire_game_room(&mut self, id: GameId) -> Option<GameRoom> {
        let index = self.games.iter().position(|g| g.id() == id)?;
        tracing::debug!(game = %id, "game room retired");
        Some(self.games.remove(index))
    }

    /// Closes every connection in every room.
    pub fn shutdown(&mut self) {
        let ctx = &mut self.ctx;
        let rooms: [&mut dyn Room; 3] = [&mut self.login, &mut self.lobby, &mut self.game_over];
        for room in rooms {
            for id in room.members().ids() {
                room.remove_and_close_member(id, ctx);
            }
        }
        for game in &mut self.games {
            for id in game.members().ids() {
                game.remove_and_close_member(id, ctx);
            }
        }
        self.games.clear();
        // Leftover commands carry channels from forfeited games.
        for command in self.ctx.take_commands() {
            let channels: Vec<MessageChannel> = match command {
                RouterCommand::Transfer { channel, .. } => vec![channel],
                RouterCommand::StartGame { players } => players.into(),
                RouterCommand::RetireGame { .. } => Vec::new(),
            };
            for mut channel in channels {
                let id = channel.id();
                self.ctx.sessions.drop_session(id);
                if let Err(e) = channel.close() {
                    tracing::debug!(conn_id = %id, error = %e, "close failed");
                }
            }
        }
        self.publish_events();
    }

    // -----------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------

    pub fn sessions(&self) -> &SessionRegistry {
        &self.ctx.sessions
    }

    pub fn get_or_create_session_info(&mut self, id: ConnectionId) -> &mut PlayerInfo {
        self.ctx.sessions.get_or_create(id)
    }

    pub fn drop_session_info(&mut self, id: ConnectionId) -> Option<PlayerInfo> {
        self.ctx.sessions.drop_session(id)
    }

    pub fn find_players(&self, pred: impl FnMut(&PlayerInfo) -> bool) -> Vec<ConnectionId> {
        self.ctx.sessions.find(pred)
    }

    // -----------------------------------------------------------------
    // Rooms
    // -----------------------------------------------------------------

    pub fn login(&self) -> &LoginRoom {
        &self.login
    }

    pub fn lobby(&self) -> &LobbyRoom {
        &self.lobby
    }

    pub fn game_over(&self) -> &GameOverRoom {
        &self.game_over
    }

    pub fn games(&self) -> &[GameRoom] {
        &self.games
    }

    /// Total connections across all rooms.
    pub fn connection_count(&self) -> usize {
        self.login.members().len()
            + self.lobby.members().len()
            + self.game_over.members().len()
            + self.games.iter().map(|g| g.members().len()).sum::<usize>()
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    /// Applies commands until none are left. Applying one may queue more,
    /// e.g. a game that can't start sends its players back.
    fn apply_commands(&mut self) {
        loop {
            let commands = self.ctx.take_commands();
            if commands.is_empty() {
                return;
            }
            for command in commands {
                self.apply(command);
            }
        }
    }

    fn apply(&mut self, command: RouterCommand) {
        match command {
            RouterCommand::Transfer {
                channel,
                to: Destination::Lobby,
            } => self.lobby.add_member(channel, &mut self.ctx),
            RouterCommand::Transfer {
                channel,
                to: Destination::GameOver { verdict },
            } => self.game_over.admit(channel, verdict, &mut self.ctx),
            RouterCommand::StartGame { players } => self.start_game(players),
            RouterCommand::RetireGame { game, outcome } => {
                self.retire_game_room(game);
                self.lobby.on_game_ended(&outcome);
                tracing::info!(%game, %outcome, "game ended");
                self.ctx.emit(ServerEvent::GameEnded { game, outcome });
            }
        }
    }

    fn start_game(&mut self, players: [MessageChannel; 2]) {
        let id = self.create_game_room().id();
        let Some(game) = self.games.iter_mut().find(|g| g.id() == id) else {
            return;
        };
        let result = game.start_game(players, &mut self.ctx);
        let names = game.player_names().clone();
        match result {
            Ok(()) => self.ctx.emit(ServerEvent::GameStarted {
                game: id,
                players: names,
            }),
            Err(e) => {
                tracing::warn!(game = %id, error = %e, "game failed to start");
                self.retire_game_room(id);
            }
        }
    }

    fn publish_events(&mut self) {
        for event in self.ctx.take_events() {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_retire_game_rooms() {
        let mut router = Router::new(RoomConfig::default());
        let first = router.create_game_room().id();
        let second = router.create_game_room().id();
        assert_ne!(first, second);
        assert_eq!(router.games().len(), 2);

        assert!(router.retire_game_room(first).is_some());
        assert!(router.retire_game_room(first).is_none());
        assert_eq!(router.games().len(), 1);
        assert_eq!(router.games()[0].id(), second);
    }

    #[test]
    fn test_advance_clock_is_monotonic() {
        let mut router = Router::new(RoomConfig::default());
        let start = router.now();
        router.advance_clock(start + std::time::Duration::from_secs(1));
        router.advance_clock(start);
        assert_eq!(router.now(), start + std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_shutdown_closes_channels_still_in_flight() {
        let mut router = Router::new(RoomConfig::default());
        let (server, client) = parlor_transport::memory::pipe();
        let channel = MessageChannel::binary(server);
        let id = channel.id();
        let mut client = MessageChannel::binary(client);
        router.get_or_create_session_info(id).nickname = "Alice".into();
        router.ctx.push(RouterCommand::Transfer {
            channel,
            to: Destination::Lobby,
        });

        router.shutdown();

        assert!(router.sessions().is_empty());
        assert!(!client.is_alive());
        assert!(client.has_message().is_err());
    }

    #[test]
    fn test_session_helpers() {
        let mut router = Router::new(RoomConfig::default());
        let id = ConnectionId::new(42);
        router.get_or_create_session_info(id).nickname = "Alice".into();
        assert_eq!(router.find_players(|p| p.nickname == "Alice"), vec![id]);
        assert!(router.drop_session_info(id).is_some());
        assert!(router.sessions().is_empty());
    }
}
