//! Where players land after a game, until they ask to go back.

use parlor_protocol::{ChatMessage, Message, MessageChannel, RoomJoinedEvent, RoomKind};
use parlor_transport::ConnectionId;

use crate::{Destination, Members, Room, RoomContext, RouterCommand};

#[derive(Debug, Default)]
pub struct GameOverRoom {
    members: Members,
}

impl GameOverRoom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `channel` and tells the player how their game went.
    pub fn admit(&mut self, channel: MessageChannel, verdict: Option<String>, ctx: &mut RoomContext) {
        let id = channel.id();
        self.add_member(channel, ctx);
        if let Some(text) = verdict {
            self.members.send_to(id, &ChatMessage::notice(text).into());
        }
    }
}

impl Room for GameOverRoom {
    fn kind(&self) -> RoomKind {
        RoomKind::GameOver
    }

    fn members(&self) -> &Members {
        &self.members
    }

    fn members_mut(&mut self) -> &mut Members {
        &mut self.members
    }

    fn add_member(&mut self, channel: MessageChannel, ctx: &mut RoomContext) {
        let id = channel.id();
        tracing::info!(room = %self.kind(), conn_id = %id, "member joined");
        self.members.insert(channel, ctx.now);
        self.members
            .send_to(id, &RoomJoinedEvent { room: RoomKind::GameOver }.into());
    }

    fn handle_message(&mut self, message: Message, sender: ConnectionId, ctx: &mut RoomContext) {
        match message {
            Message::GoToLobbyRequest(_) => {
                if let Some(channel) = self.remove_member(sender, ctx) {
                    ctx.push(RouterCommand::Transfer {
                        channel,
                        to: Destination::Lobby,
                    });
                }
            }
            Message::Heartbeat(_) => {}
            other => {
                tracing::debug!(conn_id = %sender, kind = ?other.kind(), "ignored in game-over");
            }
        }
    }
}
