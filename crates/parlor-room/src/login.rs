//! The entry room: every connection starts here and must pick a
//! nickname before going anywhere else.

use parlor_protocol::{
    JoinResult, Message, MessageChannel, PlayerJoinRequest, PlayerJoinResponse, RoomJoinedEvent,
    RoomKind,
};
use parlor_transport::ConnectionId;

use crate::{Destination, Members, Room, RoomContext, RouterCommand, ServerEvent};

/// Accepts nickname requests and moves successful players to the lobby.
///
/// Strict: any message other than a join request or a heartbeat gets the
/// connection closed without explanation.
#[derive(Debug, Default)]
pub struct LoginRoom {
    members: Members,
}

impl LoginRoom {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle_join(&mut self, request: PlayerJoinRequest, sender: ConnectionId, ctx: &mut RoomContext) {
        let max_len = ctx.config.max_nickname_len;
        let result = match ctx.sessions.claim_nickname(sender, &request.name, max_len) {
            Ok(()) => JoinResult::Accepted,
            Err(e) => {
                tracing::debug!(conn_id = %sender, error = %e, "join denied");
                JoinResult::Denied
            }
        };
        self.members
            .send_to(sender, &PlayerJoinResponse { result }.into());
        if result == JoinResult::Denied {
            return;
        }

        let nickname = ctx.sessions.nickname(sender).to_string();
        tracing::info!(conn_id = %sender, %nickname, "player logged in");
        if let Some(channel) = self.remove_member(sender, ctx) {
            ctx.push(RouterCommand::Transfer {
                channel,
                to: Destination::Lobby,
            });
        }
        ctx.emit(ServerEvent::PlayerAccepted {
            conn: sender,
            nickname,
        });
    }
}

impl Room for LoginRoom {
    fn kind(&self) -> RoomKind {
        RoomKind::Login
    }

    fn members(&self) -> &Members {
        &self.members
    }

    fn members_mut(&mut self) -> &mut Members {
        &mut self.members
    }

    /// Turns the connection away if the room is full.
    fn add_member(&mut self, mut channel: MessageChannel, ctx: &mut RoomContext) {
        let id = channel.id();
        if self.members.len() >= ctx.config.max_login_members {
            tracing::warn!(
                conn_id = %id,
                max = ctx.config.max_login_members,
                "login room full, refusing connection"
            );
            if let Err(e) = channel.close() {
                tracing::debug!(conn_id = %id, error = %e, "close failed");
            }
            return;
        }
        tracing::info!(room = %self.kind(), conn_id = %id, peer = ?channel.peer_addr(), "member joined");
        ctx.sessions.get_or_create(id);
        self.members.insert(channel, ctx.now);
        self.members
            .send_to(id, &RoomJoinedEvent { room: RoomKind::Login }.into());
    }

    fn handle_message(&mut self, message: Message, sender: ConnectionId, ctx: &mut RoomContext) {
        match message {
            Message::PlayerJoinRequest(request) => self.handle_join(request, sender, ctx),
            Message::Heartbeat(_) => {}
            other => {
                tracing::debug!(conn_id = %sender, kind = ?other.kind(), "unexpected message in login");
                self.remove_and_close_member(sender, ctx);
            }
        }
    }
}
