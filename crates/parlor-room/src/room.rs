//! The `Room` trait and the membership list every room is built on.
//!
//! A room owns the channels of its members. Each tick the router calls
//! [`Room::update`] once, which first evicts members that have gone
//! quiet or dropped, then drains whatever each remaining member sent and
//! hands it to [`Room::handle_message`].

use std::time::{Duration, Instant};

use parlor_protocol::{Message, MessageChannel, RoomKind};
use parlor_transport::ConnectionId;

use crate::{RoomContext, ServerEvent};

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Member {
    channel: MessageChannel,
    last_seen: Instant,
}

/// A room's members in join order, each with its last-heard-from time.
#[derive(Debug, Default)]
pub struct Members(Vec<Member>);

impl Members {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `channel`, stamping `now` as its first sign of life.
    pub fn insert(&mut self, channel: MessageChannel, now: Instant) {
        self.0.push(Member {
            channel,
            last_seen: now,
        });
    }

    /// Takes a member's channel out, keeping everyone else in order.
    /// The channel is not closed.
    pub fn remove(&mut self, id: ConnectionId) -> Option<MessageChannel> {
        let index = self.0.iter().position(|m| m.channel.id() == id)?;
        Some(self.0.remove(index).channel)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.0.iter().any(|m| m.channel.id() == id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Member ids in join order.
    pub fn ids(&self) -> Vec<ConnectionId> {
        self.0.iter().map(|m| m.channel.id()).collect()
    }

    pub fn channel_mut(&mut self, id: ConnectionId) -> Option<&mut MessageChannel> {
        self.0
            .iter_mut()
            .find(|m| m.channel.id() == id)
            .map(|m| &mut m.channel)
    }

    /// Records that `id` was heard from at `now`.
    pub fn touch(&mut self, id: ConnectionId, now: Instant) {
        if let Some(member) = self.0.iter_mut().find(|m| m.channel.id() == id) {
            member.last_seen = now;
        }
    }

    pub fn last_seen(&self, id: ConnectionId) -> Option<Instant> {
        self.0
            .iter()
            .find(|m| m.channel.id() == id)
            .map(|m| m.last_seen)
    }

    /// Members silent for longer than `timeout`, or whose peer has
    /// closed.
    pub fn expired(&self, now: Instant, timeout: Duration) -> Vec<ConnectionId> {
        self.0
            .iter()
            .filter(|m| {
                now.saturating_duration_since(m.last_seen) > timeout || !m.channel.is_alive()
            })
            .map(|m| m.channel.id())
            .collect()
    }

    /// Sends to one member. Returns `false` if it isn't here or the send
    /// failed; failures are logged, never acted on.
    pub fn send_to(&mut self, id: ConnectionId, message: &Message) -> bool {
        let Some(channel) = self.channel_mut(id) else {
            return false;
        };
        match channel.send_message(message) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(conn_id = %id, kind = ?message.kind(), error = %e, "send failed");
                false
            }
        }
    }

    /// Best-effort send to every member.
    pub fn broadcast(&mut self, message: &Message) {
        self.broadcast_where(message, |_| true);
    }

    /// Best-effort send to the members `pred` selects. One member's
    /// failure neither stops delivery to the rest nor removes anyone.
    pub fn broadcast_where(&mut self, message: &Message, mut pred: impl FnMut(ConnectionId) -> bool) {
        for member in &mut self.0 {
            let id = member.channel.id();
            if !pred(id) {
                continue;
            }
            if let Err(e) = member.channel.send_message(message) {
                tracing::warn!(conn_id = %id, kind = ?message.kind(), error = %e, "broadcast send failed");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// One state of the session lifecycle.
///
/// Implementors supply the membership storage and a message handler; the
/// provided methods give every room the same join/leave bookkeeping,
/// liveness sweep, and dispatch loop. Rooms override the hooks they care
/// about: [`add_member`](Self::add_member) to greet a newcomer and
/// [`on_member_removed`](Self::on_member_removed) to react to a
/// departure.
pub trait Room {
    fn kind(&self) -> RoomKind;

    fn members(&self) -> &Members;

    fn members_mut(&mut self) -> &mut Members;

    /// Handles one message from `sender`, who is a member when this is
    /// called. The handler may remove any members, `sender` included.
    fn handle_message(&mut self, message: Message, sender: ConnectionId, ctx: &mut RoomContext);

    fn add_member(&mut self, channel: MessageChannel, ctx: &mut RoomContext) {
        tracing::info!(room = %self.kind(), conn_id = %channel.id(), "member joined");
        let now = ctx.now;
        self.members_mut().insert(channel, now);
    }

    /// Called after `id` left the membership, by any route.
    fn on_member_removed(&mut self, _id: ConnectionId, _ctx: &mut RoomContext) {}

    /// Removes `id` without closing its channel, which is returned so it
    /// can be handed to another room.
    fn remove_member(&mut self, id: ConnectionId, ctx: &mut RoomContext) -> Option<MessageChannel> {
        let channel = self.members_mut().remove(id)?;
        tracing::debug!(room = %self.kind(), conn_id = %id, "member removed");
        self.on_member_removed(id, ctx);
        Some(channel)
    }

    /// Evicts `id` from the server: removes it, forgets its session, and
    /// closes the connection.
    fn remove_and_close_member(&mut self, id: ConnectionId, ctx: &mut RoomContext) {
        let Some(mut channel) = self.remove_member(id, ctx) else {
            return;
        };
        let nickname = ctx
            .sessions
            .drop_session(id)
            .map(|info| info.nickname)
            .unwrap_or_default();
        if let Err(e) = channel.close() {
            tracing::debug!(conn_id = %id, error = %e, "close failed");
        }
        tracing::info!(room = %self.kind(), conn_id = %id, %nickname, "member evicted");
        ctx.emit(ServerEvent::PlayerEvicted { conn: id, nickname });
    }

    /// One tick's worth of work: sweep, then dispatch.
    fn update(&mut self, ctx: &mut RoomContext) {
        self.sweep(ctx);
        self.dispatch(ctx);
    }

    /// Evicts every member that timed out or whose peer closed.
    fn sweep(&mut self, ctx: &mut RoomContext) {
        let expired = self
            .members()
            .expired(ctx.now, ctx.config.heartbeat_timeout);
        for id in expired {
            tracing::info!(room = %self.kind(), conn_id = %id, "member timed out");
            self.remove_and_close_member(id, ctx);
        }
    }

    /// Drains every member's buffered messages.
    ///
    /// Works from a snapshot of ids, last to first, and looks each one up
    /// again before touching it, so handlers may remove anyone. A member
    /// present at the start is visited once or, if removed first, not
    /// at all.
    fn dispatch(&mut self, ctx: &mut RoomContext) {
        let ids = self.members().ids();
        for id in ids.into_iter().rev() {
            self.drain_member(id, ctx);
        }
    }

    /// Feeds `id`'s buffered messages to the handler until none are left
    /// or `id` is no longer a member.
    fn drain_member(&mut self, id: ConnectionId, ctx: &mut RoomContext) {
        loop {
            let Some(channel) = self.members_mut().channel_mut(id) else {
                return;
            };
            let received = match channel.has_message() {
                Ok(false) => return,
                Ok(true) => channel.receive_message(),
                Err(e) => Err(e),
            };
            match received {
                Ok(message) => {
                    let now = ctx.now;
                    self.members_mut().touch(id, now);
                    tracing::trace!(room = %self.kind(), conn_id = %id, kind = ?message.kind(), "message received");
                    self.handle_message(message, id, ctx);
                }
                Err(e) if !e.is_fatal() => {
                    let now = ctx.now;
                    self.members_mut().touch(id, now);
                    tracing::debug!(room = %self.kind(), conn_id = %id, error = %e, "dropped unreadable frame");
                }
                Err(e) => {
                    tracing::info!(room = %self.kind(), conn_id = %id, error = %e, "connection failed");
                    self.remove_and_close_member(id, ctx);
                    return;
                }
            }
        }
    }

    fn broadcast(&mut self, message: &Message) {
        self.members_mut().broadcast(message);
    }
}

#[cfg(test)]
mod tests {
    use parlor_transport::memory::pipe;

    use super::*;

    fn channel() -> (MessageChannel, MessageChannel) {
        let (a, b) = pipe();
        (MessageChannel::binary(a), MessageChannel::binary(b))
    }

    #[test]
    fn test_members_remove_keeps_order() {
        let now = Instant::now();
        let mut members = Members::new();
        let mut peers = Vec::new();
        for _ in 0..3 {
            let (server, client) = channel();
            peers.push(client);
            members.insert(server, now);
        }
        let ids = members.ids();

        let removed = members.remove(ids[1]).unwrap();
        assert_eq!(removed.id(), ids[1]);
        assert_eq!(members.ids(), vec![ids[0], ids[2]]);
        assert!(members.remove(ids[1]).is_none());
    }

    #[test]
    fn test_members_expired_by_silence() {
        let start = Instant::now();
        let timeout = Duration::from_secs(10);
        let mut members = Members::new();
        let (server, _client) = channel();
        let id = server.id();
        members.insert(server, start);

        assert!(members.expired(start + timeout, timeout).is_empty());
        assert_eq!(
            members.expired(start + timeout + Duration::from_millis(1), timeout),
            vec![id]
        );

        members.touch(id, start + timeout);
        assert!(members.expired(start + timeout + Duration::from_millis(1), timeout).is_empty());
        assert_eq!(members.last_seen(id), Some(start + timeout));
    }

    #[test]
    fn test_members_expired_by_peer_close() {
        let now = Instant::now();
        let mut members = Members::new();
        let (server, client) = channel();
        let id = server.id();
        members.insert(server, now);
        drop(client);

        assert_eq!(members.expired(now, Duration::from_secs(10)), vec![id]);
    }

    #[test]
    fn test_broadcast_where_filters() {
        let now = Instant::now();
        let mut members = Members::new();
        let (a, mut client_a) = channel();
        let (b, mut client_b) = channel();
        let b_id = b.id();
        members.insert(a, now);
        members.insert(b, now);

        let msg: Message = parlor_protocol::Heartbeat.into();
        members.broadcast_where(&msg, |id| id == b_id);

        assert!(!client_a.has_message().unwrap());
        assert!(client_b.has_message().unwrap());
        assert_eq!(client_b.receive_message().unwrap(), msg);
    }

    #[test]
    fn test_broadcast_survives_dead_member() {
        let now = Instant::now();
        let mut members = Members::new();
        let (a, client_a) = channel();
        let (b, mut client_b) = channel();
        members.insert(a, now);
        members.insert(b, now);
        drop(client_a);

        let msg: Message = parlor_protocol::Heartbeat.into();
        members.broadcast(&msg);

        assert_eq!(members.len(), 2);
        assert!(client_b.has_message().unwrap());
    }
}
