//! The per-connection side table.
//!
//! # Concurrency note
//!
//! `SessionRegistry` is a plain `HashMap` with no locking. It is owned
//! by the router and only ever touched from the single tick task, so
//! there is nothing to synchronize.

use std::collections::HashMap;

use parlor_transport::ConnectionId;
use rand::Rng;

use crate::{Arena, Avatar, PlayerInfo, SessionError};

/// Player metadata keyed by connection.
#[derive(Debug)]
pub struct SessionRegistry {
    players: HashMap<ConnectionId, PlayerInfo>,
    next_avatar_id: i32,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
            next_avatar_id: 1,
        }
    }

    /// Returns the entry for `id`, creating an empty one on first use.
    pub fn get_or_create(&mut self, id: ConnectionId) -> &mut PlayerInfo {
        self.players.entry(id).or_default()
    }

    pub fn get(&self, id: ConnectionId) -> Option<&PlayerInfo> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut PlayerInfo> {
        self.players.get_mut(&id)
    }

    /// The player's nickname, or an empty string if unknown.
    pub fn nickname(&self, id: ConnectionId) -> &str {
        self.players
            .get(&id)
            .map(|p| p.nickname.as_str())
            .unwrap_or_default()
    }

    /// Connections whose metadata satisfies `pred`, in no particular order.
    pub fn find(&self, mut pred: impl FnMut(&PlayerInfo) -> bool) -> Vec<ConnectionId> {
        self.players
            .iter()
            .filter(|(_, info)| pred(info))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Returns `true` if any connection holds `name`, ignoring case.
    pub fn is_nickname_taken(&self, name: &str) -> bool {
        !self
            .find(|p| p.is_logged_in() && p.nickname.to_lowercase() == name.to_lowercase())
            .is_empty()
    }

    /// Assigns `name` to `id` if it's well-formed and free.
    ///
    /// Leading and trailing whitespace is trimmed first. On error nothing
    /// changes; the player can try again with another name.
    ///
    /// # Errors
    /// - [`SessionError::InvalidNickname`] if the trimmed name is empty
    ///   or longer than `max_len` characters;
    /// - [`SessionError::NicknameTaken`] if another player holds it.
    pub fn claim_nickname(
        &mut self,
        id: ConnectionId,
        name: &str,
        max_len: usize,
    ) -> Result<(), SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::InvalidNickname("empty".into()));
        }
        if name.chars().count() > max_len {
            return Err(SessionError::InvalidNickname(format!(
                "longer than {max_len} characters"
            )));
        }
        if self.is_nickname_taken(name) {
            return Err(SessionError::NicknameTaken(name.to_string()));
        }
        self.get_or_create(id).nickname = name.to_string();
        tracing::debug!(conn_id = %id, nickname = name, "nickname claimed");
        Ok(())
    }

    /// Gives `id` a fresh avatar with a random appearance at a random spot
    /// in `arena`, replacing any previous one.
    pub fn spawn_avatar(&mut self, id: ConnectionId, arena: &Arena) -> Avatar {
        let mut rng = rand::rng();
        let avatar = Avatar {
            id: self.next_avatar_id,
            appearance: rng.random_range(1..=Avatar::APPEARANCES),
            position: arena.random_position(&mut rng),
        };
        self.next_avatar_id = self.next_avatar_id.wrapping_add(1).max(1);
        self.get_or_create(id).avatar = Some(avatar);
        avatar
    }

    /// Removes and returns the avatar of `id`, if it has one.
    pub fn clear_avatar(&mut self, id: ConnectionId) -> Option<Avatar> {
        self.players.get_mut(&id).and_then(|p| p.avatar.take())
    }

    pub fn avatar(&self, id: ConnectionId) -> Option<&Avatar> {
        self.players.get(&id).and_then(|p| p.avatar.as_ref())
    }

    /// Forgets `id` entirely. Its nickname becomes available again.
    pub fn drop_session(&mut self, id: ConnectionId) -> Option<PlayerInfo> {
        let removed = self.players.remove(&id);
        if let Some(info) = &removed {
            tracing::debug!(conn_id = %id, nickname = %info.nickname, "session dropped");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
