//! Error types for the session layer.

/// Errors from claiming a nickname.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Another connection already holds this nickname (ignoring case).
    #[error("nickname '{0}' is already taken")]
    NicknameTaken(String),

    /// The nickname is empty, all whitespace, or too long.
    #[error("invalid nickname: {0}")]
    InvalidNickname(String),
}
