//! Unified error type for the Parlor server.

use std::path::PathBuf;

use parlor_protocol::{ChannelError, ProtocolError};
use parlor_room::RoomError;
use parlor_session::SessionError;
use parlor_tick::TickError;
use parlor_transport::TransportError;

/// Problems with the server configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// The values parse but can't work together.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ParlorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Binding or accepting failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Tick(#[from] TickError),
}

#[cfg(test)]
mod tests {
    use parlor_transport::ConnectionId;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed(ConnectionId::new(7));
        let parlor_err: ParlorError = err.into();
        assert!(matches!(parlor_err, ParlorError::Transport(_)));
        assert!(parlor_err.to_string().contains("conn-7"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::UnknownMessageType(99);
        let parlor_err: ParlorError = err.into();
        assert!(matches!(parlor_err, ParlorError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::NicknameTaken("alice".into());
        let parlor_err: ParlorError = err.into();
        assert!(matches!(parlor_err, ParlorError::Session(_)));
    }

    #[test]
    fn test_from_tick_error() {
        let parlor_err: ParlorError = TickError::InvalidRate(0).into();
        assert!(matches!(parlor_err, ParlorError::Tick(_)));
    }

    #[test]
    fn test_config_error_is_transparent() {
        let parlor_err: ParlorError = ConfigError::Invalid("backlog is zero".into()).into();
        assert_eq!(parlor_err.to_string(), "invalid config: backlog is zero");
    }
}
