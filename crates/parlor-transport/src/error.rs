use crate::ConnectionId;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer closed the stream (orderly shutdown or local close).
    #[error("connection {0} closed")]
    ConnectionClosed(ConnectionId),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Resolving or binding the listen address failed.
    #[error("bind failed: {0}")]
    BindFailed(#[source] std::io::Error),

    /// Accepting a pending connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// Connecting to a remote listener failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),
}

impl TransportError {
    /// Returns `true` if the error means the stream is gone for good.
    ///
    /// Every variant except a failed bind/accept/connect describes a
    /// stream that can no longer carry data.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed(_) | Self::SendFailed(_) | Self::ReceiveFailed(_)
        )
    }
}
