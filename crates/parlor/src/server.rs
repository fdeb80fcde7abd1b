//! `ParlorServer` builder and server loop.
//!
//! This is the entry point for running a Parlor server. It ties the
//! layers together: transport → protocol → rooms, paced by the tick
//! scheduler.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use parlor_protocol::{Codec, MessageChannel};
use parlor_room::{RoomConfig, ServerEvent};
use parlor_tick::{TickPolicy, TickScheduler};
use parlor_transport::{TcpTransport, Transport};
use tokio::sync::broadcast;

use crate::{CodecKind, ParlorError, Router, ServerConfig};

/// Builder for configuring and starting a Parlor server.
///
/// # Example
///
/// ```rust,ignore
/// use parlor::prelude::*;
///
/// let server = ParlorServer::builder()
///     .bind("0.0.0.0:55555")
///     .tick_rate(20)
///     .build()
///     .await?;
/// server.run().await
/// ```
#[derive(Debug, Clone, Default)]
pub struct ParlorServerBuilder {
    config: ServerConfig,
}

impl ParlorServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every setting at once, e.g. with a loaded file.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind = addr.to_string();
        self
    }

    pub fn backlog(mut self, backlog: u32) -> Self {
        self.config.backlog = backlog;
        self
    }

    pub fn tick_rate(mut self, hz: u32) -> Self {
        self.config.tick_rate_hz = hz;
        self
    }

    pub fn tick_policy(mut self, policy: TickPolicy) -> Self {
        self.config.tick_policy = policy;
        self
    }

    pub fn codec(mut self, codec: CodecKind) -> Self {
        self.config.codec = codec;
        self
    }

    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    /// Validates the settings and binds the listener.
    ///
    /// Must be called inside a Tokio runtime.
    pub async fn build(self) -> Result<ParlorServer, ParlorError> {
        let config = self.config;
        config.validate()?;
        let transport = TcpTransport::bind(&config.bind, config.backlog).await?;
        let scheduler = TickScheduler::new(config.tick_config())?;
        let codec = config.codec.build();
        tracing::info!(
            addr = %transport.local_addr()?,
            codec = codec.name(),
            tick_rate_hz = config.tick_rate_hz,
            "server bound"
        );
        Ok(ParlorServer {
            transport,
            scheduler,
            router: Router::new(config.room),
            codec,
            max_frame_len: config.max_frame_len,
        })
    }
}

/// A bound Parlor server.
///
/// Call [`run()`](Self::run) to start serving.
pub struct ParlorServer {
    transport: TcpTransport,
    scheduler: TickScheduler,
    router: Router,
    codec: Arc<dyn Codec>,
    max_frame_len: usize,
}

impl ParlorServer {
    pub fn builder() -> ParlorServerBuilder {
        ParlorServerBuilder::new()
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ParlorError> {
        Ok(self.transport.local_addr()?)
    }

    /// See [`Router::subscribe`].
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.router.subscribe()
    }

    /// Serves until Ctrl-C.
    pub async fn run(self) -> Result<(), ParlorError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
        })
        .await
    }

    /// Serves until `shutdown` completes, then closes every connection.
    ///
    /// Each tick accepts whatever connections are pending, then updates
    /// every room once. The wait for the next tick is the loop's only
    /// suspension point.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> Result<(), ParlorError> {
        tracing::info!("Parlor server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
                tick = self.scheduler.wait_for_tick() => {
                    self.router.advance_clock(tick.started_at);
                    self.accept_pending();
                    self.router.tick(tick.started_at);
                    self.scheduler.record_tick_end();
                }
            }
        }

        self.router.shutdown();
        tracing::info!(ticks = self.scheduler.tick_count(), "server stopped");
        Ok(())
    }

    /// Drains the accept queue into the login room.
    fn accept_pending(&mut self) {
        loop {
            match self.transport.try_accept() {
                Ok(Some(conn)) => {
                    let channel = MessageChannel::with_max_frame_len(
                        conn,
                        Arc::clone(&self.codec),
                        self.max_frame_len,
                    );
                    self.router.accept_connection(channel);
                }
                Ok(None) => return,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    return;
                }
            }
        }
    }
}
