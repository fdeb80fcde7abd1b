//! Integration tests for the TCP transport.
//!
//! These bind a real loopback listener and talk to it with a real
//! client socket. Everything is non-blocking, so each test polls with a
//! short sleep until the expected data shows up.

#[cfg(feature = "tcp")]
mod tcp {
    use std::time::Duration;

    use parlor_transport::{Connection, TcpConnection, TcpTransport, Transport};

    /// Polls `f` until it yields `Some`, giving up after about two seconds.
    async fn poll_until<T>(mut f: impl FnMut() -> Option<T>) -> T {
        for _ in 0..200 {
            if let Some(v) = f() {
                return v;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    async fn read_exact(conn: &mut TcpConnection, len: usize) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 64];
        poll_until(|| {
            if let Some(n) = conn.try_read(&mut buf).expect("read should succeed") {
                out.extend_from_slice(&buf[..n]);
            }
            (out.len() >= len).then_some(())
        })
        .await;
        out
    }

    #[tokio::test]
    async fn test_tcp_accept_and_exchange_bytes() {
        let mut transport = TcpTransport::bind("127.0.0.1:0", 16)
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have an address");

        // Nothing pending yet.
        assert!(transport.try_accept().expect("accept").is_none());

        let mut client = TcpConnection::connect(addr).expect("client should connect");
        let mut server = poll_until(|| transport.try_accept().expect("accept")).await;

        assert!(server.id().into_inner() > 0);
        assert_ne!(server.id(), client.id());
        assert!(server.peer_addr().is_some());

        // Server -> client
        assert_eq!(server.try_write(b"hello").unwrap(), Some(5));
        assert_eq!(read_exact(&mut client, 5).await, b"hello");

        // Client -> server
        client.try_write(b"world!").unwrap();
        assert_eq!(read_exact(&mut server, 6).await, b"world!");
    }

    #[tokio::test]
    async fn test_tcp_read_without_data_would_block() {
        let mut transport = TcpTransport::bind("127.0.0.1:0", 16).await.unwrap();
        let addr = transport.local_addr().unwrap();
        let _client = TcpConnection::connect(addr).unwrap();
        let mut server = poll_until(|| transport.try_accept().unwrap()).await;

        let mut buf = [0u8; 8];
        assert_eq!(server.try_read(&mut buf).unwrap(), None);
        assert!(server.is_alive());
    }

    #[tokio::test]
    async fn test_tcp_peer_close_is_detected() {
        let mut transport = TcpTransport::bind("127.0.0.1:0", 16).await.unwrap();
        let addr = transport.local_addr().unwrap();
        let mut client = TcpConnection::connect(addr).unwrap();
        let mut server = poll_until(|| transport.try_accept().unwrap()).await;

        client.close().unwrap();
        assert!(!client.is_alive());

        poll_until(|| (!server.is_alive()).then_some(())).await;

        let mut buf = [0u8; 8];
        let err = server.try_read(&mut buf).unwrap_err();
        assert!(err.is_disconnect());
    }
}
