//! In-process transport over Tokio channels.
//!
//! Used for workers that live in the same process as the master, and for
//! tests. Buffers are moved through the channel, never copied a second
//! time.

use tokio::sync::{mpsc, Mutex};

use crate::{Connection, ConnectionId, Transport, TransportError};

/// One end of an in-process connection.
pub struct ChannelConnection {
    id: ConnectionId,
    tx: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    rx: Mutex<mpsc::Receiver<Vec<u8>>>,
}

/// Creates two connected ends. `capacity` bounds the number of in-flight
/// messages per direction; a full channel makes `send` wait.
pub fn channel_pair(capacity: usize) -> (ChannelConnection, ChannelConnection) {
    let capacity = capacity.max(1);
    let (a_tx, b_rx) = mpsc::channel(capacity);
    let (b_tx, a_rx) = mpsc::channel(capacity);
    let a = ChannelConnection {
        id: ConnectionId::next(),
        tx: Mutex::new(Some(a_tx)),
        rx: Mutex::new(a_rx),
    };
    let b = ChannelConnection {
        id: ConnectionId::next(),
        tx: Mutex::new(Some(b_tx)),
        rx: Mutex::new(b_rx),
    };
    tracing::debug!(a = %a.id, b = %b.id, capacity, "created channel pair");
    (a, b)
}

impl Connection for ChannelConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        // Clone the sender so a send parked on a full channel does not hold
        // the lock that `close` needs.
        let tx = self.tx.lock().await.clone().ok_or_else(|| {
            TransportError::ConnectionClosed(format!("{} closed locally", self.id))
        })?;
        tx.send(data.to_vec())
            .await
            .map_err(|_| TransportError::ConnectionClosed(format!("peer of {} dropped", self.id)))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.rx.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        // Dropping the sender ends the peer's stream once it drains and any
        // sends still in flight have finished.
        if self.tx.lock().await.take().is_some() {
            tracing::debug!(id = %self.id, "channel connection closed");
        }
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Listener side of the in-process transport.
///
/// Paired with a [`ChannelConnector`] created by [`channel_transport`].
pub struct ChannelTransport {
    incoming: Mutex<mpsc::Receiver<ChannelConnection>>,
}

/// Dialer side of the in-process transport.
#[derive(Clone)]
pub struct ChannelConnector {
    outgoing: mpsc::Sender<ChannelConnection>,
    capacity: usize,
}

/// Creates a listener and a connector. Each [`ChannelConnector::connect`]
/// yields one end of a fresh pair and queues the other end for
/// [`Transport::accept`].
pub fn channel_transport(capacity: usize) -> (ChannelTransport, ChannelConnector) {
    let (outgoing, incoming) = mpsc::channel(capacity.max(1));
    (
        ChannelTransport {
            incoming: Mutex::new(incoming),
        },
        ChannelConnector { outgoing, capacity },
    )
}

impl ChannelConnector {
    /// Opens a new connection to the paired [`ChannelTransport`].
    pub async fn connect(&self) -> Result<ChannelConnection, TransportError> {
        let (local, remote) = channel_pair(self.capacity);
        self.outgoing
            .send(remote)
            .await
            .map_err(|_| TransportError::Shutdown)?;
        Ok(local)
    }
}

impl Transport for ChannelTransport {
    type Connection = ChannelConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let conn = self
            .incoming
            .get_mut()
            .recv()
            .await
            .ok_or(TransportError::Shutdown)?;
        tracing::debug!(id = %conn.id, "accepted channel connection");
        Ok(conn)
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        self.incoming.lock().await.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_rpc_protocol::{pack, unpack_call, FunctionId, TensorRef};

    #[tokio::test]
    async fn test_pair_carries_bytes_both_ways() {
        let (a, b) = channel_pair(4);
        a.send(b"ping").await.unwrap();
        assert_eq!(b.recv().await.unwrap().unwrap(), b"ping");
        b.send(b"pong").await.unwrap();
        assert_eq!(a.recv().await.unwrap().unwrap(), b"pong");
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_messages_arrive_as_fresh_envelopes() {
        let (a, b) = channel_pair(4);
        let sent = pack!(3, 1i32, TensorRef(8));
        a.send_message(&sent).await.unwrap();

        let mut received = b.recv_message().await.unwrap().unwrap();
        assert_eq!(received.offset(), 0);
        assert_eq!(received.as_bytes(), sent.as_bytes());
        let (function_id, args) = unpack_call(&mut received).unwrap();
        assert_eq!(function_id, FunctionId(3));
        assert_eq!(args.len(), 2);
    }

    #[tokio::test]
    async fn test_close_ends_peer_stream() {
        let (a, b) = channel_pair(4);
        a.send(b"last").await.unwrap();
        a.close().await.unwrap();
        assert_eq!(b.recv().await.unwrap().unwrap(), b"last");
        assert!(b.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (a, _b) = channel_pair(4);
        a.close().await.unwrap();
        assert!(matches!(
            a.send(b"x").await,
            Err(TransportError::ConnectionClosed(_))
        ));
    }

    #[tokio::test]
    async fn test_close_while_send_is_parked() {
        let (a, b) = channel_pair(1);
        let a = std::sync::Arc::new(a);
        a.send(b"one").await.unwrap();

        let parked = {
            let a = std::sync::Arc::clone(&a);
            tokio::spawn(async move { a.send(b"two").await })
        };
        tokio::task::yield_now().await;

        tokio::time::timeout(std::time::Duration::from_secs(1), a.close())
            .await
            .expect("close waited on a parked send")
            .unwrap();
        assert!(matches!(
            a.send(b"three").await,
            Err(TransportError::ConnectionClosed(_))
        ));

        assert_eq!(b.recv().await.unwrap().unwrap(), b"one");
        assert_eq!(b.recv().await.unwrap().unwrap(), b"two");
        parked.await.unwrap().unwrap();
        assert!(b.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_send_to_dropped_peer_fails() {
        let (a, b) = channel_pair(4);
        drop(b);
        assert!(matches!(
            a.send(b"x").await,
            Err(TransportError::ConnectionClosed(_))
        ));
    }

    #[tokio::test]
    async fn test_transport_accepts_connected_peers() {
        let (mut transport, connector) = channel_transport(4);
        let client = connector.connect().await.unwrap();
        let server = transport.accept().await.unwrap();

        client.send(b"hello").await.unwrap();
        assert_eq!(server.recv().await.unwrap().unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_shutdown_stops_new_connections() {
        let (mut transport, connector) = channel_transport(4);
        transport.shutdown().await.unwrap();
        assert!(matches!(
            connector.connect().await,
            Err(TransportError::Shutdown)
        ));
        assert!(matches!(
            transport.accept().await,
            Err(TransportError::Shutdown)
        ));
    }
}
