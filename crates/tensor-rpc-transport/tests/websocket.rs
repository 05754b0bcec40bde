//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on a random port and verify that encoded
//! messages cross the socket intact, one frame per message.

#[cfg(feature = "websocket")]
mod websocket {
    use tensor_rpc_protocol::{
        pack, unpack_call, unpack_function_id, unpack_long_array, Arg, FunctionId, TensorRef,
    };
    use tensor_rpc_transport::{Connection, Transport, WebSocketConnection, WebSocketTransport};

    /// Binds on an OS-assigned port and connects one client to it.
    async fn connected_pair() -> (WebSocketConnection, WebSocketConnection) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have local addr");

        let server_handle =
            tokio::spawn(async move { transport.accept().await.expect("should accept") });

        let client = WebSocketConnection::connect(&format!("ws://{addr}"))
            .await
            .expect("client should connect");
        let server = server_handle.await.expect("task should complete");
        (server, client)
    }

    #[tokio::test]
    async fn test_message_crosses_socket_intact() {
        let (server, client) = connected_pair().await;
        assert_ne!(server.id(), client.id());

        let sent = pack!(7, 42i32, TensorRef(900_719_925_474_099), [1i64, 2, 3]);
        client.send_message(&sent).await.expect("send should succeed");

        let mut received = server
            .recv_message()
            .await
            .expect("recv should succeed")
            .expect("should have a message");
        assert_eq!(received.as_bytes(), sent.as_bytes());

        let (function_id, args) = unpack_call(&mut received).unwrap();
        assert_eq!(function_id, FunctionId(7));
        assert_eq!(
            args,
            vec![
                Arg::from(42i32),
                Arg::from(TensorRef(900_719_925_474_099)),
                Arg::from(vec![1i64, 2, 3]),
            ]
        );
    }

    #[tokio::test]
    async fn test_messages_keep_their_boundaries() {
        let (server, client) = connected_pair().await;

        client.send_message(&pack!(1, [5i64; 4])).await.unwrap();
        client.send_message(&pack!(2)).await.unwrap();

        let mut first = server.recv_message().await.unwrap().unwrap();
        assert_eq!(unpack_function_id(&mut first).unwrap(), FunctionId(1));
        assert_eq!(unpack_long_array(&mut first).unwrap(), vec![5; 4]);
        assert!(first.is_exhausted());

        let mut second = server.recv_message().await.unwrap().unwrap();
        assert_eq!(unpack_function_id(&mut second).unwrap(), FunctionId(2));
        assert!(second.is_exhausted());
    }

    #[tokio::test]
    async fn test_recv_returns_none_on_peer_close() {
        let (server, client) = connected_pair().await;
        client.close().await.expect("close should succeed");

        let result = server.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on peer close");
    }
}
