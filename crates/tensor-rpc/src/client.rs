//! Master side: encodes calls and sends them to a worker.

use tensor_rpc_protocol::{pack_message_with, Arg, FunctionId, RpcMessage};
use tensor_rpc_transport::{Connection, TransportError};

use crate::{ClientConfig, RpcError};

/// Sends calls to one worker over a connection.
pub struct MasterClient<C> {
    conn: C,
    config: ClientConfig,
}

impl<C> MasterClient<C>
where
    C: Connection<Error = TransportError>,
{
    /// Wraps a connection to a worker.
    pub fn new(conn: C) -> Self {
        Self::with_config(conn, ClientConfig::default())
    }

    /// Wraps a connection using a custom configuration.
    pub fn with_config(conn: C, config: ClientConfig) -> Self {
        Self { conn, config }
    }

    /// Encodes and sends a call. Does not wait for a reply.
    pub async fn call(&self, function_id: FunctionId, args: &[Arg]) -> Result<(), RpcError> {
        let message = pack_message_with(&self.config.protocol, function_id, args);
        self.send(&message).await
    }

    /// Sends a message built elsewhere, typically with
    /// [`pack!`](tensor_rpc_protocol::pack).
    pub async fn send(&self, message: &RpcMessage) -> Result<(), RpcError> {
        tracing::trace!(conn = %self.conn.id(), len = message.len(), "sending call");
        self.conn.send_message(message).await?;
        Ok(())
    }

    /// Sends a call and waits for the worker's reply.
    ///
    /// Replies carry no call identifier, so only one call may be awaiting
    /// its reply at a time. A `Timeout` caused by a slow handler (rather than
    /// a failed one) leaves a late reply in flight that the next call would
    /// take as its own; close the connection unless the handler is known to
    /// have failed.
    ///
    /// # Errors
    /// - `ConnectionClosed` if the worker hangs up before replying.
    /// - `Timeout` if no reply arrives within `reply_timeout`. This is what
    ///   a failing handler looks like from the master's side, since the
    ///   worker sends nothing back for it.
    pub async fn call_with_reply(
        &self,
        function_id: FunctionId,
        args: &[Arg],
    ) -> Result<RpcMessage, RpcError> {
        self.call(function_id, args).await?;
        let received = match self.config.reply_timeout {
            Some(limit) => tokio::time::timeout(limit, self.conn.recv_message())
                .await
                .map_err(|_| {
                    tracing::warn!(conn = %self.conn.id(), %function_id, "no reply from worker");
                    RpcError::Timeout(limit)
                })?,
            None => self.conn.recv_message().await,
        };
        received?.ok_or(RpcError::ConnectionClosed)
    }

    /// Closes the connection, which ends the worker's loop cleanly.
    pub async fn close(&self) -> Result<(), RpcError> {
        self.conn.close().await?;
        Ok(())
    }

    /// The underlying connection.
    pub fn connection(&self) -> &C {
        &self.conn
    }
}
