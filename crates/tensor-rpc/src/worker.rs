//! Worker loop: receive, dispatch, reply.
//!
//! The flow for every message is:
//!   1. Receive one complete buffer and wrap it in a fresh envelope
//!   2. Read the function id and run the registered handler
//!   3. Send the handler's reply, if it produced one
//!
//! A malformed message (truncated, unknown tag, unknown function, leftover
//! bytes) is discarded and ends the loop with the error: the two peers no
//! longer agree on the wire format, so nothing after it can be trusted.
//! A handler that fails on a well-formed call is logged and the loop moves
//! on to the next message.

use tensor_rpc_transport::{Connection, TransportError};

use crate::{FunctionRegistry, RpcError, WorkerConfig};

/// Serves calls from the master over one connection.
pub struct Worker<C> {
    conn: C,
    registry: FunctionRegistry,
    config: WorkerConfig,
    handled: u64,
}

impl<C> Worker<C>
where
    C: Connection<Error = TransportError>,
{
    /// Creates a worker with the default configuration.
    pub fn new(conn: C, registry: FunctionRegistry) -> Self {
        Self::with_config(conn, registry, WorkerConfig::default())
    }

    /// Creates a worker with a custom configuration.
    pub fn with_config(conn: C, registry: FunctionRegistry, config: WorkerConfig) -> Self {
        Self {
            conn,
            registry,
            config,
            handled: 0,
        }
    }

    /// Number of messages dispatched so far.
    pub fn handled(&self) -> u64 {
        self.handled
    }

    /// Runs until the master closes the connection or a fatal error occurs.
    ///
    /// # Errors
    /// - `Timeout` if no message arrives within `idle_timeout`.
    /// - `Transport` if receiving or replying fails.
    /// - `Protocol` / `UnknownFunction` for a malformed message.
    pub async fn run(&mut self) -> Result<(), RpcError> {
        let worker = self.config.name.as_str();
        let conn_id = self.conn.id();
        tracing::info!(worker, %conn_id, functions = self.registry.len(), "worker started");

        loop {
            let received = match self.config.idle_timeout {
                Some(limit) => tokio::time::timeout(limit, self.conn.recv_message())
                    .await
                    .map_err(|_| {
                        tracing::info!(worker, %conn_id, "connection timed out");
                        RpcError::Timeout(limit)
                    })?,
                None => self.conn.recv_message().await,
            };

            let message = match received {
                Ok(Some(message)) => message,
                Ok(None) => {
                    tracing::info!(worker, %conn_id, handled = self.handled, "connection closed cleanly");
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!(worker, %conn_id, error = %e, "recv error");
                    return Err(e.into());
                }
            };

            self.handled += 1;
            match self.registry.dispatch(message) {
                Ok(Some(reply)) => self.conn.send_message(&reply).await?,
                Ok(None) => {}
                Err(e) if e.is_malformed_message() => {
                    tracing::warn!(worker, %conn_id, error = %e, "discarding malformed message");
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!(worker, %conn_id, error = %e, "handler failed");
                }
            }
        }
    }

    /// Consumes the worker and returns its connection and registry.
    pub fn into_parts(self) -> (C, FunctionRegistry) {
        (self.conn, self.registry)
    }
}
