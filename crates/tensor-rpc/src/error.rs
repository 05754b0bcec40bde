//! Unified error type for tensor RPC.

use std::time::Duration;

use tensor_rpc_protocol::{FunctionId, ProtocolError, TensorRef};
use tensor_rpc_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on the wrapper variants auto-generates `From`
/// impls, so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// A transport-level error (connection, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A malformed or truncated message. Fatal to the message.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// No handler is registered for the message's function id.
    #[error("no handler registered for {0}")]
    UnknownFunction(FunctionId),

    /// A tensor reference that the local tensor store does not know.
    #[error("unknown tensor {0}")]
    UnknownTensor(TensorRef),

    /// A handler decoded its arguments but failed to carry out the call.
    #[error("handler failed: {0}")]
    Handler(String),

    /// No message arrived within the configured idle timeout.
    #[error("no message received for {0:?}")]
    Timeout(Duration),

    /// The peer closed the connection while a reply was expected.
    #[error("connection closed while awaiting reply")]
    ConnectionClosed,
}

impl RpcError {
    /// Shorthand for [`RpcError::Handler`].
    pub fn handler(msg: impl Into<String>) -> Self {
        Self::Handler(msg.into())
    }

    /// Returns `true` if the error means the message itself could not be
    /// trusted, as opposed to a failure while executing a valid call.
    pub fn is_malformed_message(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::UnknownFunction(_))
    }
}
