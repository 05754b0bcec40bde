//! Function registry: maps a message's leading function id to a handler.

use std::collections::HashMap;
use std::fmt;

use tensor_rpc_protocol::{expect_exhausted, unpack_function_id, FunctionId, RpcMessage};

use crate::RpcError;

/// What a handler returns: an optional reply for the caller.
pub type HandlerResult = Result<Option<RpcMessage>, RpcError>;

type BoxedHandler = Box<dyn Fn(&mut RpcMessage) -> HandlerResult + Send + Sync>;

/// The table of callable functions on a worker.
///
/// Both peers must agree on the id → function mapping out of band, the same
/// way they agree on the tag table.
#[derive(Default)]
pub struct FunctionRegistry {
    handlers: HashMap<FunctionId, BoxedHandler>,
}

impl FunctionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `function_id`, replacing any previous
    /// handler for that id.
    ///
    /// The handler receives the message with its cursor just past the
    /// function id. It must read its arguments in exactly the order and
    /// with exactly the types the master wrote them; bytes left over
    /// afterwards fail the dispatch with `ProtocolError::TrailingBytes`.
    pub fn register<F>(&mut self, function_id: impl Into<FunctionId>, handler: F) -> &mut Self
    where
        F: Fn(&mut RpcMessage) -> HandlerResult + Send + Sync + 'static,
    {
        let function_id = function_id.into();
        if self.handlers.insert(function_id, Box::new(handler)).is_some() {
            tracing::warn!(%function_id, "replaced existing handler");
        }
        self
    }

    /// Returns `true` if a handler is registered for `function_id`.
    pub fn contains(&self, function_id: FunctionId) -> bool {
        self.handlers.contains_key(&function_id)
    }

    /// Number of registered functions.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Reads the function id, runs the matching handler and checks that it
    /// consumed the whole message.
    ///
    /// # Errors
    /// - `UnknownFunction` if no handler is registered for the id.
    /// - `Protocol` if the message is truncated, malformed, or has bytes
    ///   left after the handler returns.
    /// - whatever the handler itself returns.
    pub fn dispatch(&self, mut message: RpcMessage) -> HandlerResult {
        let function_id = unpack_function_id(&mut message)?;
        let handler = self
            .handlers
            .get(&function_id)
            .ok_or(RpcError::UnknownFunction(function_id))?;

        tracing::debug!(%function_id, len = message.len(), "dispatching call");
        let reply = handler(&mut message)?;
        expect_exhausted(&message)?;
        Ok(reply)
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.handlers.keys().map(|id| id.0).collect();
        ids.sort_unstable();
        f.debug_struct("FunctionRegistry")
            .field("functions", &ids)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_rpc_protocol::{pack, unpack_integer, ProtocolError};

    fn add_registry() -> FunctionRegistry {
        let mut registry = FunctionRegistry::new();
        registry.register(1u16, |msg: &mut RpcMessage| {
            let a = unpack_integer(msg)?;
            let b = unpack_integer(msg)?;
            Ok(Some(pack!(1, a + b)))
        });
        registry
    }

    #[test]
    fn test_dispatch_runs_handler_and_returns_reply() {
        let registry = add_registry();
        let mut reply = registry.dispatch(pack!(1, 2i32, 40i64)).unwrap().unwrap();
        unpack_function_id(&mut reply).unwrap();
        assert_eq!(unpack_integer(&mut reply).unwrap(), 42);
    }

    #[test]
    fn test_dispatch_unknown_function() {
        let registry = add_registry();
        assert!(matches!(
            registry.dispatch(pack!(9)),
            Err(RpcError::UnknownFunction(FunctionId(9)))
        ));
    }

    #[test]
    fn test_dispatch_rejects_trailing_arguments() {
        let registry = add_registry();
        let err = registry.dispatch(pack!(1, 1i32, 2i32, 3i32)).unwrap_err();
        assert!(matches!(
            err,
            RpcError::Protocol(ProtocolError::TrailingBytes(5))
        ));
    }

    #[test]
    fn test_dispatch_propagates_decode_errors() {
        let registry = add_registry();
        let err = registry.dispatch(pack!(1, 1i32)).unwrap_err();
        assert!(matches!(
            err,
            RpcError::Protocol(ProtocolError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_dispatch_empty_buffer() {
        let registry = add_registry();
        let err = registry.dispatch(RpcMessage::new(vec![1])).unwrap_err();
        assert!(err.is_malformed_message());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = add_registry();
        registry.register(FunctionId(1), |_: &mut RpcMessage| Ok(None));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(FunctionId(1)));
        assert!(registry.dispatch(pack!(1)).unwrap().is_none());
    }

    #[test]
    fn test_debug_lists_function_ids() {
        let mut registry = add_registry();
        registry.register(0u16, |_: &mut RpcMessage| Ok(None));
        assert_eq!(
            format!("{registry:?}"),
            "FunctionRegistry { functions: [0, 1] }"
        );
    }
}
