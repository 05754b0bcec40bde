//! # tensor-rpc
//!
//! Remote calls from a coordinating master to worker processes in a
//! distributed tensor runtime.
//!
//! A call is a numeric [`FunctionId`] plus a list of scalars, tensor
//! references and shape vectors, flattened into one self-describing buffer
//! by [`tensor_rpc_protocol`]. This crate ties the wire format to a
//! transport and a function table:
//!
//! ```text
//! MasterClient ──pack──▶ Connection ──▶ Worker ──dispatch──▶ FunctionRegistry
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tensor_rpc::prelude::*;
//!
//! # async fn demo() -> Result<(), RpcError> {
//! let (master_end, worker_end) = channel_pair(16);
//!
//! let tensors = std::sync::Arc::new(TensorTable::<Vec<f32>>::new());
//! let mut registry = FunctionRegistry::new();
//! let store = std::sync::Arc::clone(&tensors);
//! registry.register(1u16, move |msg: &mut RpcMessage| {
//!     let id = unpack_tensor_ref(msg)?;
//!     let len = unpack_integer(msg)?;
//!     store.insert(id, vec![0.0; len as usize]);
//!     Ok(None)
//! });
//!
//! let mut worker = Worker::new(worker_end, registry);
//! tokio::spawn(async move { worker.run().await });
//!
//! let master = MasterClient::new(master_end);
//! master.send(&pack!(1, TensorRef(1), 128i64)).await?;
//! master.close().await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod registry;
mod tensor;
mod worker;

pub use client::MasterClient;
pub use config::{ClientConfig, WorkerConfig};
pub use error::RpcError;
pub use registry::{FunctionRegistry, HandlerResult};
pub use tensor::{TensorIdAllocator, TensorStore, TensorTable};
pub use worker::Worker;

pub use tensor_rpc_protocol as protocol;
pub use tensor_rpc_transport as transport;

/// Everything needed to write a master or a worker.
pub mod prelude {
    pub use crate::{
        ClientConfig, FunctionRegistry, HandlerResult, MasterClient, RpcError, TensorIdAllocator,
        TensorStore, TensorTable, Worker, WorkerConfig,
    };
    pub use tensor_rpc_protocol::{
        pack, pack_message, read_scalar, unpack_arg, unpack_call, unpack_float,
        unpack_function_id, unpack_integer, unpack_long_array, unpack_scalar, unpack_tag,
        unpack_tensor_ref, unpack_typed, Arg, FunctionId, Packer, ProtocolConfig, ProtocolError,
        RpcMessage, ScalarKind, ScalarValue, TensorRef, TypeTag,
    };
    pub use tensor_rpc_transport::{
        channel_pair, channel_transport, Connection, Transport, TransportError,
    };
    #[cfg(feature = "websocket")]
    pub use tensor_rpc_transport::{WebSocketConnection, WebSocketTransport};
}
