//! Wire protocol for tensor RPC.
//!
//! A call is a [`FunctionId`] followed by a heterogeneous argument list.
//! This crate flattens a call into one contiguous buffer and reads it back:
//!
//! - **Types** ([`TypeTag`], [`ScalarKind`], [`Arg`], [`TensorRef`]):
//!   the closed tag table and the three argument shapes.
//! - **Codec** ([`Packer`], [`pack_message`], [`pack!`], [`read_scalar`]):
//!   the encoder and the raw scalar decoder.
//! - **Envelope** ([`RpcMessage`]): owned buffer plus read cursor.
//! - **Unpack** ([`unpack_arg`], [`unpack_call`], ...): tag-checked reads
//!   for code that dispatches on the decoded arguments.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Wire format
//!
//! ```text
//! Message   := FunctionId(u16) Arg*
//! ScalarArg := Tag(1) Value(width of kind)
//! TensorArg := 'T' Id(u64)
//! ArrayArg  := 'F' Length(i64) Element(i64)*Length
//! ```
//!
//! Byte order and widths are native; both peers must share them. The tag
//! table carries no version, so both sides must be built from the same
//! source.
//!
//! # Example
//!
//! ```rust
//! use tensor_rpc_protocol::{pack, unpack_function_id, unpack_integer, unpack_tensor_ref, TensorRef};
//!
//! let mut msg = pack!(7, 42i32, TensorRef(900));
//!
//! assert_eq!(unpack_function_id(&mut msg).unwrap().0, 7);
//! assert_eq!(unpack_integer(&mut msg).unwrap(), 42);
//! assert_eq!(unpack_tensor_ref(&mut msg).unwrap(), TensorRef(900));
//! assert!(msg.is_exhausted());
//! ```

mod codec;
mod config;
mod error;
mod message;
mod types;
mod unpack;

pub use codec::{pack_message, pack_message_with, read_scalar, unpack_scalar, PackArg, Packer};
pub use config::{ProtocolConfig, DEFAULT_INITIAL_CAPACITY};
pub use error::ProtocolError;
pub use message::RpcMessage;
pub use types::{
    Arg, FunctionId, Scalar, ScalarKind, ScalarValue, TensorRef, TypeTag, LONG_WIDTH,
};
pub use unpack::{
    expect_exhausted, unpack_arg, unpack_call, unpack_float, unpack_function_id,
    unpack_integer, unpack_long_array, unpack_tag, unpack_tensor_ref, unpack_typed,
};
