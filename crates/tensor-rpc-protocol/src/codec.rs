//! Encoder and scalar decoder.
//!
//! Encoding walks the argument list left to right and appends, for each
//! argument, a tag byte followed by its payload:
//!
//! ```text
//! Message   := FunctionId Arg*
//! ScalarArg := Tag(1) Value(width of kind)
//! TensorArg := 'T' Id(u64)
//! ArrayArg  := 'F' Length(i64) Element(i64)*Length
//! ```
//!
//! All values use native byte order. Decoding is the mirror image, but the
//! primitive here ([`read_scalar`]) only reinterprets bytes. Choosing what
//! to read next from the tag is the caller's job; the `unpack_*` helpers
//! do that for the common cases.

use crate::types::LONG_WIDTH;
use crate::{
    Arg, FunctionId, ProtocolConfig, ProtocolError, RpcMessage, Scalar, ScalarKind, ScalarValue,
    TensorRef, TypeTag,
};

// ---------------------------------------------------------------------------
// Packer
// ---------------------------------------------------------------------------

/// Builds one message, argument by argument.
///
/// The function id is written on construction. Nothing is visible to other
/// code until [`finish`](Self::finish) moves the buffer into an
/// [`RpcMessage`].
#[derive(Debug)]
pub struct Packer {
    function_id: FunctionId,
    buf: Vec<u8>,
    args: usize,
}

impl Packer {
    /// Starts a message for `function_id` with the default capacity hint.
    pub fn new(function_id: FunctionId) -> Self {
        Self::with_config(&ProtocolConfig::default(), function_id)
    }

    /// Starts a message for `function_id` using `config`.
    pub fn with_config(config: &ProtocolConfig, function_id: FunctionId) -> Self {
        let mut buf = Vec::with_capacity(config.initial_capacity);
        buf.extend_from_slice(&function_id.0.to_ne_bytes());
        Self {
            function_id,
            buf,
            args: 0,
        }
    }

    /// Appends a scalar: tag, then raw bytes at native width.
    pub fn scalar<T: Scalar>(&mut self, value: T) -> &mut Self {
        self.scalar_value(value.into_value())
    }

    /// Appends an already-wrapped scalar.
    pub fn scalar_value(&mut self, value: ScalarValue) -> &mut Self {
        self.buf.push(value.kind().tag_byte());
        value.write_ne(&mut self.buf);
        self.args += 1;
        self
    }

    /// Appends a tensor reference: `'T'`, then the 8-byte identifier.
    pub fn tensor(&mut self, tensor: TensorRef) -> &mut Self {
        self.buf.push(TypeTag::TENSOR_BYTE);
        self.buf.extend_from_slice(&tensor.0.to_ne_bytes());
        self.args += 1;
        self
    }

    /// Appends a long array: `'F'`, the length as `i64`, then each element.
    pub fn long_array(&mut self, items: &[i64]) -> &mut Self {
        self.buf.reserve(1 + LONG_WIDTH * (1 + items.len()));
        self.buf.push(TypeTag::LONG_ARRAY_BYTE);
        // A slice never holds more than isize::MAX elements.
        let len = items.len() as i64;
        self.buf.extend_from_slice(&len.to_ne_bytes());
        for item in items {
            self.buf.extend_from_slice(&item.to_ne_bytes());
        }
        self.args += 1;
        self
    }

    /// Appends any argument by its shape.
    pub fn push(&mut self, arg: &Arg) -> &mut Self {
        match arg {
            Arg::Scalar(value) => self.scalar_value(*value),
            Arg::Tensor(tensor) => self.tensor(*tensor),
            Arg::LongArray(items) => self.long_array(items),
        }
    }

    /// Appends anything implementing [`PackArg`].
    pub fn arg<A: PackArg + ?Sized>(&mut self, arg: &A) -> &mut Self {
        arg.pack_into(self);
        self
    }

    /// Bytes written so far, function id included.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Always `false`: the function id is written on construction.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Finishes the message and hands over the buffer.
    pub fn finish(self) -> RpcMessage {
        tracing::trace!(
            function_id = %self.function_id,
            args = self.args,
            len = self.buf.len(),
            "packed rpc message"
        );
        RpcMessage::new(self.buf)
    }
}

// ---------------------------------------------------------------------------
// PackArg: compile-time selection of the encoding rule
// ---------------------------------------------------------------------------

/// A value that can be written as one RPC argument.
///
/// The impl is chosen from the static type, never from the value, so the
/// set of encodable types is fixed at compile time. Passing anything else
/// to [`pack!`](crate::pack) fails to compile.
pub trait PackArg {
    /// Appends this value's tag and payload.
    fn pack_into(&self, packer: &mut Packer);
}

macro_rules! impl_pack_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl PackArg for $ty {
                fn pack_into(&self, packer: &mut Packer) {
                    packer.scalar(*self);
                }
            }
        )*
    };
}

impl_pack_scalar!(i8, u8, i16, u16, i32, u32, i64, u64, f32, f64, bool);

impl PackArg for ScalarValue {
    fn pack_into(&self, packer: &mut Packer) {
        packer.scalar_value(*self);
    }
}

impl PackArg for TensorRef {
    fn pack_into(&self, packer: &mut Packer) {
        packer.tensor(*self);
    }
}

impl PackArg for [i64] {
    fn pack_into(&self, packer: &mut Packer) {
        packer.long_array(self);
    }
}

impl<const N: usize> PackArg for [i64; N] {
    fn pack_into(&self, packer: &mut Packer) {
        packer.long_array(self);
    }
}

impl PackArg for Vec<i64> {
    fn pack_into(&self, packer: &mut Packer) {
        packer.long_array(self);
    }
}

impl PackArg for Arg {
    fn pack_into(&self, packer: &mut Packer) {
        packer.push(self);
    }
}

impl<T: PackArg + ?Sized> PackArg for &T {
    fn pack_into(&self, packer: &mut Packer) {
        (**self).pack_into(packer);
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Encodes a call: the function id, then every argument in order.
pub fn pack_message(function_id: FunctionId, args: &[Arg]) -> RpcMessage {
    pack_message_with(&ProtocolConfig::default(), function_id, args)
}

/// Like [`pack_message`] with an explicit configuration.
pub fn pack_message_with(
    config: &ProtocolConfig,
    function_id: FunctionId,
    args: &[Arg],
) -> RpcMessage {
    let mut packer = Packer::with_config(config, function_id);
    for arg in args {
        packer.push(arg);
    }
    packer.finish()
}

/// Encodes a call from heterogeneous arguments.
///
/// Each argument may be any [`PackArg`] type: a primitive scalar, a
/// [`TensorRef`], an `i64` slice/array/`Vec`, or an [`Arg`].
///
/// ```rust
/// use tensor_rpc_protocol::{pack, TensorRef};
///
/// let msg = pack!(7, 42i32, TensorRef(5), [2i64, 3]);
/// assert_eq!(msg.len(), 2 + (1 + 4) + (1 + 8) + (1 + 8 + 16));
/// ```
#[macro_export]
macro_rules! pack {
    ($function_id:expr $(, $arg:expr)* $(,)?) => {{
        #[allow(unused_mut)]
        let mut packer = $crate::Packer::new($crate::FunctionId::from($function_id));
        $( packer.arg(&$arg); )*
        packer.finish()
    }};
}

// ---------------------------------------------------------------------------
// Scalar decoding
// ---------------------------------------------------------------------------

/// Reads one scalar of `kind` from the cursor.
///
/// Consumes exactly `kind.width()` bytes and reinterprets them as that
/// kind, without any validation. The caller must already have read and
/// checked the tag. This is the only place raw payload bytes become typed
/// values.
///
/// # Errors
/// Returns `ProtocolError::OutOfBounds` if fewer than `kind.width()` bytes
/// remain.
pub fn read_scalar(message: &mut RpcMessage, kind: ScalarKind) -> Result<ScalarValue, ProtocolError> {
    let value = match kind {
        ScalarKind::I8 => ScalarValue::I8(i8::from_ne_bytes(message.read_array()?)),
        ScalarKind::U8 => ScalarValue::U8(u8::from_ne_bytes(message.read_array()?)),
        ScalarKind::I16 => ScalarValue::I16(i16::from_ne_bytes(message.read_array()?)),
        ScalarKind::U16 => ScalarValue::U16(u16::from_ne_bytes(message.read_array()?)),
        ScalarKind::I32 => ScalarValue::I32(i32::from_ne_bytes(message.read_array()?)),
        ScalarKind::U32 => ScalarValue::U32(u32::from_ne_bytes(message.read_array()?)),
        ScalarKind::I64 => ScalarValue::I64(i64::from_ne_bytes(message.read_array()?)),
        ScalarKind::U64 => ScalarValue::U64(u64::from_ne_bytes(message.read_array()?)),
        ScalarKind::F32 => ScalarValue::F32(f32::from_ne_bytes(message.read_array()?)),
        ScalarKind::F64 => ScalarValue::F64(f64::from_ne_bytes(message.read_array()?)),
        ScalarKind::Bool => {
            let [byte] = message.read_array::<1>()?;
            ScalarValue::Bool(byte != 0)
        }
    };
    Ok(value)
}

/// Typed convenience over [`read_scalar`]: reads `T::KIND` and unwraps it.
///
/// Like the primitive, this reads no tag.
pub fn unpack_scalar<T: Scalar>(message: &mut RpcMessage) -> Result<T, ProtocolError> {
    let value = read_scalar(message, T::KIND)?;
    T::from_value(value).ok_or(ProtocolError::TagMismatch {
        expected: T::KIND.name(),
        found: TypeTag::Scalar(value.kind()),
    })
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fid_bytes(id: u16) -> Vec<u8> {
        id.to_ne_bytes().to_vec()
    }

    #[test]
    fn test_function_id_comes_first() {
        let msg = pack_message(FunctionId(300), &[]);
        assert_eq!(msg.as_bytes(), fid_bytes(300).as_slice());
    }

    #[test]
    fn test_scalar_layout() {
        let msg = pack!(1, -2i16);
        let mut expected = fid_bytes(1);
        expected.push(b'h');
        expected.extend_from_slice(&(-2i16).to_ne_bytes());
        assert_eq!(msg.as_bytes(), expected.as_slice());
    }

    #[test]
    fn test_bool_is_one_byte() {
        let msg = pack!(1, true, false);
        assert_eq!(&msg.as_bytes()[2..], &[b'?', 1, b'?', 0]);
    }

    #[test]
    fn test_tensor_layout() {
        let msg = pack!(2, TensorRef(0x0102_0304_0506_0708));
        let mut expected = fid_bytes(2);
        expected.push(b'T');
        expected.extend_from_slice(&0x0102_0304_0506_0708u64.to_ne_bytes());
        assert_eq!(msg.as_bytes(), expected.as_slice());
    }

    #[test]
    fn test_empty_long_array_writes_zero_length() {
        let msg = pack!(3, Vec::<i64>::new());
        let mut expected = fid_bytes(3);
        expected.push(b'F');
        expected.extend_from_slice(&0i64.to_ne_bytes());
        assert_eq!(msg.as_bytes(), expected.as_slice());
    }

    #[test]
    fn test_macro_and_slice_agree() {
        let args = [Arg::from(5u32), Arg::from(TensorRef(8)), Arg::from(vec![1i64, -1])];
        let by_slice = pack_message(FunctionId(9), &args);
        let by_macro = pack!(9u16, 5u32, TensorRef(8), vec![1i64, -1]);
        assert_eq!(by_slice, by_macro);
    }

    #[test]
    fn test_packer_counts_bytes() {
        let mut packer = Packer::new(FunctionId(1));
        packer.scalar(1.5f64).tensor(TensorRef(1)).long_array(&[1, 2]);
        assert_eq!(packer.len(), 2 + 9 + 9 + 25);
        assert!(!packer.is_empty());
    }

    #[test]
    fn test_capacity_hint_is_not_a_limit() {
        let config = ProtocolConfig { initial_capacity: 4 };
        let items: Vec<i64> = (0..100).collect();
        let msg = pack_message_with(&config, FunctionId(1), &[Arg::from(items)]);
        assert_eq!(msg.len(), 2 + 1 + 8 + 800);
    }

    #[test]
    fn test_read_scalar_reinterprets_without_tag() {
        let mut msg = RpcMessage::new(7i32.to_ne_bytes().to_vec());
        assert_eq!(read_scalar(&mut msg, ScalarKind::I32).unwrap(), ScalarValue::I32(7));
        assert!(msg.is_exhausted());
    }

    #[test]
    fn test_read_scalar_any_nonzero_byte_is_true() {
        let mut msg = RpcMessage::new(vec![2]);
        assert_eq!(read_scalar(&mut msg, ScalarKind::Bool).unwrap(), ScalarValue::Bool(true));
    }

    #[test]
    fn test_read_scalar_short_buffer() {
        let mut msg = RpcMessage::new(vec![0; 3]);
        assert!(matches!(
            read_scalar(&mut msg, ScalarKind::F32),
            Err(ProtocolError::OutOfBounds { requested: 4, remaining: 3 })
        ));
        assert_eq!(msg.offset(), 0);
    }

    #[test]
    fn test_unpack_scalar_typed() {
        let mut msg = RpcMessage::new(u64::MAX.to_ne_bytes().to_vec());
        assert_eq!(unpack_scalar::<u64>(&mut msg).unwrap(), u64::MAX);
    }
}
