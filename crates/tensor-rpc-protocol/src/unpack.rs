//! Tag-driven decoding on top of [`read_scalar`].
//!
//! These helpers read a tag, check it against what the caller expects and
//! then consume the payload the tag describes. A mismatch is reported
//! immediately, before any payload byte is touched.

use crate::codec::{read_scalar, unpack_scalar};
use crate::types::LONG_WIDTH;
use crate::{Arg, FunctionId, ProtocolError, RpcMessage, Scalar, ScalarKind, TensorRef, TypeTag};

/// Reads the leading function id.
pub fn unpack_function_id(message: &mut RpcMessage) -> Result<FunctionId, ProtocolError> {
    unpack_scalar::<u16>(message).map(FunctionId)
}

/// Reads one tag byte and looks it up in the tag table.
pub fn unpack_tag(message: &mut RpcMessage) -> Result<TypeTag, ProtocolError> {
    let [byte] = message.read_array::<1>()?;
    TypeTag::from_byte(byte).ok_or(ProtocolError::UnknownTag(byte))
}

fn expect_tag(
    message: &mut RpcMessage,
    tag: TypeTag,
    expected: &'static str,
) -> Result<(), ProtocolError> {
    let found = unpack_tag(message)?;
    if found != tag {
        return Err(ProtocolError::TagMismatch { expected, found });
    }
    Ok(())
}

/// Reads the next argument, whatever its shape.
pub fn unpack_arg(message: &mut RpcMessage) -> Result<Arg, ProtocolError> {
    match unpack_tag(message)? {
        TypeTag::Scalar(kind) => read_scalar(message, kind).map(Arg::Scalar),
        TypeTag::Tensor => unpack_scalar::<u64>(message).map(|id| Arg::Tensor(TensorRef(id))),
        TypeTag::LongArray => read_long_array_body(message).map(Arg::LongArray),
    }
}

/// Reads a scalar argument that must be exactly of type `T`.
pub fn unpack_typed<T: Scalar>(message: &mut RpcMessage) -> Result<T, ProtocolError> {
    expect_tag(message, TypeTag::Scalar(T::KIND), T::KIND.name())?;
    unpack_scalar::<T>(message)
}

/// Reads a tensor reference argument.
pub fn unpack_tensor_ref(message: &mut RpcMessage) -> Result<TensorRef, ProtocolError> {
    expect_tag(message, TypeTag::Tensor, "tensor")?;
    unpack_scalar::<u64>(message).map(TensorRef)
}

/// Reads a long-array argument.
///
/// # Errors
/// Besides tag and bounds errors, a negative length fails with
/// `NegativeLength`, and a length larger than the remaining bytes can hold
/// fails with `ArrayTooLong` before any element is read.
pub fn unpack_long_array(message: &mut RpcMessage) -> Result<Vec<i64>, ProtocolError> {
    expect_tag(message, TypeTag::LongArray, "long array")?;
    read_long_array_body(message)
}

fn read_long_array_body(message: &mut RpcMessage) -> Result<Vec<i64>, ProtocolError> {
    let raw_len = unpack_scalar::<i64>(message)?;
    if raw_len < 0 {
        return Err(ProtocolError::NegativeLength(raw_len));
    }
    let len = usize::try_from(raw_len).unwrap_or(usize::MAX);
    let remaining = message.remaining();
    if len > remaining / LONG_WIDTH {
        return Err(ProtocolError::ArrayTooLong { len, remaining });
    }

    let mut items = Vec::with_capacity(len);
    for _ in 0..len {
        items.push(unpack_scalar::<i64>(message)?);
    }
    Ok(items)
}

/// Reads any integer (or bool) argument, widened to `i64`.
pub fn unpack_integer(message: &mut RpcMessage) -> Result<i64, ProtocolError> {
    let found = unpack_tag(message)?;
    let mismatch = ProtocolError::TagMismatch {
        expected: "integer",
        found,
    };
    match found {
        TypeTag::Scalar(kind) if kind.is_integer() || kind == ScalarKind::Bool => {
            read_scalar(message, kind)?.to_i64().ok_or(mismatch)
        }
        _ => Err(mismatch),
    }
}

/// Reads an `f32` or `f64` argument, widened to `f64`.
pub fn unpack_float(message: &mut RpcMessage) -> Result<f64, ProtocolError> {
    let found = unpack_tag(message)?;
    let mismatch = ProtocolError::TagMismatch {
        expected: "float",
        found,
    };
    match found {
        TypeTag::Scalar(kind) if kind.is_float() => {
            read_scalar(message, kind)?.to_f64().ok_or(mismatch)
        }
        _ => Err(mismatch),
    }
}

/// Decodes a whole message: the function id, then arguments until the
/// buffer is exhausted.
pub fn unpack_call(message: &mut RpcMessage) -> Result<(FunctionId, Vec<Arg>), ProtocolError> {
    let function_id = unpack_function_id(message)?;
    let mut args = Vec::new();
    while !message.is_exhausted() {
        match unpack_arg(message) {
            Ok(arg) => args.push(arg),
            Err(e) => {
                tracing::trace!(
                    %function_id,
                    offset = message.offset(),
                    decoded = args.len(),
                    error = %e,
                    "failed to decode argument"
                );
                return Err(e);
            }
        }
    }
    Ok((function_id, args))
}

/// Returns an error if unread bytes remain.
pub fn expect_exhausted(message: &RpcMessage) -> Result<(), ProtocolError> {
    match message.remaining() {
        0 => Ok(()),
        n => Err(ProtocolError::TrailingBytes(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pack, ScalarValue};

    #[test]
    fn test_unpack_tag_unknown_byte() {
        let mut msg = RpcMessage::new(vec![b'z']);
        assert_eq!(unpack_tag(&mut msg), Err(ProtocolError::UnknownTag(b'z')));
    }

    #[test]
    fn test_unpack_typed_checks_tag() {
        let mut msg = pack!(1, 5u8);
        unpack_function_id(&mut msg).unwrap();
        let err = unpack_typed::<i8>(&mut msg).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::TagMismatch {
                expected: "i8",
                found: TypeTag::Scalar(ScalarKind::U8),
            }
        );
    }

    #[test]
    fn test_unpack_tensor_ref_rejects_scalar() {
        let mut msg = pack!(1, 5u64);
        unpack_function_id(&mut msg).unwrap();
        assert!(matches!(
            unpack_tensor_ref(&mut msg),
            Err(ProtocolError::TagMismatch { expected: "tensor", .. })
        ));
    }

    #[test]
    fn test_unpack_integer_widens() {
        let mut msg = pack!(1, -3i8, 70_000u32, true, i64::MIN);
        unpack_function_id(&mut msg).unwrap();
        assert_eq!(unpack_integer(&mut msg).unwrap(), -3);
        assert_eq!(unpack_integer(&mut msg).unwrap(), 70_000);
        assert_eq!(unpack_integer(&mut msg).unwrap(), 1);
        assert_eq!(unpack_integer(&mut msg).unwrap(), i64::MIN);
        assert!(msg.is_exhausted());
    }

    #[test]
    fn test_unpack_integer_rejects_float() {
        let mut msg = pack!(1, 1.0f32);
        unpack_function_id(&mut msg).unwrap();
        assert!(matches!(
            unpack_integer(&mut msg),
            Err(ProtocolError::TagMismatch { expected: "integer", .. })
        ));
    }

    #[test]
    fn test_unpack_float_widens() {
        let mut msg = pack!(1, 0.25f32, -8.5f64);
        unpack_function_id(&mut msg).unwrap();
        assert_eq!(unpack_float(&mut msg).unwrap(), 0.25);
        assert_eq!(unpack_float(&mut msg).unwrap(), -8.5);
    }

    #[test]
    fn test_unpack_float_rejects_tensor() {
        let mut msg = pack!(1, TensorRef(3));
        unpack_function_id(&mut msg).unwrap();
        assert!(unpack_float(&mut msg).is_err());
    }

    #[test]
    fn test_negative_array_length_is_rejected() {
        let mut bytes = 1u16.to_ne_bytes().to_vec();
        bytes.push(b'F');
        bytes.extend_from_slice(&(-1i64).to_ne_bytes());
        let mut msg = RpcMessage::new(bytes);
        unpack_function_id(&mut msg).unwrap();
        assert_eq!(unpack_long_array(&mut msg), Err(ProtocolError::NegativeLength(-1)));
    }

    #[test]
    fn test_oversized_array_length_is_rejected_before_reading() {
        let mut bytes = 1u16.to_ne_bytes().to_vec();
        bytes.push(b'F');
        bytes.extend_from_slice(&3i64.to_ne_bytes());
        bytes.extend_from_slice(&1i64.to_ne_bytes());
        let mut msg = RpcMessage::new(bytes);
        unpack_function_id(&mut msg).unwrap();
        assert_eq!(
            unpack_long_array(&mut msg),
            Err(ProtocolError::ArrayTooLong { len: 3, remaining: 8 })
        );
    }

    #[test]
    fn test_unpack_arg_each_shape() {
        let mut msg = pack!(4, 2.0f64, TensorRef(11), [7i64]);
        assert_eq!(unpack_function_id(&mut msg).unwrap(), FunctionId(4));
        assert_eq!(unpack_arg(&mut msg).unwrap(), Arg::Scalar(ScalarValue::F64(2.0)));
        assert_eq!(unpack_arg(&mut msg).unwrap(), Arg::Tensor(TensorRef(11)));
        assert_eq!(unpack_arg(&mut msg).unwrap(), Arg::LongArray(vec![7]));
        assert!(expect_exhausted(&msg).is_ok());
    }

    #[test]
    fn test_unpack_call_truncated_payload() {
        let mut bytes = pack!(1, 5i32).into_bytes();
        bytes.pop();
        let mut msg = RpcMessage::new(bytes);
        assert!(matches!(
            unpack_call(&mut msg),
            Err(ProtocolError::OutOfBounds { requested: 4, remaining: 3 })
        ));
    }

    #[test]
    fn test_expect_exhausted_reports_trailing_bytes() {
        let msg = pack!(1, 5i32);
        assert_eq!(expect_exhausted(&msg), Err(ProtocolError::TrailingBytes(7)));
    }
}
