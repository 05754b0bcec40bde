//! Core protocol types for the RPC wire format.
//!
//! Everything that crosses the wire is described here: the function
//! identifier that opens every message, the one-byte type tags, and the
//! closed set of argument shapes a call can carry.
//!
//! The tag table is compiled into both peers. There is no version
//! negotiation, so changing any byte value here breaks wire compatibility
//! with already-deployed workers.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Numeric index of the remote operation to invoke.
///
/// Written first in every message, exactly once, as a native-order `u16`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FunctionId(pub u16);

impl FunctionId {
    /// Width of the function identifier on the wire, in bytes.
    pub const WIDTH: usize = std::mem::size_of::<u16>();
}

impl From<u16> for FunctionId {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn-{}", self.0)
    }
}

/// Handle to a tensor that lives in the tensor runtime.
///
/// Only the identifier crosses the wire. The receiving side resolves it
/// against its own view of the runtime; the tensor's contents are never
/// serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TensorRef(pub u64);

impl TensorRef {
    /// Width of the identifier on the wire, in bytes.
    pub const WIDTH: usize = std::mem::size_of::<u64>();
}

impl fmt::Display for TensorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ScalarKind: fixed-width arithmetic kinds
// ---------------------------------------------------------------------------

/// The concrete arithmetic kind of a scalar argument.
///
/// Each kind has its own tag byte and a payload width equal to the size of
/// the native Rust type. Bytes are written in native order; both peers are
/// assumed to share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Bool,
}

impl ScalarKind {
    /// Every scalar kind, in tag-table order.
    pub const ALL: [ScalarKind; 11] = [
        Self::I8,
        Self::U8,
        Self::I16,
        Self::U16,
        Self::I32,
        Self::U32,
        Self::I64,
        Self::U64,
        Self::F32,
        Self::F64,
        Self::Bool,
    ];

    /// The tag byte written before a scalar of this kind.
    pub const fn tag_byte(self) -> u8 {
        match self {
            Self::I8 => b'c',
            Self::U8 => b'B',
            Self::I16 => b'h',
            Self::U16 => b'H',
            Self::I32 => b'i',
            Self::U32 => b'I',
            Self::I64 => b'l',
            Self::U64 => b'L',
            Self::F32 => b'f',
            Self::F64 => b'd',
            Self::Bool => b'?',
        }
    }

    /// Payload width in bytes. No padding, no length prefix.
    pub const fn width(self) -> usize {
        match self {
            Self::I8 | Self::U8 | Self::Bool => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    /// Returns `true` for the integer kinds (bool excluded).
    pub const fn is_integer(self) -> bool {
        !matches!(self, Self::F32 | Self::F64 | Self::Bool)
    }

    /// Returns `true` for `F32` and `F64`.
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Lower-case Rust type name, used in error messages.
    pub const fn name(self) -> &'static str {
        match self {
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Bool => "bool",
        }
    }

    fn from_tag_byte(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag_byte() == byte)
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// TypeTag: the one-byte discriminant before every argument
// ---------------------------------------------------------------------------

/// The one-byte tag that precedes every argument payload.
///
/// A receiver must read the tag before it can know how many bytes the
/// following payload occupies:
///
/// ```text
/// Scalar(kind)  → kind.width() bytes
/// Tensor   'T'  → 8-byte identifier
/// LongArray 'F' → i64 length, then length × i64
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// A plain fixed-width scalar.
    Scalar(ScalarKind),
    /// A tensor reference.
    Tensor,
    /// A length-prefixed array of `i64`, e.g. a shape or stride vector.
    LongArray,
}

impl TypeTag {
    /// Tag byte for tensor references.
    pub const TENSOR_BYTE: u8 = b'T';
    /// Tag byte for long arrays.
    pub const LONG_ARRAY_BYTE: u8 = b'F';

    /// The byte written on the wire for this tag.
    pub const fn byte(self) -> u8 {
        match self {
            Self::Scalar(kind) => kind.tag_byte(),
            Self::Tensor => Self::TENSOR_BYTE,
            Self::LongArray => Self::LONG_ARRAY_BYTE,
        }
    }

    /// Looks up a tag byte in the table. Returns `None` for unknown bytes.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            Self::TENSOR_BYTE => Some(Self::Tensor),
            Self::LONG_ARRAY_BYTE => Some(Self::LongArray),
            other => ScalarKind::from_tag_byte(other).map(Self::Scalar),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(kind) => write!(f, "{kind} ('{}')", kind.tag_byte() as char),
            Self::Tensor => write!(f, "tensor ('{}')", Self::TENSOR_BYTE as char),
            Self::LongArray => {
                write!(f, "long array ('{}')", Self::LONG_ARRAY_BYTE as char)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ScalarValue
// ---------------------------------------------------------------------------

/// A decoded (or to-be-encoded) scalar, tagged with its kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarValue {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Bool(bool),
}

impl ScalarValue {
    /// The kind of this value.
    pub fn kind(&self) -> ScalarKind {
        match self {
            Self::I8(_) => ScalarKind::I8,
            Self::U8(_) => ScalarKind::U8,
            Self::I16(_) => ScalarKind::I16,
            Self::U16(_) => ScalarKind::U16,
            Self::I32(_) => ScalarKind::I32,
            Self::U32(_) => ScalarKind::U32,
            Self::I64(_) => ScalarKind::I64,
            Self::U64(_) => ScalarKind::U64,
            Self::F32(_) => ScalarKind::F32,
            Self::F64(_) => ScalarKind::F64,
            Self::Bool(_) => ScalarKind::Bool,
        }
    }

    /// Appends the value's raw native-order bytes to `out`.
    pub(crate) fn write_ne(&self, out: &mut Vec<u8>) {
        match *self {
            Self::I8(v) => out.extend_from_slice(&v.to_ne_bytes()),
            Self::U8(v) => out.push(v),
            Self::I16(v) => out.extend_from_slice(&v.to_ne_bytes()),
            Self::U16(v) => out.extend_from_slice(&v.to_ne_bytes()),
            Self::I32(v) => out.extend_from_slice(&v.to_ne_bytes()),
            Self::U32(v) => out.extend_from_slice(&v.to_ne_bytes()),
            Self::I64(v) => out.extend_from_slice(&v.to_ne_bytes()),
            Self::U64(v) => out.extend_from_slice(&v.to_ne_bytes()),
            Self::F32(v) => out.extend_from_slice(&v.to_ne_bytes()),
            Self::F64(v) => out.extend_from_slice(&v.to_ne_bytes()),
            Self::Bool(v) => out.push(u8::from(v)),
        }
    }

    /// Widens an integer or bool value to `i64`.
    ///
    /// `u64` values above `i64::MAX` are reinterpreted bit-for-bit.
    /// Returns `None` for floats.
    pub fn to_i64(self) -> Option<i64> {
        match self {
            Self::I8(v) => Some(i64::from(v)),
            Self::U8(v) => Some(i64::from(v)),
            Self::I16(v) => Some(i64::from(v)),
            Self::U16(v) => Some(i64::from(v)),
            Self::I32(v) => Some(i64::from(v)),
            Self::U32(v) => Some(i64::from(v)),
            Self::I64(v) => Some(v),
            Self::U64(v) => Some(v as i64),
            Self::Bool(v) => Some(i64::from(v)),
            Self::F32(_) | Self::F64(_) => None,
        }
    }

    /// Widens a float value to `f64`. Returns `None` for non-floats.
    pub fn to_f64(self) -> Option<f64> {
        match self {
            Self::F32(v) => Some(f64::from(v)),
            Self::F64(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Scalar: Rust types that map onto a ScalarKind
// ---------------------------------------------------------------------------

mod sealed {
    pub trait Sealed {}
}

/// A Rust primitive with a fixed entry in the tag table.
///
/// Sealed: the set of encodable scalars is closed.
pub trait Scalar: Copy + sealed::Sealed {
    /// The wire kind of this type.
    const KIND: ScalarKind;

    /// Wraps `self` in a [`ScalarValue`].
    fn into_value(self) -> ScalarValue;

    /// Extracts `Self` from a value of the matching kind.
    fn from_value(value: ScalarValue) -> Option<Self>;
}

macro_rules! impl_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Scalar for $ty {
                const KIND: ScalarKind = ScalarKind::$variant;

                fn into_value(self) -> ScalarValue {
                    ScalarValue::$variant(self)
                }

                fn from_value(value: ScalarValue) -> Option<Self> {
                    match value {
                        ScalarValue::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for ScalarValue {
                fn from(v: $ty) -> Self {
                    ScalarValue::$variant(v)
                }
            }

            impl From<$ty> for Arg {
                fn from(v: $ty) -> Self {
                    Arg::Scalar(ScalarValue::$variant(v))
                }
            }
        )*
    };
}

impl_scalar! {
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    bool => Bool,
}

// ---------------------------------------------------------------------------
// Arg: the closed set of argument shapes
// ---------------------------------------------------------------------------

/// One argument of an RPC call.
///
/// Exactly three shapes exist. Conversions via `From` pick the shape from
/// the Rust type, so a value with no conversion simply does not compile
/// as an argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Tag for the kind, then the raw value.
    Scalar(ScalarValue),
    /// `'T'`, then the 8-byte identifier.
    Tensor(TensorRef),
    /// `'F'`, then the `i64` length, then each element as `i64`.
    LongArray(Vec<i64>),
}

impl Arg {
    /// The tag written before this argument's payload.
    pub fn tag(&self) -> TypeTag {
        match self {
            Self::Scalar(value) => TypeTag::Scalar(value.kind()),
            Self::Tensor(_) => TypeTag::Tensor,
            Self::LongArray(_) => TypeTag::LongArray,
        }
    }

    /// Number of bytes this argument occupies on the wire, tag included.
    pub fn encoded_len(&self) -> usize {
        1 + match self {
            Self::Scalar(value) => value.kind().width(),
            Self::Tensor(_) => TensorRef::WIDTH,
            Self::LongArray(items) => LONG_WIDTH * (1 + items.len()),
        }
    }
}

/// Width of a long-array length or element, in bytes.
pub const LONG_WIDTH: usize = std::mem::size_of::<i64>();

impl From<ScalarValue> for Arg {
    fn from(value: ScalarValue) -> Self {
        Self::Scalar(value)
    }
}

impl From<TensorRef> for Arg {
    fn from(tensor: TensorRef) -> Self {
        Self::Tensor(tensor)
    }
}

impl From<Vec<i64>> for Arg {
    fn from(items: Vec<i64>) -> Self {
        Self::LongArray(items)
    }
}

impl From<&[i64]> for Arg {
    fn from(items: &[i64]) -> Self {
        Self::LongArray(items.to_vec())
    }
}

impl<const N: usize> From<[i64; N]> for Arg {
    fn from(items: [i64; N]) -> Self {
        Self::LongArray(items.to_vec())
    }
}

// =========================================================================
// Tests
// =========================================================================
