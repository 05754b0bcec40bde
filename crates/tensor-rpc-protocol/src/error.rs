//! Error types for the protocol layer.
//!
//! Encoding cannot fail: an argument whose type has no conversion into
//! [`Arg`](crate::Arg) is rejected by the compiler. Every variant here is a
//! decode-side failure, and every one of them invalidates the whole
//! message. There is no way to roll the cursor back and resume.

use crate::TypeTag;

/// Errors that can occur while reading a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A read asked for more bytes than remain in the message.
    ///
    /// The message is truncated or the reader disagrees with the writer
    /// about a field's width.
    #[error("read of {requested} bytes out of bounds ({remaining} remaining)")]
    OutOfBounds { requested: usize, remaining: usize },

    /// An envelope was created with a starting offset past the end of its
    /// buffer.
    #[error("offset {offset} past end of {len}-byte message")]
    InvalidOffset { offset: usize, len: usize },

    /// A tag byte that is not in the tag table.
    #[error("unknown type tag 0x{0:02x}")]
    UnknownTag(u8),

    /// The caller expected one kind of argument and the stream holds
    /// another.
    #[error("expected {expected} argument, found {found}")]
    TagMismatch {
        expected: &'static str,
        found: TypeTag,
    },

    /// A long-array length field below zero.
    #[error("negative long-array length {0}")]
    NegativeLength(i64),

    /// A long-array length that claims more elements than the remaining
    /// bytes can hold.
    #[error("long array of {len} elements exceeds {remaining} remaining bytes")]
    ArrayTooLong { len: usize, remaining: usize },

    /// The message still held unread bytes when the caller required it to
    /// be fully consumed.
    #[error("{0} trailing bytes after last argument")]
    TrailingBytes(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScalarKind;

    #[test]
    fn test_out_of_bounds_message() {
        let err = ProtocolError::OutOfBounds {
            requested: 8,
            remaining: 3,
        };
        assert_eq!(err.to_string(), "read of 8 bytes out of bounds (3 remaining)");
    }

    #[test]
    fn test_unknown_tag_shows_hex() {
        assert_eq!(
            ProtocolError::UnknownTag(0x7a).to_string(),
            "unknown type tag 0x7a"
        );
    }

    #[test]
    fn test_tag_mismatch_names_both_sides() {
        let err = ProtocolError::TagMismatch {
            expected: "tensor",
            found: TypeTag::Scalar(ScalarKind::F64),
        };
        let text = err.to_string();
        assert!(text.contains("tensor"));
        assert!(text.contains("f64"));
    }
}
