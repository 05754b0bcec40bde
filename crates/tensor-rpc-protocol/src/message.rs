//! The message envelope: an owned buffer plus a read cursor.

use crate::ProtocolError;

/// One encoded RPC call.
///
/// On the send side this is what the encoder produces; on the receive side
/// it wraps the bytes handed over by the transport. The envelope owns its
/// buffer exclusively. The buffer is moved in, never copied.
///
/// ```text
/// ┌────────────── bytes ──────────────┐
/// │ consumed        │ unread          │
/// └─────────────────┴─────────────────┘
///                   ^ offset
/// ```
///
/// The cursor only moves forward. Reaching the end exactly is the normal
/// terminal state; a read that would cross it fails and leaves the cursor
/// where it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcMessage {
    bytes: Vec<u8>,
    offset: usize,
}

impl RpcMessage {
    /// Wraps a complete buffer with the cursor at the start.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Wraps a buffer whose first `offset` bytes were already consumed,
    /// e.g. a header peeled off by the transport.
    pub fn with_offset(bytes: Vec<u8>, offset: usize) -> Result<Self, ProtocolError> {
        if offset > bytes.len() {
            return Err(ProtocolError::InvalidOffset {
                offset,
                len: bytes.len(),
            });
        }
        Ok(Self { bytes, offset })
    }

    /// Returns the next `len` bytes and advances the cursor past them.
    ///
    /// # Errors
    /// Returns `ProtocolError::OutOfBounds` if fewer than `len` bytes
    /// remain. The cursor does not move in that case.
    pub fn read(&mut self, len: usize) -> Result<&[u8], ProtocolError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(ProtocolError::OutOfBounds {
                requested: len,
                remaining,
            });
        }
        let start = self.offset;
        self.offset += len;
        Ok(&self.bytes[start..self.offset])
    }

    /// Like [`read`](Self::read), copying into a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read(N)?);
        Ok(out)
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    /// Returns `true` once every byte has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.offset == self.bytes.len()
    }

    /// Total length of the buffer.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the buffer holds no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The whole buffer, regardless of the cursor. This is what the
    /// transport sends.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the envelope and returns its buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl From<Vec<u8>> for RpcMessage {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl AsRef<[u8]> for RpcMessage {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
