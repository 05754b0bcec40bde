//! Tensor identity: issuing identifiers on the master and resolving them on
//! workers.
//!
//! Tensors never cross the wire. The master hands out a [`TensorRef`] for
//! each tensor it asks a worker to create, and every later call names the
//! tensor by that identifier. The worker keeps its own table from
//! identifier to live object.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tensor_rpc_protocol::{unpack_tensor_ref, RpcMessage, TensorRef};

use crate::RpcError;

/// Issues unique tensor identifiers, starting at 1.
#[derive(Debug)]
pub struct TensorIdAllocator {
    next: AtomicU64,
}

impl TensorIdAllocator {
    /// Creates an allocator whose first identifier is 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns a fresh identifier.
    pub fn allocate(&self) -> TensorRef {
        TensorRef(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for TensorIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves tensor identifiers to live objects.
pub trait TensorStore {
    /// The runtime's tensor handle.
    type Tensor;

    /// Looks up a tensor by identifier.
    fn resolve(&self, tensor: TensorRef) -> Option<Self::Tensor>;

    /// Reads a tensor-reference argument and resolves it.
    ///
    /// # Errors
    /// `Protocol` if the next argument is not a tensor reference,
    /// `UnknownTensor` if the store has no tensor with that identifier.
    fn unpack(&self, message: &mut RpcMessage) -> Result<Self::Tensor, RpcError> {
        let tensor = unpack_tensor_ref(message)?;
        self.resolve(tensor).ok_or(RpcError::UnknownTensor(tensor))
    }
}

/// A simple worker-side [`TensorStore`] backed by a hash map.
///
/// Tensors are shared through `Arc`, so a handler can hold one while
/// another handler removes it from the table.
#[derive(Debug)]
pub struct TensorTable<T> {
    tensors: Mutex<HashMap<TensorRef, Arc<T>>>,
}

impl<T> TensorTable<T> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            tensors: Mutex::new(HashMap::new()),
        }
    }

    /// Stores `tensor` under the identifier chosen by the master. Returns
    /// the tensor previously stored there, if any.
    pub fn insert(&self, id: TensorRef, tensor: T) -> Option<Arc<T>> {
        self.lock().insert(id, Arc::new(tensor))
    }

    /// Removes a tensor, returning it if it was present.
    pub fn remove(&self, id: TensorRef) -> Option<Arc<T>> {
        self.lock().remove(&id)
    }

    /// Number of live tensors.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no tensors are stored.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TensorRef, Arc<T>>> {
        // The map stays consistent even if a holder panicked.
        self.tensors.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for TensorTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TensorStore for TensorTable<T> {
    type Tensor = Arc<T>;

    fn resolve(&self, tensor: TensorRef) -> Option<Arc<T>> {
        self.lock().get(&tensor).cloned()
    }
}
