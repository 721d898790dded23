//! Guard trait for memory reclamation strategies.
//!
//! A lock-free chain cannot free a node at the moment it is unlinked:
//! another thread may still be parked on it mid-traversal. The `Guard`
//! trait abstracts over strategies for deferring that free until it is
//! safe:
//!
//! ```text
//! LockFreeSet<T, G: Guard>
//!     │
//!     ├── LockFreeSet<T, EpochGuard>      (production, harrier-crossbeam)
//!     └── LockFreeSet<T, DeferredGuard>   (testing)
//! ```

mod deferred_guard;

pub use deferred_guard::DeferredGuard;

/// A memory reclamation guard that protects concurrent access to nodes.
///
/// # Safety Contract
///
/// Implementations must ensure that a node passed to `defer_destroy` is not
/// freed while any `ReadGuard` pinned before the defer is still alive.
///
/// # Design Note
///
/// A guard value is stored in the collection and used for scheduling
/// deferred destruction; it must be `Send + Sync`. Actual read protection
/// is per-operation: each public operation pins a `ReadGuard` for its
/// duration.
pub trait Guard: Sized + Default + Send + Sync {
    /// An active guard that protects reads for its lifetime.
    ///
    /// For epoch-based guards this is a pinned epoch handle. For
    /// `DeferredGuard` it is `()`, since the stored guard already keeps
    /// every deferred node alive until the collection drops.
    type ReadGuard: Sized;

    /// Pin an active read guard for the duration of one operation.
    fn pin() -> Self::ReadGuard;

    /// Schedule a node for deferred destruction.
    ///
    /// # Safety
    ///
    /// - `node` must be a valid pointer previously allocated by the
    ///   collection
    /// - `node` must be unlinked (not reachable by a traversal starting
    ///   after this call)
    /// - `dealloc` must be the correct deallocation function for `node`
    /// - each node must be deferred at most once
    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N));
}
