//! The lock-free set container.
//!
//! - [`LockFreeSet`] - sorted chain with two-phase (mark, unlink) deletion
//! - `tagged` - the pointer-plus-mark atomic cell (internal)

pub(crate) mod tagged;

mod lock_free_set;

pub use lock_free_set::LockFreeSet;
