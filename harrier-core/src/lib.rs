//! Lock-free concurrent set keyed by item fingerprints.
//!
//! The set is a sorted singly-linked chain of nodes following Harris's
//! 'A Pragmatic Implementation of Non-Blocking Linked-Lists': deletion is
//! logical first (a mark bit stolen from the successor pointer), physical
//! unlinking second, and every coordination point is a compare-and-swap on
//! a tagged `next` cell. No operation blocks.
//!
//! # Organization
//!
//! - [`set`] - The container: tagged pointer cell, node chain, operations
//! - [`fingerprint`] - Item-to-key hashing (FNV-1a, 32-bit)
//! - [`guard`] - Memory reclamation seam (`Guard` trait, `DeferredGuard`)
//!
//! Production use pairs the set with an epoch-based guard; see the
//! `harrier-crossbeam` crate.

pub mod fingerprint;
pub mod guard;
pub mod set;

// Re-exports for convenience
pub use fingerprint::{fnv1a_32, Fingerprint};
pub use guard::{DeferredGuard, Guard};
pub use set::LockFreeSet;
