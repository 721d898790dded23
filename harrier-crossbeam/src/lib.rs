//! Crossbeam-based memory reclamation for the harrier set.
//!
//! This crate provides `EpochGuard`, an implementation of the
//! `harrier_core::Guard` trait using crossbeam-epoch.
//!
//! # Usage
//!
//! ```ignore
//! use harrier_core::LockFreeSet;
//! use harrier_crossbeam::EpochGuard;
//!
//! let set: LockFreeSet<String, EpochGuard> = LockFreeSet::new();
//! set.insert("item".to_string());
//! ```

pub mod epoch_guard;

pub use epoch_guard::EpochGuard;
