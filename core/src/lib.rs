//! Core types for transactional overlays over ordered key-value stores.
//!
//! This crate defines the ordering of keys, the record kept for each buffered mutation and the
//! write batch that carries a set of mutations to a store, in a store-agnostic manner.
//!
//! None of the types in this crate require the standard library, but they do require Rust's
//! alloc crate.

#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]

extern crate alloc;

pub mod batch;
pub mod comparator;
pub mod key;

pub use batch::{BatchOp, ValueChange, WriteBatch};
pub use comparator::{Bytewise, Comparator, Reverse};
pub use key::OrderedKey;

/// A value stored under a key.
pub type Value = alloc::vec::Vec<u8>;
