//! Shared foundational types used across the Keel build toolchain.
//!
//! This crate provides content hashing for file versions and interface
//! signatures, and the internal error type used for invariant violations.

#![warn(missing_docs)]

pub mod hash;
pub mod result;

pub use hash::{ContentHash, ParseHashError};
pub use result::{InternalError, KeelResult};
