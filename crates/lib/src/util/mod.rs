//! Shared utilities.
//!
//! Hashing helpers and test doubles used across the crate.

pub mod hash;

#[cfg(test)]
pub mod testutil;
