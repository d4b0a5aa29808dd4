//! End-to-end install tests.
//!
//! Recipes point at `file://` archives built on the fly and run `/bin/sh`
//! steps, so no network or toolchain is needed.

mod common;

#[cfg(unix)]
mod install_tests;
