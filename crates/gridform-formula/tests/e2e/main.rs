//! End-to-end tests for gridform-formula.
//!
//! These drive the public API only: parse formula text, inspect the tree and
//! the extracted references, render it back, and patch it.

mod common;
mod patching;
mod properties;
mod roundtrip;

pub use common::*;
