//! Husk benchmarking suite
//!
//! Criterion benchmarks for version selection, dictionary detection and
//! tarball unpacking, plus the fixtures they share.

pub mod common;

pub use common::*;
