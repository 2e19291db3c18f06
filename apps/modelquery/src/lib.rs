//! # modelquery
//!
//! Library half of the `modelquery` binary. Exposes the CLI so the
//! command implementations can be exercised from integration tests.

pub mod cli;
