//! # Formats Module
//!
//! Binary encoding of registry values for the persistent registry store.

mod persistence;

pub use persistence::*;
