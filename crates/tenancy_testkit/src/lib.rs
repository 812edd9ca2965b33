//! # Tenancy Testkit
//!
//! Test utilities for the tenancy inspection store.
//!
//! This crate provides:
//! - Store fixtures with a manual clock, in memory or on disk
//! - Close, tamper and reopen helpers for recovery tests
//! - Property-based generators for entities and mutation sequences
//! - An operation harness that checks store invariants after every step
//!
//! ## Usage
//!
//! ```rust
//! use tenancy_testkit::prelude::*;
//!
//! let test_store = TestStore::memory();
//! let (property, record) = scenarios::sunrise_apartment(&test_store);
//! assert_eq!(record.property_id, Some(property.id));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
