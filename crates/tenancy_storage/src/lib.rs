//! # Tenancy Storage
//!
//! Byte-level backends used by `tenancy_core` for its two durable files:
//! the append-only transaction journal and the checkpoint image.
//!
//! Backends never interpret what they hold. Framing, checksums and CBOR
//! decoding all live in the core crate.
//!
//! ## Available Backends
//!
//! - [`MemoryBackend`] - ephemeral stores and tests
//! - [`FileBackend`] - a single file on disk
//!
//! ## Example
//!
//! ```rust
//! use tenancy_storage::{Backend, MemoryBackend};
//!
//! let mut journal = MemoryBackend::new();
//! let offset = journal.append(b"frame").unwrap();
//! assert_eq!(journal.read_at(offset, 5).unwrap(), b"frame");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::Backend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::MemoryBackend;
