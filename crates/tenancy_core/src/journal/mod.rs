//! Transaction journal for durability and crash recovery.
//!
//! Every committed transaction is appended as a run of frames:
//!
//! ```text
//! | magic "TJNL" (4) | version (2) | type (1) | length (4) | payload (N) | crc32 (4) |
//! ```
//!
//! A transaction is `Begin`, then any number of `Put` / `Delete`, then
//! `Commit`. Recovery applies only transactions whose `Commit` made it to
//! disk.
//!
//! ## Recovery Policy
//!
//! - Truncated header or payload at the end: the tail is ignored.
//! - Frames after the last commit belong to an unfinished transaction; the
//!   store cuts the journal back to the last commit when it opens.
//! - Bad magic, unknown version or type, CRC mismatch: the store refuses to
//!   open.

mod entry;
mod writer;

pub use entry::{compute_crc32, EntryType, JournalEntry, JOURNAL_MAGIC, JOURNAL_VERSION};
pub use writer::{CommittedTxn, Journal, Replay};
