//! Block-framed record log.
//!
//! A log is a sequence of logical records. Each logical record is written
//! as one or more physical records packed into fixed-size blocks, so a
//! reader can resynchronize at the next block boundary after damage.
//!
//! ## Physical Record Format
//!
//! ```text
//! | masked crc32c (4) | length (2) | type (1) | payload (length) |
//! ```
//!
//! Integers are little-endian. The checksum covers the type byte and the
//! payload, and is stored masked (see [`crate::crc::mask`]).
//!
//! ## Invariants
//!
//! - No physical record crosses a [`BLOCK_SIZE`] boundary
//! - A block tail shorter than [`HEADER_SIZE`] is zero-filled
//! - A logical record is `Full`, or `First` (`Middle`)* `Last`
//! - The writer flushes after every physical record and never syncs on its
//!   own; durability is the caller's decision

mod format;
mod reader;
mod writer;

pub use format::{RecordType, BLOCK_SIZE, HEADER_SIZE, MAX_RECORD_TYPE};
pub use reader::{CorruptionCounter, LogReader, LogReporter, Reporter};
pub use writer::LogWriter;
