//! Log file layout shared by the writer and reader.
//!
//! ```text
//! | block 0 (32768) | block 1 (32768) | ... | last block (partial) |
//!
//! physical record:
//! | masked crc32c (4, LE) | length (2, LE) | type (1) | payload (length) |
//! ```
//!
//! The checksum covers the type byte followed by the payload. A record
//! never crosses a block boundary; a block tail shorter than a header is
//! zero-filled.

/// Size of a block. Records are framed so that none spans two blocks.
pub const BLOCK_SIZE: usize = 32768;

/// Header is checksum (4 bytes), length (2 bytes), type (1 byte).
pub const HEADER_SIZE: usize = 4 + 2 + 1;

/// Largest record type value in use.
pub const MAX_RECORD_TYPE: u8 = RecordType::Last.as_byte();

/// Type of a physical record.
///
/// A logical record is either one `Full` record, or a `First` record, any
/// number of `Middle` records and a `Last` record, in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordType {
    /// Reserved for preallocated files. Never written.
    Zero = 0,
    /// A complete logical record.
    Full = 1,
    /// The first fragment of a logical record.
    First = 2,
    /// An interior fragment of a logical record.
    Middle = 3,
    /// The final fragment of a logical record.
    Last = 4,
}

impl RecordType {
    /// Every record type, indexed by its byte value.
    pub const ALL: [RecordType; MAX_RECORD_TYPE as usize + 1] = [
        RecordType::Zero,
        RecordType::Full,
        RecordType::First,
        RecordType::Middle,
        RecordType::Last,
    ];

    /// Converts a byte to a record type.
    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        Self::ALL.get(usize::from(b)).copied()
    }

    /// Converts the record type to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Returns the type of a fragment from its position in a logical record.
    #[must_use]
    pub const fn for_fragment(is_first: bool, is_last: bool) -> Self {
        match (is_first, is_last) {
            (true, true) => RecordType::Full,
            (true, false) => RecordType::First,
            (false, true) => RecordType::Last,
            (false, false) => RecordType::Middle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_type_bytes() {
        assert_eq!(RecordType::Zero.as_byte(), 0);
        assert_eq!(RecordType::Full.as_byte(), 1);
        assert_eq!(RecordType::First.as_byte(), 2);
        assert_eq!(RecordType::Middle.as_byte(), 3);
        assert_eq!(RecordType::Last.as_byte(), 4);
        assert_eq!(MAX_RECORD_TYPE, 4);
    }

    #[test]
    fn from_byte_rejects_unknown() {
        for t in RecordType::ALL {
            assert_eq!(RecordType::from_byte(t.as_byte()), Some(t));
        }
        assert_eq!(RecordType::from_byte(5), None);
        assert_eq!(RecordType::from_byte(0xff), None);
    }

    #[test]
    fn fragment_positions() {
        assert_eq!(RecordType::for_fragment(true, true), RecordType::Full);
        assert_eq!(RecordType::for_fragment(true, false), RecordType::First);
        assert_eq!(RecordType::for_fragment(false, true), RecordType::Last);
        assert_eq!(RecordType::for_fragment(false, false), RecordType::Middle);
    }

    #[test]
    fn header_fits_in_block() {
        assert_eq!(HEADER_SIZE, 7);
        assert!(BLOCK_SIZE - HEADER_SIZE < usize::from(u16::MAX));
    }
}
