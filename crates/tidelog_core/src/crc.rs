//! CRC32C checksums and the masking transform stored in log headers.
//!
//! Computing the CRC of a string that itself contains embedded CRCs is
//! problematic, so log headers never store a raw CRC. They store
//! `mask(crc)`, and readers apply [`unmask`] before comparing.

/// Constant added after rotation when masking.
pub const MASK_DELTA: u32 = 0xa282_ead8;

/// Returns the CRC32C (Castagnoli) of `data`.
#[must_use]
pub fn value(data: &[u8]) -> u32 {
    crc32c::crc32c(data)
}

/// Returns the CRC32C of `A ++ data`, where `crc` is the CRC32C of `A`.
#[must_use]
pub fn extend(crc: u32, data: &[u8]) -> u32 {
    crc32c::crc32c_append(crc, data)
}

/// Returns the masked form of `crc`: rotate right by 15 bits, add a constant.
#[must_use]
pub const fn mask(crc: u32) -> u32 {
    crc.rotate_right(15).wrapping_add(MASK_DELTA)
}

/// Returns the CRC whose masked form is `masked`.
#[must_use]
pub const fn unmask(masked: u32) -> u32 {
    masked.wrapping_sub(MASK_DELTA).rotate_left(15)
}
