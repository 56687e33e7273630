//! Various convenience utilities for splitting 32-bit memory words
//! into sixteen-bit halfwords and for joining them together.
//!
//! The SubRISC machine fetches sixteen-bit instructions from 32-bit
//! words; the halfword with the lower (even) halfword address lives
//! in bits 31..16.

/// Split a 32-bit word into its (more significant, less significant)
/// halfwords.
pub fn split_halves(w: u32) -> (u16, u16) {
    (left_half(w), right_half(w))
}

/// Join two halfwords into a 32-bit word.
pub fn join_halves(left: u16, right: u16) -> u32 {
    (u32::from(left) << 16) | u32::from(right)
}

/// Extract the left (more-significant) halfword from a full word.
pub fn left_half(word: u32) -> u16 {
    // The shift leaves at most 16 significant bits.
    u16::try_from(word >> 16).unwrap_or(u16::MAX)
}

/// Extract the right (less-significant) halfword from a full word.
pub fn right_half(word: u32) -> u16 {
    u16::try_from(word & 0xFFFF).unwrap_or(u16::MAX)
}

/// Reinterpret the bits of a signed value as unsigned.
pub fn reinterpret_as_unsigned(value: i32) -> u32 {
    u32::from_ne_bytes(value.to_ne_bytes())
}

/// Reinterpret the bits of an unsigned value as signed.
pub fn reinterpret_as_signed(value: u32) -> i32 {
    i32::from_ne_bytes(value.to_ne_bytes())
}

/// Interpret the low `bits` bits of `value` as a two's complement
/// number.
///
/// # Panics
///
/// Panics if `bits` is zero or greater than 32.
pub fn sign_extend(value: u32, bits: u32) -> i32 {
    assert!(bits > 0 && bits <= 32, "cannot sign-extend a {bits}-bit field");
    let unused = 32 - bits;
    reinterpret_as_signed(value << unused) >> unused
}
