//! Byte packing helpers for 7-bit and 14-bit MIDI values.

/// Splits a 16-bit value into `[high, low]` bytes.
#[inline]
pub fn to_array(value: u16) -> [u8; 2] {
    [((value & 0xFF00) >> 8) as u8, (value & 0xFF) as u8]
}

/// Splits a 14-bit value into `(msb, lsb)` 7-bit halves.
#[inline]
pub fn split_14bit(value: u16) -> (u8, u8) {
    (((value >> 7) & 0x7F) as u8, (value & 0x7F) as u8)
}

/// Joins two 7-bit halves back into a 14-bit value.
#[inline]
pub fn merge_14bit(lsb: u8, msb: u8) -> u16 {
    ((msb as u16 & 0x7F) << 7) | (lsb as u16 & 0x7F)
}

/// Scales a normalised value in [0, 1] to a 7-bit data byte.
#[inline]
pub fn normalized_to_byte(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 127.0).round() as u8
}

#[inline]
pub fn byte_to_normalized(value: u8) -> f64 {
    value as f64 / 127.0
}
