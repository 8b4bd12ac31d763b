//! EMG sample conditioning.
//!
//! The ADC delivers 12-bit raw readings (0-4095); the wire carries one
//! byte per sample. Narrowing drops the low four bits rather than
//! rescaling, so the mapping is exact at both endpoints and monotonic
//! everywhere in between.

/// Full-scale value of the 12-bit ADC.
pub const ADC_FULL_SCALE: u16 = 4095;

/// Narrow a raw 12-bit reading to the single wire byte.
///
/// Out-of-range inputs clamp to full scale first, so a miscounted
/// reading can never alias to a small intensity.
pub fn narrow(raw: u16) -> u8 {
    (raw.min(ADC_FULL_SCALE) >> 4) as u8
}

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests (run on host, not embedded)
// ═══════════════════════════════════════════════════════════════════════════
