//! myolink - wireless EMG telemetry between two ESP32 nodes over
//! Bluetooth Classic SPP.
//!
//! The crate splits into a hardware-free core and thin Bluedroid
//! drivers:
//!
//! - **Core** (always compiled, unit-tested on the host with plain
//!   `cargo test`): the sender's connection lifecycle state machine
//!   ([`bt::link`]), EIR name parsing ([`bt::eir`]), the transmit
//!   cursor ([`stream`]), sample narrowing ([`sample`]), and the
//!   intensity→grip mapping ([`actuator`]).
//! - **Drivers** (behind the `esp32` feature, flashed via the `sender`
//!   and `receiver` binaries): [`bt::initiator`], [`bt::acceptor`] and
//!   [`actuator::servo`], which translate between Bluedroid callbacks
//!   and the core.

pub mod actuator;
pub mod bt;
pub mod config;
pub mod error;
pub mod sample;
pub mod stream;

pub use error::{BtError, Error};

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests - cross-module sanity checks; per-module suites live with
// their modules and the end-to-end flows in tests/integration.rs.
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use crate::actuator::{classify_intensity, GripPose};
    use crate::config::{GRIP_THRESHOLD, TX_CHUNK_MAX};
    use crate::sample;

    #[test]
    fn narrowed_rest_signal_keeps_gripper_closed() {
        // A relaxed muscle reads well under one wire step above the
        // threshold: 10 * 16 = 160 raw counts.
        let threshold_raw = (GRIP_THRESHOLD as u16 + 1) << 4;
        for raw in [0u16, 40, 120, threshold_raw - 1] {
            let pose = classify_intensity(sample::narrow(raw));
            assert_eq!(pose, GripPose::Closed, "raw {raw} opened the hand");
        }
    }

    #[test]
    fn narrowed_contraction_opens_gripper() {
        for raw in [200u16, 1000, 4095] {
            let pose = classify_intensity(sample::narrow(raw));
            assert_eq!(pose, GripPose::Open, "raw {raw} kept the hand closed");
        }
    }

    #[test]
    fn single_sample_fits_a_chunk() {
        assert!(TX_CHUNK_MAX >= 1);
    }
}
