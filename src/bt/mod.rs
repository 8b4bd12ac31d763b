//! Bluetooth Classic subsystem.
//!
//! The sender runs Bluedroid in the **initiator** role:
//!
//! 1. **EIR parser** - extracts peer names from inquiry results.
//! 2. **Link machine** - the discovery/pairing/connection lifecycle,
//!    expressed as a pure state machine over sealed event/action enums.
//! 3. **Initiator driver** - feeds GAP/SPP callbacks into the link
//!    machine and executes the actions it returns against `esp-idf-svc`.
//!
//! The receiver runs the **acceptor** role: an SPP server that relays
//! received intensity bytes to the actuator loop.
//!
//! Everything except the two drivers is hardware-free and unit-tested
//! on the host.

pub mod eir;
pub mod link;

#[cfg(feature = "esp32")]
pub mod acceptor;
#[cfg(feature = "esp32")]
pub mod initiator;

use core::fmt;

/// A 48-bit Bluetooth device address.
///
/// Plain bytes rather than the binding's own address type so the link
/// machine stays compilable off-target.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PeerAddr(pub [u8; 6]);

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a[0], a[1], a[2], a[3], a[4], a[5]
        )
    }
}
