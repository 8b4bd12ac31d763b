//! Sender-side connection lifecycle.
//!
//! The original vendor-callback dispatch is folded into a pure state
//! machine: Bluedroid events become [`LinkEvent`]s, and every transition
//! returns the vendor calls to make as [`Action`]s. The driver owns the
//! translation in both directions; nothing in here touches hardware.
//!
//! Lifecycle:
//!
//! ```text
//! Idle ─StackReady→ Discovering ─peer named in EIR→ ServiceLookup
//!   ServiceLookup ─first SCN→ Connecting ─open→ Connected
//! ```
//!
//! Every sender-side failure (lookup failed, open failed, link closed)
//! collapses back to `Discovering`; an inquiry window that ends without
//! sighting the peer restarts unconditionally, with no backoff and no
//! bound.

use heapless::Vec;

use crate::bt::{eir, PeerAddr};

/// Sentinel meaning "no SPP channel open", kept for the shared handle
/// word the main loop reads.
pub const NO_HANDLE: u32 = 0;

/// Connection lifecycle states.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LinkState {
    /// Stack not up yet.
    Idle,
    /// General inquiry running, looking for the peer name.
    Discovering,
    /// Peer sighted; SPP service discovery in flight.
    ServiceLookup(PeerAddr),
    /// Client open in flight on the first discovered channel.
    Connecting(PeerAddr),
    /// SPP channel open and writable.
    Connected { handle: u32 },
}

/// Inputs translated from the Bluedroid GAP/SPP callbacks.
#[derive(Clone, Copy, Debug)]
pub enum LinkEvent<'a> {
    /// Host stack finished bring-up.
    StackReady,
    /// One inquiry result, with its raw EIR payload.
    PeerSighted { addr: PeerAddr, eir: &'a [u8] },
    /// The inquiry window closed (timeout or cancel).
    DiscoveryStopped,
    /// SDP completed; the listed SPP channel numbers are usable.
    ServicesResolved { channels: &'a [u8] },
    /// SDP failed or returned nothing usable.
    ServiceLookupFailed,
    /// Client open succeeded.
    Opened { handle: u32 },
    /// Client open failed.
    OpenFailed,
    /// The open channel went away.
    Closed,
}

/// Vendor calls the driver must perform after a transition.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    StartDiscovery,
    CancelDiscovery,
    LookupServices(PeerAddr),
    Connect { addr: PeerAddr, channel: u8 },
}

/// Connection-state transitions published to the polling loop.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LinkUpdate {
    Connected { handle: u32 },
    Disconnected,
}

/// At most two vendor calls follow any single event (cancel + lookup).
pub type Actions = Vec<Action, 2>;

/// The sender's discovery/pairing/connection state machine.
pub struct LinkMachine {
    expected_peer: &'static str,
    state: LinkState,
}

impl LinkMachine {
    /// Create a machine that will only connect to `expected_peer`.
    pub const fn new(expected_peer: &'static str) -> Self {
        Self {
            expected_peer,
            state: LinkState::Idle,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Handle of the open channel, if any.
    pub fn handle(&self) -> Option<u32> {
        match self.state {
            LinkState::Connected { handle } => Some(handle),
            _ => None,
        }
    }

    /// Feed one event through the machine and collect the vendor calls
    /// the driver must make.
    pub fn on_event(&mut self, event: LinkEvent<'_>) -> Actions {
        let mut actions = Actions::new();

        match (self.state, event) {
            (LinkState::Idle, LinkEvent::StackReady) => {
                self.state = LinkState::Discovering;
                let _ = actions.push(Action::StartDiscovery);
            }

            (LinkState::Discovering, LinkEvent::PeerSighted { addr, eir }) => {
                if eir::names_peer(eir, self.expected_peer) {
                    self.state = LinkState::ServiceLookup(addr);
                    let _ = actions.push(Action::CancelDiscovery);
                    let _ = actions.push(Action::LookupServices(addr));
                }
                // Any other name: keep inquiring.
            }

            (LinkState::Discovering, LinkEvent::DiscoveryStopped) => {
                // Window closed without a sighting: restart, unbounded.
                let _ = actions.push(Action::StartDiscovery);
            }

            // The cancel issued on a sighting completes asynchronously;
            // that stop must not restart the inquiry.
            (LinkState::ServiceLookup(_) | LinkState::Connecting(_), LinkEvent::DiscoveryStopped) => {}

            (LinkState::ServiceLookup(addr), LinkEvent::ServicesResolved { channels }) => {
                match channels.first() {
                    Some(&channel) => {
                        self.state = LinkState::Connecting(addr);
                        let _ = actions.push(Action::Connect { addr, channel });
                    }
                    None => self.restart_discovery(&mut actions),
                }
            }

            (LinkState::ServiceLookup(_), LinkEvent::ServiceLookupFailed)
            | (LinkState::Connecting(_), LinkEvent::OpenFailed)
            | (LinkState::Connected { .. }, LinkEvent::Closed) => {
                self.restart_discovery(&mut actions);
            }

            (LinkState::Connecting(_), LinkEvent::Opened { handle }) => {
                self.state = LinkState::Connected { handle };
            }

            // Everything else: stale or out-of-order vendor noise.
            _ => {}
        }

        actions
    }

    fn restart_discovery(&mut self, actions: &mut Actions) {
        self.state = LinkState::Discovering;
        let _ = actions.push(Action::StartDiscovery);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests (run on host, not embedded)
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const PEER: &str = "MYOLINK_RECEIVER";
    const ADDR: PeerAddr = PeerAddr([0x24, 0x6F, 0x28, 0xAA, 0xBB, 0xCC]);

    fn eir_with_name(name: &str) -> std::vec::Vec<u8> {
        let mut eir = std::vec::Vec::new();
        eir.push(name.len() as u8 + 1);
        eir.push(0x09); // Complete Local Name
        eir.extend_from_slice(name.as_bytes());
        eir
    }

    fn discovering_machine() -> LinkMachine {
        let mut m = LinkMachine::new(PEER);
        let actions = m.on_event(LinkEvent::StackReady);
        assert_eq!(actions.as_slice(), &[Action::StartDiscovery]);
        m
    }

    #[test]
    fn stack_ready_starts_discovery() {
        let m = discovering_machine();
        assert_eq!(m.state(), LinkState::Discovering);
    }

    #[test]
    fn non_matching_names_never_connect() {
        let mut m = discovering_machine();
        for name in ["MYOLINK_RECEIVE", "MYOLINK_RECEIVERX", "SPP_SERVER", ""] {
            let eir = eir_with_name(name);
            let actions = m.on_event(LinkEvent::PeerSighted {
                addr: ADDR,
                eir: &eir,
            });
            assert!(actions.is_empty(), "acted on wrong peer name {name:?}");
            assert_eq!(m.state(), LinkState::Discovering);
        }
    }

    #[test]
    fn sighting_without_name_record_is_ignored() {
        let mut m = discovering_machine();
        let actions = m.on_event(LinkEvent::PeerSighted {
            addr: ADDR,
            eir: &[0x02, 0x01, 0x06], // flags only
        });
        assert!(actions.is_empty());
    }

    #[test]
    fn matching_name_cancels_and_looks_up_services() {
        let mut m = discovering_machine();
        let eir = eir_with_name(PEER);
        let actions = m.on_event(LinkEvent::PeerSighted {
            addr: ADDR,
            eir: &eir,
        });
        assert_eq!(
            actions.as_slice(),
            &[Action::CancelDiscovery, Action::LookupServices(ADDR)]
        );
        assert_eq!(m.state(), LinkState::ServiceLookup(ADDR));
    }

    #[test]
    fn discovery_stopped_without_peer_restarts() {
        let mut m = discovering_machine();
        let actions = m.on_event(LinkEvent::DiscoveryStopped);
        assert_eq!(actions.as_slice(), &[Action::StartDiscovery]);
        assert_eq!(m.state(), LinkState::Discovering);
    }

    #[test]
    fn cancel_completion_does_not_restart_inquiry() {
        let mut m = discovering_machine();
        let eir = eir_with_name(PEER);
        m.on_event(LinkEvent::PeerSighted {
            addr: ADDR,
            eir: &eir,
        });
        // Bluedroid reports the cancelled inquiry as a stop event.
        let actions = m.on_event(LinkEvent::DiscoveryStopped);
        assert!(actions.is_empty());
        assert_eq!(m.state(), LinkState::ServiceLookup(ADDR));
    }

    #[test]
    fn first_channel_wins() {
        let mut m = discovering_machine();
        let eir = eir_with_name(PEER);
        m.on_event(LinkEvent::PeerSighted {
            addr: ADDR,
            eir: &eir,
        });
        let actions = m.on_event(LinkEvent::ServicesResolved {
            channels: &[5, 7, 9],
        });
        assert_eq!(
            actions.as_slice(),
            &[Action::Connect {
                addr: ADDR,
                channel: 5
            }]
        );
        assert_eq!(m.state(), LinkState::Connecting(ADDR));
    }

    #[test]
    fn empty_channel_list_restarts_discovery() {
        let mut m = discovering_machine();
        let eir = eir_with_name(PEER);
        m.on_event(LinkEvent::PeerSighted {
            addr: ADDR,
            eir: &eir,
        });
        let actions = m.on_event(LinkEvent::ServicesResolved { channels: &[] });
        assert_eq!(actions.as_slice(), &[Action::StartDiscovery]);
        assert_eq!(m.state(), LinkState::Discovering);
    }

    #[test]
    fn open_makes_handle_visible() {
        let mut m = discovering_machine();
        let eir = eir_with_name(PEER);
        m.on_event(LinkEvent::PeerSighted {
            addr: ADDR,
            eir: &eir,
        });
        m.on_event(LinkEvent::ServicesResolved { channels: &[3] });
        let actions = m.on_event(LinkEvent::Opened { handle: 42 });
        assert!(actions.is_empty());
        assert_eq!(m.handle(), Some(42));
    }

    #[test]
    fn open_failure_collapses_to_discovering() {
        let mut m = discovering_machine();
        let eir = eir_with_name(PEER);
        m.on_event(LinkEvent::PeerSighted {
            addr: ADDR,
            eir: &eir,
        });
        m.on_event(LinkEvent::ServicesResolved { channels: &[3] });
        let actions = m.on_event(LinkEvent::OpenFailed);
        assert_eq!(actions.as_slice(), &[Action::StartDiscovery]);
        assert_eq!(m.handle(), None);
    }

    #[test]
    fn close_restarts_discovery() {
        let mut m = discovering_machine();
        let eir = eir_with_name(PEER);
        m.on_event(LinkEvent::PeerSighted {
            addr: ADDR,
            eir: &eir,
        });
        m.on_event(LinkEvent::ServicesResolved { channels: &[3] });
        m.on_event(LinkEvent::Opened { handle: 42 });
        let actions = m.on_event(LinkEvent::Closed);
        assert_eq!(actions.as_slice(), &[Action::StartDiscovery]);
        assert_eq!(m.state(), LinkState::Discovering);
        assert_eq!(m.handle(), None);
    }

    #[test]
    fn stale_events_are_ignored() {
        let mut m = LinkMachine::new(PEER);
        assert!(m.on_event(LinkEvent::Closed).is_empty());
        assert!(m.on_event(LinkEvent::OpenFailed).is_empty());
        assert!(m
            .on_event(LinkEvent::ServicesResolved { channels: &[1] })
            .is_empty());
        assert_eq!(m.state(), LinkState::Idle);
    }
}
