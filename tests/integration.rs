//! Integration tests for myolink host-testable logic: the full
//! sender-side lifecycle from stack-up to streaming, driven purely
//! through the event enums the Bluedroid drivers translate into.

use myolink::actuator::{classify_intensity, GripPose};
use myolink::bt::link::{Action, LinkEvent, LinkMachine, LinkState};
use myolink::bt::PeerAddr;
use myolink::stream::TxStream;

const RECEIVER: &str = "MYOLINK_RECEIVER";
const ADDR: PeerAddr = PeerAddr([0x24, 0x6F, 0x28, 0x01, 0x02, 0x03]);

fn eir_named(name: &str) -> Vec<u8> {
    let mut eir = vec![name.len() as u8 + 1, 0x09];
    eir.extend_from_slice(name.as_bytes());
    eir
}

#[test]
fn sender_lifecycle_happy_path() {
    let mut link = LinkMachine::new(RECEIVER);
    let mut tx = TxStream::new();

    // Stack up: inquiry starts.
    assert_eq!(
        link.on_event(LinkEvent::StackReady).as_slice(),
        &[Action::StartDiscovery]
    );

    // A phone and a headset walk by; neither may trigger a connection.
    for name in ["Pixel 7", "WH-1000XM4"] {
        let eir = eir_named(name);
        let actions = link.on_event(LinkEvent::PeerSighted {
            addr: ADDR,
            eir: &eir,
        });
        assert!(actions.is_empty(), "connected to {name}");
    }

    // First window closes empty: unconditional restart.
    assert_eq!(
        link.on_event(LinkEvent::DiscoveryStopped).as_slice(),
        &[Action::StartDiscovery]
    );

    // The receiver appears: cancel inquiry, resolve services.
    let eir = eir_named(RECEIVER);
    assert_eq!(
        link.on_event(LinkEvent::PeerSighted {
            addr: ADDR,
            eir: &eir
        })
        .as_slice(),
        &[Action::CancelDiscovery, Action::LookupServices(ADDR)]
    );

    // SDP answers with one channel; connect to it.
    assert_eq!(
        link.on_event(LinkEvent::ServicesResolved { channels: &[2] })
            .as_slice(),
        &[Action::Connect {
            addr: ADDR,
            channel: 2
        }]
    );

    // Channel opens. A sample buffered while detached flushes at once.
    tx.submit(&[42]).unwrap();
    link.on_event(LinkEvent::Opened { handle: 7 });
    assert_eq!(link.handle(), Some(7));
    assert_eq!(tx.on_opened(), Some(&[42u8][..]));
    assert_eq!(tx.on_write(1, false), None);

    // Steady state: one byte per poll cycle.
    assert_eq!(tx.submit(&[5]).unwrap(), Some(&[5u8][..]));
    assert_eq!(tx.on_write(1, false), None);
}

#[test]
fn sender_recovers_from_every_failure_into_discovery() {
    let failures: [&[LinkEvent]; 3] = [
        &[LinkEvent::ServiceLookupFailed],
        &[
            LinkEvent::ServicesResolved { channels: &[1] },
            LinkEvent::OpenFailed,
        ],
        &[
            LinkEvent::ServicesResolved { channels: &[1] },
            LinkEvent::Opened { handle: 9 },
            LinkEvent::Closed,
        ],
    ];

    for tail in failures {
        let mut link = LinkMachine::new(RECEIVER);
        link.on_event(LinkEvent::StackReady);
        let eir = eir_named(RECEIVER);
        link.on_event(LinkEvent::PeerSighted {
            addr: ADDR,
            eir: &eir,
        });

        let mut last = myolink::bt::link::Actions::new();
        for event in tail {
            last = link.on_event(*event);
        }

        assert_eq!(last.as_slice(), &[Action::StartDiscovery]);
        assert_eq!(link.state(), LinkState::Discovering);
        assert_eq!(link.handle(), None);
    }
}

#[test]
fn congested_link_replays_the_tail_in_order() {
    let mut tx = TxStream::new();
    tx.on_opened();

    // A rare multi-byte chunk hits congestion mid-transfer.
    assert_eq!(
        tx.submit(&[10, 20, 30, 40, 50]).unwrap(),
        Some(&[10u8, 20, 30, 40, 50][..])
    );
    assert_eq!(tx.on_write(2, true), None);
    assert_eq!(tx.on_congestion(false), Some(&[30u8, 40, 50][..]));
    assert_eq!(tx.on_write(3, false), None);
    assert!(!tx.busy());
}

#[test]
fn received_intensity_maps_to_exactly_two_poses() {
    for intensity in 0u8..=255 {
        let pose = classify_intensity(intensity);
        if intensity > 10 {
            assert_eq!(pose, GripPose::Open);
        } else {
            assert_eq!(pose, GripPose::Closed);
        }
    }
}
