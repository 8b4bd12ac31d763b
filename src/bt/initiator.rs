//! Sender-side SPP initiator.
//!
//! Thin translation layer between Bluedroid and the pure core: every
//! GAP/SPP callback becomes a [`LinkEvent`] fed to the [`LinkMachine`],
//! and every [`Action`] the machine returns is executed as a vendor
//! call. Write-completion and congestion events go to the [`TxStream`],
//! which answers with the next slice for the wire.
//!
//! Callbacks run on the Bluedroid task; the polling loop in `main` only
//! touches the atomic handle, the update channel, and `submit_sample`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{mpsc, Arc, Mutex};

use esp_idf_svc::bt::gap::{DeviceProp, DiscoveryMode, EspGap, GapEvent, InqMode};
use esp_idf_svc::bt::spp::{self, EspSpp, SppEvent, Status};
use esp_idf_svc::bt::{BdAddr, BtClassic, BtDriver, BtStatus};
use esp_idf_svc::sys::EspError;
use esp_idf_sys::{
    esp, esp_bt_gap_set_security_param, esp_bt_gap_ssp_confirm_reply,
    esp_bt_sp_param_t_ESP_BT_SP_IOCAP_MODE, ESP_BT_IO_CAP_IO,
};
use log::{debug, error, info, warn};

use crate::bt::link::{Action, LinkEvent, LinkMachine, LinkUpdate, NO_HANDLE};
use crate::bt::PeerAddr;
use crate::config::{
    INQUIRY_DURATION_UNITS, INQUIRY_MAX_RESPONSES, PAIRING_PIN, RECEIVER_DEVICE_NAME,
    SENDER_DEVICE_NAME, TX_CHUNK_MAX,
};
use crate::error::{BtError, Error};
use crate::stream::TxStream;

type TxBtDriver = BtDriver<'static, BtClassic>;
type TxGap = Arc<EspGap<'static, BtClassic, Arc<TxBtDriver>>>;
type TxSpp = Arc<EspSpp<'static, BtClassic, Arc<TxBtDriver>>>;

/// A chunk copied out of the stream so no lock is held across a write.
type Chunk = heapless::Vec<u8, TX_CHUNK_MAX>;

/// The sender node's Bluetooth driver.
#[derive(Clone)]
pub struct Initiator {
    gap: TxGap,
    spp: TxSpp,
    link: Arc<Mutex<LinkMachine>>,
    tx: Arc<Mutex<TxStream>>,
    /// Handle of the open SPP channel (0 = none), readable by the
    /// polling loop without locking.
    handle: Arc<AtomicU32>,
    updates: mpsc::Sender<LinkUpdate>,
}

impl Initiator {
    pub fn new(gap: TxGap, spp: TxSpp, updates: mpsc::Sender<LinkUpdate>) -> Self {
        Self {
            gap,
            spp,
            link: Arc::new(Mutex::new(LinkMachine::new(RECEIVER_DEVICE_NAME))),
            tx: Arc::new(Mutex::new(TxStream::new())),
            handle: Arc::new(AtomicU32::new(NO_HANDLE)),
            updates,
        }
    }

    /// Wire up callbacks and kick off discovery.
    pub fn start(&self) -> Result<(), EspError> {
        let gap_self = self.clone();
        self.gap.subscribe(move |event| {
            let r = gap_self.on_gap_event(event);
            gap_self.check_status(r);
        })?;

        let spp_self = self.clone();
        self.spp.subscribe(move |event| {
            let r = spp_self.on_spp_event(event);
            spp_self.check_status(r);
        })?;

        self.gap.set_device_name(SENDER_DEVICE_NAME)?;
        self.gap.set_scan_mode(true, DiscoveryMode::Discoverable)?;

        // SSP IO capability, set through the sys binding because the safe
        // wrapper is elided under the default sdkconfig.
        esp!(unsafe {
            esp_bt_gap_set_security_param(
                esp_bt_sp_param_t_ESP_BT_SP_IOCAP_MODE,
                &ESP_BT_IO_CAP_IO as *const _ as *mut std::ffi::c_void,
                1,
            )
        })?;
        self.gap.request_variable_pin()?;

        // `EspSpp::new` completes SPP init before subscription, so the
        // stack is ready by the time we get here.
        info!("stack up, looking for {RECEIVER_DEVICE_NAME}");
        self.dispatch(LinkEvent::StackReady)
    }

    /// True while an SPP channel is open to the receiver.
    pub fn is_connected(&self) -> bool {
        self.handle.load(Ordering::Acquire) != NO_HANDLE
    }

    /// Offer the latest sample for transmission.
    ///
    /// Returns `Ok(true)` when a write went out, `Ok(false)` when the
    /// sample was buffered or dropped (no channel, write in flight).
    pub fn submit_sample(&self, intensity: u8) -> Result<bool, Error> {
        let handle = self.handle.load(Ordering::Acquire);

        let chunk: Option<Chunk> = {
            let mut tx = self.tx.lock().unwrap();
            tx.submit(&[intensity])?.map(copy_chunk)
        };

        match chunk {
            Some(chunk) if handle != NO_HANDLE => {
                self.spp.write(handle, &chunk).map_err(|e| {
                    warn!("SPP write rejected: {e:?}");
                    Error::from(BtError::WriteFailed)
                })?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Run one event through the link machine and execute the fallout.
    fn dispatch(&self, event: LinkEvent<'_>) -> Result<(), EspError> {
        let (actions, handle_now) = {
            let mut link = self.link.lock().unwrap();
            let actions = link.on_event(event);
            (actions, link.handle())
        };

        self.publish_handle(handle_now)?;

        for action in actions {
            self.perform(action)?;
        }

        Ok(())
    }

    /// Reconcile the shared handle word with the machine's view and
    /// notify the polling loop on every transition.
    fn publish_handle(&self, handle_now: Option<u32>) -> Result<(), EspError> {
        let now = handle_now.unwrap_or(NO_HANDLE);
        let before = self.handle.swap(now, Ordering::AcqRel);

        if before == now {
            return Ok(());
        }

        if now != NO_HANDLE {
            info!("link up (handle {now})");
            let _ = self.updates.send(LinkUpdate::Connected { handle: now });

            // First chunk goes out on the open event.
            let first: Option<Chunk> = {
                let mut tx = self.tx.lock().unwrap();
                tx.on_opened().map(copy_chunk)
            };
            if let Some(chunk) = first {
                self.spp.write(now, &chunk)?;
            }
        } else {
            info!("link down");
            self.tx.lock().unwrap().on_closed();
            let _ = self.updates.send(LinkUpdate::Disconnected);
        }

        Ok(())
    }

    fn perform(&self, action: Action) -> Result<(), EspError> {
        match action {
            Action::StartDiscovery => {
                debug!("starting inquiry");
                self.gap.start_discovery(
                    InqMode::General,
                    INQUIRY_DURATION_UNITS,
                    INQUIRY_MAX_RESPONSES,
                )
            }
            Action::CancelDiscovery => {
                debug!("cancelling inquiry");
                self.gap.stop_discovery()
            }
            Action::LookupServices(addr) => {
                info!("found {RECEIVER_DEVICE_NAME} at {addr}, resolving SPP services");
                self.spp.start_discovery(&to_bd_addr(addr))
            }
            Action::Connect { addr, channel } => {
                info!("connecting to {addr} on channel {channel}");
                self.spp.connect(
                    spp::Security::Authenticate,
                    spp::Role::Master,
                    channel,
                    &to_bd_addr(addr),
                )
            }
        }
    }

    fn on_gap_event(&self, event: GapEvent) -> Result<(), EspError> {
        match event {
            GapEvent::DeviceDiscovered { bd_addr, props } => {
                let addr = PeerAddr(bd_addr.addr());
                for prop in props {
                    if let DeviceProp::Eir(eir) = prop {
                        return self.dispatch(LinkEvent::PeerSighted { addr, eir });
                    }
                }
                // No EIR record, no name to match on.
                debug!("sighted {addr} without EIR data");
            }
            GapEvent::DeviceDiscoveryStarted => debug!("inquiry started"),
            GapEvent::DeviceDiscoveryStopped => {
                debug!("inquiry stopped");
                return self.dispatch(LinkEvent::DiscoveryStopped);
            }
            GapEvent::AuthenticationCompleted {
                bd_addr,
                status,
                device_name,
            } => {
                if status == BtStatus::Success {
                    info!("paired with {device_name} ({bd_addr})");
                } else {
                    error!("authentication failed: {status:?}");
                }
            }
            GapEvent::PairingPinRequest { bd_addr, min_16_digit } => {
                if min_16_digit {
                    let pin = [0u8; 16];
                    self.gap.reply_variable_pin(&bd_addr, Some(&pin[..]))?;
                } else {
                    self.gap.reply_variable_pin(&bd_addr, Some(&PAIRING_PIN[..]))?;
                }
            }
            GapEvent::PairingUserConfirmationRequest { bd_addr, number } => {
                debug!("confirming SSP numeric value {number}");
                esp!(unsafe {
                    esp_bt_gap_ssp_confirm_reply(&bd_addr as *const _ as *mut _, true)
                })?;
            }
            GapEvent::SspPasskey { bd_addr, passkey } => {
                info!("SSP passkey for {bd_addr}: {passkey}");
            }
            GapEvent::SspPasskeyRequest { bd_addr } => {
                warn!("peer {bd_addr} requested a passkey; headless node cannot enter one");
            }
            _ => debug!("GAP event: {event:?}"),
        }

        Ok(())
    }

    fn on_spp_event(&self, event: SppEvent) -> Result<(), EspError> {
        match event {
            SppEvent::DiscoveryComplete { status, channels } => {
                if status == Status::Success {
                    debug!("SDP done, {} channel(s)", channels.len());
                    self.dispatch(LinkEvent::ServicesResolved { channels })?;
                } else {
                    warn!("SPP service lookup failed: {status:?}");
                    self.dispatch(LinkEvent::ServiceLookupFailed)?;
                }
            }
            SppEvent::Open {
                status,
                handle,
                rem_bda,
                ..
            } => {
                if status == Status::Success {
                    info!("SPP channel open to {rem_bda}");
                    self.dispatch(LinkEvent::Opened { handle })?;
                } else {
                    warn!("SPP open failed: {status:?}");
                    self.dispatch(LinkEvent::OpenFailed)?;
                }
            }
            SppEvent::Close { handle, .. } => {
                info!("SPP channel closed (handle {handle})");
                self.dispatch(LinkEvent::Closed)?;
            }
            SppEvent::Write {
                status,
                handle,
                length,
                congested,
            } => {
                if status == Status::Success {
                    let tail: Option<Chunk> = {
                        let mut tx = self.tx.lock().unwrap();
                        tx.on_write(length as usize, congested).map(copy_chunk)
                    };
                    if let Some(chunk) = tail {
                        debug!("partial write, resending {} byte(s)", chunk.len());
                        self.spp.write(handle, &chunk)?;
                    }
                } else {
                    warn!("SPP write failed: {status:?}");
                    self.tx.lock().unwrap().on_write_failed();
                }
            }
            SppEvent::Congestion {
                status,
                handle,
                congested,
            } => {
                if status == Status::Success {
                    let tail: Option<Chunk> = {
                        let mut tx = self.tx.lock().unwrap();
                        tx.on_congestion(congested).map(copy_chunk)
                    };
                    if let Some(chunk) = tail {
                        debug!("congestion cleared, resending {} byte(s)", chunk.len());
                        self.spp.write(handle, &chunk)?;
                    }
                }
            }
            _ => debug!("SPP event: {event:?}"),
        }

        Ok(())
    }

    fn check_status(&self, status: Result<(), EspError>) {
        if let Err(e) = status {
            warn!("bluetooth callback error: {e:?}");
        }
    }
}

fn to_bd_addr(addr: PeerAddr) -> BdAddr {
    BdAddr::from_bytes(addr.0)
}

fn copy_chunk(slice: &[u8]) -> Chunk {
    let mut chunk = Chunk::new();
    // Slice comes out of a TX_CHUNK_MAX-sized buffer.
    let _ = chunk.extend_from_slice(slice);
    chunk
}
