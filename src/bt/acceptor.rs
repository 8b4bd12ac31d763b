//! Receiver-side SPP acceptor.
//!
//! Brings up an SPP server under the fixed service name, answers the
//! vendor pairing prompts with static values, and relays the first byte
//! of every data indication to the actuator loop over an `mpsc` channel.
//!
//! Bluedroid invokes the subscribed closures on its own task; nothing
//! here blocks, and the only state crossing back to `main` is the
//! intensity channel plus an atomic connection handle.

use std::ptr::slice_from_raw_parts;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{mpsc, Arc};

use esp_idf_svc::bt::gap::{DiscoveryMode, EspGap, GapEvent};
use esp_idf_svc::bt::spp::{self, EspSpp, SppEvent, Status};
use esp_idf_svc::bt::{BtClassic, BtDriver, BtStatus};
use esp_idf_svc::sys::EspError;
use esp_idf_sys::{
    esp, esp_bt_gap_set_security_param, esp_bt_gap_ssp_confirm_reply,
    esp_bt_sp_param_t_ESP_BT_SP_IOCAP_MODE, ESP_BT_IO_CAP_IO,
};
use log::{debug, error, info, warn};

use crate::bt::link::NO_HANDLE;
use crate::config::{PAIRING_PIN, RECEIVER_DEVICE_NAME, SPP_SERVICE_NAME};

type RxBtDriver = BtDriver<'static, BtClassic>;
type RxGap = Arc<EspGap<'static, BtClassic, Arc<RxBtDriver>>>;
type RxSpp = Arc<EspSpp<'static, BtClassic, Arc<RxBtDriver>>>;

/// The receiver node's Bluetooth driver.
#[derive(Clone)]
pub struct Acceptor {
    gap: RxGap,
    spp: RxSpp,
    /// Handle of the single tracked inbound connection (0 = none).
    handle: Arc<AtomicU32>,
    /// Intensity bytes headed for the actuator loop.
    intensity_tx: mpsc::Sender<u8>,
}

impl Acceptor {
    pub fn new(gap: RxGap, spp: RxSpp, intensity_tx: mpsc::Sender<u8>) -> Self {
        Self {
            gap,
            spp,
            handle: Arc::new(AtomicU32::new(NO_HANDLE)),
            intensity_tx,
        }
    }

    /// Wire up callbacks and start the SPP server.
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

        self.gap.set_device_name(RECEIVER_DEVICE_NAME)?;

        // SSP is enabled by default in ESP-IDF; set the IO capability
        // directly because cfg(esp_idf_bt_ssp_enabled) elides the safe
        // wrapper.
        esp!(unsafe {
            esp_bt_gap_set_security_param(
                esp_bt_sp_param_t_ESP_BT_SP_IOCAP_MODE,
                &ESP_BT_IO_CAP_IO as *const _ as *mut std::ffi::c_void,
                1,
            )
        })?;

        // Legacy pairing: variable pin, answered in the PIN request event.
        self.gap.request_variable_pin()?;

        self.spp
            .start_server(spp::Security::Authenticate, spp::Role::Slave, 0, SPP_SERVICE_NAME)?;

        info!("SPP server starting as {RECEIVER_DEVICE_NAME}");

        Ok(())
    }

    /// True while a sender is connected.
    pub fn is_connected(&self) -> bool {
        self.handle.load(Ordering::Acquire) != NO_HANDLE
    }

    fn on_gap_event(&self, event: GapEvent) -> Result<(), EspError> {
        match event {
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
                // Fixed positive reply; the safe wrapper is elided under
                // the default sdkconfig, so call the sys binding.
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
            GapEvent::AclConnected { bd_addr, status, .. } => {
                debug!("ACL up: {bd_addr} ({status:?})");
            }
            GapEvent::AclDisconnected { bd_addr, status, .. } => {
                debug!("ACL down: {bd_addr} ({status:?})");
            }
            _ => debug!("GAP event: {event:?}"),
        }

        Ok(())
    }

    fn on_spp_event(&self, event: SppEvent) -> Result<(), EspError> {
        match event {
            SppEvent::Start { status, scn, .. } => {
                if status == Status::Success {
                    info!("SPP server up on channel {scn}");
                    self.gap.set_scan_mode(true, DiscoveryMode::Discoverable)?;
                } else {
                    error!("SPP server failed to start: {status:?}");
                }
            }
            SppEvent::ServerOpen {
                status,
                handle,
                rem_bda,
                ..
            } => {
                if status == Status::Success {
                    info!("sender connected from {rem_bda} (handle {handle})");
                    // Single implicit connection: a later open replaces
                    // the recorded handle.
                    self.handle.store(handle, Ordering::Release);
                } else {
                    error!("inbound open failed: {status:?}");
                }
            }
            SppEvent::Close { handle, .. } => {
                info!("sender disconnected (handle {handle})");
                let _ = self.handle.compare_exchange(
                    handle,
                    NO_HANDLE,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
            }
            SppEvent::DataInd {
                status,
                handle,
                length,
                data,
            } => {
                if status != Status::Success {
                    error!("data indication failed: {status:?}");
                    return Ok(());
                }

                let bytes = unsafe { &*slice_from_raw_parts(data, length as usize) };
                for (i, b) in bytes.iter().enumerate() {
                    debug!("data[{i}] received: {b} (handle {handle})");
                }

                // The first byte of each indication is the intensity
                // sample; the rest (if any) is a stale tail.
                if let Some(&intensity) = bytes.first() {
                    if self.intensity_tx.send(intensity).is_err() {
                        warn!("actuator loop gone - dropping sample");
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
