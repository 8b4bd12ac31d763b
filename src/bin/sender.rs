//! Sender node - samples the MyoWare EMG output once a second and
//! streams the narrowed intensity byte to the receiver over SPP.
//!
//! Bring-up order matters: NVS first (Bluedroid persists link keys
//! there), then the BT driver, then GAP/SPP, then the initiator which
//! kicks off discovery. The loop below never exits; any bring-up error
//! propagates out of `main` and resets the device.

use std::sync::{mpsc, Arc};

use esp_idf_svc::bt::gap::EspGap;
use esp_idf_svc::bt::spp::{self, EspSpp, SppConfig};
use esp_idf_svc::bt::{reduce_bt_memory, BtClassic, BtDriver};
use esp_idf_svc::hal::adc::attenuation::DB_11;
use esp_idf_svc::hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_svc::hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::PinDriver;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{debug, info, warn};

use myolink::bt::initiator::Initiator;
use myolink::bt::link::LinkUpdate;
use myolink::config::SAMPLE_PERIOD_MS;
use myolink::sample;

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    let peripherals = Peripherals::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let mut modem = peripherals.modem;
    reduce_bt_memory(unsafe { modem.reborrow() })?;

    let bt = Arc::new(BtDriver::<BtClassic>::new(modem, Some(nvs.clone()))?);

    let spp_config = SppConfig {
        mode: spp::Mode::Cb,
        enable_l2cap_ertm: true,
        tx_buffer_size: 0, // only used for mode VFS
    };

    let gap = Arc::new(EspGap::new(bt.clone())?);
    let spp = Arc::new(EspSpp::new(bt.clone(), &spp_config)?);

    let (update_tx, update_rx) = mpsc::channel::<LinkUpdate>();
    let node = Initiator::new(gap, spp, update_tx);
    node.start()?;

    // MyoWare RAW output on GPIO 36 (ADC1_CH0), 12-bit.
    let adc = AdcDriver::new(peripherals.adc1)?;
    let adc_config = AdcChannelConfig {
        attenuation: DB_11,
        ..Default::default()
    };
    let mut raw_pin = AdcChannelDriver::new(&adc, peripherals.pins.gpio36, &adc_config)?;

    let mut status_led = PinDriver::output(peripherals.pins.gpio13)?;

    info!("sender up, sampling every {SAMPLE_PERIOD_MS} ms");

    loop {
        FreeRtos::delay_ms(SAMPLE_PERIOD_MS);

        while let Ok(update) = update_rx.try_recv() {
            match update {
                LinkUpdate::Connected { handle } => info!("streaming on handle {handle}"),
                LinkUpdate::Disconnected => info!("link lost, discovery restarting"),
            }
        }

        let raw: u16 = adc.read_raw(&mut raw_pin)?;
        let intensity = sample::narrow(raw);
        debug!("raw {raw} -> intensity {intensity}");

        match node.submit_sample(intensity) {
            // LED toggles on every transmitted sample while connected,
            // which doubles as a slow blink while discovery runs.
            Ok(true) => status_led.toggle()?,
            Ok(false) => {
                if !node.is_connected() {
                    status_led.toggle()?;
                }
            }
            Err(e) => warn!("sample dropped: {e}"),
        }
    }
}
