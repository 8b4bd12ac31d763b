//! Receiver node - accepts the sender's SPP connection and snaps the
//! servo gripper between its two endpoints as intensity bytes arrive.
//!
//! The Bluedroid callback only relays bytes into a channel; this loop
//! owns the servo bank exclusively, so PWM updates never race.

use std::sync::{mpsc, Arc};

use esp_idf_svc::bt::gap::EspGap;
use esp_idf_svc::bt::spp::{self, EspSpp, SppConfig};
use esp_idf_svc::bt::{reduce_bt_memory, BtClassic, BtDriver};
use esp_idf_svc::hal::ledc::config::TimerConfig;
use esp_idf_svc::hal::ledc::{LedcDriver, LedcTimerDriver, Resolution};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{info, warn};

use myolink::actuator::servo::ServoBank;
use myolink::actuator::{classify_intensity, GripPose};
use myolink::bt::acceptor::Acceptor;
use myolink::config::SERVO_PWM_HZ;
use myolink::error::Error;

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

    let (intensity_tx, intensity_rx) = mpsc::channel::<u8>();
    let node = Acceptor::new(gap, spp, intensity_tx);
    node.start()?;

    // One 50 Hz / 14-bit timer shared by all five finger channels.
    let timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::default()
            .frequency(SERVO_PWM_HZ.Hz())
            .resolution(Resolution::Bits14),
    )?;

    // Finger order: thumb, index, middle, ring, pinky.
    let fingers = [
        LedcDriver::new(peripherals.ledc.channel0, &timer, peripherals.pins.gpio14)?,
        LedcDriver::new(peripherals.ledc.channel1, &timer, peripherals.pins.gpio27)?,
        LedcDriver::new(peripherals.ledc.channel2, &timer, peripherals.pins.gpio26)?,
        LedcDriver::new(peripherals.ledc.channel3, &timer, peripherals.pins.gpio25)?,
        LedcDriver::new(peripherals.ledc.channel4, &timer, peripherals.pins.gpio33)?,
    ];
    let mut gripper = ServoBank::new(fingers).map_err(|e| anyhow::anyhow!("{e}"))?;

    info!("receiver up, gripper parked {:?}", GripPose::Closed);

    loop {
        let intensity = intensity_rx
            .recv()
            .map_err(|_| anyhow::anyhow!("{}", Error::ChannelClosed))?;

        let pose = classify_intensity(intensity);
        match gripper.apply(pose) {
            Ok(true) => info!("intensity {intensity} -> {pose:?}"),
            Ok(false) => {}
            Err(e) => warn!("servo update failed: {e}"),
        }
    }
}
