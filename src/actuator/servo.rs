//! Five-channel servo bank on the LEDC peripheral.
//!
//! One LEDC channel per finger, all sharing a 50 Hz / 14-bit timer.
//! The bank only rewrites duty registers when the pose actually
//! changes; the LEDC hardware keeps the last pulse width refreshed
//! between updates.

use esp_idf_hal::ledc::LedcDriver;
use log::{debug, info};

use crate::actuator::{duty_for_pulse, GripPose};
use crate::config::FINGER_COUNT;
use crate::error::Error;

/// The gripper's servo channels, in finger order (thumb..pinky).
pub struct ServoBank<'d> {
    fingers: [LedcDriver<'d>; FINGER_COUNT],
    pose: Option<GripPose>,
}

impl<'d> ServoBank<'d> {
    /// Take ownership of the configured LEDC channels and park the
    /// gripper closed so a reboot never leaves it half-open.
    pub fn new(fingers: [LedcDriver<'d>; FINGER_COUNT]) -> Result<Self, Error> {
        let mut bank = Self {
            fingers,
            pose: None,
        };
        bank.apply(GripPose::Closed)?;
        Ok(bank)
    }

    /// Drive every finger to `pose`. Returns true when the pose changed.
    pub fn apply(&mut self, pose: GripPose) -> Result<bool, Error> {
        if self.pose == Some(pose) {
            debug!("grip already {pose:?}");
            return Ok(false);
        }

        let pulse_us = pose.pulse_us();
        for finger in self.fingers.iter_mut() {
            let duty = duty_for_pulse(pulse_us, finger.get_max_duty());
            finger.set_duty(duty).map_err(|_| Error::Servo)?;
        }

        info!("grip -> {pose:?} ({pulse_us} us pulse)");
        self.pose = Some(pose);
        Ok(true)
    }

    pub fn pose(&self) -> Option<GripPose> {
        self.pose
    }
}
