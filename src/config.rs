//! Application-wide constants and compile-time configuration.
//!
//! All hardware pin assignments, timing parameters, and protocol
//! constants live here so they can be tuned in one place.

// Bluetooth identity

/// Device name the sender publishes over GAP.
pub const SENDER_DEVICE_NAME: &str = "MYOLINK_SENDER";

/// Device name the receiver publishes, and the name the sender's
/// discovery matches EIR local-name records against.
pub const RECEIVER_DEVICE_NAME: &str = "MYOLINK_RECEIVER";

/// SDP service name the receiver's SPP server registers under.
pub const SPP_SERVICE_NAME: &str = "MYOLINK_SPP";

// Discovery

/// Inquiry window length, in 1.28 s units (Bluedroid convention).
/// 10 ≈ 12.8 s per discovery pass before the restart kicks in.
pub const INQUIRY_DURATION_UNITS: u8 = 10;

/// Maximum inquiry responses per pass. 0 = unlimited.
pub const INQUIRY_MAX_RESPONSES: u8 = 0;

// Pairing
//
// Fixed responses for the vendor pairing prompts. Not a security design -
// both nodes are headless, so the prompts are answered with static values.

/// Legacy 4-digit PIN, as digit values.
pub const PAIRING_PIN: [u8; 4] = [1, 2, 3, 4];

// Telemetry

/// Sample-and-send period for the sender's polling loop (ms).
pub const SAMPLE_PERIOD_MS: u32 = 1000;

/// Largest chunk a single SPP write may carry (bytes).
pub const TX_CHUNK_MAX: usize = 20;

/// Intensity threshold separating the two grip poses. A sample strictly
/// above this closes the relay to the open pose; at or below it, closed.
pub const GRIP_THRESHOLD: u8 = 10;

// GPIO pin assignments (Adafruit HUZZAH32 defaults)
//
// These are logical names; the actual `gpioN` peripherals are selected
// in the binaries, where pin choice is a type. Adjust for your PCB.
//
// Sender (MyoWare wiring):
//   RAW output     → GPIO 36 (A4 / ADC1_CH0) - the channel we sample
//   ENV output     → GPIO 39 (A3) - unused
//   REF output     → GPIO 35 (A5) - unused
//   Status LED     → GPIO 13 (on-board red LED)
//
// Receiver (finger servos, thumb..pinky):
//   Servo signals  → GPIO 14 / 27 / 26 / 25 / 33

// Servo gripper (receiver)

/// Number of actuated fingers.
pub const FINGER_COUNT: usize = 5;

/// Servo PWM frame rate (Hz). Standard hobby-servo timing.
pub const SERVO_PWM_HZ: u32 = 50;

/// Pulse width driving a finger fully closed (µs).
pub const SERVO_CLOSED_PULSE_US: u32 = 1000;

/// Pulse width driving a finger fully open (µs).
pub const SERVO_OPEN_PULSE_US: u32 = 2000;
