//! # config.rs – Centralized Parameter Store
//!
//! This module holds all static program parameters used throughout the system.
//! Keeping configuration in one place makes tuning, experimentation, and testing easier.

use std::sync::Mutex;
use std::time::Duration;
use once_cell::sync::Lazy;

//
// ──────────────────────────────────────────────────────────────
//   1. NETWORK SETTINGS
// ──────────────────────────────────────────────────────────────
//

/// Default port the elevator driver/simulator listens on
pub const DEFAULT_DRIVER_PORT: u16 = 15657;

/// Default host for the elevator driver/simulator
pub static DEFAULT_DRIVER_HOST: &str = "localhost";

/// Default port this car listens on for inbound peer streams
pub const DEFAULT_LISTEN_PORT: u16 = 17357;

/// Capacity of the outgoing line queue per peer connection.
/// Broadcast uses `try_send`, so a full queue drops the message
/// instead of blocking the coordinator.
pub const PEER_LINE_CAPACITY: usize = 64;

/// Capacity of the mpsc channels feeding the coordinator and the car controller
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

//
// ──────────────────────────────────────────────────────────────
//   2. SYSTEM & ELEVATOR PARAMETERS
// ──────────────────────────────────────────────────────────────
//

/// Default number of floors in the Sanntidshallen setup
pub const DEFAULT_NUM_FLOORS: u8 = 4;

/// Sentinel floor value before the first floor sensor reading
pub const UNCALIBRATED_FLOOR: i8 = -1;

/// Duration between elevator hardware polls
pub const ELEV_POLL: Duration = Duration::from_millis(25);

//
// ──────────────────────────────────────────────────────────────
//   3. TIMING & TIMEOUTS & INTERVALS
// ──────────────────────────────────────────────────────────────
//

/// How long the door stays open after a stop
pub const DOOR_OPEN_TIME: Duration = Duration::from_secs(1);

/// Interval between status broadcasts to all peers
pub const STATUS_PERIOD: Duration = Duration::from_millis(500);

/// Backoff after a failed dial attempt towards a peer
pub const DIAL_RETRY_PERIOD: Duration = Duration::from_secs(1);

/// Backoff before redialing a peer whose stream closed after a successful connect
pub const RECONNECT_PERIOD: Duration = Duration::from_secs(2);

//
// ──────────────────────────────────────────────────────────────
//   4. LOGGING CONFIGURATION
// ──────────────────────────────────────────────────────────────
//

/// Enable/disable printing of errors
pub static PRINT_ERR_ON: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(true));

/// Enable/disable printing of warnings
pub static PRINT_WARN_ON: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(true));

/// Enable/disable printing of success messages
pub static PRINT_OK_ON: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(true));

/// Enable/disable printing of general info
pub static PRINT_INFO_ON: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(true));

/// Enable/disable miscellaneous debug prints
pub static PRINT_ELSE_ON: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(true));
