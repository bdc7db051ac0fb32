//! ## Car Status Module
//!
//! Defines the shared vocabulary for a single car's state: its travel
//! direction, its behaviour state, and the `CarStatus` snapshot the
//! controller publishes after every handled event.
//!
//! The snapshot is the only thing the coordinator and the status broadcaster
//! ever read about the local car. They receive it through a `tokio::sync::watch`,
//! so the controller stays the single writer of its own state.

use serde::{Deserialize, Serialize};

use crate::config;

/// Travel direction of a car.
///
/// Serialized as `"up"` / `"down"` / `"stop"` on the peer wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dirn {
    /// Travelling towards higher floors.
    Up,
    /// Travelling towards lower floors.
    Down,
    /// Not moving.
    Stop,
}

impl Dirn {
    /// Motor command byte for this direction (two's-complement style,
    /// down is encoded as 255).
    pub fn motor_byte(self) -> u8 {
        match self {
            Dirn::Up => 1,
            Dirn::Down => u8::MAX,
            Dirn::Stop => 0,
        }
    }
}

/// Behaviour state of the car's finite-state machine.
///
/// Serialized as `"idle"` / `"moving"` / `"door_open"` on the peer wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behaviour {
    /// No pending orders, motor stopped, door closed.
    Idle,
    /// Motor running towards the nearest order.
    Moving,
    /// Stopped at a floor with the door open.
    DoorOpen,
}

/// Best-effort snapshot of a car's state.
///
/// `floor` is `-1` until the first floor sensor reading calibrates the car.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarStatus {
    /// Last floor sensor reading, `-1` if uncalibrated.
    pub floor: i8,
    /// Last chosen travel direction.
    pub direction: Dirn,
    /// Current FSM state.
    pub state: Behaviour,
}

impl Default for CarStatus {
    fn default() -> Self {
        CarStatus {
            floor: config::UNCALIBRATED_FLOOR,
            direction: Dirn::Stop,
            state: Behaviour::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_wire_spelling() {
        assert_eq!(serde_json::to_string(&Dirn::Up).unwrap(), "\"up\"");
        assert_eq!(serde_json::to_string(&Dirn::Down).unwrap(), "\"down\"");
        assert_eq!(serde_json::to_string(&Dirn::Stop).unwrap(), "\"stop\"");
    }

    #[test]
    fn test_behaviour_wire_spelling() {
        assert_eq!(serde_json::to_string(&Behaviour::Idle).unwrap(), "\"idle\"");
        assert_eq!(serde_json::to_string(&Behaviour::Moving).unwrap(), "\"moving\"");
        assert_eq!(
            serde_json::to_string(&Behaviour::DoorOpen).unwrap(),
            "\"door_open\""
        );
    }

    #[test]
    fn test_default_is_uncalibrated_idle() {
        let status = CarStatus::default();
        assert_eq!(status.floor, -1);
        assert_eq!(status.direction, Dirn::Stop);
        assert_eq!(status.state, Behaviour::Idle);
    }
}
