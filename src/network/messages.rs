//! Peer wire protocol: newline-delimited JSON, one message per line.
//!
//! The `type` field tags the variant. Malformed lines are dropped silently
//! by the read loop; the periodic status and assign rebroadcasts make the
//! protocol self-healing.

use serde::{Deserialize, Serialize};

use crate::elevio::elev;
use crate::status::{Behaviour, Dirn};

/// Direction of a hall call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HallDir {
    /// The up hall button.
    Up,
    /// The down hall button.
    Down,
}

impl HallDir {
    /// Driver button-kind byte for the matching hall lamp.
    pub fn as_call_byte(self) -> u8 {
        match self {
            HallDir::Up => elev::HALL_UP,
            HallDir::Down => elev::HALL_DOWN,
        }
    }
}

/// One line on a peer stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerMessage {
    /// Handshake, sent once as the first line on every stream.
    Intro {
        /// Identity of the sending car.
        id: u8,
    },
    /// Periodic car snapshot, feeds the peer status cache.
    Status {
        /// Identity of the sending car.
        id: u8,
        /// Last floor sensor reading, -1 while uncalibrated.
        floor: i8,
        /// Last chosen travel direction.
        direction: Dirn,
        /// Current FSM state.
        state: Behaviour,
    },
    /// A hall button was pressed somewhere; every receiver runs assignment.
    HallCall {
        /// Floor of the pressed button.
        floor: u8,
        /// Direction of the pressed button.
        direction: HallDir,
    },
    /// The assignment winner announces its decision.
    Assign {
        /// Floor of the call.
        floor: u8,
        /// Direction of the call.
        direction: HallDir,
        /// Identity of the winning car.
        assigned_to: u8,
    },
    /// The owning car stopped at the call's floor.
    Completed {
        /// Floor of the call.
        floor: u8,
        /// Direction of the call.
        direction: HallDir,
        /// Identity of the car that served it.
        by: u8,
    },
}

impl PeerMessage {
    /// Serializes the message as one wire line, newline included.
    pub fn to_line(&self) -> anyhow::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Parses one wire line. `None` means the line was malformed and should
    /// be dropped.
    pub fn from_line(line: &str) -> Option<PeerMessage> {
        serde_json::from_str(line.trim()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intro_wire_format() {
        let msg = PeerMessage::Intro { id: 2 };
        assert_eq!(msg.to_line().unwrap(), "{\"type\":\"intro\",\"id\":2}\n");
    }

    #[test]
    fn test_status_wire_format() {
        let msg = PeerMessage::Status {
            id: 1,
            floor: -1,
            direction: Dirn::Stop,
            state: Behaviour::DoorOpen,
        };
        let line = msg.to_line().unwrap();
        assert_eq!(
            line,
            "{\"type\":\"status\",\"id\":1,\"floor\":-1,\"direction\":\"stop\",\"state\":\"door_open\"}\n"
        );
        assert_eq!(PeerMessage::from_line(&line), Some(msg));
    }

    #[test]
    fn test_hall_call_and_assign_wire_format() {
        let call = PeerMessage::HallCall { floor: 3, direction: HallDir::Down };
        assert_eq!(
            call.to_line().unwrap(),
            "{\"type\":\"hall_call\",\"floor\":3,\"direction\":\"down\"}\n"
        );

        let assign = PeerMessage::Assign { floor: 3, direction: HallDir::Down, assigned_to: 1 };
        assert_eq!(
            assign.to_line().unwrap(),
            "{\"type\":\"assign\",\"floor\":3,\"direction\":\"down\",\"assigned_to\":1}\n"
        );
    }

    #[test]
    fn test_completed_round_trip() {
        let msg = PeerMessage::Completed { floor: 0, direction: HallDir::Up, by: 3 };
        let line = msg.to_line().unwrap();
        assert_eq!(
            line,
            "{\"type\":\"completed\",\"floor\":0,\"direction\":\"up\",\"by\":3}\n"
        );
        assert_eq!(PeerMessage::from_line(&line), Some(msg));
    }

    #[test]
    fn test_malformed_lines_are_dropped() {
        assert_eq!(PeerMessage::from_line("not json"), None);
        assert_eq!(PeerMessage::from_line("{\"type\":\"unknown\"}"), None);
        assert_eq!(PeerMessage::from_line("{\"type\":\"intro\"}"), None);
        assert_eq!(PeerMessage::from_line(""), None);
    }
}
