//! Low-level driver for the elevator hardware/simulator link.
//!
//! The protocol is fixed 4-byte frames in both directions: commands are
//! fire-and-forget writes, queries are a write followed by a 4-byte read.
//! A short read means the server hung up, which is fatal for this car.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::{Arc, Mutex};

/// Button kind byte: hall call going up.
pub const HALL_UP: u8 = 0;
/// Button kind byte: hall call going down.
pub const HALL_DOWN: u8 = 1;
/// Button kind byte: cab call.
pub const CAB: u8 = 2;

/// Handle to the elevator server. Cheap to clone, the underlying
/// stream is shared and every frame exchange holds the lock so
/// request/response pairs never interleave.
#[derive(Clone, Debug)]
pub struct Elevator {
    socket: Arc<Mutex<TcpStream>>,
    /// Number of floors this car serves.
    pub num_floors: u8,
}

impl Elevator {
    /// Connects to the elevator server at `addr`.
    pub fn init(addr: &str, num_floors: u8) -> std::io::Result<Elevator> {
        Ok(Self {
            socket: Arc::new(Mutex::new(TcpStream::connect(addr)?)),
            num_floors,
        })
    }

    fn write_frame(&self, buf: [u8; 4]) -> std::io::Result<()> {
        let mut sock = self.socket.lock().unwrap();
        sock.write_all(&buf)
    }

    fn request(&self, out: [u8; 4]) -> std::io::Result<[u8; 4]> {
        let mut sock = self.socket.lock().unwrap();
        sock.write_all(&out)?;
        let mut resp = [0; 4];
        // read_exact fails with UnexpectedEof on a closed server,
        // which is exactly the "hardware link lost" condition.
        sock.read_exact(&mut resp)?;
        Ok(resp)
    }

    /// Commands the motor. Use [`crate::status::Dirn::motor_byte`] for the encoding.
    pub fn motor_direction(&self, dirn: u8) -> std::io::Result<()> {
        self.write_frame([1, dirn, 0, 0])
    }

    /// Sets a call button lamp on or off.
    pub fn call_button_light(&self, floor: u8, call: u8, on: bool) -> std::io::Result<()> {
        self.write_frame([2, call, floor, on as u8])
    }

    /// Sets the floor indicator.
    pub fn floor_indicator(&self, floor: u8) -> std::io::Result<()> {
        self.write_frame([3, floor, 0, 0])
    }

    /// Sets the door-open lamp on or off.
    pub fn door_light(&self, on: bool) -> std::io::Result<()> {
        self.write_frame([4, on as u8, 0, 0])
    }

    /// Sets the stop button lamp on or off.
    pub fn stop_button_light(&self, on: bool) -> std::io::Result<()> {
        self.write_frame([5, on as u8, 0, 0])
    }

    /// Reads a call button state.
    pub fn call_button(&self, floor: u8, call: u8) -> std::io::Result<bool> {
        let resp = self.request([6, call, floor, 0])?;
        Ok(resp[1] != 0)
    }

    /// Reads the floor sensor. `None` while between floors.
    pub fn floor_sensor(&self) -> std::io::Result<Option<u8>> {
        let resp = self.request([7, 0, 0, 0])?;
        if resp[1] != 0 {
            Ok(Some(resp[2]))
        } else {
            Ok(None)
        }
    }

    /// Reads the stop switch.
    pub fn stop_button(&self) -> std::io::Result<bool> {
        let resp = self.request([8, 0, 0, 0])?;
        Ok(resp[1] != 0)
    }

    /// Reads the obstruction switch.
    pub fn obstruction(&self) -> std::io::Result<bool> {
        let resp = self.request([9, 0, 0, 0])?;
        Ok(resp[1] != 0)
    }
}

impl std::fmt::Display for Elevator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.socket.lock().unwrap().peer_addr() {
            Ok(addr) => write!(f, "Elevator@{}({})", addr, self.num_floors),
            Err(_) => write!(f, "Elevator@?({})", self.num_floors),
        }
    }
}
