//! Edge-triggered polling of the elevator hardware.
//!
//! One plain thread per input kind samples the driver at a fixed period and
//! sends a message on value change only. Losing the hardware link is fatal
//! for this car: the poll thread logs it and terminates the process, since
//! we must not keep issuing motor commands we cannot verify.

use crossbeam_channel as cbc;
use std::thread;
use std::time;

use super::elev::{self, Elevator};
use super::{CallButton, CallType};
use crate::print;

fn hw_fatal(e: std::io::Error) -> ! {
    print::err(format!("Lost connection to elevator server: {}", e));
    std::process::exit(1);
}

/// Polls all call buttons, sending a [`CallButton`] on each fresh press.
pub fn call_buttons(elev: Elevator, ch: cbc::Sender<CallButton>, period: time::Duration) {
    let mut prev = vec![[false; 3]; elev.num_floors.into()];
    loop {
        for f in 0..elev.num_floors {
            for c in 0..3 {
                let v = match elev.call_button(f, c) {
                    Ok(v) => v,
                    Err(e) => hw_fatal(e),
                };
                if v && prev[f as usize][c as usize] != v {
                    if let Some(call_type) = CallType::from_byte(c) {
                        let _ = ch.send(CallButton { floor: f, call_type });
                    }
                }
                prev[f as usize][c as usize] = v;
            }
        }
        thread::sleep(period)
    }
}

/// Polls the floor sensor, sending the floor number on floor change only.
pub fn floor_sensor(elev: Elevator, ch: cbc::Sender<u8>, period: time::Duration) {
    let mut prev = u8::MAX;
    loop {
        match elev.floor_sensor() {
            Ok(Some(f)) => {
                if f != prev {
                    let _ = ch.send(f);
                    prev = f;
                }
            }
            Ok(None) => {}
            Err(e) => hw_fatal(e),
        }
        thread::sleep(period)
    }
}

/// Polls the stop switch, sending on state change.
pub fn stop_button(elev: Elevator, ch: cbc::Sender<bool>, period: time::Duration) {
    let mut prev = false;
    loop {
        let v = match elev.stop_button() {
            Ok(v) => v,
            Err(e) => hw_fatal(e),
        };
        if prev != v {
            let _ = ch.send(v);
            prev = v;
        }
        thread::sleep(period)
    }
}

/// Polls the obstruction switch, sending on state change.
pub fn obstruction(elev: Elevator, ch: cbc::Sender<bool>, period: time::Duration) {
    let mut prev = false;
    loop {
        let v = match elev.obstruction() {
            Ok(v) => v,
            Err(e) => hw_fatal(e),
        };
        if prev != v {
            let _ = ch.send(v);
            prev = v;
        }
        thread::sleep(period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_type_from_byte() {
        assert_eq!(CallType::from_byte(elev::HALL_UP), Some(CallType::HallUp));
        assert_eq!(CallType::from_byte(elev::HALL_DOWN), Some(CallType::HallDown));
        assert_eq!(CallType::from_byte(elev::CAB), Some(CallType::Cab));
        assert_eq!(CallType::from_byte(7), None);
    }
}
