//! Lamp helpers for the local car.

use crate::elevio::elev::{Elevator, CAB, HALL_DOWN, HALL_UP};

/// Turns off all three button lamps at one floor.
pub fn clear_lights_at_floor(e: &Elevator, floor: u8) -> std::io::Result<()> {
    for call in [HALL_UP, HALL_DOWN, CAB] {
        e.call_button_light(floor, call, false)?;
    }
    Ok(())
}

/// Turns off every button lamp on every floor.
pub fn clear_all_call_lights(e: &Elevator) -> std::io::Result<()> {
    for floor in 0..e.num_floors {
        clear_lights_at_floor(e, floor)?;
    }
    Ok(())
}

/// The function sets the door open light on.
pub fn set_door_open_light(e: &Elevator) -> std::io::Result<()> {
    e.door_light(true)
}

/// The function sets the door open light off.
pub fn clear_door_open_light(e: &Elevator) -> std::io::Result<()> {
    e.door_light(false)
}

/// The function sets the stop button light on.
pub fn set_stop_button_light(e: &Elevator) -> std::io::Result<()> {
    e.stop_button_light(true)
}

/// The function sets the stop button light off.
pub fn clear_stop_button_light(e: &Elevator) -> std::io::Result<()> {
    e.stop_button_light(false)
}
