//! The car's finite-state machine: Idle / Moving / DoorOpen.
//!
//! Every transition is driven by one discrete event (button press, floor
//! sensor, stop button, obstruction, assigned order, door timeout) and runs
//! to completion before the next event is handled. Hall button presses are
//! never served directly: they are delegated to the call coordinator, which
//! hands the floor back through an assigned order if this car wins it.

use std::collections::BTreeSet;

use tokio::sync::mpsc;

use crate::config;
use crate::elevio::elev::{Elevator, CAB};
use crate::elevio::CallButton;
use crate::elevio::CallType;
use crate::network::coordinator::CarEvent;
use crate::network::messages::HallDir;
use crate::status::{Behaviour, CarStatus, Dirn};

use super::lights;
use super::timer::Timer;

/// An order handed to the car by the call coordinator.
///
/// `hall` carries the hall direction when the order stems from a won hall
/// call, so the controller can light the matching hall lamp. Cab calls never
/// travel this path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    /// Floor the car now owes a visit.
    pub floor: u8,
    /// Hall direction of the winning call, if any.
    pub hall: Option<HallDir>,
}

/// Mutable state of the local car. Single writer: the controller event loop.
pub struct Car {
    /// Last floor sensor reading, `-1` until calibrated.
    pub floor: i8,
    /// Last chosen travel direction.
    pub dirn: Dirn,
    /// Current FSM state.
    pub behaviour: Behaviour,
    /// Floors this car owes a visit: cab calls plus won hall calls.
    pub orders: BTreeSet<u8>,
    /// Number of floors served.
    pub num_floors: u8,
}

impl Car {
    /// A fresh, uncalibrated car with no orders.
    pub fn new(num_floors: u8) -> Car {
        Car {
            floor: config::UNCALIBRATED_FLOOR,
            dirn: Dirn::Stop,
            behaviour: Behaviour::Idle,
            orders: BTreeSet::new(),
            num_floors,
        }
    }

    /// Snapshot for the coordinator and the status broadcaster.
    pub fn status(&self) -> CarStatus {
        CarStatus {
            floor: self.floor,
            direction: self.dirn,
            state: self.behaviour,
        }
    }

    /// The pending order closest to the current floor by absolute distance.
    /// Uncalibrated cars measure from floor 0. Ties go to the lowest floor.
    pub fn closest_order(&self) -> Option<u8> {
        let current = if self.floor == config::UNCALIBRATED_FLOOR {
            0
        } else {
            self.floor
        };
        self.orders
            .iter()
            .copied()
            .min_by_key(|f| (*f as i8 - current).abs())
    }
}

/// Handles a button press from the hardware.
///
/// Cab calls are served locally; hall calls are delegated to the coordinator
/// and only enter `orders` through [`on_order_assigned`].
pub async fn on_call_button(
    car: &mut Car,
    e: &Elevator,
    door_timer: &mut Timer,
    btn: CallButton,
    car_event_tx: &mpsc::Sender<CarEvent>,
) -> anyhow::Result<()> {
    match btn.call_type {
        CallType::Cab => {
            car.orders.insert(btn.floor);
            e.call_button_light(btn.floor, CAB, true)?;

            if car.behaviour == Behaviour::Idle {
                start_moving(car, e, door_timer, car_event_tx).await?;
            } else if car.behaviour == Behaviour::DoorOpen && car.floor == btn.floor as i8 {
                // Fresh stop at the same floor: restarts the door timer
                stop_at_floor(car, e, door_timer, btn.floor, car_event_tx).await?;
            }
        }
        CallType::HallUp | CallType::HallDown => {
            let dir = if btn.call_type == CallType::HallUp {
                HallDir::Up
            } else {
                HallDir::Down
            };
            let _ = car_event_tx
                .send(CarEvent::HallButton {
                    floor: btn.floor,
                    dir,
                })
                .await;
        }
    }
    Ok(())
}

/// Handles an order won through the call coordinator.
pub async fn on_order_assigned(
    car: &mut Car,
    e: &Elevator,
    door_timer: &mut Timer,
    order: Order,
    car_event_tx: &mpsc::Sender<CarEvent>,
) -> anyhow::Result<()> {
    car.orders.insert(order.floor);
    if let Some(dir) = order.hall {
        e.call_button_light(order.floor, dir.as_call_byte(), true)?;
    }

    if car.behaviour == Behaviour::Idle {
        start_moving(car, e, door_timer, car_event_tx).await?;
    } else if car.behaviour == Behaviour::DoorOpen && car.floor == order.floor as i8 {
        stop_at_floor(car, e, door_timer, order.floor, car_event_tx).await?;
    }
    Ok(())
}

/// Handles a floor sensor reading.
///
/// The first reading after startup calibrates the car and is treated as an
/// arrival, so a pending order at the calibration floor is served right away.
pub async fn on_floor_arrival(
    car: &mut Car,
    e: &Elevator,
    door_timer: &mut Timer,
    floor: u8,
    car_event_tx: &mpsc::Sender<CarEvent>,
) -> anyhow::Result<()> {
    let calibrating = car.floor == config::UNCALIBRATED_FLOOR;
    car.floor = floor as i8;
    e.floor_indicator(floor)?;

    if (car.behaviour == Behaviour::Moving || calibrating) && car.orders.contains(&floor) {
        stop_at_floor(car, e, door_timer, floor, car_event_tx).await?;
    }
    Ok(())
}

/// Handles the door timer elapsing.
///
/// Only acts when still in `DoorOpen`; an intervening same-floor stop armed a
/// fresh deadline and this one was already invalidated by the event loop.
pub async fn on_door_timeout(
    car: &mut Car,
    e: &Elevator,
    door_timer: &mut Timer,
    car_event_tx: &mpsc::Sender<CarEvent>,
) -> anyhow::Result<()> {
    door_timer.cancel();
    if car.behaviour != Behaviour::DoorOpen {
        return Ok(());
    }

    lights::clear_door_open_light(e)?;
    if !car.orders.is_empty() {
        start_moving(car, e, door_timer, car_event_tx).await?;
    } else {
        car.behaviour = Behaviour::Idle;
        e.motor_direction(Dirn::Stop.motor_byte())?;
    }
    Ok(())
}

/// Handles the stop switch.
///
/// Pressing it always clears every button lamp and every order and halts the
/// motor, regardless of prior state. Releasing it only clears the stop lamp.
pub fn on_stop_button(
    car: &mut Car,
    e: &Elevator,
    door_timer: &mut Timer,
    pressed: bool,
) -> anyhow::Result<()> {
    if pressed {
        lights::clear_all_call_lights(e)?;
        lights::set_stop_button_light(e)?;
        e.motor_direction(Dirn::Stop.motor_byte())?;
        car.behaviour = Behaviour::Idle;
        car.orders.clear();
        door_timer.cancel();
    } else {
        lights::clear_stop_button_light(e)?;
    }
    Ok(())
}

/// Handles the obstruction switch.
pub fn on_obstruction(car: &Car, e: &Elevator, active: bool) -> anyhow::Result<()> {
    if active {
        e.motor_direction(Dirn::Stop.motor_byte())?;
    } else if car.behaviour == Behaviour::Moving {
        e.motor_direction(car.dirn.motor_byte())?;
    }
    Ok(())
}

/// Picks the nearest pending order and starts the motor towards it.
///
/// An order at the current floor skips motion and goes straight to the
/// stop/open-door sequence. With no orders the car goes Idle.
pub async fn start_moving(
    car: &mut Car,
    e: &Elevator,
    door_timer: &mut Timer,
    car_event_tx: &mpsc::Sender<CarEvent>,
) -> anyhow::Result<()> {
    let Some(target) = car.closest_order() else {
        car.behaviour = Behaviour::Idle;
        e.motor_direction(Dirn::Stop.motor_byte())?;
        return Ok(());
    };

    let current = if car.floor == config::UNCALIBRATED_FLOOR {
        0
    } else {
        car.floor
    };

    if target as i8 == current {
        stop_at_floor(car, e, door_timer, target, car_event_tx).await?;
        return Ok(());
    }

    car.dirn = if target as i8 > current {
        Dirn::Up
    } else {
        Dirn::Down
    };
    e.motor_direction(car.dirn.motor_byte())?;
    car.behaviour = Behaviour::Moving;
    Ok(())
}

/// Stops at `floor`, opens the door, and arms the door timer.
///
/// Clears the served order and all three button lamps at the floor, and
/// reports the arrival to the coordinator so owned hall calls get their
/// `completed` broadcast.
pub async fn stop_at_floor(
    car: &mut Car,
    e: &Elevator,
    door_timer: &mut Timer,
    floor: u8,
    car_event_tx: &mpsc::Sender<CarEvent>,
) -> anyhow::Result<()> {
    e.motor_direction(Dirn::Stop.motor_byte())?;
    car.behaviour = Behaviour::DoorOpen;
    car.orders.remove(&floor);

    lights::clear_lights_at_floor(e, floor)?;
    lights::set_door_open_light(e)?;
    door_timer.start();

    let _ = car_event_tx.send(CarEvent::Arrived { floor }).await;
    Ok(())
}
