//! ## Car controller for the local elevator
//!
//! Owns the [`fsm::Car`] state and drives it with one event at a time:
//! hardware events from [`crate::elevio`], assigned orders from the call
//! coordinator, and the door timer. After every handled event the fresh
//! [`crate::status::CarStatus`] is published on a watch channel, which is the
//! read seam for the coordinator and the status broadcaster.

pub mod fsm;
pub mod lights;
pub mod timer;

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};

use crate::config;
use crate::elevio::elev::Elevator;
use crate::elevio::{ElevMessage, ElevMsgType};
use crate::network::coordinator::CarEvent;
use crate::print;

/// Runs the car controller until an event source closes or the hardware
/// fails.
///
/// ## Parameters
/// - `e`: connected driver handle, also used for lamp and motor commands.
/// - `hw_event_rx`: merged hardware event stream from [`crate::elevio::init`].
/// - `order_rx`: orders won for this car by the call coordinator.
/// - `car_event_tx`: hall delegations and arrival reports to the coordinator.
/// - `status_tx`: publishes the car snapshot after every handled event.
pub async fn run(
    e: Elevator,
    mut hw_event_rx: mpsc::Receiver<ElevMessage>,
    mut order_rx: mpsc::Receiver<fsm::Order>,
    car_event_tx: mpsc::Sender<CarEvent>,
    status_tx: watch::Sender<crate::status::CarStatus>,
) -> anyhow::Result<()> {
    let mut car = fsm::Car::new(e.num_floors);
    let mut door_timer = timer::Timer::new(config::DOOR_OPEN_TIME);
    let _ = status_tx.send(car.status());

    loop {
        let door_deadline = door_timer.deadline();
        let door_armed = door_deadline.is_some();
        let deadline = door_deadline.unwrap_or_else(Instant::now);

        tokio::select! {
            msg = hw_event_rx.recv() => {
                let Some(msg) = msg else {
                    anyhow::bail!("Hardware event stream closed");
                };
                handle_hw_event(&mut car, &e, &mut door_timer, msg, &car_event_tx).await?;
            }
            order = order_rx.recv() => {
                let Some(order) = order else {
                    anyhow::bail!("Order stream from coordinator closed");
                };
                fsm::on_order_assigned(&mut car, &e, &mut door_timer, order, &car_event_tx).await?;
            }
            _ = sleep_until(deadline), if door_armed => {
                fsm::on_door_timeout(&mut car, &e, &mut door_timer, &car_event_tx).await?;
            }
        }

        let _ = status_tx.send(car.status());
    }
}

async fn handle_hw_event(
    car: &mut fsm::Car,
    e: &Elevator,
    door_timer: &mut timer::Timer,
    msg: ElevMessage,
    car_event_tx: &mpsc::Sender<CarEvent>,
) -> anyhow::Result<()> {
    match msg.msg_type {
        ElevMsgType::CALLBTN => {
            if let Some(btn) = msg.call_button {
                print::info(format!("Callbutton: {:?}", btn));
                fsm::on_call_button(car, e, door_timer, btn, car_event_tx).await?;
            }
        }
        ElevMsgType::FLOORSENS => {
            if let Some(floor) = msg.floor_sensor {
                print::info(format!("Floor: {:?}", floor));
                fsm::on_floor_arrival(car, e, door_timer, floor, car_event_tx).await?;
            }
        }
        ElevMsgType::STOPBTN => {
            if let Some(pressed) = msg.stop_button {
                print::info(format!("Stop button: {:?}", pressed));
                fsm::on_stop_button(car, e, door_timer, pressed)?;
            }
        }
        ElevMsgType::OBSTRX => {
            if let Some(active) = msg.obstruction {
                print::info(format!("Obstruction: {:?}", active));
                fsm::on_obstruction(car, e, active)?;
            }
        }
    }
    Ok(())
}
