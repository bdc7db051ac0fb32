//! ## Elevator I/O module for the local elevator
//!
//! The low-level frame protocol lives in [`elev`], the edge-triggered
//! sampling threads in [`poll`]. This module defines the event types the
//! controller consumes and the bridge that merges the four poll channels
//! into one ordered stream of [`ElevMessage`]s.
//!
//! Hardware events for one car are delivered in arrival order and handled
//! one at a time; the bridge never reorders within a single input kind.

pub mod elev;
pub mod poll;

use crossbeam_channel as cbc;
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::config;
use crate::print;

/// Represents different types of elevator messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElevMsgType {
    /// Call button press event.
    CALLBTN,
    /// Floor sensor event.
    FLOORSENS,
    /// Stop button press event.
    STOPBTN,
    /// Obstruction detected event.
    OBSTRX,
}

/// Represents a message related to elevator events.
#[derive(Debug, Clone, Copy)]
pub struct ElevMessage {
    /// The type of elevator message.
    pub msg_type: ElevMsgType,
    /// Call button information, if applicable.
    pub call_button: Option<CallButton>,
    /// Floor sensor reading, indicating the current floor.
    pub floor_sensor: Option<u8>,
    /// Stop button state (`true` if pressed).
    pub stop_button: Option<bool>,
    /// Obstruction status (`true` if obstruction detected).
    pub obstruction: Option<bool>,
}

/// Represents the kind of a call button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallType {
    /// Hall button requesting upward travel.
    HallUp,
    /// Hall button requesting downward travel.
    HallDown,
    /// Button inside the cab.
    Cab,
}

impl CallType {
    /// Decodes a driver button-kind byte. Unknown bytes yield `None`.
    pub fn from_byte(value: u8) -> Option<CallType> {
        match value {
            elev::HALL_UP => Some(CallType::HallUp),
            elev::HALL_DOWN => Some(CallType::HallDown),
            elev::CAB => Some(CallType::Cab),
            _ => None,
        }
    }

    /// Driver button-kind byte for lamp commands.
    pub fn as_byte(self) -> u8 {
        match self {
            CallType::HallUp => elev::HALL_UP,
            CallType::HallDown => elev::HALL_DOWN,
            CallType::Cab => elev::CAB,
        }
    }
}

/// A button press registered by the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallButton {
    /// The floor where the call was made.
    pub floor: u8,
    /// The kind of the pressed button.
    pub call_type: CallType,
}

/// Connects to the elevator server, starts the poll threads, and returns the
/// driver handle together with the merged event stream.
///
/// ## Behavior
/// - One plain thread per input kind samples the hardware (see [`poll`]).
/// - A tokio task drains the crossbeam channels and forwards each change as
///   an [`ElevMessage`] on the returned receiver, preserving per-kind order.
pub fn init(addr: &str, num_floors: u8) -> std::io::Result<(elev::Elevator, mpsc::Receiver<ElevMessage>)> {
    let elevator = elev::Elevator::init(addr, num_floors)?;
    print::ok(format!("Connected to elevator server: {}", elevator));

    let (call_button_tx, call_button_rx) = cbc::unbounded::<CallButton>();
    let (floor_sensor_tx, floor_sensor_rx) = cbc::unbounded::<u8>();
    let (stop_button_tx, stop_button_rx) = cbc::unbounded::<bool>();
    let (obstruction_tx, obstruction_rx) = cbc::unbounded::<bool>();

    {
        let elevator = elevator.clone();
        std::thread::spawn(move || poll::call_buttons(elevator, call_button_tx, config::ELEV_POLL));
    }
    {
        let elevator = elevator.clone();
        std::thread::spawn(move || poll::floor_sensor(elevator, floor_sensor_tx, config::ELEV_POLL));
    }
    {
        let elevator = elevator.clone();
        std::thread::spawn(move || poll::stop_button(elevator, stop_button_tx, config::ELEV_POLL));
    }
    {
        let elevator = elevator.clone();
        std::thread::spawn(move || poll::obstruction(elevator, obstruction_tx, config::ELEV_POLL));
    }

    let (event_tx, event_rx) = mpsc::channel::<ElevMessage>(config::EVENT_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        forward_hw_events(
            call_button_rx,
            floor_sensor_rx,
            stop_button_rx,
            obstruction_rx,
            event_tx,
        )
        .await;
    });

    Ok((elevator, event_rx))
}

/// Forwards messages from the poll threads to the controller's event queue.
async fn forward_hw_events(
    call_button_rx: cbc::Receiver<CallButton>,
    floor_sensor_rx: cbc::Receiver<u8>,
    stop_button_rx: cbc::Receiver<bool>,
    obstruction_rx: cbc::Receiver<bool>,
    event_tx: mpsc::Sender<ElevMessage>,
) {
    loop {
        if let Ok(call_button) = call_button_rx.try_recv() {
            let msg = ElevMessage {
                msg_type: ElevMsgType::CALLBTN,
                call_button: Some(call_button),
                floor_sensor: None,
                stop_button: None,
                obstruction: None,
            };
            let _ = event_tx.send(msg).await;
        }

        if let Ok(floor) = floor_sensor_rx.try_recv() {
            let msg = ElevMessage {
                msg_type: ElevMsgType::FLOORSENS,
                call_button: None,
                floor_sensor: Some(floor),
                stop_button: None,
                obstruction: None,
            };
            let _ = event_tx.send(msg).await;
        }

        if let Ok(stop) = stop_button_rx.try_recv() {
            let msg = ElevMessage {
                msg_type: ElevMsgType::STOPBTN,
                call_button: None,
                floor_sensor: None,
                stop_button: Some(stop),
                obstruction: None,
            };
            let _ = event_tx.send(msg).await;
        }

        if let Ok(obstr) = obstruction_rx.try_recv() {
            let msg = ElevMessage {
                msg_type: ElevMsgType::OBSTRX,
                call_button: None,
                floor_sensor: None,
                stop_button: None,
                obstruction: Some(obstr),
            };
            let _ = event_tx.send(msg).await;
        }

        sleep(config::ELEV_POLL).await;
    }
}
