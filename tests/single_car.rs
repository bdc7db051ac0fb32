//! End-to-end test of one car against a scripted fake elevator driver.
//!
//! The fake driver speaks the 4-byte frame protocol: it records motor
//! commands, answers queries from a shared state block, and lets the test
//! script button presses and floor sensor readings.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread;

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, timeout, Duration};

use elevnet::elevator_logic;
use elevnet::elevio;
use elevnet::network::coordinator::Coordinator;
use elevnet::network::peer_link::PeerRegistry;
use elevnet::status::{Behaviour, CarStatus, Dirn};

#[derive(Default)]
struct DriverState {
    floor: Option<u8>,
    /// Pressed buttons as (call kind, floor).
    buttons: HashSet<(u8, u8)>,
    stop: bool,
    obstruction: bool,
    motor_log: Vec<u8>,
}

fn spawn_fake_driver() -> (SocketAddr, Arc<Mutex<DriverState>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind fake driver");
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(Mutex::new(DriverState::default()));

    let shared = state.clone();
    thread::spawn(move || {
        let (mut sock, _) = listener.accept().expect("Fake driver accept failed");
        let mut buf = [0u8; 4];
        while sock.read_exact(&mut buf).is_ok() {
            let mut st = shared.lock().unwrap();
            let resp = match buf[0] {
                1 => {
                    st.motor_log.push(buf[1]);
                    None
                }
                2..=5 => None,
                6 => Some([6, st.buttons.contains(&(buf[1], buf[2])) as u8, 0, 0]),
                7 => match st.floor {
                    Some(f) => Some([7, 1, f, 0]),
                    None => Some([7, 0, 0, 0]),
                },
                8 => Some([8, st.stop as u8, 0, 0]),
                9 => Some([9, st.obstruction as u8, 0, 0]),
                _ => None,
            };
            drop(st);
            if let Some(resp) = resp {
                if sock.write_all(&resp).is_err() {
                    break;
                }
            }
        }
    });

    (addr, state)
}

struct Harness {
    state: Arc<Mutex<DriverState>>,
    status_rx: watch::Receiver<CarStatus>,
    // Keeps the coordinator's peer event channel open
    _coord_tx: mpsc::Sender<elevnet::network::coordinator::CoordEvent>,
}

/// Wires up a full car (controller + coordinator) with no peers configured.
fn start_car() -> Harness {
    let (addr, state) = spawn_fake_driver();
    let (elevator, hw_event_rx) =
        elevio::init(&addr.to_string(), 4).expect("Failed to connect to fake driver");

    let (order_tx, order_rx) = mpsc::channel(16);
    let (car_event_tx, car_event_rx) = mpsc::channel(16);
    let (coord_tx, coord_rx) = mpsc::channel(16);
    let (status_tx, status_rx) = watch::channel(CarStatus::default());

    let registry = PeerRegistry::new();
    let coord = Coordinator::new(1, registry, order_tx, status_rx.clone());
    tokio::spawn(async move {
        let _ = coord.run(car_event_rx, coord_rx).await;
    });
    tokio::spawn(async move {
        let _ = elevator_logic::run(elevator, hw_event_rx, order_rx, car_event_tx, status_tx).await;
    });

    Harness {
        state,
        status_rx,
        _coord_tx: coord_tx,
    }
}

async fn wait_for_status(
    rx: &mut watch::Receiver<CarStatus>,
    what: &str,
    pred: impl Fn(&CarStatus) -> bool,
) {
    timeout(Duration::from_secs(5), async {
        loop {
            if pred(&rx.borrow()) {
                return;
            }
            rx.changed().await.expect("Status channel closed");
        }
    })
    .await
    .unwrap_or_else(|_| panic!("Timed out waiting for: {}", what));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_hall_call_is_served_end_to_end() {
    let mut car = start_car();

    // First sensor reading calibrates the car
    car.state.lock().unwrap().floor = Some(0);
    wait_for_status(&mut car.status_rx, "calibration at floor 0", |s| {
        s.floor == 0 && s.state == Behaviour::Idle
    })
    .await;

    // Hall up at floor 2: with no peers the car wins the call itself
    car.state.lock().unwrap().buttons.insert((0, 2));
    wait_for_status(&mut car.status_rx, "moving up", |s| {
        s.state == Behaviour::Moving && s.direction == Dirn::Up
    })
    .await;

    // Passing floor 1 must not trigger a stop
    car.state.lock().unwrap().floor = Some(1);
    sleep(Duration::from_millis(150)).await;
    assert_eq!(car.status_rx.borrow().state, Behaviour::Moving);
    assert_eq!(car.status_rx.borrow().floor, 1);

    // Arrival at floor 2 stops the car and opens the door
    car.state.lock().unwrap().floor = Some(2);
    wait_for_status(&mut car.status_rx, "door open at floor 2", |s| {
        s.floor == 2 && s.state == Behaviour::DoorOpen
    })
    .await;

    // Let the motor stop command reach the fake driver
    sleep(Duration::from_millis(100)).await;
    {
        let st = car.state.lock().unwrap();
        assert!(st.motor_log.contains(&1), "no up command seen: {:?}", st.motor_log);
        assert_eq!(st.motor_log.last(), Some(&0), "motor log: {:?}", st.motor_log);
    }

    // Door closes after the fixed delay; no orders remain, the car idles
    wait_for_status(&mut car.status_rx, "idle after door close", |s| {
        s.state == Behaviour::Idle
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cab_call_and_stop_button() {
    let mut car = start_car();

    car.state.lock().unwrap().floor = Some(1);
    wait_for_status(&mut car.status_rx, "calibration at floor 1", |s| {
        s.floor == 1 && s.state == Behaviour::Idle
    })
    .await;

    // Cab call down to floor 0
    car.state.lock().unwrap().buttons.insert((2, 0));
    wait_for_status(&mut car.status_rx, "moving down", |s| {
        s.state == Behaviour::Moving && s.direction == Dirn::Down
    })
    .await;

    // Stop button: halt, clear everything, go idle
    car.state.lock().unwrap().stop = true;
    wait_for_status(&mut car.status_rx, "idle after stop button", |s| {
        s.state == Behaviour::Idle
    })
    .await;

    sleep(Duration::from_millis(100)).await;
    {
        let st = car.state.lock().unwrap();
        assert_eq!(st.motor_log.last(), Some(&0), "motor log: {:?}", st.motor_log);
    }

    // Arriving at floor 0 later must not reopen the door, the order is gone
    car.state.lock().unwrap().floor = Some(0);
    sleep(Duration::from_millis(150)).await;
    assert_eq!(car.status_rx.borrow().state, Behaviour::Idle);
    assert_eq!(car.status_rx.borrow().floor, 0);
}
