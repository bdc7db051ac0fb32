//! Call coordinator: owns this car's belief about hall calls and peers.
//!
//! Every car runs the same deterministic assignment on the same inputs, so
//! only the computed winner acts; everyone else waits for the winner's
//! `assign` broadcast. There is no authoritative copy of the call map, the
//! local views converge through broadcasts.
//!
//! Single-writer discipline: the hall-call map and the peer status cache are
//! touched only by the coordinator task. Everything else reaches it through
//! message passing.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::config;
use crate::elevator_logic::fsm::Order;
use crate::network::messages::{HallDir, PeerMessage};
use crate::network::peer_link::PeerRegistry;
use crate::print;
use crate::status::CarStatus;

/// Events from the car controller to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarEvent {
    /// A hall button was pressed on this car's panel.
    HallButton {
        /// Floor of the pressed button.
        floor: u8,
        /// Direction of the pressed button.
        dir: HallDir,
    },
    /// The car stopped and opened its door at a floor.
    Arrived {
        /// The floor it stopped at.
        floor: u8,
    },
}

/// Events from the peer link manager to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordEvent {
    /// A parsed message arrived on a peer stream.
    FromPeer {
        /// Identity of the sending peer.
        id: u8,
        /// The message.
        msg: PeerMessage,
    },
    /// A peer's stream was lost and its registry entry removed.
    PeerOffline {
        /// Identity of the lost peer.
        id: u8,
    },
}

/// Per-car view of hall calls and peer statuses.
pub struct Coordinator {
    self_id: u8,
    /// Local belief per hall call: `None` = seen but unassigned.
    hall_calls: HashMap<(u8, HallDir), Option<u8>>,
    /// Last received status per peer, dropped when the peer goes offline.
    peer_status: HashMap<u8, CarStatus>,
    registry: Arc<PeerRegistry>,
    order_tx: mpsc::Sender<Order>,
    status_rx: watch::Receiver<CarStatus>,
}

/// Absolute floor distance between a car's last known floor and a call.
/// An uncalibrated floor of -1 enters the comparison as is.
fn call_cost(status: &CarStatus, call_floor: u8) -> i32 {
    (status.floor as i32 - call_floor as i32).abs()
}

/// The car that should serve a call at `call_floor`: minimum cost, ties
/// broken by smallest identity. Cars with no cached status never appear in
/// `peers` and are thereby excluded.
pub fn pick_winner(
    call_floor: u8,
    self_id: u8,
    self_status: &CarStatus,
    peers: &HashMap<u8, CarStatus>,
) -> u8 {
    let mut best = (call_cost(self_status, call_floor), self_id);
    for (&id, status) in peers {
        let candidate = (call_cost(status, call_floor), id);
        if candidate < best {
            best = candidate;
        }
    }
    best.1
}

impl Coordinator {
    /// A coordinator with empty call and status maps.
    pub fn new(
        self_id: u8,
        registry: Arc<PeerRegistry>,
        order_tx: mpsc::Sender<Order>,
        status_rx: watch::Receiver<CarStatus>,
    ) -> Coordinator {
        Coordinator {
            self_id,
            hall_calls: HashMap::new(),
            peer_status: HashMap::new(),
            registry,
            order_tx,
            status_rx,
        }
    }

    /// Consumes car and peer events until an input channel closes.
    pub async fn run(
        mut self,
        mut car_event_rx: mpsc::Receiver<CarEvent>,
        mut coord_rx: mpsc::Receiver<CoordEvent>,
    ) -> anyhow::Result<()> {
        loop {
            tokio::select! {
                ev = car_event_rx.recv() => {
                    let Some(ev) = ev else {
                        anyhow::bail!("Car event stream closed");
                    };
                    self.handle_car_event(ev).await;
                }
                ev = coord_rx.recv() => {
                    let Some(ev) = ev else {
                        anyhow::bail!("Peer event stream closed");
                    };
                    self.handle_coord_event(ev).await;
                }
            }
        }
    }

    /// Handles an event from the local car controller.
    pub async fn handle_car_event(&mut self, ev: CarEvent) {
        match ev {
            CarEvent::HallButton { floor, dir } => {
                self.registry
                    .broadcast(&PeerMessage::HallCall { floor, direction: dir })
                    .await;
                self.on_hall_call(floor, dir).await;
            }
            CarEvent::Arrived { floor } => {
                // Complete every hall call at this floor that we own
                for dir in [HallDir::Up, HallDir::Down] {
                    let key = (floor, dir);
                    if self.hall_calls.get(&key) == Some(&Some(self.self_id)) {
                        self.registry
                            .broadcast(&PeerMessage::Completed {
                                floor,
                                direction: dir,
                                by: self.self_id,
                            })
                            .await;
                        self.hall_calls.remove(&key);
                    }
                }
            }
        }
    }

    /// Handles an event from the peer link manager.
    pub async fn handle_coord_event(&mut self, ev: CoordEvent) {
        match ev {
            CoordEvent::FromPeer { id, msg } => self.handle_peer_message(id, msg).await,
            CoordEvent::PeerOffline { id } => self.on_peer_offline(id).await,
        }
    }

    async fn handle_peer_message(&mut self, _conn_id: u8, msg: PeerMessage) {
        match msg {
            // The handshake consumed the real intro; a repeat is noise
            PeerMessage::Intro { .. } => {}
            PeerMessage::Status {
                id,
                floor,
                direction,
                state,
            } => {
                self.peer_status.insert(
                    id,
                    CarStatus {
                        floor,
                        direction,
                        state,
                    },
                );
            }
            PeerMessage::HallCall { floor, direction } => {
                self.on_hall_call(floor, direction).await;
            }
            PeerMessage::Assign {
                floor,
                direction,
                assigned_to,
            } => {
                self.hall_calls.insert((floor, direction), Some(assigned_to));
                if assigned_to == self.self_id {
                    let _ = self
                        .order_tx
                        .send(Order {
                            floor,
                            hall: Some(direction),
                        })
                        .await;
                }
            }
            PeerMessage::Completed { floor, direction, by } => {
                print::peer(format!(
                    "Hall call ({}, {:?}) completed by {}",
                    floor, direction, by
                ));
                self.hall_calls.remove(&(floor, direction));
            }
        }
    }

    /// Runs the assignment algorithm for one call, unless someone already
    /// owns it in the local view.
    async fn on_hall_call(&mut self, floor: u8, dir: HallDir) {
        let key = (floor, dir);
        if matches!(self.hall_calls.get(&key), Some(Some(_))) {
            return;
        }

        let self_status = *self.status_rx.borrow();
        let winner = pick_winner(floor, self.self_id, &self_status, &self.peer_status);

        if winner == self.self_id {
            self.hall_calls.insert(key, Some(self.self_id));
            let _ = self
                .order_tx
                .send(Order {
                    floor,
                    hall: Some(dir),
                })
                .await;
            self.registry
                .broadcast(&PeerMessage::Assign {
                    floor,
                    direction: dir,
                    assigned_to: self.self_id,
                })
                .await;
            print::peer(format!("Won hall call ({}, {:?})", floor, dir));
        } else {
            // Passive observer: the winner's assign broadcast will land here
            self.hall_calls.insert(key, None);
        }
    }

    /// Drops the lost peer's status and reassigns its calls.
    ///
    /// Only the smallest identity among the survivors re-initiates, so the
    /// orphaned calls are re-broadcast exactly once across the mesh.
    async fn on_peer_offline(&mut self, id: u8) {
        print::warn(format!("Peer {} went offline", id));
        self.peer_status.remove(&id);

        let orphaned: Vec<(u8, HallDir)> = self
            .hall_calls
            .iter()
            .filter(|(_, assignee)| **assignee == Some(id))
            .map(|(key, _)| *key)
            .collect();
        for key in &orphaned {
            self.hall_calls.insert(*key, None);
        }
        if orphaned.is_empty() {
            return;
        }

        let mut smallest = self.self_id;
        for peer in self.registry.connected_ids().await {
            smallest = smallest.min(peer);
        }
        if smallest != self.self_id {
            return;
        }

        for (floor, dir) in orphaned {
            print::peer(format!("Reassigning orphaned hall call ({}, {:?})", floor, dir));
            self.registry
                .broadcast(&PeerMessage::HallCall {
                    floor,
                    direction: dir,
                })
                .await;
            self.on_hall_call(floor, dir).await;
        }
    }
}

/// Broadcasts the car's status snapshot to all peers at a fixed period.
pub async fn status_broadcaster(
    self_id: u8,
    registry: Arc<PeerRegistry>,
    status_rx: watch::Receiver<CarStatus>,
) {
    let mut ticker = tokio::time::interval(config::STATUS_PERIOD);
    loop {
        ticker.tick().await;
        let status = *status_rx.borrow();
        registry
            .broadcast(&PeerMessage::Status {
                id: self_id,
                floor: status.floor,
                direction: status.direction,
                state: status.state,
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{Behaviour, Dirn};

    fn status_at(floor: i8) -> CarStatus {
        CarStatus {
            floor,
            direction: Dirn::Stop,
            state: Behaviour::Idle,
        }
    }

    fn test_coordinator(
        self_id: u8,
        self_floor: i8,
    ) -> (Coordinator, mpsc::Receiver<Order>, Arc<PeerRegistry>) {
        let registry = PeerRegistry::new();
        let (order_tx, order_rx) = mpsc::channel(16);
        let (_status_tx, status_rx) = watch::channel(status_at(self_floor));
        let coord = Coordinator::new(self_id, registry.clone(), order_tx, status_rx);
        (coord, order_rx, registry)
    }

    #[test]
    fn test_pick_winner_prefers_lowest_cost() {
        // Car A (self, id 1) at floor 0, car B (id 2) at floor 3, call at 1
        let mut peers = HashMap::new();
        peers.insert(2, status_at(3));
        assert_eq!(pick_winner(1, 1, &status_at(0), &peers), 1);

        // Call at floor 3: B is closer
        assert_eq!(pick_winner(3, 1, &status_at(0), &peers), 2);
    }

    #[test]
    fn test_pick_winner_breaks_ties_by_smallest_id() {
        let mut peers = HashMap::new();
        peers.insert(2, status_at(2));
        peers.insert(4, status_at(2));
        // Everyone at floor 2, call at floor 2: identity 1 wins
        assert_eq!(pick_winner(2, 1, &status_at(2), &peers), 1);
        // Self has the larger identity: peer 2 wins
        assert_eq!(pick_winner(2, 3, &status_at(2), &peers), 2);
    }

    #[test]
    fn test_pick_winner_with_uncalibrated_floor() {
        let mut peers = HashMap::new();
        peers.insert(2, status_at(-1));
        // Peer cost is |-1 - 1| = 2, self cost is |1 - 1| = 0
        assert_eq!(pick_winner(1, 3, &status_at(1), &peers), 3);
    }

    #[tokio::test]
    async fn test_local_hall_call_without_peers_is_self_assigned() {
        let (mut coord, mut order_rx, _registry) = test_coordinator(1, 0);

        coord
            .handle_car_event(CarEvent::HallButton { floor: 2, dir: HallDir::Up })
            .await;

        assert_eq!(
            order_rx.recv().await,
            Some(Order { floor: 2, hall: Some(HallDir::Up) })
        );
        assert_eq!(coord.hall_calls.get(&(2, HallDir::Up)), Some(&Some(1)));
    }

    #[tokio::test]
    async fn test_losing_car_stays_passive() {
        let (mut coord, mut order_rx, _registry) = test_coordinator(2, 3);

        // Peer 1 sits at the call floor and wins
        coord
            .handle_coord_event(CoordEvent::FromPeer {
                id: 1,
                msg: PeerMessage::Status {
                    id: 1,
                    floor: 1,
                    direction: Dirn::Stop,
                    state: Behaviour::Idle,
                },
            })
            .await;
        coord
            .handle_car_event(CarEvent::HallButton { floor: 1, dir: HallDir::Down })
            .await;

        assert_eq!(coord.hall_calls.get(&(1, HallDir::Down)), Some(&None));
        assert!(order_rx.try_recv().is_err());

        // The winner's assign broadcast settles the local view
        coord
            .handle_coord_event(CoordEvent::FromPeer {
                id: 1,
                msg: PeerMessage::Assign {
                    floor: 1,
                    direction: HallDir::Down,
                    assigned_to: 1,
                },
            })
            .await;
        assert_eq!(coord.hall_calls.get(&(1, HallDir::Down)), Some(&Some(1)));
        assert!(order_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_assign_to_self_from_peer_adds_order() {
        let (mut coord, mut order_rx, _registry) = test_coordinator(2, 0);

        coord
            .handle_coord_event(CoordEvent::FromPeer {
                id: 1,
                msg: PeerMessage::Assign {
                    floor: 3,
                    direction: HallDir::Down,
                    assigned_to: 2,
                },
            })
            .await;

        assert_eq!(
            order_rx.recv().await,
            Some(Order { floor: 3, hall: Some(HallDir::Down) })
        );
    }

    #[tokio::test]
    async fn test_completed_then_fresh_call_reassigns() {
        let (mut coord, mut order_rx, _registry) = test_coordinator(1, 0);

        coord
            .handle_car_event(CarEvent::HallButton { floor: 2, dir: HallDir::Up })
            .await;
        order_rx.recv().await.unwrap();

        coord
            .handle_coord_event(CoordEvent::FromPeer {
                id: 3,
                msg: PeerMessage::Completed { floor: 2, direction: HallDir::Up, by: 3 },
            })
            .await;
        assert!(coord.hall_calls.get(&(2, HallDir::Up)).is_none());

        // The lifecycle restarts cleanly for the same key
        coord
            .handle_coord_event(CoordEvent::FromPeer {
                id: 3,
                msg: PeerMessage::HallCall { floor: 2, direction: HallDir::Up },
            })
            .await;
        assert_eq!(coord.hall_calls.get(&(2, HallDir::Up)), Some(&Some(1)));
        assert_eq!(
            order_rx.recv().await,
            Some(Order { floor: 2, hall: Some(HallDir::Up) })
        );
    }

    #[tokio::test]
    async fn test_arrival_at_owned_floor_broadcasts_completed() {
        let (mut coord, mut order_rx, registry) = test_coordinator(1, 0);
        let (line_tx, mut line_rx) = mpsc::channel(16);
        registry.register(2, 1, line_tx).await.unwrap();

        coord
            .handle_coord_event(CoordEvent::FromPeer {
                id: 2,
                msg: PeerMessage::Assign { floor: 2, direction: HallDir::Up, assigned_to: 1 },
            })
            .await;
        order_rx.recv().await.unwrap();

        coord.handle_car_event(CarEvent::Arrived { floor: 2 }).await;

        assert_eq!(
            line_rx.recv().await.unwrap(),
            "{\"type\":\"completed\",\"floor\":2,\"direction\":\"up\",\"by\":1}\n"
        );
        assert!(coord.hall_calls.is_empty());
    }

    #[tokio::test]
    async fn test_arrival_at_unowned_floor_stays_quiet() {
        let (mut coord, _order_rx, registry) = test_coordinator(2, 0);
        let (line_tx, mut line_rx) = mpsc::channel(16);
        registry.register(1, 2, line_tx).await.unwrap();

        coord
            .handle_coord_event(CoordEvent::FromPeer {
                id: 1,
                msg: PeerMessage::Assign { floor: 2, direction: HallDir::Up, assigned_to: 1 },
            })
            .await;
        coord.handle_car_event(CarEvent::Arrived { floor: 2 }).await;

        assert!(line_rx.try_recv().is_err());
        assert_eq!(coord.hall_calls.get(&(2, HallDir::Up)), Some(&Some(1)));
    }

    #[tokio::test]
    async fn test_smallest_survivor_reassigns_orphaned_calls() {
        let (mut coord, mut order_rx, registry) = test_coordinator(1, 0);
        let (line_tx, mut line_rx) = mpsc::channel(16);
        registry.register(3, 1, line_tx).await.unwrap();

        // Peer 2 owned two calls, peer 3 owns one
        for (floor, dir, owner) in [
            (2, HallDir::Up, 2),
            (3, HallDir::Down, 2),
            (1, HallDir::Down, 3),
        ] {
            coord
                .handle_coord_event(CoordEvent::FromPeer {
                    id: owner,
                    msg: PeerMessage::Assign { floor, direction: dir, assigned_to: owner },
                })
                .await;
        }

        coord.handle_coord_event(CoordEvent::PeerOffline { id: 2 }).await;

        // Self is id 1, smaller than the surviving peer 3: both orphaned
        // calls come back as local orders, the call owned by 3 is untouched
        let mut floors = vec![
            order_rx.recv().await.unwrap().floor,
            order_rx.recv().await.unwrap().floor,
        ];
        floors.sort();
        assert_eq!(floors, vec![2, 3]);
        assert_eq!(coord.hall_calls.get(&(1, HallDir::Down)), Some(&Some(3)));
        assert_eq!(coord.hall_calls.get(&(2, HallDir::Up)), Some(&Some(1)));

        // And the re-initiation was broadcast to the mesh
        let mut lines = Vec::new();
        while let Ok(line) = line_rx.try_recv() {
            lines.push(line);
        }
        assert!(lines.iter().any(|l| l.contains("\"type\":\"hall_call\"")));
        assert!(lines.iter().any(|l| l.contains("\"type\":\"assign\"")));
    }

    #[tokio::test]
    async fn test_larger_survivor_waits_for_reinitiator() {
        let (mut coord, mut order_rx, registry) = test_coordinator(3, 0);
        let (line_tx, mut line_rx) = mpsc::channel(16);
        registry.register(1, 3, line_tx).await.unwrap();

        coord
            .handle_coord_event(CoordEvent::FromPeer {
                id: 2,
                msg: PeerMessage::Assign { floor: 2, direction: HallDir::Up, assigned_to: 2 },
            })
            .await;
        coord.handle_coord_event(CoordEvent::PeerOffline { id: 2 }).await;

        // Peer 1 survives with a smaller identity, so this car only marks
        // the call unassigned and stays quiet
        assert_eq!(coord.hall_calls.get(&(2, HallDir::Up)), Some(&None));
        assert!(order_rx.try_recv().is_err());
        assert!(line_rx.try_recv().is_err());
    }
}
