use tokio::sync::{mpsc, watch};

use elevnet::network::{coordinator, peer_link};
use elevnet::{config, elevator_logic, elevio, status};
use elevnet::init;
use elevnet::print;

#[tokio::main]
async fn main() {
    let cfg = init::parse_args();
    print::info(format!("Starting car {} against driver {}", cfg.id, cfg.driver_addr));

    // Connect to the elevator driver and start the hardware poll threads
    let (elevator, hw_event_rx) = match elevio::init(&cfg.driver_addr, cfg.num_floors) {
        Ok(pair) => pair,
        Err(e) => {
            print::err(format!("Failed to connect to elevator driver: {}", e));
            std::process::exit(1);
        }
    };

    /* START ----------- Init of channels between controller, coordinator and peers ----------- */
    let (order_tx, order_rx) = mpsc::channel(config::EVENT_CHANNEL_CAPACITY);
    let (car_event_tx, car_event_rx) = mpsc::channel(config::EVENT_CHANNEL_CAPACITY);
    let (coord_tx, coord_rx) = mpsc::channel(config::EVENT_CHANNEL_CAPACITY);
    let (status_tx, status_rx) = watch::channel(status::CarStatus::default());

    let registry = peer_link::PeerRegistry::new();
    /* END ----------- Init of channels between controller, coordinator and peers ----------- */

    /* START ----------- Peer networking tasks ----------- */
    // Task accepting inbound peer streams
    {
        let registry = registry.clone();
        let coord_tx = coord_tx.clone();
        let listen_port = cfg.listen_port;
        let id = cfg.id;
        let _listener_task = tokio::spawn(async move {
            if let Err(e) = peer_link::listen(listen_port, id, registry, coord_tx).await {
                print::err(format!("Peer listener failed: {}", e));
            }
        });
    }

    // One dial task per configured peer
    for peer_addr in cfg.peers.clone() {
        let registry = registry.clone();
        let coord_tx = coord_tx.clone();
        let id = cfg.id;
        let _dial_task = tokio::spawn(async move {
            peer_link::dial(peer_addr, id, registry, coord_tx).await;
        });
    }

    // Task broadcasting our status snapshot to all peers
    {
        let registry = registry.clone();
        let status_rx = status_rx.clone();
        let id = cfg.id;
        let _status_task = tokio::spawn(async move {
            coordinator::status_broadcaster(id, registry, status_rx).await;
        });
    }
    /* END ----------- Peer networking tasks ----------- */

    /* START ----------- Call coordinator task ----------- */
    {
        let coord = coordinator::Coordinator::new(cfg.id, registry.clone(), order_tx, status_rx.clone());
        let _coordinator_task = tokio::spawn(async move {
            if let Err(e) = coord.run(car_event_rx, coord_rx).await {
                print::err(format!("Coordinator stopped: {}", e));
            }
        });
    }
    /* END ----------- Call coordinator task ----------- */

    // The car controller runs in the foreground; losing the hardware link or
    // an internal channel ends the process
    if let Err(e) = elevator_logic::run(elevator, hw_event_rx, order_rx, car_event_tx, status_tx).await {
        print::err(format!("Car controller stopped: {}", e));
        std::process::exit(1);
    }
}
