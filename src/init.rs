//! Startup configuration from `cargo run` arguments.

use std::env;

use crate::config;

/// Runtime configuration for one car, parsed from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// This car's identity. Must be unique across the mesh.
    pub id: u8,
    /// `host:port` of the elevator driver/simulator.
    pub driver_addr: String,
    /// Port for inbound peer streams.
    pub listen_port: u16,
    /// Number of floors served.
    pub num_floors: u8,
    /// `host:port` of every configured peer to dial.
    pub peers: Vec<String>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            id: 1,
            driver_addr: format!("{}:{}", config::DEFAULT_DRIVER_HOST, config::DEFAULT_DRIVER_PORT),
            listen_port: config::DEFAULT_LISTEN_PORT,
            num_floors: config::DEFAULT_NUM_FLOORS,
            peers: Vec::new(),
        }
    }
}

/// ### Reads arguments from `cargo run`
///
/// Available options:
///
/// `id::N` &rarr; This car's identity (unique small integer)
/// `driver::host:port` &rarr; Address of the elevator driver/simulator
/// `listen::port` &rarr; Port to accept inbound peer streams on
/// `floors::N` &rarr; Number of floors served
/// `peer::host:port` &rarr; A peer to dial (repeatable)
/// `print_err::(true/false)` &rarr; Prints error messages
/// `print_warn::(true/false)` &rarr; Prints warning messages
/// `print_ok::(true/false)` &rarr; Prints OK messages
/// `print_info::(true/false)` &rarr; Prints informational messages
/// `print_else::(true/false)` &rarr; Prints peer/color messages
/// `debug::` &rarr; Disables all prints except error messages
/// `help` &rarr; Displays all possible arguments without starting the program
///
/// If no arguments are provided, all defaults apply and all prints are on.
pub fn parse_args() -> Config {
    parse_arg_list(&env::args().skip(1).collect::<Vec<String>>())
}

fn parse_arg_list(args: &[String]) -> Config {
    let mut cfg = Config::default();

    for arg in args {
        let parts: Vec<&str> = arg.split("::").collect();
        if parts.len() == 2 {
            let key = parts[0].to_lowercase();
            let value = parts[1].to_lowercase();
            let is_true = value == "true";

            match key.as_str() {
                "id" => {
                    if let Ok(id) = value.parse() {
                        cfg.id = id;
                    }
                }
                "driver" => cfg.driver_addr = parts[1].to_string(),
                "listen" => {
                    if let Ok(port) = value.parse() {
                        cfg.listen_port = port;
                    }
                }
                "floors" => {
                    if let Ok(floors) = value.parse() {
                        cfg.num_floors = floors;
                    }
                }
                "peer" => cfg.peers.push(parts[1].to_string()),
                "print_err" => *config::PRINT_ERR_ON.lock().unwrap() = is_true,
                "print_warn" => *config::PRINT_WARN_ON.lock().unwrap() = is_true,
                "print_ok" => *config::PRINT_OK_ON.lock().unwrap() = is_true,
                "print_info" => *config::PRINT_INFO_ON.lock().unwrap() = is_true,
                "print_else" => *config::PRINT_ELSE_ON.lock().unwrap() = is_true,
                "debug" => {
                    *config::PRINT_WARN_ON.lock().unwrap() = false;
                    *config::PRINT_OK_ON.lock().unwrap() = false;
                    *config::PRINT_INFO_ON.lock().unwrap() = false;
                    *config::PRINT_ELSE_ON.lock().unwrap() = false;
                }
                _ => {}
            }
        } else if arg.to_lowercase() == "help" {
            println!("Available arguments:");
            println!("  id::N                (unique car identity, default 1)");
            println!("  driver::host:port    (elevator driver address, default {}:{})",
                config::DEFAULT_DRIVER_HOST, config::DEFAULT_DRIVER_PORT);
            println!("  listen::port         (peer listen port, default {})", config::DEFAULT_LISTEN_PORT);
            println!("  floors::N            (number of floors, default {})", config::DEFAULT_NUM_FLOORS);
            println!("  peer::host:port      (peer to dial, repeatable)");
            println!("  print_err::true/false");
            println!("  print_warn::true/false");
            println!("  print_ok::true/false");
            println!("  print_info::true/false");
            println!("  print_else::true/false");
            println!("  debug                (only error messages shown)");
            std::process::exit(0);
        }
    }

    cfg
}
