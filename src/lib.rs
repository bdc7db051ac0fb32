#![warn(missing_docs)]
//! # This projects library
//!
//! This library runs one car of a peer-to-peer elevator system: a driver
//! interface, a sequential car controller, and a symmetric peer mesh that
//! assigns hall calls to the cheapest car.
//!
//! ## Overview
//! - **Config**: Static program parameters and print toggles.
//! - **Init**: Command line parsing and startup configuration.
//! - **Print**: Print functions with color coding.
//! - **Status**: The car snapshot shared between controller and network.
//! - **Elevio**: Interface for elevator I/O.
//! - **Elevator Logic**: The car's finite-state machine and event loop.
//! - **Network**: Peer streams, wire protocol, and call coordination.

/// Global variables
pub mod config;

/// Initialize functions
pub mod init;

/// Print functions with color coding
pub mod print;

/// Car status snapshot and its wire encodings
pub mod status;

/// Interface for elevator input/output
pub mod elevio;

/// Elevator control logic
pub mod elevator_logic;

/// Peer networking and hall call coordination
pub mod network;
