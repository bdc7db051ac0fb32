//! ## Printing Module
//!
//! This module is only here to make logging in the terminal easier to read.
//! It allows to print in appropriate colors depending on the situation.
use crate::config;
use ansi_term::Colour::{self, Green, Purple, Red, Yellow};

/// Prints a message in a specified color to the terminal.
///
/// If `PRINT_ELSE_ON` is `false`, the message will not be printed.
pub fn color(msg: String, color: Colour) {
    let print_stat = config::PRINT_ELSE_ON.lock().unwrap().clone();

    if print_stat {
        println!("{}{}", color.paint("[CUSTOM]:  "), color.paint(msg));
    }
}

/// Prints an error message in red to the terminal.
///
/// If `PRINT_ERR_ON` is `false`, the message will not be printed.
///
/// ## Terminal output
/// - "\[ERROR\]:   {}", msg
pub fn err(msg: String) {
    let print_stat = config::PRINT_ERR_ON.lock().unwrap().clone();

    if print_stat {
        println!("{}{}", Red.paint("[ERROR]:   "), Red.paint(msg));
    }
}

/// Prints a warning message in yellow to the terminal.
///
/// If `PRINT_WARN_ON` is `false`, the message will not be printed.
///
/// ## Terminal output
/// - "\[WARNING\]: {}", msg
pub fn warn(msg: String) {
    let print_stat = config::PRINT_WARN_ON.lock().unwrap().clone();

    if print_stat {
        println!("{}{}", Yellow.paint("[WARNING]: "), Yellow.paint(msg));
    }
}

/// Prints a success message in green to the terminal.
///
/// If `PRINT_OK_ON` is `false`, the message will not be printed.
///
/// ## Terminal output
/// - "\[OK\]:      {}", msg
pub fn ok(msg: String) {
    let print_stat = config::PRINT_OK_ON.lock().unwrap().clone();

    if print_stat {
        println!("{}{}", Green.paint("[OK]:      "), Green.paint(msg));
    }
}

/// Prints an informational message in white to the terminal.
///
/// If `PRINT_INFO_ON` is `false`, the message will not be printed.
///
/// ## Terminal output
/// - "\[INFO\]:    {}", msg
pub fn info(msg: String) {
    let print_stat = config::PRINT_INFO_ON.lock().unwrap().clone();

    if print_stat {
        println!("[INFO]:    {}", msg);
    }
}

/// Prints a peer-networking message in purple to the terminal.
///
/// Used for connection lifecycle events (handshakes, disconnects, tie-breaks).
/// If `PRINT_ELSE_ON` is `false`, the message will not be printed.
///
/// ## Terminal output
/// - "\[PEER\]:    {}", msg
pub fn peer(msg: String) {
    let print_stat = config::PRINT_ELSE_ON.lock().unwrap().clone();

    if print_stat {
        println!("{}{}", Purple.paint("[PEER]:    "), Purple.paint(msg));
    }
}
