//! ## Peer networking
//!
//! [`messages`] defines the newline-delimited JSON wire protocol,
//! [`peer_link`] keeps one healthy stream per peer in a symmetric mesh, and
//! [`coordinator`] turns hall calls, peer statuses, and peer failures into
//! assignment decisions for the local car.

pub mod coordinator;
pub mod messages;
pub mod peer_link;
