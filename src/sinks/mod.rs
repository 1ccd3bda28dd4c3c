//! Delivery destinations
//!
//! A [`Sink`] wraps one [`SinkWriter`] with its level bounds, buffering and
//! formatting overrides. Writers exist for the console, plain or rotating
//! files, and (with the `network` feature) TCP and UDP endpoints.

pub mod console;
pub mod file;
#[cfg(feature = "network")]
pub mod network;
pub mod rotation;
pub mod sink;
pub mod writer;

pub use console::ConsoleWriter;
pub use file::FileWriter;
#[cfg(feature = "network")]
pub use network::{TcpWriter, UdpWriter};
pub use rotation::{Archive, Rotation, RotationInterval};
pub use sink::{Sink, SinkId};
pub use writer::{DestinationKind, SinkWriter};
