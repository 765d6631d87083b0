//! Background reception for the e-puck serial link.
//!
//! This is the "just works" layer. Open a port, flip reception on, and read
//! decoded events off a channel in wire order. Stopping joins the worker and
//! releases the port.

pub mod control;
pub mod error;
pub mod receiver;

pub use control::ReceptionControl;
pub use error::{ReceiverError, Result};
pub use receiver::{Receiver, ReceiverConfig, DEFAULT_DRAIN_INTERVAL, DEFAULT_IDLE_INTERVAL};
