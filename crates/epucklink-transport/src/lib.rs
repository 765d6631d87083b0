//! Byte source abstraction for the e-puck serial link.
//!
//! The decoder never talks to a device directly. It pulls bytes from a
//! [`ByteSource`], which reads with a bounded timeout and returns zero bytes
//! when nothing arrived in time. Two sources ship here:
//! - [`SerialPort`], a raw-mode POSIX tty (Linux/macOS)
//! - `std::io::Cursor`, for captures and tests

pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod serial;

pub use error::{Result, TransportError};
pub use traits::{drain_available, ByteSource};

#[cfg(unix)]
pub use serial::{SerialConfig, SerialPort, DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT};
