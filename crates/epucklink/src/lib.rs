//! Decoder for the e-puck robot's serial telemetry link.
//!
//! The robot streams framed messages and camera snapshots over a serial
//! line. This crate bundles the pieces needed to turn that stream into typed
//! events.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte sources and the raw serial port
//! - [`frame`]: marker resync, envelope parsing, payload dispatch, bitmaps
//! - [`receiver`]: background reception thread with an enable switch

/// Re-export transport types.
pub mod transport {
    pub use epucklink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use epucklink_frame::*;
}

/// Re-export receiver types.
pub mod receiver {
    pub use epucklink_receiver::*;
}
