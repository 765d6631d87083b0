//! Resynchronizing frame decoder for the e-puck serial link.
//!
//! The robot writes frames onto a noisy serial line:
//! - a 5-byte marker `START` for stream synchronization
//! - a right-aligned ASCII decimal payload length, closed by `||`
//! - a free-text tag naming the payload type, closed by `||`
//! - exactly `length` raw payload bytes
//!
//! [`FrameReader`] pulls complete frames out of a [`ByteSource`], skipping
//! whatever garbage precedes a marker. [`Dispatcher`] turns each frame into a
//! typed [`DecoderEvent`], and [`Decoder`] chains the two.
//!
//! [`ByteSource`]: epucklink_transport::ByteSource

pub mod bitmap;
pub mod codec;
pub mod decoder;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod event;
pub mod reader;
pub mod sync;
pub mod writer;

pub use bitmap::{decode_bitmap, IMAGE_HEIGHT, IMAGE_PAYLOAD_SIZE, IMAGE_WIDTH};
pub use codec::{
    encode_frame, FrameConfig, RawFrame, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_PAYLOAD,
    DEFAULT_MAX_TAG_LEN,
};
#[cfg(feature = "async")]
pub use codec::{framed, SerialCodec};
pub use decoder::Decoder;
pub use dispatch::{Dispatcher, MessageKind, TagClass};
pub use envelope::{Envelope, EnvelopeParser, Field, DELIMITER};
pub use error::{FrameError, Result, Stage};
pub use event::{DecodeFailure, DecoderEvent, PointKind};
pub use reader::FrameReader;
pub use sync::{Synchronizer, MARKER};
pub use writer::FrameWriter;
