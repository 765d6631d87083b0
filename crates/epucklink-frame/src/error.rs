use crate::envelope::Field;

/// Which part of a frame was being read when a read came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Sync,
    Envelope,
    Payload,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Sync => "sync marker",
            Stage::Envelope => "envelope",
            Stage::Payload => "payload",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The byte source returned no data.
    #[error("timed out reading {stage}")]
    Timeout { stage: Stage },

    /// A byte other than a digit, space or delimiter appeared in the length field.
    #[error("malformed length field (unexpected byte 0x{byte:02x})")]
    MalformedLength { byte: u8 },

    /// The length field does not fit in a `usize`.
    #[error("length field overflows")]
    LengthOverflow,

    /// A field delimiter was not immediately doubled.
    #[error("{field} field delimiter not doubled (got 0x{byte:02x})")]
    MalformedDelimiter { field: Field, byte: u8 },

    /// The tag grew past the configured maximum before its delimiter.
    #[error("tag too long (over {max} bytes)")]
    TagTooLong { max: usize },

    /// The tag to encode contains the delimiter character.
    #[error("tag contains the field delimiter: {0:?}")]
    InvalidTag(String),

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A bitmap payload does not hold exactly one image.
    #[error("bitmap payload is {actual} bytes, expected {expected}")]
    BitmapSize { expected: usize, actual: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// True when only the current frame is lost and decoding can resume with
    /// the next marker scan. I/O failures of the source itself are not.
    pub fn is_frame_local(&self) -> bool {
        !matches!(self, FrameError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
