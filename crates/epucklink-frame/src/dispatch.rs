//! Tag classification and payload interpretation.

use tracing::{debug, warn};

use crate::bitmap::decode_bitmap;
use crate::codec::RawFrame;
use crate::event::{DecodeFailure, DecoderEvent, PointKind};

const TOKEN_SEPARATOR: char = ':';

/// Coarse payload class, decided from the envelope tag alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagClass {
    Message,
    Image,
    Unrecognized,
}

impl TagClass {
    /// Classify a tag. `Message` wins over `Image` when both appear.
    pub fn classify(tag: &str) -> Self {
        if tag.contains("Message") {
            TagClass::Message
        } else if tag.contains("Image") {
            TagClass::Image
        } else {
            TagClass::Unrecognized
        }
    }
}

/// Sub-type of a `Message` frame, decided from the payload text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Point(PointKind),
    Walls,
    Position,
    MapRequest,
    Text,
}

/// Checked in order; the first pattern found anywhere in the text wins.
const MESSAGE_PATTERNS: [(&str, MessageKind); 6] = [
    ("New point computed :", MessageKind::Point(PointKind::Computed)),
    ("PointInEnvironment:", MessageKind::Point(PointKind::InEnvironment)),
    ("PointClosest:", MessageKind::Point(PointKind::Closest)),
    ("Walls", MessageKind::Walls),
    ("New position:", MessageKind::Position),
    ("send the map", MessageKind::MapRequest),
];

impl MessageKind {
    pub fn classify(text: &str) -> Self {
        MESSAGE_PATTERNS
            .iter()
            .find(|(pattern, _)| text.contains(pattern))
            .map(|&(_, kind)| kind)
            .unwrap_or(MessageKind::Text)
    }
}

/// Turns raw frames into [`DecoderEvent`]s.
///
/// Owns the image counter: each successfully decoded snapshot gets the next
/// id, starting from 0.
#[derive(Debug, Default)]
pub struct Dispatcher {
    next_image_id: u64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next decoded image will receive.
    pub fn next_image_id(&self) -> u64 {
        self.next_image_id
    }

    /// Interpret one frame. `None` means the frame is dropped without an event.
    pub fn dispatch(&mut self, frame: &RawFrame) -> Option<DecoderEvent> {
        match TagClass::classify(&frame.tag) {
            TagClass::Message => dispatch_message(&String::from_utf8_lossy(&frame.payload)),
            TagClass::Image => Some(self.dispatch_image(frame)),
            TagClass::Unrecognized => {
                warn!(tag = %frame.tag, length = frame.length, "unrecognized tag");
                Some(DecodeFailure::UnrecognizedTag.into())
            }
        }
    }

    fn dispatch_image(&mut self, frame: &RawFrame) -> DecoderEvent {
        let tokens: Vec<&str> = frame.tag.split(TOKEN_SEPARATOR).collect();
        let position = match tokens.as_slice() {
            [_, x, y, _] => parse_int(x).zip(parse_int(y)),
            _ => None,
        };
        let Some((x, y)) = position else {
            warn!(tag = %frame.tag, tokens = tokens.len(), "malformed image tag");
            return DecodeFailure::MalformedImageTag.into();
        };

        if !frame.is_complete() {
            warn!(
                expected = frame.length,
                received = frame.payload.len(),
                "incomplete image payload"
            );
            return DecodeFailure::IncompleteImagePayload.into();
        }

        let raster = match decode_bitmap(&frame.payload) {
            Ok(raster) => raster,
            Err(err) => {
                warn!(%err, "image payload rejected");
                return DecodeFailure::ImageSizeMismatch.into();
            }
        };

        let id = self.next_image_id;
        self.next_image_id += 1;
        debug!(x, y, id, "image decoded");
        DecoderEvent::ImagePlaced { x, y, id, raster }
    }
}

fn dispatch_message(text: &str) -> Option<DecoderEvent> {
    let tokens: Vec<&str> = text.split(TOKEN_SEPARATOR).collect();

    let event = match MessageKind::classify(text) {
        MessageKind::Point(kind) => match tokens.as_slice() {
            [_, x, y, ..] => {
                parse_int(x)
                    .zip(parse_int(y))
                    .map(|(x, y)| DecoderEvent::Point { kind, x, y })
            }
            _ => None,
        },
        MessageKind::Walls => match tokens.as_slice() {
            [_, w, h, _] => parse_int(w)
                .zip(parse_int(h))
                .map(|(width, height)| DecoderEvent::WallRectangle { width, height }),
            _ => None,
        },
        MessageKind::Position => match tokens.as_slice() {
            [_, x, y, heading, _] => match (parse_int(x), parse_int(y), parse_float(heading)) {
                (Some(x), Some(y), Some(heading)) => Some(DecoderEvent::RobotPose { x, y, heading }),
                _ => None,
            },
            _ => None,
        },
        MessageKind::MapRequest => Some(DecoderEvent::MapSaveRequest),
        MessageKind::Text => Some(DecoderEvent::RawText {
            text: text.to_string(),
        }),
    };

    if event.is_none() {
        warn!(tokens = tokens.len(), text = %text.trim_end(), "dropping unparseable message");
    }
    event
}

fn parse_int(token: &str) -> Option<i32> {
    token.trim().parse().ok()
}

fn parse_float(token: &str) -> Option<f64> {
    token.trim().parse().ok()
}
