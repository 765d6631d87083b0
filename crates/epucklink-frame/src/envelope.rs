//! Length and tag header that follows the marker.

use crate::codec::{DEFAULT_MAX_PAYLOAD, DEFAULT_MAX_TAG_LEN};
use crate::error::{FrameError, Result};

/// Field terminator. Every field is closed by two of these in a row.
pub const DELIMITER: u8 = b'|';

/// Envelope field names, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Length,
    Tag,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Length => f.write_str("length"),
            Field::Tag => f.write_str("tag"),
        }
    }
}

/// Parsed frame header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Number of payload bytes that follow.
    pub length: usize,
    /// Payload classifier, e.g. `Message` or `Image:12:40:0`.
    pub tag: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Length,
    LengthClose,
    Tag,
    TagClose,
}

/// Byte-at-a-time envelope parser.
///
/// ```text
/// <digits and spaces>||<tag>||
/// ```
///
/// Any grammar violation returns an error and resets the parser, so the same
/// instance can be reused for the next frame.
#[derive(Debug, Clone)]
pub struct EnvelopeParser {
    state: State,
    length: usize,
    tag: Vec<u8>,
    max_payload: usize,
    max_tag_len: usize,
}

impl Default for EnvelopeParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD, DEFAULT_MAX_TAG_LEN)
    }
}

impl EnvelopeParser {
    /// Create a parser rejecting lengths above `max_payload` and tags longer
    /// than `max_tag_len`.
    pub fn new(max_payload: usize, max_tag_len: usize) -> Self {
        Self {
            state: State::Length,
            length: 0,
            tag: Vec::new(),
            max_payload,
            max_tag_len,
        }
    }

    /// Feed one byte. Returns the envelope once its closing `||` arrives.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Envelope>> {
        let result = self.step(byte);
        if result.is_err() {
            self.reset();
        }
        result
    }

    /// Drop any partially parsed header.
    pub fn reset(&mut self) {
        self.state = State::Length;
        self.length = 0;
        self.tag.clear();
    }

    /// True when no byte of the current envelope has been consumed.
    pub fn is_idle(&self) -> bool {
        self.state == State::Length && self.length == 0 && self.tag.is_empty()
    }

    fn step(&mut self, byte: u8) -> Result<Option<Envelope>> {
        match self.state {
            State::Length => match byte {
                b' ' => {}
                b'0'..=b'9' => {
                    self.length = self
                        .length
                        .checked_mul(10)
                        .and_then(|acc| acc.checked_add(usize::from(byte - b'0')))
                        .ok_or(FrameError::LengthOverflow)?;
                }
                DELIMITER => {
                    if self.length > self.max_payload {
                        return Err(FrameError::PayloadTooLarge {
                            size: self.length,
                            max: self.max_payload,
                        });
                    }
                    self.state = State::LengthClose;
                }
                other => return Err(FrameError::MalformedLength { byte: other }),
            },
            State::LengthClose => {
                expect_delimiter(Field::Length, byte)?;
                self.state = State::Tag;
            }
            State::Tag => {
                if byte == DELIMITER {
                    self.state = State::TagClose;
                } else if self.tag.len() >= self.max_tag_len {
                    return Err(FrameError::TagTooLong {
                        max: self.max_tag_len,
                    });
                } else {
                    self.tag.push(byte);
                }
            }
            State::TagClose => {
                expect_delimiter(Field::Tag, byte)?;
                let envelope = Envelope {
                    length: self.length,
                    tag: String::from_utf8_lossy(&self.tag).into_owned(),
                };
                self.reset();
                return Ok(Some(envelope));
            }
        }
        Ok(None)
    }
}

fn expect_delimiter(field: Field, byte: u8) -> Result<()> {
    if byte == DELIMITER {
        Ok(())
    } else {
        Err(FrameError::MalformedDelimiter { field, byte })
    }
}
