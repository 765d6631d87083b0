//! Marker scanning.

/// Literal that opens every frame.
pub const MARKER: &[u8; 5] = b"START";

/// Byte-at-a-time matcher for [`MARKER`].
///
/// The state is the number of marker bytes matched so far. A mismatching `S`
/// restarts the match at state 1 instead of 0, so noise such as `STSTART`
/// still locks onto the real marker.
#[derive(Debug, Clone, Default)]
pub struct Synchronizer {
    matched: usize,
}

impl Synchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns `true` when it completes the marker; the
    /// matcher is then back at state 0, ready for the next frame.
    pub fn feed(&mut self, byte: u8) -> bool {
        self.matched = if byte == MARKER[self.matched] {
            self.matched + 1
        } else if byte == MARKER[0] {
            1
        } else {
            0
        };

        if self.matched == MARKER.len() {
            self.matched = 0;
            return true;
        }
        false
    }

    /// Marker bytes matched so far (0..=4).
    pub fn state(&self) -> usize {
        self.matched
    }

    /// Forget any partial match.
    pub fn reset(&mut self) {
        self.matched = 0;
    }
}
