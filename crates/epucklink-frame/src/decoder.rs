use epucklink_transport::ByteSource;

use crate::codec::FrameConfig;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::event::DecoderEvent;
use crate::reader::FrameReader;

/// Frame reader and dispatcher chained: one call, one frame.
pub struct Decoder<S> {
    reader: FrameReader<S>,
    dispatcher: Dispatcher,
}

impl<S: ByteSource> Decoder<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, FrameConfig::default())
    }

    pub fn with_config(source: S, config: FrameConfig) -> Self {
        Self {
            reader: FrameReader::with_config(source, config),
            dispatcher: Dispatcher::new(),
        }
    }

    /// Decode the next frame end to end.
    ///
    /// `Ok(None)` means a frame was read in full but carried nothing worth
    /// reporting (for example a `Walls` message with the wrong token count).
    /// Errors abandon the frame; calling again resynchronizes.
    pub fn decode_next(&mut self) -> Result<Option<DecoderEvent>> {
        self.decode_next_while(|| true)
    }

    /// [`decode_next`](Self::decode_next) with a cancellation check while the
    /// payload is stalled. See [`FrameReader::read_frame_while`].
    pub fn decode_next_while<F>(&mut self, keep_waiting: F) -> Result<Option<DecoderEvent>>
    where
        F: FnMut() -> bool,
    {
        let frame = self.reader.read_frame_while(keep_waiting)?;
        Ok(self.dispatcher.dispatch(&frame))
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &S {
        self.reader.get_ref()
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut S {
        self.reader.get_mut()
    }

    /// Consume the decoder and return the inner source.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }
}
