use std::fs;
use std::io::Cursor;

use epucklink_frame::{Decoder, FrameConfig, FrameError, Stage};

use crate::cmd::{EventSink, ReplayArgs};
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: ReplayArgs, format: OutputFormat) -> CliResult<i32> {
    let capture = fs::read(&args.file)
        .map_err(|err| io_error(&format!("failed reading {}", args.file.display()), err))?;
    let mut sink = EventSink::new(format, args.save_images.clone(), args.count)?;

    replay(capture, |event| sink.emit(&event))?;
    tracing::debug!(events = sink.printed(), "replay finished");
    Ok(SUCCESS)
}

/// Decode every frame in `capture`, stopping early when `emit` says so.
///
/// Running out of input while scanning for a marker is the normal end of a
/// capture. Running out mid-frame means the capture was cut short.
fn replay<F>(capture: Vec<u8>, mut emit: F) -> CliResult<()>
where
    F: FnMut(epucklink_frame::DecoderEvent) -> CliResult<bool>,
{
    // A file never delivers more bytes later, so one empty read ends the payload.
    let config = FrameConfig {
        max_payload_stalls: Some(0),
        ..FrameConfig::default()
    };
    let mut decoder = Decoder::with_config(Cursor::new(capture), config);

    loop {
        match decoder.decode_next() {
            Ok(Some(event)) => {
                if emit(event)? {
                    return Ok(());
                }
            }
            Ok(None) => {}
            Err(FrameError::Timeout {
                stage: Stage::Sync,
            }) => return Ok(()),
            Err(FrameError::Timeout { stage }) => {
                tracing::warn!(%stage, "capture ends inside a frame");
                return Ok(());
            }
            Err(err) if err.is_frame_local() => {
                tracing::warn!(%err, "skipping malformed frame");
            }
            Err(err) => return Err(frame_error("replay failed", err)),
        }
    }
}
