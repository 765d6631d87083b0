use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::cmd::{EventSink, ListenArgs};
use crate::exit::{CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::OutputFormat;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[cfg(unix)]
pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    use epucklink_receiver::{Receiver, ReceiverConfig};
    use epucklink_transport::SerialConfig;

    use crate::cmd::parse_duration;
    use crate::exit::{receiver_error, FAILURE};

    let serial = SerialConfig {
        baud_rate: args.baud,
        read_timeout: parse_duration(&args.timeout)?,
    };
    let mut sink = EventSink::new(format, args.save_images.clone(), args.count)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let receiver = Receiver::open(
        &args.port,
        serial,
        ReceiverConfig {
            start_enabled: true,
            ..ReceiverConfig::default()
        },
    )
    .map_err(|err| receiver_error("open failed", err))?;
    tracing::info!(port = %args.port.display(), baud = args.baud, "listening");

    let mut code = SUCCESS;
    while running.load(Ordering::SeqCst) {
        if let Some(event) = receiver.recv_timeout(POLL_INTERVAL) {
            if sink.emit(&event)? {
                break;
            }
        } else if !receiver.is_running() {
            tracing::error!("receiver worker exited unexpectedly");
            code = FAILURE;
            break;
        }
    }

    receiver
        .stop()
        .map_err(|err| receiver_error("shutdown failed", err))?;
    tracing::info!(events = sink.printed(), "listener stopped");
    Ok(code)
}

#[cfg(not(unix))]
pub fn run(_args: ListenArgs, _format: OutputFormat) -> CliResult<i32> {
    Err(CliError::new(
        crate::exit::USAGE,
        "serial ports are only supported on unix targets",
    ))
}

#[cfg_attr(not(unix), allow(dead_code))]
fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
