use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use epucklink_frame::{Decoder, DecoderEvent, FrameConfig, FrameError};
use epucklink_transport::{drain_available, ByteSource};
use tracing::{debug, error, info, trace, warn};

use crate::control::ReceptionControl;
use crate::error::{ReceiverError, Result};

/// Pause between drain passes while reception is disabled.
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(100);

/// Pause between drain passes while shutting down.
pub const DEFAULT_DRAIN_INTERVAL: Duration = Duration::from_millis(10);

/// Worker behavior.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    pub frame: FrameConfig,
    pub idle_interval: Duration,
    pub drain_interval: Duration,
    /// Decode from the first iteration instead of waiting for `enable`.
    pub start_enabled: bool,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            idle_interval: DEFAULT_IDLE_INTERVAL,
            drain_interval: DEFAULT_DRAIN_INTERVAL,
            start_enabled: false,
        }
    }
}

/// Owns a worker thread that decodes frames from a byte source.
///
/// Events arrive on an internal channel in the order their frames were
/// sent. The source belongs to the worker until [`Receiver::stop`] hands it
/// back for draining and closing.
pub struct Receiver<S: ByteSource + Send + 'static> {
    control: ReceptionControl,
    events: mpsc::Receiver<DecoderEvent>,
    worker: Option<JoinHandle<S>>,
    drain_interval: Duration,
}

#[cfg(unix)]
impl Receiver<epucklink_transport::SerialPort> {
    /// Open a serial port and start the worker.
    ///
    /// Failing to open the port is the one fatal error: no worker is started.
    pub fn open(
        path: impl AsRef<std::path::Path>,
        serial: epucklink_transport::SerialConfig,
        config: ReceiverConfig,
    ) -> Result<Self> {
        let port = epucklink_transport::SerialPort::open_with_config(path, serial)?;
        Self::spawn(port, config)
    }
}

impl<S: ByteSource + Send + 'static> Receiver<S> {
    /// Start a worker over an already-open source.
    pub fn spawn(source: S, config: ReceiverConfig) -> Result<Self> {
        let control = ReceptionControl::new(config.start_enabled);
        let (tx, rx) = mpsc::channel();

        let worker = Worker {
            decoder: Decoder::with_config(source, config.frame.clone()),
            control: control.clone(),
            events: tx,
            idle_interval: config.idle_interval,
        };

        let handle = thread::Builder::new()
            .name("epucklink-rx".to_string())
            .spawn(move || worker.run())
            .map_err(ReceiverError::Spawn)?;

        debug!(enabled = config.start_enabled, "receiver started");

        Ok(Self {
            control,
            events: rx,
            worker: Some(handle),
            drain_interval: config.drain_interval,
        })
    }

    /// Handle for flipping reception on and off from another thread.
    pub fn control(&self) -> ReceptionControl {
        self.control.clone()
    }

    pub fn enable(&self) {
        self.control.enable();
    }

    pub fn disable(&self) {
        self.control.disable();
    }

    /// Block until the next event. `None` once the worker has exited.
    pub fn recv(&self) -> Option<DecoderEvent> {
        self.events.recv().ok()
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<DecoderEvent> {
        self.events.recv_timeout(timeout).ok()
    }

    /// Next event if one is already queued.
    pub fn try_recv(&self) -> Option<DecoderEvent> {
        self.events.try_recv().ok()
    }

    /// Whether the worker thread is still running.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the worker, then drain and close the source.
    ///
    /// A read in progress is not interrupted; this waits for the current
    /// iteration to finish. A frame cut short by shutdown is discarded.
    pub fn stop(mut self) -> Result<()> {
        self.control.shutdown();

        let Some(handle) = self.worker.take() else {
            return Ok(());
        };
        let mut source = handle.join().map_err(|_| ReceiverError::WorkerPanicked)?;

        loop {
            match drain_available(&mut source) {
                Ok(0) => break,
                Ok(_) => thread::sleep(self.drain_interval),
                Err(err) => {
                    warn!(%err, "drain during shutdown failed");
                    break;
                }
            }
        }

        source.close().map_err(ReceiverError::Close)?;
        info!("receiver stopped");
        Ok(())
    }
}

impl<S: ByteSource + Send + 'static> Drop for Receiver<S> {
    fn drop(&mut self) {
        // Without `stop` the worker is only told to exit; it is not joined.
        if self.worker.is_some() {
            self.control.shutdown();
        }
    }
}

struct Worker<S> {
    decoder: Decoder<S>,
    control: ReceptionControl,
    events: mpsc::Sender<DecoderEvent>,
    idle_interval: Duration,
}

impl<S: ByteSource> Worker<S> {
    fn run(mut self) -> S {
        while self.control.is_alive() {
            if self.control.is_enabled() {
                if !self.decode_one() {
                    break;
                }
            } else {
                if let Err(err) = drain_available(self.decoder.get_mut()) {
                    warn!(%err, "failed to drain byte source");
                }
                thread::sleep(self.idle_interval);
            }
        }

        debug!("receiver worker exiting");
        self.decoder.into_inner()
    }

    /// Returns false when nobody is listening for events anymore.
    fn decode_one(&mut self) -> bool {
        // A payload cut off by the sender would otherwise keep `stop` waiting.
        let control = &self.control;
        match self.decoder.decode_next_while(|| control.is_alive()) {
            Ok(Some(event)) => {
                trace!(kind = event.kind(), "event decoded");
                if self.events.send(event).is_err() {
                    debug!("event consumer gone");
                    return false;
                }
            }
            Ok(None) => {}
            Err(FrameError::Timeout { stage }) => trace!(%stage, "read timed out"),
            Err(err) if err.is_frame_local() => warn!(%err, "frame abandoned"),
            Err(err) => {
                error!(%err, "byte source failed");
                thread::sleep(self.idle_interval);
            }
        }
        true
    }
}
