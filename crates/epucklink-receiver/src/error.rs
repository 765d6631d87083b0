/// Errors that can occur while starting or stopping reception.
#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    /// The byte source could not be opened.
    #[error("transport error: {0}")]
    Transport(#[from] epucklink_transport::TransportError),

    /// The worker thread could not be started.
    #[error("failed to spawn receiver thread: {0}")]
    Spawn(std::io::Error),

    /// The worker thread panicked; the byte source is lost with it.
    #[error("receiver worker panicked")]
    WorkerPanicked,

    /// Draining or closing the byte source failed during shutdown.
    #[error("failed to release byte source: {0}")]
    Close(std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReceiverError>;
