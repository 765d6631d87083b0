use std::fmt;
use std::io;

use epucklink_frame::FrameError;
use epucklink_receiver::ReceiverError;
use epucklink_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Open { source, .. } if source.kind() == io::ErrorKind::PermissionDenied => {
            CliError::new(PERMISSION_DENIED, format!("{context}: {source}"))
        }
        TransportError::Io(source) => io_error(context, source),
        TransportError::UnsupportedBaudRate(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::Timeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        FrameError::InvalidTag(_) | FrameError::TagTooLong { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other if other.is_frame_local() => {
            CliError::new(DATA_INVALID, format!("{context}: {other}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn receiver_error(context: &str, err: ReceiverError) -> CliError {
    match err {
        ReceiverError::Transport(err) => transport_error(context, err),
        ReceiverError::Close(source) => io_error(context, source),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use epucklink_frame::Stage;

    use super::*;

    #[test]
    fn missing_port_maps_to_transport_code() {
        let err = TransportError::Open {
            path: PathBuf::from("/dev/ttyNOPE"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(transport_error("open failed", err).code, TRANSPORT_ERROR);
    }

    #[test]
    fn denied_port_maps_to_permission_code() {
        let err = ReceiverError::Transport(TransportError::Open {
            path: PathBuf::from("/dev/ttyS0"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        });
        assert_eq!(receiver_error("open failed", err).code, PERMISSION_DENIED);
    }

    #[test]
    fn frame_errors_map_by_kind() {
        assert_eq!(
            frame_error("encode", FrameError::InvalidTag("a|b".into())).code,
            DATA_INVALID
        );
        assert_eq!(
            frame_error(
                "replay",
                FrameError::Timeout {
                    stage: Stage::Payload
                }
            )
            .code,
            TIMEOUT
        );
        assert_eq!(
            frame_error("replay", FrameError::MalformedLength { byte: b'x' }).code,
            DATA_INVALID
        );
        let message = frame_error("replay", FrameError::LengthOverflow).message;
        assert!(message.starts_with("replay: "));
    }
}
