use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::ByteSource;

/// Baud rate used by the e-puck2 firmware UART.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Per-read timeout. An idle link returns an empty read after this long.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Serial line settings applied when the port is opened.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Line speed in bits per second.
    pub baud_rate: u32,
    /// Upper bound for a single blocking read. termios counts in tenths of a
    /// second, so this is rounded down and clamped to 0.1s..=25.5s.
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// A raw-mode serial tty.
///
/// Reads block for at most `read_timeout` and return `Ok(0)` when the line
/// stayed idle (`VMIN = 0`, `VTIME = timeout`).
pub struct SerialPort {
    file: Option<File>,
    path: PathBuf,
    config: SerialConfig,
}

impl SerialPort {
    /// Open a serial device with the default line settings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, SerialConfig::default())
    }

    /// Open a serial device and switch it to raw mode.
    pub fn open_with_config(path: impl AsRef<Path>, config: SerialConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let speed = baud_constant(config.baud_rate)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&path)
            .map_err(|source| TransportError::Open {
                path: path.clone(),
                source,
            })?;

        configure_raw(&file, speed, config.read_timeout).map_err(|source| {
            TransportError::Configure {
                path: path.clone(),
                source,
            }
        })?;

        info!(?path, baud = config.baud_rate, "opened serial port");

        Ok(Self {
            file: Some(file),
            path,
            config,
        })
    }

    /// Device path this port was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Line settings in effect.
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    /// Whether `close` has not been called yet.
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn file(&mut self) -> std::io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| std::io::Error::new(ErrorKind::NotConnected, "serial port closed"))
    }
}

impl Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file()?.read(buf)
    }
}

impl ByteSource for SerialPort {
    fn bytes_available(&mut self) -> std::io::Result<usize> {
        let fd = self.file()?.as_raw_fd();
        let mut pending: libc::c_int = 0;

        // SAFETY: `fd` is an open descriptor owned by `self.file`, and
        // `pending` is a valid writable c_int as FIONREAD expects.
        let rc = unsafe { libc::ioctl(fd, libc::FIONREAD, &mut pending) };
        if rc != 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(pending.max(0) as usize)
    }

    fn close(&mut self) -> std::io::Result<()> {
        if let Some(file) = self.file.take() {
            debug!(path = ?self.path, "closing serial port");
            drop(file);
            info!(path = ?self.path, "serial port closed");
        }
        Ok(())
    }
}

impl std::fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort")
            .field("path", &self.path)
            .field("baud_rate", &self.config.baud_rate)
            .field("open", &self.file.is_some())
            .finish()
    }
}

fn baud_constant(baud_rate: u32) -> Result<libc::speed_t> {
    let speed = match baud_rate {
        9_600 => libc::B9600,
        19_200 => libc::B19200,
        38_400 => libc::B38400,
        57_600 => libc::B57600,
        115_200 => libc::B115200,
        230_400 => libc::B230400,
        other => return Err(TransportError::UnsupportedBaudRate(other)),
    };
    Ok(speed)
}

fn timeout_deciseconds(timeout: Duration) -> libc::cc_t {
    (timeout.as_millis() / 100).clamp(1, 255) as libc::cc_t
}

fn configure_raw(file: &File, speed: libc::speed_t, timeout: Duration) -> std::io::Result<()> {
    let fd = file.as_raw_fd();

    // SAFETY: termios is a plain C struct; an all-zero value is valid and is
    // overwritten by tcgetattr before use.
    let mut tty: libc::termios = unsafe { std::mem::zeroed() };

    // SAFETY: `fd` is open for the lifetime of `file` and `tty` is a valid
    // writable termios for every call below.
    unsafe {
        if libc::tcgetattr(fd, &mut tty) != 0 {
            return Err(std::io::Error::last_os_error());
        }

        libc::cfmakeraw(&mut tty);
        tty.c_cflag |= libc::CLOCAL | libc::CREAD;
        tty.c_cc[libc::VMIN] = 0;
        tty.c_cc[libc::VTIME] = timeout_deciseconds(timeout);

        if libc::cfsetispeed(&mut tty, speed) != 0 || libc::cfsetospeed(&mut tty, speed) != 0 {
            return Err(std::io::Error::last_os_error());
        }
        if libc::tcsetattr(fd, libc::TCSANOW, &tty) != 0 {
            return Err(std::io::Error::last_os_error());
        }
        // Stale bytes from before we opened the port are not part of any frame.
        if libc::tcflush(fd, libc::TCIFLUSH) != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_baud_rate_rejected_before_open() {
        let cfg = SerialConfig {
            baud_rate: 12_345,
            ..SerialConfig::default()
        };
        let err = SerialPort::open_with_config("/dev/null", cfg).unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedBaudRate(12_345)));
    }

    #[test]
    fn missing_device_is_open_error() {
        let err = SerialPort::open("/dev/epucklink-does-not-exist").unwrap_err();
        assert!(matches!(err, TransportError::Open { .. }));
    }

    #[test]
    fn non_tty_is_configure_error() {
        let err = SerialPort::open("/dev/null").unwrap_err();
        assert!(matches!(err, TransportError::Configure { .. }));
    }

    #[test]
    fn timeout_rounds_to_deciseconds() {
        assert_eq!(timeout_deciseconds(Duration::from_millis(500)), 5);
        assert_eq!(timeout_deciseconds(Duration::from_millis(10)), 1);
        assert_eq!(timeout_deciseconds(Duration::from_secs(60)), 255);
    }

    #[cfg(target_os = "linux")]
    mod pty {
        use std::ffi::CStr;
        use std::io::Write;
        use std::os::fd::FromRawFd;

        use super::*;

        fn open_pty() -> (File, PathBuf) {
            // SAFETY: standard posix_openpt/grantpt/unlockpt/ptsname sequence;
            // the returned master fd is immediately owned by a `File`.
            unsafe {
                let master = libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY);
                assert!(master >= 0, "posix_openpt failed");
                assert_eq!(libc::grantpt(master), 0);
                assert_eq!(libc::unlockpt(master), 0);
                let name = libc::ptsname(master);
                assert!(!name.is_null());
                let path = PathBuf::from(CStr::from_ptr(name).to_string_lossy().into_owned());
                (File::from_raw_fd(master), path)
            }
        }

        fn fast_config() -> SerialConfig {
            SerialConfig {
                read_timeout: Duration::from_millis(100),
                ..SerialConfig::default()
            }
        }

        #[test]
        fn reads_bytes_written_to_master() {
            let (mut master, slave) = open_pty();
            let mut port = SerialPort::open_with_config(&slave, fast_config()).unwrap();

            master.write_all(b"START").unwrap();
            std::thread::sleep(Duration::from_millis(50));

            assert_eq!(port.bytes_available().unwrap(), 5);
            let mut buf = [0u8; 8];
            let n = port.read(&mut buf).unwrap();
            assert_eq!(&buf[..n], b"START");
        }

        #[test]
        fn idle_read_times_out_with_zero_bytes() {
            let (_master, slave) = open_pty();
            let mut port = SerialPort::open_with_config(&slave, fast_config()).unwrap();

            let mut buf = [0u8; 4];
            assert_eq!(port.read(&mut buf).unwrap(), 0);
        }

        #[test]
        fn reads_fail_after_close() {
            let (_master, slave) = open_pty();
            let mut port = SerialPort::open_with_config(&slave, fast_config()).unwrap();

            port.close().unwrap();
            assert!(!port.is_open());

            let mut buf = [0u8; 1];
            let err = port.read(&mut buf).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotConnected);
            assert!(port.bytes_available().is_err());
        }
    }
}
