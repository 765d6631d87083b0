use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod encode;
pub mod listen;
pub mod replay;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Receive from a serial port and print decoded events.
    Listen(ListenArgs),
    /// Decode a captured byte stream from a file.
    Replay(ReplayArgs),
    /// Write one frame in the robot's wire format.
    Encode(EncodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Replay(args) => replay::run(args, format),
        Command::Encode(args) => encode::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Serial device to open.
    #[arg(env = "EPUCKLINK_PORT")]
    pub port: PathBuf,
    /// Line speed in baud.
    #[arg(long, env = "EPUCKLINK_BAUD", default_value_t = 115_200)]
    pub baud: u32,
    /// Read timeout per byte (e.g. 500ms, 1s).
    #[arg(long, default_value = "500ms")]
    pub timeout: String,
    /// Exit after printing N events.
    #[arg(long)]
    pub count: Option<usize>,
    /// Directory to write received snapshots into as PNG.
    #[arg(long, value_name = "DIR")]
    pub save_images: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Captured serial stream.
    pub file: PathBuf,
    /// Exit after printing N events.
    #[arg(long)]
    pub count: Option<usize>,
    /// Directory to write decoded snapshots into as PNG.
    #[arg(long, value_name = "DIR")]
    pub save_images: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Frame tag, e.g. `Message` or `Image:10:20:0`.
    #[arg(long, short = 't')]
    pub tag: String,
    /// Raw string payload.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Append the frame to this file instead of writing to stdout.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

/// Shared by `listen` and `replay`: optionally save, then print.
pub(crate) struct EventSink {
    format: OutputFormat,
    save_dir: Option<PathBuf>,
    limit: Option<usize>,
    printed: usize,
}

impl EventSink {
    pub fn new(format: OutputFormat, save_dir: Option<PathBuf>, limit: Option<usize>) -> CliResult<Self> {
        if let Some(dir) = &save_dir {
            std::fs::create_dir_all(dir).map_err(|err| {
                crate::exit::io_error(&format!("failed creating {}", dir.display()), err)
            })?;
        }
        Ok(Self {
            format,
            save_dir,
            limit,
            printed: 0,
        })
    }

    /// Returns true once the event limit has been reached.
    pub fn emit(&mut self, event: &epucklink_frame::DecoderEvent) -> CliResult<bool> {
        let saved = match &self.save_dir {
            Some(dir) => crate::output::save_image(event, dir)?,
            None => None,
        };
        crate::output::print_event(event, saved.as_deref(), self.format);
        self.printed = self.printed.saturating_add(1);
        Ok(self.limit.is_some_and(|limit| self.printed >= limit))
    }

    pub fn printed(&self) -> usize {
        self.printed
    }
}
