use std::fs::{self, OpenOptions};
use std::io::Write;

use epucklink_frame::FrameWriter;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};

pub fn run(args: EncodeArgs) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;

    match &args.output {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?;
            write_frame(file, &args.tag, &payload)?;
        }
        None => write_frame(std::io::stdout().lock(), &args.tag, &payload)?,
    }

    tracing::debug!(tag = %args.tag, length = payload.len(), "frame encoded");
    Ok(SUCCESS)
}

fn write_frame<W: Write>(out: W, tag: &str, payload: &[u8]) -> CliResult<()> {
    let mut writer = FrameWriter::new(out);
    writer
        .send(tag, payload)
        .map_err(|err| frame_error("encode failed", err))?;
    writer
        .flush()
        .map_err(|err| frame_error("encode failed", err))
}

fn resolve_payload(args: &EncodeArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::DATA_INVALID;

    #[test]
    fn writes_wire_format() {
        let mut out = Vec::new();
        write_frame(&mut out, "Message", b"hi").unwrap();
        assert_eq!(out, b"START    2||Message||hi");
    }

    #[test]
    fn rejects_delimiter_in_tag() {
        let err = write_frame(Vec::new(), "Mess|age", b"").unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn missing_payload_is_empty() {
        let args = EncodeArgs {
            tag: "Message".to_string(),
            data: None,
            file: None,
            output: None,
        };
        assert!(resolve_payload(&args).unwrap().is_empty());
    }
}
