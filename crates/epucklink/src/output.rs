use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use epucklink_frame::DecoderEvent;
use serde::Serialize;

use crate::exit::{CliError, CliResult, INTERNAL};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct EventOutput<'a> {
    #[serde(flatten)]
    event: &'a DecoderEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_path: Option<String>,
    timestamp: String,
}

/// Print one event. `image_path` is where its raster was saved, if anywhere.
pub fn print_event(event: &DecoderEvent, image_path: Option<&Path>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = EventOutput {
                event,
                image_path: image_path.map(|path| path.display().to_string()),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["EVENT", "DETAIL"])
                .add_row(vec![event.kind().to_string(), describe(event, image_path)]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{:<16} {}", event.kind(), describe(event, image_path));
        }
    }
}

/// One-line human summary of an event's fields.
pub fn describe(event: &DecoderEvent, image_path: Option<&Path>) -> String {
    match event {
        DecoderEvent::RawText { text } => text.trim_end().to_string(),
        DecoderEvent::WallRectangle { width, height } => format!("{width} x {height}"),
        DecoderEvent::RobotPose { x, y, heading } => format!("x={x} y={y} heading={heading}"),
        DecoderEvent::MapSaveRequest => "map save requested".to_string(),
        DecoderEvent::Point { kind, x, y } => format!("{} x={x} y={y}", kind.as_str()),
        DecoderEvent::ImagePlaced { x, y, id, raster } => {
            let mut line = format!(
                "#{id} at x={x} y={y} ({}x{})",
                raster.width(),
                raster.height()
            );
            if let Some(path) = image_path {
                line.push_str(&format!(" saved to {}", path.display()));
            }
            line
        }
        DecoderEvent::DecodeError { reason } => reason.to_string(),
    }
}

/// Write an image event's raster as `Image<id>_x_<x>_y_<y>.png` under `dir`.
///
/// Returns `None` for every other event.
pub fn save_image(event: &DecoderEvent, dir: &Path) -> CliResult<Option<PathBuf>> {
    let DecoderEvent::ImagePlaced { x, y, id, raster } = event else {
        return Ok(None);
    };
    let path = dir.join(format!("Image{id}_x_{x}_y_{y}.png"));
    raster.save(&path).map_err(|err| {
        CliError::new(
            INTERNAL,
            format!("failed writing {}: {err}", path.display()),
        )
    })?;
    Ok(Some(path))
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use epucklink_frame::{DecodeFailure, PointKind};
    use image::RgbImage;

    use super::*;

    #[test]
    fn describes_each_event_kind() {
        assert_eq!(
            describe(
                &DecoderEvent::WallRectangle {
                    width: 500,
                    height: 700
                },
                None
            ),
            "500 x 700"
        );
        assert_eq!(
            describe(
                &DecoderEvent::Point {
                    kind: PointKind::Closest,
                    x: 3,
                    y: -4
                },
                None
            ),
            format!("{} x=3 y=-4", PointKind::Closest.as_str())
        );
        assert_eq!(
            describe(
                &DecoderEvent::DecodeError {
                    reason: DecodeFailure::UnrecognizedTag
                },
                None
            ),
            DecodeFailure::UnrecognizedTag.to_string()
        );
    }

    #[test]
    fn json_output_flattens_event_fields() {
        let event = DecoderEvent::RobotPose {
            x: 1,
            y: 2,
            heading: 0.5,
        };
        let out = EventOutput {
            event: &event,
            image_path: None,
            timestamp: "0".to_string(),
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["event"], "robot_pose");
        assert_eq!(json["x"], 1);
        assert_eq!(json["heading"], 0.5);
        assert!(json.get("image_path").is_none());
    }

    #[test]
    fn saves_only_image_events() {
        let dir = std::env::temp_dir().join(format!("epucklink-out-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let text = DecoderEvent::MapSaveRequest;
        assert_eq!(save_image(&text, &dir).unwrap(), None);

        let image = DecoderEvent::ImagePlaced {
            x: 40,
            y: -15,
            id: 7,
            raster: RgbImage::new(80, 120),
        };
        let path = save_image(&image, &dir).unwrap().unwrap();
        assert_eq!(path, dir.join("Image7_x_40_y_-15.png"));
        assert!(path.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
