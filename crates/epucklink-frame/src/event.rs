use image::RgbImage;

/// Which point report a [`DecoderEvent::Point`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PointKind {
    /// `New point computed :x:y`
    Computed,
    /// `PointInEnvironment:x:y`
    InEnvironment,
    /// `PointClosest:x:y`
    Closest,
}

impl PointKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PointKind::Computed => "computed",
            PointKind::InEnvironment => "in_environment",
            PointKind::Closest => "closest",
        }
    }
}

/// Why a frame produced a [`DecoderEvent::DecodeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DecodeFailure {
    #[error("malformed image tag")]
    MalformedImageTag,
    #[error("incomplete image payload")]
    IncompleteImagePayload,
    #[error("unexpected image payload size")]
    ImageSizeMismatch,
    #[error("unrecognized tag")]
    UnrecognizedTag,
}

/// Typed result of decoding one frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "event", rename_all = "snake_case"))]
pub enum DecoderEvent {
    /// Free-form status text.
    RawText { text: String },
    /// Arena size in millimetres.
    WallRectangle { width: i32, height: i32 },
    /// Robot position and heading in radians.
    RobotPose { x: i32, y: i32, heading: f64 },
    /// The robot finished mapping and asks for the map to be saved.
    MapSaveRequest,
    /// A mapped point reported by the robot; `kind` says which report.
    Point { kind: PointKind, x: i32, y: i32 },
    /// A camera snapshot taken at `(x, y)`.
    ImagePlaced {
        x: i32,
        y: i32,
        id: u64,
        #[cfg_attr(feature = "serde", serde(skip))]
        raster: RgbImage,
    },
    /// The frame was read in full but could not be turned into an event.
    DecodeError { reason: DecodeFailure },
}

impl DecoderEvent {
    /// Short snake_case name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            DecoderEvent::RawText { .. } => "raw_text",
            DecoderEvent::WallRectangle { .. } => "wall_rectangle",
            DecoderEvent::RobotPose { .. } => "robot_pose",
            DecoderEvent::MapSaveRequest => "map_save_request",
            DecoderEvent::Point { .. } => "point",
            DecoderEvent::ImagePlaced { .. } => "image_placed",
            DecoderEvent::DecodeError { .. } => "decode_error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, DecoderEvent::DecodeError { .. })
    }
}

impl From<DecodeFailure> for DecoderEvent {
    fn from(reason: DecodeFailure) -> Self {
        DecoderEvent::DecodeError { reason }
    }
}
