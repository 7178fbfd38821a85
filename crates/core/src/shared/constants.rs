pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Side length every face sample is resized to before classification,
/// at training time and at inference time alike.
pub const CANONICAL_FACE_SIZE: u32 = 200;

/// Display name for faces that fail the recognition gate.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Training image extensions, matched case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Delay before polling the camera again when no frame is ready.
pub const FRAME_POLL_DELAY_MS: u64 = 30;

pub const DEFAULT_SNAPSHOT_PADDING: f64 = 0.2;

pub const SNAPSHOT_LOG_HEADER: &str = "Timestamp,Name,Filename";
