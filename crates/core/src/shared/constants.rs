use std::time::Duration;

/// Number of components in every face embedding.
pub const EMBEDDING_DIM: usize = 128;

/// Maximum age of a cached gallery before an access triggers a reload.
pub const DEFAULT_STALENESS: Duration = Duration::from_secs(60);

/// Distance strictly below which a nearest neighbor counts as a match.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.6;

pub const DETECTOR_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const DETECTOR_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Must produce `EMBEDDING_DIM` outputs; there is no default download.
pub const EMBEDDER_MODEL_NAME: &str = "face_embedding_128.onnx";

/// Directory name used under the platform cache/config directories.
pub const APP_DIR_NAME: &str = "FaceRecognizer";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
