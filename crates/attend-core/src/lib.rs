//! attend-core — Face detection, recognition and pairwise verification.
//!
//! Uses SCRFD for face detection and ArcFace for face recognition,
//! both running via ONNX Runtime for CPU inference.

use std::path::PathBuf;

pub mod alignment;
pub mod detector;
pub mod recognizer;
pub mod types;
pub mod verifier;

pub use types::{
    BoundingBox, DistanceMetric, Embedding, FacialArea, FacialAreas, VerificationResult,
    VerifyOptions,
};
pub use verifier::{FaceVerifier, OnnxVerifier, VerifyError};

/// File name of the SCRFD detection model inside the model directory.
pub const SCRFD_MODEL_FILE: &str = "det_10g.onnx";

/// File name of the ArcFace recognition model inside the model directory.
pub const ARCFACE_MODEL_FILE: &str = "w600k_r50.onnx";

/// Model directory used when none is configured.
pub fn default_model_dir() -> PathBuf {
    PathBuf::from("/usr/share/attend/models")
}
