//! Pairwise face verification.
//!
//! [`FaceVerifier`] is the seam between request handling and the models:
//! given two image files it answers "same person?" with distance metadata.
//! [`OnnxVerifier`] is the SCRFD + ArcFace implementation.

use crate::alignment;
use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::{
    BoundingBox, Embedding, FacialArea, FacialAreas, VerificationResult, VerifyOptions, DETECTOR_BACKEND,
    MODEL_NAME,
};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("failed to read image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("face could not be detected in {image}; check the image or disable enforce_detection")]
    NoFaceDetected { image: &'static str },
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// Compares two face images.
///
/// Implementations may hold non-shareable inference state, hence `&mut self`.
pub trait FaceVerifier: Send {
    fn verify(
        &mut self,
        img1: &Path,
        img2: &Path,
        options: &VerifyOptions,
    ) -> Result<VerificationResult, VerifyError>;
}

/// SCRFD detection + ArcFace embedding verifier.
pub struct OnnxVerifier {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl OnnxVerifier {
    pub fn load(scrfd_path: &str, arcface_path: &str) -> Result<Self, VerifyError> {
        let detector = FaceDetector::load(scrfd_path)?;
        let recognizer = FaceRecognizer::load(arcface_path)?;
        Ok(Self { detector, recognizer })
    }

    fn represent(
        &mut self,
        path: &Path,
        label: &'static str,
        enforce_detection: bool,
    ) -> Result<(Embedding, BoundingBox), VerifyError> {
        let image = load_rgb(path)?;
        let detections = self.detector.detect(&image)?;
        tracing::debug!(image = label, faces = detections.len(), "detection complete");

        let face = select_face(detections, &image, enforce_detection)
            .ok_or(VerifyError::NoFaceDetected { image: label })?;
        let embedding = self.recognizer.extract(&image, &face)?;
        Ok((embedding, face))
    }
}

impl FaceVerifier for OnnxVerifier {
    fn verify(
        &mut self,
        img1: &Path,
        img2: &Path,
        options: &VerifyOptions,
    ) -> Result<VerificationResult, VerifyError> {
        let started = Instant::now();

        let (emb1, face1) = self.represent(img1, "img1", options.enforce_detection)?;
        let (emb2, face2) = self.represent(img2, "img2", options.enforce_detection)?;

        let distance = options.metric.distance(&emb1, &emb2);
        let threshold = options.effective_threshold();

        Ok(VerificationResult {
            verified: distance <= threshold,
            distance,
            threshold,
            model: MODEL_NAME.to_string(),
            detector_backend: DETECTOR_BACKEND.to_string(),
            similarity_metric: options.metric,
            facial_areas: FacialAreas {
                img1: FacialArea::from(&face1),
                img2: FacialArea::from(&face2),
            },
            time: started.elapsed().as_secs_f64(),
        })
    }
}

fn load_rgb(path: &Path) -> Result<RgbImage, VerifyError> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|source| VerifyError::Image {
            path: path.to_path_buf(),
            source,
        })
}

/// Pick the face to compare from detector output (sorted by confidence).
///
/// With detection not enforced, an image without a usable face is treated
/// as a pre-cropped face covering the whole frame.
fn select_face(
    detections: Vec<BoundingBox>,
    image: &RgbImage,
    enforce_detection: bool,
) -> Option<BoundingBox> {
    let best = detections.into_iter().find(|face| face.landmarks.is_some());
    if best.is_some() || enforce_detection {
        return best;
    }

    let (width, height) = image.dimensions();
    Some(BoundingBox {
        x: 0.0,
        y: 0.0,
        width: width as f32,
        height: height as f32,
        confidence: 0.0,
        landmarks: Some(alignment::canonical_landmarks(width, height)),
    })
}
