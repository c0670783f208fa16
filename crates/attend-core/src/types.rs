use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name reported for the recognition model in verification results.
pub const MODEL_NAME: &str = "ArcFace";

/// Name reported for the detection backend in verification results.
pub const DETECTOR_BACKEND: &str = "scrfd";

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// Face embedding vector (512-dimensional for ArcFace).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "w600k_r50").
    pub model_version: Option<String>,
}

impl Embedding {
    /// Compute cosine similarity between two embeddings.
    ///
    /// Returns a value in [-1, 1]. Higher = more similar. A zero vector on
    /// either side yields 0.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 { dot / denom } else { 0.0 }
    }

    /// Euclidean distance after L2-normalizing both vectors.
    pub fn euclidean_l2_distance(&self, other: &Embedding) -> f32 {
        let a = l2_normalize(&self.values);
        let b = l2_normalize(&other.values);
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

fn l2_normalize(values: &[f32]) -> Vec<f32> {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        values.iter().map(|v| v / norm).collect()
    } else {
        values.to_vec()
    }
}

/// Distance function used to decide whether two embeddings belong to the same person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// `1 - cosine_similarity`, in [0, 2].
    #[default]
    Cosine,
    /// Euclidean distance between L2-normalized vectors, in [0, 2].
    EuclideanL2,
}

impl DistanceMetric {
    pub fn distance(&self, a: &Embedding, b: &Embedding) -> f32 {
        match self {
            DistanceMetric::Cosine => 1.0 - a.similarity(b),
            DistanceMetric::EuclideanL2 => a.euclidean_l2_distance(b),
        }
    }

    /// Decision threshold for ArcFace embeddings under this metric.
    pub fn default_threshold(&self) -> f32 {
        match self {
            DistanceMetric::Cosine => 0.68,
            DistanceMetric::EuclideanL2 => 1.13,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::EuclideanL2 => "euclidean_l2",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(DistanceMetric::Cosine),
            "euclidean_l2" => Ok(DistanceMetric::EuclideanL2),
            _ => Err(format!("unknown distance metric: {s}")),
        }
    }
}

/// Options for a single pairwise verification.
#[derive(Debug, Clone, Copy)]
pub struct VerifyOptions {
    /// Fail when a face cannot be localized instead of using the whole image.
    pub enforce_detection: bool,
    pub metric: DistanceMetric,
    /// Overrides [`DistanceMetric::default_threshold`] when set.
    pub threshold: Option<f32>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            enforce_detection: false,
            metric: DistanceMetric::Cosine,
            threshold: None,
        }
    }
}

impl VerifyOptions {
    pub fn effective_threshold(&self) -> f32 {
        self.threshold
            .unwrap_or_else(|| self.metric.default_threshold())
    }
}

/// Region of an input image that was compared, in source pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacialArea {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub confidence: f32,
    pub left_eye: Option<[i32; 2]>,
    pub right_eye: Option<[i32; 2]>,
}

impl From<&BoundingBox> for FacialArea {
    fn from(face: &BoundingBox) -> Self {
        let eye = |p: (f32, f32)| [p.0.round() as i32, p.1.round() as i32];
        Self {
            x: face.x.round() as i32,
            y: face.y.round() as i32,
            w: face.width.round() as i32,
            h: face.height.round() as i32,
            confidence: face.confidence,
            left_eye: face.landmarks.map(|l| eye(l[0])),
            right_eye: face.landmarks.map(|l| eye(l[1])),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacialAreas {
    pub img1: FacialArea,
    pub img2: FacialArea,
}

/// Outcome of comparing two face images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub verified: bool,
    pub distance: f32,
    pub threshold: f32,
    pub model: String,
    pub detector_backend: String,
    pub similarity_metric: DistanceMetric,
    pub facial_areas: FacialAreas,
    /// Seconds spent in verification.
    pub time: f64,
}
