#![allow(dead_code)]

use attend_core::{
    DistanceMetric, FaceVerifier, FacialArea, FacialAreas, VerificationResult, VerifyError,
    VerifyOptions,
};
use attendd::engine::spawn_engine;
use attendd::error_log::MemoryErrorLog;
use attendd::{build_router, AppState, Config};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const BOUNDARY: &str = "attend-test-boundary";

/// Payload every stub verifier returns, with `verified` set per stub.
pub fn sample_result(verified: bool) -> VerificationResult {
    VerificationResult {
        verified,
        distance: if verified { 0.25 } else { 0.91 },
        threshold: 0.68,
        model: "ArcFace".into(),
        detector_backend: "scrfd".into(),
        similarity_metric: DistanceMetric::Cosine,
        facial_areas: FacialAreas {
            img1: FacialArea {
                x: 12, y: 30, w: 96, h: 120, confidence: 0.98,
                left_eye: Some([40, 70]), right_eye: Some([80, 70]),
            },
            img2: FacialArea {
                x: 0, y: 0, w: 112, h: 112, confidence: 0.0,
                left_eye: None, right_eye: None,
            },
        },
        time: 0.042,
    }
}

/// Returns a fixed decision and records the staged probe bytes it was given.
#[derive(Clone)]
pub struct StubVerifier {
    pub verified: bool,
    pub probes: Arc<Mutex<Vec<(PathBuf, Vec<u8>)>>>,
}

impl StubVerifier {
    pub fn new(verified: bool) -> Self {
        Self {
            verified,
            probes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn probes(&self) -> Vec<(PathBuf, Vec<u8>)> {
        self.probes.lock().unwrap().clone()
    }
}

impl FaceVerifier for StubVerifier {
    fn verify(
        &mut self,
        img1: &Path,
        _img2: &Path,
        _options: &VerifyOptions,
    ) -> Result<VerificationResult, VerifyError> {
        let bytes = std::fs::read(img1).unwrap_or_default();
        self.probes.lock().unwrap().push((img1.to_path_buf(), bytes));
        Ok(sample_result(self.verified))
    }
}

/// Always fails as if the probe had no detectable face.
pub struct FailingVerifier;

impl FaceVerifier for FailingVerifier {
    fn verify(
        &mut self,
        _img1: &Path,
        _img2: &Path,
        _options: &VerifyOptions,
    ) -> Result<VerificationResult, VerifyError> {
        Err(VerifyError::NoFaceDetected { image: "img1" })
    }
}

/// Never answers within any reasonable timeout.
pub struct StalledVerifier;

impl FaceVerifier for StalledVerifier {
    fn verify(
        &mut self,
        _img1: &Path,
        _img2: &Path,
        _options: &VerifyOptions,
    ) -> Result<VerificationResult, VerifyError> {
        std::thread::sleep(Duration::from_millis(500));
        Ok(sample_result(true))
    }
}

pub struct TestApp {
    pub router: Router,
    pub error_log: Arc<MemoryErrorLog>,
    pub employee_root: PathBuf,
    pub temp_root: PathBuf,
    _dir: TempDir,
}

impl TestApp {
    pub fn spawn<V: FaceVerifier + 'static>(verifier: V) -> Self {
        Self::spawn_with_timeout(verifier, Duration::from_secs(5))
    }

    pub fn spawn_with_timeout<V: FaceVerifier + 'static>(verifier: V, timeout: Duration) -> Self {
        Self::spawn_with_config(verifier, timeout, |_| {})
    }

    pub fn spawn_with_config<V: FaceVerifier + 'static>(
        verifier: V,
        timeout: Duration,
        configure: impl FnOnce(&mut Config),
    ) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let employee_root = dir.path().join("employees");
        let temp_root = dir.path().join("tmp");
        std::fs::create_dir_all(&employee_root).unwrap();

        let mut config = Config {
            employee_images_dir: employee_root.clone(),
            temp_images_dir: temp_root.clone(),
            error_log_path: dir.path().join("error_log.txt"),
            ..Config::default()
        };
        configure(&mut config);

        let engine = spawn_engine(verifier, timeout).expect("engine");
        let error_log = Arc::new(MemoryErrorLog::new());
        let state = AppState::new(config, engine, error_log.clone());

        Self {
            router: build_router(state),
            error_log,
            employee_root,
            temp_root,
            _dir: dir,
        }
    }

    /// Provision a reference image for `employee_id`.
    pub fn enroll(&self, employee_id: &str, file_name: &str) -> PathBuf {
        let folder = self.employee_root.join(employee_id);
        std::fs::create_dir_all(&folder).unwrap();
        let path = folder.join(file_name);
        std::fs::write(&path, b"reference jpeg").unwrap();
        path
    }

    /// Files currently left in the scratch directory.
    pub fn temp_files(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(&self.temp_root) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }
}

/// Minimal `multipart/form-data` body builder.
#[derive(Default)]
pub struct Form {
    body: Vec<u8>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method("POST")
            .uri("/recognize_face")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

pub fn upload(employee_id: &str, image: &[u8]) -> Request<Body> {
    Form::new()
        .text("employee_id", employee_id)
        .file("image", "capture.jpg", image)
        .into_request()
}
