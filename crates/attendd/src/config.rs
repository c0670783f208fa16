use attend_core::{DistanceMetric, VerifyOptions};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Daemon configuration, loaded once at startup from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address (default: 127.0.0.1:5000).
    pub bind_addr: SocketAddr,
    /// Root holding one reference directory per employee id.
    pub employee_images_dir: PathBuf,
    /// Scratch directory for uploaded images.
    pub temp_images_dir: PathBuf,
    /// Append-only error log file.
    pub error_log_path: PathBuf,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Reference images are `<prefix>*<extension>` inside the employee directory.
    pub reference_prefix: String,
    pub reference_extension: String,
    pub distance_metric: DistanceMetric,
    /// Overrides the metric's default decision threshold.
    pub distance_threshold: Option<f32>,
    /// Reject images where no face can be localized.
    pub enforce_detection: bool,
    /// Upper bound on how long a request waits for the verification engine.
    pub verify_timeout_secs: u64,
    /// Request body limit for uploads.
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            employee_images_dir: PathBuf::from("employee_images"),
            temp_images_dir: PathBuf::from("tmp"),
            error_log_path: PathBuf::from("error_log.txt"),
            model_dir: attend_core::default_model_dir(),
            reference_prefix: "face_".to_string(),
            reference_extension: ".jpg".to_string(),
            distance_metric: DistanceMetric::Cosine,
            distance_threshold: None,
            enforce_detection: false,
            verify_timeout_secs: 30,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Load configuration from `ATTEND_*` environment variables with defaults.
    ///
    /// Unparseable values fall back to the default and are logged.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: env_parse("ATTEND_BIND_ADDR", defaults.bind_addr),
            employee_images_dir: env_path("ATTEND_EMPLOYEE_IMAGES_DIR", defaults.employee_images_dir),
            temp_images_dir: env_path("ATTEND_TEMP_IMAGES_DIR", defaults.temp_images_dir),
            error_log_path: env_path("ATTEND_ERROR_LOG_PATH", defaults.error_log_path),
            model_dir: env_path("ATTEND_MODEL_DIR", defaults.model_dir),
            reference_prefix: std::env::var("ATTEND_REFERENCE_PREFIX")
                .unwrap_or(defaults.reference_prefix),
            reference_extension: std::env::var("ATTEND_REFERENCE_EXTENSION")
                .unwrap_or(defaults.reference_extension),
            distance_metric: env_parse("ATTEND_DISTANCE_METRIC", defaults.distance_metric),
            distance_threshold: env_parse_opt("ATTEND_DISTANCE_THRESHOLD"),
            enforce_detection: env_bool("ATTEND_ENFORCE_DETECTION", defaults.enforce_detection),
            verify_timeout_secs: env_parse("ATTEND_VERIFY_TIMEOUT_SECS", defaults.verify_timeout_secs),
            max_upload_bytes: env_parse("ATTEND_MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
        }
    }

    /// Options passed to the verifier for every request.
    pub fn verify_options(&self) -> VerifyOptions {
        VerifyOptions {
            enforce_detection: self.enforce_detection,
            metric: self.distance_metric,
            threshold: self.distance_threshold,
        }
    }

    /// Path to the SCRFD detection model.
    pub fn scrfd_model_path(&self) -> String {
        self.model_dir
            .join(attend_core::SCRFD_MODEL_FILE)
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the ArcFace recognition model.
    pub fn arcface_model_path(&self) -> String {
        self.model_dir
            .join(attend_core::ARCFACE_MODEL_FILE)
            .to_string_lossy()
            .into_owned()
    }
}

fn env_path(key: &str, default: PathBuf) -> PathBuf {
    std::env::var(key).map(PathBuf::from).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "invalid value; using default");
            default
        }),
        Err(_) => default,
    }
}

fn env_parse_opt<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "invalid value; ignoring");
            None
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(raw) => parse_bool(&raw).unwrap_or_else(|| {
            tracing::warn!(key, value = %raw, "invalid boolean; using default");
            default
        }),
        Err(_) => default,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
