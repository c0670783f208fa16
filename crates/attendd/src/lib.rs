//! attendd — face-attendance verification daemon.
//!
//! Serves `POST /recognize_face`: stages the uploaded photo, resolves the
//! employee's reference image and asks the verification engine whether
//! both show the same person.

pub mod config;
pub mod engine;
pub mod error;
pub mod error_log;
pub mod handlers;
pub mod reference;
pub mod staging;
pub mod startup;

pub use config::Config;
pub use startup::{build_router, AppState};
