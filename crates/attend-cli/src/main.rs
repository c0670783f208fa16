use anyhow::{Context, Result};
use attend_core::{DistanceMetric, FaceVerifier, OnnxVerifier, VerifyOptions};
use attendd::reference::ReferenceGallery;
use attendd::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

const DEFAULT_URL: &str = "http://127.0.0.1:5000";

#[derive(Parser)]
#[command(name = "attend", about = "Face-attendance verification CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two image files locally, bypassing the daemon
    Verify {
        img1: PathBuf,
        img2: PathBuf,
        /// Distance metric: cosine or euclidean_l2
        #[arg(long, default_value = "cosine")]
        metric: DistanceMetric,
        /// Decision threshold (defaults to the metric's ArcFace threshold)
        #[arg(long)]
        threshold: Option<f32>,
        /// Fail when no face is detected instead of using the whole image
        #[arg(long)]
        enforce_detection: bool,
    },
    /// Show which reference image the daemon would use for an employee
    Lookup { employee_id: String },
    /// Send a photo to a running daemon
    Recognize {
        image: PathBuf,
        employee_id: String,
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,
    },
    /// Show daemon status
    Status {
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Verify {
            img1,
            img2,
            metric,
            threshold,
            enforce_detection,
        } => {
            let config = Config::from_env();
            let mut verifier =
                OnnxVerifier::load(&config.scrfd_model_path(), &config.arcface_model_path())
                    .map_err(|e| anyhow::anyhow!("loading models: {e}"))?;
            let options = VerifyOptions {
                enforce_detection,
                metric,
                threshold,
            };
            let result = verifier
                .verify(&img1, &img2, &options)
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Lookup { employee_id } => {
            let config = Config::from_env();
            let gallery = ReferenceGallery::new(
                config.employee_images_dir,
                config.reference_prefix,
                config.reference_extension,
            );
            match gallery.resolve(&employee_id).await {
                Ok(path) => println!("{}", path.display()),
                Err(err) => {
                    eprintln!("{err}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Recognize {
            image,
            employee_id,
            url,
        } => {
            let bytes = tokio::fs::read(&image)
                .await
                .with_context(|| format!("reading {}", image.display()))?;
            let file_name = image
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image.jpg".to_string());

            let form = reqwest::multipart::Form::new()
                .text("employee_id", employee_id)
                .part(
                    "image",
                    reqwest::multipart::Part::bytes(bytes).file_name(file_name),
                );

            let response = reqwest::Client::new()
                .post(format!("{}/recognize_face", url.trim_end_matches('/')))
                .multipart(form)
                .send()
                .await
                .context("sending request to attendd")?;
            print_response(response).await?;
        }
        Commands::Status { url } => {
            let response = reqwest::get(format!("{}/health", url.trim_end_matches('/')))
                .await
                .context("attendd not reachable")?;
            print_response(response).await?;
        }
    }

    Ok(())
}

async fn print_response(response: reqwest::Response) -> Result<()> {
    let status = response.status();
    let body: serde_json::Value = response.json().await.context("decoding response body")?;
    println!("{status}");
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
