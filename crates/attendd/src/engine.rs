use attend_core::{FaceVerifier, VerificationResult, VerifyError, VerifyOptions};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Verify(#[from] VerifyError),
    #[error("verification timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Messages sent from request handlers to the engine thread.
struct VerifyRequest {
    img1: PathBuf,
    img2: PathBuf,
    options: VerifyOptions,
    reply: oneshot::Sender<Result<VerificationResult, VerifyError>>,
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<VerifyRequest>,
    timeout: Duration,
}

impl EngineHandle {
    /// Compare `img1` against `img2` on the engine thread.
    ///
    /// Gives up after the configured timeout; the engine still finishes the
    /// abandoned request before taking the next one.
    pub async fn verify(
        &self,
        img1: PathBuf,
        img2: PathBuf,
        options: VerifyOptions,
    ) -> Result<VerificationResult, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = VerifyRequest {
            img1,
            img2,
            options,
            reply: reply_tx,
        };

        let roundtrip = async {
            self.tx
                .send(request)
                .await
                .map_err(|_| EngineError::ChannelClosed)?;
            reply_rx.await.map_err(|_| EngineError::ChannelClosed)?.map_err(EngineError::from)
        };

        tokio::time::timeout(self.timeout, roundtrip)
            .await
            .map_err(|_| EngineError::Timeout(self.timeout))?
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// The verifier (and any models it holds) is owned by that thread for the
/// life of the process; requests are processed one at a time.
pub fn spawn_engine<V>(mut verifier: V, timeout: Duration) -> Result<EngineHandle, EngineError>
where
    V: FaceVerifier + 'static,
{
    let (tx, mut rx) = mpsc::channel::<VerifyRequest>(4);

    std::thread::Builder::new()
        .name("attend-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                let result = verifier.verify(&req.img1, &req.img2, &req.options);
                match &result {
                    Ok(r) => tracing::debug!(
                        verified = r.verified,
                        distance = r.distance,
                        threshold = r.threshold,
                        "verification complete"
                    ),
                    Err(err) => tracing::warn!(error = %err, "verification failed"),
                }
                // Receiver is gone when the handler timed out
                let _ = req.reply.send(result);
            }
            tracing::info!("engine thread exiting");
        })
        .map_err(EngineError::Spawn)?;

    Ok(EngineHandle { tx, timeout })
}
