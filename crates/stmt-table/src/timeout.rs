use std::time::Duration;

use crate::error::ExtractError;

/// Runs an extraction stage on a helper thread and gives up after `limit`.
/// The abandoned thread is detached; its result is discarded when it finishes.
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn run_with_timeout<T, F>(
    stage: &'static str,
    limit: Option<Duration>,
    job: F,
) -> Result<T, ExtractError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ExtractError> + Send + 'static,
{
    use std::sync::mpsc::{self, RecvTimeoutError};
    use std::thread;

    let Some(limit) = limit else {
        return job();
    };

    let (sender, receiver) = mpsc::channel();
    thread::Builder::new()
        .name(format!("stmt-table {stage}"))
        .spawn(move || {
            // The receiver is gone once the caller timed out.
            let _ = sender.send(job());
        })?;

    match receiver.recv_timeout(limit) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(ExtractError::Timeout { stage, limit }),
        Err(RecvTimeoutError::Disconnected) => Err(ExtractError::ExtractionUnavailable(format!(
            "{stage} stopped without producing a result"
        ))),
    }
}

/// wasm32 has no threads; stages run inline and rely on the host's limits.
#[cfg(target_arch = "wasm32")]
pub(crate) fn run_with_timeout<T, F>(
    _stage: &'static str,
    _limit: Option<Duration>,
    job: F,
) -> Result<T, ExtractError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ExtractError> + Send + 'static,
{
    job()
}
