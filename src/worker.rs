use std::future::Future;

use crate::{
    engine::{Engine, EngineError},
    options::build_options,
    progress::{ProgressEvent, ProgressTracker, WidgetFactory},
    validate::DownloadRequest,
};

#[derive(thiserror::Error, Debug)]
pub enum WorkerError {
    #[error("Download failed: {0}")]
    DownloadFailed(#[from] EngineError),
}

/// Downloads `request` with `engine`, stopping early on Ctrl-C.
///
/// Returns the number of bytes the engine reported.
pub async fn run<E, F>(engine: &E, request: &DownloadRequest, factory: F) -> Result<u64, WorkerError>
where
    E: Engine + ?Sized,
    F: WidgetFactory + Send,
    F::Widget: Send,
{
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Could not listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    run_until(engine, request, factory, interrupt).await
}

/// Like [`run`], but stops when `interrupt` completes.
pub async fn run_until<E, F, I>(
    engine: &E,
    request: &DownloadRequest,
    factory: F,
    interrupt: I,
) -> Result<u64, WorkerError>
where
    E: Engine + ?Sized,
    F: WidgetFactory + Send,
    F::Widget: Send,
    I: Future<Output = ()>,
{
    let mut tracker = ProgressTracker::new(factory);

    let result = {
        let mut hook = |event: ProgressEvent| tracker.handle(event);
        let options = build_options(request.format(), &mut hook);
        debug!("Fetching {} with {:?}", request.url(), options);

        tokio::select! {
            res = engine.fetch(request.url(), options) => res,
            _ = interrupt => Err(EngineError::Interrupted),
        }
    };

    match result {
        Ok(()) => {
            tracker.finish();
            Ok(tracker.state().downloaded_bytes)
        }
        Err(e) => {
            tracker.abort(&e.to_string());
            Err(WorkerError::DownloadFailed(e))
        }
    }
}
