use async_trait::async_trait;

use crate::options::EngineOptions;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("could not start extraction engine: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("extraction engine exited with {}: {detail}", exit_code(.code))]
    Exited { code: Option<i32>, detail: String },
    #[error("interrupted")]
    Interrupted,
}

fn exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

/// Fetches media for a url, reporting progress through the options' hook.
///
/// Implementations call the hook synchronously from within `fetch`, never
/// concurrently, and never after `fetch` returns.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn fetch(&self, url: &str, options: EngineOptions<'_>) -> Result<(), EngineError>;
}
