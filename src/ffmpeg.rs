use std::path::Path;

use crate::util::{self, Dependency, DependencyError};

/// Checks that ffmpeg can be run. yt-dlp needs it for audio extraction.
pub async fn probe(bin: &Path) -> Result<(), DependencyError> {
    util::probe(bin, "-version", Dependency::Transcoder).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_ffmpeg() {
        let err = probe(Path::new("/nonexistent/ffmpeg")).await.unwrap_err();
        assert!(matches!(
            err,
            DependencyError::Missing(Dependency::Transcoder, _)
        ));
    }
}
