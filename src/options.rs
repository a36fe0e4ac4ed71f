use std::fmt;

use crate::{progress::ProgressEvent, validate::Format};

pub const BEST_AUDIO: &str = "bestaudio";
pub const BEST_COMBINED: &str = "best[ext=mp4]/best";
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

pub const AUDIO_CODEC: &str = "mp3";
pub const AUDIO_QUALITY: &str = "192";

/// Receives every status update the engine reports, in order.
pub type ProgressHook<'a> = &'a mut (dyn FnMut(ProgressEvent) + Send);

/// A step the engine runs after the raw fetch completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcessor {
    /// Extract the audio track and transcode it with ffmpeg.
    ExtractAudio { codec: String, quality: String },
}

impl PostProcessor {
    pub fn name(&self) -> &'static str {
        match self {
            PostProcessor::ExtractAudio { .. } => "extract-audio-transcode",
        }
    }
}

pub struct EngineOptions<'a> {
    pub stream_selector: String,
    pub post_processors: Vec<PostProcessor>,
    pub output_template: String,
    pub progress_hook: ProgressHook<'a>,
}

impl fmt::Debug for EngineOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineOptions")
            .field("stream_selector", &self.stream_selector)
            .field("post_processors", &self.post_processors)
            .field("output_template", &self.output_template)
            .finish_non_exhaustive()
    }
}

/// Maps the requested format to engine options. Only `format` decides the
/// selector and the post-processing chain.
pub fn build_options(format: Format, progress_hook: ProgressHook<'_>) -> EngineOptions<'_> {
    let (stream_selector, post_processors) = match format {
        Format::Mp3 => (
            BEST_AUDIO,
            vec![PostProcessor::ExtractAudio {
                codec: AUDIO_CODEC.to_string(),
                quality: AUDIO_QUALITY.to_string(),
            }],
        ),
        Format::Mp4 => (BEST_COMBINED, Vec::new()),
    };

    EngineOptions {
        stream_selector: stream_selector.to_string(),
        post_processors,
        output_template: OUTPUT_TEMPLATE.to_string(),
        progress_hook,
    }
}
