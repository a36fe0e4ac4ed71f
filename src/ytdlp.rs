use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader},
    process::Command,
};

use crate::{
    engine::{Engine, EngineError},
    options::{EngineOptions, PostProcessor},
    progress::ProgressEvent,
    util::{Dependency, DependencyError},
};

/// Prefix of the progress lines yt-dlp prints with our template.
const PROGRESS_MARKER: &str = "ytdl-progress ";
const PROGRESS_TEMPLATE: &str = "download:ytdl-progress %(progress)j";

/// Drives the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlp {
    bin: PathBuf,
    ffmpeg_location: Option<PathBuf>,
}

impl YtDlp {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            ffmpeg_location: None,
        }
    }

    /// Point yt-dlp at a specific ffmpeg binary instead of the one on PATH.
    pub fn with_ffmpeg_location(mut self, ffmpeg: impl Into<PathBuf>) -> Self {
        self.ffmpeg_location = Some(ffmpeg.into());
        self
    }

    pub fn args(&self, url: &str, options: &EngineOptions<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--newline".into(),
            "--no-playlist".into(),
            "--progress-template".into(),
            PROGRESS_TEMPLATE.into(),
            "-f".into(),
            options.stream_selector.as_str().into(),
            "-o".into(),
            options.output_template.as_str().into(),
        ];

        for pp in &options.post_processors {
            match pp {
                PostProcessor::ExtractAudio { codec, quality } => {
                    args.push("-x".into());
                    args.push("--audio-format".into());
                    args.push(codec.as_str().into());
                    args.push("--audio-quality".into());
                    args.push(format!("{}K", quality).into());
                }
            }
        }

        if let Some(ffmpeg) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.into());
        }

        args.push("--".into());
        args.push(url.into());
        args
    }
}

#[async_trait]
impl Engine for YtDlp {
    async fn fetch(&self, url: &str, options: EngineOptions<'_>) -> Result<(), EngineError> {
        let args = self.args(url, &options);
        debug!("Running {} {:?}", self.bin.display(), args);

        let mut child = Command::new(&self.bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(EngineError::Spawn)?;

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            _ => {
                return Err(EngineError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "engine output was not captured",
                )))
            }
        };

        let hook = options.progress_hook;
        let read_stdout = async move {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            while let Some(line) = next_line_lossy(&mut reader, &mut buf).await? {
                match parse_progress_line(&line) {
                    Some(event) => hook(event),
                    None => debug!("yt-dlp: {}", line),
                }
            }
            Ok::<_, std::io::Error>(())
        };

        let ((), stderr) = futures::try_join!(read_stdout, collect_stderr(stderr))?;
        let status = child.wait().await?;

        if status.success() {
            Ok(())
        } else {
            Err(EngineError::Exited {
                code: status.code(),
                detail: error_detail(&stderr),
            })
        }
    }
}

/// Reads one line, replacing invalid UTF-8 instead of failing. yt-dlp prints
/// titles and paths in the console encoding, which need not be UTF-8.
async fn next_line_lossy(
    reader: &mut (impl AsyncBufRead + Unpin),
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf);
    Ok(Some(line.trim_end_matches(|c| c == '\n' || c == '\r').to_string()))
}

async fn collect_stderr(stderr: impl AsyncRead + Unpin) -> std::io::Result<Vec<String>> {
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();
    let mut collected = Vec::new();
    while let Some(line) = next_line_lossy(&mut reader, &mut buf).await? {
        debug!("yt-dlp stderr: {}", line);
        collected.push(line);
    }
    Ok(collected)
}

/// Parses a progress line printed through our template.
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let json = line.trim().strip_prefix(PROGRESS_MARKER)?;
    match serde_json::from_str(json) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Could not parse progress line {:?}: {}", line, e);
            None
        }
    }
}

/// Picks the most useful line of yt-dlp's stderr to report.
fn error_detail(stderr: &[String]) -> String {
    stderr
        .iter()
        .rev()
        .find_map(|l| l.trim().strip_prefix("ERROR:").map(str::trim))
        .or_else(|| stderr.iter().rev().map(|l| l.trim()).find(|l| !l.is_empty()))
        .unwrap_or("no error output")
        .to_string()
}

/// Checks that yt-dlp can be run.
pub async fn probe(bin: &Path) -> Result<(), DependencyError> {
    crate::util::probe(bin, "--version", Dependency::ExtractionEngine).await
}
