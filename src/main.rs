use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use ytdl_rs::{
    ffmpeg,
    progress::TerminalBars,
    util::{self, Severity},
    validate::{DownloadRequest, ValidationError},
    worker, ytdlp,
};

const DEFAULT_FFMPEG: &str = "ffmpeg";

#[derive(Parser)]
#[command(name = "ytdl", version, about = "Download a YouTube video as mp4 or mp3")]
struct Args {
    /// YouTube video url, e.g. https://www.youtube.com/watch?v=...
    url: String,

    /// Output format: mp4 or mp3
    format: String,

    /// yt-dlp executable
    #[arg(long = "yt-dlp", env = "YTDL_YT_DLP", default_value = "yt-dlp")]
    yt_dlp: PathBuf,

    /// ffmpeg executable
    #[arg(long, env = "YTDL_FFMPEG", default_value = DEFAULT_FFMPEG)]
    ffmpeg: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // Validate url and format
    let request = match DownloadRequest::new(&args.url, &args.format) {
        Ok(request) => request,
        Err(e) => {
            if let ValidationError::InvalidFormat(_) = e {
                util::status(Severity::Success, "Youtube video url is valid");
            }
            util::status(Severity::Error, e);
            return ExitCode::FAILURE;
        }
    };
    util::status(Severity::Success, "Youtube video url is valid");
    util::status(Severity::Success, "Format is valid");

    // Check external tools
    util::status(Severity::Info, "Validating yt-dlp is installed...");
    if let Err(e) = ytdlp::probe(&args.yt_dlp).await {
        util::status(Severity::Error, e);
        util::status(
            Severity::Warning,
            "Install it from https://github.com/yt-dlp/yt-dlp#installation",
        );
        return ExitCode::FAILURE;
    }
    util::status(Severity::Success, "yt-dlp is installed.");

    util::status(Severity::Info, "Validating ffmpeg is installed...");
    if let Err(e) = ffmpeg::probe(&args.ffmpeg).await {
        util::status(Severity::Error, e);
        util::status(
            Severity::Warning,
            "Install it from https://ffmpeg.org/download.html",
        );
        return ExitCode::FAILURE;
    }
    util::status(Severity::Success, "ffmpeg is installed.");

    let mut engine = ytdlp::YtDlp::new(args.yt_dlp);
    if args.ffmpeg.as_os_str() != DEFAULT_FFMPEG {
        engine = engine.with_ffmpeg_location(args.ffmpeg);
    }

    util::status(
        Severity::Info,
        format!("Downloading {} as {}", request.url(), request.format()),
    );
    match worker::run(&engine, &request, TerminalBars).await {
        Ok(bytes) => {
            util::status(
                Severity::Success,
                format!("Download complete ({})", util::format_bytes(bytes)),
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            util::status(Severity::Error, e);
            ExitCode::FAILURE
        }
    }
}
