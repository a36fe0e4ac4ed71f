//! # ytdl-rs
//!
//! This crate downloads a single YouTube video as `mp4` or `mp3`. The heavy
//! lifting is delegated to [yt-dlp](https://github.com/yt-dlp/yt-dlp) and
//! `ffmpeg`; this crate validates the request, renders the engine options,
//! and turns the engine's progress output into a terminal progress bar.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ytdl_rs::{progress::TerminalBars, validate::DownloadRequest, worker, ytdlp::YtDlp};
//!
//! #[tokio::main]
//! async fn main() {
//!     // Validate the url and the format token
//!     let request = DownloadRequest::new("https://www.youtube.com/watch?v=...", "mp3").unwrap();
//!
//!     // Drive yt-dlp from PATH, rendering progress with indicatif
//!     let engine = YtDlp::new("yt-dlp");
//!     worker::run(&engine, &request, TerminalBars).await.unwrap();
//! }
//! ```
//!
//! The `worker` module guarantees that the progress bar is released on every
//! exit path, including Ctrl-C.

#![forbid(unsafe_code)]

#[macro_use]
extern crate log;

pub mod engine;
pub mod ffmpeg;
pub mod options;
pub mod progress;
pub mod util;
pub mod validate;
pub mod worker;
pub mod ytdlp;
