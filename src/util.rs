use std::{fmt, io::Write, path::Path, process::Stdio};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    ExtractionEngine,
    Transcoder,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::ExtractionEngine => f.write_str("yt-dlp"),
            Dependency::Transcoder => f.write_str("ffmpeg"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DependencyError {
    #[error("{0} is not installed ({1})")]
    Missing(Dependency, String),
}

/// Runs `bin <version_flag>` and checks that it exits successfully.
pub async fn probe(bin: &Path, version_flag: &str, dep: Dependency) -> Result<(), DependencyError> {
    let status = tokio::process::Command::new(bin)
        .arg(version_flag)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| DependencyError::Missing(dep, format!("{}: {}", bin.display(), e)))?;

    if status.success() {
        debug!("{} found at {}", dep, bin.display());
        Ok(())
    } else {
        Err(DependencyError::Missing(
            dep,
            format!("{} {} exited with {}", bin.display(), version_flag, status),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    fn color(&self) -> &'static str {
        match self {
            Severity::Info => "\x1b[96m",
            Severity::Success => "\x1b[92m",
            Severity::Warning => "\x1b[93m",
            Severity::Error => "\x1b[91m",
        }
    }
}

/// Prints one status line to stdout, colored by severity.
pub fn status(severity: Severity, msg: impl fmt::Display) {
    let mut out = std::io::stdout().lock();
    let _ = writeln!(out, "{} {}\x1b[00m", severity.color(), msg);
    let _ = out.flush();
}

pub fn format_bytes(bytes: u64) -> String {
    let mut bytes = bytes as f64;
    let mut suffix = "B";

    for next in ["KiB", "MiB", "GiB", "TiB"] {
        if bytes <= 1024.0 {
            break;
        }
        bytes /= 1024.0;
        suffix = next;
    }

    format!("{:.2} {}", bytes, suffix)
}
