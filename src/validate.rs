use std::{fmt, str::FromStr, sync::OnceLock};

use regex::Regex;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid youtube video url: {0}")]
    InvalidUrl(String),
    #[error("Invalid format {0:?}. Please specify mp4 or mp3")]
    InvalidFormat(String),
}

/// Output format requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Mp4,
    Mp3,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Mp4 => "mp4",
            Format::Mp3 => "mp3",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mp4" => Ok(Format::Mp4),
            "mp3" => Ok(Format::Mp3),
            _ => Err(ValidationError::InvalidFormat(s.to_string())),
        }
    }
}

/// A url and format that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    url: String,
    format: Format,
}

impl DownloadRequest {
    pub fn new(url: &str, format: &str) -> Result<Self, ValidationError> {
        validate_url(url)?;
        let format = validate_format(format)?;

        Ok(Self {
            url: url.to_string(),
            format,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn format(&self) -> Format {
        self.format
    }
}

fn watch_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://(?:www\.)?youtube\.com/watch\?v=[\w-]+(?:&\S*)?$")
            .expect("watch url pattern is valid")
    })
}

/// Checks that `url` points at a youtube watch page with a video id.
pub fn validate_url(url: &str) -> Result<(), ValidationError> {
    if watch_url_regex().is_match(url) {
        Ok(())
    } else {
        Err(ValidationError::InvalidUrl(url.to_string()))
    }
}

/// Checks that `format` is one of the supported tokens.
pub fn validate_format(format: &str) -> Result<Format, ValidationError> {
    format.parse()
}
