use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    #[default]
    Mp4,
    Mp3,
}

impl MediaFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mp3 => "mp3",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Mp4 => "video/mp4",
            Self::Mp3 => "audio/mpeg",
        }
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for MediaFormat {
    type Err = ResolveError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "mp3" => Ok(Self::Mp3),
            other => Err(ResolveError::invalid_request(format!(
                "Unsupported format {other:?}, expected mp4 or mp3"
            ))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    YouTube,
    TikTok,
    Instagram,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::YouTube => "YouTube",
            Self::TikTok => "TikTok",
            Self::Instagram => "Instagram",
        };
        f.write_str(name)
    }
}

impl FromStr for Source {
    type Err = ResolveError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "youtube" => Ok(Self::YouTube),
            "tiktok" => Ok(Self::TikTok),
            "instagram" => Ok(Self::Instagram),
            _ => Err(ResolveError::UnsupportedPlatform),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct DownloadVideoBody {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    pub url: String,
    pub format: MediaFormat,
    pub platform: Option<Source>,
}

impl ResolveRequest {
    pub fn new(url: impl Into<String>, format: MediaFormat) -> Self {
        Self {
            url: url.into(),
            format,
            platform: None,
        }
    }

    pub fn with_platform(mut self, platform: Option<Source>) -> Self {
        self.platform = platform;
        self
    }
}

impl TryFrom<DownloadVideoBody> for ResolveRequest {
    type Error = ResolveError;

    fn try_from(body: DownloadVideoBody) -> Result<Self, Self::Error> {
        let format = match body.format.as_deref().and_then(non_empty) {
            Some(value) => value.parse()?,
            None => MediaFormat::default(),
        };
        let platform = body
            .platform
            .as_deref()
            .and_then(non_empty)
            .map(str::parse::<Source>)
            .transpose()?;

        Ok(Self {
            url: body.url.unwrap_or_default().trim().to_string(),
            format,
            platform,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    pub source: Source,
    pub format: MediaFormat,
    pub filename: String,
    pub download_url: String,
}

impl Serialize for ResolvedMedia {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Body<'a> {
            success: bool,
            source: Source,
            format: MediaFormat,
            filename: &'a str,
            download_url: &'a str,
        }

        Body {
            success: true,
            source: self.source,
            format: self.format,
            filename: &self.filename,
            download_url: &self.download_url,
        }
        .serialize(serializer)
    }
}

pub(crate) fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
