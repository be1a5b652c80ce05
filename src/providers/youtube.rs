use std::{cmp::Ordering, io::ErrorKind, sync::Arc, sync::LazyLock, time::Duration};

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tokio::{process::Command, time::timeout};
use tracing::{debug, info, warn};
use url::Url;

use super::{ProviderAdapter, filename_from_title};
use crate::{
    error::ResolveError,
    model::{MediaFormat, ResolvedMedia, Source},
};

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap());

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub formats: Vec<StreamFormat>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamFormat {
    #[serde(default)]
    pub format_id: String,
    pub url: Option<String>,
    pub protocol: Option<String>,
    pub ext: Option<String>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub height: Option<u32>,
    pub fps: Option<f32>,
    pub tbr: Option<f32>,
    pub abr: Option<f32>,
}

impl StreamFormat {
    fn has_video(&self) -> bool {
        matches!(self.vcodec.as_deref(), Some(value) if value != "none")
    }

    fn has_audio(&self) -> bool {
        matches!(self.acodec.as_deref(), Some(value) if value != "none")
    }

    fn has_audio_only(&self) -> bool {
        !self.has_video() && self.has_audio()
    }

    // A single fetchable URL rather than a segmented manifest.
    fn is_direct(&self) -> bool {
        self.url.is_some() && matches!(self.protocol.as_deref(), None | Some("http" | "https"))
    }
}

#[async_trait]
pub trait YouTubeClient: Send + Sync {
    async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, ResolveError>;
}

#[derive(Debug, Clone)]
pub struct YtDlpClient {
    binary: String,
    timeout: Duration,
}

impl YtDlpClient {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub async fn check_version(&self) {
        match self.run(&["--version"]).await {
            Ok(output) => {
                let version = String::from_utf8_lossy(&output.stdout);
                info!("yt-dlp {} available at {:?}", version.trim(), self.binary);
            }
            Err(error) => {
                warn!("yt-dlp version check failed, YouTube lookups will error: {error}");
            }
        }
    }

    async fn run(&self, args: &[&str]) -> Result<std::process::Output, ResolveError> {
        let command_future = Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output();
        let output = timeout(self.timeout, command_future)
            .await
            .map_err(|_| {
                ResolveError::unreachable(format!(
                    "YouTube lookup timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|error| {
                if error.kind() == ErrorKind::NotFound {
                    ResolveError::unreachable(format!(
                        "{} is not installed on the server",
                        self.binary
                    ))
                } else {
                    ResolveError::unreachable(format!("Could not run yt-dlp: {error}"))
                }
            })?;

        if !output.status.success() {
            return Err(failure_from_stderr(&output.stderr));
        }

        Ok(output)
    }
}

#[async_trait]
impl YouTubeClient for YtDlpClient {
    async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, ResolveError> {
        let output = self
            .run(&["-J", "--no-playlist", "--no-warnings", url])
            .await?;

        serde_json::from_slice(&output.stdout).map_err(|error| {
            warn!("Unreadable yt-dlp JSON for {url:?}: {error}");
            ResolveError::upstream_failed("Failed to fetch YouTube video")
        })
    }
}

fn failure_from_stderr(stderr: &[u8]) -> ResolveError {
    let message = String::from_utf8_lossy(stderr)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .next_back()
        .unwrap_or("Failed to fetch YouTube video")
        .to_string();

    if message.to_ascii_lowercase().contains("unsupported url") {
        ResolveError::invalid_url("Invalid YouTube URL")
    } else {
        ResolveError::UpstreamResolutionFailed(message)
    }
}

pub fn youtube_video_id(input: &str) -> Option<String> {
    let parsed = Url::parse(input).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }

    let host = parsed.host_str()?.to_ascii_lowercase();
    let mut segments = parsed.path_segments()?.filter(|segment| !segment.is_empty());

    let candidate = if host == "youtu.be" || host.ends_with(".youtu.be") {
        segments.next()?.to_string()
    } else if host == "youtube.com" || host.ends_with(".youtube.com") {
        match segments.next()? {
            "watch" => parsed
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned())?,
            "shorts" | "embed" | "live" | "v" => segments.next()?.to_string(),
            _ => return None,
        }
    } else {
        return None;
    };

    VIDEO_ID.is_match(&candidate).then_some(candidate)
}

fn compare_f32(a: Option<f32>, b: Option<f32>) -> Ordering {
    a.unwrap_or_default()
        .partial_cmp(&b.unwrap_or_default())
        .unwrap_or(Ordering::Equal)
}

/// Picks the highest quality direct rendition for the requested format.
///
/// `mp3` only ever considers audio-only renditions; `mp4` only combined
/// audio+video ones.
pub fn select_format(formats: &[StreamFormat], format: MediaFormat) -> Option<&StreamFormat> {
    let direct = formats.iter().filter(|item| item.is_direct());

    match format {
        MediaFormat::Mp3 => direct.filter(|item| item.has_audio_only()).max_by(|a, b| {
            compare_f32(a.abr, b.abr).then_with(|| compare_f32(a.tbr, b.tbr))
        }),
        MediaFormat::Mp4 => direct
            .filter(|item| item.has_video() && item.has_audio())
            .max_by(|a, b| {
                a.height
                    .unwrap_or_default()
                    .cmp(&b.height.unwrap_or_default())
                    .then_with(|| compare_f32(a.fps, b.fps))
                    .then_with(|| compare_f32(a.tbr, b.tbr))
            }),
    }
}

pub struct YouTubeAdapter {
    client: Arc<dyn YouTubeClient>,
}

impl YouTubeAdapter {
    pub fn new(client: Arc<dyn YouTubeClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderAdapter for YouTubeAdapter {
    fn source(&self) -> Source {
        Source::YouTube
    }

    async fn resolve(&self, url: &str, format: MediaFormat) -> Result<ResolvedMedia, ResolveError> {
        if youtube_video_id(url).is_none() {
            return Err(ResolveError::invalid_url("Invalid YouTube URL"));
        }

        let metadata = self.client.fetch_metadata(url).await?;
        let selected = select_format(&metadata.formats, format)
            .ok_or(ResolveError::NoFormatAvailable(format))?;
        let download_url = selected
            .url
            .clone()
            .ok_or(ResolveError::NoFormatAvailable(format))?;

        debug!(
            "Selected YouTube format {} ({:?}) for {url:?}",
            selected.format_id, selected.ext
        );

        Ok(ResolvedMedia {
            source: Source::YouTube,
            format,
            filename: filename_from_title(metadata.title.as_deref().unwrap_or_default(), format),
            download_url,
        })
    }
}
