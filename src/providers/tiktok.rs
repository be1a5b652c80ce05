use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;
use url::Url;

use super::ProviderAdapter;
use crate::{
    error::ResolveError,
    model::{MediaFormat, ResolvedMedia, Source, non_empty},
};

pub const DEFAULT_RESOLVER_URL: &str = "https://www.tikwm.com/api/";
pub const TIKTOK_FILENAME: &str = "tiktok_video.mp4";

const RESOLUTION_FAILED: &str = "Failed to fetch TikTok video";

pub struct TikTokAdapter {
    client: reqwest::Client,
    resolver: Url,
}

impl TikTokAdapter {
    pub fn new(client: reqwest::Client, resolver: Url) -> Self {
        Self { client, resolver }
    }

    fn absolute_play_url(&self, play: &str) -> Result<String, ResolveError> {
        match Url::parse(play) {
            Ok(parsed) => Ok(parsed.into()),
            Err(url::ParseError::RelativeUrlWithoutBase) => self
                .resolver
                .join(play)
                .map(Into::into)
                .map_err(|_| ResolveError::upstream_failed(RESOLUTION_FAILED)),
            Err(error) => {
                warn!("TikTok resolver returned an unusable play url {play:?}: {error}");
                Err(ResolveError::upstream_failed(RESOLUTION_FAILED))
            }
        }
    }
}

#[async_trait]
impl ProviderAdapter for TikTokAdapter {
    fn source(&self) -> Source {
        Source::TikTok
    }

    // Audio-only is not offered by the resolver, so the requested format is ignored.
    async fn resolve(&self, url: &str, _format: MediaFormat) -> Result<ResolvedMedia, ResolveError> {
        let response = self
            .client
            .get(self.resolver.clone())
            .query(&[("url", url)])
            .send()
            .await
            .map_err(|error| {
                warn!("Error calling TikTok resolver: {error}");
                if error.is_timeout() {
                    ResolveError::unreachable("TikTok resolver timed out")
                } else {
                    ResolveError::unreachable("Cannot reach TikTok resolver")
                }
            })?;

        let status = response.status();
        let body = response.json::<Value>().await.map_err(|error| {
            warn!("TikTok resolver answered {status} with an unreadable body: {error}");
            ResolveError::upstream_failed(RESOLUTION_FAILED)
        })?;

        let play = body
            .pointer("/data/play")
            .and_then(Value::as_str)
            .and_then(non_empty)
            .ok_or_else(|| {
                warn!(
                    "TikTok resolver answered {status} without data.play: {:?}",
                    body.get("msg")
                );
                ResolveError::upstream_failed(RESOLUTION_FAILED)
            })?;

        Ok(ResolvedMedia {
            source: Source::TikTok,
            format: MediaFormat::Mp4,
            filename: TIKTOK_FILENAME.to_string(),
            download_url: self.absolute_play_url(play)?,
        })
    }
}
