use async_trait::async_trait;

use super::ProviderAdapter;
use crate::{
    error::ResolveError,
    model::{MediaFormat, ResolvedMedia, Source},
};

pub const PLACEHOLDER_URL: &str = "https://mock-video-cdn.com/instagram/reel-placeholder.mp4";
pub const PLACEHOLDER_FILENAME: &str = "instagram_reel_download.mp4";

pub const FAILURE_MARKER: &str = "example-fail";

#[derive(Debug, Default)]
pub struct InstagramAdapter;

#[async_trait]
impl ProviderAdapter for InstagramAdapter {
    fn source(&self) -> Source {
        Source::Instagram
    }

    async fn resolve(&self, url: &str, _format: MediaFormat) -> Result<ResolvedMedia, ResolveError> {
        if url.contains(FAILURE_MARKER) {
            return Err(ResolveError::upstream_failed(
                "Instagram link failed to scrape.",
            ));
        }

        Ok(ResolvedMedia {
            source: Source::Instagram,
            format: MediaFormat::Mp4,
            filename: PLACEHOLDER_FILENAME.to_string(),
            download_url: PLACEHOLDER_URL.to_string(),
        })
    }
}
