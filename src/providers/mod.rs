use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::{
    error::ResolveError,
    model::{MediaFormat, ResolvedMedia, Source},
};

pub mod instagram;
pub mod tiktok;
pub mod youtube;

pub use instagram::InstagramAdapter;
pub use tiktok::TikTokAdapter;
pub use youtube::{YouTubeAdapter, YouTubeClient, YtDlpClient};

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn source(&self) -> Source;

    async fn resolve(&self, url: &str, format: MediaFormat) -> Result<ResolvedMedia, ResolveError>;
}

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\s-]").unwrap());
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Builds a download filename from a video title.
///
/// Drops everything outside ASCII word characters, whitespace and `-`, trims,
/// then collapses each whitespace run into a single `_`.
pub fn filename_from_title(title: &str, format: MediaFormat) -> String {
    let stripped = NON_WORD.replace_all(title, "");
    let stem = WHITESPACE_RUN.replace_all(stripped.trim(), "_");
    let stem = if stem.is_empty() { "video" } else { &stem };

    format!("{stem}.{}", format.extension())
}
