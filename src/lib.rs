use std::{sync::Arc, time::Duration};

pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod model;
pub mod providers;
pub mod routes;

pub use classifier::classify;
pub use config::{Config, ConfigError};
pub use dispatcher::Dispatcher;
pub use error::ResolveError;
pub use model::{MediaFormat, ResolveRequest, ResolvedMedia, Source};
pub use routes::{AppState, build_cors_layer, router};

use providers::{InstagramAdapter, TikTokAdapter, YouTubeAdapter, YouTubeClient};

pub fn build_api_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}

pub fn build_stream_client(connect_timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .build()
}

pub fn build_dispatcher(
    config: &Config,
    api_client: reqwest::Client,
    youtube_client: Arc<dyn YouTubeClient>,
) -> Dispatcher {
    let mut dispatcher = Dispatcher::new().with_adapter(Arc::new(YouTubeAdapter::new(youtube_client)));

    if config.tiktok_enabled {
        dispatcher = dispatcher.with_adapter(Arc::new(TikTokAdapter::new(
            api_client,
            config.tiktok_resolver_url.clone(),
        )));
    }
    if config.instagram_enabled {
        dispatcher = dispatcher.with_adapter(Arc::new(InstagramAdapter));
    }

    dispatcher
}
