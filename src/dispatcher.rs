use std::{collections::HashMap, sync::Arc};

use tracing::{info, warn};

use crate::{
    classifier::classify,
    error::ResolveError,
    model::{ResolveRequest, ResolvedMedia, Source},
    providers::ProviderAdapter,
};

#[derive(Clone, Default)]
pub struct Dispatcher {
    adapters: HashMap<Source, Arc<dyn ProviderAdapter>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.insert(adapter.source(), adapter);
        self
    }

    pub fn is_enabled(&self, source: Source) -> bool {
        self.adapters.contains_key(&source)
    }

    /// Decides which provider handles the request.
    ///
    /// An explicit platform wins over classification, unless the URL clearly
    /// belongs to a different known provider.
    pub fn select_source(request: &ResolveRequest) -> Result<Source, ResolveError> {
        if request.url.trim().is_empty() {
            return Err(ResolveError::invalid_request("Missing url"));
        }

        match (request.platform, classify(&request.url)) {
            (Some(expected), Some(detected)) if expected != detected => {
                Err(ResolveError::MismatchedLink { expected, detected })
            }
            (Some(expected), _) => Ok(expected),
            (None, Some(detected)) => Ok(detected),
            (None, None) => Err(ResolveError::UnsupportedPlatform),
        }
    }

    pub async fn resolve(&self, request: &ResolveRequest) -> Result<ResolvedMedia, ResolveError> {
        let result = self.resolve_inner(request).await;

        match &result {
            Ok(media) => info!(
                "Resolved {:?} as {} {} ({})",
                request.url, media.source, media.format, media.filename
            ),
            Err(error) => warn!(
                "Could not resolve {:?} (requested {}): {error}",
                request.url, request.format
            ),
        }

        result
    }

    async fn resolve_inner(&self, request: &ResolveRequest) -> Result<ResolvedMedia, ResolveError> {
        let source = Self::select_source(request)?;
        let adapter = self
            .adapters
            .get(&source)
            .ok_or(ResolveError::NotImplemented(source))?;

        adapter.resolve(request.url.trim(), request.format).await
    }
}
