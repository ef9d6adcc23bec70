//! Fetching remote feature data.
//!
//! The controller never performs I/O itself. Feature layers queue
//! [`FeatureRequest`]s, the application hands them to a [`FeatureFetcher`]
//! and the results flow back through the controller's inbound channel.

use crate::data::geojson::decode_features;
use crate::input::events::Inbound;
use crate::layers::feature::{Feature, FeatureRequest};
use crate::{MapError, Result};
use async_trait::async_trait;
use crossbeam_channel::Sender;
use std::time::Duration;

/// Resolves one feature request into features in native coordinates.
#[async_trait]
pub trait FeatureFetcher: Send + Sync {
    async fn fetch(&self, request: &FeatureRequest) -> Result<Vec<Feature>>;
}

/// GeoJSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFeatureFetcher {
    client: reqwest::Client,
    id_prefix: Option<String>,
}

impl HttpFeatureFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("stopmap/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            id_prefix: None,
        }
    }

    /// Prefix joined to numeric feature ids, e.g. `stop` gives `stop.42`.
    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = Some(prefix.into());
        self
    }
}

#[async_trait]
impl FeatureFetcher for HttpFeatureFetcher {
    async fn fetch(&self, request: &FeatureRequest) -> Result<Vec<Feature>> {
        log::debug!("fetching {} for layer {}", request.url, request.layer);
        let response = self.client.get(&request.url).send().await?;
        if !response.status().is_success() {
            return Err(MapError::Parse(format!(
                "HTTP {} for {}",
                response.status(),
                request.url
            )));
        }
        let body = response.text().await?;
        decode_features(&body, self.id_prefix.as_deref())
    }
}

/// Runs every request concurrently and posts each outcome to `sender`.
///
/// Returns how many results were delivered; fewer than requested means the
/// receiving controller is gone.
pub async fn fulfill<F>(fetcher: &F, requests: Vec<FeatureRequest>, sender: &Sender<Inbound>) -> usize
where
    F: FeatureFetcher + ?Sized,
{
    let results = futures::future::join_all(requests.iter().map(|r| fetcher.fetch(r))).await;

    let mut delivered = 0;
    for (request, result) in requests.into_iter().zip(results) {
        if let Err(e) = &result {
            log::warn!("feature request {} failed: {}", request.url, e);
        }
        if sender.send(Inbound::Features { request, result }).is_err() {
            log::debug!("inbound channel closed, dropping feature results");
            break;
        }
        delivered += 1;
    }
    delivered
}
