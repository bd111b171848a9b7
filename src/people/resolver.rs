//! Reference resolution
//!
//! A list field is resolved by fetching every URL concurrently and joining the
//! labels in input order. `try_join_all` keeps one slot per input future, so the
//! order of completion never leaks into the output.

use futures::future::try_join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::scalar_text;
use crate::fetcher::{FetchError, FetchResult, JsonSource};

/// Separator between labels of a list field
pub const LABEL_SEPARATOR: &str = ", ";

/// How to turn a fetched resource into its display label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    /// The resource's `name`
    Name,
    /// "Episode <episode_id>: <title>", used for films
    EpisodeTitle,
}

impl Label {
    /// Extract the label from a resource fetched from `url`
    pub fn extract(&self, url: &str, resource: &Value) -> FetchResult<String> {
        let field = |name: &str| {
            resource
                .get(name)
                .and_then(scalar_text)
                .ok_or_else(|| FetchError::missing_field(url, name))
        };

        match self {
            Label::Name => field("name"),
            Label::EpisodeTitle => {
                let episode = field("episode_id")?;
                let title = field("title")?;
                Ok(format!("Episode {episode}: {title}"))
            }
        }
    }
}

/// Resolves nested resource URLs into display labels
pub struct ReferenceResolver<S: ?Sized> {
    source: Arc<S>,
}

impl<S: ?Sized> Clone for ReferenceResolver<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<S: JsonSource + ?Sized> ReferenceResolver<S> {
    /// Create a resolver fetching through `source`
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    /// Fetch one resource and extract its label
    pub async fn resolve_label(&self, url: &str, label: Label) -> FetchResult<String> {
        let resource = self.source.get_json(url).await?;
        label.extract(url, &resource)
    }

    /// Resolve a homeworld URL into the planet name
    pub async fn resolve_homeworld(&self, url: &str) -> FetchResult<String> {
        self.resolve_label(url, Label::Name).await
    }

    /// Resolve every URL concurrently and join the labels with `", "` in input order
    ///
    /// Fails with the first error encountered; no partial join is ever returned.
    /// An empty list yields an empty string without fetching anything.
    pub async fn resolve_names_joined<U>(&self, urls: &[U], label: Label) -> FetchResult<String>
    where
        U: AsRef<str>,
    {
        if urls.is_empty() {
            return Ok(String::new());
        }

        let labels = try_join_all(
            urls.iter()
                .map(|url| self.resolve_label(url.as_ref(), label)),
        )
        .await?;

        debug!(count = labels.len(), ?label, "Resolved reference list");
        Ok(labels.join(LABEL_SEPARATOR))
    }
}
