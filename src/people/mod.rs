//! People collection: addressing, reference resolution and record assembly
//!
//! - [`PeopleEndpoint`] builds collection and record URLs
//! - [`resolver::ReferenceResolver`] turns nested resource URLs into labels
//! - [`assembler::RecordAssembler`] builds a flat [`crate::Person`] for one ID

use serde_json::Value;
use tracing::debug;

use crate::fetcher::{FetchError, FetchResult, JsonSource};

pub mod assembler;
pub mod resolver;

pub use assembler::{is_not_found, RecordAssembler, NOT_FOUND_DETAIL};
pub use resolver::{Label, ReferenceResolver};

/// Base URL of a people collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeopleEndpoint {
    base_url: String,
}

impl PeopleEndpoint {
    /// Create an endpoint, appending a trailing `/` when missing
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self { base_url }
    }

    /// URL of the collection itself (carries `count`)
    pub fn collection_url(&self) -> &str {
        &self.base_url
    }

    /// URL of one record
    pub fn record_url(&self, id: u32) -> String {
        format!("{}{}", self.base_url, id)
    }
}

/// Read the total record count from the collection endpoint
pub async fn discover_count<S>(source: &S, endpoint: &PeopleEndpoint) -> FetchResult<u64>
where
    S: JsonSource + ?Sized,
{
    let url = endpoint.collection_url();
    let collection = source.get_json(url).await?;
    let count = collection
        .get("count")
        .and_then(Value::as_u64)
        .ok_or_else(|| FetchError::missing_field(url, "count"))?;

    debug!(url = %url, count, "Discovered record count");
    Ok(count)
}

/// Render a JSON scalar as text: strings verbatim, numbers and booleans by their JSON text
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
