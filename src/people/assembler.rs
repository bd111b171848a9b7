//! Record assembly
//!
//! Builds one flat [`Person`] per ID. The five reference fields are resolved
//! concurrently and the person only exists once all five have succeeded.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use super::resolver::{Label, ReferenceResolver};
use super::{scalar_text, PeopleEndpoint};
use crate::fetcher::{FetchError, FetchResult, JsonSource};
use crate::metrics::record_missing;
use crate::{Person, ReferenceField, SCALAR_FIELDS};

/// `detail` value the API returns for an ID with no record
pub const NOT_FOUND_DETAIL: &str = "Not found";

/// Whether a raw record is the API's not-found sentinel
pub fn is_not_found(raw: &Value) -> bool {
    raw.get("detail").and_then(Value::as_str) == Some(NOT_FOUND_DETAIL)
}

/// Assembles resolved people from raw records
pub struct RecordAssembler<S: ?Sized> {
    endpoint: PeopleEndpoint,
    source: Arc<S>,
    resolver: ReferenceResolver<S>,
}

impl<S: JsonSource + ?Sized> RecordAssembler<S> {
    /// Create an assembler reading records under `endpoint`
    pub fn new(source: Arc<S>, endpoint: PeopleEndpoint) -> Self {
        Self {
            endpoint,
            resolver: ReferenceResolver::new(Arc::clone(&source)),
            source,
        }
    }

    /// Endpoint records are read from
    pub fn endpoint(&self) -> &PeopleEndpoint {
        &self.endpoint
    }

    /// Fetch and fully resolve the person with `id`
    ///
    /// Returns `Ok(None)` for the not-found sentinel. Any failed fetch fails the
    /// whole assembly; a partially resolved person is never returned.
    pub async fn assemble(&self, id: u32) -> FetchResult<Option<Person>> {
        let url = self.endpoint.record_url(id);
        let raw = self.source.get_json(&url).await?;

        if is_not_found(&raw) {
            debug!(id, url = %url, "No record for id");
            record_missing();
            return Ok(None);
        }

        let mut person = Person {
            id,
            ..Default::default()
        };
        for field in SCALAR_FIELDS {
            let value = raw
                .get(field)
                .and_then(scalar_text)
                .ok_or_else(|| FetchError::missing_field(&url, field))?;
            person.set_scalar(field, value);
        }

        let homeworld = single_url(&raw, &url, ReferenceField::Homeworld)?;
        let films = url_list(&raw, &url, ReferenceField::Films)?;
        let species = url_list(&raw, &url, ReferenceField::Species)?;
        let vehicles = url_list(&raw, &url, ReferenceField::Vehicles)?;
        let starships = url_list(&raw, &url, ReferenceField::Starships)?;

        let resolved = tokio::try_join!(
            self.resolver.resolve_homeworld(homeworld),
            self.resolver.resolve_names_joined(&films, Label::EpisodeTitle),
            self.resolver.resolve_names_joined(&species, Label::Name),
            self.resolver.resolve_names_joined(&vehicles, Label::Name),
            self.resolver.resolve_names_joined(&starships, Label::Name),
        )?;

        let (homeworld, films, species, vehicles, starships) = resolved;
        for (field, value) in ReferenceField::ALL
            .into_iter()
            .zip([homeworld, films, species, vehicles, starships])
        {
            person.set_reference(field, value);
        }

        info!(id, name = %person.name, "{:>2} - {} got", id, person.name);
        Ok(Some(person))
    }
}

fn single_url<'a>(raw: &'a Value, url: &str, field: ReferenceField) -> FetchResult<&'a str> {
    raw.get(field.key())
        .and_then(Value::as_str)
        .ok_or_else(|| FetchError::missing_field(url, field.key()))
}

fn url_list<'a>(raw: &'a Value, url: &str, field: ReferenceField) -> FetchResult<Vec<&'a str>> {
    raw.get(field.key())
        .and_then(Value::as_array)
        .and_then(|items| items.iter().map(Value::as_str).collect::<Option<Vec<_>>>())
        .ok_or_else(|| FetchError::missing_field(url, field.key()))
}
