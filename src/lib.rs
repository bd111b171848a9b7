//! # SWAPI People Loader Library
//!
//! Pulls every person from the Star Wars API collection, resolves the nested
//! resource links each person carries (homeworld, films, species, vehicles and
//! starships) into readable labels, and hands the flattened record to a store.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use swapi_people_loader::fetcher::client::{build_http_client, HttpSettings};
//! use swapi_people_loader::fetcher::http::HttpJsonClient;
//! use swapi_people_loader::fetcher::retry::RetryPolicy;
//! use swapi_people_loader::harvester::{BatchDriver, HarvestConfig};
//! use swapi_people_loader::people::PeopleEndpoint;
//! use swapi_people_loader::store::{memory::MemoryStore, PeopleStore, StorageSetup};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = HttpSettings::default();
//! let client = HttpJsonClient::new(build_http_client(&settings)?, RetryPolicy::default());
//!
//! let store = Arc::new(MemoryStore::new());
//! store.prepare(StorageSetup::fresh()).await?;
//!
//! let endpoint = PeopleEndpoint::new("https://swapi.dev/api/people/");
//! let driver = BatchDriver::new(Arc::new(client), endpoint, store.clone(), HarvestConfig::default());
//! let processed = driver.run_all().await?;
//! println!("{processed} people loaded");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`fetcher`] - JSON retrieval with bounded retry ([`fetcher::JsonSource`])
//! - [`people`] - Reference resolution and record assembly
//! - [`harvester`] - Windowed enumeration of the ID space
//! - [`store`] - Persistence collaborators (SQLite, CSV, in-memory)
//! - [`cli`] - Command line bootstrap

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};

/// CLI command implementations
pub mod cli;

/// JSON fetching with retry
pub mod fetcher;

/// Windowed batch driver
pub mod harvester;

/// Observability metrics
pub mod metrics;

/// Reference resolution and record assembly
pub mod people;

/// Graceful shutdown coordination
pub mod shutdown;

/// Persistence collaborators
pub mod store;

/// Identifier handed back by a store after a successful save
pub type RecordId = u32;

/// Scalar fields copied verbatim from the raw record
pub const SCALAR_FIELDS: [&str; 8] = [
    "birth_year",
    "eye_color",
    "gender",
    "hair_color",
    "height",
    "mass",
    "name",
    "skin_color",
];

/// Column order of a persisted person
pub const PERSON_COLUMNS: [&str; 14] = [
    "id",
    "birth_year",
    "eye_color",
    "films",
    "gender",
    "hair_color",
    "height",
    "homeworld",
    "mass",
    "name",
    "skin_color",
    "species",
    "starships",
    "vehicles",
];

/// Fields of a raw record that point at other resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceField {
    /// Single planet URL
    Homeworld,
    /// List of film URLs, labelled "Episode N: Title"
    Films,
    /// List of species URLs
    Species,
    /// List of vehicle URLs
    Vehicles,
    /// List of starship URLs
    Starships,
}

impl ReferenceField {
    /// Every reference field, in resolution order
    pub const ALL: [ReferenceField; 5] = [
        ReferenceField::Homeworld,
        ReferenceField::Films,
        ReferenceField::Species,
        ReferenceField::Vehicles,
        ReferenceField::Starships,
    ];

    /// JSON key of the field in the raw record
    pub fn key(&self) -> &'static str {
        match self {
            ReferenceField::Homeworld => "homeworld",
            ReferenceField::Films => "films",
            ReferenceField::Species => "species",
            ReferenceField::Vehicles => "vehicles",
            ReferenceField::Starships => "starships",
        }
    }

    /// Whether the field holds a list of URLs rather than a single one
    pub fn is_list(&self) -> bool {
        !matches!(self, ReferenceField::Homeworld)
    }
}

impl std::fmt::Display for ReferenceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A fully resolved, flattened person ready for persistence
///
/// Only ever built once every reference field has been resolved.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Person {
    /// Numeric ID in the remote collection
    pub id: u32,
    /// Birth year, e.g. "19BBY"
    pub birth_year: String,
    /// Eye color
    pub eye_color: String,
    /// Comma-joined film labels
    pub films: String,
    /// Gender
    pub gender: String,
    /// Hair color
    pub hair_color: String,
    /// Height in centimeters, as published
    pub height: String,
    /// Homeworld name
    pub homeworld: String,
    /// Mass in kilograms, as published
    pub mass: String,
    /// Display name
    pub name: String,
    /// Skin color
    pub skin_color: String,
    /// Comma-joined species names
    pub species: String,
    /// Comma-joined starship names
    pub starships: String,
    /// Comma-joined vehicle names
    pub vehicles: String,
}

impl Person {
    /// Value of a column by name, following [`PERSON_COLUMNS`]
    pub fn column(&self, name: &str) -> Option<String> {
        let value = match name {
            "id" => return Some(self.id.to_string()),
            "birth_year" => &self.birth_year,
            "eye_color" => &self.eye_color,
            "films" => &self.films,
            "gender" => &self.gender,
            "hair_color" => &self.hair_color,
            "height" => &self.height,
            "homeworld" => &self.homeworld,
            "mass" => &self.mass,
            "name" => &self.name,
            "skin_color" => &self.skin_color,
            "species" => &self.species,
            "starships" => &self.starships,
            "vehicles" => &self.vehicles,
            _ => return None,
        };
        Some(value.clone())
    }

    /// Store a resolved reference label into its field
    pub(crate) fn set_reference(&mut self, field: ReferenceField, value: String) {
        match field {
            ReferenceField::Homeworld => self.homeworld = value,
            ReferenceField::Films => self.films = value,
            ReferenceField::Species => self.species = value,
            ReferenceField::Vehicles => self.vehicles = value,
            ReferenceField::Starships => self.starships = value,
        }
    }

    /// Store a scalar passthrough value into its field
    pub(crate) fn set_scalar(&mut self, field: &str, value: String) {
        match field {
            "birth_year" => self.birth_year = value,
            "eye_color" => self.eye_color = value,
            "gender" => self.gender = value,
            "hair_color" => self.hair_color = value,
            "height" => self.height = value,
            "mass" => self.mass = value,
            "name" => self.name = value,
            "skin_color" => self.skin_color = value,
            other => debug_assert!(false, "unknown scalar field {other}"),
        }
    }
}
