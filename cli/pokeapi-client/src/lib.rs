//! Typed HTTP client for the PokeAPI catalog.
//!
//! This crate provides:
//! - HTTP client construction with configurable headers and user agent
//! - The [`ClientTrait`] interface shared by the real and the mock client
//! - A common error taxonomy that separates "not found" from other failures
//! - Domain types converted from the raw API payloads
//!
//! ## Usage
//!
//! ```ignore
//! use pokeapi_client::{CatalogClient, CatalogClientConfig, ClientTrait};
//!
//! let config = CatalogClientConfig {
//!     catalog_url: "https://pokeapi.co/api/v2".to_string(),
//!     extra_headers: BTreeMap::new(),
//!     user_agent: None,
//! };
//!
//! let client = CatalogClient::new(config)?;
//! let pikachu = client.get_item_by_name("Pikachu").await?;
//! ```

mod client;
mod config;
mod error;
mod mock;
pub mod types;

pub use client::{CatalogClient, Client, ClientTrait};
pub use config::{CatalogClientConfig, DEFAULT_CATALOG_URL};
pub use error::{CatalogClientError, Resource};
pub use mock::{MockCatalog, MockClient, MockDataError, MockRequest, POKEDEX_CATALOG_MOCK_DATA_VAR};
pub use reqwest::StatusCode;
pub use types::parse_reference_id;
