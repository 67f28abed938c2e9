//! Error handling for catalog API operations.

use std::fmt::Display;

use reqwest::StatusCode;
use thiserror::Error;

/// The kind of catalog entity a request was addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Item,
    Species,
    EvolutionChain,
    ItemList,
    TypeList,
}

impl Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Resource::Item => "pokemon",
            Resource::Species => "pokemon species",
            Resource::EvolutionChain => "evolution chain",
            Resource::ItemList => "pokemon list",
            Resource::TypeList => "type list",
        };
        f.write_str(name)
    }
}

/// Common error type for catalog API operations.
///
/// `NotFound` is the 404 equivalent and is kept apart from every other
/// failure so that consumers can render a dedicated "not found" state.
#[derive(Debug, Error)]
pub enum CatalogClientError {
    #[error("{resource} '{key}' does not exist")]
    NotFound { resource: Resource, key: String },

    #[error("invalid catalog reference: '{0}'")]
    InvalidReference(String),

    #[error("request for {resource} failed")]
    Transport {
        resource: Resource,
        #[source]
        source: reqwest::Error,
    },

    #[error("catalog responded with {status} for {resource}")]
    UnexpectedStatus {
        resource: Resource,
        status: StatusCode,
    },

    #[error("unexpected response shape for {resource}")]
    MalformedResponse {
        resource: Resource,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Other(String),
}

impl CatalogClientError {
    /// True for the 404 equivalent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogClientError::NotFound { .. })
    }

    /// True for failures that count as an upstream error, i.e. anything
    /// other than a missing entity or a bad reference.
    pub fn is_upstream(&self) -> bool {
        !matches!(
            self,
            CatalogClientError::NotFound { .. } | CatalogClientError::InvalidReference(_)
        )
    }

    /// Whether a failed request may be attempted again.
    ///
    /// Missing entities and bad references are deterministic, so retrying
    /// them cannot succeed.
    pub(crate) fn is_retryable(&self) -> bool {
        self.is_upstream()
    }
}
