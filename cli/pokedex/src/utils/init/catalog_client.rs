use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, bail};
use pokeapi_client::{
    CatalogClient,
    CatalogClientConfig,
    Client,
    DEFAULT_CATALOG_URL,
    MockClient,
    POKEDEX_CATALOG_MOCK_DATA_VAR,
};
use tracing::debug;

use crate::config::Config;

/// Initialize the catalog client
///
/// - Initialize a mock client if `_POKEDEX_USE_CATALOG_MOCK` points at a mock data file
/// - Initialize a real client otherwise
pub fn init_catalog_client(config: &Config) -> Result<Client, anyhow::Error> {
    if let Ok(path_str) = std::env::var(POKEDEX_CATALOG_MOCK_DATA_VAR) {
        let path = PathBuf::from(path_str);
        if !path.exists() {
            bail!("path to mock data file doesn't exist: {}", path.display());
        }

        debug!(mock_data_path = ?path, "using mock catalog client");
        return Ok(MockClient::new(Some(path))?.into());
    }

    let mut extra_headers = BTreeMap::new();
    // Pass in a bool if we are running in CI, so requests can reflect this in the headers
    if std::env::var("CI").is_ok() {
        extra_headers.insert("pokedex-ci".to_string(), "true".to_string());
    }

    let catalog_url = config
        .pokedex
        .catalog_url
        .clone()
        .unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string());

    debug!(%catalog_url, "using catalog client");
    let client = CatalogClient::new(CatalogClientConfig {
        catalog_url,
        extra_headers,
        user_agent: Some(format!("pokedex/{}", env!("CARGO_PKG_VERSION"))),
    })
    .context("could not create catalog client")?;
    Ok(client.into())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pokeapi_client::ClientTrait;
    use tempfile::NamedTempFile;

    use super::*;

    #[tokio::test]
    async fn mock_client_from_env() {
        let mut mock_data = NamedTempFile::new().unwrap();
        mock_data.write_all(br#"{ "types": [ { "name": "fire" } ] }"#).unwrap();

        let client = temp_env::with_var(POKEDEX_CATALOG_MOCK_DATA_VAR, Some(mock_data.path()), || {
            init_catalog_client(&Config::default()).unwrap()
        });

        assert!(matches!(client, Client::Mock(_)));
        assert_eq!(client.list_types().await.unwrap().len(), 1);
    }

    #[test]
    fn missing_mock_data_is_an_error() {
        temp_env::with_var(
            POKEDEX_CATALOG_MOCK_DATA_VAR,
            Some("/does/not/exist.json"),
            || assert!(init_catalog_client(&Config::default()).is_err()),
        );
    }

    #[test]
    fn real_client_uses_configured_url() {
        let mut config = Config::default();
        config.pokedex.catalog_url = Some("http://localhost:1234/api".to_string());

        let client = temp_env::with_var_unset(POKEDEX_CATALOG_MOCK_DATA_VAR, || {
            init_catalog_client(&config).unwrap()
        });

        let Client::Catalog(client) = client else {
            panic!("expected a real catalog client");
        };
        assert_eq!(client.catalog_url(), "http://localhost:1234/api");
    }
}
