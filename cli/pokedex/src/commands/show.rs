use anyhow::{Context, Result, anyhow, bail};
use bpaf::Bpaf;
use pokeapi_client::types::{CatalogItemDetail, ItemRef};
use pokedex_sdk::models::browser::DetailLookup;
use pokedex_sdk::models::evolution::EvolutionData;
use tracing::{debug, instrument};

use super::Pokedex;
use crate::utils::errors::{display_chain, format_fetch_error};
use crate::utils::render::{render_detail, render_evolution};

// Show details about a single Pokémon
#[derive(Debug, Bpaf, Clone)]
pub struct Show {
    /// Print the details as JSON
    #[bpaf(long)]
    pub json: bool,

    /// National dex number or name of the Pokémon, e.g. '25' or 'pikachu'
    #[bpaf(positional("ID|NAME"))]
    pub item: ItemRef,
}

impl Show {
    #[instrument(name = "show", skip_all, fields(item = %self.item))]
    pub async fn handle(self, pokedex: Pokedex) -> Result<()> {
        let item = find_item(&pokedex, &self.item).await?;

        if self.json {
            let json =
                serde_json::to_string_pretty(&*item).context("could not serialize Pokémon")?;
            println!("{json}");
            return Ok(());
        }

        println!("{}", render_detail(&item));
        println!();
        println!("Evolution");
        println!("{}", render_evolution(&evolution_or_unavailable(&pokedex, &item).await));
        Ok(())
    }
}

/// Look up an item, failing with a dedicated message if it does not exist.
pub(crate) async fn find_item(
    pokedex: &Pokedex,
    item: &ItemRef,
) -> Result<std::sync::Arc<CatalogItemDetail>> {
    let browser = pokedex.browser(pokedex.session(None));
    match browser.lookup(item).await {
        DetailLookup::Found(detail) => Ok(detail),
        DetailLookup::NotFound(item) => bail!("no Pokémon matched '{item}'"),
        DetailLookup::Failed(err) => Err(anyhow!(format_fetch_error(&err))),
    }
}

/// Evolution data is supplementary, failures only hide it.
async fn evolution_or_unavailable(pokedex: &Pokedex, item: &CatalogItemDetail) -> EvolutionData {
    let browser = pokedex.browser(pokedex.session(None));
    match browser.evolution(item).await {
        Ok(data) => data,
        Err(err) => {
            debug!(err = display_chain(&err), "failed to resolve evolution chain");
            EvolutionData::Unavailable
        },
    }
}

#[cfg(test)]
mod tests {
    use pokeapi_client::MockCatalog;
    use pokedex_sdk::test_helpers::{item, typed_item};

    use super::*;
    use crate::commands::test_helpers::mock_pokedex;

    #[tokio::test]
    async fn finds_items_by_id_and_name() {
        let (pokedex, _mock, _data_dir) = mock_pokedex(MockCatalog {
            items: vec![typed_item(25, "pikachu", &["electric"])],
            ..Default::default()
        });

        let by_id = find_item(&pokedex, &ItemRef::Id(25)).await.unwrap();
        let by_name = find_item(&pokedex, &"Pikachu".parse().unwrap()).await.unwrap();
        assert_eq!(by_id, by_name);
    }

    #[tokio::test]
    async fn not_found_has_a_dedicated_message() {
        let (pokedex, _mock, _data_dir) = mock_pokedex(MockCatalog::default());

        let err = find_item(&pokedex, &ItemRef::Name("missingno".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no Pokémon matched 'missingno'");
    }

    #[tokio::test]
    async fn upstream_failure_is_not_reported_as_not_found() {
        let (pokedex, mock, _data_dir) = mock_pokedex(MockCatalog {
            items: vec![item(1, "bulbasaur")],
            ..Default::default()
        });
        mock.fail_item(1);

        let err = find_item(&pokedex, &ItemRef::Id(1)).await.unwrap_err();
        assert!(!err.to_string().contains("no Pokémon matched"));
        assert!(err.to_string().contains("try again later"));
    }

    #[tokio::test]
    async fn missing_evolution_data_is_unavailable() {
        let (pokedex, _mock, _data_dir) = mock_pokedex(MockCatalog {
            items: vec![item(1, "bulbasaur")],
            ..Default::default()
        });
        let detail = find_item(&pokedex, &ItemRef::Id(1)).await.unwrap();

        assert_eq!(
            evolution_or_unavailable(&pokedex, &detail).await,
            EvolutionData::Unavailable
        );
    }
}
