use anyhow::{Context, Result, anyhow};
use bpaf::Bpaf;
use itertools::Itertools;
use pokeapi_client::types::TypeSummary;
use tracing::instrument;

use super::Pokedex;
use crate::utils::errors::format_fetch_error;
use crate::utils::render::type_badge;

// List all Pokémon types
#[derive(Debug, Bpaf, Clone)]
pub struct Types {
    /// Print the types as JSON
    #[bpaf(long)]
    pub json: bool,
}

impl Types {
    #[instrument(name = "types", skip_all)]
    pub async fn handle(self, pokedex: Pokedex) -> Result<()> {
        let types = sorted_types(&pokedex).await?;
        if self.json {
            let json = serde_json::to_string_pretty(&types).context("could not serialize types")?;
            println!("{json}");
        } else {
            println!("{}", types.iter().map(|t| type_badge(&t.name)).join("\n"));
        }
        Ok(())
    }
}

/// Types offered as filters, ordered by name.
async fn sorted_types(pokedex: &Pokedex) -> Result<Vec<TypeSummary>> {
    let types = pokedex
        .cache
        .types()
        .await
        .map_err(|err| anyhow!(format_fetch_error(&err)))?;
    Ok(types
        .iter()
        .cloned()
        .sorted_by(|a, b| a.name.cmp(&b.name))
        .collect())
}

#[cfg(test)]
mod tests {
    use pokeapi_client::{MockCatalog, MockRequest};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::commands::test_helpers::mock_pokedex;

    #[tokio::test]
    async fn types_are_sorted_and_cached() {
        let (pokedex, mock, _data_dir) = mock_pokedex(MockCatalog {
            types: ["water", "fire", "grass"]
                .map(|name| TypeSummary {
                    name: name.to_string(),
                })
                .to_vec(),
            ..Default::default()
        });

        let first = sorted_types(&pokedex).await.unwrap();
        let second = sorted_types(&pokedex).await.unwrap();

        let names = first.iter().map(|t| t.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["fire", "grass", "water"]);
        assert_eq!(first, second);
        assert_eq!(mock.count(&MockRequest::Types), 1);
    }
}
