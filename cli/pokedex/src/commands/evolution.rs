use anyhow::{Context, Result};
use bpaf::Bpaf;
use pokeapi_client::types::ItemRef;
use tracing::instrument;

use super::Pokedex;
use super::show::find_item;
use crate::utils::render::render_evolution;

// Show the evolution chain of a Pokémon
#[derive(Debug, Bpaf, Clone)]
pub struct Evolution {
    /// National dex number or name of the Pokémon
    #[bpaf(positional("ID|NAME"))]
    pub item: ItemRef,
}

impl Evolution {
    #[instrument(name = "evolution", skip_all, fields(item = %self.item))]
    pub async fn handle(self, pokedex: Pokedex) -> Result<()> {
        println!("{}", self.render(&pokedex).await?);
        Ok(())
    }

    async fn render(&self, pokedex: &Pokedex) -> Result<String> {
        let item = find_item(pokedex, &self.item).await?;
        let data = pokedex
            .browser(pokedex.session(None))
            .evolution(&item)
            .await
            .with_context(|| format!("could not load the evolution chain of '{}'", item.name))?;
        Ok(render_evolution(&data))
    }
}
