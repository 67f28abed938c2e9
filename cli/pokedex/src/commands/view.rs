use anyhow::{Context, Result};
use bpaf::Bpaf;
use pokedex_sdk::models::session::ViewMode;
use tracing::instrument;

use super::Pokedex;
use crate::utils::message;

// Show or set the layout used for listings
#[derive(Debug, Bpaf, Clone)]
pub struct View {
    /// Switch to the other layout
    #[bpaf(long)]
    pub toggle: bool,

    /// Layout to use from now on: grid or list
    #[bpaf(positional("MODE"))]
    pub mode: Option<ViewMode>,
}

impl View {
    #[instrument(name = "view", skip_all)]
    pub fn handle(self, pokedex: Pokedex) -> Result<()> {
        let current = pokedex.view_modes.load();
        let mode = match (self.mode, self.toggle) {
            (Some(mode), _) => mode,
            (None, true) => current.toggled(),
            (None, false) => {
                message::plain(format!("Listings are shown as a {current}"));
                return Ok(());
            },
        };

        if mode == current {
            message::plain(format!("Listings are already shown as a {mode}"));
            return Ok(());
        }

        pokedex
            .view_modes
            .save(mode)
            .with_context(|| format!("could not store view mode in {:?}", pokedex.view_modes.path()))?;
        message::updated(format!("Listings are now shown as a {mode}"));
        Ok(())
    }
}
