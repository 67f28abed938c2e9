mod browse;
mod evolution;
mod list;
mod show;
mod types;
mod view;

use std::fmt;

use anyhow::{Result, anyhow};
use bpaf::{Bpaf, ParseFailure, Parser};
use indoc::{formatdoc, indoc};
use pokedex_sdk::models::browser::Browser;
use pokedex_sdk::models::session::{Session, ViewMode};
use pokedex_sdk::providers::cache::CatalogCache;
use pokedex_sdk::providers::view_mode::ViewModeStore;
use tracing::debug;

use crate::config::Config;
use crate::utils::init::init_catalog_client;
use crate::utils::message;

static POKEDEX_DESCRIPTION: &'_ str = indoc! {"
    Browse the Pokémon catalog from your terminal.

    Listings are loaded one page at a time, or all at once with 'list --all'
    to search, filter and sort across the whole catalog."
};

fn vec_len<T>(x: Vec<T>) -> usize {
    Vec::len(&x)
}

#[derive(Bpaf, Clone, Copy, Debug)]
pub enum Verbosity {
    Verbose(
        /// Increase logging verbosity
        ///
        /// Invoke multiple times for increasing detail.
        #[bpaf(short('v'), long("verbose"), req_flag(()), many, map(vec_len))]
        usize,
    ),

    /// Silence logs except for errors
    #[bpaf(short, long)]
    Quiet,
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Verbose(0)
    }
}

#[derive(Bpaf)]
#[bpaf(options, descr(POKEDEX_DESCRIPTION))]
pub struct PokedexCli(#[bpaf(external(pokedex_args))] pub PokedexArgs);

/// Main pokedex args parser
///
/// To parse the pokedex CLI, use [`PokedexCli`] instead using [`pokedex_cli()`].
#[derive(Debug, Bpaf)]
#[bpaf(ignore_rustdoc)]
pub struct PokedexArgs {
    /// Verbose mode
    ///
    /// Invoke multiple times for increasing detail.
    #[bpaf(external, fallback(Default::default()))]
    pub verbosity: Verbosity,

    #[bpaf(external(commands), optional)]
    command: Option<Commands>,
}

impl fmt::Debug for Commands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command")
    }
}

/// Everything a command needs to talk to the catalog.
#[derive(Debug)]
pub struct Pokedex {
    pub config: Config,
    pub cache: CatalogCache,
    pub view_modes: ViewModeStore,
}

impl Pokedex {
    /// A browser over the shared cache.
    pub fn browser(&self, session: Session) -> Browser {
        Browser::new(
            self.cache.clone(),
            session,
            self.config.pokedex.catalog_size,
        )
    }

    /// A fresh session using the stored view mode unless `view_mode` is given.
    pub fn session(&self, view_mode: Option<ViewMode>) -> Session {
        let view_mode = view_mode.unwrap_or_else(|| self.view_modes.load());
        Session::new(
            self.config.pokedex.page_size,
            self.config.pokedex.load_strategy,
            view_mode,
        )
    }
}

impl PokedexArgs {
    pub async fn handle(self, config: Config) -> Result<()> {
        let Some(command) = self.command else {
            print_welcome_message();
            return Ok(());
        };

        tokio::fs::create_dir_all(&config.pokedex.data_dir).await?;

        let cache = CatalogCache::new(init_catalog_client(&config)?);
        let view_modes = ViewModeStore::new(&config.pokedex.data_dir);
        debug!(view_mode_file = ?view_modes.path(), "initialized catalog");

        let pokedex = Pokedex {
            config,
            cache,
            view_modes,
        };

        let signal_handler = async {
            let _ = tokio::signal::ctrl_c().await;
        };

        let cli_worker = async move {
            match command {
                Commands::Help(args) => {
                    args.handle();
                    Ok(())
                },
                Commands::List(args) => args.handle(pokedex).await,
                Commands::Show(args) => args.handle(pokedex).await,
                Commands::Evolution(args) => args.handle(pokedex).await,
                Commands::Types(args) => args.handle(pokedex).await,
                Commands::View(args) => args.handle(pokedex),
                Commands::Browse(args) => args.handle(pokedex).await,
            }
        };

        // Catalog futures are not `Send`, so the command runs on a local set
        tokio::task::LocalSet::new()
            .run_until(async {
                tokio::select! {
                    _ = signal_handler => Err(anyhow!("user interrupted process")),
                    result = tokio::task::spawn_local(cli_worker) => result?,
                }
            })
            .await
    }
}

fn print_welcome_message() {
    message::plain(formatdoc! {"
        pokedex version {version}

        Usage: pokedex OPTIONS (list|show|evolution|types|view|browse) [--help]

        Use 'pokedex --help' for full list of commands and more information
        ", version = env!("CARGO_PKG_VERSION")
    });
}

#[derive(Bpaf, Clone)]
enum Commands {
    /// Prints help information
    #[bpaf(command, hide)]
    Help(#[bpaf(external(help))] Help),

    /// List Pokémon, one page at a time or the whole catalog
    #[bpaf(command, short('l'))]
    List(#[bpaf(external(list::list))] list::List),

    /// Show details about a single Pokémon
    #[bpaf(command)]
    Show(#[bpaf(external(show::show))] show::Show),

    /// Show the evolution chain of a Pokémon
    #[bpaf(command, long("evolutions"))]
    Evolution(#[bpaf(external(evolution::evolution))] evolution::Evolution),

    /// List all Pokémon types
    #[bpaf(command)]
    Types(#[bpaf(external(types::types))] types::Types),

    /// Show or set the layout used for listings
    #[bpaf(command)]
    View(#[bpaf(external(view::view))] view::View),

    /// Browse the catalog interactively
    #[bpaf(command)]
    Browse(#[bpaf(external(browse::browse))] browse::Browse),
}

#[derive(Debug, Bpaf, Clone)]
struct Help {
    /// Command to show help for
    #[bpaf(positional("cmd"))]
    cmd: Option<String>,
}

/// Force `--help` output for `pokedex` with a given command
pub fn display_help(cmd: Option<String>) {
    let mut args = Vec::from_iter(cmd.as_deref());
    args.push("--help");

    match pokedex_cli().run_inner(&*args) {
        Ok(_) => unreachable!(),
        Err(ParseFailure::Completion(comp)) => print!("{comp:80}"),
        Err(ParseFailure::Stdout(doc, _)) => message::plain(format!("{doc:80}")),
        Err(ParseFailure::Stderr(err)) => message::error(err),
    }
}

impl Help {
    fn handle(self) {
        display_help(self.cmd);
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use pokeapi_client::{Client, MockCatalog, MockClient};
    use pokedex_sdk::providers::cache::CatalogCache;
    use pokedex_sdk::providers::view_mode::ViewModeStore;
    use tempfile::TempDir;

    use super::Pokedex;
    use crate::config::{Config, DEFAULT_PAGE_SIZE};

    /// A [Pokedex] backed by a mock catalog and a temporary data dir.
    pub fn mock_pokedex(catalog: MockCatalog) -> (Pokedex, MockClient, TempDir) {
        let data_dir = tempfile::tempdir().unwrap();
        let mock = MockClient::from_catalog(catalog);

        let mut config = Config::default();
        config.pokedex.data_dir = data_dir.path().to_path_buf();
        config.pokedex.page_size = DEFAULT_PAGE_SIZE;
        config.pokedex.catalog_size = 1010;
        config.pokedex.search_debounce_ms = 300;

        let pokedex = Pokedex {
            config,
            cache: CatalogCache::new(Client::Mock(mock.clone())),
            view_modes: ViewModeStore::new(data_dir.path()),
        };
        (pokedex, mock, data_dir)
    }
}

#[cfg(test)]
mod tests {
    use bpaf::Args;

    use super::*;

    #[test]
    fn parses_verbosity_and_command() {
        let PokedexCli(args) = pokedex_cli()
            .run_inner(Args::from(&["-vv", "show", "pikachu"]))
            .unwrap();

        assert!(matches!(args.verbosity, Verbosity::Verbose(2)));
        assert!(matches!(args.command, Some(Commands::Show(_))));
    }

    #[test]
    fn no_command_is_allowed() {
        let PokedexCli(args) = pokedex_cli().run_inner(Args::from(&[] as &[&str])).unwrap();
        assert!(args.command.is_none());
    }
}
