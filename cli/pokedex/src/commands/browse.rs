use anyhow::{Context, Result};
use bpaf::Bpaf;
use indoc::indoc;
use pokeapi_client::types::ItemRef;
use pokedex_sdk::models::aggregate::LoadStrategy;
use pokedex_sdk::models::browser::Browser;
use pokedex_sdk::models::query::{FilterCommand, SearchDebounce, SortKey};
use pokedex_sdk::models::session::{SessionCommand, ViewMode};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, instrument};

use super::Pokedex;
use super::list::load;
use super::show::find_item;
use crate::utils::message;
use crate::utils::render::{render_detail, render_listing};

const BROWSE_HELP: &str = indoc! {"
    Commands:
      n, next            next page
      p, prev            previous page
      page N             go to page N
      search QUERY, /Q   search by name, empty to clear
      type TYPE          toggle a type filter
      sort KEY           id-asc, id-desc, name-asc or name-desc
      clear              reset search, types and sort
      all, paged         load the whole catalog or one page at a time
      grid, list, toggle change the layout
      show ID|NAME       show details of a Pokémon
      help               show this help
      q, quit            leave"
};

// Browse the catalog interactively
#[derive(Debug, Bpaf, Clone)]
pub struct Browse {
    /// Start with the whole catalog loaded
    #[bpaf(long, short('a'))]
    pub all: bool,
}

impl Browse {
    #[instrument(name = "browse", skip_all)]
    pub async fn handle(self, pokedex: Pokedex) -> Result<()> {
        let mut browser = pokedex.browser(pokedex.session(None));
        if self.all {
            browser.dispatch(SessionCommand::SetLoadStrategy(LoadStrategy::Full));
        }
        let mut debounce = SearchDebounce::new(pokedex.config.pokedex.search_debounce());

        message::plain(BROWSE_HELP);
        let stdin = BufReader::new(tokio::io::stdin());
        run(&pokedex, &mut browser, stdin, &mut debounce).await
    }
}

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BrowseInput {
    Session(SessionCommand),
    /// Search edits are debounced before they reach the session.
    Search(String),
    ToggleView,
    Show(ItemRef),
    Help,
    Quit,
}

fn parse_input(line: &str) -> Result<Option<BrowseInput>, String> {
    let line = line.trim();
    if let Some(query) = line.strip_prefix('/') {
        return Ok(Some(BrowseInput::Search(query.trim().to_string())));
    }

    let (command, argument) = match line.split_once(char::is_whitespace) {
        Some((command, argument)) => (command, argument.trim()),
        None => (line, ""),
    };

    let input = match (command, argument) {
        ("", _) => return Ok(None),
        ("n" | "next", "") => BrowseInput::Session(SessionCommand::NextPage),
        ("p" | "prev", "") => BrowseInput::Session(SessionCommand::PrevPage),
        ("page", page) => {
            let page = page
                .parse()
                .map_err(|_| format!("'{page}' is not a page number"))?;
            BrowseInput::Session(SessionCommand::GoToPage(page))
        },
        ("search", query) => BrowseInput::Search(query.to_string()),
        ("type", "") => return Err("expected a type, e.g. 'type fire'".to_string()),
        ("type", type_name) => BrowseInput::Session(SessionCommand::Filter(
            FilterCommand::ToggleType(type_name.to_lowercase()),
        )),
        ("sort", key) => {
            let key = key.parse::<SortKey>().map_err(|err| err.to_string())?;
            BrowseInput::Session(SessionCommand::Filter(FilterCommand::SetSortKey(key)))
        },
        ("clear", "") => BrowseInput::Session(SessionCommand::Filter(FilterCommand::Clear)),
        ("all", "") => BrowseInput::Session(SessionCommand::SetLoadStrategy(LoadStrategy::Full)),
        ("paged", "") => {
            BrowseInput::Session(SessionCommand::SetLoadStrategy(LoadStrategy::Paginated))
        },
        ("grid", "") => BrowseInput::Session(SessionCommand::SetViewMode(ViewMode::Grid)),
        ("list", "") => BrowseInput::Session(SessionCommand::SetViewMode(ViewMode::List)),
        ("toggle", "") => BrowseInput::ToggleView,
        ("show", item) => BrowseInput::Show(item.parse().map_err(|err| format!("{err}"))?),
        ("help" | "?", "") => BrowseInput::Help,
        ("q" | "quit" | "exit", "") => BrowseInput::Quit,
        _ => return Err(format!("unknown command '{line}', type 'help' for a list")),
    };
    Ok(Some(input))
}

/// Read commands from `input` until it ends or the user quits.
///
/// A search that is still pending when the input ends is applied before
/// returning.
async fn run(
    pokedex: &Pokedex,
    browser: &mut Browser,
    input: impl AsyncBufRead + Unpin,
    debounce: &mut SearchDebounce,
) -> Result<()> {
    let mut lines = input.lines();
    load(browser, false).await;
    render(browser);

    loop {
        tokio::select! {
            Some(query) = debounce.settled(), if debounce.remaining().is_some() => {
                apply(pokedex, browser, SessionCommand::Filter(FilterCommand::SetSearchQuery(query))).await;
            },
            line = lines.next_line() => {
                let Some(line) = line.context("could not read input")? else {
                    break;
                };
                match parse_input(&line) {
                    Ok(None) => {},
                    Ok(Some(BrowseInput::Quit)) => return Ok(()),
                    Ok(Some(BrowseInput::Help)) => message::plain(BROWSE_HELP),
                    Ok(Some(BrowseInput::Search(query))) => debounce.push(query),
                    Ok(Some(BrowseInput::ToggleView)) => {
                        let mode = browser.session().view_mode().toggled();
                        apply(pokedex, browser, SessionCommand::SetViewMode(mode)).await;
                    },
                    Ok(Some(BrowseInput::Session(command))) => {
                        apply(pokedex, browser, command).await;
                    },
                    Ok(Some(BrowseInput::Show(item))) => match find_item(pokedex, &item).await {
                        Ok(detail) => println!("{}", render_detail(&detail)),
                        Err(err) => message::error(err),
                    },
                    Err(err) => message::error(err),
                }
            },
        }
    }

    if let Some(query) = debounce.settled().await {
        apply(pokedex, browser, SessionCommand::Filter(FilterCommand::SetSearchQuery(query))).await;
    }
    Ok(())
}

async fn apply(pokedex: &Pokedex, browser: &mut Browser, command: SessionCommand) {
    let update = browser.dispatch(command);
    debug!(?update, "applied browse command");
    if !update.changed {
        return;
    }
    if update.view_mode_changed {
        pokedex.view_modes.persist(browser.session().view_mode());
    }
    if update.window_changed {
        load(browser, false).await;
    }
    render(browser);
}

fn render(browser: &Browser) {
    let view = browser.view();
    println!("{}", render_listing(&view, browser.session().view_mode()));
    debug!(filters = ?browser.session().filters(), "rendered listing");
}
