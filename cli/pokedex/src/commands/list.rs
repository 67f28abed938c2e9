use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use bpaf::Bpaf;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use pokeapi_client::types::CatalogItemDetail;
use pokedex_sdk::models::aggregate::LoadStrategy;
use pokedex_sdk::models::browser::{Browser, ListingView};
use pokedex_sdk::models::query::{FilterCommand, SortKey};
use pokedex_sdk::models::session::{SessionCommand, ViewMode};
use tracing::{debug, instrument};

use super::Pokedex;
use crate::utils::errors::format_fetch_error;
use crate::utils::message;
use crate::utils::render::render_listing;

/// List Pokémon
#[derive(Debug, Bpaf, Clone)]
pub struct List {
    /// Page to show, starting at 1
    #[bpaf(long, short('p'), argument("N"))]
    pub page: Option<u64>,

    /// Load the whole catalog, then search, filter and paginate locally
    #[bpaf(long, short('a'))]
    pub all: bool,

    /// Only show Pokémon whose name contains QUERY
    #[bpaf(long, short('s'), argument("QUERY"))]
    pub search: Option<String>,

    /// Only show Pokémon of TYPE, may be repeated to match any of several types
    #[bpaf(long("type"), short('t'), argument("TYPE"))]
    pub types: Vec<String>,

    /// Order of the listing: id-asc, id-desc, name-asc or name-desc
    #[bpaf(long, argument("KEY"))]
    pub sort: Option<SortKey>,

    /// Layout of the listing: grid or list
    #[bpaf(long, argument("MODE"))]
    pub view: Option<ViewMode>,

    /// Print the listed items as JSON
    #[bpaf(long)]
    pub json: bool,
}

impl List {
    #[instrument(name = "list", skip_all)]
    pub async fn handle(self, pokedex: Pokedex) -> Result<()> {
        let json = self.json;
        let mut browser = self.browser(&pokedex);

        match self.page {
            Some(page) => select_page(&mut browser, page, json).await?,
            None => load(&mut browser, json).await,
        }

        let view = browser.view();
        if json {
            return print_json(&view);
        }
        println!("{}", render_listing(&view, browser.session().view_mode()));
        if let ListingView::Failed { message } = view {
            bail!("{message}");
        }
        Ok(())
    }

    /// A browser for the requested strategy and filters.
    fn browser(&self, pokedex: &Pokedex) -> Browser {
        let mut browser = pokedex.browser(pokedex.session(self.view));
        if self.all {
            browser.dispatch(SessionCommand::SetLoadStrategy(LoadStrategy::Full));
        }
        if let Some(query) = &self.search {
            browser.dispatch(SessionCommand::Filter(FilterCommand::SetSearchQuery(
                query.clone(),
            )));
        }
        if !self.types.is_empty() {
            browser.dispatch(SessionCommand::Filter(FilterCommand::SetSelectedTypes(
                self.types.iter().map(|name| name.to_lowercase()).collect(),
            )));
        }
        if let Some(sort_key) = self.sort {
            browser.dispatch(SessionCommand::Filter(FilterCommand::SetSortKey(sort_key)));
        }
        debug!(session = ?browser.session(), "prepared listing");
        browser
    }
}

/// Load `page` of the listing.
///
/// Remote pages are counted from the list endpoint alone, so only the
/// details of the requested page are fetched. Local pages depend on the
/// filtered result of a full load.
async fn select_page(browser: &mut Browser, page: u64, quiet: bool) -> Result<()> {
    match browser.session().load_strategy() {
        LoadStrategy::Paginated => {
            let page_size = browser.session().remote_pages().page_size();
            let first_page = browser
                .cache()
                .list_page(0, page_size)
                .await
                .map_err(|err| anyhow!(format_fetch_error(&err)))?;
            browser.dispatch(SessionCommand::SetRemoteTotal(first_page.total_count));
            go_to_page(browser, page)?;
            load(browser, quiet).await;
        },
        LoadStrategy::Full => {
            load(browser, quiet).await;
            go_to_page(browser, page)?;
        },
    }
    Ok(())
}

fn go_to_page(browser: &mut Browser, page: u64) -> Result<()> {
    browser.dispatch(SessionCommand::GoToPage(page));
    let total_pages = browser.session().pages().total_pages();
    if browser.session().pages().current_page() != page {
        bail!("page {page} is out of range, the listing has {total_pages} page(s)");
    }
    Ok(())
}

/// Load the current window, with a progress bar for full loads.
pub(crate) async fn load(browser: &mut Browser, quiet: bool) {
    let bar = if quiet || browser.session().load_strategy() != LoadStrategy::Full {
        ProgressBar::hidden()
    } else {
        progress_bar()
    };

    browser
        .refresh(|state| {
            bar.set_position(u64::from(state.progress_percent()));
            bar.set_message(format!(
                "{} of {} loaded",
                state.success_count() + state.error_count(),
                state.ids().len()
            ));
        })
        .await;
    bar.finish_and_clear();

    match browser.view() {
        ListingView::Ready { failed, .. } if failed > 0 && !quiet => {
            message::warning(format!(
                "{failed} Pokémon could not be loaded and are missing from the listing"
            ));
        },
        _ => {},
    }
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::stderr());
    let template = "{spinner} Loading Pokémon {bar:30} {pos:>3}% {msg} ({elapsed})";
    match ProgressStyle::with_template(template) {
        Ok(style) => bar.set_style(style),
        Err(err) => debug!(%err, "invalid progress template"),
    }
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn print_json(view: &ListingView) -> Result<()> {
    let items: Vec<&CatalogItemDetail> = match view {
        ListingView::Ready { items, .. } => items.iter().map(|item| &**item).collect(),
        ListingView::Empty { .. } => Vec::new(),
        ListingView::Failed { message } => bail!("{message}"),
        ListingView::Loading { .. } => bail!("listing did not finish loading"),
    };
    let json = serde_json::to_string_pretty(&items).context("could not serialize listing")?;
    println!("{json}");
    Ok(())
}
