//! Browsing session state and the commands that change it.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::aggregate::LoadStrategy;
use super::pagination::PaginationCoordinator;
use super::query::{FilterCommand, FilterCriteria};

/// How listings are laid out. The only state kept across sessions.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    #[display("grid")]
    Grid,
    #[display("list")]
    List,
}

impl ViewMode {
    /// The other mode.
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Grid => ViewMode::List,
            ViewMode::List => ViewMode::Grid,
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown view mode '{0}', expected 'grid' or 'list'")]
pub struct ParseViewModeError(String);

impl FromStr for ViewMode {
    type Err = ParseViewModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grid" => Ok(ViewMode::Grid),
            "list" => Ok(ViewMode::List),
            other => Err(ParseViewModeError(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown load strategy '{0}', expected 'paginated' or 'full'")]
pub struct ParseLoadStrategyError(String);

impl FromStr for LoadStrategy {
    type Err = ParseLoadStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paginated" => Ok(LoadStrategy::Paginated),
            "full" => Ok(LoadStrategy::Full),
            other => Err(ParseLoadStrategyError(other.to_string())),
        }
    }
}

/// Every change to a [`Session`] goes through one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Filter(FilterCommand),
    SetLoadStrategy(LoadStrategy),
    SetViewMode(ViewMode),
    /// Navigate the pages of the active strategy.
    GoToPage(u64),
    NextPage,
    PrevPage,
    /// Number of items in the remote catalog.
    SetRemoteTotal(u64),
    /// Number of items left after filtering a full load.
    SetLocalTotal(u64),
}

/// What a dispatched command changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionUpdate {
    pub changed: bool,
    /// The view mode changed and should be persisted.
    pub view_mode_changed: bool,
    /// The set of ids to load changed.
    pub window_changed: bool,
}

/// State of one browsing session.
///
/// Remote pages index the server-side list, used with
/// [`LoadStrategy::Paginated`]. Local pages index the filtered result of a
/// full load, used with [`LoadStrategy::Full`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    filters: FilterCriteria,
    load_strategy: LoadStrategy,
    view_mode: ViewMode,
    remote_pages: PaginationCoordinator,
    local_pages: PaginationCoordinator,
}

impl Session {
    pub fn new(page_size: u64, load_strategy: LoadStrategy, view_mode: ViewMode) -> Self {
        Self {
            filters: FilterCriteria::default(),
            load_strategy,
            view_mode,
            remote_pages: PaginationCoordinator::new(0, page_size),
            local_pages: PaginationCoordinator::new(0, page_size),
        }
    }

    pub fn filters(&self) -> &FilterCriteria {
        &self.filters
    }

    pub fn load_strategy(&self) -> LoadStrategy {
        self.load_strategy
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn remote_pages(&self) -> &PaginationCoordinator {
        &self.remote_pages
    }

    pub fn local_pages(&self) -> &PaginationCoordinator {
        &self.local_pages
    }

    /// Pages navigated by the active load strategy.
    pub fn pages(&self) -> &PaginationCoordinator {
        match self.load_strategy {
            LoadStrategy::Paginated => &self.remote_pages,
            LoadStrategy::Full => &self.local_pages,
        }
    }

    fn pages_mut(&mut self) -> &mut PaginationCoordinator {
        match self.load_strategy {
            LoadStrategy::Paginated => &mut self.remote_pages,
            LoadStrategy::Full => &mut self.local_pages,
        }
    }

    pub fn dispatch(&mut self, command: SessionCommand) -> SessionUpdate {
        debug!(?command, "session command");
        let paginated = self.load_strategy == LoadStrategy::Paginated;

        match command {
            SessionCommand::Filter(filter) => {
                let changed = self.filters.update(filter);
                if changed {
                    self.local_pages.reset();
                }
                SessionUpdate {
                    changed,
                    ..Default::default()
                }
            },
            SessionCommand::SetLoadStrategy(strategy) => {
                let changed = self.load_strategy != strategy;
                if changed {
                    self.load_strategy = strategy;
                    self.local_pages.reset();
                }
                SessionUpdate {
                    changed,
                    window_changed: changed,
                    ..Default::default()
                }
            },
            SessionCommand::SetViewMode(mode) => {
                let changed = self.view_mode != mode;
                self.view_mode = mode;
                SessionUpdate {
                    changed,
                    view_mode_changed: changed,
                    ..Default::default()
                }
            },
            SessionCommand::GoToPage(page) => {
                let changed =
                    self.pages().current_page() != page && self.pages_mut().go_to_page(page);
                page_update(changed, paginated)
            },
            SessionCommand::NextPage => {
                let changed = self.pages_mut().next_page();
                page_update(changed, paginated)
            },
            SessionCommand::PrevPage => {
                let changed = self.pages_mut().prev_page();
                page_update(changed, paginated)
            },
            SessionCommand::SetRemoteTotal(total) => {
                let page = self.remote_pages.current_page();
                let changed = self.remote_pages.total_items() != total;
                self.remote_pages.set_total_items(total);
                SessionUpdate {
                    changed,
                    window_changed: paginated && page != self.remote_pages.current_page(),
                    ..Default::default()
                }
            },
            SessionCommand::SetLocalTotal(total) => {
                let changed = self.local_pages.total_items() != total;
                self.local_pages.set_total_items(total);
                SessionUpdate {
                    changed,
                    ..Default::default()
                }
            },
        }
    }
}

fn page_update(changed: bool, paginated: bool) -> SessionUpdate {
    SessionUpdate {
        changed,
        window_changed: changed && paginated,
        ..Default::default()
    }
}
