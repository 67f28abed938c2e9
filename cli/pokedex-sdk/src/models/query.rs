//! Client-side search, type filter and sort over loaded items.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

use pokeapi_client::types::CatalogItemDetail;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

use super::pagination::PaginationCoordinator;

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    #[default]
    #[display("id-asc")]
    IdAsc,
    #[display("id-desc")]
    IdDesc,
    #[display("name-asc")]
    NameAsc,
    #[display("name-desc")]
    NameDesc,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::IdAsc,
        SortKey::IdDesc,
        SortKey::NameAsc,
        SortKey::NameDesc,
    ];
}

#[derive(Debug, Error)]
#[error("unknown sort key '{0}', expected one of: id-asc, id-desc, name-asc, name-desc")]
pub struct ParseSortKeyError(String);

impl FromStr for SortKey {
    type Err = ParseSortKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|key| key.to_string() == s)
            .ok_or_else(|| ParseSortKeyError(s.to_string()))
    }
}

/// What the user is looking for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub search_query: String,
    pub selected_type_names: BTreeSet<String>,
    pub sort_key: SortKey,
}

impl FilterCriteria {
    /// True when neither a search nor a type filter narrows the result.
    pub fn is_unfiltered(&self) -> bool {
        self.search_query.trim().is_empty() && self.selected_type_names.is_empty()
    }

    fn matches_search(&self, item: &CatalogItemDetail) -> bool {
        let query = self.search_query.trim().to_lowercase();
        query.is_empty() || item.name.to_lowercase().contains(&query)
    }

    fn matches_types(&self, item: &CatalogItemDetail) -> bool {
        self.selected_type_names.is_empty()
            || item
                .type_names()
                .any(|name| self.selected_type_names.contains(name))
    }

    /// Apply a command, returning whether the criteria changed.
    pub fn update(&mut self, command: FilterCommand) -> bool {
        let before = self.clone();
        match command {
            FilterCommand::SetSearchQuery(query) => self.search_query = query,
            FilterCommand::ToggleType(name) => {
                if !self.selected_type_names.remove(&name) {
                    self.selected_type_names.insert(name);
                }
            },
            FilterCommand::SetSelectedTypes(names) => self.selected_type_names = names,
            FilterCommand::SetSortKey(key) => self.sort_key = key,
            FilterCommand::Clear => *self = FilterCriteria::default(),
        }
        *self != before
    }
}

/// Edits to [`FilterCriteria`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterCommand {
    SetSearchQuery(String),
    ToggleType(String),
    SetSelectedTypes(BTreeSet<String>),
    SetSortKey(SortKey),
    Clear,
}

/// Compare names case-insensitively, falling back to a case-sensitive
/// comparison so that the order is total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Filter by search, then by type, then sort.
///
/// The sort is stable, items comparing equal keep their relative order.
pub fn apply<T>(items: &[T], criteria: &FilterCriteria) -> Vec<T>
where
    T: AsRef<CatalogItemDetail> + Clone,
{
    let mut result = items
        .iter()
        .filter(|item| criteria.matches_search(detail(*item)))
        .filter(|item| criteria.matches_types(detail(*item)))
        .cloned()
        .collect::<Vec<_>>();

    match criteria.sort_key {
        SortKey::IdAsc => result.sort_by_key(|item| detail(item).id),
        SortKey::IdDesc => result.sort_by(|a, b| detail(b).id.cmp(&detail(a).id)),
        SortKey::NameAsc => result.sort_by(|a, b| compare_names(&detail(a).name, &detail(b).name)),
        SortKey::NameDesc => result.sort_by(|a, b| compare_names(&detail(b).name, &detail(a).name)),
    }
    result
}

fn detail<T: AsRef<CatalogItemDetail>>(item: &T) -> &CatalogItemDetail {
    item.as_ref()
}

/// The slice of `items` on the current page of `pages`.
pub fn paginate<T: Clone>(items: &[T], pages: &PaginationCoordinator) -> Vec<T> {
    let window = pages.window();
    let start = (window.start as usize).min(items.len());
    let end = (window.end as usize).clamp(start, items.len());
    items[start..end].to_vec()
}

/// Coalesces search-query edits typed in quick succession.
///
/// Only the last query pushed is released, once `delay` has passed without
/// another edit.
#[derive(Debug, Clone)]
pub struct SearchDebounce {
    delay: Duration,
    pending: Option<(String, Instant)>,
}

impl SearchDebounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn push(&mut self, query: impl Into<String>) {
        self.pending = Some((query.into(), Instant::now()));
    }

    /// Time left until the pending query is released.
    pub fn remaining(&self) -> Option<Duration> {
        self.pending.as_ref().map(|(_, pushed_at)| {
            self.delay
                .saturating_sub(Instant::now().saturating_duration_since(*pushed_at))
        })
    }

    /// Take the pending query if it has settled.
    pub fn take_settled(&mut self) -> Option<String> {
        match self.remaining() {
            Some(remaining) if remaining.is_zero() => self.pending.take().map(|(query, _)| query),
            _ => None,
        }
    }

    /// Wait for the pending query to settle and take it.
    pub async fn settled(&mut self) -> Option<String> {
        let remaining = self.remaining()?;
        tokio::time::sleep(remaining).await;
        self.take_settled()
    }
}

impl Default for SearchDebounce {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DEBOUNCE)
    }
}
