//! Mapping between 1-based page numbers and item windows.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Page state over a collection of `total_items`.
///
/// There is always at least one page, an empty collection has one empty
/// page. Navigation outside `1..=total_pages` is rejected and leaves the
/// state unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationCoordinator {
    total_items: u64,
    page_size: u64,
    current_page: u64,
}

impl PaginationCoordinator {
    /// A coordinator on page 1. A zero page size is treated as 1.
    pub fn new(total_items: u64, page_size: u64) -> Self {
        Self {
            total_items,
            page_size: page_size.max(1),
            current_page: 1,
        }
    }

    pub fn total_items(&self) -> u64 {
        self.total_items
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn current_page(&self) -> u64 {
        self.current_page
    }

    pub fn total_pages(&self) -> u64 {
        self.total_items.div_ceil(self.page_size).max(1)
    }

    /// Offset of the first item on the current page.
    pub fn offset(&self) -> u64 {
        (self.current_page - 1) * self.page_size
    }

    /// Item indices of the current page.
    pub fn window(&self) -> Range<u64> {
        let offset = self.offset();
        offset..(offset + self.page_size).min(self.total_items).max(offset)
    }

    /// Move to `page`. Returns `false` without changing state if the page
    /// does not exist.
    pub fn go_to_page(&mut self, page: u64) -> bool {
        if page < 1 || page > self.total_pages() {
            return false;
        }
        self.current_page = page;
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.current_page + 1)
    }

    pub fn prev_page(&mut self) -> bool {
        self.go_to_page(self.current_page.saturating_sub(1))
    }

    pub fn has_next_page(&self) -> bool {
        self.current_page < self.total_pages()
    }

    pub fn has_prev_page(&self) -> bool {
        self.current_page > 1
    }

    /// Update the item count, moving back to page 1 when the current page
    /// no longer exists.
    pub fn set_total_items(&mut self, total_items: u64) {
        self.total_items = total_items;
        if self.current_page > self.total_pages() {
            self.current_page = 1;
        }
    }

    pub fn reset(&mut self) {
        self.current_page = 1;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn twenty_five_items_make_two_pages() {
        let mut pages = PaginationCoordinator::new(25, 20);
        assert_eq!(pages.total_pages(), 2);

        assert!(!pages.go_to_page(3));
        assert_eq!(pages.current_page(), 1);
        assert!(!pages.go_to_page(0));
        assert_eq!(pages.current_page(), 1);

        assert!(pages.go_to_page(2));
        assert_eq!(pages.offset(), 20);
        assert_eq!(pages.window(), 20..25);
    }

    #[test]
    fn empty_collection_has_one_empty_page() {
        let pages = PaginationCoordinator::new(0, 20);
        assert_eq!(pages.total_pages(), 1);
        assert_eq!(pages.window(), 0..0);
        assert!(!pages.has_next_page());
        assert!(!pages.has_prev_page());
    }

    #[test]
    fn next_and_prev_stop_at_bounds() {
        let mut pages = PaginationCoordinator::new(40, 20);

        assert!(!pages.prev_page());
        assert!(pages.next_page());
        assert_eq!(pages.current_page(), 2);
        assert!(!pages.next_page());
        assert_eq!(pages.current_page(), 2);
        assert!(pages.has_prev_page());
        assert!(pages.prev_page());
        assert_eq!(pages.current_page(), 1);
    }

    #[test]
    fn shrinking_total_resets_to_first_page() {
        let mut pages = PaginationCoordinator::new(100, 20);
        pages.go_to_page(5);

        pages.set_total_items(90);
        assert_eq!(pages.current_page(), 5);

        pages.set_total_items(30);
        assert_eq!(pages.current_page(), 1);
    }

    proptest! {
        #[test]
        fn window_stays_within_bounds(total in 0u64..5000, size in 1u64..100, page in 0u64..300) {
            let mut pages = PaginationCoordinator::new(total, size);
            let accepted = pages.go_to_page(page);

            prop_assert_eq!(accepted, page >= 1 && page <= pages.total_pages());
            let window = pages.window();
            prop_assert!(window.end <= total.max(window.start));
            prop_assert!(window.end - window.start <= size);
        }
    }
}
