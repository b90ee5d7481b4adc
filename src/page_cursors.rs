//! Jump-to-page cursor windows
//!
//! Numbered pagination UIs render "1 … 3 4 5 … 10" on top of a cursor based
//! connection. [`PageCursors`] carries the cursors those links need.

use async_graphql::SimpleObject;
use serde::Deserialize;

use crate::cursor::PageCursorCodec;
use crate::pagination::Pagination;

/// How many pages surround the current one, and whether the first/last page
/// may repeat inside `around`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PageWindowPolicy {
    /// Pages on each side of the current page
    pub radius: usize,

    /// Leave page 1 and the final page out of `around`, they are already
    /// exposed as `first` and `last`
    pub dedupe_boundaries: bool,
}

impl Default for PageWindowPolicy {
    fn default() -> Self {
        Self {
            radius: 1,
            dedupe_boundaries: true,
        }
    }
}

/// A numbered page and the cursor that addresses its first item
#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    pub page: usize,
    pub cursor: String,
    pub is_current: bool,
}

impl PageCursor {
    fn new(page: usize, current_page: usize, size: usize) -> Self {
        Self {
            page,
            cursor: PageCursorCodec::encode((page - 1).saturating_mul(size)),
            is_current: page == current_page,
        }
    }
}

/// Page cursor window
#[derive(SimpleObject, Debug, Clone, PartialEq, Eq, Default)]
pub struct PageCursors {
    pub first: Option<PageCursor>,
    pub last: Option<PageCursor>,
    pub around: Vec<PageCursor>,
    pub previous: Option<PageCursor>,
}

impl PageCursors {
    /// Compute the window for the given page and total item count
    pub fn compute(pagination: &Pagination, total_count: usize, policy: &PageWindowPolicy) -> Self {
        let size = pagination.size;
        let current = pagination.page;
        let total_pages = total_count.div_ceil(size);

        let (first, last) = if total_pages > 0 {
            (
                Some(PageCursor::new(1, current, size)),
                Some(PageCursor::new(total_pages, current, size)),
            )
        } else {
            (None, None)
        };

        let start = current.saturating_sub(policy.radius).max(1);
        let end = current.saturating_add(policy.radius).min(total_pages);
        let around = (start..=end)
            .filter(|&page| !policy.dedupe_boundaries || (page != 1 && page != total_pages))
            .map(|page| PageCursor::new(page, current, size))
            .collect();

        let previous = (current > 1).then(|| PageCursor::new(current - 1, current, size));

        Self {
            first,
            last,
            around,
            previous,
        }
    }

    /// Every entry flagged as the current page
    pub fn current(&self) -> impl Iterator<Item = &PageCursor> {
        self.first
            .iter()
            .chain(self.last.iter())
            .chain(self.around.iter())
            .filter(|cursor| cursor.is_current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(cursors: &[PageCursor]) -> Vec<usize> {
        cursors.iter().map(|c| c.page).collect()
    }

    fn window(page: usize, size: usize, total_count: usize) -> PageCursors {
        let pagination = Pagination::from_page(page, size);
        PageCursors::compute(&pagination, total_count, &PageWindowPolicy::default())
    }

    #[test]
    fn test_window_around_current_page() {
        let cursors = window(4, 10, 100);
        assert_eq!(pages(&cursors.around), vec![3, 4, 5]);
        assert_eq!(cursors.first.as_ref().unwrap().page, 1);
        assert_eq!(cursors.last.as_ref().unwrap().page, 10);
        assert_eq!(cursors.previous.as_ref().unwrap().page, 3);
        assert_eq!(pages(&cursors.current().cloned().collect::<Vec<_>>()), vec![4]);
    }

    #[test]
    fn test_current_page_on_first_boundary() {
        let cursors = window(1, 10, 100);
        assert_eq!(pages(&cursors.around), vec![2]);
        assert!(cursors.first.as_ref().unwrap().is_current);
        assert!(cursors.previous.is_none());
        assert_eq!(cursors.current().count(), 1);
    }

    #[test]
    fn test_current_page_on_last_boundary() {
        let cursors = window(10, 10, 100);
        assert_eq!(pages(&cursors.around), vec![9]);
        assert!(cursors.last.as_ref().unwrap().is_current);
        assert_eq!(cursors.current().count(), 1);
    }

    #[test]
    fn test_empty_sequence_has_no_boundaries() {
        let cursors = window(1, 10, 0);
        assert!(cursors.first.is_none());
        assert!(cursors.last.is_none());
        assert!(cursors.around.is_empty());
        assert!(cursors.previous.is_none());
    }

    #[test]
    fn test_single_page() {
        let cursors = window(1, 10, 7);
        assert_eq!(cursors.first, cursors.last);
        assert!(cursors.around.is_empty());
        assert!(cursors.first.unwrap().is_current);
    }

    #[test]
    fn test_page_beyond_the_end() {
        let cursors = window(12, 10, 100);
        assert!(cursors.around.is_empty());
        assert_eq!(cursors.current().count(), 0);
        assert_eq!(cursors.previous.unwrap().page, 11);
    }

    #[test]
    fn test_page_cursor_addresses_first_item_of_page() {
        let cursors = window(4, 10, 100);
        let third = &cursors.around[0];
        assert_eq!(PageCursorCodec::decode(&third.cursor).unwrap(), 20);
        assert_eq!(PageCursorCodec::decode(&cursors.first.unwrap().cursor).unwrap(), 0);
    }

    #[test]
    fn test_wider_window_without_dedupe() {
        let policy = PageWindowPolicy {
            radius: 2,
            dedupe_boundaries: false,
        };
        let cursors = PageCursors::compute(&Pagination::from_page(2, 5), 50, &policy);
        assert_eq!(pages(&cursors.around), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_window_is_idempotent() {
        assert_eq!(window(6, 3, 40), window(6, 3, 40));
    }
}
