//! Pure pagination state.
//!
//! A pager never looks at the items themselves, only their count. The
//! active page is 1-based and always re-clamped when the underlying list
//! changes, so a filter that shrinks the list can never leave the view on a
//! page that no longer exists.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    per_page: usize,
    active: usize,
}

impl Pager {
    pub fn new(per_page: usize) -> Self {
        Pager {
            per_page: per_page.max(1),
            active: 1,
        }
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    pub fn active(&self) -> usize {
        self.active
    }

    /// `ceil(items / per_page)`; zero for an empty list.
    pub fn page_count(&self, items: usize) -> usize {
        items.div_ceil(self.per_page)
    }

    /// Whether page controls are worth rendering at all.
    pub fn has_multiple_pages(&self, items: usize) -> bool {
        items > self.per_page
    }

    /// Half-open index window of the active page.
    pub fn window(&self, items: usize) -> Range<usize> {
        let start = self.per_page * (self.active - 1);
        let end = (self.per_page * self.active).min(items);
        start.min(end)..end
    }

    /// Active page forced back into `[1, max(1, page_count)]`. Applied on
    /// every list or filter change.
    pub fn clamped(self, items: usize) -> Self {
        let last = self.page_count(items).max(1);
        Pager {
            active: self.active.clamp(1, last),
            ..self
        }
    }

    /// Page selection. Clicking the already-active page is a no-op.
    pub fn clicked(self, page: usize, items: usize) -> Self {
        if page == self.active {
            return self;
        }
        Pager {
            active: page.max(1),
            ..self
        }
        .clamped(items)
    }

    /// Placeholder rows that keep a short page (any page past the first)
    /// the same height as a full one.
    pub fn placeholder_rows(&self, items: usize) -> usize {
        if self.active <= 1 {
            return 0;
        }
        (self.per_page * self.active).saturating_sub(items)
    }
}
