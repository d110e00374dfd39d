//! Page cursor

/// Cursor over the pages of the loaded document
///
/// `current` is always in `[1, max(total, 1)]`; `total` is 0 until a
/// document has loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    current: usize,
    total: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::empty()
    }
}

impl Pagination {
    /// Cursor for a document with no pages known yet
    pub fn empty() -> Self {
        Self {
            current: 1,
            total: 0,
        }
    }

    /// Cursor at page 1 of a `total`-page document
    pub fn new(total: usize) -> Self {
        Self { current: 1, total }
    }

    /// Current page (1-indexed)
    pub fn current(&self) -> usize {
        self.current
    }

    /// Number of pages
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn can_go_previous(&self) -> bool {
        self.current > 1
    }

    pub fn can_go_next(&self) -> bool {
        self.current < self.total
    }

    /// Step back one page; stays at 1
    pub fn previous(&mut self) -> usize {
        self.current = self.current.saturating_sub(1).max(1);
        self.current
    }

    /// Step forward one page; stays at the last page
    pub fn next(&mut self) -> usize {
        if self.can_go_next() {
            self.current += 1;
        }
        self.current
    }

    /// Jump to a page, clamped to the document
    pub fn go_to(&mut self, page: usize) -> usize {
        self.current = page.clamp(1, self.total.max(1));
        self.current
    }
}
