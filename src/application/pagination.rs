//! Page-number pagination shared by every feed view.
//!
//! Out-of-range requests clamp instead of erroring: zero, negative or
//! unparseable page numbers resolve to the first page, anything past the end
//! resolves to the last page. An empty result set still has exactly one
//! (empty) page so templates always have something to render.

use serde::Deserialize;

/// Raw `?page=` query parameter before clamping.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    /// Parse the raw query value; anything non-numeric counts as "first page".
    pub fn requested(&self) -> Option<i64> {
        self.page.as_deref().and_then(|raw| raw.trim().parse().ok())
    }
}

/// Window coordinates for a single page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub limit: u64,
    pub offset: u64,
}

impl PageWindow {
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }
}

/// Fixed-size paginator over a known item count.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    page_size: u64,
}

impl Paginator {
    pub fn new(page_size: u64) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Number of pages for `total_items`: ceil(N / P), never zero.
    pub fn total_pages(&self, total_items: u64) -> u64 {
        total_items.div_ceil(self.page_size).max(1)
    }

    /// Clamp a requested page number and compute the fetch window.
    pub fn window(&self, requested: Option<i64>, total_items: u64) -> PageWindow {
        let total_pages = self.total_pages(total_items);
        let number = match requested {
            Some(value) if value > total_pages as i64 => total_pages,
            Some(value) if value >= 1 => value as u64,
            _ => 1,
        };

        PageWindow {
            number,
            total_pages,
            total_items,
            limit: self.page_size,
            offset: (number - 1) * self.page_size,
        }
    }
}

/// A materialized page plus the metadata pagination controls need.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub total_pages: u64,
    pub total_items: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow) -> Self {
        Self {
            items,
            number: window.number,
            total_pages: window.total_pages,
            total_items: window.total_items,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }
}
