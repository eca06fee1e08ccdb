use serde::{Deserialize, Serialize};

use crate::query::MAX_ROW_BOUND;

pub const DEFAULT_PAGE_SIZE: u64 = 20;
/// Upper bound on the page size, whatever the caller asks for.
pub const MAX_PAGE_SIZE: u64 = 1000;

/// Pagination parameters (1-based page number), extractable from query
/// params.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: i64,
    #[serde(default, alias = "size")]
    pub page_size: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE as i64,
        }
    }
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self { page, page_size }
    }

    /// Page number, at least 1.
    pub fn page(&self) -> u64 {
        if self.page <= 0 {
            1
        } else {
            self.page as u64
        }
    }

    /// Page size: [`DEFAULT_PAGE_SIZE`] when non-positive, capped at
    /// [`MAX_PAGE_SIZE`].
    pub fn page_size(&self) -> u64 {
        if self.page_size <= 0 {
            DEFAULT_PAGE_SIZE
        } else {
            (self.page_size as u64).min(MAX_PAGE_SIZE)
        }
    }

    /// Rows to skip, at most [`MAX_ROW_BOUND`].
    pub fn offset(&self) -> u64 {
        (self.page() - 1)
            .saturating_mul(self.page_size())
            .min(MAX_ROW_BOUND)
    }
}

/// A page of results with pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    /// Matching rows across all pages.
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub has_next: bool,
}

impl<T> PageResult<T> {
    pub fn new(items: Vec<T>, request: &PageRequest, total: u64) -> Self {
        let page = request.page();
        let page_size = request.page_size();
        Self {
            items,
            total,
            page,
            page_size,
            has_next: page.saturating_mul(page_size) < total,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            0
        } else {
            self.total.div_ceil(self.page_size)
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            has_next: self.has_next,
        }
    }
}
