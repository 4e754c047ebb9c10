use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Pagination request. Pages are numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Pageable {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub size: u64,
    /// Ordering clause, e.g. `"created_at desc, id"`.
    #[serde(default)]
    pub sort: Option<String>,
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    20
}

impl Default for Pageable {
    fn default() -> Self {
        Self {
            page: default_page(),
            size: default_page_size(),
            sort: None,
        }
    }
}

impl Pageable {
    pub fn new(page: u64, size: u64) -> Self {
        Self {
            page,
            size,
            sort: None,
        }
    }

    pub fn sorted(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn validate(&self) -> Result<(), DataError> {
        validate_page(self.page, self.size)
    }

    /// Rows skipped before this page. Fails when the request is invalid or
    /// the offset does not fit in a `u64`.
    pub fn offset(&self) -> Result<u64, DataError> {
        page_offset(self.page, self.size)
    }
}

pub(crate) fn validate_page(page: u64, size: u64) -> Result<(), DataError> {
    if page == 0 {
        return Err(DataError::configuration("page numbers start at 1"));
    }
    if size == 0 {
        return Err(DataError::configuration("page size must be at least 1"));
    }
    Ok(())
}

/// Validated `(page - 1) * size`.
pub(crate) fn page_offset(page: u64, size: u64) -> Result<u64, DataError> {
    validate_page(page, size)?;
    (page - 1).checked_mul(size).ok_or_else(|| {
        DataError::configuration(format!("page window overflows (page {page}, size {size})"))
    })
}

/// A page of results with pagination metadata.
///
/// `items` and `total` come from two independent statements and may
/// disagree under concurrent writes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: u64, page_size: u64, total: u64) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total.div_ceil(page_size)
        };
        Self {
            items,
            total,
            page,
            page_size,
            total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}
