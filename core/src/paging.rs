//! Offset pagination.

use serde::{Deserialize, Serialize};

/// A page request: zero-based page index and page size.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl PageRequest {
    /// Page size used when none is given.
    pub const DEFAULT_SIZE: u32 = 20;
    /// Largest page size accepted.
    pub const MAX_SIZE: u32 = 100;

    /// Creates a page request, clamping `size` into `1..=MAX_SIZE`.
    #[must_use]
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size: size.clamp(1, Self::MAX_SIZE),
        }
    }

    /// Zero-based page index
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Page size
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Number of rows to skip
    #[must_use]
    #[allow(clippy::cast_lossless)] // `u64::from` is not const
    pub const fn offset(&self) -> u64 {
        self.page as u64 * self.size as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_SIZE)
    }
}

/// One page of results.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Zero-based page index
    pub page: u32,
    /// Requested page size
    pub size: u32,
    /// Number of matching items across all pages
    pub total_elements: u64,
    /// Number of pages
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// Wraps one page of `items` out of `total_elements` matches.
    #[must_use]
    pub fn new(items: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        Self {
            items,
            page: request.page(),
            size: request.size(),
            total_elements,
            total_pages: total_elements.div_ceil(u64::from(request.size())),
        }
    }

    /// Slices an already-filtered, already-sorted list into a page.
    #[must_use]
    pub fn paginate(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as u64;
        let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let items = all
            .into_iter()
            .skip(offset)
            .take(request.size() as usize)
            .collect();
        Self::new(items, request, total)
    }

    /// Maps every item, keeping the paging metadata.
    #[must_use]
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}
