//! Page-number pagination over SonarQube list endpoints
//!
//! Pure functions and state for walking `p`/`ps` paginated responses.
//! The shell owns the HTTP calls; this module decides which page comes next,
//! when to stop, and when the result set is too large to page through.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Page size sent as `ps` on every paginated request
pub const PAGE_SIZE: u32 = 500;

/// SonarQube refuses to page beyond this many results
pub const PAGINATION_WARNING_THRESHOLD: u64 = 10_000;

/// Query parameter carrying the 1-based page number
pub const PAGE_PARAM: &str = "p";

/// Query parameter carrying the page size
pub const PAGE_SIZE_PARAM: &str = "ps";

/// One fetched page: the items under the results key and the declared total
#[derive(Debug, Clone, PartialEq)]
pub struct PageEnvelope<T> {
    pub items: Vec<T>,
    /// `paging.total`, when the backend reported one
    pub total: Option<u64>,
}

/// Split a raw page body into its items and declared total.
///
/// A missing `results_key` is an empty page, not an error. Items that do not
/// match `T` are reported as a `serde_json::Error`.
pub fn parse_page<T: DeserializeOwned>(
    mut body: Value,
    results_key: &str,
) -> Result<PageEnvelope<T>, serde_json::Error> {
    let total = body
        .get("paging")
        .and_then(|paging| paging.get("total"))
        .and_then(Value::as_u64);

    let items = match body.get_mut(results_key).map(Value::take) {
        Some(Value::Null) | None => Vec::new(),
        Some(raw) => serde_json::from_value(raw)?,
    };

    Ok(PageEnvelope { items, total })
}

/// Merge the page controls into caller-supplied query parameters
///
/// The caller's parameters must not already carry `p` or `ps`.
pub fn page_params<'a>(params: &[(&'a str, String)], page: u32) -> Vec<(&'a str, String)> {
    let mut merged = params.to_vec();
    merged.push((PAGE_SIZE_PARAM, PAGE_SIZE.to_string()));
    merged.push((PAGE_PARAM, page.to_string()));
    merged
}

/// Advisory raised once per paginated fetch when the declared total is too large
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationWarning {
    pub total: u64,
}

impl std::fmt::Display for PaginationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Result set exceeds {} items (total={}). SonarQube caps pagination at 10 000, \
             some results may be missing. Consider filtering by severity or type to reduce \
             the result set.",
            PAGINATION_WARNING_THRESHOLD, self.total
        )
    }
}

/// What the fetch loop should do after recording a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStep {
    /// Request this page number next
    Next(u32),
    /// Every item has been fetched, or the backend ran dry
    Done,
}

/// Outcome of recording a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageProgress {
    pub step: PageStep,
    pub warning: Option<PaginationWarning>,
}

/// Running state of one paginated fetch
///
/// The stop condition is `fetched >= total || page was empty`. `total` is read
/// fresh from every page and is not checked for consistency between pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    page: u32,
    fetched: u64,
    warned: bool,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl PageCursor {
    pub fn new() -> Self {
        Self {
            page: 1,
            fetched: 0,
            warned: false,
        }
    }

    /// Page number of the next request
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Number of items accumulated so far
    pub fn fetched(&self) -> u64 {
        self.fetched
    }

    /// Record a page of `items` results declaring `total`
    ///
    /// A page without a declared total is treated as if the total were the
    /// number of items fetched so far, which ends the fetch.
    pub fn record(&mut self, items: usize, total: Option<u64>) -> PageProgress {
        self.fetched += items as u64;
        let total = total.unwrap_or(self.fetched);

        let warning = if total > PAGINATION_WARNING_THRESHOLD && !self.warned {
            self.warned = true;
            Some(PaginationWarning { total })
        } else {
            None
        };

        let step = if self.fetched >= total || items == 0 {
            PageStep::Done
        } else {
            self.page += 1;
            PageStep::Next(self.page)
        };

        PageProgress { step, warning }
    }
}
