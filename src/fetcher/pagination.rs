//! Page-index pagination
//!
//! ClickUp pages are addressed by a zero-based index. [`PaginationHelper`]
//! drives a page fetcher until the server signals exhaustion:
//! - an empty page
//! - an explicit `last_page: true` marker
//! - a short page, only when the response carries no marker and the page size is known
//!
//! Includes a maximum iteration limit against servers that never terminate.

use crate::fetcher::{FetcherError, FetcherResult};
use std::future::Future;
use tracing::debug;

/// Maximum number of pages fetched for one collection
pub const MAX_ITERATIONS: u32 = 10_000;

/// One page of a paginated collection
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items of this page
    pub items: Vec<T>,
    /// Explicit last-page marker, when the endpoint sends one
    pub last_page: Option<bool>,
}

impl<T> Page<T> {
    /// Page carrying an explicit marker
    pub fn new(items: Vec<T>, last_page: bool) -> Self {
        Self {
            items,
            last_page: Some(last_page),
        }
    }

    /// Page without a marker
    pub fn unmarked(items: Vec<T>) -> Self {
        Self {
            items,
            last_page: None,
        }
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::unmarked(Vec::new())
    }
}

/// Pagination driver
pub struct PaginationHelper;

impl PaginationHelper {
    /// Fetch pages 0, 1, 2, ... and concatenate their items
    ///
    /// # Arguments
    /// * `label` - Collection name for logs (e.g. the list id)
    /// * `page_size` - Expected full page size, enables the short-page stop for unmarked responses
    /// * `fetch_page` - Async function fetching one page by index
    ///
    /// # Errors
    /// Propagates the first fetch error; fails when [`MAX_ITERATIONS`] pages were fetched
    /// without a termination signal
    pub async fn paginate<T, F, Fut>(
        label: &str,
        page_size: Option<usize>,
        mut fetch_page: F,
    ) -> FetcherResult<Vec<T>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = FetcherResult<Page<T>>>,
    {
        let mut all_items = Vec::new();
        let mut page_index = 0;

        loop {
            if page_index >= MAX_ITERATIONS {
                return Err(FetcherError::invalid_response(format!(
                    "max iterations ({MAX_ITERATIONS}) exceeded while paginating {label}"
                )));
            }

            let page = fetch_page(page_index).await?;
            let count = page.items.len();

            if count == 0 {
                debug!(
                    label = label,
                    page = page_index,
                    total = all_items.len(),
                    "Empty page, pagination complete"
                );
                break;
            }

            all_items.extend(page.items);

            let exhausted = match page.last_page {
                Some(last_page) => last_page,
                None => page_size.is_some_and(|size| count < size),
            };

            if exhausted {
                debug!(
                    label = label,
                    page = page_index,
                    total = all_items.len(),
                    "Last page reached"
                );
                break;
            }

            page_index += 1;
        }

        Ok(all_items)
    }
}
