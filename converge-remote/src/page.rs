//! Pagination collector.
//!
//! Walks a paged listing to completion starting at [`FIRST_PAGE`] and
//! concatenates items in server order. A failed page discards everything
//! accumulated so far; the caller never sees a partial collection.

use crate::error::RemoteError;

/// Page number requested first.
pub const FIRST_PAGE: u32 = 1;

/// One page of a listing, with the server's pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub total_pages: u32,
    pub next_page: Option<u32>,
}

impl<T> Page<T> {
    /// A page that is also the last one.
    pub fn single(items: Vec<T>) -> Self {
        Self {
            items,
            current_page: FIRST_PAGE,
            total_pages: FIRST_PAGE,
            next_page: None,
        }
    }

    pub fn is_last(&self) -> bool {
        self.current_page >= self.total_pages
    }
}

/// Collect every item of a paged listing.
///
/// `fetch` receives the page number to request. Stops once
/// `current_page >= total_pages`. A page that claims more pages remain but
/// whose `next_page` does not move forward is rejected as
/// [`RemoteError::MalformedPage`].
pub fn collect_all<T, F>(mut fetch: F) -> Result<Vec<T>, RemoteError>
where
    F: FnMut(u32) -> Result<Page<T>, RemoteError>,
{
    let mut items = Vec::new();
    let mut page_number = FIRST_PAGE;
    loop {
        let page = fetch(page_number)?;
        tracing::debug!(
            "page {}/{} returned {} item(s)",
            page.current_page,
            page.total_pages,
            page.items.len()
        );
        let done = page.is_last();
        let next = page.next_page;
        items.extend(page.items);
        if done {
            return Ok(items);
        }
        match next {
            Some(n) if n > page_number => page_number = n,
            Some(n) => {
                return Err(RemoteError::MalformedPage {
                    page: page_number,
                    reason: format!("next page {n} does not advance"),
                })
            }
            None => {
                return Err(RemoteError::MalformedPage {
                    page: page_number,
                    reason: "more pages reported but no next page given".to_owned(),
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
