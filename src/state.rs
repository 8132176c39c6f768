//! View state of the photos table.
//!
//! All transitions are plain methods so the table's behaviour can be tested
//! without a window. Methods that need the network return a [`FetchRequest`]
//! which the caller hands to the fetch worker.

use crate::api::{ApiError, PhotoQuery};
use crate::config::TableConfig;
use crate::models::Photo;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub seq: u64,
    pub query: PhotoQuery,
}

#[derive(Debug)]
pub struct FetchResponse {
    pub seq: u64,
    pub query: PhotoQuery,
    pub result: Result<Vec<Photo>, ApiError>,
}

/// What the table should draw right now.
#[derive(Debug, PartialEq)]
pub enum View<'a> {
    Loading,
    Empty {
        error: Option<&'a str>,
    },
    Table {
        rows: &'a [Photo],
        pagination: Pagination,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
}

impl Pagination {
    pub fn first_row(&self) -> usize {
        if self.is_past_end() {
            0
        } else {
            self.page * self.page_size + 1
        }
    }

    pub fn last_row(&self) -> usize {
        if self.is_past_end() {
            0
        } else {
            ((self.page + 1) * self.page_size).min(self.total)
        }
    }

    pub fn is_past_end(&self) -> bool {
        self.page * self.page_size >= self.total
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        (self.page + 1) * self.page_size < self.total
    }

    pub fn label(&self) -> String {
        format!("{}–{} of {}", self.first_row(), self.last_row(), self.total)
    }
}

pub struct TableState {
    photos: Vec<Photo>,
    loading: bool,
    page: usize,
    search_text: String,
    page_size: usize,
    browse_total: usize,
    next_seq: u64,
    latest_seq: Option<u64>,
    last_error: Option<String>,
}

impl TableState {
    pub fn new(config: &TableConfig) -> Self {
        Self {
            photos: Vec::new(),
            loading: true,
            page: 0,
            search_text: String::new(),
            page_size: config.page_size.max(1),
            browse_total: config.browse_total,
            next_seq: 0,
            latest_seq: None,
            last_error: None,
        }
    }

    #[cfg(test)]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn page(&self) -> usize {
        self.page
    }

    #[cfg(test)]
    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    fn is_searching(&self) -> bool {
        !self.search_text.is_empty()
    }

    fn begin_fetch(&mut self) -> FetchRequest {
        self.next_seq += 1;
        self.latest_seq = Some(self.next_seq);
        self.loading = true;
        FetchRequest {
            seq: self.next_seq,
            query: PhotoQuery::for_view(&self.search_text, self.page),
        }
    }

    pub fn mount(&mut self) -> FetchRequest {
        self.begin_fetch()
    }

    /// Apply a debounced search value. The page index is kept as is.
    pub fn set_search_text(&mut self, text: impl Into<String>) -> Option<FetchRequest> {
        let text = text.into();
        if text == self.search_text {
            return None;
        }
        self.search_text = text;
        Some(self.begin_fetch())
    }

    /// Move to another page. Only browsing needs the server; search results
    /// are already held in full and just get re-sliced.
    pub fn set_page(&mut self, page: usize) -> Option<FetchRequest> {
        if page == self.page {
            return None;
        }
        self.page = page;
        if self.is_searching() {
            None
        } else {
            Some(self.begin_fetch())
        }
    }

    pub fn delete(&mut self, id: i64) -> bool {
        let before = self.photos.len();
        self.photos.retain(|photo| photo.id != id);
        self.photos.len() != before
    }

    /// Apply a worker response. Only the most recently issued request may
    /// change the table; anything older is dropped.
    pub fn apply_response(&mut self, response: FetchResponse) -> bool {
        if Some(response.seq) != self.latest_seq {
            tracing::debug!(
                event = "photos.fetch.stale_response_dropped",
                seq = response.seq,
                latest = ?self.latest_seq,
                query = %response.query,
            );
            return false;
        }

        self.latest_seq = None;
        self.loading = false;
        match response.result {
            Ok(photos) => {
                tracing::info!(
                    event = "photos.fetch.completed",
                    seq = response.seq,
                    query = %response.query,
                    count = photos.len(),
                );
                self.photos = photos;
                self.last_error = None;
            }
            Err(err) => {
                tracing::warn!(
                    event = "photos.fetch.failed",
                    seq = response.seq,
                    query = %response.query,
                    error = %err,
                );
                self.photos.clear();
                self.last_error = Some(err.to_string());
            }
        }
        true
    }

    pub fn dispatch_failed(&mut self, seq: u64, reason: impl Into<String>) {
        if Some(seq) != self.latest_seq {
            return;
        }
        let reason = reason.into();
        tracing::error!(event = "photos.fetch.dispatch_failed", seq, reason = %reason);
        self.latest_seq = None;
        self.loading = false;
        self.photos.clear();
        self.last_error = Some(reason);
    }

    pub fn total(&self) -> usize {
        if self.is_searching() {
            self.photos.len()
        } else {
            self.browse_total
        }
    }

    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            page_size: self.page_size,
            total: self.total(),
        }
    }

    // While browsing the held list already is the page.
    pub fn visible_rows(&self) -> &[Photo] {
        let start = if self.is_searching() {
            self.page * self.page_size
        } else {
            0
        };
        let end = (self.page * self.page_size + self.page_size).min(self.photos.len());
        let start = start.min(end);
        &self.photos[start..end]
    }

    pub fn view(&self) -> View<'_> {
        if self.loading {
            View::Loading
        } else if self.photos.is_empty() {
            View::Empty {
                error: self.last_error.as_deref(),
            }
        } else {
            View::Table {
                rows: self.visible_rows(),
                pagination: self.pagination(),
            }
        }
    }
}
