//! Catalog state and the pure transitions over it.
//!
//! Every transition consumes the state and returns the next one; nothing
//! here touches the network, the cache or a terminal.

pub mod collate;
pub mod deeplink;
pub mod filter;
pub mod pagination;
pub mod view;

use std::collections::BTreeSet;

use rand::Rng;

use crate::record::BookRecord;

pub use deeplink::DeepLinkTarget;
pub use filter::{Query, SortMode};
pub use view::{BookCard, CatalogSummary, CatalogView};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// How many of the most recently loaded records are flagged as new.
pub const DEFAULT_RECENT_WINDOW: usize = 20;

#[derive(Clone, Debug)]
pub struct CatalogState {
    all: Vec<BookRecord>,
    filtered: Vec<BookRecord>,
    categories: BTreeSet<String>,
    query: Query,
    current_page: usize,
    page_size: usize,
    recent_window: usize,
}

impl Default for CatalogState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, DEFAULT_RECENT_WINDOW)
    }
}

impl CatalogState {
    pub fn new(page_size: usize, recent_window: usize) -> Self {
        Self {
            all: Vec::new(),
            filtered: Vec::new(),
            categories: BTreeSet::new(),
            query: Query::default(),
            current_page: 1,
            page_size: page_size.max(1),
            recent_window,
        }
    }

    /// Replaces the record set wholesale. The active query is re-applied and
    /// the cursor clamped, so a late reload can never leave it out of range.
    pub fn with_records(self, records: Vec<BookRecord>) -> Self {
        self.with_records_rng(records, &mut rand::thread_rng())
    }

    pub fn with_records_rng<R>(mut self, records: Vec<BookRecord>, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        self.categories = records
            .iter()
            .filter_map(|r| r.category.clone())
            .collect();
        self.all = records;
        self.filtered = filter::apply_with_rng(&self.all, &self.query, rng);
        self.current_page = pagination::clamp_page(self.current_page, self.total_pages());
        self
    }

    pub fn apply_query(self, query: Query) -> Self {
        self.apply_query_with_rng(query, &mut rand::thread_rng())
    }

    /// Sets the query and recomputes `filtered`. Always returns to page 1.
    pub fn apply_query_with_rng<R>(mut self, query: Query, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        self.filtered = filter::apply_with_rng(&self.all, &query, rng);
        self.query = query;
        self.current_page = 1;
        self
    }

    pub fn apply_filter(self, search: impl Into<String>, category: impl Into<String>) -> Self {
        let query = Query {
            search: search.into(),
            category: category.into(),
            sort: self.query.sort,
        };
        self.apply_query(query)
    }

    pub fn apply_sort(self, sort: SortMode) -> Self {
        self.apply_sort_with_rng(sort, &mut rand::thread_rng())
    }

    pub fn apply_sort_with_rng<R>(self, sort: SortMode, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let query = Query {
            sort,
            ..self.query.clone()
        };
        self.apply_query_with_rng(query, rng)
    }

    /// Moves to `page`; out-of-range requests leave the cursor where it is.
    pub fn go_to_page(mut self, page: usize) -> Self {
        if (1..=self.total_pages()).contains(&page) {
            self.current_page = page;
        }
        self
    }

    pub fn next_page(self) -> Self {
        let next = self.current_page + 1;
        self.go_to_page(next)
    }

    pub fn prev_page(self) -> Self {
        let prev = self.current_page.saturating_sub(1);
        self.go_to_page(prev)
    }

    pub fn all(&self) -> &[BookRecord] {
        &self.all
    }

    pub fn filtered(&self) -> &[BookRecord] {
        &self.filtered
    }

    pub fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn recent_window(&self) -> usize {
        self.recent_window
    }

    pub fn total_pages(&self) -> usize {
        pagination::total_pages(self.filtered.len(), self.page_size)
    }

    pub fn page(&self) -> &[BookRecord] {
        pagination::page_slice(&self.filtered, self.page_size, self.current_page)
    }

    pub fn summary(&self) -> CatalogSummary {
        CatalogSummary {
            total: self.all.len(),
            visible: self.filtered.len(),
            categories: self.categories.len(),
            current_page: self.current_page,
            total_pages: self.total_pages(),
        }
    }

    /// True for records among the last `recent_window` entries loaded.
    pub fn is_recent(&self, record: &BookRecord) -> bool {
        let threshold = self.all.len().saturating_sub(self.recent_window);
        record.entry_index().is_some_and(|i| i >= threshold)
    }

    pub fn locate(&self, slug: &str) -> Option<DeepLinkTarget> {
        deeplink::locate(&self.filtered, slug, self.page_size)
    }

    /// Jumps to the page holding `slug`, if it is visible under the current query.
    pub fn open(self, slug: &str) -> (Self, Option<DeepLinkTarget>) {
        match self.locate(slug) {
            Some(target) => (self.go_to_page(target.page), Some(target)),
            None => (self, None),
        }
    }

    pub fn find(&self, slug: &str) -> Option<&BookRecord> {
        self.all
            .iter()
            .find(|r| deeplink::slugify(&r.title) == slug)
    }

    pub fn view(&self) -> CatalogView {
        CatalogView::from_state(self)
    }
}
