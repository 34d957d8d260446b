use serde::Serialize;

use super::deeplink::slugify;
use super::pagination::PageControls;
use super::CatalogState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    pub total: usize,
    pub visible: usize,
    pub categories: usize,
    pub current_page: usize,
    pub total_pages: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BookCard {
    pub slug: String,
    pub title: String,
    pub author: String,
    pub category: Option<String>,
    pub link: String,
    pub cover_url: String,
    pub recent: bool,
}

/// Everything a presentation layer needs to draw one page of the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CatalogView {
    pub summary: CatalogSummary,
    pub controls: PageControls,
    pub categories: Vec<String>,
    pub cards: Vec<BookCard>,
    pub empty: bool,
}

impl CatalogView {
    pub fn from_state(state: &CatalogState) -> Self {
        let cards = state
            .page()
            .iter()
            .map(|record| BookCard {
                slug: slugify(&record.title),
                title: record.title.clone(),
                author: record.author.clone(),
                category: record.category.clone(),
                link: record.link.clone(),
                cover_url: record.cover_url.clone(),
                recent: state.is_recent(record),
            })
            .collect();
        Self {
            summary: state.summary(),
            controls: PageControls::new(
                state.filtered().len(),
                state.page_size(),
                state.current_page(),
            ),
            categories: state.categories().iter().cloned().collect(),
            cards,
            empty: state.filtered().is_empty(),
        }
    }
}
