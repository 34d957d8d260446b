use std::cmp::Ordering;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use super::collate::{self, Strength};
use crate::record::BookRecord;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    #[default]
    Recent,
    TitleAsc,
    TitleDesc,
    AuthorAsc,
    Category,
    Random,
}

impl SortMode {
    pub const ALL: [SortMode; 6] = [
        Self::Recent,
        Self::TitleAsc,
        Self::TitleDesc,
        Self::AuthorAsc,
        Self::Category,
        Self::Random,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "recent" | "recentes" => Some(Self::Recent),
            "title-asc" | "titulo-az" => Some(Self::TitleAsc),
            "title-desc" | "titulo-za" => Some(Self::TitleDesc),
            "author-asc" | "autor-az" => Some(Self::AuthorAsc),
            "category" | "categoria" => Some(Self::Category),
            "random" | "aleatoria" => Some(Self::Random),
            _ => None,
        }
    }

    /// Unknown names fall back to `Recent`.
    pub fn parse_or_default(value: &str) -> Self {
        Self::parse(value).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recent => "recent",
            Self::TitleAsc => "title-asc",
            Self::TitleDesc => "title-desc",
            Self::AuthorAsc => "author-asc",
            Self::Category => "category",
            Self::Random => "random",
        }
    }
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-selected filter and sort parameters. Empty strings disable a filter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Query {
    pub search: String,
    pub category: String,
    pub sort: SortMode,
}

impl Query {
    pub fn new(search: impl Into<String>, category: impl Into<String>, sort: SortMode) -> Self {
        Self {
            search: search.into(),
            category: category.into(),
            sort,
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        self.search.is_empty() && self.category.is_empty()
    }
}

pub fn matches(record: &BookRecord, search_lower: &str, category: &str) -> bool {
    let matches_search = search_lower.is_empty()
        || record.title.to_lowercase().contains(search_lower)
        || record.author.to_lowercase().contains(search_lower);
    let matches_category = category.is_empty() || record.category.as_deref() == Some(category);
    matches_search && matches_category
}

pub fn filter(all: &[BookRecord], search: &str, category: &str) -> Vec<BookRecord> {
    let search_lower = search.to_lowercase();
    all.iter()
        .filter(|r| matches(r, &search_lower, category))
        .cloned()
        .collect()
}

fn compare_recent(a: &BookRecord, b: &BookRecord) -> Ordering {
    match (a.entry_index(), b.entry_index()) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_category(a: &BookRecord, b: &BookRecord) -> Ordering {
    collate::compare(a.category_or_empty(), b.category_or_empty(), Strength::Variant)
        .then_with(|| collate::compare(&a.title, &b.title, Strength::Variant))
}

/// Returns a sorted copy of `records`. Every mode except `Random` is a
/// stable sort, so re-sorting sorted output leaves it unchanged.
pub fn sort<R>(records: &[BookRecord], mode: SortMode, rng: &mut R) -> Vec<BookRecord>
where
    R: Rng + ?Sized,
{
    let mut sorted = records.to_vec();
    match mode {
        SortMode::Recent => sorted.sort_by(compare_recent),
        SortMode::TitleAsc => {
            sorted.sort_by(|a, b| collate::compare(&a.title, &b.title, Strength::Base))
        }
        SortMode::TitleDesc => {
            sorted.sort_by(|a, b| collate::compare(&b.title, &a.title, Strength::Base))
        }
        SortMode::AuthorAsc => {
            sorted.sort_by(|a, b| collate::compare(&a.author, &b.author, Strength::Base))
        }
        SortMode::Category => sorted.sort_by(compare_category),
        SortMode::Random => sorted.shuffle(rng),
    }
    sorted
}

pub fn apply_with_rng<R>(all: &[BookRecord], query: &Query, rng: &mut R) -> Vec<BookRecord>
where
    R: Rng + ?Sized,
{
    let filtered = filter(all, &query.search, &query.category);
    sort(&filtered, query.sort, rng)
}

pub fn apply(all: &[BookRecord], query: &Query) -> Vec<BookRecord> {
    apply_with_rng(all, query, &mut rand::thread_rng())
}
