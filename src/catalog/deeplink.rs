use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::record::BookRecord;

/// Query parameter carrying the slug of the book a link points at.
pub const DEEP_LINK_PARAM: &str = "livro";

static WHITESPACE: OnceLock<Regex> = OnceLock::new();

fn whitespace() -> &'static Regex {
    WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

pub fn slugify(title: &str) -> String {
    whitespace()
        .replace_all(&title.to_lowercase(), "-")
        .into_owned()
}

/// Extracts the slug from a shared link, or returns `None` when the link has
/// no (or an empty) `livro` parameter.
pub fn slug_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == DEEP_LINK_PARAM)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Accepts either a bare slug or a link carrying one.
pub fn resolve_slug(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if input.starts_with("http://") || input.starts_with("https://") {
        return slug_from_url(input);
    }
    Some(input.to_string())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DeepLinkTarget {
    /// 1-based page holding the record.
    pub page: usize,
    /// Position of the record within that page.
    pub offset: usize,
}

pub fn locate(filtered: &[BookRecord], slug: &str, page_size: usize) -> Option<DeepLinkTarget> {
    let page_size = page_size.max(1);
    let position = filtered.iter().position(|r| slugify(&r.title) == slug)?;
    Some(DeepLinkTarget {
        page: position / page_size + 1,
        offset: position % page_size,
    })
}
