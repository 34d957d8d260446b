use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_AUTHOR: &str = "Unknown author";
pub const DEFAULT_LINK: &str = "#";
pub const DEFAULT_COVER_URL: &str = "https://via.placeholder.com/200x300?text=Sem+Capa";

const FIELD_TITLE: &str = "titulo";
const FIELD_AUTHOR: &str = "autor";
const FIELD_CATEGORY: &str = "categoria";
const FIELD_LINK: &str = "link";
const FIELD_COVER: &str = "capa";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("expected a JSON array of books, found {found}")]
    NotASequence { found: &'static str },
}

/// A single book as the catalog sees it.
///
/// `entry_index` is the position of the record in the payload it was loaded
/// from. It is set once by [`normalize`] and only read afterwards, as the key
/// of the `recent` sort.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BookRecord {
    pub title: String,
    pub author: String,
    pub category: Option<String>,
    pub link: String,
    pub cover_url: String,
    entry_index: Option<usize>,
}

impl BookRecord {
    /// Builds a record that was not loaded from a payload and so has no entry index.
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        category: Option<String>,
        link: impl Into<String>,
        cover_url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            category,
            link: link.into(),
            cover_url: cover_url.into(),
            entry_index: None,
        }
    }

    pub fn entry_index(&self) -> Option<usize> {
        self.entry_index
    }

    pub fn category_or_empty(&self) -> &str {
        self.category.as_deref().unwrap_or("")
    }
}

fn string_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Coerces one raw entry into a record. Never fails: missing, empty or
/// non-string fields fall back to the defaults above.
pub fn normalize(raw: &Value, position: usize) -> BookRecord {
    BookRecord {
        title: string_field(raw, FIELD_TITLE).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        author: string_field(raw, FIELD_AUTHOR).unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
        category: string_field(raw, FIELD_CATEGORY),
        link: string_field(raw, FIELD_LINK).unwrap_or_else(|| DEFAULT_LINK.to_string()),
        cover_url: string_field(raw, FIELD_COVER)
            .unwrap_or_else(|| DEFAULT_COVER_URL.to_string()),
        entry_index: Some(position),
    }
}

pub fn normalize_all(raw: &Value) -> Result<Vec<BookRecord>, ValidationError> {
    let items = raw.as_array().ok_or(ValidationError::NotASequence {
        found: json_kind(raw),
    })?;
    Ok(items
        .iter()
        .enumerate()
        .map(|(position, item)| normalize(item, position))
        .collect())
}

pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
