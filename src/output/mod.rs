pub mod report;

use itertools::Itertools;

use crate::catalog::pagination::PageButton;
use crate::catalog::CatalogView;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Html,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".html") || lower.ends_with(".htm") {
        return Some(OutputFormat::Html);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

pub fn page_buttons_line(buttons: &[PageButton]) -> String {
    buttons
        .iter()
        .map(|b| match b {
            PageButton::Page {
                number,
                active: true,
            } => format!("[{number}]"),
            PageButton::Page { number, .. } => number.to_string(),
            PageButton::Ellipsis => "...".to_string(),
        })
        .join(" ")
}

pub fn render_text(view: &CatalogView) -> Vec<u8> {
    let mut out = String::new();
    let s = &view.summary;
    out.push_str(&format!(
        "{} books, {} shown, {} categories\n\n",
        s.total, s.visible, s.categories
    ));
    if view.empty {
        out.push_str("No books found. Try adjusting the search filters.\n");
        return out.into_bytes();
    }
    for card in &view.cards {
        let marker = if card.recent { "*" } else { " " };
        out.push_str(&format!("{marker} {} - {}", card.title, card.author));
        if let Some(category) = card.category.as_deref() {
            out.push_str(&format!(" [{category}]"));
        }
        out.push('\n');
        out.push_str(&format!("    {}\n", card.link));
    }
    if view.controls.visible {
        out.push('\n');
        out.push_str(&format!(
            "{} {} {}   page {}/{}\n",
            if view.controls.prev_enabled { "<" } else { " " },
            page_buttons_line(&view.controls.buttons),
            if view.controls.next_enabled { ">" } else { " " },
            view.controls.current_page,
            view.controls.total_pages
        ));
    }
    out.into_bytes()
}

pub fn render_json(view: &CatalogView) -> Vec<u8> {
    serde_json::to_vec_pretty(view).unwrap_or_else(|_| b"{}\n".to_vec())
}

pub fn render_html(view: &CatalogView, library: &str) -> Vec<u8> {
    report::render_html(view, library)
}

pub fn render(view: &CatalogView, format: OutputFormat, library: &str) -> Vec<u8> {
    match format {
        OutputFormat::Text => render_text(view),
        OutputFormat::Json => render_json(view),
        OutputFormat::Html => render_html(view, library),
    }
}
