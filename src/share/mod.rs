//! Share texts and links for a single book.

use crate::record::BookRecord;

pub const DEFAULT_LIBRARY_NAME: &str = "Biblioteca Digital";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShareAction {
    WhatsApp,
    Email,
    Copy,
}

impl ShareAction {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "whatsapp" | "wa" => Some(Self::WhatsApp),
            "email" | "mail" => Some(Self::Email),
            "copy" | "clipboard" | "copiar" => Some(Self::Copy),
            _ => None,
        }
    }
}

pub fn whatsapp_message(book: &BookRecord) -> String {
    format!(
        "📚 *{}*\n✍️ _{}_\n\n🔗 {}\n\n📖 Open the link to read the full book!",
        book.title, book.author, book.link
    )
}

pub fn whatsapp_url(book: &BookRecord) -> String {
    format!(
        "https://wa.me/?text={}",
        urlencoding::encode(&whatsapp_message(book))
    )
}

pub fn email_subject(book: &BookRecord) -> String {
    format!("📚 Book recommendation: {}", book.title)
}

pub fn email_body(book: &BookRecord, library: &str) -> String {
    format!(
        "Hello!\n\nI recommend this book:\n\n📖 TITLE: {}\n✍️ AUTHOR: {}\n\n🔗 READ IT HERE: {}\n\nBest regards,\n{}",
        book.title, book.author, book.link, library
    )
}

pub fn email_url(book: &BookRecord, library: &str) -> String {
    format!(
        "mailto:?subject={}&body={}",
        urlencoding::encode(&email_subject(book)),
        urlencoding::encode(&email_body(book, library))
    )
}

pub fn clipboard_text(book: &BookRecord, library: &str) -> String {
    format!(
        "📖 {}\n👤 {}\n🔗 {}\n\n💡 Available at {}",
        book.title, book.author, book.link, library
    )
}

/// The string an action produces: a URL to open, or text to copy.
pub fn render(action: ShareAction, book: &BookRecord, library: &str) -> String {
    match action {
        ShareAction::WhatsApp => whatsapp_url(book),
        ShareAction::Email => email_url(book, library),
        ShareAction::Copy => clipboard_text(book, library),
    }
}
