use serde::Serialize;

/// Number of numbered page buttons shown around the current page.
pub const PAGE_WINDOW: usize = 5;

/// `ceil(len / page_size)`, never less than 1.
pub fn total_pages(len: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    len.div_ceil(page_size).max(1)
}

pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

/// The records on `current_page` (1-based). Out-of-range pages yield an
/// empty slice rather than an error.
pub fn page_slice<T>(items: &[T], page_size: usize, current_page: usize) -> &[T] {
    let page_size = page_size.max(1);
    let Some(start) = current_page
        .checked_sub(1)
        .and_then(|p| p.checked_mul(page_size))
    else {
        return &[];
    };
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

pub fn page<T>(items: &[T], page_size: usize, current_page: usize) -> (&[T], usize) {
    (
        page_slice(items, page_size, current_page),
        total_pages(items.len(), page_size),
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageButton {
    Page { number: usize, active: bool },
    Ellipsis,
}

/// Layout of the numbered buttons: a window of [`PAGE_WINDOW`] pages around
/// `current`, shifted toward the far end near a boundary, plus the first and
/// last page with an ellipsis wherever pages are skipped.
pub fn page_buttons(current: usize, total: usize) -> Vec<PageButton> {
    let total = total.max(1);
    let current = clamp_page(current, total);
    let span = PAGE_WINDOW - 1;

    let mut start = current.saturating_sub(span / 2).max(1);
    let end = (start + span).min(total);
    if end - start < span {
        start = end.saturating_sub(span).max(1);
    }

    let mut buttons = Vec::with_capacity(PAGE_WINDOW + 4);
    if start > 1 {
        buttons.push(PageButton::Page {
            number: 1,
            active: false,
        });
        if start > 2 {
            buttons.push(PageButton::Ellipsis);
        }
    }
    for number in start..=end {
        buttons.push(PageButton::Page {
            number,
            active: number == current,
        });
    }
    if end < total {
        if end + 1 < total {
            buttons.push(PageButton::Ellipsis);
        }
        buttons.push(PageButton::Page {
            number: total,
            active: false,
        });
    }
    buttons
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PageControls {
    pub visible: bool,
    pub prev_enabled: bool,
    pub next_enabled: bool,
    pub current_page: usize,
    pub total_pages: usize,
    pub buttons: Vec<PageButton>,
}

impl PageControls {
    /// Controls are hidden when everything fits on one page.
    pub fn new(len: usize, page_size: usize, current_page: usize) -> Self {
        let total = total_pages(len, page_size);
        let current = clamp_page(current_page, total);
        Self {
            visible: len > page_size.max(1),
            prev_enabled: current > 1,
            next_enabled: current < total,
            current_page: current,
            total_pages: total,
            buttons: page_buttons(current, total),
        }
    }
}
