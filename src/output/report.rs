use crate::catalog::pagination::PageButton;
use crate::catalog::{BookCard, CatalogView};

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_card(card: &BookCard) -> String {
    let badge = if card.recent {
        r#"<span class="absolute top-3 left-3 rounded-full bg-primary px-2 py-0.5 text-xs font-semibold text-white">New</span>"#
    } else {
        ""
    };
    let category = card
        .category
        .as_deref()
        .map(|c| {
            format!(
                r#"<span class="text-xs uppercase tracking-wide text-primary">{}</span>"#,
                escape_html(c)
            )
        })
        .unwrap_or_default();
    format!(
        r#"        <article id="{slug}" class="relative flex flex-col overflow-hidden rounded-xl border border-slate-200 bg-white shadow-sm">
          {badge}
          <img src="{cover}" alt="{title}" loading="lazy" class="aspect-[2/3] w-full object-cover"/>
          <div class="flex flex-1 flex-col gap-1 p-4">
            {category}
            <h3 class="text-base">{title}</h3>
            <p class="text-sm text-slate-500">{author}</p>
            <a href="{link}" target="_blank" rel="noopener" class="mt-auto pt-3 text-sm font-semibold text-primary">Read</a>
          </div>
        </article>
"#,
        slug = escape_html(&card.slug),
        badge = badge,
        cover = escape_html(&card.cover_url),
        title = escape_html(&card.title),
        category = category,
        author = escape_html(&card.author),
        link = escape_html(&card.link),
    )
}

fn render_pagination(view: &CatalogView) -> String {
    let controls = &view.controls;
    if !controls.visible {
        return String::new();
    }
    let mut items = Vec::with_capacity(controls.buttons.len() + 2);
    let arrow = |enabled: bool, page: usize, label: &str| {
        if enabled {
            format!(r#"<a href="?page={page}" class="px-3 py-1 rounded border">{label}</a>"#)
        } else {
            format!(r#"<span class="px-3 py-1 rounded border opacity-40">{label}</span>"#)
        }
    };
    items.push(arrow(
        controls.prev_enabled,
        controls.current_page.saturating_sub(1),
        "&lsaquo;",
    ));
    for button in &controls.buttons {
        items.push(match button {
            PageButton::Page {
                number,
                active: true,
            } => format!(
                r#"<span aria-current="page" class="px-3 py-1 rounded bg-primary text-white">{number}</span>"#
            ),
            PageButton::Page { number, .. } => {
                format!(r#"<a href="?page={number}" class="px-3 py-1 rounded border">{number}</a>"#)
            }
            PageButton::Ellipsis => r#"<span class="px-2">&hellip;</span>"#.to_string(),
        });
    }
    items.push(arrow(
        controls.next_enabled,
        controls.current_page + 1,
        "&rsaquo;",
    ));
    format!(
        "      <nav class=\"mt-10 flex items-center justify-center gap-2\">{}</nav>\n",
        items.join("")
    )
}

pub fn render_html(view: &CatalogView, library: &str) -> Vec<u8> {
    let library = escape_html(library);
    let categories: String = view
        .categories
        .iter()
        .map(|c| {
            format!(
                r#"<span class="rounded-full bg-slate-100 px-3 py-1 text-xs">{}</span>"#,
                escape_html(c)
            )
        })
        .collect();
    let body = if view.empty {
        r#"      <p class="py-20 text-center text-slate-500">No books found. Try adjusting the search filters.</p>
"#
        .to_string()
    } else {
        let cards: String = view.cards.iter().map(render_card).collect();
        format!(
            "      <section class=\"grid grid-cols-2 gap-6 md:grid-cols-3 xl:grid-cols-5\">\n{cards}      </section>\n"
        )
    };
    let summary = &view.summary;

    let html = format!(
        r####"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8"/>
  <meta content="width=device-width, initial-scale=1.0" name="viewport"/>
  <title>{library}</title>
  <script src="https://cdn.tailwindcss.com"></script>
  <link href="https://fonts.googleapis.com/css2?family=Montserrat:wght@700;800&amp;family=Inter:wght@400;500;600;700&amp;display=swap" rel="stylesheet"/>
  <script id="tailwind-config">
    tailwind.config = {{
      theme: {{
        extend: {{
          colors: {{ "primary": "#135bec" }},
          fontFamily: {{ "sans": ["Inter", "sans-serif"], "display": ["Montserrat", "sans-serif"] }}
        }}
      }}
    }};
  </script>
  <style type="text/tailwindcss">
    h1, h2, h3 {{
      font-family: 'Montserrat', sans-serif;
      font-weight: 800;
      letter-spacing: -0.025em;
    }}
  </style>
</head>
<body class="bg-slate-50 text-slate-900 min-h-screen">
  <header class="border-b border-slate-200 bg-white px-8 py-4">
    <h2 class="text-xl uppercase tracking-tight">{library}</h2>
  </header>
  <main class="max-w-[1440px] mx-auto w-full px-8 py-10">
    <div class="mb-8 flex flex-wrap gap-6 text-sm text-slate-600">
      <span><strong>{total}</strong> books</span>
      <span><strong>{visible}</strong> shown</span>
      <span><strong>{category_count}</strong> categories</span>
      <span>page {current_page} of {total_pages}</span>
    </div>
    <div class="mb-8 flex flex-wrap gap-2">{categories}</div>
{body}{pagination}  </main>
</body>
</html>
"####,
        library = library,
        total = summary.total,
        visible = summary.visible,
        category_count = summary.categories,
        current_page = summary.current_page,
        total_pages = summary.total_pages,
        categories = categories,
        body = body,
        pagination = render_pagination(view),
    );

    html.into_bytes()
}
