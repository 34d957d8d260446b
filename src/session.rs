//! Interactive browsing over stdin.

use colored::Colorize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::catalog::deeplink::resolve_slug;
use crate::catalog::{CatalogState, SortMode};
use crate::debounce::Debouncer;
use crate::output;
use crate::runner::Runner;
use crate::share::{self, ShareAction};

const HELP: &str = "\
commands:
  search <term>            filter by title or author (empty term clears)
  category [name]          filter by category (no name clears)
  sort <mode>              recent, title-asc, title-desc, author-asc, category, random
  next | prev | page <n>   move between pages
  open <slug|link>         jump to the page holding a book
  share <action> <slug>    whatsapp, email or copy
  list                     show the current page
  reload                   fetch the catalog again
  stats                    counts for the loaded catalog
  help | quit
";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionCommand {
    Search(String),
    Category(String),
    Sort(SortMode),
    Next,
    Prev,
    Page(usize),
    Open(String),
    Share { action: ShareAction, slug: String },
    List,
    Reload,
    Stats,
    Help,
    Quit,
}

impl SessionCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };
        match name.to_lowercase().as_str() {
            "" | "list" | "ls" => Ok(Self::List),
            "search" | "s" | "/" => Ok(Self::Search(rest.to_string())),
            "category" | "cat" => Ok(Self::Category(rest.to_string())),
            "sort" => SortMode::parse(rest)
                .map(Self::Sort)
                .ok_or_else(|| format!("unknown sort mode '{rest}'")),
            "next" | "n" => Ok(Self::Next),
            "prev" | "p" => Ok(Self::Prev),
            "page" => rest
                .parse::<usize>()
                .map(Self::Page)
                .map_err(|_| format!("invalid page '{rest}'")),
            "open" => resolve_slug(rest)
                .map(Self::Open)
                .ok_or_else(|| "open needs a slug or link".to_string()),
            "share" => {
                let (action, target) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| "usage: share <whatsapp|email|copy> <slug>".to_string())?;
                let action = ShareAction::parse(action)
                    .ok_or_else(|| format!("unknown share action '{action}'"))?;
                let slug = resolve_slug(target)
                    .ok_or_else(|| "share needs a slug or link".to_string())?;
                Ok(Self::Share { action, slug })
            }
            "reload" | "r" => Ok(Self::Reload),
            "stats" => Ok(Self::Stats),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(format!("unknown command '{other}', try 'help'")),
        }
    }
}

pub struct Session<'a> {
    runner: &'a Runner,
    state: CatalogState,
    library: String,
    debouncer: Debouncer,
    /// Latest term typed, applied by the debouncer or by the next category change.
    typed_search: String,
}

impl<'a> Session<'a> {
    pub fn new(
        runner: &'a Runner,
        state: CatalogState,
        library: impl Into<String>,
        debouncer: Debouncer,
    ) -> Self {
        let typed_search = state.query().search.clone();
        Self {
            runner,
            state,
            library: library.into(),
            debouncer,
            typed_search,
        }
    }

    pub fn state(&self) -> &CatalogState {
        &self.state
    }

    /// Reads commands until `quit` or end of input. A search still waiting on
    /// its quiet period when input ends is applied before returning.
    pub async fn run<R, W>(mut self, input: R, mut out: W) -> Result<CatalogState, String>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let (search_tx, mut search_rx) = mpsc::unbounded_channel::<String>();
        let mut lines = input.lines();

        self.render_page(&mut out).await?;
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let line = match line {
                        Ok(Some(line)) => line,
                        Ok(None) => break,
                        Err(e) => return Err(format!("failed to read input: {e}")),
                    };
                    let command = match SessionCommand::parse(&line) {
                        Ok(command) => command,
                        Err(message) => {
                            write(&mut out, &format!("{} {message}\n", "[ERR]".red())).await?;
                            continue;
                        }
                    };
                    if command == SessionCommand::Quit {
                        self.debouncer.cancel();
                        return Ok(self.state);
                    }
                    self.handle(command, &search_tx, &mut out).await?;
                }
                Some(term) = search_rx.recv() => {
                    self.apply_search(term, &mut out).await?;
                }
            }
        }

        // Pending debounce tasks hold their own senders, so this drains both
        // queued terms and any still in their quiet period.
        drop(search_tx);
        while let Some(term) = search_rx.recv().await {
            self.apply_search(term, &mut out).await?;
        }
        Ok(self.state)
    }

    async fn handle<W>(
        &mut self,
        command: SessionCommand,
        search_tx: &mpsc::UnboundedSender<String>,
        out: &mut W,
    ) -> Result<(), String>
    where
        W: AsyncWrite + Unpin,
    {
        match command {
            SessionCommand::Search(term) => {
                self.typed_search = term.clone();
                let tx = search_tx.clone();
                self.debouncer.schedule(async move {
                    let _ = tx.send(term);
                });
            }
            SessionCommand::Category(category) => {
                self.debouncer.cancel();
                let state = std::mem::take(&mut self.state);
                self.state = state.apply_filter(self.typed_search.clone(), category);
                self.render_page(out).await?;
            }
            SessionCommand::Sort(mode) => {
                self.replace(|s| s.apply_sort(mode));
                self.render_page(out).await?;
            }
            SessionCommand::Next => {
                self.replace(CatalogState::next_page);
                self.render_page(out).await?;
            }
            SessionCommand::Prev => {
                self.replace(CatalogState::prev_page);
                self.render_page(out).await?;
            }
            SessionCommand::Page(page) => {
                if page == 0 || page > self.state.total_pages() {
                    let message =
                        format!("page {page} is out of range 1..={}", self.state.total_pages());
                    write(out, &format!("{} {message}\n", "[WRN]".yellow())).await?;
                } else {
                    self.replace(|s| s.go_to_page(page));
                    self.render_page(out).await?;
                }
            }
            SessionCommand::Open(slug) => {
                let state = std::mem::take(&mut self.state);
                let (state, target) = state.open(&slug);
                self.state = state;
                match target {
                    Some(target) => {
                        tracing::debug!(
                            "Opened {slug} at page {} offset {}",
                            target.page,
                            target.offset
                        );
                        self.render_page(out).await?;
                    }
                    None => {
                        let message = format!("'{slug}' is not in the current listing");
                        write(out, &format!("{} {message}\n", "[WRN]".yellow())).await?;
                    }
                }
            }
            SessionCommand::Share { action, slug } => match self.state.find(&slug) {
                Some(book) => {
                    let rendered = share::render(action, book, &self.library);
                    write(out, &format!("{rendered}\n")).await?;
                }
                None => {
                    let message = format!("no book with slug '{slug}'");
                    write(out, &format!("{} {message}\n", "[WRN]".yellow())).await?;
                }
            },
            SessionCommand::List => self.render_page(out).await?,
            SessionCommand::Reload => {
                let mut warnings = Vec::new();
                let result = self
                    .runner
                    .reload(self.state.clone(), |e| warnings.push(e.to_string()))
                    .await;
                for warning in warnings {
                    let message = format!("{warning}, trying fallback");
                    write(out, &format!("{} {message}\n", "[WRN]".yellow())).await?;
                }
                match result {
                    Ok(loaded) => {
                        self.state = loaded.state;
                        let message = format!(
                            "reloaded {} books from {}",
                            self.state.all().len(),
                            loaded.origin.label()
                        );
                        write(out, &format!("{} {message}\n", "[INF]".green())).await?;
                        self.render_page(out).await?;
                    }
                    Err(e) => {
                        write(out, &format!("{} {e}\n", "[ERR]".red())).await?;
                    }
                }
            }
            SessionCommand::Stats => {
                let summary = self.state.summary();
                let query = self.state.query();
                let message = format!(
                    "{} books, {} shown, {} categories, sort {}, page {}/{}",
                    summary.total,
                    summary.visible,
                    summary.categories,
                    query.sort,
                    summary.current_page,
                    summary.total_pages
                );
                write(out, &format!("{} {message}\n", "[INF]".green())).await?;
            }
            SessionCommand::Help => write(out, HELP).await?,
            SessionCommand::Quit => {}
        }
        Ok(())
    }

    async fn apply_search<W>(&mut self, term: String, out: &mut W) -> Result<(), String>
    where
        W: AsyncWrite + Unpin,
    {
        let category = self.state.query().category.clone();
        self.replace(|s| s.apply_filter(term, category));
        self.render_page(out).await
    }

    fn replace(&mut self, transition: impl FnOnce(CatalogState) -> CatalogState) {
        let state = std::mem::take(&mut self.state);
        self.state = transition(state);
    }

    async fn render_page<W>(&self, out: &mut W) -> Result<(), String>
    where
        W: AsyncWrite + Unpin,
    {
        let rendered = output::render_text(&self.state.view());
        out.write_all(&rendered)
            .await
            .map_err(|e| format!("failed to write output: {e}"))?;
        out.flush()
            .await
            .map_err(|e| format!("failed to write output: {e}"))
    }
}

async fn write<W>(out: &mut W, text: &str) -> Result<(), String>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(text.as_bytes())
        .await
        .map_err(|e| format!("failed to write output: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::Options;
    use crate::source::{Fetcher, LoadError, Source};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;

    struct StaticFetcher(Value);

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, _source: &Source) -> Result<Value, LoadError> {
            Ok(self.0.clone())
        }
    }

    fn runner() -> Runner {
        let books: Vec<Value> = (0..12)
            .map(|i| {
                json!({
                    "titulo": format!("Livro {i:02}"),
                    "autor": if i < 6 { "Cecília Meireles" } else { "Jorge Amado" },
                    "categoria": if i % 2 == 0 { "Poesia" } else { "Romance" },
                    "link": format!("https://example.com/{i}")
                })
            })
            .collect();
        Runner::with_fetcher(
            Options {
                source_url: "https://example.com/dados.json".to_string(),
                fallback: None,
                page_size: 5,
                ..Options::default()
            },
            Arc::new(StaticFetcher(Value::Array(books))),
        )
        .unwrap()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(SessionCommand::parse(""), Ok(SessionCommand::List));
        assert_eq!(
            SessionCommand::parse("search  jorge amado "),
            Ok(SessionCommand::Search("jorge amado".to_string()))
        );
        assert_eq!(SessionCommand::parse("category"), Ok(SessionCommand::Category(String::new())));
        assert_eq!(
            SessionCommand::parse("sort title-desc"),
            Ok(SessionCommand::Sort(SortMode::TitleDesc))
        );
        assert_eq!(SessionCommand::parse("page 3"), Ok(SessionCommand::Page(3)));
        assert_eq!(
            SessionCommand::parse("open https://example.com/?livro=livro-03"),
            Ok(SessionCommand::Open("livro-03".to_string()))
        );
        assert_eq!(
            SessionCommand::parse("share wa livro-01"),
            Ok(SessionCommand::Share {
                action: ShareAction::WhatsApp,
                slug: "livro-01".to_string()
            })
        );
        assert_eq!(SessionCommand::parse("QUIT"), Ok(SessionCommand::Quit));
    }

    #[test]
    fn rejects_bad_commands() {
        assert!(SessionCommand::parse("sort popular").is_err());
        assert!(SessionCommand::parse("page two").is_err());
        assert!(SessionCommand::parse("share fax livro-01").is_err());
        assert!(SessionCommand::parse("share livro-01").is_err());
        assert!(SessionCommand::parse("open").is_err());
        assert!(SessionCommand::parse("dance").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_and_search_drive_the_state() {
        let runner = runner();
        let loaded = runner.load_catalog(|_| {}).await.unwrap();
        let debouncer = Debouncer::new(Duration::from_millis(150));
        let session = Session::new(&runner, loaded.state, "Acervo", debouncer);

        let input: &[u8] = b"next\nsort title-asc\ncategory Poesia\nsearch jorge\n";
        let mut out = Vec::new();
        let state = session.run(input, &mut out).await.unwrap();

        assert_eq!(state.query().sort, SortMode::TitleAsc);
        assert_eq!(state.query().category, "Poesia");
        assert_eq!(state.query().search, "jorge");
        assert_eq!(state.filtered().len(), 3);
        assert_eq!(state.current_page(), 1);
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("12 books, 12 shown, 2 categories"));
        assert!(printed.contains("12 books, 3 shown, 2 categories"));
    }

    #[tokio::test(start_paused = true)]
    async fn open_share_and_quit() {
        let runner = runner();
        let loaded = runner.load_catalog(|_| {}).await.unwrap();
        let session = Session::new(&runner, loaded.state, "Acervo", Debouncer::default());

        let input: &[u8] = b"open livro-02\nshare copy livro-02\nquit\nnext\n";
        let mut out = Vec::new();
        let state = session.run(input, &mut out).await.unwrap();

        assert_eq!(state.current_page(), 2);
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("Livro 02"));
        assert!(printed.contains("https://example.com/2"));
        assert!(printed.contains("Available at Acervo"));
    }

    #[tokio::test(start_paused = true)]
    async fn search_typed_right_before_input_closes_is_applied() {
        let runner = runner();
        let loaded = runner.load_catalog(|_| {}).await.unwrap();
        let delay = Duration::from_millis(150);

        for _ in 0..40 {
            let (mut writer, reader) = tokio::io::duplex(64);
            let state = loaded.state.clone();
            let session = Session::new(&runner, state, "Acervo", Debouncer::new(delay));
            let mut out = Vec::new();
            let typing = async move {
                writer.write_all(b"search jorge\n").await.unwrap();
                tokio::time::sleep(delay).await;
                drop(writer);
            };
            let (state, ()) = tokio::join!(
                session.run(tokio::io::BufReader::new(reader), &mut out),
                typing
            );
            let state = state.unwrap();
            assert_eq!(state.query().search, "jorge");
            assert_eq!(state.filtered().len(), 6);
        }
    }
}
