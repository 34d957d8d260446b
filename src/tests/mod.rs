use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::catalog::filter::{self, SortMode};
use crate::catalog::pagination;
use crate::catalog::{CatalogState, Query};
use crate::record::{self, BookRecord};
use crate::runner::{Options, Runner, RunnerError};
use crate::source::{Fetcher, LoadError, PayloadOrigin, Source};


fn zeta_alpha() -> Vec<BookRecord> {
    record::normalize_all(&json!([
        { "titulo": "Zeta", "autor": "X" },
        { "titulo": "Alpha", "autor": "Y" }
    ]))
    .unwrap()
}

fn numbered(count: usize) -> Vec<BookRecord> {
    let raw: Vec<Value> = (0..count)
        .map(|i| json!({ "titulo": format!("Book {i:02}"), "autor": "Author" }))
        .collect();
    record::normalize_all(&Value::Array(raw)).unwrap()
}

#[test]
fn recent_sort_puts_the_latest_entry_first() {
    let sorted = filter::apply(&zeta_alpha(), &Query::default());
    let titles: Vec<_> = sorted.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Alpha", "Zeta"]);
}

#[test]
fn partial_search_matches_only_alpha() {
    let found = filter::filter(&zeta_alpha(), "alp", "");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "Alpha");
}

#[test]
fn twenty_five_records_make_three_pages() {
    let state = CatalogState::new(10, 20).with_records(numbered(25));
    assert_eq!(state.total_pages(), 3);
    let state = state.go_to_page(3);
    assert_eq!(state.page().len(), 5);
}

#[test]
fn malformed_entries_get_defaults() {
    let raw = json!([null, 7, { "titulo": "", "autor": 3 }, []]);
    let records = record::normalize_all(&raw).unwrap();
    assert_eq!(records.len(), 4);
    for r in &records {
        assert_eq!(r.title, record::DEFAULT_TITLE);
        assert_eq!(r.author, record::DEFAULT_AUTHOR);
        assert_eq!(r.link, record::DEFAULT_LINK);
        assert!(r.category.is_none());
    }
}

#[test]
fn empty_query_keeps_every_record() {
    let all = numbered(17);
    for mode in SortMode::ALL {
        let out = filter::apply(&all, &Query::new("", "", mode));
        let mut got: Vec<_> = out.iter().map(|r| r.title.clone()).collect();
        let mut want: Vec<_> = all.iter().map(|r| r.title.clone()).collect();
        got.sort();
        want.sort();
        assert_eq!(got, want, "{mode}");
    }
}

#[test]
fn deterministic_sorts_are_idempotent() {
    let all = record::normalize_all(&json!([
        { "titulo": "Érico", "autor": "b", "categoria": "Romance" },
        { "titulo": "erico", "autor": "A", "categoria": "conto" },
        { "titulo": "Ana", "autor": "c" },
        { "titulo": "Bruno", "autor": "á", "categoria": "Conto" }
    ]))
    .unwrap();
    for mode in SortMode::ALL.into_iter().filter(|m| *m != SortMode::Random) {
        let once = filter::apply(&all, &Query::new("", "", mode));
        let twice = filter::apply(&once, &Query::new("", "", mode));
        assert_eq!(once, twice, "{mode}");
    }
}

#[test]
fn pages_partition_the_filtered_list() {
    for len in [0usize, 1, 9, 10, 11, 25, 100] {
        for size in [1usize, 3, 10] {
            let items: Vec<usize> = (0..len).collect();
            let total = pagination::total_pages(len, size);
            let mut seen = Vec::new();
            for page in 1..=total {
                seen.extend_from_slice(pagination::page_slice(&items, size, page));
            }
            assert_eq!(seen, items, "len {len} size {size}");
        }
    }
}

#[derive(Default)]
struct FailingFetcher {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl Fetcher for FailingFetcher {
    async fn fetch(&self, source: &Source) -> Result<Value, LoadError> {
        self.calls.lock().unwrap().push(source.display_name());
        Err(LoadError::Network {
            source_name: source.display_name(),
            reason: "connection refused".to_string(),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn primary_rejection_reports_once_and_tries_fallback_once() {
    let fetcher = Arc::new(FailingFetcher::default());
    let runner = Runner::with_fetcher(
        Options {
            source_url: "https://example.com/dados.json".to_string(),
            fallback: Some("dados.json".to_string()),
            ..Options::default()
        },
        fetcher.clone(),
    )
    .unwrap();

    let reports = AtomicUsize::new(0);
    let started = tokio::time::Instant::now();
    let err = runner
        .load_catalog(|_| {
            reports.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap_err();

    assert!(started.elapsed() >= Duration::from_millis(2000));
    assert_eq!(reports.load(Ordering::SeqCst), 1);
    assert!(matches!(err, RunnerError::Load(LoadError::Exhausted { .. })));
    let calls = fetcher.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].starts_with("https://example.com/dados.json"));
    assert_eq!(calls[1], "dados.json");
}

struct CountingFetcher {
    payload: Value,
    calls: AtomicUsize,
}

#[async_trait]
impl Fetcher for CountingFetcher {
    async fn fetch(&self, _source: &Source) -> Result<Value, LoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.payload.clone())
    }
}

#[tokio::test]
async fn disk_cache_is_shared_between_runners() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(CountingFetcher {
        payload: json!([{ "titulo": "Alpha" }, { "titulo": "Zeta" }]),
        calls: AtomicUsize::new(0),
    });
    let options = Options {
        source_url: "https://example.com/dados.json".to_string(),
        fallback: None,
        cache_dir: Some(dir.path().to_path_buf()),
        ..Options::default()
    };

    let first = Runner::with_fetcher(options.clone(), fetcher.clone()).unwrap();
    let loaded = first.load_catalog(|_| {}).await.unwrap();
    assert_eq!(loaded.origin, PayloadOrigin::Primary);

    let second = Runner::with_fetcher(options.clone(), fetcher.clone()).unwrap();
    let loaded = second.load_catalog(|_| {}).await.unwrap();
    assert_eq!(loaded.origin, PayloadOrigin::Cache);
    assert_eq!(loaded.state.all().len(), 2);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

    second.clear_cache().unwrap();
    let loaded = first.load_catalog(|_| {}).await.unwrap();
    assert_eq!(loaded.origin, PayloadOrigin::Primary);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn reload_keeps_the_query_of_the_previous_state() {
    let fetcher = Arc::new(CountingFetcher {
        payload: json!([
            { "titulo": "Alpha", "categoria": "Poesia" },
            { "titulo": "Beta", "categoria": "Romance" },
            { "titulo": "Gama", "categoria": "Poesia" }
        ]),
        calls: AtomicUsize::new(0),
    });
    let runner = Runner::with_fetcher(
        Options {
            source_url: "https://example.com/dados.json".to_string(),
            fallback: None,
            force_refresh: true,
            ..Options::default()
        },
        fetcher.clone(),
    )
    .unwrap();

    let state = runner.load_catalog(|_| {}).await.unwrap().state;
    let state = state.apply_filter("", "Poesia");
    let reloaded = runner.reload(state, |_| {}).await.unwrap();
    assert_eq!(reloaded.state.query().category, "Poesia");
    assert_eq!(reloaded.state.filtered().len(), 2);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
}
