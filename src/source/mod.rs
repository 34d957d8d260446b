//! Catalog sources and the cache gate in front of them.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::cache::{self, CacheEntry, Clock, KeyValueStore};
use crate::record::json_kind;

/// Delay between a failed primary fetch and the fallback attempt.
pub const DEFAULT_FALLBACK_DELAY: Duration = Duration::from_millis(2000);

pub const CACHE_BUSTER_PARAM: &str = "t";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to fetch {source_name}: {reason}")]
    Network { source_name: String, reason: String },

    #[error("failed to fetch {source_name}: HTTP {status}")]
    Status { source_name: String, status: u16 },

    #[error("malformed response from {source_name}: {reason}")]
    MalformedResponse { source_name: String, reason: String },

    #[error("primary source failed ({primary}); fallback failed ({fallback})")]
    Exhausted {
        primary: Box<LoadError>,
        #[source]
        fallback: Box<LoadError>,
    },
}

impl LoadError {
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedResponse { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    Remote(reqwest::Url),
    File(PathBuf),
}

impl Source {
    /// `http`/`https` locations are remote; anything else is a local path.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err("source location is empty".to_string());
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            let url = reqwest::Url::parse(raw).map_err(|e| format!("invalid URL '{raw}': {e}"))?;
            return Ok(Self::Remote(url));
        }
        Ok(Self::File(PathBuf::from(raw)))
    }

    /// Appends `t=<millis>` to remote sources so intermediaries cannot serve
    /// a stale copy. Local paths are returned unchanged.
    pub fn with_cache_buster(&self, now_millis: u64) -> Self {
        match self {
            Self::Remote(url) => {
                let mut url = url.clone();
                url.query_pairs_mut()
                    .append_pair(CACHE_BUSTER_PARAM, &now_millis.to_string());
                Self::Remote(url)
            }
            Self::File(path) => Self::File(path.clone()),
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Self::Remote(url) => url.to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// Retrieves and parses a JSON document. Shape checks are left to the gate.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, source: &Source) -> Result<Value, LoadError>;
}

pub fn parse_body(source: &Source, body: &str) -> Result<Value, LoadError> {
    serde_json::from_str(body).map_err(|e| LoadError::MalformedResponse {
        source_name: source.display_name(),
        reason: e.to_string(),
    })
}

#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn build(timeout: Duration, proxy: Option<&str>) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("acervo/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout);
        if let Some(proxy) = proxy.filter(|p| !p.trim().is_empty()) {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        Ok(Self::new(builder.build()?))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, source: &Source) -> Result<Value, LoadError> {
        let body = match source {
            Source::Remote(url) => {
                let response = self
                    .client
                    .get(url.clone())
                    .header(reqwest::header::CACHE_CONTROL, "no-store")
                    .send()
                    .await
                    .map_err(|e| LoadError::Network {
                        source_name: source.display_name(),
                        reason: e.to_string(),
                    })?;
                if !response.status().is_success() {
                    return Err(LoadError::Status {
                        source_name: source.display_name(),
                        status: response.status().as_u16(),
                    });
                }
                response.text().await.map_err(|e| LoadError::Network {
                    source_name: source.display_name(),
                    reason: e.to_string(),
                })?
            }
            Source::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| LoadError::Network {
                        source_name: source.display_name(),
                        reason: e.to_string(),
                    })?
            }
        };
        parse_body(source, &body)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadOrigin {
    Cache,
    Primary,
    Fallback,
    StaleCache,
}

impl PayloadOrigin {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Primary => "primary",
            Self::Fallback => "fallback",
            Self::StaleCache => "stale cache",
        }
    }
}

#[derive(Clone, Debug)]
pub struct LoadedPayload {
    pub payload: Value,
    pub origin: PayloadOrigin,
}

#[derive(Clone, Debug)]
pub struct GateOptions {
    pub primary: Source,
    pub fallback: Option<Source>,
    pub ttl: Duration,
    pub fallback_delay: Duration,
    pub stale_on_error: bool,
    pub force_refresh: bool,
}

impl GateOptions {
    pub fn new(primary: Source) -> Self {
        Self {
            primary,
            fallback: None,
            ttl: cache::DEFAULT_CACHE_TTL,
            fallback_delay: DEFAULT_FALLBACK_DELAY,
            stale_on_error: false,
            force_refresh: false,
        }
    }
}

/// Resolves a catalog payload: fresh cache, then primary source, then a
/// single delayed fallback attempt.
pub struct CacheGate {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    options: GateOptions,
}

fn ensure_array(source: &Source, payload: Value) -> Result<Value, LoadError> {
    if payload.is_array() {
        Ok(payload)
    } else {
        Err(LoadError::MalformedResponse {
            source_name: source.display_name(),
            reason: format!("expected a JSON array, found {}", json_kind(&payload)),
        })
    }
}

impl CacheGate {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        options: GateOptions,
    ) -> Self {
        Self {
            fetcher,
            store,
            clock,
            options,
        }
    }

    pub fn options(&self) -> &GateOptions {
        &self.options
    }

    fn read_cache(&self) -> Option<CacheEntry> {
        match CacheEntry::read(self.store.as_ref()) {
            Ok(Some(entry)) if entry.payload.is_array() => Some(entry),
            Ok(Some(entry)) => {
                tracing::warn!(
                    "Ignoring cached payload that is not an array ({})",
                    json_kind(&entry.payload)
                );
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to read catalog cache: {}", e);
                None
            }
        }
    }

    fn fresh_cache(&self) -> Option<CacheEntry> {
        let entry = self.read_cache()?;
        let now = self.clock.now_millis();
        let age = entry.age(now);
        if entry.is_fresh(now, self.options.ttl) {
            tracing::debug!("Using cached catalog (age: {:?})", age);
            Some(entry)
        } else {
            tracing::debug!("Catalog cache expired (age: {:?})", age);
            None
        }
    }

    async fn fetch_primary(&self) -> Result<Value, LoadError> {
        let source = self
            .options
            .primary
            .with_cache_buster(self.clock.now_millis());
        tracing::debug!("Fetching catalog from {}", source);
        let payload = self.fetcher.fetch(&source).await?;
        ensure_array(&self.options.primary, payload)
    }

    /// Loads the payload. `report` is invoked exactly once, before the
    /// fallback delay, when the primary source fails.
    pub async fn load<R>(&self, mut report: R) -> Result<LoadedPayload, LoadError>
    where
        R: FnMut(&LoadError),
    {
        if !self.options.force_refresh {
            if let Some(entry) = self.fresh_cache() {
                return Ok(LoadedPayload {
                    payload: entry.payload,
                    origin: PayloadOrigin::Cache,
                });
            }
        }

        let primary_err = match self.fetch_primary().await {
            Ok(payload) => {
                let entry = CacheEntry::new(payload, self.clock.now_millis());
                if let Err(e) = entry.write(self.store.as_ref()) {
                    tracing::warn!("Failed to save catalog to cache: {}", e);
                }
                return Ok(LoadedPayload {
                    payload: entry.payload,
                    origin: PayloadOrigin::Primary,
                });
            }
            Err(e) => e,
        };

        report(&primary_err);

        let failure = match self.options.fallback.as_ref() {
            Some(fallback) => {
                tokio::time::sleep(self.options.fallback_delay).await;
                tracing::debug!("Trying fallback source {}", fallback);
                let attempt = self
                    .fetcher
                    .fetch(fallback)
                    .await
                    .and_then(|payload| ensure_array(fallback, payload));
                match attempt {
                    Ok(payload) => {
                        return Ok(LoadedPayload {
                            payload,
                            origin: PayloadOrigin::Fallback,
                        })
                    }
                    Err(fallback_err) => {
                        tracing::error!("Fallback source failed as well: {}", fallback_err);
                        LoadError::Exhausted {
                            primary: Box::new(primary_err),
                            fallback: Box::new(fallback_err),
                        }
                    }
                }
            }
            None => primary_err,
        };

        if self.options.stale_on_error {
            if let Some(entry) = self.read_cache() {
                tracing::warn!(
                    "Serving stale catalog cache (age: {:?})",
                    entry.age(self.clock.now_millis())
                );
                return Ok(LoadedPayload {
                    payload: entry.payload,
                    origin: PayloadOrigin::StaleCache,
                });
            }
        }

        Err(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    enum Scripted {
        Json(Value),
        Fail,
    }

    #[derive(Default)]
    struct ScriptedFetcher {
        responses: Mutex<VecDeque<Scripted>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn with(responses: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, source: &Source) -> Result<Value, LoadError> {
            self.calls.lock().unwrap().push(source.display_name());
            match self.responses.lock().unwrap().pop_front() {
                Some(Scripted::Json(v)) => Ok(v),
                Some(Scripted::Fail) | None => Err(LoadError::Network {
                    source_name: source.display_name(),
                    reason: "connection refused".to_string(),
                }),
            }
        }
    }

    struct ManualClock(AtomicU64);

    impl ManualClock {
        fn at(millis: u64) -> Arc<Self> {
            Arc::new(Self(AtomicU64::new(millis)))
        }

        fn set(&self, millis: u64) {
            self.0.store(millis, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_millis(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn options(fallback: bool) -> GateOptions {
        let primary = Source::parse("https://books.example.com/dados.json").unwrap();
        let mut options = GateOptions::new(primary);
        if fallback {
            options.fallback = Some(Source::parse("dados.json").unwrap());
        }
        options
    }

    fn gate(
        fetcher: Arc<ScriptedFetcher>,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        options: GateOptions,
    ) -> CacheGate {
        CacheGate::new(fetcher, store, clock, options)
    }

    #[test]
    fn cache_buster_is_appended_to_remote_sources_only() {
        let remote = Source::parse("https://books.example.com/dados.json?v=2").unwrap();
        assert_eq!(
            remote.with_cache_buster(1234).display_name(),
            "https://books.example.com/dados.json?v=2&t=1234"
        );
        let local = Source::parse("dados.json").unwrap();
        assert_eq!(local.with_cache_buster(1234), local);
    }

    #[tokio::test]
    async fn fresh_cache_skips_the_network() {
        let store = Arc::new(MemoryStore::new());
        CacheEntry::new(json!([{ "titulo": "Cached" }]), 1_000)
            .write(store.as_ref())
            .unwrap();
        let fetcher = ScriptedFetcher::with(vec![]);
        let clock = ManualClock::at(1_000 + 299_999);
        let gate = gate(fetcher.clone(), store, clock, options(false));

        let loaded = gate.load(|_| panic!("no error expected")).await.unwrap();
        assert_eq!(loaded.origin, PayloadOrigin::Cache);
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn expired_cache_triggers_fetch_and_rewrites_entry() {
        let store = Arc::new(MemoryStore::new());
        CacheEntry::new(json!([]), 1_000).write(store.as_ref()).unwrap();
        let fetcher = ScriptedFetcher::with(vec![Scripted::Json(json!([{ "titulo": "Fresh" }]))]);
        let clock = ManualClock::at(1_000 + 300_000);
        let gate = gate(fetcher.clone(), store.clone(), clock, options(false));

        let loaded = gate.load(|_| {}).await.unwrap();
        assert_eq!(loaded.origin, PayloadOrigin::Primary);
        assert_eq!(
            fetcher.calls(),
            vec!["https://books.example.com/dados.json?t=301000".to_string()]
        );
        let entry = CacheEntry::read(store.as_ref()).unwrap().unwrap();
        assert_eq!(entry.stored_at, 301_000);
        assert_eq!(entry.payload, json!([{ "titulo": "Fresh" }]));
    }

    #[tokio::test]
    async fn force_refresh_ignores_fresh_cache() {
        let store = Arc::new(MemoryStore::new());
        CacheEntry::new(json!([]), 1_000).write(store.as_ref()).unwrap();
        let fetcher = ScriptedFetcher::with(vec![Scripted::Json(json!([]))]);
        let mut options = options(false);
        options.force_refresh = true;
        let gate = gate(fetcher.clone(), store, ManualClock::at(1_001), options);

        let loaded = gate.load(|_| {}).await.unwrap();
        assert_eq!(loaded.origin, PayloadOrigin::Primary);
        assert_eq!(fetcher.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn primary_failure_reports_once_then_falls_back_after_delay() {
        let fetcher = ScriptedFetcher::with(vec![
            Scripted::Fail,
            Scripted::Json(json!([{ "titulo": "Local" }])),
        ]);
        let store = Arc::new(MemoryStore::new());
        let gate = gate(fetcher.clone(), store.clone(), ManualClock::at(5), options(true));

        let started = tokio::time::Instant::now();
        let mut reports = 0;
        let loaded = gate.load(|_| reports += 1).await.unwrap();

        assert_eq!(reports, 1);
        assert_eq!(loaded.origin, PayloadOrigin::Fallback);
        assert!(started.elapsed() >= DEFAULT_FALLBACK_DELAY);
        assert_eq!(fetcher.calls().len(), 2);
        assert_eq!(fetcher.calls()[1], "dados.json");
        // fallback payloads are not cached
        assert!(CacheEntry::read(store.as_ref()).unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_failure_is_terminal() {
        let fetcher = ScriptedFetcher::with(vec![Scripted::Fail, Scripted::Fail, Scripted::Fail]);
        let gate = gate(
            fetcher.clone(),
            Arc::new(MemoryStore::new()),
            ManualClock::at(5),
            options(true),
        );

        let mut reports = 0;
        let err = gate.load(|_| reports += 1).await.unwrap_err();
        assert!(matches!(err, LoadError::Exhausted { .. }));
        assert_eq!(reports, 1);
        assert_eq!(fetcher.calls().len(), 2);
    }

    #[tokio::test]
    async fn non_array_json_is_malformed_and_not_cached() {
        let fetcher = ScriptedFetcher::with(vec![Scripted::Json(json!({ "erro": "quota" }))]);
        let store = Arc::new(MemoryStore::new());
        let gate = gate(fetcher, store.clone(), ManualClock::at(5), options(false));

        let mut reported = Vec::new();
        let err = gate
            .load(|e| reported.push(e.is_malformed()))
            .await
            .unwrap_err();
        assert!(err.is_malformed());
        assert_eq!(reported, vec![true]);
        assert!(CacheEntry::read(store.as_ref()).unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_cache_is_served_only_when_enabled() {
        let store = Arc::new(MemoryStore::new());
        CacheEntry::new(json!([{ "titulo": "Old" }]), 0)
            .write(store.as_ref())
            .unwrap();
        let clock = ManualClock::at(10 * 60 * 1000);

        let strict = gate(
            ScriptedFetcher::with(vec![Scripted::Fail]),
            store.clone(),
            clock.clone(),
            options(false),
        );
        assert!(strict.load(|_| {}).await.is_err());

        let mut lenient_options = options(false);
        lenient_options.stale_on_error = true;
        let lenient = gate(
            ScriptedFetcher::with(vec![Scripted::Fail]),
            store,
            clock.clone(),
            lenient_options,
        );
        clock.set(20 * 60 * 1000);
        let loaded = lenient.load(|_| {}).await.unwrap();
        assert_eq!(loaded.origin, PayloadOrigin::StaleCache);
    }
}
