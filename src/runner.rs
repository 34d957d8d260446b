use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::cache::{self, CacheError, FileStore, KeyValueStore, MemoryStore, SystemClock};
use crate::catalog::{self, CatalogState};
use crate::record::{self, ValidationError};
use crate::source::{
    self, CacheGate, Fetcher, GateOptions, HttpFetcher, LoadError, PayloadOrigin, Source,
};

pub const DEFAULT_SOURCE_URL: &str =
    "https://raw.githubusercontent.com/bibliotecacidrosado/acervovirtual/refs/heads/main/dados.json";
pub const DEFAULT_FALLBACK: &str = "dados.json";

#[derive(Clone, Debug)]
pub struct Options {
    pub source_url: String,
    pub fallback: Option<String>,
    /// `None` keeps the cache in memory for the lifetime of the runner.
    pub cache_dir: Option<PathBuf>,
    pub cache_ttl: Duration,
    pub fallback_delay: Duration,
    pub timeout_seconds: u64,
    pub proxy: Option<String>,
    pub page_size: usize,
    pub recent_window: usize,
    pub stale_on_error: bool,
    pub force_refresh: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            fallback: Some(DEFAULT_FALLBACK.to_string()),
            cache_dir: None,
            cache_ttl: cache::DEFAULT_CACHE_TTL,
            fallback_delay: source::DEFAULT_FALLBACK_DELAY,
            timeout_seconds: 10,
            proxy: None,
            page_size: catalog::DEFAULT_PAGE_SIZE,
            recent_window: catalog::DEFAULT_RECENT_WINDOW,
            stale_on_error: false,
            force_refresh: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("invalid source: {message}")]
    InvalidSource { message: String },

    #[error("invalid page_size {value}, expected positive integer")]
    InvalidPageSize { value: usize },

    #[error("invalid timeout {value}, expected positive number of seconds")]
    InvalidTimeout { value: u64 },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to open cache: {source}")]
    Cache {
        #[source]
        source: CacheError,
    },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Clone, Debug)]
pub struct LoadedCatalog {
    pub state: CatalogState,
    pub origin: PayloadOrigin,
    pub elapsed: Duration,
}

pub struct Runner {
    options: Options,
    gate: CacheGate,
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn parse_source(raw: &str) -> Result<Source, RunnerError> {
    Source::parse(raw).map_err(|message| RunnerError::InvalidSource { message })
}

impl Runner {
    pub fn new(options: Options) -> Result<Self, RunnerError> {
        let fetcher = HttpFetcher::build(
            Duration::from_secs(options.timeout_seconds),
            options.proxy.as_deref(),
        )
        .map_err(|source| RunnerError::HttpClientBuild { source })?;
        Self::with_fetcher(options, Arc::new(fetcher))
    }

    /// Like [`Runner::new`] but with a caller-supplied fetcher.
    pub fn with_fetcher(options: Options, fetcher: Arc<dyn Fetcher>) -> Result<Self, RunnerError> {
        if options.page_size == 0 {
            return Err(RunnerError::InvalidPageSize {
                value: options.page_size,
            });
        }
        if options.timeout_seconds == 0 {
            return Err(RunnerError::InvalidTimeout {
                value: options.timeout_seconds,
            });
        }
        let primary = parse_source(&options.source_url)?;
        let fallback = options
            .fallback
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .map(parse_source)
            .transpose()?;

        let store: Arc<dyn KeyValueStore> = match options.cache_dir.as_ref() {
            Some(dir) => Arc::new(
                FileStore::open(dir).map_err(|source| RunnerError::Cache { source })?,
            ),
            None => Arc::new(MemoryStore::new()),
        };

        let gate = CacheGate::new(
            fetcher,
            store.clone(),
            Arc::new(SystemClock),
            GateOptions {
                primary,
                fallback,
                ttl: options.cache_ttl,
                fallback_delay: options.fallback_delay,
                stale_on_error: options.stale_on_error,
                force_refresh: options.force_refresh,
            },
        );

        Ok(Self {
            options,
            gate,
            store,
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn empty_state(&self) -> CatalogState {
        CatalogState::new(self.options.page_size, self.options.recent_window)
    }

    /// Resolves the payload through the cache gate and loads it into a fresh
    /// catalog state. `report` sees the primary failure before the fallback wait.
    pub async fn load_catalog<R>(&self, report: R) -> Result<LoadedCatalog, RunnerError>
    where
        R: FnMut(&LoadError),
    {
        self.reload(self.empty_state(), report).await
    }

    /// Loads into an existing state, keeping its query.
    pub async fn reload<R>(
        &self,
        state: CatalogState,
        report: R,
    ) -> Result<LoadedCatalog, RunnerError>
    where
        R: FnMut(&LoadError),
    {
        let started_at = Instant::now();
        let loaded = self.gate.load(report).await?;
        let records = record::normalize_all(&loaded.payload)?;
        tracing::info!(
            "Loaded {} books from {} in {:?}",
            records.len(),
            loaded.origin.label(),
            started_at.elapsed()
        );
        Ok(LoadedCatalog {
            state: state.with_records(records),
            origin: loaded.origin,
            elapsed: started_at.elapsed(),
        })
    }

    pub fn clear_cache(&self) -> Result<(), RunnerError> {
        cache::clear(self.store.as_ref()).map_err(|source| RunnerError::Cache { source })
    }
}
