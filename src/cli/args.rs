use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "acervo",
    version,
    about = "book catalog browser",
    long_about = "Acervo fetches a JSON book catalog, caches it locally and lists it page by page with search, category filters and sorting.\n\nExamples:\n  acervo\n  acervo -q machado --sort title-asc\n  acervo --category Romance --page 2 -o catalog.html\n  acervo --book dom-casmurro --share whatsapp\n  acervo --interactive\n\nTip: Use --config to persist source and cache settings."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'o',
        long = "out",
        visible_alias = "output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write the rendered page to a file instead of stdout."
    )]
    pub output: Option<String>,

    #[arg(
        short = 'f',
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Output format: text, json or html (inferred from --output when omitted)."
    )]
    pub output_format: Option<String>,

    #[arg(
        long = "lib",
        visible_alias = "library-name",
        value_name = "NAME",
        help_heading = "Output",
        help = "Library name used in share texts."
    )]
    pub library_name: Option<String>,

    #[arg(
        short = 'u',
        long = "u",
        visible_alias = "url",
        value_name = "URL",
        help_heading = "Source",
        help = "Catalog URL (JSON array of books)."
    )]
    pub url: Option<String>,

    #[arg(
        long = "fb",
        visible_alias = "fallback",
        value_name = "URL|FILE",
        help_heading = "Source",
        help = "Source tried once, after a delay, when the catalog URL fails."
    )]
    pub fallback: Option<String>,

    #[arg(
        long = "nfb",
        visible_alias = "no-fallback",
        help_heading = "Source",
        help = "Do not try a fallback source."
    )]
    pub no_fallback: bool,

    #[arg(
        long = "fbd",
        visible_alias = "fallback-delay",
        value_name = "MS",
        help_heading = "Source",
        help = "Delay before the fallback attempt in milliseconds."
    )]
    pub fallback_delay: Option<u64>,

    #[arg(
        short = 'T',
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        help_heading = "Source",
        help = "Request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'p',
        long = "px",
        visible_alias = "proxy",
        value_name = "URL",
        help_heading = "Source",
        help = "HTTP proxy URL (e.g. http://127.0.0.1:8080)."
    )]
    pub proxy: Option<String>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Source",
        help = "Path to config file (defaults to ~/.acervo/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "ic",
        visible_alias = "init-config",
        help_heading = "Source",
        help = "Write a commented default config file and exit."
    )]
    pub init_config: bool,

    #[arg(
        long = "cd",
        visible_alias = "cache-dir",
        value_name = "DIR",
        help_heading = "Cache",
        help = "Cache directory (defaults to ~/.acervo/cache)."
    )]
    pub cache_dir: Option<String>,

    #[arg(
        long = "ncache",
        visible_alias = "no-cache",
        help_heading = "Cache",
        help = "Keep the cache in memory only."
    )]
    pub no_cache: bool,

    #[arg(
        long = "ttl",
        visible_alias = "cache-ttl",
        value_name = "SECONDS",
        help_heading = "Cache",
        help = "How long a cached catalog is served without a network call."
    )]
    pub cache_ttl: Option<u64>,

    #[arg(
        short = 'r',
        long = "rf",
        visible_alias = "refresh",
        help_heading = "Cache",
        help = "Ignore a fresh cache entry and fetch the catalog again."
    )]
    pub refresh: bool,

    #[arg(
        long = "soe",
        visible_alias = "stale-on-error",
        num_args = 0..=1,
        default_missing_value = "true",
        help_heading = "Cache",
        help = "Serve an expired cache entry when every source fails."
    )]
    pub stale_on_error: Option<bool>,

    #[arg(
        long = "cc",
        visible_alias = "clear-cache",
        help_heading = "Cache",
        help = "Delete the cached catalog and exit."
    )]
    pub clear_cache: bool,

    #[arg(
        short = 'q',
        long = "q",
        visible_alias = "search",
        value_name = "TERM",
        help_heading = "Listing",
        help = "Case-insensitive search in titles and authors."
    )]
    pub search: Option<String>,

    #[arg(
        short = 'c',
        long = "cat",
        visible_alias = "category",
        value_name = "NAME",
        help_heading = "Listing",
        help = "Only list books in this category (exact match)."
    )]
    pub category: Option<String>,

    #[arg(
        short = 's',
        long = "srt",
        visible_alias = "sort",
        value_name = "MODE",
        help_heading = "Listing",
        help = "Sort mode: recent, title-asc, title-desc, author-asc, category, random."
    )]
    pub sort: Option<String>,

    #[arg(
        short = 'P',
        long = "pg",
        visible_alias = "page",
        value_name = "N",
        help_heading = "Listing",
        help = "Page to show (1-based)."
    )]
    pub page: Option<usize>,

    #[arg(
        short = 'n',
        long = "ps",
        visible_alias = "page-size",
        value_name = "N",
        help_heading = "Listing",
        help = "Books per page."
    )]
    pub page_size: Option<usize>,

    #[arg(
        long = "rw",
        visible_alias = "recent-window",
        value_name = "N",
        help_heading = "Listing",
        help = "How many of the latest entries are flagged as new."
    )]
    pub recent_window: Option<usize>,

    #[arg(
        short = 'b',
        long = "bk",
        visible_alias = "book",
        value_name = "SLUG|URL",
        help_heading = "Listing",
        help = "Jump to the page holding this book (slug or shared link)."
    )]
    pub book: Option<String>,

    #[arg(
        long = "sh",
        visible_alias = "share",
        value_name = "ACTION",
        requires = "book",
        help_heading = "Listing",
        help = "Print a share link or text for --book: whatsapp, email or copy."
    )]
    pub share: Option<String>,

    #[arg(
        short = 'i',
        long = "it",
        visible_alias = "interactive",
        help_heading = "Interactive",
        help = "Read browsing commands from stdin."
    )]
    pub interactive: bool,

    #[arg(
        long = "db",
        visible_alias = "debounce",
        value_name = "MS",
        help_heading = "Interactive",
        help = "Quiet period before an interactive search runs."
    )]
    pub debounce: Option<u64>,
}
