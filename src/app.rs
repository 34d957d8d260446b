use std::collections::HashMap;
use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::catalog::deeplink::resolve_slug;
use crate::catalog::{Query, SortMode};
use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::debounce::{Debouncer, DEFAULT_DEBOUNCE_DELAY};
use crate::output::{self, OutputFormat};
use crate::runner::{self, Options, Runner};
use crate::session::Session;
use crate::share::{self, ShareAction, DEFAULT_LIBRARY_NAME};

fn render_custom_help() -> String {
    let cmd = CliArgs::command();
    let mut out = String::new();

    out.push_str(cmd.get_name());
    if let Some(version) = cmd.get_version() {
        out.push(' ');
        out.push_str(version);
    }
    out.push('\n');

    if let Some(long_about) = cmd.get_long_about().or(cmd.get_about()) {
        out.push('\n');
        out.push_str(&long_about.to_string());
        out.push('\n');
    }

    out.push_str("\nUsage: ");
    out.push_str(cmd.get_name());
    out.push_str(" [OPTIONS]\n\n");

    let mut sections: Vec<(String, Vec<&clap::Arg>)> = Vec::new();
    let mut section_idx: HashMap<String, usize> = HashMap::new();

    for arg in cmd.get_arguments().filter(|a| !a.is_hide_set()) {
        let heading = arg.get_help_heading().unwrap_or("Options").to_string();
        let idx = *section_idx.entry(heading.clone()).or_insert_with(|| {
            sections.push((heading, Vec::new()));
            sections.len() - 1
        });
        sections[idx].1.push(arg);
    }

    for (heading, args) in sections {
        out.push_str(&heading);
        out.push_str(":\n");

        for arg in args {
            let mut parts: Vec<String> = Vec::new();
            if let Some(short) = arg.get_short() {
                parts.push(format!("-{short}"));
            }
            if let Some(aliases) = arg.get_visible_aliases() {
                parts.extend(aliases.into_iter().map(|alias| format!("--{alias}")));
            }
            if let Some(long) = arg.get_long() {
                let rendered = format!("--{long}");
                if !parts.contains(&rendered) {
                    parts.push(rendered);
                }
            }

            let mut flags = parts.join(", ");
            if arg.get_action().takes_values() {
                let value_name = arg
                    .get_value_names()
                    .and_then(|names| names.first())
                    .map(|name| name.as_str())
                    .unwrap_or("VALUE");
                let optional = arg.get_num_args().map(|r| r.min_values()).unwrap_or(1) == 0;
                if optional {
                    flags.push_str(&format!(" [<{value_name}>]"));
                } else {
                    flags.push_str(&format!(" <{value_name}>"));
                }
            }

            out.push_str("  ");
            out.push_str(&flags);
            out.push('\n');
            if let Some(help) = arg.get_help() {
                let help = help.to_string();
                if !help.trim().is_empty() {
                    out.push_str("          ");
                    out.push_str(help.trim());
                    out.push('\n');
                }
            }
            out.push('\n');
        }
    }

    out
}

fn initialize_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("acervo={level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn format_kv_line(label: &str, value: &str) {
    eprintln!(":: {:<10}: {}", label, value);
}

#[derive(Clone, Debug)]
struct RunConfig {
    options: Options,
    verbose: u8,
    no_color: bool,
    output: Option<String>,
    output_format: OutputFormat,
    library_name: String,
    search: String,
    category: String,
    sort: SortMode,
    page: Option<usize>,
    book: Option<String>,
    share: Option<ShareAction>,
    interactive: bool,
    debounce: Duration,
    clear_cache: bool,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = args.no_color || cfg.no_color.unwrap_or(false);

    let no_cache = args.no_cache || cfg.no_cache.unwrap_or(false);
    let cache_dir = if no_cache {
        None
    } else {
        match args.cache_dir.or(cfg.cache_dir) {
            Some(dir) => Some(config::expand_tilde(&dir)),
            None => config::default_cache_dir(),
        }
    };

    let fallback = if args.no_fallback {
        None
    } else {
        args.fallback
            .or(cfg.fallback)
            .or_else(|| Some(runner::DEFAULT_FALLBACK.to_string()))
            .map(|f| config::expand_tilde_string(&f))
    };

    let timeout_seconds = args.timeout.or(cfg.timeout).unwrap_or(10);
    if timeout_seconds == 0 {
        return Err("invalid timeout in config, expected positive number of seconds".to_string());
    }
    let page_size = args
        .page_size
        .or(cfg.page_size)
        .unwrap_or(crate::catalog::DEFAULT_PAGE_SIZE);
    if page_size == 0 {
        return Err("invalid page_size in config, expected positive integer".to_string());
    }

    let options = Options {
        source_url: args
            .url
            .or(cfg.source_url)
            .unwrap_or_else(|| runner::DEFAULT_SOURCE_URL.to_string()),
        fallback,
        cache_dir,
        cache_ttl: args
            .cache_ttl
            .or(cfg.cache_ttl)
            .map(Duration::from_secs)
            .unwrap_or(crate::cache::DEFAULT_CACHE_TTL),
        fallback_delay: args
            .fallback_delay
            .or(cfg.fallback_delay_ms)
            .map(Duration::from_millis)
            .unwrap_or(crate::source::DEFAULT_FALLBACK_DELAY),
        timeout_seconds,
        proxy: args.proxy.or(cfg.proxy).filter(|p| !p.trim().is_empty()),
        page_size,
        recent_window: args
            .recent_window
            .or(cfg.recent_window)
            .unwrap_or(crate::catalog::DEFAULT_RECENT_WINDOW),
        stale_on_error: args.stale_on_error.or(cfg.stale_on_error).unwrap_or(false),
        force_refresh: args.refresh,
    };

    let sort = match args.sort.or(cfg.sort) {
        Some(raw) => SortMode::parse(&raw).ok_or_else(|| format!("invalid sort '{raw}'"))?,
        None => SortMode::default(),
    };

    let output = args
        .output
        .or(cfg.output)
        .map(|p| config::expand_tilde_string(&p));
    let output_format = match args.output_format.or(cfg.output_format) {
        Some(raw) => OutputFormat::parse(&raw)
            .ok_or_else(|| format!("invalid output format '{raw}', expected text, json or html"))?,
        None => output
            .as_deref()
            .and_then(output::infer_format_from_path)
            .unwrap_or(OutputFormat::Text),
    };

    Ok(RunConfig {
        options,
        verbose: args.verbose,
        no_color,
        output,
        output_format,
        library_name: args
            .library_name
            .or(cfg.library_name)
            .unwrap_or_else(|| DEFAULT_LIBRARY_NAME.to_string()),
        search: args.search.unwrap_or_default(),
        category: args.category.unwrap_or_default(),
        sort,
        page: args.page,
        book: args.book,
        share: args.share.as_deref().and_then(ShareAction::parse),
        interactive: args.interactive,
        debounce: args
            .debounce
            .or(cfg.debounce_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_DEBOUNCE_DELAY),
        clear_cache: args.clear_cache,
    })
}

fn load_spinner(source: &str) -> Result<ProgressBar, String> {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::with_template(":: {spinner} {msg} [{elapsed_precise}]")
            .map_err(|e| format!("failed to build progress style: {e}"))?,
    );
    pb.set_message(format!("Loading catalog from {source}"));
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

async fn write_output(path: &str, rendered: &[u8]) -> Result<(), String> {
    let mut outfile = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await
        .map_err(|e| format!("failed to open output file: {e}"))?;
    outfile
        .write_all(rendered)
        .await
        .map_err(|e| format!("failed to write output file: {e}"))
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }

    let runner = Runner::new(run.options.clone()).map_err(|e| e.to_string())?;

    if run.clear_cache {
        runner.clear_cache().map_err(|e| e.to_string())?;
        eprintln!("{} cache cleared", "[INF]".green());
        return Ok(());
    }

    if run.verbose > 0 {
        format_kv_line("Source", &run.options.source_url);
        format_kv_line(
            "Fallback",
            run.options.fallback.as_deref().unwrap_or("(none)"),
        );
        let cache = run
            .options
            .cache_dir
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "(memory)".to_string());
        format_kv_line("Cache", &cache);
        format_kv_line("Cache TTL", &format!("{}s", run.options.cache_ttl.as_secs()));
        format_kv_line("Page size", &run.options.page_size.to_string());
        eprintln!();
    }

    let pb = load_spinner(&run.options.source_url)?;
    let fallback_delay = run.options.fallback_delay;
    let loaded = runner
        .load_catalog(|e| {
            pb.suspend(|| {
                eprintln!(
                    "{} {e}, retrying with the fallback in {}ms",
                    "[ERR]".red(),
                    fallback_delay.as_millis()
                )
            });
        })
        .await;
    pb.finish_and_clear();
    let loaded = loaded.map_err(|e| e.to_string())?;
    eprintln!(
        "{} {} books loaded from {} in {}ms",
        "[INF]".green(),
        loaded.state.all().len(),
        loaded.origin.label(),
        loaded.elapsed.as_millis()
    );

    let mut state = loaded
        .state
        .apply_query(Query::new(run.search.clone(), run.category.clone(), run.sort));

    if let Some(page) = run.page {
        if page > state.total_pages() {
            eprintln!(
                "{} page {page} is out of range, showing page 1 of {}",
                "[WRN]".yellow(),
                state.total_pages()
            );
        }
        state = state.go_to_page(page);
    }

    if let Some(book) = run.book.as_deref() {
        let slug = resolve_slug(book).ok_or_else(|| format!("invalid book reference '{book}'"))?;
        if let Some(action) = run.share {
            let record = state
                .find(&slug)
                .ok_or_else(|| format!("no book with slug '{slug}'"))?;
            println!("{}", share::render(action, record, &run.library_name));
            return Ok(());
        }
        let (next, target) = state.open(&slug);
        state = next;
        if target.is_none() {
            eprintln!(
                "{} '{slug}' is not in the current listing",
                "[WRN]".yellow()
            );
        }
    }

    if run.interactive {
        let session = Session::new(
            &runner,
            state,
            run.library_name.clone(),
            Debouncer::new(run.debounce),
        );
        session
            .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await?;
        return Ok(());
    }

    let rendered = output::render(&state.view(), run.output_format, &run.library_name);
    match run.output.as_deref() {
        Some(path) => {
            write_output(path, &rendered).await?;
            eprintln!("{} wrote {path}", "[INF]".green());
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(&rendered)
                .await
                .map_err(|e| format!("failed to write output: {e}"))?;
            stdout
                .flush()
                .await
                .map_err(|e| format!("failed to write output: {e}"))?;
        }
    }

    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp => {
                print!("{}", render_custom_help());
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    initialize_tracing(args.verbose);

    let user_config_path = args.config.clone().map(|p| config::expand_tilde(&p));
    let config_path = user_config_path.clone().or_else(config::default_config_path);

    if args.init_config {
        let path = config_path.ok_or_else(|| "cannot locate home directory".to_string())?;
        config::ensure_default_config_file(&path)?;
        println!("{}", path.display());
        return Ok(());
    }

    let cfg = match (user_config_path.as_ref(), config_path.as_ref()) {
        (Some(path), _) => config::load_config(path, false)?,
        (None, Some(path)) => config::load_config(path, true)?,
        (None, None) => ConfigFile::default(),
    };

    let run = build_run_config(args, cfg)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))?;
    Ok(())
}
