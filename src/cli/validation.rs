use crate::catalog::SortMode;
use crate::cli::args::CliArgs;
use crate::output::OutputFormat;
use crate::share::ShareAction;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(raw) = args.sort.as_deref() {
        if SortMode::parse(raw).is_none() {
            return Err(format!(
                "invalid --sort '{raw}', expected one of: recent, title-asc, title-desc, author-asc, category, random"
            ));
        }
    }
    if let Some(raw) = args.share.as_deref() {
        if ShareAction::parse(raw).is_none() {
            return Err(format!(
                "invalid --share '{raw}', expected whatsapp, email or copy"
            ));
        }
    }
    if let Some(raw) = args.output_format.as_deref() {
        if OutputFormat::parse(raw).is_none() {
            return Err(format!(
                "invalid --output-format '{raw}', expected text, json or html"
            ));
        }
    }
    if args.page == Some(0) {
        return Err("invalid page, expected positive integer".to_string());
    }
    if args.page_size == Some(0) {
        return Err("invalid page-size, expected positive integer".to_string());
    }
    if args.timeout == Some(0) {
        return Err("invalid timeout, expected positive number of seconds".to_string());
    }
    if args.no_fallback && args.fallback.is_some() {
        return Err("use either --fallback or --no-fallback, not both".to_string());
    }
    if args.no_cache && args.cache_dir.is_some() {
        return Err("use either --cache-dir or --no-cache, not both".to_string());
    }
    if args.interactive && args.output.is_some() {
        return Err("--output cannot be combined with --interactive".to_string());
    }
    Ok(())
}
