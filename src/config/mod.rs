use std::env;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ConfigFile {
    #[serde(alias = "url")]
    pub source_url: Option<String>,
    pub fallback: Option<String>,
    pub cache_dir: Option<String>,
    pub no_cache: Option<bool>,
    pub cache_ttl: Option<u64>,
    pub fallback_delay_ms: Option<u64>,
    pub stale_on_error: Option<bool>,
    pub timeout: Option<u64>,
    pub proxy: Option<String>,
    pub page_size: Option<usize>,
    pub recent_window: Option<usize>,
    pub debounce_ms: Option<u64>,
    pub sort: Option<String>,
    pub output: Option<String>,
    pub output_format: Option<String>,
    pub library_name: Option<String>,
    pub no_color: Option<bool>,
}

pub fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
        .or_else(|| {
            let drive = env::var_os("HOMEDRIVE")?;
            let path = env::var_os("HOMEPATH")?;
            Some(PathBuf::from(drive).join(path))
        })
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(home_dir()?.join(".acervo").join("config.yml"))
}

pub fn default_cache_dir() -> Option<PathBuf> {
    Some(home_dir()?.join(".acervo").join("cache"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn expand_tilde_string(path: &str) -> String {
    expand_tilde(path).to_string_lossy().to_string()
}

pub fn load_config(path: &PathBuf, allow_missing: bool) -> Result<ConfigFile, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_yaml::from_str::<ConfigFile>(&contents)
            .map_err(|e| format!("failed to parse config '{}': {e}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("config file not found '{}'", path.display()))
        }
        Err(e) => Err(format!("failed to read config '{}': {e}", path.display())),
    }
}

fn default_config_yaml() -> String {
    r#"# Acervo config
#
# Location (default):
#   ~/.acervo/config.yml

# Source
source_url: https://raw.githubusercontent.com/bibliotecacidrosado/acervovirtual/refs/heads/main/dados.json
# Local path or URL tried once if the source fails
fallback: dados.json
# Delay before the fallback attempt, in milliseconds
fallback_delay_ms: 2000

# HTTP
timeout: 10
# proxy: http://127.0.0.1:8080

# Cache
# cache_dir: ~/.acervo/cache
no_cache: false
# Entry lifetime in seconds
cache_ttl: 300
# Serve an expired entry when every source fails
stale_on_error: false

# Listing
page_size: 10
recent_window: 20
sort: recent
debounce_ms: 150

# Output (optional)
# output: ./catalog.html
# output_format: html
# library_name: Biblioteca Digital
no_color: false
"#
    .to_string()
}

pub fn ensure_default_config_file(path: &PathBuf) -> Result<(), String> {
    if path.exists() {
        return Ok(());
    }
    let parent = path
        .parent()
        .ok_or_else(|| format!("invalid config path '{}'", path.display()))?;
    std::fs::create_dir_all(parent).map_err(|e| {
        format!(
            "failed to create config directory '{}': {e}",
            parent.display()
        )
    })?;
    let contents = default_config_yaml();
    std::fs::write(path, contents)
        .map_err(|e| format!("failed to write config file '{}': {e}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_parses() {
        let cfg: ConfigFile = serde_yaml::from_str(&default_config_yaml()).unwrap();
        assert_eq!(cfg.page_size, Some(10));
        assert_eq!(cfg.cache_ttl, Some(300));
        assert_eq!(cfg.fallback.as_deref(), Some("dados.json"));
        assert_eq!(cfg.sort.as_deref(), Some("recent"));
    }

    #[test]
    fn ensure_writes_once_and_loads() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.yml");
        ensure_default_config_file(&path).unwrap();
        std::fs::write(&path, "url: https://example.com/books.json\npage_size: 12\n").unwrap();
        ensure_default_config_file(&path).unwrap();

        let cfg = load_config(&path, false).unwrap();
        assert_eq!(cfg.source_url.as_deref(), Some("https://example.com/books.json"));
        assert_eq!(cfg.page_size, Some(12));
    }

    #[test]
    fn missing_config_is_an_error_unless_allowed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.yml");
        assert!(load_config(&path, false).is_err());
        assert!(load_config(&path, true).unwrap().page_size.is_none());
    }
}
