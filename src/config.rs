//! Service configuration and per-request options.
//!
//! [`Config`] is loaded once at startup from `~/.config/fullfeed/config.toml`
//! (optional, a missing file yields `Config::default()`) and then patched from
//! `FULLFEED_*` environment variables. [`Options`] is the immutable option
//! record of a single request; it is also the CLI flag surface.
use serde::Deserialize;
use std::convert::Infallible;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Limits
// ============================================================================

/// Work budget of one gather pass, plus fetch tuning.
///
/// Item caps are compared against the 1-based visit index, time caps against
/// seconds elapsed since the gather started. A negative cap disables its test.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Beyond this many items, content is only filled from cache.
    pub soft_items: i64,
    /// After this many seconds, content is only filled from cache.
    pub soft_time_secs: f64,
    /// Items beyond this index are dropped.
    pub hard_items: i64,
    /// Items visited after this many seconds are dropped.
    pub hard_time_secs: f64,
    /// A cached feed younger than this is served without a network round-trip.
    pub freshness_secs: u64,
    /// Timeout applied to every network fetch.
    pub timeout_secs: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            soft_items: 5,
            soft_time_secs: 2.0,
            hard_items: 10,
            hard_time_secs: 2.5,
            freshness_secs: 10 * 60,
            timeout_secs: 4.0,
        }
    }
}

impl Limits {
    /// Falls back to the default timeout when `timeout_secs` is not a
    /// representable duration.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs.max(0.0))
            .unwrap_or_else(|_| Duration::from_secs_f64(Self::default().timeout_secs))
    }

    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }

    /// Resets non-finite time caps and timeout to their defaults.
    fn sanitize(&mut self) {
        let defaults = Self::default();
        for (key, value, default) in [
            ("soft_time_secs", &mut self.soft_time_secs, defaults.soft_time_secs),
            ("hard_time_secs", &mut self.hard_time_secs, defaults.hard_time_secs),
            ("timeout_secs", &mut self.timeout_secs, defaults.timeout_secs),
        ] {
            if !value.is_finite() {
                tracing::warn!(key, value = %value, "Ignoring non-finite limit, using default");
                *value = default;
            }
        }
    }
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level service configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Budgets and fetch tuning.
    pub limits: Limits,

    /// Number of responses kept by the shared fetch cache.
    pub cache_capacity: usize,

    /// User-Agent sent with every request.
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            cache_capacity: 256,
            user_agent: concat!("fullfeed/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = ["limits", "cache_capacity", "user_agent"];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let mut config: Config = toml::from_str(&content)?;
        config.limits.sanitize();
        tracing::info!(
            path = %path.display(),
            hard_items = config.limits.hard_items,
            hard_time_secs = config.limits.hard_time_secs,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Apply `FULLFEED_*` environment overrides on top of the loaded file.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let limits = &mut self.limits;
        override_from(&lookup, "FULLFEED_SOFT_ITEMS", &mut limits.soft_items);
        override_from(&lookup, "FULLFEED_SOFT_TIME", &mut limits.soft_time_secs);
        override_from(&lookup, "FULLFEED_HARD_ITEMS", &mut limits.hard_items);
        override_from(&lookup, "FULLFEED_HARD_TIME", &mut limits.hard_time_secs);
        override_from(&lookup, "FULLFEED_FRESHNESS", &mut limits.freshness_secs);
        override_from(&lookup, "FULLFEED_TIMEOUT", &mut limits.timeout_secs);
        limits.sanitize();
    }
}

fn override_from<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *slot = value,
        Err(_) => tracing::warn!(key = %key, value = %raw, "Ignoring unparseable override"),
    }
}

// ============================================================================
// Request Options
// ============================================================================

/// Item visiting order for a gather pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    /// Feed order (no-op).
    #[default]
    First,
    /// Reversed feed order.
    Last,
    /// Most recently updated/published first.
    Newest,
    /// Least recently updated/published first.
    Oldest,
}

impl FromStr for Order {
    type Err = Infallible;

    /// Unknown values fall back to [`Order::First`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "last" => Order::Last,
            "newest" => Order::Newest,
            "oldest" => Order::Oldest,
            _ => Order::First,
        })
    }
}

/// Serialization of the final feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Rss,
    Json,
    Csv,
    Html,
}

impl FromStr for OutputFormat {
    type Err = Infallible;

    /// Unknown values fall back to [`OutputFormat::Rss`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            "html" => OutputFormat::Html,
            _ => OutputFormat::Rss,
        })
    }
}

/// Options of a single request. Immutable for the duration of a pipeline run.
///
/// Every option is falsy/empty by default.
#[derive(Debug, Clone, Default, PartialEq, clap::Args)]
pub struct Options {
    /// Serve from cache only, never touch the network
    #[arg(long)]
    pub cache: bool,

    /// Bypass cache freshness and refetch everything
    #[arg(long)]
    pub force: bool,

    /// Selector matching each item of an HTML page (enables custom rules)
    #[arg(long)]
    pub items: Option<String>,

    /// Parsing mode for custom rules (html or xml)
    #[arg(long)]
    pub mode: Option<String>,

    /// Rule for the feed title (custom rules)
    #[arg(long)]
    pub title: Option<String>,

    /// Rule for the feed description (custom rules)
    #[arg(long)]
    pub desc: Option<String>,

    /// Rule for each item title (custom rules)
    #[arg(long)]
    pub item_title: Option<String>,

    /// Rule for each item link (custom rules)
    #[arg(long)]
    pub item_link: Option<String>,

    /// Rule for each item content (custom rules)
    #[arg(long)]
    pub item_content: Option<String>,

    /// Rule for each item timestamp (custom rules)
    #[arg(long)]
    pub item_time: Option<String>,

    /// Use the first link of the description as the item link
    #[arg(long)]
    pub firstlink: bool,

    /// Forwarding proxy prefix every item link is routed through
    #[arg(long)]
    pub web_proxy: Option<String>,

    /// Keep only items whose title contains this text
    #[arg(long)]
    pub search: Option<String>,

    /// Merge the description in front of the content
    #[arg(long)]
    pub clip: bool,

    /// Strip links from the content
    #[arg(long)]
    pub nolink: bool,

    /// Clear item links
    #[arg(long)]
    pub noref: bool,

    /// Item order: first, last, newest or oldest
    #[arg(long, default_value = "first")]
    pub order: Order,

    /// Append a promotional item
    #[arg(long)]
    pub ad: bool,

    /// Wrap JSON output in this JSONP callback
    #[arg(long)]
    pub callback: Option<String>,

    /// Output format: rss, json, csv or html
    #[arg(long, default_value = "rss")]
    pub format: OutputFormat,

    /// Pretty-print the output
    #[arg(long)]
    pub indent: bool,

    /// Form-encoded body to POST when fetching the feed
    #[arg(long)]
    pub post: Option<String>,

    /// Replace item links with their final (post-redirect) URL
    #[arg(long)]
    pub resolve: bool,

    /// Leave content fetching to the client, only fix links
    #[arg(long)]
    pub proxy: bool,

    /// Selector (CSS syntax) for the article body of fetched pages
    #[arg(long)]
    pub xpath: Option<String>,
}

impl Options {
    /// The title filter, if one is set and non-empty.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }

    /// The forwarding proxy prefix, if one is set and non-empty.
    pub fn web_proxy_prefix(&self) -> Option<&str> {
        self.web_proxy.as_deref().filter(|s| !s.is_empty())
    }

    /// Custom extraction rules are active.
    pub fn has_custom_rules(&self) -> bool {
        self.items.as_deref().is_some_and(|s| !s.is_empty())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.limits.soft_items, 5);
        assert_eq!(config.limits.soft_time_secs, 2.0);
        assert_eq!(config.limits.hard_items, 10);
        assert_eq!(config.limits.hard_time_secs, 2.5);
        assert_eq!(config.limits.freshness_secs, 600);
        assert_eq!(config.limits.timeout_secs, 4.0);
        assert_eq!(config.cache_capacity, 256);
        assert!(config.user_agent.starts_with("fullfeed/"));
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/fullfeed_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.limits, Limits::default());
    }

    #[test]
    fn test_empty_file_returns_default() {
        let dir = std::env::temp_dir().join("fullfeed_config_test_empty");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "  \n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.cache_capacity, 256);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_limits_use_defaults_for_missing() {
        let dir = std::env::temp_dir().join("fullfeed_config_test_partial");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[limits]\nhard_items = 25\nsoft_time_secs = 0.5\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.limits.hard_items, 25);
        assert_eq!(config.limits.soft_time_secs, 0.5);
        assert_eq!(config.limits.soft_items, 5); // default
        assert_eq!(config.limits.timeout_secs, 4.0); // default

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let dir = std::env::temp_dir().join("fullfeed_config_test_invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "this is not [valid toml").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let dir = std::env::temp_dir().join("fullfeed_config_test_unknown");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "cache_capacity = 8\nnot_a_key = true\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.cache_capacity, 8);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_too_large_file_rejected() {
        let dir = std::env::temp_dir().join("fullfeed_config_test_too_large");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "a".repeat(1_048_577)).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_env_overrides_apply_and_ignore_garbage() {
        let vars: HashMap<&str, &str> = [
            ("FULLFEED_HARD_ITEMS", "-1"),
            ("FULLFEED_SOFT_TIME", "0.25"),
            ("FULLFEED_TIMEOUT", "soon"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.limits.hard_items, -1);
        assert_eq!(config.limits.soft_time_secs, 0.25);
        assert_eq!(config.limits.timeout_secs, 4.0);
    }

    #[test]
    fn test_non_finite_overrides_keep_defaults() {
        let vars: HashMap<&str, &str> = [
            ("FULLFEED_TIMEOUT", "inf"),
            ("FULLFEED_HARD_TIME", "NaN"),
            ("FULLFEED_SOFT_TIME", "-inf"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.limits, Limits::default());
        assert_eq!(config.limits.timeout(), Duration::from_secs(4));
    }

    #[test]
    fn test_non_finite_file_limits_keep_defaults() {
        let dir = std::env::temp_dir().join("fullfeed_config_test_non_finite");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[limits]\ntimeout_secs = inf\nhard_items = 3\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.limits.timeout_secs, 4.0);
        assert_eq!(config.limits.hard_items, 3);
        assert_eq!(config.limits.timeout(), Duration::from_secs(4));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_timeout_never_panics() {
        let limits = Limits {
            timeout_secs: f64::INFINITY,
            ..Limits::default()
        };
        assert_eq!(limits.timeout(), Duration::from_secs(4));

        let limits = Limits {
            timeout_secs: -3.0,
            ..Limits::default()
        };
        assert_eq!(limits.timeout(), Duration::ZERO);
    }

    #[test]
    fn test_order_parsing_is_lenient() {
        assert_eq!("last".parse::<Order>().unwrap(), Order::Last);
        assert_eq!("Newest".parse::<Order>().unwrap(), Order::Newest);
        assert_eq!("oldest".parse::<Order>().unwrap(), Order::Oldest);
        assert_eq!("first".parse::<Order>().unwrap(), Order::First);
        assert_eq!("random".parse::<Order>().unwrap(), Order::First);
    }

    #[test]
    fn test_format_parsing_defaults_to_rss() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!("html".parse::<OutputFormat>().unwrap(), OutputFormat::Html);
        assert_eq!("atom".parse::<OutputFormat>().unwrap(), OutputFormat::Rss);
    }

    #[test]
    fn test_empty_options_are_falsy() {
        let options = Options {
            search: Some(String::new()),
            web_proxy: Some(String::new()),
            items: Some(String::new()),
            ..Options::default()
        };
        assert!(options.search_term().is_none());
        assert!(options.web_proxy_prefix().is_none());
        assert!(!options.has_custom_rules());
    }
}
