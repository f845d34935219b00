//! Full-text feed pipeline.
//!
//! Downloads a feed (or scrapes a page with custom rules), replaces each
//! item's summary with the article text from its page within a time and item
//! budget, and renders the result as RSS, JSON, CSV or HTML.
//!
//! ```no_run
//! use fullfeed::{CacheHandle, Config, Options, Pipeline, TextEncoding};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let pipeline = Pipeline::from_config(&config, CacheHandle::new(config.cache_capacity))?;
//! let rss = pipeline
//!     .process("https://example.com/feed", &Options::default(), TextEncoding::Utf8)
//!     .await?;
//! println!("{rss}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod content;
pub mod enrich;
pub mod error;
pub mod feed;
pub mod format;
pub mod pipeline;
pub mod proxy;
pub mod util;

pub use config::{Config, ConfigError, Limits, Options, Order, OutputFormat};
pub use error::PipelineError;
pub use feed::{CacheHandle, Feed, Item};
pub use format::TextEncoding;
pub use pipeline::Pipeline;
