use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

use fullfeed::{CacheHandle, Config, Options, Pipeline, PipelineError, TextEncoding};

/// Get the config file path (~/.config/fullfeed/config.toml)
fn get_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("fullfeed")
        .join("config.toml"))
}

#[derive(Parser, Debug)]
#[command(
    name = "fullfeed",
    version,
    about = "Turn a summary feed into a full-text feed"
)]
struct Args {
    /// Feed URL (or page URL when custom rules are given)
    url: String,

    /// Config file (default: ~/.config/fullfeed/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(flatten)]
    options: Options,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only the feed
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => get_config_path()?,
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    config.apply_env_overrides();

    let cache = CacheHandle::new(config.cache_capacity);
    let pipeline =
        Pipeline::from_config(&config, cache).context("Failed to build HTTP client")?;

    let output = match pipeline
        .process(&args.url, &args.options, TextEncoding::Utf8)
        .await
    {
        Ok(output) => output,
        Err(e @ PipelineError::InvalidCallback(_)) => {
            eprintln!("Error: {e}");
            eprintln!("Callback names may only contain letters, digits and dots.");
            std::process::exit(2);
        }
        Err(e @ PipelineError::InvalidRules(_)) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{output}").context("Failed to write output")?;

    Ok(())
}
