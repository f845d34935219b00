//! Output rendering.
//!
//! [`format_output`] picks the serializer: a JSONP callback wins over
//! everything, then the `format` option (`json`, `csv`, `html`, default `rss`).

mod csv;
mod html;
mod json;
mod rss;

use crate::config::{Options, OutputFormat};
use crate::error::PipelineError;
use crate::feed::Feed;

/// How the rendered text will be handed to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEncoding {
    /// Bytes on the wire; XML output carries a declaration.
    #[default]
    Utf8,
    /// An in-memory string; no XML declaration.
    Unicode,
}

/// Checks that a JSONP callback name is `[A-Za-z0-9.]+`.
pub fn validate_callback(name: &str) -> Result<(), PipelineError> {
    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '.');
    if valid {
        Ok(())
    } else {
        Err(PipelineError::InvalidCallback(name.to_owned()))
    }
}

/// Renders `feed` in the format the options ask for.
pub fn format_output(
    feed: &Feed,
    options: &Options,
    encoding: TextEncoding,
) -> Result<String, PipelineError> {
    if let Some(callback) = options.callback.as_deref().filter(|c| !c.is_empty()) {
        validate_callback(callback)?;
        let body = json::render(feed, false).map_err(render_error)?;
        return Ok(format!("{callback}({body})"));
    }

    let rendered = match options.format {
        OutputFormat::Json => json::render(feed, options.indent),
        OutputFormat::Csv => csv::render(feed),
        OutputFormat::Html => html::render(feed, options.indent),
        OutputFormat::Rss => rss::render(feed, options.indent, encoding),
    };

    rendered.map_err(render_error)
}

fn render_error(e: anyhow::Error) -> PipelineError {
    PipelineError::Render(format!("{e:#}"))
}

/// RFC 3339 rendering shared by the text formats.
fn timestamp(time: Option<chrono::DateTime<chrono::Utc>>) -> Option<String> {
    time.map(|t| t.to_rfc3339())
}
