//! Small helpers shared by the enrichment passes and the formatters.
//!
//! - **HTML**: anchor lookups and anchor stripping on HTML fragments
//! - **Text**: title-casing and XML-safe text

mod html;
mod text;

pub(crate) use html::{escape_into, VOID_ELEMENTS};
pub use html::{first_bold_href, first_href, labelled_href, unwrap_anchors};
pub use text::{is_upper, strip_control_chars, title_case};
