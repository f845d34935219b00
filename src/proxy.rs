//! Link rewriting for forwarding proxies.
//!
//! A forwarding proxy prefix names its target site in one of two ways:
//!
//! - **embedded scheme**: the prefix ends with a complete URL, as in
//!   `https://proxy.example/view/http://target.com`
//! - **separated segments**: scheme and host are two consecutive path
//!   segments, as in `https://proxy.example/123/https/target.com`
//!
//! The convention is detected once per prefix ([`WebProxy::parse`]); the
//! embedded form is always tried first. Rewriting never produces a doubled
//! slash at the junction between prefix and path.

/// Length of `http://`. An embedded scheme must start past this offset so the
/// proxy's own leading scheme is never mistaken for the target.
const MIN_SCHEME_LEN: usize = "http://".len();

/// Embedded-scheme markers, in detection order.
const EMBEDDED_MARKERS: [&str; 2] = ["/https://", "/http://"];

/// Path segments that introduce a separated-segments target.
const SCHEME_SEGMENTS: [&str; 2] = ["http", "https"];

/// Number of `/`-separated parts taken by the proxy's own `scheme://host`.
const PROXY_ORIGIN_PARTS: usize = 3;

/// The site a proxy prefix forwards to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyTarget {
    pub scheme: String,
    /// Host, plus any base path carried by an embedded-scheme prefix.
    pub authority: String,
}

impl ProxyTarget {
    /// `scheme://authority`
    pub fn url(&self) -> String {
        format!("{}://{}", self.scheme, self.authority)
    }
}

/// A forwarding proxy prefix with its addressing convention resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebProxy {
    /// `prefix[split..]` is `/` followed by the embedded target URL.
    EmbeddedScheme { prefix: String, split: usize },
    /// Segment `index` of `prefix.split('/')` is the target scheme.
    SeparatedSegments { prefix: String, index: usize },
    /// Neither convention matched; absolute links pass through unchanged.
    Unrecognized { prefix: String },
}

impl WebProxy {
    /// Detects the addressing convention of `prefix`.
    ///
    /// Trailing slashes are ignored.
    pub fn parse(prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');

        for marker in EMBEDDED_MARKERS {
            if let Some(split) = prefix.rfind(marker) {
                if split > MIN_SCHEME_LEN {
                    return WebProxy::EmbeddedScheme {
                        prefix: prefix.to_owned(),
                        split,
                    };
                }
            }
        }

        let index = prefix
            .split('/')
            .enumerate()
            .skip(PROXY_ORIGIN_PARTS)
            .find(|(_, part)| SCHEME_SEGMENTS.contains(part))
            .map(|(i, _)| i);

        match index {
            Some(index) => WebProxy::SeparatedSegments {
                prefix: prefix.to_owned(),
                index,
            },
            None => WebProxy::Unrecognized {
                prefix: prefix.to_owned(),
            },
        }
    }

    /// The prefix without trailing slashes.
    pub fn prefix(&self) -> &str {
        match self {
            WebProxy::EmbeddedScheme { prefix, .. }
            | WebProxy::SeparatedSegments { prefix, .. }
            | WebProxy::Unrecognized { prefix } => prefix,
        }
    }

    /// The site this proxy forwards to, if the prefix names one.
    pub fn target(&self) -> Option<ProxyTarget> {
        match self {
            WebProxy::EmbeddedScheme { prefix, split } => {
                let (scheme, authority) = prefix[split + 1..].split_once("://")?;
                Some(ProxyTarget {
                    scheme: scheme.to_owned(),
                    authority: authority.to_owned(),
                })
            }
            WebProxy::SeparatedSegments { prefix, index } => {
                let mut parts = prefix.split('/').skip(*index);
                let scheme = parts.next()?;
                let host = parts.next()?;
                Some(ProxyTarget {
                    scheme: scheme.to_owned(),
                    authority: host.to_owned(),
                })
            }
            WebProxy::Unrecognized { .. } => None,
        }
    }

    /// Appends a site-relative path to the prefix.
    pub fn join(&self, relative: &str) -> String {
        join(self.prefix(), relative)
    }

    /// Re-encodes an absolute URL of any host under this proxy's convention.
    ///
    /// Returns the URL unchanged when the convention is unrecognized.
    pub fn convert_absolute(&self, absolute: &str) -> String {
        match self {
            WebProxy::EmbeddedScheme { prefix, split } => {
                format!("{}/{}", &prefix[..*split], absolute)
            }
            WebProxy::SeparatedSegments { prefix, index } => {
                let Some((scheme, rest)) = absolute.split_once("://") else {
                    tracing::debug!(url = %absolute, "Link has no authority, leaving it unproxied");
                    return absolute.to_owned();
                };
                let base = prefix.split('/').take(*index).collect::<Vec<_>>().join("/");
                format!("{}/{}/{}", base, scheme.to_ascii_lowercase(), rest)
            }
            WebProxy::Unrecognized { prefix } => {
                tracing::debug!(
                    proxy = %prefix,
                    url = %absolute,
                    "Unable to determine proxy convention, returning original URL"
                );
                absolute.to_owned()
            }
        }
    }

    /// Routes an item link through the proxy.
    ///
    /// Relative links are joined to the prefix. Absolute links on the target
    /// site keep their path under the prefix; links to any other host are
    /// re-encoded with [`WebProxy::convert_absolute`].
    pub fn rewrite_link(&self, link: &str) -> String {
        if !has_scheme(link) {
            if let Some(rest) = link.strip_prefix("//") {
                let scheme = self
                    .target()
                    .map(|t| t.scheme)
                    .unwrap_or_else(|| "https".to_owned());
                return self.rewrite_link(&format!("{scheme}://{rest}"));
            }
            return self.join(link);
        }

        if let Some(target) = self.target() {
            if let Some(path) = strip_site(link, &target.url()) {
                return self.join(if path.is_empty() { "/" } else { path });
            }
        }

        self.convert_absolute(link)
    }
}

/// Extracts the target site named by a proxy prefix.
pub fn extract_target(prefix: &str) -> Option<ProxyTarget> {
    WebProxy::parse(prefix).target()
}

/// Concatenates a proxy prefix and a relative path with exactly one slash
/// between them.
pub fn join(prefix: &str, relative: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if relative.starts_with('/') {
        format!("{prefix}{relative}")
    } else {
        format!("{prefix}/{relative}")
    }
}

/// Re-encodes `absolute` under the convention of `prefix`.
pub fn convert_absolute_to_proxy(prefix: &str, absolute: &str) -> String {
    WebProxy::parse(prefix).convert_absolute(absolute)
}

/// True when `link` starts with a URL scheme (`letter *(letter / digit / "+" / "-" / ".") ":"`).
fn has_scheme(link: &str) -> bool {
    let Some((scheme, _)) = link.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Strips `site` from the front of `link` when the remainder stays on that
/// site (empty, or starting a path, query or fragment).
fn strip_site<'a>(link: &'a str, site: &str) -> Option<&'a str> {
    let rest = link.strip_prefix(site)?;
    if rest.is_empty() || rest.starts_with(['/', '?', '#']) {
        Some(rest)
    } else {
        None
    }
}
