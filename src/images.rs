//! Turns stored image references into something a view can display.
//!
//! The backend hands back whatever was stored: absolute URLs, on-device file
//! paths from the picker, or paths relative to the media host. The raw value
//! stays the source of truth; callers resolve it again on every render.
//!
//! Resolution order:
//! 1. Scheme-qualified references pass through untouched.
//! 2. Absolute or known device-storage paths become `file://` URIs.
//! 3. Anything else is server-relative: each segment is percent-encoded and
//!    joined to the media origin (the API base without its `/api` suffix).

/// Prefixes that already form a complete URI. Matched case-insensitively.
const SCHEME_PREFIXES: &[&str] = &[
    "http://",
    "https://",
    "file://",
    "content://",
    "data:image",
    "asset://",
    "ph://",
    "assets-library://",
];

/// Relative prefixes that still denote on-device storage.
const DEVICE_PATH_PREFIXES: &[&str] = &["storage/", "mnt/", "sdcard/", "emulated/"];

const LOCAL_FILE_SCHEME: &str = "file://";

/// A raw image reference as stored or picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Opaque handle of a bundled asset.
    Asset(u32),
    Reference(String),
}

impl From<&str> for ImageSource {
    fn from(raw: &str) -> Self {
        ImageSource::Reference(raw.to_string())
    }
}

impl From<String> for ImageSource {
    fn from(raw: String) -> Self {
        ImageSource::Reference(raw)
    }
}

/// What a view should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayImage {
    Asset(u32),
    Uri(String),
    /// Nothing to show; render a placeholder.
    NoImage,
}

impl DisplayImage {
    pub fn uri(&self) -> Option<&str> {
        match self {
            DisplayImage::Uri(uri) => Some(uri),
            _ => None,
        }
    }
}

/// Resolver bound to one media origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResolver {
    origin: String,
}

impl ImageResolver {
    /// Build a resolver from the API base URL.
    pub fn new(api_base_url: &str) -> Self {
        Self {
            origin: media_origin(api_base_url),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn resolve(&self, source: &ImageSource) -> DisplayImage {
        match source {
            ImageSource::Asset(handle) => DisplayImage::Asset(*handle),
            ImageSource::Reference(raw) => self.resolve_str(Some(raw)),
        }
    }

    pub fn resolve_str(&self, raw: Option<&str>) -> DisplayImage {
        let raw = match raw.map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => return DisplayImage::NoImage,
        };

        if has_scheme(raw) {
            return DisplayImage::Uri(raw.to_string());
        }

        if raw.starts_with('/') {
            return DisplayImage::Uri(format!("{LOCAL_FILE_SCHEME}{raw}"));
        }
        if starts_with_ignore_case(raw, DEVICE_PATH_PREFIXES) {
            return DisplayImage::Uri(format!("{LOCAL_FILE_SCHEME}/{raw}"));
        }

        let encoded = raw
            .trim_start_matches('/')
            .split('/')
            .map(encode_segment)
            .collect::<Vec<_>>()
            .join("/");
        DisplayImage::Uri(format!("{}/{}", self.origin, encoded))
    }
}

/// Characters `urlencoding` escapes that URI component encoding leaves as-is.
const COMPONENT_SAFE: &[(&str, &str)] = &[
    ("%21", "!"),
    ("%27", "'"),
    ("%28", "("),
    ("%29", ")"),
    ("%2A", "*"),
];

/// Percent-encode one path segment, keeping `!'()*` literal so stored
/// references resolve to the same URL the media host was given.
fn encode_segment(segment: &str) -> String {
    // A literal `%` is always emitted as `%25`, so these patterns cannot
    // straddle an escape.
    COMPONENT_SAFE
        .iter()
        .fold(urlencoding::encode(segment).into_owned(), |acc, &(escaped, raw)| {
            acc.replace(escaped, raw)
        })
}

/// Whether the reference is already a complete URI.
pub fn has_scheme(raw: &str) -> bool {
    starts_with_ignore_case(raw.trim(), SCHEME_PREFIXES)
}

/// Strip trailing slashes and a trailing `/api` segment from the base URL.
fn media_origin(api_base_url: &str) -> String {
    let trimmed = api_base_url.trim().trim_end_matches('/');
    let without_api = match trimmed.len().checked_sub(4) {
        Some(cut) if trimmed.is_char_boundary(cut) && trimmed[cut..].eq_ignore_ascii_case("/api") => {
            &trimmed[..cut]
        }
        _ => trimmed,
    };
    without_api.trim_end_matches('/').to_string()
}

fn starts_with_ignore_case(s: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|prefix| {
        s.len() >= prefix.len()
            && s.is_char_boundary(prefix.len())
            && s[..prefix.len()].eq_ignore_ascii_case(prefix)
    })
}
