//! Turns decoded text into an openable URL.
//!
//! Text with an authority scheme (`scheme://...`) or one of a few opaque
//! schemes such as `mailto:` is used as-is. A bare domain such as
//! `example.com/page` gets `https://` prepended. Anything else is rejected,
//! including `WIFI:` and `MECARD:` payloads.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::{Error, Result};

/// Alert shown when the decoded text is not a link.
pub const NOT_A_URL_MESSAGE: &str = "This doesn't look like a valid URL.";

/// Schemes that would run script in the opener's place.
const BLOCKED_SCHEMES: &[&str] = &["javascript", "vbscript", "data"];

/// Schemes without an authority part that are still worth opening.
const OPAQUE_SCHEMES: &[&str] = &["mailto", "tel", "sms"];

static AUTHORITY_SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z\d+\-.]*://\S+$").expect("scheme pattern")
});

static BARE_DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z\d]([a-zA-Z\d\-]*[a-zA-Z\d])?\.)+[a-zA-Z]{2,}(:\d{1,5})?([/?#]\S*)?$")
        .expect("domain pattern")
});

/// Resolves decoded text to a URL.
///
/// # Errors
///
/// Returns [`Error::InvalidLinkTarget`] if the text is neither a URL with
/// an explicit scheme nor a bare domain.
pub fn resolve_link(text: &str) -> Result<Url> {
    let text = text.trim();

    let candidate = if BARE_DOMAIN.is_match(text) {
        format!("https://{text}")
    } else if AUTHORITY_SCHEME.is_match(text) || has_opaque_scheme(text) {
        text.to_string()
    } else {
        return Err(Error::invalid_link_target(text));
    };

    let url = Url::parse(&candidate).map_err(|_| Error::invalid_link_target(text))?;
    if BLOCKED_SCHEMES.contains(&url.scheme()) {
        return Err(Error::invalid_link_target(text));
    }

    Ok(url)
}

fn has_opaque_scheme(text: &str) -> bool {
    match text.split_once(':') {
        Some((scheme, rest)) => {
            !rest.is_empty()
                && !rest.contains(char::is_whitespace)
                && OPAQUE_SCHEMES.iter().any(|s| s.eq_ignore_ascii_case(scheme))
        }
        None => false,
    }
}

// ============================================================================
// Tests
// ============================================================================
