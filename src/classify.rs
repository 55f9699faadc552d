//! Response body classification.
//!
//! Decides, from a raw echo-site body, whether a proxied request looked
//! anonymous. Rules run in a fixed order because the signal strings can
//! co-occur: a blocked interstitial must classify as transient even when it
//! happens to contain the operator's IP somewhere in its markup.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CheckError;

/// Body emitted when Google's cache layer refuses to serve the proxy.
const RATELIMIT_MARKER: &str = "client does not have permission to get URL";

/// Anti-bot interstitials name their vendor.
const CHALLENGE_MARKER: &str = "Cloudflare";

/// Byte budget for body excerpts embedded in error messages.
const EXCERPT_CAP: usize = 512;

/// A line that is exactly one bare IPv4 address, nothing else.
static IP_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}$").expect("invalid IP line regex")
});

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("invalid tag regex"));

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("invalid whitespace regex"));

/// Classify one response body against a probe's validation rule.
///
/// An empty `expect` means the body must be a bare IPv4 address on a line of
/// its own; a non-empty `expect` is a case-sensitive marker the body must
/// contain. Matching always runs against the unmodified body; sanitization
/// applies only to the text carried in error messages.
pub(crate) fn validate(body: &str, expect: &str, operator_ip: &str) -> Result<(), CheckError> {
    if body.contains(RATELIMIT_MARKER) {
        return Err(CheckError::ratelimit());
    }
    if body.contains(CHALLENGE_MARKER) {
        return Err(CheckError::captcha());
    }
    if body.contains(operator_ip) {
        return Err(CheckError::NotAnonymous);
    }
    if expect.is_empty() {
        if !IP_LINE.is_match(body) {
            return Err(CheckError::MalformedResponse {
                excerpt: excerpt(body),
            });
        }
        return Ok(());
    }
    if !body.contains(expect) {
        return Err(CheckError::MalformedResponse {
            excerpt: excerpt(body),
        });
    }
    Ok(())
}

/// Display-safe, size-capped rendition of a response body: markup stripped,
/// whitespace collapsed, truncated at [`EXCERPT_CAP`] bytes.
fn excerpt(body: &str) -> String {
    let stripped = TAG.replace_all(body, "");
    let collapsed = WHITESPACE.replace_all(stripped.trim(), " ");
    truncate(&collapsed)
}

fn truncate(text: &str) -> String {
    if text.len() <= EXCERPT_CAP {
        return text.to_string();
    }
    let mut cut = EXCERPT_CAP;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{} ({}b more)", &text[..cut], text.len() - cut)
}
