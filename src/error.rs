//! Error taxonomy for proxy checks.
//!
//! The checker never retries internally; it classifies a failure and hands
//! it back. Callers branch on [`ErrorKind`]: transient failures are worth
//! requeueing the proxy for a later retry, permanent failures disqualify it.

use thiserror::Error;

/// Broad classification of a failed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Temporary infrastructure condition: rate limiting, an anti-bot
    /// interstitial, or a transport-level timeout. The proxy may still be
    /// fine on a later attempt.
    Transient,
    /// The proxy fails the anonymity contract, or the echo site answered
    /// with something unparsable.
    Permanent,
    /// The outbound request could not be built or sent for reasons
    /// unrelated to the proxy's quality.
    Request,
}

/// Failure surfaced by a probe, a strategy, or the checker itself.
#[derive(Debug, Error)]
pub enum CheckError {
    /// A blocked response from the echo service's own infrastructure.
    #[error("{reason}")]
    Transient { reason: &'static str },

    /// The operator's own IP address showed up in the response body.
    #[error("this IP address found")]
    NotAnonymous,

    /// The echo site answered with neither an IP nor the expected marker.
    /// Carries a sanitized, size-capped excerpt of the offending body.
    #[error("invalid response received: {excerpt}")]
    MalformedResponse { excerpt: String },

    /// Wrapper applied at strategy composition boundaries, recording which
    /// pass produced the underlying failure.
    #[error("{phase}: {source}")]
    Phase {
        phase: &'static str,
        #[source]
        source: Box<CheckError>,
    },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid proxy url: {0}")]
    InvalidProxy(#[from] url::ParseError),

    #[error("unknown check strategy {name:?}")]
    UnknownStrategy { name: String },

    /// The startup IP lookup answered without a usable address. Leak
    /// checks would otherwise match every body against an empty string.
    #[error("operator ip lookup returned an empty body")]
    EmptyOperatorIp,
}

impl CheckError {
    pub(crate) fn ratelimit() -> Self {
        Self::Transient {
            reason: "google ratelimit",
        }
    }

    pub(crate) fn captcha() -> Self {
        Self::Transient {
            reason: "cloudflare captcha",
        }
    }

    pub(crate) fn in_phase(self, phase: &'static str) -> Self {
        Self::Phase {
            phase,
            source: Box::new(self),
        }
    }

    /// Error kind, looking through phase wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transient { .. } => ErrorKind::Transient,
            Self::NotAnonymous | Self::MalformedResponse { .. } => ErrorKind::Permanent,
            Self::Phase { source, .. } => source.kind(),
            Self::Http(err) if err.is_timeout() => ErrorKind::Transient,
            Self::Http(_)
            | Self::InvalidProxy(_)
            | Self::UnknownStrategy { .. }
            | Self::EmptyOperatorIp => ErrorKind::Request,
        }
    }

    /// Whether the same proxy is worth a later retry.
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}
