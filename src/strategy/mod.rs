//! Acquisition strategies and the chain that tries them in order.
//!
//! Every strategy is total: whatever goes wrong inside it is reported as a tagged
//! [`StrategyOutcome`] rather than an error, so moving on to the next strategy is an
//! explicit transition in [`StrategyChain::run`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::captions::{Cue, VideoId};
use crate::parsers::{self, ParseError};
use crate::upstream::UpstreamError;

pub mod chain;
pub mod direct;
pub mod external;
pub mod listing;

pub use chain::StrategyChain;
pub use direct::DirectFetchStrategy;
pub use external::{ExternalToolStrategy, ScratchDir};
pub use listing::ListingStrategy;

/// Identifies which acquisition method produced a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// List tracks, select one, fetch it
    StructuredListing,
    /// Ask the single-fetch endpoint for fixed languages
    DirectFetch,
    /// Let an external tool download caption files
    ExternalTool,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::StructuredListing => "structured-listing",
            StrategyKind::DirectFetch => "direct-fetch",
            StrategyKind::ExternalTool => "external-tool",
        }
    }
}

/// Cues obtained by a strategy, with what it learned along the way
#[derive(Debug, Clone, Default)]
pub struct Acquired {
    pub cues: Vec<Cue>,
    pub language: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network, rate-limit, timeout or tool crash
    Transient,
    /// A payload arrived in a format with no parser
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyFailure {
    pub kind: FailureKind,
    pub reason: String,
}

impl StrategyFailure {
    pub fn transient(reason: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transient,
            reason: reason.into(),
        }
    }

    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Unsupported,
            reason: reason.into(),
        }
    }
}

/// Result of one strategy attempt
#[derive(Debug, Clone)]
pub enum StrategyOutcome {
    /// Non-empty cues
    Success(Acquired),
    /// Nothing to be had this way; not an error
    Skip(String),
    /// The attempt broke
    Fail(StrategyFailure),
}

impl StrategyOutcome {
    /// Map an upstream error: transient ones fail, the rest mean "not here"
    pub fn from_upstream(context: &str, error: &UpstreamError) -> Self {
        let reason = format!("{}: {}", context, error);
        if error.is_transient() {
            StrategyOutcome::Fail(StrategyFailure::transient(reason))
        } else {
            StrategyOutcome::Skip(reason)
        }
    }
}

/// An alternative way of obtaining cues for a video
#[async_trait]
pub trait AcquisitionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Make one attempt. Must not retry internally.
    async fn attempt(&self, video_id: &VideoId) -> StrategyOutcome;
}

/// Parse a fetched payload, turning parser errors into strategy outcomes
pub(crate) fn parse_fetched(payload: &str) -> Result<Vec<Cue>, StrategyOutcome> {
    if payload.trim().is_empty() {
        return Err(StrategyOutcome::Skip("empty payload".to_string()));
    }

    match parsers::parse_payload(payload) {
        Ok(cues) if cues.is_empty() => Err(StrategyOutcome::Skip("payload contained no cues".to_string())),
        Ok(cues) => Ok(cues),
        Err(ParseError::UnsupportedFormat) => Err(StrategyOutcome::Fail(StrategyFailure::unsupported(
            "payload format has no parser",
        ))),
        Err(e @ ParseError::Malformed(_)) => Err(StrategyOutcome::Fail(StrategyFailure::transient(e.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fetched_classifies() {
        assert!(matches!(parse_fetched("  "), Err(StrategyOutcome::Skip(_))));
        assert!(matches!(parse_fetched(r#"{"events":[]}"#), Err(StrategyOutcome::Skip(_))));
        assert!(matches!(
            parse_fetched("<transcript/>"),
            Err(StrategyOutcome::Fail(StrategyFailure { kind: FailureKind::Unsupported, .. }))
        ));
        assert!(matches!(
            parse_fetched("{\"events\": ["),
            Err(StrategyOutcome::Fail(StrategyFailure { kind: FailureKind::Transient, .. }))
        ));
        assert_eq!(
            parse_fetched(r#"{"events":[{"tStartMs":0,"segs":[{"utf8":"hi"}]}]}"#).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_from_upstream() {
        assert!(matches!(
            StrategyOutcome::from_upstream("listing", &UpstreamError::RateLimited),
            StrategyOutcome::Fail(_)
        ));
        assert!(matches!(
            StrategyOutcome::from_upstream("listing", &UpstreamError::Rejected(403)),
            StrategyOutcome::Skip(_)
        ));
    }
}
