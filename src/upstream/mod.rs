use async_trait::async_trait;

use crate::captions::{CaptionTrack, VideoId};

pub mod youtube;

pub use youtube::YoutubeCaptionService;

/// Errors talking to the upstream captions service
#[derive(thiserror::Error, Debug)]
pub enum UpstreamError {
    #[error("Rate limited by upstream (HTTP 429)")]
    RateLimited,

    #[error("Upstream rejected the request: HTTP {0}")]
    Rejected(u16),

    #[error("Upstream server error: HTTP {0}")]
    ServerError(u16),

    #[error("Video unavailable: {0}")]
    Unavailable(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),
}

impl UpstreamError {
    /// Whether retrying the same request later could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            UpstreamError::RateLimited | UpstreamError::ServerError(_) => true,
            UpstreamError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            UpstreamError::Rejected(_)
            | UpstreamError::Unavailable(_)
            | UpstreamError::InvalidResponse(_) => false,
        }
    }
}

/// Caption tracks discovered for a video
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackListing {
    pub title: Option<String>,
    pub tracks: Vec<CaptionTrack>,
}

/// The upstream captions service, as seen by the acquisition strategies
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionService: Send + Sync {
    /// List every caption track of a video
    async fn list_tracks(&self, video_id: &VideoId) -> Result<TrackListing, UpstreamError>;

    /// Fetch a listed track, machine-translated when `translate_to` is set
    async fn fetch_track(
        &self,
        track: &CaptionTrack,
        translate_to: Option<String>,
    ) -> Result<String, UpstreamError>;

    /// Fetch one language directly, bypassing the listing.
    ///
    /// Returns `Ok(None)` when the endpoint has no data for that language.
    async fn fetch_direct(
        &self,
        video_id: &VideoId,
        language: &str,
    ) -> Result<Option<String>, UpstreamError>;
}
