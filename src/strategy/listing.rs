use async_trait::async_trait;
use std::sync::Arc;

use super::{parse_fetched, AcquisitionStrategy, Acquired, StrategyKind, StrategyOutcome};
use crate::captions::VideoId;
use crate::selector::TrackSelector;
use crate::upstream::CaptionService;

/// List every track, let the selector choose, then fetch (and maybe translate) it
pub struct ListingStrategy {
    service: Arc<dyn CaptionService>,
    selector: TrackSelector,
}

impl ListingStrategy {
    pub fn new(service: Arc<dyn CaptionService>, selector: TrackSelector) -> Self {
        Self { service, selector }
    }
}

#[async_trait]
impl AcquisitionStrategy for ListingStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::StructuredListing
    }

    async fn attempt(&self, video_id: &VideoId) -> StrategyOutcome {
        let listing = match self.service.list_tracks(video_id).await {
            Ok(listing) => listing,
            Err(e) => return StrategyOutcome::from_upstream("track listing", &e),
        };

        let Some(selection) = self.selector.select(&listing.tracks) else {
            return StrategyOutcome::Skip(format!(
                "no usable track among {} listed",
                listing.tracks.len()
            ));
        };

        tracing::info!(
            "Selected {} track '{}' for {}{}",
            selection.track.origin.as_str(),
            selection.track.language_code,
            video_id,
            selection
                .translate_to
                .as_deref()
                .map(|target| format!(" (translating to {})", target))
                .unwrap_or_default()
        );

        let payload = match self
            .service
            .fetch_track(&selection.track, selection.translate_to.clone())
            .await
        {
            Ok(payload) => payload,
            Err(e) => return StrategyOutcome::from_upstream("track fetch", &e),
        };

        match parse_fetched(&payload) {
            Ok(cues) => StrategyOutcome::Success(Acquired {
                cues,
                language: Some(selection.delivered_language().to_string()),
                title: listing.title,
            }),
            Err(outcome) => outcome,
        }
    }
}
