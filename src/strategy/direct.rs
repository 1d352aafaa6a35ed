use async_trait::async_trait;
use std::sync::Arc;

use super::{parse_fetched, AcquisitionStrategy, Acquired, FailureKind, StrategyFailure, StrategyKind, StrategyOutcome};
use crate::captions::VideoId;
use crate::upstream::CaptionService;

/// Request fixed languages from the single-fetch endpoint without listing first.
///
/// Listing is sometimes blocked while direct fetches still succeed.
pub struct DirectFetchStrategy {
    service: Arc<dyn CaptionService>,
    languages: Vec<String>,
}

impl DirectFetchStrategy {
    pub fn new(service: Arc<dyn CaptionService>, languages: Vec<String>) -> Self {
        Self { service, languages }
    }
}

#[async_trait]
impl AcquisitionStrategy for DirectFetchStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DirectFetch
    }

    async fn attempt(&self, video_id: &VideoId) -> StrategyOutcome {
        let mut failure: Option<StrategyFailure> = None;

        for language in &self.languages {
            let outcome = match self.service.fetch_direct(video_id, language).await {
                Ok(None) => {
                    tracing::debug!("No direct captions in '{}' for {}", language, video_id);
                    continue;
                }
                Ok(Some(payload)) => match parse_fetched(&payload) {
                    Ok(cues) => {
                        return StrategyOutcome::Success(Acquired {
                            cues,
                            language: Some(language.clone()),
                            title: None,
                        })
                    }
                    Err(outcome) => outcome,
                },
                Err(e) => StrategyOutcome::from_upstream(&format!("direct fetch '{}'", language), &e),
            };

            if let StrategyOutcome::Fail(this) = outcome {
                // Keep the most retry-worthy failure
                let replace = match &failure {
                    None => true,
                    Some(previous) => previous.kind != FailureKind::Transient,
                };
                if replace {
                    failure = Some(this);
                }
            }
        }

        match failure {
            Some(failure) => StrategyOutcome::Fail(failure),
            None => StrategyOutcome::Skip(format!(
                "no direct captions for any of {}",
                self.languages.join(", ")
            )),
        }
    }
}
