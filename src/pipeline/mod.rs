use futures_util::stream::{FuturesUnordered, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::captions::{AcquisitionResult, VideoId};
use crate::config::Config;
use crate::extractors::ytdlp::YtDlpExtractor;
use crate::selector::TrackSelector;
use crate::strategy::{
    AcquisitionStrategy, DirectFetchStrategy, ExternalToolStrategy, ListingStrategy, StrategyChain,
};
use crate::upstream::youtube::YoutubeCaptionService;
use crate::upstream::CaptionService;
use crate::Result;

/// Runs the acquisition chain for one or many videos.
///
/// Cloning is cheap; clones share the chain and the cancellation token.
#[derive(Clone)]
pub struct CaptionEngine {
    chain: Arc<StrategyChain>,
    cancel: CancellationToken,
}

impl CaptionEngine {
    pub fn new(chain: StrategyChain) -> Self {
        Self {
            chain: Arc::new(chain),
            cancel: CancellationToken::new(),
        }
    }

    /// Build the standard chain: structured listing, direct fetch, then yt-dlp
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let service: Arc<dyn CaptionService> = Arc::new(YoutubeCaptionService::new(&config.upstream)?);
        let languages: Vec<String> = config
            .languages
            .ordered_codes()
            .into_iter()
            .map(str::to_string)
            .collect();

        let extractor = Arc::new(YtDlpExtractor::new(&config.tool, languages.clone()));

        let strategies: Vec<Box<dyn AcquisitionStrategy>> = vec![
            Box::new(ListingStrategy::new(
                service.clone(),
                TrackSelector::new(config.languages.clone()),
            )),
            Box::new(DirectFetchStrategy::new(service, languages.clone())),
            Box::new(ExternalToolStrategy::new(
                extractor,
                languages,
                config.app.temp_dir.clone(),
            )),
        ];

        Ok(Self::new(StrategyChain::new(strategies)))
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop starting new strategies and new jobs
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Acquire a transcript for one video
    pub async fn acquire(&self, video_id: &VideoId) -> AcquisitionResult {
        let span = tracing::info_span!("acquire", video = %video_id);
        self.chain.run(video_id, &self.cancel).instrument(span).await
    }

    /// Acquire transcripts for many videos with at most `limit` in flight
    pub async fn acquire_all(&self, video_ids: &[VideoId], limit: usize) -> HashMap<VideoId, AcquisitionResult> {
        self.acquire_all_with(video_ids, limit, |_, _| {}).await
    }

    /// Like [`acquire_all`](Self::acquire_all), calling `on_done` as each video finishes.
    ///
    /// Every identifier gets exactly one result, even if its job panics.
    pub async fn acquire_all_with<F>(
        &self,
        video_ids: &[VideoId],
        limit: usize,
        mut on_done: F,
    ) -> HashMap<VideoId, AcquisitionResult>
    where
        F: FnMut(&VideoId, &AcquisitionResult),
    {
        let semaphore = Arc::new(Semaphore::new(limit.max(1)));
        let mut seen = HashSet::new();
        let mut jobs = FuturesUnordered::new();

        for video_id in video_ids {
            if !seen.insert(video_id.clone()) {
                tracing::debug!("Skipping duplicate identifier {}", video_id);
                continue;
            }

            let engine = self.clone();
            let semaphore = semaphore.clone();
            let id = video_id.clone();

            let handle = tokio::spawn(async move {
                let _permit = tokio::select! {
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return AcquisitionResult::TransientFailure("scheduler closed".to_string()),
                    },
                    _ = engine.cancel.cancelled() => {
                        return AcquisitionResult::TransientFailure("cancelled".to_string());
                    }
                };
                engine.acquire(&id).await
            });

            let id = video_id.clone();
            jobs.push(async move { (id, handle.await) });
        }

        let mut results = HashMap::with_capacity(jobs.len());
        while let Some((video_id, joined)) = jobs.next().await {
            let result = joined.unwrap_or_else(|e| {
                tracing::error!("Job for {} aborted: {}", video_id, e);
                AcquisitionResult::TransientFailure(format!("job aborted: {}", e))
            });
            on_done(&video_id, &result);
            results.insert(video_id, result);
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::Cue;
    use crate::extractors::{CaptionExtractor, ExtractorError};
    use crate::selector::LanguagePreference;
    use crate::strategy::{Acquired, StrategyKind, StrategyOutcome};
    use crate::upstream::{MockCaptionService, TrackListing};
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Succeeds after a short pause, tracking how many attempts overlap
    struct Gauge {
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AcquisitionStrategy for Gauge {
        fn kind(&self) -> StrategyKind {
            StrategyKind::DirectFetch
        }

        async fn attempt(&self, video_id: &VideoId) -> StrategyOutcome {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if video_id.as_str() == "boom" {
                panic!("strategy blew up");
            }

            StrategyOutcome::Success(Acquired {
                cues: vec![Cue::new(Duration::from_secs(1), format!("caption for {}", video_id))],
                language: Some("en".to_string()),
                title: None,
            })
        }
    }

    fn gauge_engine() -> (CaptionEngine, Arc<AtomicUsize>) {
        let peak = Arc::new(AtomicUsize::new(0));
        let gauge = Gauge {
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: peak.clone(),
        };
        (CaptionEngine::new(StrategyChain::new(vec![Box::new(gauge)])), peak)
    }

    #[tokio::test]
    async fn test_batch_respects_limit_and_isolates_panics() {
        let (engine, peak) = gauge_engine();
        let mut ids: Vec<VideoId> = (0..9).map(|i| VideoId::new(format!("vid{}", i))).collect();
        ids.push(VideoId::new("boom"));

        let mut finished = 0;
        let results = engine.acquire_all_with(&ids, 2, |_, _| finished += 1).await;

        assert_eq!(results.len(), 10);
        assert_eq!(finished, 10);
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(matches!(
            results[&VideoId::new("boom")],
            AcquisitionResult::TransientFailure(_)
        ));
        let successes = results.values().filter(|result| result.is_success()).count();
        assert_eq!(successes, 9);
    }

    #[tokio::test]
    async fn test_duplicates_are_processed_once() {
        let (engine, _) = gauge_engine();
        let ids = vec![VideoId::new("a"), VideoId::new("b"), VideoId::new("a")];

        let results = engine.acquire_all(&ids, 4).await;
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_batch_starts_nothing() {
        let (engine, peak) = gauge_engine();
        engine.cancel();

        let ids = vec![VideoId::new("a"), VideoId::new("b")];
        let results = engine.acquire_all(&ids, 1).await;

        assert_eq!(results.len(), 2);
        assert!(results
            .values()
            .all(|result| matches!(result, AcquisitionResult::TransientFailure(_))));
        assert_eq!(peak.load(Ordering::SeqCst), 0);
    }

    struct EmptyExtractor;

    #[async_trait]
    impl CaptionExtractor for EmptyExtractor {
        async fn extract(&self, _video_id: &VideoId, _scratch_dir: &Path) -> std::result::Result<Vec<PathBuf>, ExtractorError> {
            Ok(Vec::new())
        }

        fn tool_name(&self) -> &str {
            "empty"
        }
    }

    #[tokio::test]
    async fn test_video_without_captions_is_not_found() {
        let mut service = MockCaptionService::new();
        service.expect_list_tracks().returning(|_| {
            Ok(TrackListing {
                title: Some("Silent film".to_string()),
                tracks: Vec::new(),
            })
        });
        service.expect_fetch_direct().returning(|_, _| Ok(None));
        let service: Arc<dyn CaptionService> = Arc::new(service);

        let scratch = tempfile::tempdir().unwrap();
        let languages = vec!["zh-Hant".to_string(), "en".to_string()];
        let chain = StrategyChain::new(vec![
            Box::new(ListingStrategy::new(
                service.clone(),
                TrackSelector::new(LanguagePreference::default()),
            )),
            Box::new(DirectFetchStrategy::new(service, languages.clone())),
            Box::new(ExternalToolStrategy::new(
                Arc::new(EmptyExtractor),
                languages,
                Some(scratch.path().to_path_buf()),
            )),
        ]);

        let engine = CaptionEngine::new(chain);
        let result = engine.acquire(&VideoId::new("silent")).await;
        assert!(matches!(result, AcquisitionResult::NotFound));
    }

    #[test]
    fn test_from_config_rejects_invalid_config() {
        let mut config = Config::default();
        config.languages.preferred.clear();
        assert!(CaptionEngine::from_config(&config).is_err());
    }
}
