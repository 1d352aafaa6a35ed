use tokio_util::sync::CancellationToken;

use super::{AcquisitionStrategy, FailureKind, StrategyFailure, StrategyOutcome};
use crate::captions::{AcquisitionResult, Transcript, VideoId};
use crate::normalize::normalize;

/// Ordered strategies, tried one at a time until one yields cues
pub struct StrategyChain {
    strategies: Vec<Box<dyn AcquisitionStrategy>>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn AcquisitionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Run the chain for one video.
    ///
    /// Strategies run strictly in sequence. Cancellation is honoured between strategies
    /// and reported as a transient failure, never as a partial transcript.
    pub async fn run(&self, video_id: &VideoId, cancel: &CancellationToken) -> AcquisitionResult {
        let mut failures: Vec<StrategyFailure> = Vec::new();

        for strategy in &self.strategies {
            if cancel.is_cancelled() {
                tracing::info!("Acquisition of {} cancelled before {}", video_id, strategy.kind().as_str());
                return AcquisitionResult::TransientFailure("cancelled".to_string());
            }

            let kind = strategy.kind();
            tracing::debug!("Trying {} for {}", kind.as_str(), video_id);

            match strategy.attempt(video_id).await {
                StrategyOutcome::Success(acquired) => {
                    let lines = normalize(&acquired.cues);
                    if lines.is_empty() {
                        tracing::debug!("{} returned only blank cues for {}", kind.as_str(), video_id);
                        continue;
                    }

                    tracing::info!(
                        "Got {} transcript lines for {} via {}",
                        lines.len(),
                        video_id,
                        kind.as_str()
                    );

                    return AcquisitionResult::Success(Transcript {
                        video_id: video_id.clone(),
                        title: acquired.title,
                        language: acquired.language,
                        source: kind,
                        retrieved_at: chrono::Utc::now(),
                        lines,
                    });
                }
                StrategyOutcome::Skip(reason) => {
                    tracing::debug!("{} skipped for {}: {}", kind.as_str(), video_id, reason);
                }
                StrategyOutcome::Fail(failure) => {
                    tracing::warn!("{} failed for {}: {}", kind.as_str(), video_id, failure.reason);
                    failures.push(failure);
                }
            }
        }

        classify_exhaustion(failures)
    }
}

/// Pick the caller-facing result once every strategy has declined
fn classify_exhaustion(failures: Vec<StrategyFailure>) -> AcquisitionResult {
    let transient: Vec<String> = failures
        .iter()
        .filter(|failure| failure.kind == FailureKind::Transient)
        .map(|failure| failure.reason.clone())
        .collect();

    if !transient.is_empty() {
        AcquisitionResult::TransientFailure(transient.join("; "))
    } else if failures.iter().any(|failure| failure.kind == FailureKind::Unsupported) {
        AcquisitionResult::Unsupported
    } else {
        AcquisitionResult::NotFound
    }
}
