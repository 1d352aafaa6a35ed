use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::{CaptionService, TrackListing, UpstreamError};
use crate::captions::{CaptionTrack, TrackOrigin, VideoId};
use crate::config::UpstreamConfig;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    captions: Option<Captions>,
    video_details: Option<VideoDetails>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoDetails {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Captions {
    player_captions_tracklist_renderer: Option<PlayerCaptionsTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerCaptionsTracklistRenderer {
    #[serde(default)]
    caption_tracks: Vec<PlayerCaptionTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerCaptionTrack {
    base_url: String,
    language_code: String,
    /// `asr` for automatic speech recognition tracks
    kind: Option<String>,
    #[serde(default)]
    is_translatable: bool,
}

/// Caption service backed by the video site's player and timedtext endpoints
pub struct YoutubeCaptionService {
    client: Client,
    base_url: Url,
    client_name: String,
    client_version: String,
    api_key: Option<String>,
}

impl YoutubeCaptionService {
    pub fn new(config: &UpstreamConfig) -> crate::Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|_| anyhow::anyhow!("Invalid upstream base URL: {}", config.base_url))?;

        Ok(Self {
            client,
            base_url,
            client_name: config.client_name.clone(),
            client_version: config.client_version.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, UpstreamError> {
        self.base_url
            .join(path)
            .map_err(|e| UpstreamError::InvalidResponse(format!("bad endpoint {}: {}", path, e)))
    }

    /// Build the payload URL for a listed track, forcing the event-stream format
    fn track_url(&self, descriptor: &str, translate_to: Option<&str>) -> Result<Url, UpstreamError> {
        let mut url = self
            .base_url
            .join(descriptor)
            .map_err(|e| UpstreamError::InvalidResponse(format!("bad track URL {}: {}", descriptor, e)))?;

        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != "fmt" && key != "tlang")
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        {
            let mut query = url.query_pairs_mut();
            query.clear();
            for (key, value) in &kept {
                query.append_pair(key, value);
            }
            query.append_pair("fmt", "json3");
            if let Some(language) = translate_to {
                query.append_pair("tlang", language);
            }
        }

        Ok(url)
    }

    async fn get_text(&self, url: Url) -> Result<String, UpstreamError> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        check_status(&response)?;
        Ok(response.text().await?)
    }
}

fn check_status(response: &Response) -> Result<(), UpstreamError> {
    let status = response.status();

    if status.is_success() {
        Ok(())
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        Err(UpstreamError::RateLimited)
    } else if status.is_server_error() {
        Err(UpstreamError::ServerError(status.as_u16()))
    } else {
        Err(UpstreamError::Rejected(status.as_u16()))
    }
}

#[async_trait]
impl CaptionService for YoutubeCaptionService {
    async fn list_tracks(&self, video_id: &VideoId) -> Result<TrackListing, UpstreamError> {
        let mut url = self.endpoint("youtubei/v1/player")?;
        url.query_pairs_mut().append_pair("prettyPrint", "false");
        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair("key", key);
        }

        tracing::debug!("Listing caption tracks for {}", video_id);

        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({
                "context": {
                    "client": {
                        "clientName": self.client_name,
                        "clientVersion": self.client_version,
                        "hl": "en",
                    }
                },
                "videoId": video_id.as_str(),
            }))
            .send()
            .await?;
        check_status(&response)?;

        let player: PlayerResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::InvalidResponse(format!("player response: {}", e)))?;

        if let Some(playability) = &player.playability_status {
            let status = playability.status.as_deref().unwrap_or("OK");
            if status != "OK" {
                let reason = playability.reason.clone().unwrap_or_else(|| status.to_string());
                return Err(UpstreamError::Unavailable(reason));
            }
        }

        let tracks = player
            .captions
            .and_then(|c| c.player_captions_tracklist_renderer)
            .map(|r| r.caption_tracks)
            .unwrap_or_default()
            .into_iter()
            .map(|track| {
                let origin = match track.kind.as_deref() {
                    Some("asr") => TrackOrigin::AutoGenerated,
                    _ => TrackOrigin::Authored,
                };
                CaptionTrack::new(track.language_code, origin, track.is_translatable, track.base_url)
            })
            .collect();

        Ok(TrackListing {
            title: player.video_details.and_then(|d| d.title),
            tracks,
        })
    }

    async fn fetch_track(
        &self,
        track: &CaptionTrack,
        translate_to: Option<String>,
    ) -> Result<String, UpstreamError> {
        let url = self.track_url(&track.fetch_descriptor, translate_to.as_deref())?;
        self.get_text(url).await
    }

    async fn fetch_direct(
        &self,
        video_id: &VideoId,
        language: &str,
    ) -> Result<Option<String>, UpstreamError> {
        let mut url = self.endpoint("api/timedtext")?;
        url.query_pairs_mut()
            .append_pair("v", video_id.as_str())
            .append_pair("lang", language)
            .append_pair("fmt", "json3");

        match self.get_text(url).await {
            Ok(body) if body.trim().is_empty() => Ok(None),
            Ok(body) => Ok(Some(body)),
            Err(UpstreamError::Rejected(404)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service_for(server: &MockServer) -> YoutubeCaptionService {
        let config = UpstreamConfig {
            base_url: format!("{}/", server.uri()),
            ..UpstreamConfig::default()
        };
        YoutubeCaptionService::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_list_tracks_parses_player_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/youtubei/v1/player"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "playabilityStatus": {"status": "OK"},
                "videoDetails": {"title": "A talk"},
                "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
                    {"baseUrl": "/api/timedtext?v=abc&lang=en", "languageCode": "en", "isTranslatable": true},
                    {"baseUrl": "/api/timedtext?v=abc&lang=en&kind=asr", "languageCode": "en", "kind": "asr"}
                ]}}
            })))
            .mount(&server)
            .await;

        let listing = service_for(&server).list_tracks(&VideoId::new("abc")).await.unwrap();
        assert_eq!(listing.title.as_deref(), Some("A talk"));
        assert_eq!(listing.tracks.len(), 2);
        assert_eq!(listing.tracks[0].origin, TrackOrigin::Authored);
        assert!(listing.tracks[0].is_translatable);
        assert_eq!(listing.tracks[1].origin, TrackOrigin::AutoGenerated);
        assert!(!listing.tracks[1].is_translatable);
    }

    #[tokio::test]
    async fn test_list_tracks_without_captions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/youtubei/v1/player"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "playabilityStatus": {"status": "OK"}
            })))
            .mount(&server)
            .await;

        let listing = service_for(&server).list_tracks(&VideoId::new("abc")).await.unwrap();
        assert!(listing.tracks.is_empty());
    }

    #[tokio::test]
    async fn test_list_tracks_unplayable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/youtubei/v1/player"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "playabilityStatus": {"status": "LOGIN_REQUIRED", "reason": "Sign in to confirm"}
            })))
            .mount(&server)
            .await;

        let err = service_for(&server).list_tracks(&VideoId::new("abc")).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Unavailable(ref reason) if reason == "Sign in to confirm"));
    }

    #[tokio::test]
    async fn test_rate_limit_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/youtubei/v1/player"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = service_for(&server).list_tracks(&VideoId::new("abc")).await.unwrap_err();
        assert!(matches!(err, UpstreamError::RateLimited));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_fetch_track_requests_translation_as_event_stream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/timedtext"))
            .and(query_param("lang", "en"))
            .and(query_param("fmt", "json3"))
            .and(query_param("tlang", "zh-Hant"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"events":[]}"#))
            .mount(&server)
            .await;

        let track = CaptionTrack::new(
            "en",
            TrackOrigin::Authored,
            true,
            "/api/timedtext?v=abc&lang=en&fmt=srv3",
        );
        let body = service_for(&server)
            .fetch_track(&track, Some("zh-Hant".to_string()))
            .await
            .unwrap();
        assert_eq!(body, r#"{"events":[]}"#);
    }

    #[tokio::test]
    async fn test_fetch_direct_missing_language() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/timedtext"))
            .and(query_param("lang", "zh-Hant"))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/timedtext"))
            .and(query_param("lang", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"events":[]}"#))
            .mount(&server)
            .await;

        let service = service_for(&server);
        let id = VideoId::new("abc");
        assert_eq!(service.fetch_direct(&id, "zh-Hant").await.unwrap(), None);
        assert!(service.fetch_direct(&id, "en").await.unwrap().is_some());
    }
}
