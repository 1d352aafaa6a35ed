use serde::{Deserialize, Serialize};

use crate::captions::CaptionTrack;

/// Ordered language policy used to pick a caption track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguagePreference {
    /// The desired language in all its regional variants, most preferred first
    pub preferred: Vec<String>,

    /// Lingua-franca codes accepted natively when no preferred track exists
    pub fallback: Vec<String>,

    /// Translation target; defaults to the first preferred code
    pub translate_to: Option<String>,

    /// Accept a non-translatable track in any language as a last resort
    pub accept_untranslated: bool,
}

impl Default for LanguagePreference {
    fn default() -> Self {
        Self {
            preferred: vec!["zh-Hant".to_string(), "zh-TW".to_string(), "zh-HK".to_string()],
            fallback: vec!["en".to_string()],
            translate_to: None,
            accept_untranslated: false,
        }
    }
}

impl LanguagePreference {
    pub fn new(preferred: Vec<String>, fallback: Vec<String>) -> Self {
        Self {
            preferred,
            fallback,
            ..Self::default()
        }
    }

    /// Every natively acceptable code, most preferred first, without duplicates
    pub fn ordered_codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = Vec::new();
        for code in self.preferred.iter().chain(self.fallback.iter()) {
            if !codes.contains(&code.as_str()) {
                codes.push(code);
            }
        }
        codes
    }

    /// Code to request a machine translation into
    pub fn translation_target(&self) -> Option<&str> {
        self.translate_to
            .as_deref()
            .or_else(|| self.preferred.first().map(String::as_str))
            .or_else(|| self.fallback.first().map(String::as_str))
    }
}

/// The chosen track, plus the language it must be translated into, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSelection {
    pub track: CaptionTrack,
    pub translate_to: Option<String>,
}

impl TrackSelection {
    /// Language the fetched payload will be in
    pub fn delivered_language(&self) -> &str {
        self.translate_to
            .as_deref()
            .unwrap_or(&self.track.language_code)
    }
}

/// Pure decision function over a video's caption tracks
pub struct TrackSelector {
    preference: LanguagePreference,
}

impl TrackSelector {
    pub fn new(preference: LanguagePreference) -> Self {
        Self { preference }
    }

    /// Pick the best track.
    ///
    /// 1. A track in one of the preferred codes, walking the preference order; authored
    ///    beats auto-generated for the same code.
    /// 2. Otherwise a translatable track, marked for translation into the most preferred
    ///    code. Fallback-language tracks are tried first, then authored before
    ///    auto-generated, then the lowest language code.
    /// 3. Otherwise a fallback-language track as is.
    /// 4. Otherwise nothing usable, unless `accept_untranslated` is set.
    pub fn select(&self, tracks: &[CaptionTrack]) -> Option<TrackSelection> {
        if let Some(track) = exact_match(tracks, &self.preference.preferred) {
            return Some(TrackSelection {
                track: track.clone(),
                translate_to: None,
            });
        }

        if let Some(target) = self.preference.translation_target() {
            let translatable = tracks
                .iter()
                .filter(|track| track.is_translatable)
                .min_by(|a, b| {
                    self.fallback_rank(a)
                        .cmp(&self.fallback_rank(b))
                        .then_with(|| deterministic_order(a, b))
                });

            if let Some(track) = translatable {
                return Some(TrackSelection {
                    track: track.clone(),
                    translate_to: Some(target.to_string()),
                });
            }
        }

        if let Some(track) = exact_match(tracks, &self.preference.fallback) {
            return Some(TrackSelection {
                track: track.clone(),
                translate_to: None,
            });
        }

        if self.preference.accept_untranslated {
            return tracks
                .iter()
                .min_by(|a, b| deterministic_order(a, b))
                .map(|track| TrackSelection {
                    track: track.clone(),
                    translate_to: None,
                });
        }

        None
    }

    fn fallback_rank(&self, track: &CaptionTrack) -> usize {
        self.preference
            .fallback
            .iter()
            .position(|code| *code == track.language_code)
            .unwrap_or(usize::MAX)
    }
}

fn exact_match<'a>(tracks: &'a [CaptionTrack], codes: &[String]) -> Option<&'a CaptionTrack> {
    codes.iter().find_map(|code| {
        tracks
            .iter()
            .filter(|track| track.language_code == *code)
            .min_by_key(|track| origin_rank(track))
    })
}

fn origin_rank(track: &CaptionTrack) -> u8 {
    if track.is_authored() {
        0
    } else {
        1
    }
}

fn deterministic_order(a: &CaptionTrack, b: &CaptionTrack) -> std::cmp::Ordering {
    origin_rank(a)
        .cmp(&origin_rank(b))
        .then_with(|| a.language_code.cmp(&b.language_code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::TrackOrigin;

    fn track(code: &str, origin: TrackOrigin, translatable: bool) -> CaptionTrack {
        CaptionTrack::new(code, origin, translatable, format!("https://example.test/{}", code))
    }

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn selector(preferred: &[&str], fallback: &[&str]) -> TrackSelector {
        TrackSelector::new(LanguagePreference::new(codes(preferred), codes(fallback)))
    }

    #[test]
    fn test_exact_match_wins_over_translation() {
        let tracks = vec![
            track("en", TrackOrigin::Authored, true),
            track("fr", TrackOrigin::AutoGenerated, true),
            track("zh-Hant", TrackOrigin::AutoGenerated, false),
        ];

        let selection = selector(&["zh-Hant"], &["en"]).select(&tracks).unwrap();
        assert_eq!(selection.track.language_code, "zh-Hant");
        assert_eq!(selection.translate_to, None);
    }

    #[test]
    fn test_falls_back_to_translation() {
        let tracks = vec![track("en", TrackOrigin::Authored, true)];

        let selection = selector(&["zh-Hant"], &["en"]).select(&tracks).unwrap();
        assert_eq!(selection.track.language_code, "en");
        assert_eq!(selection.translate_to.as_deref(), Some("zh-Hant"));
        assert_eq!(selection.delivered_language(), "zh-Hant");
    }

    #[test]
    fn test_fallback_language_used_natively_when_not_translatable() {
        let tracks = vec![
            track("en", TrackOrigin::AutoGenerated, false),
            track("de", TrackOrigin::Authored, false),
        ];

        let selection = selector(&["zh-Hant"], &["en"]).select(&tracks).unwrap();
        assert_eq!(selection.track.language_code, "en");
        assert_eq!(selection.translate_to, None);
    }

    #[test]
    fn test_preference_order_is_respected() {
        let tracks = vec![
            track("zh-HK", TrackOrigin::Authored, true),
            track("zh-TW", TrackOrigin::AutoGenerated, true),
        ];

        let selection = selector(&["zh-Hant", "zh-TW", "zh-HK"], &["en"]).select(&tracks).unwrap();
        assert_eq!(selection.track.language_code, "zh-TW");
    }

    #[test]
    fn test_authored_preferred_for_same_code() {
        let tracks = vec![
            track("en", TrackOrigin::AutoGenerated, true),
            track("en", TrackOrigin::Authored, true),
        ];

        let selection = selector(&["en"], &[]).select(&tracks).unwrap();
        assert_eq!(selection.track.origin, TrackOrigin::Authored);
    }

    #[test]
    fn test_translation_candidate_is_deterministic() {
        let tracks = vec![
            track("ja", TrackOrigin::AutoGenerated, true),
            track("de", TrackOrigin::AutoGenerated, true),
            track("ko", TrackOrigin::Authored, true),
            track("ar", TrackOrigin::Authored, false),
        ];

        let selection = selector(&["zh-Hant"], &[]).select(&tracks).unwrap();
        assert_eq!(selection.track.language_code, "ko");

        let auto_only = &tracks[..2];
        let selection = selector(&["zh-Hant"], &[]).select(auto_only).unwrap();
        assert_eq!(selection.track.language_code, "de");
    }

    #[test]
    fn test_fallback_language_is_preferred_translation_source() {
        let tracks = vec![
            track("de", TrackOrigin::Authored, true),
            track("en", TrackOrigin::AutoGenerated, true),
        ];

        let selection = selector(&["zh-Hant"], &["en"]).select(&tracks).unwrap();
        assert_eq!(selection.track.language_code, "en");
        assert_eq!(selection.translate_to.as_deref(), Some("zh-Hant"));
    }

    #[test]
    fn test_nothing_usable() {
        let tracks = vec![track("de", TrackOrigin::Authored, false)];
        assert!(selector(&["zh-Hant"], &["en"]).select(&tracks).is_none());
        assert!(selector(&["zh-Hant"], &["en"]).select(&[]).is_none());
    }

    #[test]
    fn test_accept_untranslated_last_resort() {
        let mut preference = LanguagePreference::new(codes(&["zh-Hant"]), codes(&["en"]));
        preference.accept_untranslated = true;

        let tracks = vec![track("de", TrackOrigin::Authored, false)];
        let selection = TrackSelector::new(preference).select(&tracks).unwrap();
        assert_eq!(selection.track.language_code, "de");
        assert_eq!(selection.translate_to, None);
    }

    #[test]
    fn test_translation_target_override() {
        let mut preference = LanguagePreference::default();
        assert_eq!(preference.translation_target(), Some("zh-Hant"));

        preference.translate_to = Some("zh-TW".to_string());
        assert_eq!(preference.translation_target(), Some("zh-TW"));
    }

    #[test]
    fn test_ordered_codes_deduplicates() {
        let preference = LanguagePreference::new(codes(&["en", "en-US"]), codes(&["en"]));
        assert_eq!(preference.ordered_codes(), vec!["en", "en-US"]);
    }
}
