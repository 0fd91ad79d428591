use std::time::Duration;

use serde::Deserialize;

use super::{AudioFeatures, CatalogClient, CatalogError, Result, SavedPage};
use crate::config::CatalogConfig;

/// Largest `ids` list the audio-features endpoint accepts per call.
pub const MAX_FEATURE_IDS: usize = 100;

/// Largest `limit` the saved-tracks endpoint accepts per call.
pub const MAX_SAVED_PAGE: usize = 50;

/// Audio-features endpoint response.
#[derive(Debug, Deserialize)]
struct AudioFeaturesResponse {
    #[serde(default)]
    audio_features: Vec<Option<AudioFeatures>>,
}

/// Blocking client for the Spotify Web API, authenticated with a bearer token
/// obtained elsewhere.
pub struct SpotifyCatalog {
    agent: ureq::Agent,
    api_base: String,
    token: String,
}

impl SpotifyCatalog {
    pub fn new(token: impl Into<String>, config: &CatalogConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();
        Self {
            agent,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}/{endpoint}", self.api_base);
        log::debug!("GET {url} {query:?}");

        let mut request = self
            .agent
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token));
        for (key, value) in query {
            request = request.query(*key, value);
        }

        let mut response = request.call().map_err(|e| classify_failure(endpoint, e))?;
        response
            .body_mut()
            .read_json::<T>()
            .map_err(|e| CatalogError::Decode {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })
    }
}

/// Map a ureq failure onto the catalog error taxonomy.
fn classify_failure(endpoint: &str, error: ureq::Error) -> CatalogError {
    match error {
        ureq::Error::StatusCode(429) => CatalogError::RateLimited {
            endpoint: endpoint.to_string(),
        },
        ureq::Error::StatusCode(status) => CatalogError::Status {
            endpoint: endpoint.to_string(),
            status,
        },
        ureq::Error::Json(e) => CatalogError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        },
        other => CatalogError::Transport {
            endpoint: endpoint.to_string(),
            message: other.to_string(),
        },
    }
}

impl CatalogClient for SpotifyCatalog {
    fn fetch_saved_page(&self, limit: usize, offset: usize) -> Result<SavedPage> {
        self.get_json(
            "me/tracks",
            &[
                ("limit", limit.min(MAX_SAVED_PAGE).to_string()),
                ("offset", offset.to_string()),
            ],
        )
    }

    fn fetch_audio_features(&self, track_ids: &[&str]) -> Result<Vec<Option<AudioFeatures>>> {
        if track_ids.is_empty() {
            return Ok(Vec::new());
        }
        let response: AudioFeaturesResponse =
            self.get_json("audio-features", &[("ids", track_ids.join(","))])?;

        // Pad or trim so positions always line up with the request.
        let mut features = response.audio_features;
        features.resize(track_ids.len(), None);
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_features_response_with_nulls() {
        let json = r#"{"audio_features": [{"valence": 0.4}, null, {"valence": 0.9}]}"#;
        let r: AudioFeaturesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(r.audio_features.len(), 3);
        assert!(r.audio_features[1].is_none());
        assert_eq!(r.audio_features[2].as_ref().unwrap().valence, Some(0.9));
    }

    #[test]
    fn test_classify_rate_limit() {
        let err = classify_failure("me/tracks", ureq::Error::StatusCode(429));
        assert!(matches!(err, CatalogError::RateLimited { .. }));

        let err = classify_failure("me/tracks", ureq::Error::StatusCode(401));
        assert!(matches!(err, CatalogError::Status { status: 401, .. }));
    }

    #[test]
    fn test_api_base_trailing_slash() {
        let config = CatalogConfig {
            api_base: "http://localhost:9/v1/".into(),
            timeout_secs: 1,
        };
        let catalog = SpotifyCatalog::new("t", &config);
        assert_eq!(catalog.api_base, "http://localhost:9/v1");
    }

    #[test]
    fn test_empty_feature_request_skips_network() {
        let config = CatalogConfig {
            api_base: "http://localhost:9/v1".into(),
            timeout_secs: 1,
        };
        let catalog = SpotifyCatalog::new("t", &config);
        assert!(catalog.fetch_audio_features(&[]).unwrap().is_empty());
    }
}
