use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::error;
use url::Url;

use super::{PhotoError, PhotoSource, PlaceQuery};

const PLACES_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";
const SOURCE_NAME: &str = "Google Places";
/// Location bias radius around the model's coordinates, in metres.
const SEARCH_RADIUS_M: u32 = 5000;
const PHOTO_MAX_WIDTH: u32 = 800;

const REQUEST_DENIED_HELP: &str = "Google Places returned REQUEST_DENIED. This usually means:\n\
    1. The Places API is not enabled in Google Cloud Console\n\
    2. GOOGLE_PLACES_API_KEY is invalid or restricted\n\
    3. The key has no Places API permission\n\
    See https://console.cloud.google.com/apis/library/places-backend.googleapis.com";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<PlaceResult>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    place_id: String,
    #[serde(default)]
    photos: Vec<PlacePhoto>,
}

#[derive(Debug, Deserialize)]
struct PlacePhoto {
    photo_reference: String,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    #[serde(default)]
    result: Option<DetailsResult>,
}

#[derive(Debug, Deserialize)]
struct DetailsResult {
    #[serde(default)]
    photos: Vec<PlacePhoto>,
}

/// Text search biased to the place's coordinates, then place details when
/// the search hit carries no photo.
pub struct GooglePlacesSource {
    client: Client,
    api_key: String,
}

impl GooglePlacesSource {
    pub fn new(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }

    async fn search(&self, query: &PlaceQuery) -> Result<Option<PlaceResult>, PhotoError> {
        let mut params = vec![
            ("query", query.name.clone()),
            ("key", self.api_key.clone()),
        ];
        if let Some(c) = query.coordinates.filter(|c| c.is_valid()) {
            params.push(("location", format!("{},{}", c.latitude, c.longitude)));
            params.push(("radius", SEARCH_RADIUS_M.to_string()));
        }

        let response: SearchResponse = self
            .get_json(&format!("{PLACES_BASE_URL}/textsearch/json"), &params)
            .await?;
        check_status(&response.status)?;
        Ok(response.results.into_iter().next())
    }

    async fn details_photo(&self, place_id: &str) -> Result<Option<String>, PhotoError> {
        let params = [
            ("place_id", place_id.to_string()),
            ("fields", "photos".to_string()),
            ("key", self.api_key.clone()),
        ];
        let response: DetailsResponse = self
            .get_json(&format!("{PLACES_BASE_URL}/details/json"), &params)
            .await?;
        check_status(&response.status)?;
        Ok(response
            .result
            .and_then(|r| r.photos.into_iter().next())
            .map(|p| p.photo_reference))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, PhotoError> {
        let http = |source| PhotoError::Http {
            source_name: SOURCE_NAME,
            source,
        };
        let response = self.client.get(url).query(params).send().await.map_err(http)?;
        if !response.status().is_success() {
            return Err(PhotoError::Status {
                source_name: SOURCE_NAME,
                status: response.status().as_u16(),
            });
        }
        response.json::<T>().await.map_err(http)
    }

    fn photo_url(&self, photo_reference: &str) -> String {
        photo_url(photo_reference, &self.api_key)
    }
}

#[async_trait]
impl PhotoSource for GooglePlacesSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn find_photo(&self, query: &PlaceQuery) -> Result<Option<String>, PhotoError> {
        let Some(place) = self.search(query).await? else {
            return Ok(None);
        };

        if let Some(photo) = place.photos.first() {
            return Ok(Some(self.photo_url(&photo.photo_reference)));
        }

        let reference = self.details_photo(&place.place_id).await?;
        Ok(reference.map(|r| self.photo_url(&r)))
    }
}

/// `OK` and `ZERO_RESULTS` are normal answers; anything else is an error.
fn check_status(status: &str) -> Result<(), PhotoError> {
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        other => {
            if other == "REQUEST_DENIED" {
                error!("{REQUEST_DENIED_HELP}");
            }
            Err(PhotoError::Rejected {
                source_name: SOURCE_NAME,
                status: other.to_string(),
            })
        }
    }
}

/// Photo proxy URL the client can load directly.
pub fn photo_url(photo_reference: &str, api_key: &str) -> String {
    let width = PHOTO_MAX_WIDTH.to_string();
    match Url::parse_with_params(
        &format!("{PLACES_BASE_URL}/photo"),
        [
            ("maxwidth", width.as_str()),
            ("photo_reference", photo_reference),
            ("key", api_key),
        ],
    ) {
        Ok(url) => url.into(),
        Err(_) => format!(
            "{PLACES_BASE_URL}/photo?maxwidth={width}&photo_reference={photo_reference}&key={api_key}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_url_shape() {
        assert_eq!(
            photo_url("ATtYBwJ", "secret"),
            "https://maps.googleapis.com/maps/api/place/photo?maxwidth=800&photo_reference=ATtYBwJ&key=secret"
        );
    }

    #[test]
    fn test_search_response_first_photo() {
        let parsed: SearchResponse = serde_json::from_str(
            r#"{"status": "OK", "results": [
                {"place_id": "abc", "name": "Eiffel Tower", "photos": [{"photo_reference": "ref1", "width": 800, "height": 600}]},
                {"place_id": "def"}
            ]}"#,
        )
        .unwrap();
        let first = parsed.results.into_iter().next().unwrap();
        assert_eq!(first.place_id, "abc");
        assert_eq!(first.photos[0].photo_reference, "ref1");
    }

    #[test]
    fn test_zero_results_is_not_an_error() {
        let parsed: SearchResponse =
            serde_json::from_str(r#"{"status": "ZERO_RESULTS", "results": []}"#).unwrap();
        assert!(check_status(&parsed.status).is_ok());
        assert!(parsed.results.is_empty());
    }

    #[test]
    fn test_request_denied_is_rejected() {
        let err = check_status("REQUEST_DENIED").unwrap_err();
        assert!(matches!(err, PhotoError::Rejected { ref status, .. } if status == "REQUEST_DENIED"));
    }

    #[test]
    fn test_details_without_photos() {
        let parsed: DetailsResponse =
            serde_json::from_str(r#"{"status": "OK", "result": {}}"#).unwrap();
        assert!(parsed.result.unwrap().photos.is_empty());
    }
}
