use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{PhotoError, PhotoSource, PlaceQuery};

const UNSPLASH_SEARCH_URL: &str = "https://api.unsplash.com/search/photos";
const SOURCE_NAME: &str = "Unsplash";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<UnsplashPhoto>,
}

#[derive(Debug, Deserialize)]
struct UnsplashPhoto {
    urls: PhotoUrls,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: String,
}

/// Keyword search, one landscape result.
pub struct UnsplashSource {
    client: Client,
    access_key: String,
}

impl UnsplashSource {
    pub fn new(client: Client, access_key: String) -> Self {
        Self { client, access_key }
    }
}

#[async_trait]
impl PhotoSource for UnsplashSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn find_photo(&self, query: &PlaceQuery) -> Result<Option<String>, PhotoError> {
        let http = |source| PhotoError::Http {
            source_name: SOURCE_NAME,
            source,
        };

        let keywords = query.keywords();
        let response = self
            .client
            .get(UNSPLASH_SEARCH_URL)
            .query(&[
                ("query", keywords.as_str()),
                ("orientation", "landscape"),
                ("per_page", "1"),
                ("client_id", self.access_key.as_str()),
            ])
            .send()
            .await
            .map_err(http)?;

        if !response.status().is_success() {
            return Err(PhotoError::Status {
                source_name: SOURCE_NAME,
                status: response.status().as_u16(),
            });
        }

        let parsed: SearchResponse = response.json().await.map_err(http)?;
        Ok(first_regular_url(parsed))
    }
}

fn first_regular_url(response: SearchResponse) -> Option<String> {
    response
        .results
        .into_iter()
        .next()
        .map(|photo| photo.urls.regular)
        .filter(|url| !url.is_empty())
}
