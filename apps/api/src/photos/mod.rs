//! Photo enrichment for generated plans.
//!
//! Every destination, hotel and restaurant ends up with an `imageUrl`:
//! Google Places first (its hits overwrite whatever the model wrote),
//! Unsplash for the places still missing one, and finally a stable
//! placeholder picked from a small stock set. Lookup failures are logged
//! per place and never fail the plan.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::llm_client::http_client;
use crate::models::travel::{Coordinates, TravelPlan};

pub mod google_places;
pub mod unsplash;

pub use google_places::GooglePlacesSource;
pub use unsplash::UnsplashSource;

const PHOTO_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const BATCH_SIZE: usize = 5;
const BATCH_DELAY: Duration = Duration::from_millis(100);

/// Stock travel images handed out when no source found a photo.
pub const PLACEHOLDER_IMAGES: &[&str] = &[
    "https://images.unsplash.com/photo-1488646953014-85cb44e25828?w=800",
    "https://images.unsplash.com/photo-1469854523086-cc02fe5d8800?w=800",
    "https://images.unsplash.com/photo-1476514525535-07fb3b4ae5f1?w=800",
    "https://images.unsplash.com/photo-1507525428034-b723cf961d3e?w=800",
    "https://images.unsplash.com/photo-1500835556837-99ac94a94552?w=800",
    "https://images.unsplash.com/photo-1530789253388-582c481c54b0?w=800",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceKind {
    Destination,
    Hotel,
    Restaurant,
}

/// One place to find a photo for.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceQuery {
    pub name: String,
    pub coordinates: Option<Coordinates>,
    pub kind: PlaceKind,
    /// The trip destination, e.g. "Paris, France".
    pub location: String,
}

impl PlaceQuery {
    /// Keyword search text: `"{name} {location}"`, with "hotel" or
    /// "restaurant" inserted for those kinds.
    pub fn keywords(&self) -> String {
        match self.kind {
            PlaceKind::Destination => format!("{} {}", self.name, self.location),
            PlaceKind::Hotel => format!("{} hotel {}", self.name, self.location),
            PlaceKind::Restaurant => format!("{} restaurant {}", self.name, self.location),
        }
    }
}

#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("{source_name} request failed: {source}")]
    Http {
        source_name: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{source_name} returned HTTP {status}")]
    Status {
        source_name: &'static str,
        status: u16,
    },

    #[error("{source_name} rejected the request: {status}")]
    Rejected {
        source_name: &'static str,
        status: String,
    },
}

/// A place-photo backend. `Ok(None)` means the place simply has no photo.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn find_photo(&self, query: &PlaceQuery) -> Result<Option<String>, PhotoError>;
}

pub struct PhotoEnricher {
    primary: Option<Arc<dyn PhotoSource>>,
    fallback: Option<Arc<dyn PhotoSource>>,
    batch_size: usize,
    batch_delay: Duration,
}

impl PhotoEnricher {
    pub fn new(
        primary: Option<Arc<dyn PhotoSource>>,
        fallback: Option<Arc<dyn PhotoSource>>,
    ) -> Self {
        Self {
            primary,
            fallback,
            batch_size: BATCH_SIZE,
            batch_delay: BATCH_DELAY,
        }
    }

    /// No external sources: every place gets a placeholder.
    pub fn placeholders_only() -> Self {
        Self::new(None, None)
    }

    /// Builds whichever sources have a key configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = http_client(PHOTO_HTTP_TIMEOUT)?;

        let primary = config.google_places_api_key.as_ref().map(|key| {
            Arc::new(GooglePlacesSource::new(client.clone(), key.clone())) as Arc<dyn PhotoSource>
        });
        let fallback = config.unsplash_access_key.as_ref().map(|key| {
            Arc::new(UnsplashSource::new(client.clone(), key.clone())) as Arc<dyn PhotoSource>
        });

        match (&primary, &fallback) {
            (None, None) => {
                warn!("No photo source keys configured; plans will use placeholder images");
                return Ok(Self::placeholders_only());
            }
            (None, Some(_)) => info!("Photo sources: Unsplash"),
            (Some(_), None) => info!("Photo sources: Google Places"),
            (Some(_), Some(_)) => info!("Photo sources: Google Places -> Unsplash"),
        }

        Ok(Self::new(primary, fallback))
    }

    /// Attaches an image URL to every place in the plan.
    pub async fn enrich(&self, plan: &mut TravelPlan) {
        let queries = place_queries(plan);
        if queries.is_empty() {
            return;
        }

        if let Some(primary) = &self.primary {
            let found = self.lookup_all(primary.as_ref(), &queries).await;
            let hits = found.iter().filter(|f| f.is_some()).count();
            for (slot, url) in image_slots(plan).into_iter().zip(found) {
                if url.is_some() {
                    *slot = url;
                }
            }
            info!("{} found photos for {hits}/{} places", primary.name(), queries.len());
        }

        if let Some(fallback) = &self.fallback {
            let missing: Vec<usize> = image_slots(plan)
                .iter()
                .enumerate()
                .filter(|(_, slot)| !has_image(slot))
                .map(|(i, _)| i)
                .collect();

            if !missing.is_empty() {
                let pending: Vec<PlaceQuery> =
                    missing.iter().map(|&i| queries[i].clone()).collect();
                let found = self.lookup_all(fallback.as_ref(), &pending).await;
                let mut slots = image_slots(plan);
                for (&i, url) in missing.iter().zip(found) {
                    if url.is_some() {
                        *slots[i] = url;
                    }
                }
            }
        }

        for (slot, query) in image_slots(plan).into_iter().zip(&queries) {
            if !has_image(slot) {
                *slot = Some(placeholder_image(&query.name).to_string());
            }
        }
    }

    /// Looks up `queries` in batches, pausing between batches. Results are
    /// returned in query order.
    async fn lookup_all(&self, source: &dyn PhotoSource, queries: &[PlaceQuery]) -> Vec<Option<String>> {
        let mut results = Vec::with_capacity(queries.len());
        let batches: Vec<&[PlaceQuery]> = queries.chunks(self.batch_size.max(1)).collect();

        for (n, batch) in batches.iter().enumerate() {
            if n > 0 {
                tokio::time::sleep(self.batch_delay).await;
            }
            let found = join_all(batch.iter().map(|query| lookup_one(source, query))).await;
            results.extend(found);
        }
        results
    }
}

async fn lookup_one(source: &dyn PhotoSource, query: &PlaceQuery) -> Option<String> {
    match source.find_photo(query).await {
        Ok(Some(url)) => {
            debug!("{} photo found for {}", source.name(), query.name);
            Some(url)
        }
        Ok(None) => {
            debug!("{} has no photo for {}", source.name(), query.name);
            None
        }
        Err(e) => {
            warn!("{} photo lookup failed for {}: {e}", source.name(), query.name);
            None
        }
    }
}

fn has_image(slot: &Option<String>) -> bool {
    slot.as_deref().is_some_and(|url| !url.trim().is_empty())
}

/// Queries for every place, in the same order as `image_slots`.
fn place_queries(plan: &TravelPlan) -> Vec<PlaceQuery> {
    let location = &plan.destination;
    let query = |name: &str, coordinates: Option<Coordinates>, kind| PlaceQuery {
        name: name.to_string(),
        coordinates,
        kind,
        location: location.clone(),
    };

    plan.itinerary
        .iter()
        .map(|d| query(&d.title, Some(d.coordinates), PlaceKind::Destination))
        .chain(
            plan.hotels
                .iter()
                .map(|h| query(&h.name, h.coordinates, PlaceKind::Hotel)),
        )
        .chain(
            plan.restaurants
                .iter()
                .map(|r| query(&r.name, Some(r.coordinates), PlaceKind::Restaurant)),
        )
        .collect()
}

fn image_slots(plan: &mut TravelPlan) -> Vec<&mut Option<String>> {
    plan.itinerary
        .iter_mut()
        .map(|d| &mut d.image_url)
        .chain(plan.hotels.iter_mut().map(|h| &mut h.image_url))
        .chain(plan.restaurants.iter_mut().map(|r| &mut r.image_url))
        .collect()
}

/// Stable stock image for a place name (djb2 over the bytes).
pub fn placeholder_image(name: &str) -> &'static str {
    let hash = name
        .bytes()
        .fold(5381u32, |h, b| h.wrapping_mul(33).wrapping_add(u32::from(b)));
    PLACEHOLDER_IMAGES[hash as usize % PLACEHOLDER_IMAGES.len()]
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// In-memory source keyed by place name. Tracks how many lookups ran
    /// at the same time.
    #[derive(Default)]
    pub struct FakeSource {
        pub photos: HashMap<String, String>,
        pub failing: Vec<String>,
        pub calls: AtomicUsize,
        pub in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
    }

    impl FakeSource {
        pub fn with(photos: &[(&str, &str)]) -> Arc<Self> {
            Arc::new(Self {
                photos: photos
                    .iter()
                    .map(|(name, url)| (name.to_string(), url.to_string()))
                    .collect(),
                ..Default::default()
            })
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PhotoSource for FakeSource {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn find_photo(&self, query: &PlaceQuery) -> Result<Option<String>, PhotoError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.contains(&query.name) {
                return Err(PhotoError::Status {
                    source_name: "fake",
                    status: 500,
                });
            }
            Ok(self.photos.get(&query.name).cloned())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::testing::FakeSource;
    use super::*;
    use crate::models::travel::{BookingLinks, Destination, Hotel, Restaurant};

    fn coords() -> Coordinates {
        Coordinates {
            latitude: 48.8584,
            longitude: 2.2945,
        }
    }

    fn destination(title: &str) -> Destination {
        Destination {
            title: title.to_string(),
            description: String::new(),
            coordinates: coords(),
            visit_order: 1,
            estimated_duration: None,
            image_url: None,
            price: None,
            ticket_link: None,
        }
    }

    fn plan(destinations: &[&str]) -> TravelPlan {
        TravelPlan {
            destination: "Paris, France".to_string(),
            start_date: "2025-06-01".to_string(),
            end_date: "2025-06-03".to_string(),
            total_days: 2,
            budget: None,
            currency: "EUR".to_string(),
            estimated_total_cost: 0.0,
            itinerary: destinations.iter().map(|t| destination(t)).collect(),
            hotels: vec![Hotel {
                name: "Hotel Lutetia".to_string(),
                description: String::new(),
                booking_links: BookingLinks::default(),
                estimated_price: None,
                coordinates: None,
                image_url: Some("https://model.invented/hotel.jpg".to_string()),
            }],
            selected_hotel_index: Some(0),
            restaurants: vec![Restaurant {
                name: "Le Comptoir".to_string(),
                description: String::new(),
                cuisine: None,
                price_range: None,
                coordinates: coords(),
                rating: None,
                website: None,
                image_url: None,
            }],
            recommendations: vec![],
        }
    }

    #[test]
    fn test_keywords_per_kind() {
        let mut query = PlaceQuery {
            name: "Le Comptoir".to_string(),
            coordinates: None,
            kind: PlaceKind::Restaurant,
            location: "Paris, France".to_string(),
        };
        assert_eq!(query.keywords(), "Le Comptoir restaurant Paris, France");
        query.kind = PlaceKind::Hotel;
        assert_eq!(query.keywords(), "Le Comptoir hotel Paris, France");
        query.kind = PlaceKind::Destination;
        assert_eq!(query.keywords(), "Le Comptoir Paris, France");
    }

    #[test]
    fn test_placeholder_is_stable() {
        assert_eq!(placeholder_image("Louvre"), placeholder_image("Louvre"));
        assert!(PLACEHOLDER_IMAGES.contains(&placeholder_image("")));
    }

    #[tokio::test]
    async fn test_primary_overwrites_and_fallback_fills() {
        let primary = FakeSource::with(&[
            ("Eiffel Tower", "https://google/eiffel"),
            ("Hotel Lutetia", "https://google/lutetia"),
        ]);
        let fallback = FakeSource::with(&[("Louvre", "https://unsplash/louvre")]);
        let enricher = PhotoEnricher::new(Some(primary.clone()), Some(fallback.clone()));

        let mut plan = plan(&["Eiffel Tower", "Louvre"]);
        enricher.enrich(&mut plan).await;

        assert_eq!(plan.itinerary[0].image_url.as_deref(), Some("https://google/eiffel"));
        assert_eq!(plan.itinerary[1].image_url.as_deref(), Some("https://unsplash/louvre"));
        assert_eq!(plan.hotels[0].image_url.as_deref(), Some("https://google/lutetia"));
        assert_eq!(
            plan.restaurants[0].image_url.as_deref(),
            Some(placeholder_image("Le Comptoir"))
        );

        assert_eq!(primary.call_count(), 4);
        // Only the two places the primary missed reach the fallback.
        assert_eq!(fallback.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failures_fall_through_to_placeholder() {
        let primary = Arc::new(FakeSource {
            failing: vec!["Eiffel Tower".to_string()],
            ..Default::default()
        });
        let enricher = PhotoEnricher::new(Some(primary), None);

        let mut plan = plan(&["Eiffel Tower"]);
        enricher.enrich(&mut plan).await;

        assert_eq!(
            plan.itinerary[0].image_url.as_deref(),
            Some(placeholder_image("Eiffel Tower"))
        );
    }

    #[tokio::test]
    async fn test_model_image_kept_when_no_source_finds_one() {
        let mut plan = plan(&["Eiffel Tower"]);
        PhotoEnricher::placeholders_only().enrich(&mut plan).await;
        assert_eq!(
            plan.hotels[0].image_url.as_deref(),
            Some("https://model.invented/hotel.jpg")
        );
        assert!(plan.itinerary[0].image_url.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookups_run_in_batches_of_five() {
        let source = FakeSource::with(&[]);
        let enricher = PhotoEnricher::new(Some(source.clone()), None);

        // 10 destinations + 1 hotel + 1 restaurant = 12 places, 3 batches.
        let names: Vec<String> = (0..10).map(|i| format!("Place {i}")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut plan = plan(&names);

        let started = tokio::time::Instant::now();
        enricher.enrich(&mut plan).await;

        assert_eq!(source.call_count(), 12);
        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 5);
        assert!(started.elapsed() >= BATCH_DELAY * 2);
    }
}
