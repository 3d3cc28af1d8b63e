//! Travel plan data model, as produced by the LLM and returned to clients.
//!
//! Field names are camelCase on the wire. Optional numbers decode leniently
//! (`12`, `"12.5"`, or anything else as `None`) because models routinely
//! answer "Free" or "N/A" where a price is expected.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Placeholder models use for "no link available".
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Latitude within [-90, 90] and longitude within [-180, 180].
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub coordinates: Coordinates,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub visit_order: u32,
    #[serde(default)]
    pub estimated_duration: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(default)]
    pub ticket_link: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingLinks {
    #[serde(default)]
    pub booking: Option<String>,
    #[serde(default)]
    pub expedia: Option<String>,
    #[serde(default)]
    pub agoda: Option<String>,
    #[serde(default)]
    pub hotels: Option<String>,
}

impl BookingLinks {
    fn all(&self) -> [Option<&str>; 4] {
        [
            self.booking.as_deref(),
            self.expedia.as_deref(),
            self.agoda.as_deref(),
            self.hotels.as_deref(),
        ]
    }

    /// True when at least one link is present, non-blank and not "N/A".
    pub fn has_usable_link(&self) -> bool {
        self.all().into_iter().flatten().any(is_usable_link)
    }
}

fn is_usable_link(link: &str) -> bool {
    let link = link.trim();
    !link.is_empty() && !link.eq_ignore_ascii_case(NOT_AVAILABLE)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_booking_links")]
    pub booking_links: BookingLinks,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub estimated_price: Option<f64>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cuisine: Option<String>,
    #[serde(default)]
    pub price_range: Option<String>,
    pub coordinates: Coordinates,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rating: Option<f64>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelPlan {
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    pub total_days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    pub currency: String,
    pub estimated_total_cost: f64,
    pub itinerary: Vec<Destination>,
    pub hotels: Vec<Hotel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_hotel_index: Option<usize>,
    pub restaurants: Vec<Restaurant>,
    pub recommendations: Vec<String>,
}

/// Incoming body of `POST /api/travel/plan`. Fields are optional so that a
/// missing one yields the API's own validation message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelPlanRequest {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub budget: Option<f64>,
}

/// Number, numeric string, or `None` for anything else.
pub fn lenient_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .trim_start_matches(['$', '€', '£', '¥'])
            .replace(',', "")
            .parse::<f64>()
            .ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_number(&value))
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_number(&value)
        .filter(|n| *n >= 0.0 && *n <= u32::MAX as f64)
        .map(|n| n.round() as u32)
        .unwrap_or(0))
}

/// Booking links must be an object of strings; anything else counts as
/// "no links" rather than failing the hotel outright.
fn lenient_booking_links<'de, D>(deserializer: D) -> Result<BookingLinks, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let link = |key: &str| {
        value
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
    };
    Ok(BookingLinks {
        booking: link("booking"),
        expedia: link("expedia"),
        agoda: link("agoda"),
        hotels: link("hotels"),
    })
}
