//! Post-parse validation. Turns the recovered JSON value into a `TravelPlan`,
//! discarding entries the model most likely hallucinated.
//!
//! Whole-plan problems (no destination, no itinerary array) fail the
//! request. Entry-level problems (bad coordinates, hotels without booking
//! links, undecodable objects) only drop that entry.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::travel::{
    lenient_number, Coordinates, Destination, Hotel, Restaurant, TravelPlan,
};
use crate::travel::request::ValidatedRequest;

pub const DEFAULT_CURRENCY: &str = "USD";

/// Chains whose names models like to glue onto whatever city was asked for.
const HOTEL_CHAINS: &[&str] = &[
    "dan panorama",
    "dan hotel",
    "hilton",
    "marriott",
    "sheraton",
    "hyatt",
    "radisson",
    "intercontinental",
    "holiday inn",
    "ramada",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("AI response missing required fields")]
    MissingFields,

    #[error("Itinerary must be an array")]
    ItineraryNotArray,

    #[error("Hotels must be an array")]
    HotelsNotArray,
}

/// Why a hotel was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotelRejection {
    /// No usable booking link.
    NoBookingLinks,
    /// No usable booking link, and the name is a known chain plus the
    /// destination city: the typical invented hotel.
    SuspiciousChainName,
    InvalidCoordinates,
}

impl HotelRejection {
    fn describe(&self) -> &'static str {
        match self {
            HotelRejection::NoBookingLinks => {
                "no booking links available (likely unverified/fictional)"
            }
            HotelRejection::SuspiciousChainName => {
                "appears to be fictional (chain + city name but no booking links)"
            }
            HotelRejection::InvalidCoordinates => "invalid or out of range coordinates",
        }
    }
}

/// Validates and filters a recovered plan. The request's own destination,
/// dates, budget and day count replace whatever the model echoed back.
pub fn validate_plan(value: Value, request: &ValidatedRequest) -> Result<TravelPlan, PlanError> {
    let Value::Object(mut obj) = value else {
        return Err(PlanError::MissingFields);
    };

    let has_destination = obj
        .get("destination")
        .and_then(Value::as_str)
        .is_some_and(|d| !d.trim().is_empty());
    if !has_destination {
        return Err(PlanError::MissingFields);
    }

    let raw_itinerary = match obj.remove("itinerary") {
        Some(Value::Array(items)) => items,
        Some(_) => return Err(PlanError::ItineraryNotArray),
        None => return Err(PlanError::MissingFields),
    };

    promote_single_hotel(&mut obj);

    let raw_hotels = match obj.remove("hotels") {
        Some(Value::Array(items)) => items,
        _ => return Err(PlanError::HotelsNotArray),
    };

    let raw_restaurants = match obj.remove("restaurants") {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };

    let currency = obj
        .get("currency")
        .and_then(Value::as_str)
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    let estimated_total_cost = obj
        .get("estimatedTotalCost")
        .and_then(lenient_number)
        .unwrap_or(0.0);

    let recommendations = match obj.remove("recommendations") {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) if !s.trim().is_empty() => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    let requested_hotel = obj
        .get("selectedHotelIndex")
        .and_then(Value::as_u64)
        .map(|i| i as usize);

    let mut itinerary = decode_entries(raw_itinerary, "destination");
    itinerary.retain(|d: &Destination| {
        keep_coordinates("destination", &d.title, &d.coordinates)
    });
    order_itinerary(&mut itinerary);

    let city = city_of(&request.destination);
    let mut hotels: Vec<Hotel> = decode_entries(raw_hotels, "hotel");
    hotels.retain(|hotel| match assess_hotel(hotel, &city) {
        Ok(()) => true,
        Err(reason) => {
            warn!(
                "Filtering out hotel \"{}\" - {}",
                hotel.name,
                reason.describe()
            );
            false
        }
    });

    let mut restaurants = decode_entries(raw_restaurants, "restaurant");
    restaurants.retain(|r: &Restaurant| {
        keep_coordinates("restaurant", &r.name, &r.coordinates)
    });
    for restaurant in &mut restaurants {
        if restaurant.rating.is_some_and(|r| !(1.0..=5.0).contains(&r)) {
            restaurant.rating = None;
        }
    }

    let selected_hotel_index = match requested_hotel {
        Some(i) if i < hotels.len() => Some(i),
        _ if !hotels.is_empty() => Some(0),
        _ => None,
    };

    info!(
        "Validated plan for {}: {} destinations, {} hotels, {} restaurants",
        request.destination,
        itinerary.len(),
        hotels.len(),
        restaurants.len()
    );

    Ok(TravelPlan {
        destination: request.destination.clone(),
        start_date: request.start_date.clone(),
        end_date: request.end_date.clone(),
        total_days: request.total_days,
        budget: request.budget,
        currency,
        estimated_total_cost,
        itinerary,
        hotels,
        selected_hotel_index,
        restaurants,
        recommendations,
    })
}

/// Older prompts produced a single `hotel` object; treat it as a one-hotel list
/// unless a real `hotels` array is already present.
fn promote_single_hotel(obj: &mut Map<String, Value>) {
    if matches!(obj.get("hotels"), Some(Value::Array(_))) {
        return;
    }
    if let Some(hotel) = obj.remove("hotel") {
        obj.insert("hotels".to_string(), Value::Array(vec![hotel]));
        obj.insert("selectedHotelIndex".to_string(), Value::from(0));
    }
}

/// Decodes each entry on its own so one malformed object only costs itself.
fn decode_entries<T: DeserializeOwned>(items: Vec<Value>, kind: &str) -> Vec<T> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let label = entry_label(&item);
            match serde_json::from_value::<T>(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Invalid {kind} #{i} ({label}), dropping it: {e}");
                    None
                }
            }
        })
        .collect()
}

fn entry_label(item: &Value) -> String {
    item.get("title")
        .or_else(|| item.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("unnamed")
        .to_string()
}

fn keep_coordinates(kind: &str, name: &str, coordinates: &Coordinates) -> bool {
    if coordinates.is_valid() {
        return true;
    }
    warn!(
        "Out of range coordinates for {kind}: {name} ({}, {})",
        coordinates.latitude, coordinates.longitude
    );
    false
}

/// Stable sort by `visitOrder` (entries without one go last), then
/// renumber `1..=n` so gaps left by filtering disappear.
fn order_itinerary(itinerary: &mut [Destination]) {
    itinerary.sort_by_key(|d| (d.visit_order == 0, d.visit_order));
    for (i, destination) in itinerary.iter_mut().enumerate() {
        destination.visit_order = i as u32 + 1;
    }
}

/// Trust check for a single hotel.
pub fn assess_hotel(hotel: &Hotel, city: &str) -> Result<(), HotelRejection> {
    if !hotel.booking_links.has_usable_link() {
        return Err(if is_chain_city_guess(&hotel.name, city) {
            HotelRejection::SuspiciousChainName
        } else {
            HotelRejection::NoBookingLinks
        });
    }

    if let Some(coordinates) = &hotel.coordinates {
        if !coordinates.is_valid() {
            return Err(HotelRejection::InvalidCoordinates);
        }
    }

    Ok(())
}

/// "Hilton Ashdod"-style names: a known chain glued to the destination city.
pub fn is_chain_city_guess(name: &str, city: &str) -> bool {
    let name = name.to_lowercase();
    !city.is_empty()
        && name.contains(city)
        && HOTEL_CHAINS.iter().any(|chain| name.contains(chain))
}

/// Lowercased city part of a destination such as "Ashdod, Israel".
pub fn city_of(destination: &str) -> String {
    destination
        .split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}
