//! Plan pipeline: prompt → provider chain → recovery → validation → photos.

use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::{GenerationOptions, ProviderChain};
use crate::models::travel::TravelPlan;
use crate::photos::PhotoEnricher;
use crate::travel::prompts::build_plan_messages;
use crate::travel::recovery::{recover_json, RecoveryStage};
use crate::travel::request::ValidatedRequest;
use crate::travel::validation::validate_plan;

/// Plans are long; low temperature keeps names and coordinates factual.
pub const PLAN_OPTIONS: GenerationOptions = GenerationOptions {
    max_tokens: 4000,
    temperature: 0.1,
};

pub async fn generate_plan(
    llm: &ProviderChain,
    photos: &PhotoEnricher,
    request: ValidatedRequest,
) -> Result<TravelPlan, AppError> {
    info!(
        "Generating {}-day plan for {} (budget: {})",
        request.total_days,
        request.destination,
        request
            .budget
            .map(|b| b.to_string())
            .unwrap_or_else(|| "none".to_string())
    );

    let messages = build_plan_messages(&request);
    let completion = llm.generate(&messages, None, &PLAN_OPTIONS).await?;
    info!(
        "Plan text received from {} ({}, {} chars)",
        completion.provider,
        completion.model,
        completion.content.len()
    );

    let recovered = recover_json(&completion.content)?;
    match recovered.stage {
        RecoveryStage::Strict => {}
        RecoveryStage::Repaired => warn!("Plan JSON needed repair before parsing"),
        RecoveryStage::RestaurantsDropped => {
            warn!("Plan JSON only parsed after dropping the restaurants array")
        }
    }

    let mut plan = validate_plan(recovered.value, &request)?;
    photos.enrich(&mut plan).await;

    info!(
        "Plan ready: {} destinations, {} hotels, {} restaurants",
        plan.itinerary.len(),
        plan.hotels.len(),
        plan.restaurants.len()
    );
    Ok(plan)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::json;

    /// A plausible model answer for a two-day Paris trip, out of order.
    pub fn paris_plan_json() -> String {
        json!({
            "destination": "Paris",
            "startDate": "2025-06-01",
            "endDate": "2025-06-03",
            "totalDays": 3,
            "currency": "eur",
            "estimatedTotalCost": "1,250",
            "itinerary": [
                {
                    "title": "Louvre Museum",
                    "description": "The world's largest art museum.",
                    "coordinates": {"latitude": 48.860611, "longitude": 2.337644},
                    "visitOrder": 3,
                    "estimatedDuration": "3 hours",
                    "imageUrl": null,
                    "price": 17,
                    "ticketLink": "https://www.louvre.fr"
                },
                {
                    "title": "Eiffel Tower",
                    "description": "Iron lattice tower on the Champ de Mars.",
                    "coordinates": {"latitude": 48.858370, "longitude": 2.294481},
                    "visitOrder": 1,
                    "estimatedDuration": "2 hours",
                    "imageUrl": null,
                    "price": 29.4,
                    "ticketLink": null
                },
                {
                    "title": "Musée d'Orsay",
                    "description": "Impressionist masterpieces in a former railway station.",
                    "coordinates": {"latitude": 48.859961, "longitude": 2.326561},
                    "visitOrder": 2,
                    "estimatedDuration": "2 hours",
                    "imageUrl": null,
                    "price": 16,
                    "ticketLink": null
                }
            ],
            "hotels": [
                {
                    "name": "Hotel Lutetia",
                    "description": "Art deco palace on the Left Bank.",
                    "coordinates": {"latitude": 48.851, "longitude": 2.327},
                    "bookingLinks": {
                        "booking": "https://www.booking.com/hotel/fr/lutetia.html",
                        "expedia": "N/A",
                        "agoda": "N/A",
                        "hotels": "N/A"
                    },
                    "estimatedPrice": 650
                },
                {
                    "name": "Hilton Paris",
                    "description": "Guessed from a chain name.",
                    "bookingLinks": {"booking": "N/A", "expedia": "N/A", "agoda": "N/A", "hotels": "N/A"},
                    "estimatedPrice": 300
                }
            ],
            "selectedHotelIndex": 0,
            "restaurants": [
                {
                    "name": "Le Comptoir du Relais",
                    "description": "Classic bistro in Saint-Germain.",
                    "cuisine": "French",
                    "priceRange": "$$$",
                    "coordinates": {"latitude": 48.852, "longitude": 2.338},
                    "rating": 4.4,
                    "website": null,
                    "imageUrl": null
                }
            ],
            "recommendations": ["Buy a Navigo pass", "Book the Louvre in advance"]
        })
        .to_string()
    }
}
