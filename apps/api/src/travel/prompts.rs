// All LLM prompt text for travel plan generation.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::{FACTUALITY_INSTRUCTION, JSON_ONLY_INSTRUCTION};
use crate::llm_client::ChatMessage;
use crate::travel::request::ValidatedRequest;

/// System prompt: a factual planner that refuses to invent places.
pub const PLAN_SYSTEM: &str = "You are a FACTUAL travel planning expert. Your ONLY job is to \
    provide accurate, verified information that travellers will use to make real decisions. \
    RULES: 1) Hotels: include a hotel only if you can verify it exists on booking.com, \
    expedia.com, agoda.com or hotels.com. Never combine a hotel chain name with the city name \
    on the assumption that such a hotel exists. 2) Places: use only real attractions under their \
    exact official names. 3) Coordinates: use only real coordinates, never invented ones. \
    4) When in doubt, EXCLUDE.";

/// Plan prompt template.
/// Replace: {destination}, {start_date}, {end_date}, {total_days}, {budget_text},
///          {hotel_price_note}, {cost_instruction}, {budget_field},
///          {factuality_instruction}, {json_only_instruction}
pub const PLAN_PROMPT_TEMPLATE: &str = r#"Create a detailed travel itinerary for {destination} from {start_date} to {end_date} ({total_days} days) {budget_text}.

{factuality_instruction}

REQUIREMENTS:
1. A day-by-day itinerary with 3-5 destinations per day. Each destination has:
   - title: the EXACT official name of a real attraction in {destination} (e.g. "Eiffel Tower", "Colosseum")
   - description: 2-3 sentences about what actually exists there
   - coordinates: the real latitude/longitude as JSON numbers with 6 decimals (latitude between -90 and 90, longitude between -180 and 180)
   - visitOrder: sequential number starting from 1
   - estimatedDuration: e.g. "2 hours", "Half day", "Full day"
   - imageUrl: null (photos are attached automatically)
   - price: entry price in local currency, or null if free
   - ticketLink: URL to buy tickets, or null
2. 2-3 hotels that you can VERIFY exist in {destination}, each with:
   - name, description (2-3 sentences), coordinates of the real hotel
   - bookingLinks: real, functional URLs for booking, expedia, agoda and hotels; use "N/A" for any link you cannot verify. Never generate fake or generic links.
   - estimatedPrice: price per night in local currency{hotel_price_note}
   WRONG: "Dan Panorama Ashdod" or "Hilton [City]" guessed from a chain name. It is better to return 0 hotels than 1 fictional hotel.
3. The local currency of the destination as an ISO code (EUR, GBP, JPY, USD, ...).
4. {cost_instruction}
5. 5-8 real restaurants with name, description, cuisine, priceRange ("$" to "$$$$"), exact coordinates, rating (1-5), website (or null) and imageUrl (null).
6. 3-5 practical travel tips in "recommendations".

Return a JSON object with this EXACT structure:
{
  "destination": "{destination}",
  "startDate": "{start_date}",
  "endDate": "{end_date}",
  "totalDays": {total_days},{budget_field}
  "estimatedTotalCost": <number>,
  "currency": "<ISO currency code>",
  "itinerary": [
    {
      "title": "<destination name>",
      "description": "<description>",
      "coordinates": {"latitude": <number>, "longitude": <number>},
      "visitOrder": <number>,
      "estimatedDuration": "<duration>",
      "imageUrl": null,
      "price": <number or null>,
      "ticketLink": "<ticket URL or null>"
    }
  ],
  "hotels": [
    {
      "name": "<hotel name>",
      "description": "<hotel description>",
      "coordinates": {"latitude": <number>, "longitude": <number>},
      "bookingLinks": {
        "booking": "<booking.com URL or N/A>",
        "expedia": "<expedia.com URL or N/A>",
        "agoda": "<agoda.com URL or N/A>",
        "hotels": "<hotels.com URL or N/A>"
      },
      "estimatedPrice": <number>
    }
  ],
  "selectedHotelIndex": 0,
  "restaurants": [
    {
      "name": "<restaurant name>",
      "description": "<restaurant description>",
      "cuisine": "<cuisine type>",
      "priceRange": "<$ or $$ or $$$ or $$$$>",
      "coordinates": {"latitude": <number>, "longitude": <number>},
      "rating": <number 1-5>,
      "website": "<website URL or null>",
      "imageUrl": null
    }
  ],
  "recommendations": ["<tip 1>", "<tip 2>"]
}

{json_only_instruction}"#;

/// Builds the system + user messages for a plan request.
pub fn build_plan_messages(request: &ValidatedRequest) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(PLAN_SYSTEM),
        ChatMessage::user(build_plan_prompt(request)),
    ]
}

pub fn build_plan_prompt(request: &ValidatedRequest) -> String {
    let (budget_text, hotel_price_note, cost_instruction, budget_field) = match request.budget {
        Some(budget) => {
            let budget = format_amount(budget);
            (
                format!("with a budget of ${budget} USD"),
                format!(", realistic for the destination and a total budget of ${budget}"),
                format!(
                    "estimatedTotalCost: the total trip cost in local currency, close to but under the budget of ${budget}"
                ),
                format!("\n  \"budget\": {budget},"),
            )
        }
        None => (
            "without a specific budget constraint (focus on quality experiences and give realistic price estimates)"
                .to_string(),
            ", realistic for the destination".to_string(),
            "estimatedTotalCost: the total trip cost in local currency based on realistic prices for activities, hotels and restaurants"
                .to_string(),
            String::new(),
        ),
    };

    PLAN_PROMPT_TEMPLATE
        .replace("{factuality_instruction}", FACTUALITY_INSTRUCTION)
        .replace("{json_only_instruction}", JSON_ONLY_INSTRUCTION)
        .replace("{budget_text}", &budget_text)
        .replace("{hotel_price_note}", &hotel_price_note)
        .replace("{cost_instruction}", &cost_instruction)
        .replace("{budget_field}", &budget_field)
        .replace("{destination}", &request.destination)
        .replace("{start_date}", &request.start_date)
        .replace("{end_date}", &request.end_date)
        .replace("{total_days}", &request.total_days.to_string())
}

/// `1500.0` → `1500`, `1499.5` → `1499.5`.
fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.0}")
    } else {
        amount.to_string()
    }
}
