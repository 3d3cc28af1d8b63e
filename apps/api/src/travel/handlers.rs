use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::travel::{TravelPlan, TravelPlanRequest};
use crate::models::ApiResponse;
use crate::state::AppState;
use crate::travel::planner::generate_plan;
use crate::travel::request::validate_request;

/// POST /api/travel/plan
pub async fn handle_plan(
    State(state): State<AppState>,
    body: Result<Json<TravelPlanRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<TravelPlan>>, AppError> {
    let Json(req) = body.map_err(|e| AppError::Validation(e.body_text()))?;
    let request = validate_request(req)?;

    let span = tracing::info_span!(
        "travel_plan",
        request_id = %Uuid::new_v4(),
        destination = %request.destination
    );
    let plan = generate_plan(&state.llm, &state.photos, request)
        .instrument(span)
        .await?;

    Ok(Json(ApiResponse::ok(plan)))
}
