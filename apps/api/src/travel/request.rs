//! Validation of the incoming plan request.

use chrono::{DateTime, NaiveDate, Utc};

use crate::errors::AppError;
use crate::models::travel::TravelPlanRequest;

/// A request that passed validation, with the trip length already computed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    pub total_days: u32,
    pub budget: Option<f64>,
}

pub fn validate_request(request: TravelPlanRequest) -> Result<ValidatedRequest, AppError> {
    let non_blank = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    let (Some(start_date), Some(end_date), Some(destination)) = (
        non_blank(request.start_date),
        non_blank(request.end_date),
        non_blank(request.destination),
    ) else {
        return Err(AppError::Validation(
            "Missing required fields: startDate, endDate, destination".to_string(),
        ));
    };

    let start = parse_date(&start_date)
        .ok_or_else(|| AppError::Validation(format!("Invalid startDate: {start_date}")))?;
    let end = parse_date(&end_date)
        .ok_or_else(|| AppError::Validation(format!("Invalid endDate: {end_date}")))?;

    if start >= end {
        return Err(AppError::Validation(
            "End date must be after start date".to_string(),
        ));
    }

    if let Some(budget) = request.budget {
        if budget <= 0.0 || !budget.is_finite() {
            return Err(AppError::Validation(
                "Budget must be greater than 0 if provided".to_string(),
            ));
        }
    }

    Ok(ValidatedRequest {
        destination,
        start_date,
        end_date,
        total_days: total_days(start, end),
        budget: request.budget,
    })
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Whole days between the two instants, rounding partial days up.
fn total_days(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    const SECONDS_PER_DAY: i64 = 24 * 60 * 60;
    let seconds = (end - start).num_seconds().max(0);
    let days = (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY;
    u32::try_from(days).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(start: &str, end: &str, budget: Option<f64>) -> TravelPlanRequest {
        TravelPlanRequest {
            destination: Some("Paris, France".to_string()),
            start_date: Some(start.to_string()),
            end_date: Some(end.to_string()),
            budget,
        }
    }

    fn message(err: AppError) -> String {
        err.to_string()
    }

    #[test]
    fn test_total_days_for_paris_trip() {
        let validated = validate_request(request("2025-06-01", "2025-06-03", None)).unwrap();
        assert_eq!(validated.total_days, 2);
        assert!(validated.budget.is_none());
    }

    #[test]
    fn test_end_before_or_equal_start_is_rejected() {
        for (start, end) in [("2025-06-03", "2025-06-01"), ("2025-06-01", "2025-06-01")] {
            let err = validate_request(request(start, end, None)).unwrap_err();
            assert_eq!(message(err), "End date must be after start date");
        }
    }

    #[test]
    fn test_zero_or_negative_budget_is_rejected() {
        for budget in [0.0, -50.0] {
            let err = validate_request(request("2025-06-01", "2025-06-03", Some(budget))).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[test]
    fn test_positive_budget_is_kept() {
        let validated =
            validate_request(request("2025-06-01", "2025-06-05", Some(1500.0))).unwrap();
        assert_eq!(validated.budget, Some(1500.0));
        assert_eq!(validated.total_days, 4);
    }

    #[test]
    fn test_missing_fields() {
        let err = validate_request(TravelPlanRequest {
            destination: Some("  ".to_string()),
            start_date: Some("2025-06-01".to_string()),
            end_date: Some("2025-06-03".to_string()),
            budget: None,
        })
        .unwrap_err();
        assert_eq!(
            message(err),
            "Missing required fields: startDate, endDate, destination"
        );
    }

    #[test]
    fn test_rfc3339_partial_day_rounds_up() {
        let validated = validate_request(request(
            "2025-06-01T10:00:00Z",
            "2025-06-03T12:00:00Z",
            None,
        ))
        .unwrap();
        assert_eq!(validated.total_days, 3);
    }

    #[test]
    fn test_unparseable_date_is_rejected() {
        let err = validate_request(request("June 1st", "2025-06-03", None)).unwrap_err();
        assert!(message(err).contains("Invalid startDate"));
    }
}
