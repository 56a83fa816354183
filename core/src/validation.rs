//! Field validators.
//!
//! Pure predicates run at the boundary so that malformed input never reaches
//! the capacity engine or the trigger service.

use crate::error::ValidationError;
use crate::types::{Coordinates, Event, RsvpStatus};

/// Maximum event title length in characters.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum event-change message length in characters.
pub const MAX_CHANGE_MESSAGE_LENGTH: usize = 1000;

/// Maximum invite token length in characters.
pub const MAX_INVITE_TOKEN_LENGTH: usize = 256;

/// Validate a latitude/longitude pair.
///
/// # Errors
///
/// Returns [`ValidationError::LatitudeOutOfRange`] or
/// [`ValidationError::LongitudeOutOfRange`] for values that are not finite or
/// fall outside the valid range.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), ValidationError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(ValidationError::LatitudeOutOfRange(latitude.to_string()));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(ValidationError::LongitudeOutOfRange(longitude.to_string()));
    }
    Ok(())
}

/// Validate an event before it is handed to the engine.
///
/// Capacity needs no check here: it is unsigned, so "non-negative" holds by
/// construction.
///
/// # Errors
///
/// Returns the first violated constraint: empty or overlong title, start not
/// before end, or invalid coordinates.
pub fn validate_event(event: &Event) -> Result<(), ValidationError> {
    validate_text("title", &event.title, MAX_TITLE_LENGTH)?;

    if event.starts_at >= event.ends_at {
        return Err(ValidationError::InvalidTimeRange);
    }

    if let Some(Coordinates {
        latitude,
        longitude,
    }) = event.coordinates
    {
        validate_coordinates(latitude, longitude)?;
    }

    Ok(())
}

/// Validate a status a client asked for.
///
/// `waitlisted` is assigned by the engine, never requested.
///
/// # Errors
///
/// Returns [`ValidationError::StatusNotRequestable`] for `waitlisted`.
pub fn validate_requested_status(status: RsvpStatus) -> Result<(), ValidationError> {
    match status {
        RsvpStatus::Waitlisted => Err(ValidationError::StatusNotRequestable(
            status.as_str().to_string(),
        )),
        RsvpStatus::Going | RsvpStatus::Interested | RsvpStatus::Declined => Ok(()),
    }
}

/// Validate the free-text message attached to an event update.
///
/// # Errors
///
/// Returns an error for an empty or overlong message.
pub fn validate_change_message(message: &str) -> Result<(), ValidationError> {
    validate_text("change message", message, MAX_CHANGE_MESSAGE_LENGTH)
}

/// Validate a group invite token.
///
/// # Errors
///
/// Returns an error for an empty or overlong token, or one containing
/// whitespace or control characters.
pub fn validate_invite_token(token: &str) -> Result<(), ValidationError> {
    if token.is_empty() {
        return Err(ValidationError::Empty {
            field: "invite token",
        });
    }
    if token.chars().count() > MAX_INVITE_TOKEN_LENGTH {
        return Err(ValidationError::TooLong {
            field: "invite token",
            max: MAX_INVITE_TOKEN_LENGTH,
        });
    }
    if token.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ValidationError::InvalidCharacters {
            field: "invite token",
        });
    }
    Ok(())
}

fn validate_text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;
    use chrono::{Duration, Utc};

    #[test]
    fn test_coordinates_bounds() {
        assert!(validate_coordinates(52.23, 21.01).is_ok());
        assert!(validate_coordinates(-90.0, 180.0).is_ok());
        assert!(matches!(
            validate_coordinates(90.5, 0.0),
            Err(ValidationError::LatitudeOutOfRange(_))
        ));
        assert!(matches!(
            validate_coordinates(0.0, -180.1),
            Err(ValidationError::LongitudeOutOfRange(_))
        ));
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
        assert!(validate_coordinates(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_event_time_range() {
        let start = Utc::now();
        let event = Event::builder(UserId::new(), "Run club", start)
            .ends_at(start)
            .build();

        assert_eq!(validate_event(&event), Err(ValidationError::InvalidTimeRange));
    }

    #[test]
    fn test_event_title_rules() {
        let start = Utc::now();
        let blank = Event::builder(UserId::new(), "   ", start).build();
        assert_eq!(
            validate_event(&blank),
            Err(ValidationError::Empty { field: "title" })
        );

        let long = Event::builder(UserId::new(), "x".repeat(MAX_TITLE_LENGTH + 1), start).build();
        assert!(matches!(
            validate_event(&long),
            Err(ValidationError::TooLong { field: "title", .. })
        ));
    }

    #[test]
    fn test_event_with_bad_coordinates() {
        let start = Utc::now();
        let event = Event::builder(UserId::new(), "Hike", start)
            .ends_at(start + Duration::hours(5))
            .coordinates(123.0, 0.0)
            .build();

        assert!(matches!(
            validate_event(&event),
            Err(ValidationError::LatitudeOutOfRange(_))
        ));
    }

    #[test]
    fn test_waitlisted_cannot_be_requested() {
        assert!(validate_requested_status(RsvpStatus::Going).is_ok());
        assert!(validate_requested_status(RsvpStatus::Interested).is_ok());
        assert!(validate_requested_status(RsvpStatus::Declined).is_ok());
        assert_eq!(
            validate_requested_status(RsvpStatus::Waitlisted),
            Err(ValidationError::StatusNotRequestable("waitlisted".to_string()))
        );
    }

    #[test]
    fn test_invite_token() {
        assert!(validate_invite_token("abc123-XYZ").is_ok());
        assert!(validate_invite_token("").is_err());
        assert!(validate_invite_token("has space").is_err());
        assert!(validate_invite_token(&"t".repeat(MAX_INVITE_TOKEN_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_change_message() {
        assert!(validate_change_message("Moved to 7pm").is_ok());
        assert!(validate_change_message("").is_err());
    }
}
