//! Error types for the RSVP service, triggers and dispatcher.

use gatherly_core::{EventId, GroupId, LifecycleError, NotificationId, RsvpError, UserId, ValidationError};
use thiserror::Error;

/// Result type alias for notification and RSVP service operations.
pub type Result<T> = std::result::Result<T, NotifyError>;

/// Failure modes of the service layer.
///
/// Domain errors from `gatherly-core` pass through unchanged; everything else
/// describes a collaborator that could not do its job.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NotifyError {
    // ═══════════════════════════════════════════════════════════
    // Not Found
    // ═══════════════════════════════════════════════════════════
    /// Event does not exist.
    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    /// Group does not exist.
    #[error("Group not found: {0}")]
    GroupNotFound(GroupId),

    /// User does not exist.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// Notification does not exist.
    #[error("Notification not found: {0}")]
    NotificationNotFound(NotificationId),

    // ═══════════════════════════════════════════════════════════
    // Authorization
    // ═══════════════════════════════════════════════════════════
    /// The permission gate refused the action.
    #[error("User {actor} may not {action}")]
    Forbidden {
        /// Acting user
        actor: UserId,
        /// Refused action
        action: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Domain
    // ═══════════════════════════════════════════════════════════
    /// Capacity or waitlist rule violated.
    #[error(transparent)]
    Rsvp(#[from] RsvpError),

    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Illegal notification state transition.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    // ═══════════════════════════════════════════════════════════
    // System
    // ═══════════════════════════════════════════════════════════
    /// Persistence failed.
    #[error("Store error: {0}")]
    StoreError(String),

    /// The outbound channel rejected or failed the message.
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    /// The outbound channel did not answer in time.
    #[error("Delivery timed out after {timeout_ms}ms")]
    DeliveryTimeout {
        /// Per-attempt budget
        timeout_ms: u64,
    },

    /// Rendering failed.
    #[error("Template error: {0}")]
    TemplateError(String),

    /// Internal error (lock poisoning, join failures).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl NotifyError {
    /// Returns `true` for the not-found family.
    ///
    /// ```
    /// # use gatherly_rsvp::NotifyError;
    /// # use gatherly_core::EventId;
    /// assert!(NotifyError::EventNotFound(EventId::new()).is_not_found());
    /// assert!(!NotifyError::StoreError("down".into()).is_not_found());
    /// ```
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EventNotFound(_)
                | Self::GroupNotFound(_)
                | Self::UserNotFound(_)
                | Self::NotificationNotFound(_)
        )
    }

    /// Returns `true` if the caller can fix the request.
    ///
    /// ```
    /// # use gatherly_rsvp::NotifyError;
    /// # use gatherly_core::{RsvpError, UserId};
    /// let err = NotifyError::from(RsvpError::AlreadyRsvped { user_id: UserId::new() });
    /// assert!(err.is_user_error());
    /// assert!(!NotifyError::DeliveryTimeout { timeout_ms: 10 }.is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Rsvp(_) | Self::Validation(_) | Self::Forbidden { .. }
        ) || self.is_not_found()
    }

    /// Returns `true` for delivery-side failures worth a retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::DeliveryFailed(_) | Self::DeliveryTimeout { .. } | Self::StoreError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_convert() {
        let err: NotifyError = LifecycleError::AlreadySent.into();
        assert_eq!(err, NotifyError::Lifecycle(LifecycleError::AlreadySent));
        assert_eq!(err.to_string(), "Notification has already been sent");
    }

    #[test]
    fn test_classifiers() {
        let forbidden = NotifyError::Forbidden {
            actor: UserId::new(),
            action: "rsvp".to_string(),
        };
        assert!(forbidden.is_user_error());
        assert!(!forbidden.is_not_found());
        assert!(NotifyError::DeliveryFailed("smtp 421".into()).is_transient());
        assert!(!NotifyError::InternalError("poisoned".into()).is_user_error());
    }
}
