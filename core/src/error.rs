//! Error taxonomy for inventory, booking, and event lifecycle operations.

use crate::store::StoreError;
use crate::types::{BookingId, EventId, ModerationStatus};
use thiserror::Error;

/// Result type alias for domain operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Business-rule and infrastructure failures surfaced by the domain core.
///
/// Every variant except `Store` is a recovered business-rule rejection that
/// the web boundary maps to a 4xx response; `Store` carries genuine
/// infrastructure failures through to the boundary's 5xx mapping.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Referenced event does not exist.
    #[error("event {0} not found")]
    EventNotFound(EventId),

    /// Referenced booking does not exist.
    #[error("booking {0} not found")]
    BookingNotFound(BookingId),

    /// Caller is not allowed to perform the operation.
    #[error("operation not permitted")]
    Forbidden,

    /// Not enough tickets remain to satisfy the request.
    #[error("insufficient inventory: requested {requested}, remaining {remaining}")]
    InsufficientInventory {
        /// Quantity the caller asked for
        requested: u32,
        /// Tickets still available at rejection time
        remaining: u32,
    },

    /// Event exists but is not in a bookable moderation state.
    #[error("event is not bookable (status: {0})")]
    EventNotBookable(ModerationStatus),

    /// Cancellation requested inside the cutoff window before the event.
    #[error("cancellation window closed: less than {cutoff_hours} hours before the event")]
    CancellationWindowClosed {
        /// Configured cutoff in hours
        cutoff_hours: i64,
    },

    /// Booking was already cancelled; the inventory was returned exactly once.
    #[error("booking {0} is already cancelled")]
    AlreadyCancelled(BookingId),

    /// Ticket quantity must be at least one.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(u32),

    /// Requested capacity would drop below the tickets already held.
    #[error("invalid total: {requested} is below the {held} tickets currently held")]
    InvalidTotal {
        /// Requested new capacity
        requested: u32,
        /// Tickets held by confirmed bookings
        held: u32,
    },

    /// Moderation decisions apply to pending events only.
    #[error("event has already been moderated (status: {0})")]
    AlreadyModerated(ModerationStatus),

    /// Resubmission is only allowed from the declined state.
    #[error("event cannot be resubmitted from status {0}")]
    NotResubmittable(ModerationStatus),

    /// A price computation overflowed.
    #[error("amount overflow")]
    AmountOverflow,

    /// Underlying store failure (conflict retries exhausted, or backend error).
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CoreError {
    /// Returns `true` for business-rule rejections the caller can act on.
    ///
    /// Infrastructure failures (`Store`) are the only non-user errors.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_are_not_user_errors() {
        assert!(!CoreError::Store(StoreError::Conflict).is_user_error());
        assert!(CoreError::Forbidden.is_user_error());
        assert!(
            CoreError::InsufficientInventory {
                requested: 4,
                remaining: 2
            }
            .is_user_error()
        );
    }

    #[test]
    fn display_includes_counts() {
        let err = CoreError::InsufficientInventory {
            requested: 5,
            remaining: 3,
        };
        assert_eq!(
            err.to_string(),
            "insufficient inventory: requested 5, remaining 3"
        );
    }
}
