//! Domain types for the ticketline system.
//!
//! This module contains the value objects and entities shared by the
//! inventory ledger, the booking lifecycle, and the event lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(Uuid);

impl BookingId {
    /// Creates a new random `BookingId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `BookingId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from whole currency units
    #[must_use]
    pub const fn checked_from_units(units: u64) -> Option<Self> {
        match units.checked_mul(100) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Multiplies money by a quantity with overflow checking
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Actors and Roles
// ============================================================================

/// Role attached to an authenticated user.
///
/// Admins are ordinary user records carrying the `admin` role; there is no
/// separate admin credential store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular attendee; can book tickets and manage own bookings
    User,
    /// Event organizer; can submit events and edit the ones they own
    Organizer,
    /// Administrator; can moderate events and act on any booking
    Admin,
}

/// The authenticated caller of a domain operation.
///
/// Produced by the authentication collaborator (`currentUser()`); every
/// authorization check in the booking and event lifecycles runs against it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Authenticated user ID
    pub id: UserId,
    /// Role granted to the user
    pub role: Role,
}

impl Actor {
    /// Creates an actor with the given role
    #[must_use]
    pub const fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    /// Whether this actor holds the admin role
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Whether this actor may create events
    #[must_use]
    pub const fn can_organize(&self) -> bool {
        matches!(self.role, Role::Organizer | Role::Admin)
    }
}

// ============================================================================
// Events
// ============================================================================

/// Moderation state of an event.
///
/// One-way machine: `Pending -> Approved | Declined`, admin-only transition.
/// A declined event may be resubmitted to `Pending` by its organizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    /// Awaiting an admin decision; visible to the organizer and admins only
    Pending,
    /// Publicly listable and bookable
    Approved,
    /// Rejected; visible to the organizer and admins only
    Declined,
}

impl ModerationStatus {
    /// Only approved events accept reservations.
    #[must_use]
    pub const fn is_bookable(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Declined => write!(f, "declined"),
        }
    }
}

/// An admin's moderation decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationDecision {
    /// Approve the event for public listing and booking
    Approved,
    /// Decline the event
    Declined,
}

impl ModerationDecision {
    /// The moderation state this decision resolves to.
    #[must_use]
    pub const fn status(self) -> ModerationStatus {
        match self {
            Self::Approved => ModerationStatus::Approved,
            Self::Declined => ModerationStatus::Declined,
        }
    }
}

/// A ticketed event owned by one organizer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event ID
    pub id: EventId,
    /// Organizer who created (and exclusively owns) the event
    pub organizer_id: UserId,
    /// Event title
    pub title: String,
    /// Event description
    pub description: String,
    /// When the event starts
    pub starts_at: DateTime<Utc>,
    /// Venue / location
    pub location: String,
    /// Category label
    pub category: String,
    /// Optional image reference
    pub image_url: Option<String>,
    /// Base price per standard ticket
    pub ticket_price: Money,
    /// Total ticket capacity
    pub total_tickets: u32,
    /// Tickets not held by a confirmed booking.
    ///
    /// Invariant: `0 <= remaining_tickets <= total_tickets`. Mutated only by
    /// the inventory ledger.
    pub remaining_tickets: u32,
    /// Moderation state
    pub status: ModerationStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Tickets currently held by confirmed bookings.
    #[must_use]
    pub const fn tickets_held(&self) -> u32 {
        self.total_tickets - self.remaining_tickets
    }
}

/// Payload for submitting a new event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventDraft {
    /// Event title
    pub title: String,
    /// Event description
    pub description: String,
    /// When the event starts
    pub starts_at: DateTime<Utc>,
    /// Venue / location
    pub location: String,
    /// Category label
    pub category: String,
    /// Optional image reference
    pub image_url: Option<String>,
    /// Base price per standard ticket
    pub ticket_price: Money,
    /// Total ticket capacity (must be >= 1)
    pub total_tickets: u32,
}

/// Content patch for an existing event.
///
/// All fields optional; `total_tickets` is delegated to the inventory
/// ledger's `resize` rather than written directly.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventPatch {
    /// Updated title
    pub title: Option<String>,
    /// Updated description
    pub description: Option<String>,
    /// Updated start time
    pub starts_at: Option<DateTime<Utc>>,
    /// Updated location
    pub location: Option<String>,
    /// Updated category
    pub category: Option<String>,
    /// Updated image reference
    pub image_url: Option<String>,
    /// Updated base price
    pub ticket_price: Option<Money>,
    /// Updated total capacity (resized through the inventory ledger)
    pub total_tickets: Option<u32>,
}

impl EventPatch {
    /// Whether the patch touches anything besides capacity.
    #[must_use]
    pub const fn has_content_changes(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.starts_at.is_some()
            || self.location.is_some()
            || self.category.is_some()
            || self.image_url.is_some()
            || self.ticket_price.is_some()
    }
}

// ============================================================================
// Bookings
// ============================================================================

/// Ticket tier for a booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketType {
    /// Standard ticket at the event's base price
    Standard,
    /// VIP ticket at twice the base price
    Vip,
}

impl TicketType {
    /// Price multiplier applied to the event's base price.
    #[must_use]
    pub const fn price_multiplier(&self) -> u32 {
        match self {
            Self::Standard => 1,
            Self::Vip => 2,
        }
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Vip => write!(f, "vip"),
        }
    }
}

/// Lifecycle state of a booking.
///
/// Bookings are created directly in `Confirmed` (no payment step is
/// modeled); `Cancelled` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Tickets are held by this booking
    Confirmed,
    /// Tickets have been returned to the event's pool
    Cancelled,
}

/// Contact details captured with a booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    /// Contact name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Optional phone number
    pub phone: Option<String>,
}

/// A user's reservation of tickets against one event.
///
/// Immutable after creation apart from the `status` transition to
/// `Cancelled`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking ID
    pub id: BookingId,
    /// Referenced event (weak reference)
    pub event_id: EventId,
    /// Booking user (weak reference)
    pub user_id: UserId,
    /// Ticket tier
    pub ticket_type: TicketType,
    /// Number of tickets held
    pub quantity: u32,
    /// Price per ticket after the tier multiplier
    pub unit_price: Money,
    /// `quantity * unit_price`
    pub total_amount: Money,
    /// Lifecycle state
    pub status: BookingStatus,
    /// Contact details
    pub contact: ContactInfo,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Whether the booking still holds tickets.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, BookingStatus::Confirmed)
    }
}
