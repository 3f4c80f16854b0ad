//! HTTP handlers, one module per resource.

pub mod bookings;
pub mod events;
pub mod health;
