//! Event lifecycle: submission, moderation, content edits, visibility.
//!
//! Moderation is a one-way machine, `Pending -> Approved | Declined`, with
//! the admin-only `moderate` transition. A declined event may be resubmitted
//! to `Pending` by its organizer. Moderation has no inventory side effects.

use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::inventory::InventoryLedger;
use crate::store::{EventFilter, TicketStore};
use crate::types::{
    Actor, Event, EventDraft, EventId, EventPatch, ModerationDecision, ModerationStatus,
};
use std::sync::Arc;

/// Manages event documents and their moderation state.
pub struct EventService {
    store: Arc<dyn TicketStore>,
    ledger: Arc<InventoryLedger>,
    clock: Arc<dyn Clock>,
}

impl EventService {
    /// Creates an event service.
    #[must_use]
    pub fn new(
        store: Arc<dyn TicketStore>,
        ledger: Arc<InventoryLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            ledger,
            clock,
        }
    }

    fn can_view(event: &Event, viewer: Option<&Actor>) -> bool {
        if event.status == ModerationStatus::Approved {
            return true;
        }
        viewer.is_some_and(|actor| actor.is_admin() || actor.id == event.organizer_id)
    }

    /// Submit a new event for moderation.
    ///
    /// Organizers and admins only. The event starts in `Pending` with
    /// `remaining_tickets = total_tickets`.
    ///
    /// # Errors
    ///
    /// `Forbidden`, `InvalidTotal` for a zero capacity, or a store failure.
    #[tracing::instrument(skip(self, draft), fields(organizer_id = %actor.id))]
    pub async fn submit(&self, actor: &Actor, draft: EventDraft) -> Result<Event> {
        if !actor.can_organize() {
            return Err(CoreError::Forbidden);
        }
        if draft.total_tickets == 0 {
            return Err(CoreError::InvalidTotal {
                requested: 0,
                held: 0,
            });
        }

        let event = Event {
            id: EventId::new(),
            organizer_id: actor.id,
            title: draft.title,
            description: draft.description,
            starts_at: draft.starts_at,
            location: draft.location,
            category: draft.category,
            image_url: draft.image_url,
            ticket_price: draft.ticket_price,
            total_tickets: draft.total_tickets,
            remaining_tickets: draft.total_tickets,
            status: ModerationStatus::Pending,
            created_at: self.clock.now(),
        };
        self.store.insert_event(&event).await?;
        tracing::info!(event_id = %event.id, "event submitted for moderation");
        Ok(event)
    }

    /// Approve or decline a pending event. Admin only; no inventory side
    /// effects.
    ///
    /// The machine is one-way: only pending events accept a decision, so an
    /// approved or declined event cannot be flipped after the fact. The only
    /// way back to `Pending` is the organizer's `resubmit` of a declined
    /// event.
    ///
    /// # Errors
    ///
    /// `Forbidden`, `EventNotFound`, `AlreadyModerated`, or a store failure.
    #[tracing::instrument(skip(self))]
    pub async fn moderate(
        &self,
        actor: &Actor,
        event_id: EventId,
        decision: ModerationDecision,
    ) -> Result<()> {
        if !actor.is_admin() {
            return Err(CoreError::Forbidden);
        }
        let event = self
            .store
            .fetch_event(event_id)
            .await?
            .ok_or(CoreError::EventNotFound(event_id))?;
        if event.status != ModerationStatus::Pending {
            return Err(CoreError::AlreadyModerated(event.status));
        }
        let updated = self
            .store
            .set_event_status(event_id, decision.status())
            .await?;
        if !updated {
            return Err(CoreError::EventNotFound(event_id));
        }
        tracing::info!(%event_id, status = %decision.status(), "event moderated");
        Ok(())
    }

    /// Edit an event's content fields. Organizer-owner or admin only.
    ///
    /// A `total_tickets` change goes through the ledger's `resize` before any
    /// content field is touched, so a rejected resize leaves the document
    /// untouched.
    ///
    /// # Errors
    ///
    /// `EventNotFound`, `Forbidden`, `InvalidTotal`, or a store failure.
    #[tracing::instrument(skip(self, patch))]
    pub async fn edit_content(
        &self,
        actor: &Actor,
        event_id: EventId,
        patch: EventPatch,
    ) -> Result<Event> {
        let event = self
            .store
            .fetch_event(event_id)
            .await?
            .ok_or(CoreError::EventNotFound(event_id))?;
        if event.organizer_id != actor.id && !actor.is_admin() {
            return Err(CoreError::Forbidden);
        }

        if let Some(new_total) = patch.total_tickets {
            self.ledger.resize(event_id, new_total).await?;
        }
        if patch.has_content_changes() {
            let updated = self.store.update_event_content(event_id, &patch).await?;
            if !updated {
                return Err(CoreError::EventNotFound(event_id));
            }
        }

        self.store
            .fetch_event(event_id)
            .await?
            .ok_or(CoreError::EventNotFound(event_id))
    }

    /// Resubmit a declined event for moderation, resetting it to `Pending`.
    /// Organizer-owner only.
    ///
    /// # Errors
    ///
    /// `EventNotFound`, `Forbidden`, `NotResubmittable`, or a store failure.
    #[tracing::instrument(skip(self))]
    pub async fn resubmit(&self, actor: &Actor, event_id: EventId) -> Result<()> {
        let event = self
            .store
            .fetch_event(event_id)
            .await?
            .ok_or(CoreError::EventNotFound(event_id))?;
        if event.organizer_id != actor.id {
            return Err(CoreError::Forbidden);
        }
        if event.status != ModerationStatus::Declined {
            return Err(CoreError::NotResubmittable(event.status));
        }
        self.store
            .set_event_status(event_id, ModerationStatus::Pending)
            .await?;
        tracing::info!(%event_id, "declined event resubmitted");
        Ok(())
    }

    /// Fetch one event, subject to the visibility rule.
    ///
    /// Approved events are public; pending and declined events are visible
    /// to their organizer and admins only, and surface as `EventNotFound`
    /// to anyone else.
    ///
    /// # Errors
    ///
    /// `EventNotFound` or a store failure.
    pub async fn fetch(&self, viewer: Option<&Actor>, event_id: EventId) -> Result<Event> {
        let event = self
            .store
            .fetch_event(event_id)
            .await?
            .ok_or(CoreError::EventNotFound(event_id))?;
        if !Self::can_view(&event, viewer) {
            return Err(CoreError::EventNotFound(event_id));
        }
        Ok(event)
    }

    /// List events visible to the viewer, optionally narrowed to one
    /// moderation state, newest first.
    ///
    /// # Errors
    ///
    /// Returns a store failure if the read fails.
    pub async fn list(
        &self,
        viewer: Option<&Actor>,
        status: Option<ModerationStatus>,
    ) -> Result<Vec<Event>> {
        let filter = match viewer {
            Some(actor) if actor.is_admin() => EventFilter {
                status,
                organizer_id: None,
                match_any: false,
            },
            Some(actor) if matches!(actor.role, crate::types::Role::Organizer) => EventFilter {
                status: Some(ModerationStatus::Approved),
                organizer_id: Some(actor.id),
                match_any: true,
            },
            _ => EventFilter {
                status: Some(ModerationStatus::Approved),
                organizer_id: None,
                match_any: false,
            },
        };
        let mut events = self.store.list_events(filter).await?;
        if let Some(wanted) = status {
            events.retain(|e| e.status == wanted);
        }
        Ok(events)
    }
}
