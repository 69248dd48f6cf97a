//! Reservation queue and promotion

use std::sync::Arc;

use chrono::Utc;

use super::notifier::Notifier;
use crate::{
    error::{AppResult, LendingViolation},
    models::{
        book::{Book, BookStatus},
        member::Actor,
        reservation::{CreateReservation, Reservation, ReservationDetails, ReservationQuery},
    },
    repository::LedgerStore,
};

#[derive(Clone)]
pub struct ReservationsService {
    store: Arc<dyn LedgerStore>,
    notifier: Arc<dyn Notifier>,
}

impl ReservationsService {
    pub fn new(store: Arc<dyn LedgerStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Queue a member for a book that is currently out
    pub async fn create(&self, actor: &Actor, request: CreateReservation) -> AppResult<Reservation> {
        let member_id = request.member_id.unwrap_or(actor.member_id);
        actor.require_self_or_staff(member_id)?;

        self.store.member(member_id).await?;
        let book = self.store.book(request.book_id).await?;
        if book.is_available() {
            return Err(LendingViolation::BookAvailable.into());
        }

        let reservation = self
            .store
            .create_reservation(book.id, member_id, Utc::now())
            .await?;

        tracing::info!(
            reservation_id = reservation.id,
            book_id = book.id,
            member_id,
            "Reservation created"
        );
        Ok(reservation)
    }

    /// Cancel an active reservation (owner or staff)
    pub async fn cancel(&self, actor: &Actor, id: i32) -> AppResult<Reservation> {
        let reservation = self.store.reservation(id).await?;
        actor.require_self_or_staff(reservation.member_id)?;

        let cancelled = self.store.cancel_reservation(id).await?;
        tracing::info!(reservation_id = id, book_id = cancelled.book_id, "Reservation cancelled");
        Ok(cancelled)
    }

    /// Staff see every reservation, members only their own
    pub async fn list(
        &self,
        actor: &Actor,
        mut query: ReservationQuery,
    ) -> AppResult<(Vec<ReservationDetails>, i64)> {
        if !actor.is_staff() {
            query.member_id = Some(actor.member_id);
        }
        self.store.list_reservations(&query).await
    }

    /// Promote the next reservation when an edit moved a book back to available
    pub async fn promote_if_reopened(
        &self,
        previous: BookStatus,
        book: &Book,
    ) -> AppResult<Option<ReservationDetails>> {
        if previous == BookStatus::Available || book.status != BookStatus::Available {
            return Ok(None);
        }
        self.promote_next(book.id).await
    }

    /// Fulfil the oldest active reservation of a book that just became
    /// available and tell the member. At most one reservation per call.
    pub async fn promote_next(&self, book_id: i32) -> AppResult<Option<ReservationDetails>> {
        let mut reservation = match self.store.fulfil_next_reservation(book_id).await? {
            Some(r) => r,
            None => return Ok(None),
        };

        tracing::info!(
            reservation_id = reservation.id,
            book_id,
            member_id = reservation.member_id,
            "Reservation fulfilled"
        );

        match self.notifier.notify_reservation_fulfilled(&reservation).await {
            Ok(()) => match self.store.mark_reservation_notified(reservation.id).await {
                Ok(()) => reservation.notification_sent = true,
                Err(e) => tracing::warn!(
                    reservation_id = reservation.id,
                    "Failed to flag reservation as notified: {}",
                    e
                ),
            },
            Err(e) => tracing::warn!(
                reservation_id = reservation.id,
                member_id = reservation.member_id,
                "Reservation notification failed: {}",
                e
            ),
        }

        Ok(Some(reservation))
    }
}
