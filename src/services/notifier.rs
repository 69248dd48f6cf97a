//! Outbound member notifications

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{loan::LoanDetails, reservation::ReservationDetails},
};

/// Delivery channel for lending notifications.
///
/// Callers treat delivery as best effort: a failure is logged and never
/// undoes the lending operation that triggered it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A reserved book is ready for pickup
    async fn notify_reservation_fulfilled(&self, reservation: &ReservationDetails) -> AppResult<()>;

    /// A loan is due within the reminder window
    async fn notify_due_soon(&self, loan: &LoanDetails) -> AppResult<()>;

    /// A loan is past its due date
    async fn notify_overdue(&self, loan: &LoanDetails) -> AppResult<()>;
}
