//! Lending ledger seam used by the lending and reservation services

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::Repository;
use crate::{
    error::AppResult,
    models::{
        book::Book,
        loan::{BorrowRecord, LoanDetails, LoanQuery, NewLoan},
        member::Member,
        reservation::{Reservation, ReservationDetails, ReservationQuery},
    },
};

/// Result of closing a loan
#[derive(Debug, Clone)]
pub struct CheckIn {
    pub loan: BorrowRecord,
    pub book: Book,
    pub member: Member,
}

/// Everything the lending lifecycle reads and writes.
///
/// `check_out`, `check_in`, `create_reservation` and
/// `fulfil_next_reservation` must be atomic: each either applies all of its
/// changes or none.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn book(&self, id: i32) -> AppResult<Book>;

    /// Exact barcode match first, then ISBN
    async fn book_by_code(&self, code: &str) -> AppResult<Option<Book>>;

    async fn author_names(&self, book_id: i32) -> AppResult<Option<String>>;

    async fn member(&self, id: i32) -> AppResult<Member>;

    async fn open_loan_count(&self, member_id: i32) -> AppResult<i64>;

    async fn loan(&self, id: i32) -> AppResult<BorrowRecord>;

    /// Oldest open loan on a book, optionally restricted to one member
    async fn open_loan_for_book(
        &self,
        book_id: i32,
        member_id: Option<i32>,
    ) -> AppResult<Option<BorrowRecord>>;

    /// Take one copy and open a loan.
    /// Fails with `BookUnavailable` when no copy is left and with
    /// `BorrowCapReached` when the member already holds `max_open_loans`.
    async fn check_out(&self, loan: &NewLoan, max_open_loans: i64) -> AppResult<(BorrowRecord, Book)>;

    /// Close an open loan, put the copy back and debit `fine` from the member.
    /// Fails with `AlreadyReturned` when the loan is closed.
    async fn check_in(
        &self,
        loan_id: i32,
        returned_at: DateTime<Utc>,
        fine: Decimal,
    ) -> AppResult<CheckIn>;

    async fn credit_member(&self, member_id: i32, amount: Decimal) -> AppResult<Member>;

    async fn list_loans(&self, query: &LoanQuery) -> AppResult<(Vec<LoanDetails>, i64)>;

    /// Open loans whose due date is before `cutoff`
    async fn open_loans_due_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<LoanDetails>>;

    /// File a reservation; a fulfilled or cancelled one for the same pair is
    /// re-queued. Fails with `Conflict` when an active one exists.
    async fn create_reservation(
        &self,
        book_id: i32,
        member_id: i32,
        at: DateTime<Utc>,
    ) -> AppResult<Reservation>;

    async fn reservation(&self, id: i32) -> AppResult<Reservation>;

    /// Active -> cancelled. Fails with `ReservationNotActive` otherwise.
    async fn cancel_reservation(&self, id: i32) -> AppResult<Reservation>;

    /// Mark the oldest active reservation of a book as fulfilled
    async fn fulfil_next_reservation(&self, book_id: i32) -> AppResult<Option<ReservationDetails>>;

    async fn mark_reservation_notified(&self, id: i32) -> AppResult<()>;

    async fn list_reservations(
        &self,
        query: &ReservationQuery,
    ) -> AppResult<(Vec<ReservationDetails>, i64)>;
}

#[async_trait]
impl LedgerStore for Repository {
    async fn book(&self, id: i32) -> AppResult<Book> {
        self.books.get_by_id(id).await
    }

    async fn book_by_code(&self, code: &str) -> AppResult<Option<Book>> {
        self.books.find_by_code(code).await
    }

    async fn author_names(&self, book_id: i32) -> AppResult<Option<String>> {
        self.books.author_names(book_id).await
    }

    async fn member(&self, id: i32) -> AppResult<Member> {
        self.members.get_by_id(id).await
    }

    async fn open_loan_count(&self, member_id: i32) -> AppResult<i64> {
        self.loans.count_open_for_member(member_id).await
    }

    async fn loan(&self, id: i32) -> AppResult<BorrowRecord> {
        self.loans.get_by_id(id).await
    }

    async fn open_loan_for_book(
        &self,
        book_id: i32,
        member_id: Option<i32>,
    ) -> AppResult<Option<BorrowRecord>> {
        self.loans.find_open_for_book(book_id, member_id).await
    }

    async fn check_out(&self, loan: &NewLoan, max_open_loans: i64) -> AppResult<(BorrowRecord, Book)> {
        self.loans.check_out(loan, max_open_loans).await
    }

    async fn check_in(
        &self,
        loan_id: i32,
        returned_at: DateTime<Utc>,
        fine: Decimal,
    ) -> AppResult<CheckIn> {
        self.loans.check_in(loan_id, returned_at, fine).await
    }

    async fn credit_member(&self, member_id: i32, amount: Decimal) -> AppResult<Member> {
        self.members.adjust_fine_balance(member_id, amount).await
    }

    async fn list_loans(&self, query: &LoanQuery) -> AppResult<(Vec<LoanDetails>, i64)> {
        self.loans.list(query).await
    }

    async fn open_loans_due_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<LoanDetails>> {
        self.loans.open_due_before(cutoff).await
    }

    async fn create_reservation(
        &self,
        book_id: i32,
        member_id: i32,
        at: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        self.reservations.create(book_id, member_id, at).await
    }

    async fn reservation(&self, id: i32) -> AppResult<Reservation> {
        self.reservations.get_by_id(id).await
    }

    async fn cancel_reservation(&self, id: i32) -> AppResult<Reservation> {
        self.reservations.cancel(id).await
    }

    async fn fulfil_next_reservation(&self, book_id: i32) -> AppResult<Option<ReservationDetails>> {
        self.reservations.fulfil_next(book_id).await
    }

    async fn mark_reservation_notified(&self, id: i32) -> AppResult<()> {
        self.reservations.mark_notified(id).await
    }

    async fn list_reservations(
        &self,
        query: &ReservationQuery,
    ) -> AppResult<(Vec<ReservationDetails>, i64)> {
        self.reservations.list(query).await
    }
}
