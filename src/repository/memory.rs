//! In-memory ledger for service tests

use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::ledger::{CheckIn, LedgerStore};
use crate::{
    error::{AppError, AppResult, LendingViolation},
    models::{
        book::{Book, BookStatus},
        loan::{BorrowRecord, LoanDetails, LoanQuery, LoanStatusFilter, NewLoan},
        member::Member,
        reservation::{Reservation, ReservationDetails, ReservationQuery, ReservationStatus},
    },
};

/// Take one copy off the shelf, mirroring the conditional UPDATE in `loans::check_out`
fn take_copy(book: &mut Book) -> Result<(), LendingViolation> {
    if !book.is_available() {
        return Err(LendingViolation::BookUnavailable);
    }
    book.available_copies -= 1;
    if book.available_copies == 0 {
        book.status = BookStatus::Borrowed;
    }
    Ok(())
}

/// Put one copy back on the shelf
fn return_copy(book: &mut Book) {
    book.available_copies += 1;
    book.status = BookStatus::Available;
}

#[derive(Default)]
struct State {
    books: BTreeMap<i32, Book>,
    members: BTreeMap<i32, Member>,
    loans: Vec<BorrowRecord>,
    reservations: Vec<Reservation>,
}

impl State {
    fn book(&self, id: i32) -> AppResult<&Book> {
        self.books
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    fn member(&self, id: i32) -> AppResult<&Member> {
        self.members
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))
    }

    fn open_count(&self, member_id: i32) -> i64 {
        self.loans
            .iter()
            .filter(|l| l.member_id == member_id && l.is_open())
            .count() as i64
    }

    fn loan_details(&self, loan: &BorrowRecord) -> LoanDetails {
        let book = &self.books[&loan.book_id];
        let member = &self.members[&loan.member_id];
        LoanDetails {
            id: loan.id,
            book_id: loan.book_id,
            book_title: book.title.clone(),
            book_barcode: book.barcode.clone(),
            member_id: loan.member_id,
            member_login: member.login.clone(),
            member_name: Some(member.display_name()),
            member_email: member.email.clone(),
            borrow_date: loan.borrow_date,
            due_date: loan.due_date,
            return_date: loan.return_date,
            is_overdue: false,
            fine_amount: Decimal::ZERO,
        }
    }

    fn reservation_details(&self, r: &Reservation) -> ReservationDetails {
        let member = &self.members[&r.member_id];
        ReservationDetails {
            id: r.id,
            book_id: r.book_id,
            book_title: self.books[&r.book_id].title.clone(),
            member_id: r.member_id,
            member_login: member.login.clone(),
            member_name: Some(member.display_name()),
            member_email: member.email.clone(),
            reservation_date: r.reservation_date,
            status: r.status,
            notification_sent: r.notification_sent,
        }
    }
}

/// Ledger kept behind one mutex; every operation is atomic
#[derive(Default)]
pub(crate) struct MemoryLedger {
    state: Mutex<State>,
}

impl MemoryLedger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("ledger mutex poisoned")
    }

    pub(crate) fn with_book(self, book: Book) -> Self {
        self.lock().books.insert(book.id, book);
        self
    }

    pub(crate) fn with_member(self, member: Member) -> Self {
        self.lock().members.insert(member.id, member);
        self
    }

    /// Seed a loan as-is, bypassing checkout (e.g. one borrowed weeks ago)
    pub(crate) fn seed_loan(&self, mut loan: BorrowRecord) -> BorrowRecord {
        let mut state = self.lock();
        loan.id = state.loans.len() as i32 + 1;
        if loan.is_open() {
            if let Some(book) = state.books.get_mut(&loan.book_id) {
                take_copy(book).expect("seeded book has a free copy");
            }
        }
        state.loans.push(loan.clone());
        loan
    }

    pub(crate) fn book_snapshot(&self, id: i32) -> Book {
        self.lock().books[&id].clone()
    }

    pub(crate) fn member_snapshot(&self, id: i32) -> Member {
        self.lock().members[&id].clone()
    }

    pub(crate) fn loan_snapshot(&self, id: i32) -> BorrowRecord {
        self.lock().loans[(id - 1) as usize].clone()
    }

    pub(crate) fn reservation_snapshot(&self, id: i32) -> Reservation {
        self.lock().reservations[(id - 1) as usize].clone()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn book(&self, id: i32) -> AppResult<Book> {
        self.lock().book(id).cloned()
    }

    async fn book_by_code(&self, code: &str) -> AppResult<Option<Book>> {
        let state = self.lock();
        let code = code.trim();
        if let Some(book) = state.books.values().find(|b| b.barcode == code) {
            return Ok(Some(book.clone()));
        }
        let isbn: String = code
            .chars()
            .filter(|c| !matches!(c, '-' | ' '))
            .map(|c| c.to_ascii_uppercase())
            .collect();
        Ok(state
            .books
            .values()
            .find(|b| b.isbn == isbn || b.isbn13.as_deref() == Some(isbn.as_str()))
            .cloned())
    }

    async fn author_names(&self, book_id: i32) -> AppResult<Option<String>> {
        self.lock().book(book_id)?;
        Ok(None)
    }

    async fn member(&self, id: i32) -> AppResult<Member> {
        self.lock().member(id).cloned()
    }

    async fn open_loan_count(&self, member_id: i32) -> AppResult<i64> {
        Ok(self.lock().open_count(member_id))
    }

    async fn loan(&self, id: i32) -> AppResult<BorrowRecord> {
        self.lock()
            .loans
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Borrow record with id {} not found", id)))
    }

    async fn open_loan_for_book(
        &self,
        book_id: i32,
        member_id: Option<i32>,
    ) -> AppResult<Option<BorrowRecord>> {
        Ok(self
            .lock()
            .loans
            .iter()
            .filter(|l| l.book_id == book_id && l.is_open())
            .filter(|l| member_id.map_or(true, |m| l.member_id == m))
            .min_by_key(|l| (l.borrow_date, l.id))
            .cloned())
    }

    async fn check_out(&self, loan: &NewLoan, max_open_loans: i64) -> AppResult<(BorrowRecord, Book)> {
        let mut state = self.lock();
        state.member(loan.member_id)?;

        let open = state.open_count(loan.member_id);
        if open >= max_open_loans {
            return Err(LendingViolation::BorrowCapReached {
                current: open,
                limit: max_open_loans,
            }
            .into());
        }

        let book = state
            .books
            .get_mut(&loan.book_id)
            .ok_or(LendingViolation::BookUnavailable)?;
        take_copy(book)?;
        let book = book.clone();

        let record = BorrowRecord {
            id: state.loans.len() as i32 + 1,
            book_id: loan.book_id,
            member_id: loan.member_id,
            borrow_date: loan.borrow_date,
            due_date: loan.due_date,
            return_date: None,
        };
        state.loans.push(record.clone());
        Ok((record, book))
    }

    async fn check_in(
        &self,
        loan_id: i32,
        returned_at: DateTime<Utc>,
        fine: Decimal,
    ) -> AppResult<CheckIn> {
        let mut state = self.lock();
        let loan = state
            .loans
            .iter_mut()
            .find(|l| l.id == loan_id)
            .ok_or_else(|| AppError::NotFound(format!("Borrow record with id {} not found", loan_id)))?;
        if !loan.is_open() {
            return Err(LendingViolation::AlreadyReturned.into());
        }
        loan.return_date = Some(returned_at);
        let loan = loan.clone();

        let book = state
            .books
            .get_mut(&loan.book_id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", loan.book_id)))?;
        return_copy(book);
        let book = book.clone();

        let member = state
            .members
            .get_mut(&loan.member_id)
            .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", loan.member_id)))?;
        member.fine_balance -= fine;
        let member = member.clone();

        Ok(CheckIn { loan, book, member })
    }

    async fn credit_member(&self, member_id: i32, amount: Decimal) -> AppResult<Member> {
        let mut state = self.lock();
        let member = state
            .members
            .get_mut(&member_id)
            .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", member_id)))?;
        member.fine_balance += amount;
        Ok(member.clone())
    }

    async fn list_loans(&self, query: &LoanQuery) -> AppResult<(Vec<LoanDetails>, i64)> {
        let state = self.lock();
        let now = Utc::now();
        let loans: Vec<LoanDetails> = state
            .loans
            .iter()
            .rev()
            .filter(|l| match query.status {
                Some(LoanStatusFilter::Open) => l.is_open(),
                Some(LoanStatusFilter::Returned) => !l.is_open(),
                None => true,
            })
            .filter(|l| query.member_id.map_or(true, |m| l.member_id == m))
            .filter(|l| query.book_id.map_or(true, |b| l.book_id == b))
            .filter(|l| query.overdue != Some(true) || l.is_overdue(now))
            .map(|l| state.loan_details(l))
            .collect();
        let total = loans.len() as i64;
        Ok((loans, total))
    }

    async fn open_loans_due_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<LoanDetails>> {
        let state = self.lock();
        let mut loans: Vec<&BorrowRecord> = state
            .loans
            .iter()
            .filter(|l| l.is_open() && l.due_date < cutoff)
            .collect();
        loans.sort_by_key(|l| (l.due_date, l.id));
        Ok(loans.into_iter().map(|l| state.loan_details(l)).collect())
    }

    async fn create_reservation(
        &self,
        book_id: i32,
        member_id: i32,
        at: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        let mut state = self.lock();
        state.book(book_id)?;
        state.member(member_id)?;

        if let Some(existing) = state
            .reservations
            .iter_mut()
            .find(|r| r.book_id == book_id && r.member_id == member_id)
        {
            if existing.status == ReservationStatus::Active {
                return Err(AppError::Conflict(
                    "You already have an active reservation for this book".to_string(),
                ));
            }
            existing.status = ReservationStatus::Active;
            existing.reservation_date = at;
            existing.notification_sent = false;
            return Ok(existing.clone());
        }

        let reservation = Reservation {
            id: state.reservations.len() as i32 + 1,
            book_id,
            member_id,
            reservation_date: at,
            status: ReservationStatus::Active,
            notification_sent: false,
        };
        state.reservations.push(reservation.clone());
        Ok(reservation)
    }

    async fn reservation(&self, id: i32) -> AppResult<Reservation> {
        self.lock()
            .reservations
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    async fn cancel_reservation(&self, id: i32) -> AppResult<Reservation> {
        let mut state = self.lock();
        let reservation = state
            .reservations
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))?;
        if reservation.status != ReservationStatus::Active {
            return Err(LendingViolation::ReservationNotActive.into());
        }
        reservation.status = ReservationStatus::Cancelled;
        Ok(reservation.clone())
    }

    async fn fulfil_next_reservation(&self, book_id: i32) -> AppResult<Option<ReservationDetails>> {
        let mut state = self.lock();
        let next = state
            .reservations
            .iter_mut()
            .filter(|r| r.book_id == book_id && r.status == ReservationStatus::Active)
            .min_by_key(|r| (r.reservation_date, r.id));

        let fulfilled = match next {
            Some(reservation) => {
                reservation.status = ReservationStatus::Fulfilled;
                reservation.clone()
            }
            None => return Ok(None),
        };
        Ok(Some(state.reservation_details(&fulfilled)))
    }

    async fn mark_reservation_notified(&self, id: i32) -> AppResult<()> {
        if let Some(r) = self.lock().reservations.iter_mut().find(|r| r.id == id) {
            r.notification_sent = true;
        }
        Ok(())
    }

    async fn list_reservations(
        &self,
        query: &ReservationQuery,
    ) -> AppResult<(Vec<ReservationDetails>, i64)> {
        let state = self.lock();
        let mut reservations: Vec<&Reservation> = state
            .reservations
            .iter()
            .filter(|r| query.member_id.map_or(true, |m| r.member_id == m))
            .filter(|r| query.book_id.map_or(true, |b| r.book_id == b))
            .filter(|r| query.status.map_or(true, |s| r.status == s))
            .collect();
        reservations.sort_by_key(|r| (r.reservation_date, r.id));
        let details: Vec<ReservationDetails> = reservations
            .into_iter()
            .map(|r| state.reservation_details(r))
            .collect();
        let total = details.len() as i64;
        Ok((details, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::book::tests::book;

    #[test]
    fn test_taking_last_copy_flips_status() {
        let mut b = book(1, 1);
        take_copy(&mut b).unwrap();
        assert_eq!(b.available_copies, 0);
        assert_eq!(b.status, BookStatus::Borrowed);
        assert_eq!(take_copy(&mut b), Err(LendingViolation::BookUnavailable));
        assert_eq!(b.available_copies, 0);
    }

    #[test]
    fn test_status_kept_while_copies_remain() {
        let mut b = book(1, 3);
        take_copy(&mut b).unwrap();
        assert_eq!(b.available_copies, 2);
        assert_eq!(b.status, BookStatus::Available);
    }

    #[test]
    fn test_round_trip_restores_counter() {
        let mut b = book(1, 2);
        for _ in 0..5 {
            take_copy(&mut b).unwrap();
            return_copy(&mut b);
        }
        assert_eq!(b.available_copies, 2);
        assert!(b.is_available());
    }

    #[test]
    fn test_maintenance_copy_cannot_be_taken() {
        let mut b = book(1, 4);
        b.status = BookStatus::Maintenance;
        assert_eq!(take_copy(&mut b), Err(LendingViolation::BookUnavailable));
    }

    #[test]
    #[should_panic(expected = "seeded book has a free copy")]
    fn test_seeding_loan_on_unavailable_book_panics() {
        let store = MemoryLedger::new().with_book(book(1, 0));
        let now = Utc::now();
        store.seed_loan(BorrowRecord {
            id: 0,
            book_id: 1,
            member_id: 1,
            borrow_date: now,
            due_date: now,
            return_date: None,
        });
    }
}
