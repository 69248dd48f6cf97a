//! Lending lifecycle: borrow, return, fines and loan notifications

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use super::{notifier::Notifier, reservations::ReservationsService};
use crate::{
    config::LendingConfig,
    error::{AppError, AppResult, LendingViolation},
    models::{
        book::Book,
        loan::{BorrowRecord, BorrowRequest, LoanDetails, LoanQuery, NewLoan},
        member::{Actor, Member},
        reservation::ReservationDetails,
    },
    repository::LedgerStore,
};

/// Outcome of a successful borrow
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BorrowOutcome {
    pub loan: BorrowRecord,
    pub book: Book,
}

/// Outcome of a successful return
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReturnOutcome {
    pub loan: BorrowRecord,
    pub book: Book,
    /// Fine debited from the member's balance
    pub fine: Decimal,
    pub fine_balance: Decimal,
    /// Reservation fulfilled by this return
    pub promoted: Option<ReservationDetails>,
}

/// Delivery report of a notification batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct NotificationReport {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct LendingService {
    store: Arc<dyn LedgerStore>,
    reservations: ReservationsService,
    notifier: Arc<dyn Notifier>,
    config: LendingConfig,
}

impl LendingService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        reservations: ReservationsService,
        notifier: Arc<dyn Notifier>,
        config: LendingConfig,
    ) -> Self {
        Self {
            store,
            reservations,
            notifier,
            config,
        }
    }

    /// Lend one copy of a book to a member
    pub async fn borrow(&self, actor: &Actor, request: BorrowRequest) -> AppResult<BorrowOutcome> {
        actor.require_self_or_staff(request.member_id)?;
        let now = Utc::now();

        let member = self.store.member(request.member_id).await?;
        if !member.can_borrow(now.date_naive()) {
            return Err(LendingViolation::MemberIneligible.into());
        }

        let open = self.store.open_loan_count(member.id).await?;
        if open >= self.config.max_open_loans {
            return Err(LendingViolation::BorrowCapReached {
                current: open,
                limit: self.config.max_open_loans,
            }
            .into());
        }

        let book = self.store.book(request.book_id).await?;
        if !book.is_available() {
            return Err(LendingViolation::BookUnavailable.into());
        }

        let due_date = self.due_date(now, request.due_date)?;
        let new_loan = NewLoan {
            book_id: book.id,
            member_id: member.id,
            borrow_date: now,
            due_date,
        };

        let (loan, book) = self
            .store
            .check_out(&new_loan, self.config.max_open_loans)
            .await?;

        tracing::info!(
            loan_id = loan.id,
            book_id = book.id,
            member_id = member.id,
            due_date = %loan.due_date,
            available_copies = book.available_copies,
            "Book borrowed"
        );

        Ok(BorrowOutcome { loan, book })
    }

    fn due_date(
        &self,
        now: DateTime<Utc>,
        requested: Option<DateTime<Utc>>,
    ) -> AppResult<DateTime<Utc>> {
        match requested {
            Some(due) if due <= now => Err(AppError::Validation(
                "Due date must be after the borrow date".to_string(),
            )),
            Some(due) => Ok(due),
            None => Ok(now + Duration::days(self.config.loan_period_days)),
        }
    }

    /// Close a loan, charge the fine and promote the next reservation
    pub async fn return_loan(&self, actor: &Actor, loan_id: i32) -> AppResult<ReturnOutcome> {
        let loan = self.store.loan(loan_id).await?;
        actor.require_self_or_staff(loan.member_id)?;
        self.close(loan).await
    }

    /// Return by book: staff close the oldest open loan of the book,
    /// members only their own
    pub async fn return_book(&self, actor: &Actor, book_id: i32) -> AppResult<ReturnOutcome> {
        self.store.book(book_id).await?;

        let member_filter = if actor.is_staff() {
            None
        } else {
            Some(actor.member_id)
        };

        let loan = self
            .store
            .open_loan_for_book(book_id, member_filter)
            .await?
            .ok_or(LendingViolation::NoOpenLoan)?;

        self.close(loan).await
    }

    async fn close(&self, loan: BorrowRecord) -> AppResult<ReturnOutcome> {
        if !loan.is_open() {
            return Err(LendingViolation::AlreadyReturned.into());
        }

        let now = Utc::now();
        let fine = loan.fine_amount(now, self.config.fine_per_day);
        let checked_in = self.store.check_in(loan.id, now, fine).await?;

        tracing::info!(
            loan_id = checked_in.loan.id,
            book_id = checked_in.book.id,
            member_id = checked_in.member.id,
            fine = %fine,
            "Book returned"
        );

        let promoted = match self.reservations.promote_next(checked_in.book.id).await {
            Ok(promoted) => promoted,
            Err(e) => {
                tracing::error!(book_id = checked_in.book.id, "Reservation promotion failed: {}", e);
                None
            }
        };

        Ok(ReturnOutcome {
            loan: checked_in.loan,
            book: checked_in.book,
            fine,
            fine_balance: checked_in.member.fine_balance,
            promoted,
        })
    }

    /// Credit a member's fine balance (staff only)
    pub async fn top_up(&self, actor: &Actor, member_id: i32, amount: Decimal) -> AppResult<Member> {
        actor.require_staff()?;
        if amount <= Decimal::ZERO {
            return Err(AppError::Validation(
                "Top-up amount must be positive".to_string(),
            ));
        }

        let member = self.store.credit_member(member_id, amount).await?;
        tracing::info!(
            member_id,
            amount = %amount,
            fine_balance = %member.fine_balance,
            "Fine balance topped up"
        );
        Ok(member)
    }

    /// Staff see every loan, members only their own
    pub async fn list_loans(
        &self,
        actor: &Actor,
        mut query: LoanQuery,
    ) -> AppResult<(Vec<LoanDetails>, i64)> {
        if !actor.is_staff() {
            query.member_id = Some(actor.member_id);
        }
        let (loans, total) = self.store.list_loans(&query).await?;
        Ok((self.with_derived(loans), total))
    }

    fn with_derived(&self, loans: Vec<LoanDetails>) -> Vec<LoanDetails> {
        let now = Utc::now();
        loans
            .into_iter()
            .map(|l| l.with_derived(now, self.config.fine_per_day))
            .collect()
    }

    /// Remind members of loans due within the reminder window
    pub async fn send_due_reminders(&self, actor: &Actor) -> AppResult<NotificationReport> {
        actor.require_staff()?;
        let now = Utc::now();
        let cutoff = now + Duration::days(self.config.reminder_window_days);

        let loans: Vec<LoanDetails> = self
            .with_derived(self.store.open_loans_due_before(cutoff).await?)
            .into_iter()
            .filter(|l| l.due_date >= now)
            .collect();

        let mut report = NotificationReport {
            total: loans.len(),
            ..Default::default()
        };
        for loan in &loans {
            match self.notifier.notify_due_soon(loan).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(loan_id = loan.id, member_id = loan.member_id, "Due reminder failed: {}", e);
                }
            }
        }

        tracing::info!(total = report.total, sent = report.sent, failed = report.failed, "Due reminders sent");
        Ok(report)
    }

    /// Alert members of loans past their due date
    pub async fn send_overdue_alerts(&self, actor: &Actor) -> AppResult<NotificationReport> {
        actor.require_staff()?;
        let loans = self.with_derived(self.store.open_loans_due_before(Utc::now()).await?);

        let mut report = NotificationReport {
            total: loans.len(),
            ..Default::default()
        };
        for loan in &loans {
            match self.notifier.notify_overdue(loan).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(loan_id = loan.id, member_id = loan.member_id, "Overdue alert failed: {}", e);
                }
            }
        }

        tracing::info!(total = report.total, sent = report.sent, failed = report.failed, "Overdue alerts sent");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            book::{tests::book, BookStatus},
            member::{tests::member, Role},
            reservation::{CreateReservation, ReservationStatus},
        },
        repository::memory::MemoryLedger,
        services::notifier::MockNotifier,
    };
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    const STAFF: Actor = Actor {
        member_id: 100,
        role: Role::Staff,
    };

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn config() -> LendingConfig {
        LendingConfig {
            loan_period_days: 14,
            max_open_loans: 3,
            fine_per_day: dec!(2.00),
            reminder_window_days: 2,
        }
    }

    fn ledger() -> Arc<MemoryLedger> {
        Arc::new(
            MemoryLedger::new()
                .with_member(member(1, Role::Student, today()))
                .with_member(member(2, Role::Student, today()))
                .with_member(member(3, Role::Teacher, today()))
                .with_member(member(100, Role::Staff, today())),
        )
    }

    fn service_with(store: Arc<MemoryLedger>, notifier: MockNotifier) -> LendingService {
        let notifier: Arc<dyn Notifier> = Arc::new(notifier);
        let reservations = ReservationsService::new(store.clone(), notifier.clone());
        LendingService::new(store, reservations, notifier, config())
    }

    fn service(store: Arc<MemoryLedger>) -> LendingService {
        service_with(store, MockNotifier::new())
    }

    fn borrow_request(book_id: i32, member_id: i32) -> BorrowRequest {
        BorrowRequest {
            book_id,
            member_id,
            due_date: None,
        }
    }

    /// Loan opened `days_ago` days ago with the default period
    fn past_loan(book_id: i32, member_id: i32, days_ago: i64) -> BorrowRecord {
        let borrowed = Utc::now() - Duration::days(days_ago);
        BorrowRecord {
            id: 0,
            book_id,
            member_id,
            borrow_date: borrowed,
            due_date: borrowed + Duration::days(14),
            return_date: None,
        }
    }

    #[tokio::test]
    async fn test_borrow_and_return_scenario() {
        let store = Arc::new(
            MemoryLedger::new()
                .with_book(book(7, 1))
                .with_member(member(1, Role::Student, today()))
                .with_member(member(2, Role::Student, today())),
        );
        let svc = service(store.clone());
        let m = Actor::new(1, Role::Student);
        let n = Actor::new(2, Role::Student);

        let outcome = svc.borrow(&m, borrow_request(7, 1)).await.unwrap();
        assert_eq!(outcome.book.available_copies, 0);
        assert_eq!(outcome.book.status, BookStatus::Borrowed);
        let period = outcome.loan.due_date - outcome.loan.borrow_date;
        assert_eq!(period, Duration::days(14));

        let err = svc.borrow(&n, borrow_request(7, 2)).await.unwrap_err();
        assert!(matches!(err, AppError::Lending(LendingViolation::BookUnavailable)));
        assert_eq!(err.public_message(), "Book is not available for borrowing");
        assert_eq!(store.book_snapshot(7).available_copies, 0);
    }

    #[tokio::test]
    async fn test_late_return_debits_fine() {
        let store = Arc::new(
            MemoryLedger::new()
                .with_book(book(7, 1))
                .with_member(member(1, Role::Student, today())),
        );
        // Due three days and one hour ago
        let mut loan = past_loan(7, 1, 17);
        loan.due_date -= Duration::hours(1);
        let loan = store.seed_loan(loan);
        assert_eq!(store.book_snapshot(7).available_copies, 0);

        let svc = service(store.clone());
        let outcome = svc
            .return_loan(&Actor::new(1, Role::Student), loan.id)
            .await
            .unwrap();

        assert_eq!(outcome.fine, dec!(6.00));
        assert_eq!(outcome.fine_balance, dec!(-6.00));
        assert_eq!(outcome.book.available_copies, 1);
        assert_eq!(outcome.book.status, BookStatus::Available);
        assert!(outcome.loan.return_date.is_some());
        assert_eq!(store.member_snapshot(1).fine_balance, dec!(-6.00));
        assert!(outcome.promoted.is_none());
    }

    #[tokio::test]
    async fn test_on_time_return_is_free() {
        let store = Arc::new(
            MemoryLedger::new()
                .with_book(book(5, 2))
                .with_member(member(1, Role::Student, today())),
        );
        let svc = service(store.clone());
        let actor = Actor::new(1, Role::Student);

        let borrowed = svc.borrow(&actor, borrow_request(5, 1)).await.unwrap();
        let returned = svc.return_loan(&actor, borrowed.loan.id).await.unwrap();
        assert_eq!(returned.fine, Decimal::ZERO);
        assert_eq!(store.member_snapshot(1).fine_balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_fourth_borrow_hits_cap() {
        let store = Arc::new(
            MemoryLedger::new()
                .with_book(book(1, 5))
                .with_book(book(2, 5))
                .with_book(book(3, 5))
                .with_book(book(4, 5))
                .with_member(member(1, Role::Student, today())),
        );
        let svc = service(store.clone());
        let actor = Actor::new(1, Role::Student);

        for id in 1..=3 {
            svc.borrow(&actor, borrow_request(id, 1)).await.unwrap();
        }
        let err = svc.borrow(&actor, borrow_request(4, 1)).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Lending(LendingViolation::BorrowCapReached { current: 3, limit: 3 })
        ));
        assert_eq!(store.book_snapshot(4).available_copies, 5);
    }

    #[tokio::test]
    async fn test_cap_checked_before_book_lookup() {
        let store = Arc::new(
            MemoryLedger::new()
                .with_book(book(1, 5))
                .with_member(member(1, Role::Student, today())),
        );
        for _ in 0..3 {
            store.seed_loan(past_loan(1, 1, 1));
        }
        let svc = service(store);
        let err = svc
            .borrow(&Actor::new(1, Role::Student), borrow_request(999, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Lending(LendingViolation::BorrowCapReached { .. })));
    }

    #[tokio::test]
    async fn test_expired_member_rejected_before_cap() {
        let expired = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let store = Arc::new(
            MemoryLedger::new()
                .with_book(book(1, 1))
                .with_member(member(1, Role::Student, expired)),
        );
        let svc = service(store);
        let err = svc
            .borrow(&Actor::new(1, Role::Student), borrow_request(1, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Lending(LendingViolation::MemberIneligible)));
    }

    #[tokio::test]
    async fn test_unknown_member_is_not_found() {
        let svc = service(ledger());
        let err = svc.borrow(&STAFF, borrow_request(1, 42)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_member_cannot_borrow_for_another() {
        let store = Arc::new(
            MemoryLedger::new()
                .with_book(book(1, 1))
                .with_member(member(1, Role::Student, today()))
                .with_member(member(2, Role::Student, today())),
        );
        let svc = service(store);
        let err = svc
            .borrow(&Actor::new(1, Role::Student), borrow_request(1, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_custom_due_date_must_be_in_future() {
        let store = Arc::new(
            MemoryLedger::new()
                .with_book(book(1, 1))
                .with_member(member(1, Role::Student, today())),
        );
        let svc = service(store.clone());
        let mut request = borrow_request(1, 1);
        request.due_date = Some(Utc::now() - Duration::days(1));
        let err = svc.borrow(&STAFF, request).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.book_snapshot(1).available_copies, 1);

        let due = Utc::now() + Duration::days(30);
        let mut request = borrow_request(1, 1);
        request.due_date = Some(due);
        let outcome = svc.borrow(&STAFF, request).await.unwrap();
        assert_eq!(outcome.loan.due_date, due);
    }

    #[tokio::test]
    async fn test_double_return_rejected() {
        let store = Arc::new(
            MemoryLedger::new()
                .with_book(book(1, 1))
                .with_member(member(1, Role::Student, today())),
        );
        let svc = service(store.clone());
        let actor = Actor::new(1, Role::Student);
        let borrowed = svc.borrow(&actor, borrow_request(1, 1)).await.unwrap();
        svc.return_loan(&actor, borrowed.loan.id).await.unwrap();

        let err = svc.return_loan(&actor, borrowed.loan.id).await.unwrap_err();
        assert!(matches!(err, AppError::Lending(LendingViolation::AlreadyReturned)));
        assert_eq!(store.book_snapshot(1).available_copies, 1);
    }

    #[tokio::test]
    async fn test_counter_survives_borrow_return_cycles() {
        let store = Arc::new(
            MemoryLedger::new()
                .with_book(book(1, 2))
                .with_member(member(1, Role::Student, today()))
                .with_member(member(2, Role::Student, today())),
        );
        let svc = service(store.clone());
        let m = Actor::new(1, Role::Student);
        let n = Actor::new(2, Role::Student);

        for _ in 0..4 {
            let a = svc.borrow(&m, borrow_request(1, 1)).await.unwrap();
            let b = svc.borrow(&n, borrow_request(1, 2)).await.unwrap();
            assert_eq!(b.book.available_copies, 0);
            svc.return_loan(&m, a.loan.id).await.unwrap();
            svc.return_loan(&n, b.loan.id).await.unwrap();
        }
        let book = store.book_snapshot(1);
        assert_eq!(book.available_copies, 2);
        assert_eq!(book.status, BookStatus::Available);
    }

    #[tokio::test]
    async fn test_return_promotes_oldest_reservation() {
        let store = Arc::new(
            MemoryLedger::new()
                .with_book(book(1, 1))
                .with_member(member(1, Role::Student, today()))
                .with_member(member(2, Role::Student, today()))
                .with_member(member(3, Role::Teacher, today())),
        );
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify_reservation_fulfilled()
            .withf(|r| r.member_id == 2)
            .times(1)
            .returning(|_| Ok(()));
        let svc = service_with(store.clone(), notifier);

        let holder = Actor::new(1, Role::Student);
        let borrowed = svc.borrow(&holder, borrow_request(1, 1)).await.unwrap();

        let a = svc
            .reservations
            .create(&Actor::new(2, Role::Student), CreateReservation { book_id: 1, member_id: None })
            .await
            .unwrap();
        let b = svc
            .reservations
            .create(&Actor::new(3, Role::Teacher), CreateReservation { book_id: 1, member_id: None })
            .await
            .unwrap();

        let outcome = svc.return_loan(&holder, borrowed.loan.id).await.unwrap();
        let promoted = outcome.promoted.unwrap();
        assert_eq!(promoted.id, a.id);
        assert!(promoted.notification_sent);
        assert_eq!(store.reservation_snapshot(a.id).status, ReservationStatus::Fulfilled);
        assert_eq!(store.reservation_snapshot(b.id).status, ReservationStatus::Active);
    }

    #[tokio::test]
    async fn test_return_by_book_scopes_to_member() {
        let store = Arc::new(
            MemoryLedger::new()
                .with_book(book(1, 2))
                .with_member(member(1, Role::Student, today()))
                .with_member(member(2, Role::Student, today()))
                .with_member(member(100, Role::Staff, today())),
        );
        let svc = service(store.clone());
        let m = Actor::new(1, Role::Student);
        let n = Actor::new(2, Role::Student);

        let first = svc.borrow(&m, borrow_request(1, 1)).await.unwrap();
        svc.borrow(&n, borrow_request(1, 2)).await.unwrap();

        let outcome = svc.return_book(&n, 1).await.unwrap();
        assert_eq!(outcome.loan.member_id, 2);
        let err = svc.return_book(&n, 1).await.unwrap_err();
        assert!(matches!(err, AppError::Lending(LendingViolation::NoOpenLoan)));

        let outcome = svc.return_book(&STAFF, 1).await.unwrap();
        assert_eq!(outcome.loan.id, first.loan.id);
        assert_eq!(store.book_snapshot(1).available_copies, 2);
    }

    #[tokio::test]
    async fn test_member_cannot_return_anothers_loan() {
        let store = Arc::new(
            MemoryLedger::new()
                .with_book(book(1, 1))
                .with_member(member(1, Role::Student, today()))
                .with_member(member(2, Role::Student, today())),
        );
        let svc = service(store);
        let borrowed = svc
            .borrow(&Actor::new(1, Role::Student), borrow_request(1, 1))
            .await
            .unwrap();
        let err = svc
            .return_loan(&Actor::new(2, Role::Student), borrowed.loan.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_top_up() {
        let svc = service(ledger());
        let member = svc.top_up(&STAFF, 1, dec!(15.50)).await.unwrap();
        assert_eq!(member.fine_balance, dec!(15.50));

        let err = svc.top_up(&STAFF, 1, dec!(0)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = svc.top_up(&STAFF, 1, dec!(-3)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = svc
            .top_up(&Actor::new(1, Role::Student), 1, dec!(5))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_reminders_and_alerts() {
        let store = Arc::new(
            MemoryLedger::new()
                .with_book(book(1, 3))
                .with_member(member(1, Role::Student, today()))
                .with_member(member(2, Role::Student, today()))
                .with_member(member(3, Role::Student, today())),
        );
        // due tomorrow, overdue by 5 days, due in 10 days
        let soon = store.seed_loan(past_loan(1, 1, 13));
        let late = store.seed_loan(past_loan(1, 2, 19));
        store.seed_loan(past_loan(1, 3, 4));

        let mut notifier = MockNotifier::new();
        let soon_id = soon.id;
        notifier
            .expect_notify_due_soon()
            .withf(move |l| l.id == soon_id)
            .times(1)
            .returning(|_| Ok(()));
        let late_id = late.id;
        notifier
            .expect_notify_overdue()
            .withf(move |l| l.id == late_id && l.is_overdue && l.fine_amount == dec!(10.00))
            .times(1)
            .returning(|_| Err(AppError::Internal("mailbox full".to_string())));
        let svc = service_with(store, notifier);

        let reminders = svc.send_due_reminders(&STAFF).await.unwrap();
        assert_eq!(reminders, NotificationReport { total: 1, sent: 1, failed: 0 });

        let alerts = svc.send_overdue_alerts(&STAFF).await.unwrap();
        assert_eq!(alerts, NotificationReport { total: 1, sent: 0, failed: 1 });

        let err = svc
            .send_overdue_alerts(&Actor::new(1, Role::Student))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_members_list_only_their_loans() {
        let store = Arc::new(
            MemoryLedger::new()
                .with_book(book(1, 3))
                .with_member(member(1, Role::Student, today()))
                .with_member(member(2, Role::Student, today())),
        );
        store.seed_loan(past_loan(1, 1, 20));
        store.seed_loan(past_loan(1, 2, 1));
        let svc = service(store);

        let (loans, total) = svc
            .list_loans(&Actor::new(1, Role::Student), LoanQuery::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert!(loans[0].is_overdue);
        assert_eq!(loans[0].fine_amount, dec!(12.00));

        let (all, _) = svc.list_loans(&STAFF, LoanQuery::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
