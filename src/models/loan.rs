//! Borrow record (loan) model and fine computation

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

/// Borrow record from database. Open while `return_date` is null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRecord {
    pub id: i32,
    pub book_id: i32,
    pub member_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
}

impl BorrowRecord {
    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && now > self.due_date
    }

    /// Whole days between the due date and the return date (or `now` while open)
    pub fn days_overdue(&self, now: DateTime<Utc>) -> i64 {
        let end = self.return_date.unwrap_or(now);
        (end - self.due_date).num_days().max(0)
    }

    /// Fine accrued so far; never stored
    pub fn fine_amount(&self, now: DateTime<Utc>, fine_per_day: Decimal) -> Decimal {
        Decimal::from(self.days_overdue(now)) * fine_per_day
    }
}

/// Loan joined with book and member labels
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub book_barcode: String,
    pub member_id: i32,
    pub member_login: String,
    pub member_name: Option<String>,
    pub member_email: Option<String>,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    #[sqlx(skip)]
    pub is_overdue: bool,
    #[sqlx(skip)]
    pub fine_amount: Decimal,
}

impl LoanDetails {
    pub fn record(&self) -> BorrowRecord {
        BorrowRecord {
            id: self.id,
            book_id: self.book_id,
            member_id: self.member_id,
            borrow_date: self.borrow_date,
            due_date: self.due_date,
            return_date: self.return_date,
        }
    }

    /// Fill the derived fields
    pub fn with_derived(mut self, now: DateTime<Utc>, fine_per_day: Decimal) -> Self {
        let record = self.record();
        self.is_overdue = record.is_overdue(now);
        self.fine_amount = record.fine_amount(now, fine_per_day);
        self
    }
}

/// Loan status filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatusFilter {
    Open,
    Returned,
}

/// Loan list parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct LoanQuery {
    pub status: Option<LoanStatusFilter>,
    pub member_id: Option<i32>,
    pub book_id: Option<i32>,
    /// Only open loans past their due date
    pub overdue: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Borrow request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BorrowRequest {
    pub book_id: i32,
    pub member_id: i32,
    /// Overrides the default loan period
    pub due_date: Option<DateTime<Utc>>,
}

/// New loan handed to the store
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub book_id: i32,
    pub member_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn record(due: DateTime<Utc>, returned: Option<DateTime<Utc>>) -> BorrowRecord {
        BorrowRecord {
            id: 1,
            book_id: 1,
            member_id: 1,
            borrow_date: due - Duration::days(14),
            due_date: due,
            return_date: returned,
        }
    }

    #[test]
    fn test_no_fine_on_due_date() {
        let due = Utc::now();
        let r = record(due, Some(due));
        assert_eq!(r.fine_amount(due, dec!(2.00)), Decimal::ZERO);
    }

    #[test]
    fn test_fine_one_day_late() {
        let due = Utc::now();
        let r = record(due, Some(due + Duration::days(1)));
        assert_eq!(r.fine_amount(Utc::now(), dec!(2.00)), dec!(2.00));
    }

    #[test]
    fn test_fine_five_days_late() {
        let due = Utc::now();
        let r = record(due, Some(due + Duration::days(5)));
        assert_eq!(r.fine_amount(Utc::now(), dec!(2.00)), dec!(10.00));
    }

    #[test]
    fn test_partial_day_not_charged() {
        let due = Utc::now();
        let r = record(due, Some(due + Duration::hours(23)));
        assert_eq!(r.days_overdue(Utc::now()), 0);
        let r = record(due, Some(due + Duration::hours(49)));
        assert_eq!(r.days_overdue(Utc::now()), 2);
    }

    #[test]
    fn test_early_return_not_negative() {
        let due = Utc::now();
        let r = record(due, Some(due - Duration::days(3)));
        assert_eq!(r.fine_amount(Utc::now(), dec!(2.00)), Decimal::ZERO);
    }

    #[test]
    fn test_open_loan_accrues_against_now() {
        let now = Utc::now();
        let r = record(now - Duration::days(4), None);
        assert!(r.is_overdue(now));
        assert_eq!(r.fine_amount(now, dec!(2.00)), dec!(8.00));
    }
}
