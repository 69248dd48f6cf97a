//! Loans (borrow records) repository for database operations

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult, LendingViolation},
    models::{
        book::Book,
        loan::{BorrowRecord, LoanDetails, LoanQuery, LoanStatusFilter, NewLoan},
        member::Member,
    },
};

use super::{ledger::CheckIn, paginate, DEFAULT_PER_PAGE};

const LOAN_DETAILS_SELECT: &str = r#"
    SELECT br.id, br.book_id, b.title AS book_title, b.barcode AS book_barcode,
           br.member_id, m.login AS member_login,
           NULLIF(TRIM(CONCAT_WS(' ', m.firstname, m.lastname)), '') AS member_name,
           m.email AS member_email,
           br.borrow_date, br.due_date, br.return_date
    FROM borrow_records br
    JOIN books b ON b.id = br.book_id
    JOIN members m ON m.id = br.member_id
"#;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<BorrowRecord> {
        sqlx::query_as::<_, BorrowRecord>("SELECT * FROM borrow_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow record with id {} not found", id)))
    }

    pub async fn count_open_for_member(&self, member_id: i32) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM borrow_records WHERE member_id = $1 AND return_date IS NULL",
        )
        .bind(member_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Oldest open loan on a book, optionally for one member only
    pub async fn find_open_for_book(
        &self,
        book_id: i32,
        member_id: Option<i32>,
    ) -> AppResult<Option<BorrowRecord>> {
        let loan = sqlx::query_as::<_, BorrowRecord>(
            r#"
            SELECT * FROM borrow_records
            WHERE book_id = $1 AND return_date IS NULL
              AND ($2::int IS NULL OR member_id = $2)
            ORDER BY borrow_date, id
            LIMIT 1
            "#,
        )
        .bind(book_id)
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(loan)
    }

    /// Take a copy and open a loan in one transaction.
    ///
    /// The member row is locked so concurrent borrows by the same member
    /// cannot both pass the cap check; the copy counter is decremented with a
    /// conditional update so the last copy goes to exactly one caller.
    pub async fn check_out(&self, loan: &NewLoan, max_open_loans: i64) -> AppResult<(BorrowRecord, Book)> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i32>("SELECT id FROM members WHERE id = $1 FOR UPDATE")
            .bind(loan.member_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", loan.member_id)))?;

        let open = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM borrow_records WHERE member_id = $1 AND return_date IS NULL",
        )
        .bind(loan.member_id)
        .fetch_one(&mut *tx)
        .await?;

        if open >= max_open_loans {
            return Err(LendingViolation::BorrowCapReached {
                current: open,
                limit: max_open_loans,
            }
            .into());
        }

        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                available_copies = available_copies - 1,
                status = CASE WHEN available_copies = 1 THEN 'borrowed' ELSE status END,
                updated_at = NOW()
            WHERE id = $1 AND status = 'available' AND available_copies > 0
            RETURNING *
            "#,
        )
        .bind(loan.book_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(LendingViolation::BookUnavailable)?;

        let record = sqlx::query_as::<_, BorrowRecord>(
            r#"
            INSERT INTO borrow_records (book_id, member_id, borrow_date, due_date)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(loan.book_id)
        .bind(loan.member_id)
        .bind(loan.borrow_date)
        .bind(loan.due_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((record, book))
    }

    /// Close a loan, put the copy back and debit the fine in one transaction
    pub async fn check_in(
        &self,
        loan_id: i32,
        returned_at: DateTime<Utc>,
        fine: Decimal,
    ) -> AppResult<CheckIn> {
        let mut tx = self.pool.begin().await?;

        let closed = sqlx::query_as::<_, BorrowRecord>(
            r#"
            UPDATE borrow_records SET return_date = $2
            WHERE id = $1 AND return_date IS NULL
            RETURNING *
            "#,
        )
        .bind(loan_id)
        .bind(returned_at)
        .fetch_optional(&mut *tx)
        .await?;

        let loan = match closed {
            Some(loan) => loan,
            None => {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM borrow_records WHERE id = $1)")
                        .bind(loan_id)
                        .fetch_one(&mut *tx)
                        .await?;
                return Err(if exists {
                    LendingViolation::AlreadyReturned.into()
                } else {
                    AppError::NotFound(format!("Borrow record with id {} not found", loan_id))
                });
            }
        };

        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                available_copies = available_copies + 1,
                status = 'available',
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(loan.book_id)
        .fetch_one(&mut *tx)
        .await?;

        let member = sqlx::query_as::<_, Member>(
            r#"
            UPDATE members SET fine_balance = fine_balance - $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(loan.member_id)
        .bind(fine)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(CheckIn { loan, book, member })
    }

    /// List loans with pagination, newest first
    pub async fn list(&self, query: &LoanQuery) -> AppResult<(Vec<LoanDetails>, i64)> {
        let (_, per_page, offset) = paginate(query.page, query.per_page, DEFAULT_PER_PAGE);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM borrow_records br WHERE TRUE");
        push_loan_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(LOAN_DETAILS_SELECT);
        select.push(" WHERE TRUE");
        push_loan_filters(&mut select, query);
        select.push(" ORDER BY br.borrow_date DESC, br.id DESC LIMIT ");
        select.push_bind(per_page);
        select.push(" OFFSET ");
        select.push_bind(offset);

        let loans = select.build_query_as::<LoanDetails>().fetch_all(&self.pool).await?;
        Ok((loans, total))
    }

    /// Open loans due before `cutoff`, earliest first
    pub async fn open_due_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<LoanDetails>> {
        let loans = sqlx::query_as::<_, LoanDetails>(&format!(
            "{} WHERE br.return_date IS NULL AND br.due_date < $1 ORDER BY br.due_date, br.id",
            LOAN_DETAILS_SELECT
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }
}

fn push_loan_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &LoanQuery) {
    match query.status {
        Some(LoanStatusFilter::Open) => {
            builder.push(" AND br.return_date IS NULL");
        }
        Some(LoanStatusFilter::Returned) => {
            builder.push(" AND br.return_date IS NOT NULL");
        }
        None => {}
    }
    if let Some(member_id) = query.member_id {
        builder.push(" AND br.member_id = ");
        builder.push_bind(member_id);
    }
    if let Some(book_id) = query.book_id {
        builder.push(" AND br.book_id = ");
        builder.push_bind(book_id);
    }
    if query.overdue == Some(true) {
        builder.push(" AND br.return_date IS NULL AND br.due_date < NOW()");
    }
}
