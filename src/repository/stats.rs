//! Statistics queries

use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::stats::{LibraryStats, PopularBook},
};

#[derive(Clone)]
pub struct StatsRepository {
    pool: Pool<Postgres>,
}

impl StatsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn counters(&self) -> AppResult<LibraryStats> {
        let stats = sqlx::query_as::<_, LibraryStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM books) AS books_total,
                (SELECT COUNT(*) FROM books WHERE status = 'available' AND available_copies > 0) AS books_available,
                (SELECT COUNT(*) FROM books WHERE status = 'borrowed') AS books_borrowed,
                (SELECT COUNT(*) FROM books WHERE available_copies BETWEEN 1 AND 2) AS books_low_stock,
                (SELECT COUNT(*) FROM members) AS members_total,
                (SELECT COUNT(*) FROM members WHERE is_active) AS members_active,
                (SELECT COUNT(*) FROM borrow_records WHERE return_date IS NULL) AS open_loans,
                (SELECT COUNT(*) FROM borrow_records
                 WHERE return_date IS NULL AND due_date < NOW()) AS overdue_loans,
                (SELECT COUNT(*) FROM reservations WHERE status = 'active') AS active_reservations,
                (SELECT COALESCE(SUM(-fine_balance), 0) FROM members
                 WHERE fine_balance < 0) AS outstanding_debt
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    /// Titles ordered by number of loans
    pub async fn popular_books(&self, limit: i64) -> AppResult<Vec<PopularBook>> {
        let books = sqlx::query_as::<_, PopularBook>(
            r#"
            SELECT b.id AS book_id, b.title, COUNT(br.id) AS borrow_count
            FROM books b
            JOIN borrow_records br ON br.book_id = b.id
            GROUP BY b.id, b.title
            ORDER BY borrow_count DESC, b.title
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }
}
