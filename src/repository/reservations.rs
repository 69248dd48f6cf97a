//! Reservations repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult, LendingViolation},
    models::reservation::{Reservation, ReservationDetails, ReservationQuery},
};

use super::{paginate, DEFAULT_PER_PAGE};

const RESERVATION_DETAILS_SELECT: &str = r#"
    SELECT r.id, r.book_id, b.title AS book_title,
           r.member_id, m.login AS member_login,
           NULLIF(TRIM(CONCAT_WS(' ', m.firstname, m.lastname)), '') AS member_name,
           m.email AS member_email,
           r.reservation_date, r.status, r.notification_sent
    FROM reservations r
    JOIN books b ON b.id = r.book_id
    JOIN members m ON m.id = r.member_id
"#;

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    pub async fn get_details(&self, id: i32) -> AppResult<ReservationDetails> {
        sqlx::query_as::<_, ReservationDetails>(&format!("{} WHERE r.id = $1", RESERVATION_DETAILS_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    /// Insert a reservation, or re-queue a closed one for the same book and member
    pub async fn create(&self, book_id: i32, member_id: i32, at: DateTime<Utc>) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations (book_id, member_id, reservation_date, status, notification_sent)
            VALUES ($1, $2, $3, 'active', FALSE)
            ON CONFLICT (book_id, member_id) DO UPDATE
                SET reservation_date = EXCLUDED.reservation_date,
                    status = 'active',
                    notification_sent = FALSE
                WHERE reservations.status <> 'active'
            RETURNING *
            "#,
        )
        .bind(book_id)
        .bind(member_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::Conflict("You already have an active reservation for this book".to_string()))
    }

    /// Cancel an active reservation
    pub async fn cancel(&self, id: i32) -> AppResult<Reservation> {
        let cancelled = sqlx::query_as::<_, Reservation>(
            r#"
            UPDATE reservations SET status = 'cancelled'
            WHERE id = $1 AND status = 'active'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match cancelled {
            Some(reservation) => Ok(reservation),
            None => {
                self.get_by_id(id).await?;
                Err(LendingViolation::ReservationNotActive.into())
            }
        }
    }

    /// Fulfil the oldest active reservation for a book.
    /// Locked rows are skipped so two concurrent returns never pick the same one.
    pub async fn fulfil_next(&self, book_id: i32) -> AppResult<Option<ReservationDetails>> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            WITH next AS (
                SELECT id FROM reservations
                WHERE book_id = $1 AND status = 'active'
                ORDER BY reservation_date, id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE reservations r SET status = 'fulfilled'
            FROM next
            WHERE r.id = next.id
            RETURNING r.id
            "#,
        )
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;

        match id {
            Some(id) => Ok(Some(self.get_details(id).await?)),
            None => Ok(None),
        }
    }

    pub async fn mark_notified(&self, id: i32) -> AppResult<()> {
        sqlx::query("UPDATE reservations SET notification_sent = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// List reservations with pagination, queue order
    pub async fn list(&self, query: &ReservationQuery) -> AppResult<(Vec<ReservationDetails>, i64)> {
        let (_, per_page, offset) = paginate(query.page, query.per_page, DEFAULT_PER_PAGE);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM reservations r WHERE TRUE");
        push_reservation_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(RESERVATION_DETAILS_SELECT);
        select.push(" WHERE TRUE");
        push_reservation_filters(&mut select, query);
        select.push(" ORDER BY r.reservation_date, r.id LIMIT ");
        select.push_bind(per_page);
        select.push(" OFFSET ");
        select.push_bind(offset);

        let reservations = select
            .build_query_as::<ReservationDetails>()
            .fetch_all(&self.pool)
            .await?;
        Ok((reservations, total))
    }
}

fn push_reservation_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ReservationQuery) {
    if let Some(member_id) = query.member_id {
        builder.push(" AND r.member_id = ");
        builder.push_bind(member_id);
    }
    if let Some(book_id) = query.book_id {
        builder.push(" AND r.book_id = ");
        builder.push_bind(book_id);
    }
    if let Some(status) = query.status {
        builder.push(" AND r.status = ");
        builder.push_bind(status);
    }
}
