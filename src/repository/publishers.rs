//! Publishers repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::publisher::{CreatePublisher, Publisher, UpdatePublisher},
};

const PUBLISHER_SELECT: &str = r#"
    SELECT p.*,
           (SELECT COUNT(*) FROM books b WHERE b.publisher_id = p.id) AS book_count
    FROM publishers p
"#;

#[derive(Clone)]
pub struct PublishersRepository {
    pool: Pool<Postgres>,
}

impl PublishersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Publisher> {
        sqlx::query_as::<_, Publisher>(&format!("{} WHERE p.id = $1", PUBLISHER_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Publisher with id {} not found", id)))
    }

    pub async fn list(&self) -> AppResult<Vec<Publisher>> {
        let publishers = sqlx::query_as::<_, Publisher>(&format!("{} ORDER BY p.name", PUBLISHER_SELECT))
            .fetch_all(&self.pool)
            .await?;
        Ok(publishers)
    }

    pub async fn create(&self, publisher: &CreatePublisher) -> AppResult<Publisher> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO publishers (name, address, phone, email, website, established_year)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(publisher.name.trim())
        .bind(&publisher.address)
        .bind(&publisher.phone)
        .bind(&publisher.email)
        .bind(&publisher.website)
        .bind(publisher.established_year)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "A publisher with this name already exists"))?;

        self.get_by_id(id).await
    }

    pub async fn update(&self, id: i32, publisher: &UpdatePublisher) -> AppResult<Publisher> {
        let result = sqlx::query(
            r#"
            UPDATE publishers SET
                name = COALESCE($2, name),
                address = COALESCE($3, address),
                phone = COALESCE($4, phone),
                email = COALESCE($5, email),
                website = COALESCE($6, website),
                established_year = COALESCE($7, established_year)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(publisher.name.as_deref().map(str::trim))
        .bind(&publisher.address)
        .bind(&publisher.phone)
        .bind(&publisher.email)
        .bind(&publisher.website)
        .bind(publisher.established_year)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "A publisher with this name already exists"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Publisher with id {} not found", id)));
        }
        self.get_by_id(id).await
    }

    /// Books keep their record; their publisher link is cleared
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM publishers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Publisher with id {} not found", id)));
        }
        Ok(())
    }
}
