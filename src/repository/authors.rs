//! Authors repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::author::{Author, CreateAuthor, UpdateAuthor},
};

const AUTHOR_SELECT: &str = r#"
    SELECT a.*,
           (SELECT COUNT(*) FROM book_authors ba WHERE ba.author_id = a.id) AS book_count
    FROM authors a
"#;

#[derive(Clone)]
pub struct AuthorsRepository {
    pool: Pool<Postgres>,
}

impl AuthorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Author> {
        sqlx::query_as::<_, Author>(&format!("{} WHERE a.id = $1", AUTHOR_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    /// List authors, optionally filtered by a name fragment
    pub async fn list(&self, q: Option<&str>) -> AppResult<Vec<Author>> {
        let authors = match q.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => {
                sqlx::query_as::<_, Author>(&format!(
                    "{} WHERE LOWER(a.name) LIKE $1 ORDER BY a.name",
                    AUTHOR_SELECT
                ))
                .bind(format!("%{}%", q.to_lowercase()))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Author>(&format!("{} ORDER BY a.name", AUTHOR_SELECT))
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(authors)
    }

    pub async fn create(&self, author: &CreateAuthor) -> AppResult<Author> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO authors (name, bio, date_of_birth, date_of_death, nationality, website)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(author.name.trim())
        .bind(&author.bio)
        .bind(author.date_of_birth)
        .bind(author.date_of_death)
        .bind(&author.nationality)
        .bind(&author.website)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "An author with this name already exists"))?;

        self.get_by_id(id).await
    }

    pub async fn update(&self, id: i32, author: &UpdateAuthor) -> AppResult<Author> {
        let result = sqlx::query(
            r#"
            UPDATE authors SET
                name = COALESCE($2, name),
                bio = COALESCE($3, bio),
                date_of_birth = COALESCE($4, date_of_birth),
                date_of_death = COALESCE($5, date_of_death),
                nationality = COALESCE($6, nationality),
                website = COALESCE($7, website)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(author.name.as_deref().map(str::trim))
        .bind(&author.bio)
        .bind(author.date_of_birth)
        .bind(author.date_of_death)
        .bind(&author.nationality)
        .bind(&author.website)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "An author with this name already exists"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Author with id {} not found", id)));
        }
        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Author with id {} not found", id)));
        }
        Ok(())
    }
}
