//! Categories repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::category::{Category, CreateCategory, UpdateCategory, DEFAULT_COLOR},
};

const CATEGORY_SELECT: &str = r#"
    SELECT c.*,
           (SELECT COUNT(*) FROM book_categories bc WHERE bc.category_id = c.id) AS book_count
    FROM categories c
"#;

#[derive(Clone)]
pub struct CategoriesRepository {
    pool: Pool<Postgres>,
}

impl CategoriesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Category> {
        sqlx::query_as::<_, Category>(&format!("{} WHERE c.id = $1", CATEGORY_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category with id {} not found", id)))
    }

    pub async fn list(&self, include_inactive: bool) -> AppResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "{} WHERE c.is_active OR $1 ORDER BY c.name",
            CATEGORY_SELECT
        ))
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    pub async fn create(&self, category: &CreateCategory) -> AppResult<Category> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO categories (name, description, color, is_active)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(category.name.trim())
        .bind(&category.description)
        .bind(category.color.as_deref().unwrap_or(DEFAULT_COLOR))
        .bind(category.is_active.unwrap_or(true))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "A category with this name already exists"))?;

        self.get_by_id(id).await
    }

    pub async fn update(&self, id: i32, category: &UpdateCategory) -> AppResult<Category> {
        let result = sqlx::query(
            r#"
            UPDATE categories SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                color = COALESCE($4, color),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(category.name.as_deref().map(str::trim))
        .bind(&category.description)
        .bind(&category.color)
        .bind(category.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "A category with this name already exists"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Category with id {} not found", id)));
        }
        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Category with id {} not found", id)));
        }
        Ok(())
    }
}
