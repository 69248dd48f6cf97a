//! Books repository for database operations

use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        author::AuthorShort,
        book::{Book, BookDetails, BookQuery, BookShort},
        category::CategoryShort,
        publisher::PublisherShort,
    },
};

use super::paginate;

const HAS_HISTORY: &str = "Book has borrow history; mark it lost instead";

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Find a book by barcode, falling back to ISBN (10 or 13)
    pub async fn find_by_code(&self, code: &str) -> AppResult<Option<Book>> {
        let code = code.trim();
        let by_barcode = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE barcode = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        if by_barcode.is_some() {
            return Ok(by_barcode);
        }

        let isbn: String = code
            .chars()
            .filter(|c| !matches!(c, '-' | ' '))
            .map(|c| c.to_ascii_uppercase())
            .collect();
        let book = sqlx::query_as::<_, Book>(
            "SELECT * FROM books WHERE isbn = $1 OR isbn13 = $1 ORDER BY id LIMIT 1",
        )
        .bind(&isbn)
        .fetch_optional(&self.pool)
        .await?;
        Ok(book)
    }

    /// Get a book with publisher, authors and categories
    pub async fn get_details(&self, id: i32) -> AppResult<BookDetails> {
        let book = self.get_by_id(id).await?;

        let publisher = match book.publisher_id {
            Some(publisher_id) => {
                sqlx::query_as::<_, PublisherShort>("SELECT id, name FROM publishers WHERE id = $1")
                    .bind(publisher_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => None,
        };

        let authors = sqlx::query_as::<_, AuthorShort>(
            r#"
            SELECT a.id, a.name
            FROM authors a
            JOIN book_authors ba ON ba.author_id = a.id
            WHERE ba.book_id = $1
            ORDER BY a.name
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let categories = sqlx::query_as::<_, CategoryShort>(
            r#"
            SELECT c.id, c.name, c.color
            FROM categories c
            JOIN book_categories bc ON bc.category_id = c.id
            WHERE bc.book_id = $1
            ORDER BY c.name
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(BookDetails {
            is_available: book.is_available(),
            book,
            publisher,
            authors,
            categories,
        })
    }

    /// Comma separated author names of a book
    pub async fn author_names(&self, id: i32) -> AppResult<Option<String>> {
        let names: Option<String> = sqlx::query_scalar(
            r#"
            SELECT STRING_AGG(a.name, ', ' ORDER BY a.name)
            FROM authors a JOIN book_authors ba ON ba.author_id = a.id
            WHERE ba.book_id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(names)
    }

    /// Search books with pagination
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<BookShort>, i64)> {
        let (_, per_page, offset) = paginate(query.page, query.per_page, 12);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books b WHERE TRUE");
        push_book_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(
            r#"
            SELECT b.id, b.title, b.isbn, b.barcode, b.status, b.available_copies, b.published_date,
                   (SELECT STRING_AGG(a.name, ', ' ORDER BY a.name)
                    FROM authors a JOIN book_authors ba ON ba.author_id = a.id
                    WHERE ba.book_id = b.id) AS author_names
            FROM books b
            WHERE TRUE
            "#,
        );
        push_book_filters(&mut select, query);
        select.push(" ORDER BY b.title, b.id LIMIT ");
        select.push_bind(per_page);
        select.push(" OFFSET ");
        select.push_bind(offset);

        let books = select.build_query_as::<BookShort>().fetch_all(&self.pool).await?;
        Ok((books, total))
    }

    /// Insert a book and its author/category links
    pub async fn create(&self, book: &Book, author_ids: &[i32], category_ids: &[i32]) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO books (
                title, subtitle, isbn, isbn13, publisher_id, published_date, edition,
                book_type, language, page_count, description, location, barcode,
                status, available_copies, created_by
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING id
            "#,
        )
        .bind(&book.title)
        .bind(&book.subtitle)
        .bind(&book.isbn)
        .bind(&book.isbn13)
        .bind(book.publisher_id)
        .bind(book.published_date)
        .bind(book.edition)
        .bind(book.book_type)
        .bind(&book.language)
        .bind(book.page_count)
        .bind(&book.description)
        .bind(&book.location)
        .bind(&book.barcode)
        .bind(book.status)
        .bind(book.available_copies)
        .bind(book.created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "A book with this ISBN or barcode already exists"))?;

        link_many(&mut tx, "book_authors", "author_id", id, author_ids).await?;
        link_many(&mut tx, "book_categories", "category_id", id, category_ids).await?;

        tx.commit().await?;
        self.get_by_id(id).await
    }

    /// Apply `edit` to the locked book row and write it back; replace links when given.
    ///
    /// The row stays locked until commit so a concurrent checkout or return
    /// cannot be overwritten by stale copy counters. Returns the row as it was
    /// before the edit and after it.
    pub async fn update<F>(
        &self,
        id: i32,
        edit: F,
        author_ids: Option<&[i32]>,
        category_ids: Option<&[i32]>,
    ) -> AppResult<(Book, Book)>
    where
        F: FnOnce(&mut Book) -> AppResult<()> + Send,
    {
        let mut tx = self.pool.begin().await?;

        let previous = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;
        let mut book = previous.clone();
        edit(&mut book)?;

        let updated = sqlx::query(
            r#"
            UPDATE books SET
                title = $2, subtitle = $3, isbn = $4, isbn13 = $5, publisher_id = $6,
                published_date = $7, edition = $8, book_type = $9, language = $10,
                page_count = $11, description = $12, location = $13, barcode = $14,
                status = $15, available_copies = $16, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.subtitle)
        .bind(&book.isbn)
        .bind(&book.isbn13)
        .bind(book.publisher_id)
        .bind(book.published_date)
        .bind(book.edition)
        .bind(book.book_type)
        .bind(&book.language)
        .bind(book.page_count)
        .bind(&book.description)
        .bind(&book.location)
        .bind(&book.barcode)
        .bind(book.status)
        .bind(book.available_copies)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "A book with this ISBN or barcode already exists"))?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", book.id)));
        }

        if let Some(ids) = author_ids {
            sqlx::query("DELETE FROM book_authors WHERE book_id = $1")
                .bind(book.id)
                .execute(&mut *tx)
                .await?;
            link_many(&mut tx, "book_authors", "author_id", book.id, ids).await?;
        }
        if let Some(ids) = category_ids {
            sqlx::query("DELETE FROM book_categories WHERE book_id = $1")
                .bind(book.id)
                .execute(&mut *tx)
                .await?;
            link_many(&mut tx, "book_categories", "category_id", book.id, ids).await?;
        }

        tx.commit().await?;
        Ok((previous, self.get_by_id(book.id).await?))
    }

    /// Delete a book that has never been lent
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let has_history: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM borrow_records WHERE book_id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if has_history {
            return Err(AppError::Conflict(HAS_HISTORY.to_string()));
        }

        // A loan can still land between the check and the delete
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_foreign_key_violation(e, HAS_HISTORY))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }
}

fn push_book_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &BookQuery) {
    if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = format!("%{}%", q.to_lowercase());
        builder.push(" AND (LOWER(b.title) LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR b.isbn LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR b.barcode = ");
        builder.push_bind(q.to_string());
        builder.push(
            " OR EXISTS (SELECT 1 FROM book_authors ba JOIN authors a ON a.id = ba.author_id \
             WHERE ba.book_id = b.id AND LOWER(a.name) LIKE ",
        );
        builder.push_bind(pattern);
        builder.push("))");
    }
    if let Some(status) = query.status {
        builder.push(" AND b.status = ");
        builder.push_bind(status);
    }
    if let Some(category) = query.category {
        builder.push(" AND EXISTS (SELECT 1 FROM book_categories bc WHERE bc.book_id = b.id AND bc.category_id = ");
        builder.push_bind(category);
        builder.push(")");
    }
    if let Some(year) = query.year {
        builder.push(" AND EXTRACT(YEAR FROM b.published_date)::int = ");
        builder.push_bind(year);
    }
}

async fn link_many(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    table: &str,
    column: &str,
    book_id: i32,
    ids: &[i32],
) -> AppResult<()> {
    for id in ids {
        let sql = format!(
            "INSERT INTO {} (book_id, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            table, column
        );
        sqlx::query(&sql)
            .bind(book_id)
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => {
                    AppError::Validation(format!("Unknown {} {}", column.trim_end_matches("_id"), id))
                }
                _ => AppError::Database(e),
            })?;
    }
    Ok(())
}
