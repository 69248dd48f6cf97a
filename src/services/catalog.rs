//! Catalog management service

use chrono::Utc;
use validator::Validate;

use super::reservations::ReservationsService;
use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, CreateAuthor, UpdateAuthor},
        book::{
            check_status_consistency, generate_barcode, isbn13_from, normalize_isbn, Book,
            BookDetails, BookQuery, BookShort, BookStatus, BookType, CreateBook, UpdateBook,
        },
        category::{Category, CategoryQuery, CreateCategory, UpdateCategory},
        member::Actor,
        publisher::{check_established_year, CreatePublisher, Publisher, UpdatePublisher},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    reservations: ReservationsService,
}

impl CatalogService {
    pub fn new(repository: Repository, reservations: ReservationsService) -> Self {
        Self {
            repository,
            reservations,
        }
    }

    // =========================================================================
    // BOOKS
    // =========================================================================

    pub async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<BookShort>, i64)> {
        self.repository.books.search(query).await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<BookDetails> {
        self.repository.books.get_details(id).await
    }

    /// Find a book by barcode or ISBN
    pub async fn lookup_book(&self, code: &str) -> AppResult<BookDetails> {
        let book = self
            .repository
            .books
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No book with barcode or ISBN '{}'", code)))?;
        self.repository.books.get_details(book.id).await
    }

    pub async fn create_book(&self, actor: &Actor, request: CreateBook) -> AppResult<BookDetails> {
        actor.require_staff()?;
        request.validate()?;

        let isbn = normalize_isbn(&request.isbn)?;
        let isbn13 = resolve_isbn13(&isbn, request.isbn13.as_deref())?;
        let status = request.status.unwrap_or(BookStatus::Available);
        let available_copies = request.available_copies.unwrap_or(1);
        check_status_consistency(status, available_copies)?;
        if let Some(publisher_id) = request.publisher_id {
            self.repository.publishers.get_by_id(publisher_id).await?;
        }

        let now = Utc::now();
        let book = Book {
            id: 0,
            title: request.title.trim().to_string(),
            subtitle: request.subtitle,
            isbn,
            isbn13: Some(isbn13),
            publisher_id: request.publisher_id,
            published_date: request.published_date,
            edition: request.edition.unwrap_or(1),
            book_type: request.book_type.unwrap_or(BookType::Hardcover),
            language: request.language.unwrap_or_else(|| "English".to_string()),
            page_count: request.page_count,
            description: request.description,
            location: request.location,
            barcode: request.barcode.unwrap_or_else(generate_barcode),
            status,
            available_copies,
            created_by: Some(actor.member_id),
            created_at: now,
            updated_at: now,
        };

        let book = self
            .repository
            .books
            .create(&book, &request.author_ids, &request.category_ids)
            .await?;

        tracing::info!(book_id = book.id, barcode = %book.barcode, "Book created");
        self.repository.books.get_details(book.id).await
    }

    /// Update a book. Setting the status back to available promotes the next reservation.
    pub async fn update_book(&self, actor: &Actor, id: i32, request: UpdateBook) -> AppResult<BookDetails> {
        actor.require_staff()?;
        request.validate()?;
        if let Some(publisher_id) = request.publisher_id {
            self.repository.publishers.get_by_id(publisher_id).await?;
        }

        let (previous, book) = self
            .repository
            .books
            .update(
                id,
                |book| edit_book(book, &request),
                request.author_ids.as_deref(),
                request.category_ids.as_deref(),
            )
            .await?;

        tracing::info!(book_id = id, status = %book.status, "Book updated");

        if let Err(e) = self.reservations.promote_if_reopened(previous.status, &book).await {
            tracing::error!(book_id = book.id, "Reservation promotion failed: {}", e);
        }

        self.repository.books.get_details(id).await
    }

    pub async fn delete_book(&self, actor: &Actor, id: i32) -> AppResult<()> {
        actor.require_staff()?;
        self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }

    // =========================================================================
    // AUTHORS
    // =========================================================================

    pub async fn list_authors(&self, q: Option<&str>) -> AppResult<Vec<Author>> {
        self.repository.authors.list(q).await
    }

    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.repository.authors.get_by_id(id).await
    }

    pub async fn create_author(&self, actor: &Actor, request: CreateAuthor) -> AppResult<Author> {
        actor.require_staff()?;
        request.validate()?;
        check_life_dates(request.date_of_birth, request.date_of_death)?;
        self.repository.authors.create(&request).await
    }

    pub async fn update_author(&self, actor: &Actor, id: i32, request: UpdateAuthor) -> AppResult<Author> {
        actor.require_staff()?;
        request.validate()?;
        let current = self.repository.authors.get_by_id(id).await?;
        check_life_dates(
            request.date_of_birth.or(current.date_of_birth),
            request.date_of_death.or(current.date_of_death),
        )?;
        self.repository.authors.update(id, &request).await
    }

    pub async fn delete_author(&self, actor: &Actor, id: i32) -> AppResult<()> {
        actor.require_staff()?;
        self.repository.authors.delete(id).await
    }

    // =========================================================================
    // PUBLISHERS
    // =========================================================================

    pub async fn list_publishers(&self) -> AppResult<Vec<Publisher>> {
        self.repository.publishers.list().await
    }

    pub async fn get_publisher(&self, id: i32) -> AppResult<Publisher> {
        self.repository.publishers.get_by_id(id).await
    }

    pub async fn create_publisher(&self, actor: &Actor, request: CreatePublisher) -> AppResult<Publisher> {
        actor.require_staff()?;
        request.validate()?;
        check_established_year(request.established_year)?;
        self.repository.publishers.create(&request).await
    }

    pub async fn update_publisher(
        &self,
        actor: &Actor,
        id: i32,
        request: UpdatePublisher,
    ) -> AppResult<Publisher> {
        actor.require_staff()?;
        request.validate()?;
        check_established_year(request.established_year)?;
        self.repository.publishers.update(id, &request).await
    }

    pub async fn delete_publisher(&self, actor: &Actor, id: i32) -> AppResult<()> {
        actor.require_staff()?;
        self.repository.publishers.delete(id).await
    }

    // =========================================================================
    // CATEGORIES
    // =========================================================================

    pub async fn list_categories(&self, query: &CategoryQuery) -> AppResult<Vec<Category>> {
        self.repository
            .categories
            .list(query.include_inactive.unwrap_or(false))
            .await
    }

    pub async fn get_category(&self, id: i32) -> AppResult<Category> {
        self.repository.categories.get_by_id(id).await
    }

    pub async fn create_category(&self, actor: &Actor, request: CreateCategory) -> AppResult<Category> {
        actor.require_staff()?;
        request.validate()?;
        self.repository.categories.create(&request).await
    }

    pub async fn update_category(
        &self,
        actor: &Actor,
        id: i32,
        request: UpdateCategory,
    ) -> AppResult<Category> {
        actor.require_staff()?;
        request.validate()?;
        self.repository.categories.update(id, &request).await
    }

    pub async fn delete_category(&self, actor: &Actor, id: i32) -> AppResult<()> {
        actor.require_staff()?;
        self.repository.categories.delete(id).await
    }
}

/// Validate a supplied ISBN-13 or derive it from the primary ISBN
fn resolve_isbn13(isbn: &str, supplied: Option<&str>) -> AppResult<String> {
    match supplied {
        Some(raw) => {
            let isbn13 = normalize_isbn(raw)?;
            if isbn13.len() != 13 {
                return Err(AppError::Validation(format!(
                    "Invalid ISBN-13 '{}': expected 13 digits",
                    raw
                )));
            }
            Ok(isbn13)
        }
        None => Ok(isbn13_from(isbn)),
    }
}

fn check_life_dates(
    born: Option<chrono::NaiveDate>,
    died: Option<chrono::NaiveDate>,
) -> AppResult<()> {
    match (born, died) {
        (Some(b), Some(d)) if d < b => Err(AppError::Validation(
            "Date of death cannot precede date of birth".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Merge an edit into the current row and check the result is coherent
fn edit_book(book: &mut Book, update: &UpdateBook) -> AppResult<()> {
    apply_update(book, update)?;
    check_status_consistency(book.status, book.available_copies)
}

/// Merge the supplied fields into `book`
fn apply_update(book: &mut Book, update: &UpdateBook) -> AppResult<()> {
    if let Some(ref title) = update.title {
        book.title = title.trim().to_string();
    }
    if let Some(ref subtitle) = update.subtitle {
        book.subtitle = Some(subtitle.clone());
    }
    if let Some(ref raw) = update.isbn {
        book.isbn = normalize_isbn(raw)?;
        if update.isbn13.is_none() {
            book.isbn13 = Some(isbn13_from(&book.isbn));
        }
    }
    if update.isbn13.is_some() {
        book.isbn13 = Some(resolve_isbn13(&book.isbn, update.isbn13.as_deref())?);
    }
    if update.publisher_id.is_some() {
        book.publisher_id = update.publisher_id;
    }
    if update.published_date.is_some() {
        book.published_date = update.published_date;
    }
    if let Some(edition) = update.edition {
        book.edition = edition;
    }
    if let Some(book_type) = update.book_type {
        book.book_type = book_type;
    }
    if let Some(ref language) = update.language {
        book.language = language.clone();
    }
    if update.page_count.is_some() {
        book.page_count = update.page_count;
    }
    if let Some(ref description) = update.description {
        book.description = Some(description.clone());
    }
    if let Some(ref location) = update.location {
        book.location = Some(location.clone());
    }
    if let Some(ref barcode) = update.barcode {
        book.barcode = barcode.trim().to_string();
    }
    if let Some(status) = update.status {
        book.status = status;
    }
    if let Some(copies) = update.available_copies {
        book.available_copies = copies;
    }
    Ok(())
}
