//! Book model and catalog helpers

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{author::AuthorShort, category::CategoryShort, publisher::PublisherShort, text_enum_sqlx};
use crate::error::{AppError, AppResult};

/// Circulation status of a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    Available,
    Borrowed,
    Maintenance,
    Lost,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "available",
            BookStatus::Borrowed => "borrowed",
            BookStatus::Maintenance => "maintenance",
            BookStatus::Lost => "lost",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BookStatus::Available => "Available",
            BookStatus::Borrowed => "Borrowed",
            BookStatus::Maintenance => "Under Maintenance",
            BookStatus::Lost => "Lost",
        }
    }
}

impl std::str::FromStr for BookStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "available" => Ok(BookStatus::Available),
            "borrowed" => Ok(BookStatus::Borrowed),
            "maintenance" => Ok(BookStatus::Maintenance),
            "lost" => Ok(BookStatus::Lost),
            _ => Err(format!("Invalid book status: {}", s)),
        }
    }
}

text_enum_sqlx!(BookStatus);

/// Physical or digital format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookType {
    Hardcover,
    Paperback,
    Ebook,
    Audiobook,
}

impl BookType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookType::Hardcover => "hardcover",
            BookType::Paperback => "paperback",
            BookType::Ebook => "ebook",
            BookType::Audiobook => "audiobook",
        }
    }
}

impl std::str::FromStr for BookType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hardcover" => Ok(BookType::Hardcover),
            "paperback" => Ok(BookType::Paperback),
            "ebook" => Ok(BookType::Ebook),
            "audiobook" => Ok(BookType::Audiobook),
            _ => Err(format!("Invalid book type: {}", s)),
        }
    }
}

text_enum_sqlx!(BookType);

/// Book record from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub subtitle: Option<String>,
    pub isbn: String,
    pub isbn13: Option<String>,
    pub publisher_id: Option<i32>,
    pub published_date: Option<NaiveDate>,
    pub edition: i32,
    pub book_type: BookType,
    pub language: String,
    pub page_count: Option<i32>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub barcode: String,
    pub status: BookStatus,
    pub available_copies: i32,
    pub created_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// A copy can be lent right now
    pub fn is_available(&self) -> bool {
        self.status == BookStatus::Available && self.available_copies > 0
    }
}

/// `available` needs a copy on the shelf; `borrowed` means none is left
pub fn check_status_consistency(status: BookStatus, available_copies: i32) -> AppResult<()> {
    match status {
        BookStatus::Available if available_copies == 0 => Err(AppError::Validation(
            "An available book needs at least one available copy".to_string(),
        )),
        BookStatus::Borrowed if available_copies > 0 => Err(AppError::Validation(
            "A borrowed book cannot have available copies".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Compact book payload used by scan responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookCard {
    pub id: i32,
    pub title: String,
    pub isbn: String,
    pub barcode: String,
    /// Human readable status label
    pub status: String,
    pub available_copies: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_names: Option<String>,
}

impl From<&Book> for BookCard {
    fn from(book: &Book) -> Self {
        BookCard {
            id: book.id,
            title: book.title.clone(),
            isbn: book.isbn.clone(),
            barcode: book.barcode.clone(),
            status: book.status.label().to_string(),
            available_copies: book.available_copies,
            author_names: None,
        }
    }
}

/// Short book representation for lists
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookShort {
    pub id: i32,
    pub title: String,
    pub isbn: String,
    pub barcode: String,
    pub status: BookStatus,
    pub available_copies: i32,
    pub published_date: Option<NaiveDate>,
    /// Comma separated author names
    pub author_names: Option<String>,
}

/// Book with its relationships
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,
    pub is_available: bool,
    pub publisher: Option<PublisherShort>,
    pub authors: Vec<AuthorShort>,
    pub categories: Vec<CategoryShort>,
}

impl BookDetails {
    pub fn author_names(&self) -> String {
        self.authors
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Book search parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Search in title, author names and ISBN
    pub q: Option<String>,
    pub status: Option<BookStatus>,
    /// Category id
    pub category: Option<i32>,
    /// Publication year
    pub year: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,
    #[validate(length(max = 200, message = "Subtitle must be at most 200 characters"))]
    pub subtitle: Option<String>,
    /// ISBN-10 or ISBN-13, hyphens allowed
    pub isbn: String,
    pub isbn13: Option<String>,
    pub publisher_id: Option<i32>,
    #[serde(default)]
    pub author_ids: Vec<i32>,
    #[serde(default)]
    pub category_ids: Vec<i32>,
    pub published_date: Option<NaiveDate>,
    #[validate(range(min = 1, message = "Edition must be positive"))]
    pub edition: Option<i32>,
    pub book_type: Option<BookType>,
    #[validate(length(max = 20, message = "Language must be at most 20 characters"))]
    pub language: Option<String>,
    #[validate(range(min = 1, message = "Page count must be positive"))]
    pub page_count: Option<i32>,
    pub description: Option<String>,
    #[validate(length(max = 50, message = "Location must be at most 50 characters"))]
    pub location: Option<String>,
    /// Generated when absent
    #[validate(length(min = 1, max = 50, message = "Barcode must be 1 to 50 characters"))]
    pub barcode: Option<String>,
    pub status: Option<BookStatus>,
    #[validate(range(min = 0, message = "Available copies cannot be negative"))]
    pub available_copies: Option<i32>,
}

/// Update book request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub isbn: Option<String>,
    pub isbn13: Option<String>,
    pub publisher_id: Option<i32>,
    pub author_ids: Option<Vec<i32>>,
    pub category_ids: Option<Vec<i32>>,
    pub published_date: Option<NaiveDate>,
    #[validate(range(min = 1, message = "Edition must be positive"))]
    pub edition: Option<i32>,
    pub book_type: Option<BookType>,
    pub language: Option<String>,
    #[validate(range(min = 1, message = "Page count must be positive"))]
    pub page_count: Option<i32>,
    pub description: Option<String>,
    pub location: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Barcode must be 1 to 50 characters"))]
    pub barcode: Option<String>,
    pub status: Option<BookStatus>,
    #[validate(range(min = 0, message = "Available copies cannot be negative"))]
    pub available_copies: Option<i32>,
}

static ISBN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{9}[\dX]|\d{13})$").unwrap());

/// Strip separators and check the ISBN is 10 or 13 characters long
pub fn normalize_isbn(raw: &str) -> AppResult<String> {
    let isbn: String = raw
        .chars()
        .filter(|c| !matches!(c, '-' | ' '))
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if ISBN_RE.is_match(&isbn) {
        Ok(isbn)
    } else {
        Err(AppError::Validation(format!(
            "Invalid ISBN '{}': expected 10 or 13 digits",
            raw
        )))
    }
}

/// ISBN-13 form of a normalized ISBN
pub fn isbn13_from(isbn: &str) -> String {
    if isbn.len() == 13 {
        return isbn.to_string();
    }

    let body = format!("978{}", &isbn[..9]);
    let sum: u32 = body
        .chars()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d } else { d * 3 })
        .sum();
    let check = (10 - sum % 10) % 10;
    format!("{}{}", body, check)
}

/// Barcode value for books registered without one: `LIB` + 8 hex digits
pub fn generate_barcode() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("LIB{}", hex[..8].to_uppercase())
}
