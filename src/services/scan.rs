//! Barcode scan workflows
//!
//! A scanned code is resolved to a book (barcode first, then ISBN) and the
//! requested action is dispatched to the lending service. Lending failures are
//! reported in the payload instead of failing the request.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::lending::LendingService;
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookCard},
        loan::BorrowRequest,
        member::Actor,
    },
    repository::LedgerStore,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScanAction {
    #[default]
    Search,
    Borrow,
    Return,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BulkScanAction {
    #[default]
    Inventory,
    BulkReturn,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ScanRequest {
    /// Barcode or ISBN
    pub barcode: String,
    #[serde(default)]
    pub action: ScanAction,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScanResponse {
    pub success: bool,
    pub action: ScanAction,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book: Option<BookCard>,
    /// Fine charged by a return
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fine: Option<Decimal>,
}

impl ScanResponse {
    fn failed(action: ScanAction, message: String) -> Self {
        Self {
            success: false,
            action,
            message,
            book: None,
            fine: None,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkScanRequest {
    #[serde(default)]
    pub action: BulkScanAction,
    /// Scanned barcodes or ISBNs
    pub items: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkScanItem {
    pub barcode: String,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book: Option<BookCard>,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct BulkScanStats {
    pub total: usize,
    pub success: usize,
    pub errors: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkScanResponse {
    /// False when there was nothing to process
    pub success: bool,
    pub results: Vec<BulkScanItem>,
    pub summary: String,
    pub stats: BulkScanStats,
}

/// Infrastructure failures abort the scan; everything else is reported
fn reportable(err: AppError) -> AppResult<String> {
    match err {
        AppError::Database(_) | AppError::Internal(_) => Err(err),
        other => Ok(other.public_message()),
    }
}

fn fine_note(fine: Decimal) -> Option<String> {
    (fine > Decimal::ZERO).then(|| format!("{:.2}", fine))
}

#[derive(Clone)]
pub struct ScanService {
    store: Arc<dyn LedgerStore>,
    lending: LendingService,
}

impl ScanService {
    pub fn new(store: Arc<dyn LedgerStore>, lending: LendingService) -> Self {
        Self { store, lending }
    }

    async fn resolve(&self, code: &str) -> AppResult<Option<Book>> {
        let code = code.trim();
        if code.is_empty() {
            return Ok(None);
        }
        self.store.book_by_code(code).await
    }

    /// Handle a single scanned code
    pub async fn scan(&self, actor: &Actor, request: ScanRequest) -> AppResult<ScanResponse> {
        let action = request.action;
        if request.barcode.trim().is_empty() {
            return Ok(ScanResponse::failed(action, "Barcode is required".to_string()));
        }

        let book = match self.resolve(&request.barcode).await? {
            Some(book) => book,
            None => {
                return Ok(ScanResponse::failed(
                    action,
                    "Book not found with this barcode".to_string(),
                ))
            }
        };

        match action {
            ScanAction::Search => {
                let mut card = BookCard::from(&book);
                card.author_names = self.store.author_names(book.id).await?;
                Ok(ScanResponse {
                    success: true,
                    action,
                    message: format!("Found: {}", book.title),
                    book: Some(card),
                    fine: None,
                })
            }
            ScanAction::Borrow => {
                let request = BorrowRequest {
                    book_id: book.id,
                    member_id: actor.member_id,
                    due_date: None,
                };
                match self.lending.borrow(actor, request).await {
                    Ok(outcome) => Ok(ScanResponse {
                        success: true,
                        action,
                        message: format!("Book \"{}\" borrowed successfully", book.title),
                        book: Some(BookCard::from(&outcome.book)),
                        fine: None,
                    }),
                    Err(e) => Ok(ScanResponse::failed(action, reportable(e)?)),
                }
            }
            ScanAction::Return => match self.lending.return_book(actor, book.id).await {
                Ok(outcome) => {
                    let mut message = format!("Book \"{}\" returned successfully", book.title);
                    if let Some(fine) = fine_note(outcome.fine) {
                        message.push_str(&format!(". Fine: {}", fine));
                    }
                    Ok(ScanResponse {
                        success: true,
                        action,
                        message,
                        book: Some(BookCard::from(&outcome.book)),
                        fine: Some(outcome.fine),
                    })
                }
                Err(e) => Ok(ScanResponse::failed(action, reportable(e)?)),
            },
        }
    }

    /// Handle a batch of scanned codes; each item succeeds or fails on its own
    pub async fn bulk_scan(&self, actor: &Actor, request: BulkScanRequest) -> AppResult<BulkScanResponse> {
        if request.items.is_empty() {
            return Ok(BulkScanResponse {
                success: false,
                results: Vec::new(),
                summary: "No items to process".to_string(),
                stats: BulkScanStats::default(),
            });
        }

        let mut results = Vec::with_capacity(request.items.len());
        for barcode in request.items {
            let item = match request.action {
                BulkScanAction::Inventory => self.inventory_item(barcode).await?,
                BulkScanAction::BulkReturn => self.return_item(actor, barcode).await?,
            };
            results.push(item);
        }

        let success = results.iter().filter(|r| r.success).count();
        let stats = BulkScanStats {
            total: results.len(),
            success,
            errors: results.len() - success,
        };
        let summary = match request.action {
            BulkScanAction::Inventory => format!("{} of {} items found", stats.success, stats.total),
            BulkScanAction::BulkReturn => format!("{} of {} items returned", stats.success, stats.total),
        };

        tracing::info!(
            action = ?request.action,
            total = stats.total,
            success = stats.success,
            errors = stats.errors,
            "Bulk scan processed"
        );

        Ok(BulkScanResponse {
            success: true,
            results,
            summary,
            stats,
        })
    }

    async fn inventory_item(&self, barcode: String) -> AppResult<BulkScanItem> {
        Ok(match self.resolve(&barcode).await? {
            Some(book) => BulkScanItem {
                message: format!("Found: {}", book.title),
                book: Some(BookCard::from(&book)),
                success: true,
                barcode,
            },
            None => BulkScanItem {
                barcode,
                success: false,
                message: "Book not found in system".to_string(),
                book: None,
            },
        })
    }

    async fn return_item(&self, actor: &Actor, barcode: String) -> AppResult<BulkScanItem> {
        let book = match self.resolve(&barcode).await? {
            Some(book) => book,
            None => {
                return Ok(BulkScanItem {
                    barcode,
                    success: false,
                    message: "Book not found".to_string(),
                    book: None,
                })
            }
        };

        Ok(match self.lending.return_book(actor, book.id).await {
            Ok(outcome) => {
                let mut message = format!("Returned: {}", book.title);
                if let Some(fine) = fine_note(outcome.fine) {
                    message.push_str(&format!(" (Fine: {} debited from balance)", fine));
                }
                BulkScanItem {
                    barcode,
                    success: true,
                    message,
                    book: Some(BookCard::from(&outcome.book)),
                }
            }
            Err(e) => BulkScanItem {
                barcode,
                success: false,
                message: reportable(e)?,
                book: Some(BookCard::from(&book)),
            },
        })
    }
}
