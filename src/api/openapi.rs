//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{
    auth, authors, books, categories, health, loans, members, notifications, publishers,
    reservations, scan, stats,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bibliotheca API",
        version = "1.0.0",
        description = "Library Management REST API: catalog, members, lending and reservations"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    modifiers(&SecurityAddon),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::register,
        auth::me,
        // Books
        books::list_books,
        books::get_book,
        books::lookup_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Authors
        authors::list_authors,
        authors::get_author,
        authors::create_author,
        authors::update_author,
        authors::delete_author,
        // Publishers
        publishers::list_publishers,
        publishers::get_publisher,
        publishers::create_publisher,
        publishers::update_publisher,
        publishers::delete_publisher,
        // Categories
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        // Members
        members::list_members,
        members::get_member,
        members::create_member,
        members::update_member,
        members::delete_member,
        members::top_up,
        members::renew_member,
        members::get_member_loans,
        // Loans
        loans::list_loans,
        loans::borrow,
        loans::return_loan,
        // Reservations
        reservations::list_reservations,
        reservations::create_reservation,
        reservations::cancel_reservation,
        // Scan
        scan::scan,
        scan::bulk_scan,
        // Notifications
        notifications::send_due_reminders,
        notifications::send_overdue_alerts,
        // Stats
        stats::get_stats,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            crate::models::member::RegisterMember,
            // Books
            crate::models::book::Book,
            crate::models::book::BookStatus,
            crate::models::book::BookType,
            crate::models::book::BookShort,
            crate::models::book::BookDetails,
            crate::models::book::BookCard,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::api::PaginatedBooks,
            // Authors, publishers, categories
            crate::models::author::Author,
            crate::models::author::AuthorShort,
            crate::models::author::CreateAuthor,
            crate::models::author::UpdateAuthor,
            crate::models::publisher::Publisher,
            crate::models::publisher::PublisherShort,
            crate::models::publisher::CreatePublisher,
            crate::models::publisher::UpdatePublisher,
            crate::models::category::Category,
            crate::models::category::CategoryShort,
            crate::models::category::CreateCategory,
            crate::models::category::UpdateCategory,
            // Members
            crate::models::member::Role,
            crate::models::member::Member,
            crate::models::member::MemberDetails,
            crate::models::member::MemberShort,
            crate::models::member::CreateMember,
            crate::models::member::UpdateMember,
            crate::models::member::TopUpRequest,
            crate::api::PaginatedMembers,
            // Loans
            crate::models::loan::BorrowRecord,
            crate::models::loan::LoanDetails,
            crate::models::loan::LoanStatusFilter,
            crate::models::loan::BorrowRequest,
            crate::services::lending::BorrowOutcome,
            crate::services::lending::ReturnOutcome,
            crate::services::lending::NotificationReport,
            crate::api::PaginatedLoans,
            // Reservations
            crate::models::reservation::Reservation,
            crate::models::reservation::ReservationDetails,
            crate::models::reservation::ReservationStatus,
            crate::models::reservation::CreateReservation,
            crate::api::PaginatedReservations,
            // Scan
            crate::services::scan::ScanAction,
            crate::services::scan::ScanRequest,
            crate::services::scan::ScanResponse,
            crate::services::scan::BulkScanAction,
            crate::services::scan::BulkScanRequest,
            crate::services::scan::BulkScanItem,
            crate::services::scan::BulkScanStats,
            crate::services::scan::BulkScanResponse,
            // Stats
            crate::models::stats::LibraryStats,
            crate::models::stats::PopularBook,
            crate::models::stats::StatsResponse,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "books", description = "Book catalog"),
        (name = "catalog", description = "Authors, publishers and categories"),
        (name = "members", description = "Member management"),
        (name = "loans", description = "Borrowing and returns"),
        (name = "reservations", description = "Reservation queue"),
        (name = "scan", description = "Barcode scanning workflows"),
        (name = "notifications", description = "Loan reminders and overdue alerts"),
        (name = "stats", description = "Statistics")
    )
)]
pub struct ApiDoc;

/// Registers the bearer scheme referenced by `security(("bearer_auth" = []))`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
