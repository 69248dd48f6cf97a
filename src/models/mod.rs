//! Data models for Bibliotheca

/// Store a string-backed enum as TEXT in Postgres.
///
/// The type must provide `as_str()` and `FromStr<Err = String>`.
macro_rules! text_enum_sqlx {
    ($ty:ty) => {
        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s: String = sqlx::Decode::<sqlx::Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use text_enum_sqlx;

pub mod author;
pub mod book;
pub mod category;
pub mod loan;
pub mod member;
pub mod publisher;
pub mod reservation;
pub mod stats;

// Re-export commonly used types
pub use author::Author;
pub use book::{Book, BookDetails, BookShort, BookStatus};
pub use category::Category;
pub use loan::{BorrowRecord, LoanDetails};
pub use member::{Actor, Member, Role};
pub use publisher::Publisher;
pub use reservation::{Reservation, ReservationDetails, ReservationStatus};
