//! Members repository for database operations

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::member::{CreateMember, Member, MemberQuery, MemberShort, Role, UpdateMember},
};

use super::{paginate, DEFAULT_PER_PAGE};

#[derive(Clone)]
pub struct MembersRepository {
    pool: Pool<Postgres>,
}

impl MembersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get member by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Member> {
        sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))
    }

    /// Get member by login
    pub async fn get_by_login(&self, login: &str) -> AppResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>("SELECT * FROM members WHERE login = $1")
            .bind(login)
            .fetch_optional(&self.pool)
            .await?;
        Ok(member)
    }

    /// Search members with pagination
    pub async fn search(&self, query: &MemberQuery) -> AppResult<(Vec<MemberShort>, i64)> {
        let (_, per_page, offset) = paginate(query.page, query.per_page, DEFAULT_PER_PAGE);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM members m WHERE TRUE");
        push_member_filters(&mut count, query)?;
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(
            r#"
            SELECT m.id, m.login, m.firstname, m.lastname, m.card_number, m.role,
                   m.is_active, m.fine_balance,
                   (SELECT COUNT(*) FROM borrow_records br
                    WHERE br.member_id = m.id AND br.return_date IS NULL) AS open_loans
            FROM members m
            WHERE TRUE
            "#,
        );
        push_member_filters(&mut select, query)?;
        select.push(" ORDER BY m.lastname, m.firstname, m.login LIMIT ");
        select.push_bind(per_page);
        select.push(" OFFSET ");
        select.push_bind(offset);

        let members = select.build_query_as::<MemberShort>().fetch_all(&self.pool).await?;
        Ok((members, total))
    }

    /// Create a new member; the card number defaults to `M` + zero padded id
    pub async fn create(&self, member: &CreateMember, password: Option<String>) -> AppResult<Member> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO members (
                login, password, firstname, lastname, email, phone, address,
                card_number, role, is_active, membership_date
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, COALESCE($11, CURRENT_DATE))
            RETURNING id
            "#,
        )
        .bind(member.login.trim())
        .bind(&password)
        .bind(&member.firstname)
        .bind(&member.lastname)
        .bind(&member.email)
        .bind(&member.phone)
        .bind(&member.address)
        .bind(&member.card_number)
        .bind(member.role.unwrap_or_default())
        .bind(member.is_active.unwrap_or(true))
        .bind(member.membership_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Login or card number already in use"))?;

        if member.card_number.is_none() {
            sqlx::query("UPDATE members SET card_number = $2 WHERE id = $1")
                .bind(id)
                .bind(format!("M{:04}", id))
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::from_unique_violation(e, "Generated card number already in use"))?;
        }

        tx.commit().await?;
        self.get_by_id(id).await
    }

    /// Update a member; absent fields are left untouched
    pub async fn update(&self, id: i32, member: &UpdateMember, password: Option<String>) -> AppResult<Member> {
        let result = sqlx::query(
            r#"
            UPDATE members SET
                password = COALESCE($2, password),
                firstname = COALESCE($3, firstname),
                lastname = COALESCE($4, lastname),
                email = COALESCE($5, email),
                phone = COALESCE($6, phone),
                address = COALESCE($7, address),
                card_number = COALESCE($8, card_number),
                role = COALESCE($9, role),
                is_active = COALESCE($10, is_active),
                membership_date = COALESCE($11, membership_date),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&password)
        .bind(&member.firstname)
        .bind(&member.lastname)
        .bind(&member.email)
        .bind(&member.phone)
        .bind(&member.address)
        .bind(&member.card_number)
        .bind(member.role)
        .bind(member.is_active)
        .bind(member.membership_date)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Card number already in use"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member with id {} not found", id)));
        }
        self.get_by_id(id).await
    }

    /// Restart the membership period on `date`
    pub async fn renew(&self, id: i32, date: NaiveDate) -> AppResult<Member> {
        let result = sqlx::query(
            "UPDATE members SET membership_date = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(date)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member with id {} not found", id)));
        }
        self.get_by_id(id).await
    }

    /// Add `amount` (negative for a debit) to the fine balance
    pub async fn adjust_fine_balance(&self, id: i32, amount: Decimal) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(
            r#"
            UPDATE members SET fine_balance = fine_balance + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))
    }

    /// Delete a member without borrow history
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::from_foreign_key_violation(e, "Member has borrow history; deactivate the account instead")
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member with id {} not found", id)));
        }
        Ok(())
    }

    /// Create the administrator account, or reset its password and role
    pub async fn upsert_admin(&self, login: &str, password_hash: &str) -> AppResult<Member> {
        let member = sqlx::query_as::<_, Member>(
            r#"
            INSERT INTO members (login, password, firstname, lastname, role, is_active)
            VALUES ($1, $2, 'Library', 'Administrator', $3, TRUE)
            ON CONFLICT (login) DO UPDATE
                SET password = EXCLUDED.password, role = EXCLUDED.role,
                    is_active = TRUE, updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(login)
        .bind(password_hash)
        .bind(Role::Admin)
        .fetch_one(&self.pool)
        .await?;
        Ok(member)
    }
}

fn push_member_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &MemberQuery) -> AppResult<()> {
    if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = format!("%{}%", q.to_lowercase());
        builder.push(" AND (LOWER(m.login) LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR LOWER(COALESCE(m.firstname, '')) LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR LOWER(COALESCE(m.lastname, '')) LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR LOWER(COALESCE(m.card_number, '')) LIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
    match query.status.as_deref() {
        None | Some("") => {}
        Some("active") => {
            builder.push(" AND m.is_active");
        }
        Some("inactive") => {
            builder.push(" AND NOT m.is_active");
        }
        Some(other) => {
            return Err(AppError::Validation(format!(
                "Invalid status filter '{}': expected active or inactive",
                other
            )))
        }
    }
    if let Some(role) = query.role {
        builder.push(" AND m.role = ");
        builder.push_bind(role);
    }
    Ok(())
}
