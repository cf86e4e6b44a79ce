//! SurrealDB implementation of [`UserRepository`].
//!
//! Besides the repository itself, this module exposes
//! [`load_summaries`] so the idea store can attach author and responder
//! display data in one round trip, and [`ensure_member`] so writes can
//! refuse users from outside the tenant.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use ideabox_core::error::IdeaboxResult;
use ideabox_core::models::user::{NewUser, User, UserRole, UserSummary};
use ideabox_core::repository::UserRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRow {
    record_id: String,
    tenant_id: String,
    name: String,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Display projection used for enrichment.
#[derive(Debug, SurrealValue)]
struct SummaryRow {
    record_id: String,
    name: String,
    email: String,
}

fn parse_role(s: &str) -> Result<UserRole, DbError> {
    match s {
        "Visitor" => Ok(UserRole::Visitor),
        "Member" => Ok(UserRole::Member),
        "Administrator" => Ok(UserRole::Administrator),
        other => Err(DbError::Decode(format!("unknown user role: {other}"))),
    }
}

fn role_to_string(r: UserRole) -> &'static str {
    match r {
        UserRole::Visitor => "Visitor",
        UserRole::Member => "Member",
        UserRole::Administrator => "Administrator",
    }
}

impl UserRow {
    fn try_into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: parse_uuid(&self.record_id, "user")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            name: self.name,
            email: self.email,
            role: parse_role(&self.role)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Load display data for the given users of a tenant, keyed by user id.
///
/// Users outside the tenant are silently absent from the map; callers
/// decide whether a missing entry is an error.
pub(super) async fn load_summaries<C: Connection>(
    db: &Surreal<C>,
    tenant_id: Uuid,
    user_ids: Vec<String>,
) -> Result<HashMap<String, UserSummary>, DbError> {
    if user_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut result = db
        .query(
            "SELECT meta::id(id) AS record_id, name, email FROM user \
             WHERE tenant_id = $tenant_id AND meta::id(id) IN $user_ids",
        )
        .bind(("tenant_id", tenant_id.to_string()))
        .bind(("user_ids", user_ids))
        .await?;

    let rows: Vec<SummaryRow> = result.take(0)?;
    rows.into_iter()
        .map(|row| {
            let summary = UserSummary {
                id: parse_uuid(&row.record_id, "user")?,
                name: row.name,
                email: row.email,
            };
            Ok::<_, DbError>((row.record_id, summary))
        })
        .collect()
}

/// Fail with `NotFound` unless `user_id` is a user of the tenant.
pub(super) async fn ensure_member<C: Connection>(
    db: &Surreal<C>,
    tenant_id: Uuid,
    user_id: Uuid,
) -> Result<(), DbError> {
    let mut check = db
        .query(
            "SELECT count() AS total FROM user \
             WHERE id = type::record('user', $user_id) \
             AND tenant_id = $tenant_id GROUP ALL",
        )
        .bind(("user_id", user_id.to_string()))
        .bind(("tenant_id", tenant_id.to_string()))
        .await?;

    let count: Vec<CountRow> = check.take(0)?;
    if count.first().map(|r| r.total).unwrap_or(0) == 0 {
        return Err(DbError::not_found("user", user_id));
    }
    Ok(())
}

/// Look up one entry of a summary map, failing if the user is unknown.
pub(super) fn summary_for(
    summaries: &HashMap<String, UserSummary>,
    user_id: &str,
) -> Result<UserSummary, DbError> {
    summaries
        .get(user_id)
        .cloned()
        .ok_or_else(|| DbError::not_found("user", user_id))
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, tenant_id: Uuid, input: NewUser) -> IdeaboxResult<User> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 tenant_id = $tenant_id, \
                 name = $name, email = $email, role = $role; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('user', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("email", input.email.to_lowercase()))
            .bind(("role", role_to_string(input.role).to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write(e, "user"))?;

        let rows: Vec<UserRow> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", &id_str))?;

        Ok(row.try_into_user()?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> IdeaboxResult<User> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM type::record('user', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", id))?;

        Ok(row.try_into_user()?)
    }

    async fn get_by_email(&self, tenant_id: Uuid, email: &str) -> IdeaboxResult<User> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE tenant_id = $tenant_id AND email = $email",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("email", email.to_lowercase()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", format!("email={email}")))?;

        Ok(row.try_into_user()?)
    }
}
