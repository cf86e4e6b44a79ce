//! SurrealDB repository implementations.

mod idea;
mod tag;
mod tenant;
mod user;

pub use idea::SurrealIdeaRepository;
pub use tag::SurrealTagRepository;
pub use tenant::SurrealTenantRepository;
pub use user::SurrealUserRepository;

use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid(value: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Decode(format!("invalid {what} UUID: {e}")))
}

/// Record key for a set membership row, e.g. one supporter per
/// (idea, user) pair. Deterministic keys make inserts idempotent.
fn pair_key(left: Uuid, right: Uuid) -> String {
    format!("{left}_{right}")
}
