//! Comment domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::UserSummary;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub idea_id: Uuid,
    pub content: String,
    pub user: UserSummary,
    pub created_at: DateTime<Utc>,
}
