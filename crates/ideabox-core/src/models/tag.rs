//! Tag domain model.
//!
//! Tags are owned by the tag collaborator. The idea store only reads
//! assignments and the public flag, which decides whether anonymous
//! viewers can see a tag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    /// Derived from the name, unique within the tenant.
    pub slug: String,
    /// Hex color without the leading `#` (e.g. `FF0000`).
    pub color: String,
    /// Restricted tags are hidden from anonymous viewers.
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub color: String,
    pub is_public: bool,
}
