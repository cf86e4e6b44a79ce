//! Idea domain model.
//!
//! An idea is a piece of feedback submitted by a user. It carries a
//! tenant-scoped sequential `number`, a slug derived from its title and a
//! lifecycle status that administrators move forward by responding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{IdeaboxError, IdeaboxResult};
use crate::models::user::UserSummary;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum IdeaStatus {
    Open,
    Planned,
    Started,
    Completed,
    Declined,
}

impl IdeaStatus {
    /// Closed ideas freeze their supporter set.
    pub fn is_closed(self) -> bool {
        matches!(self, IdeaStatus::Completed | IdeaStatus::Declined)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Idea {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Sequential within the tenant, starting at 1.
    pub number: u32,
    pub title: String,
    /// URL-safe identifier, unique within the tenant.
    pub slug: String,
    pub description: String,
    pub status: IdeaStatus,
    /// The author.
    pub user: UserSummary,
    pub total_supporters: u64,
    pub total_comments: u64,
    /// Whether the viewer the idea was loaded for supports it.
    pub viewer_supported: bool,
    /// Assigned tag ids visible to the viewer, in assignment order.
    pub tags: Vec<Uuid>,
    pub response: Option<IdeaResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An administrative reply recorded alongside a status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdeaResponse {
    pub text: String,
    pub user: UserSummary,
    pub responded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIdea {
    pub title: String,
    pub description: String,
    /// The author.
    pub user_id: Uuid,
}

impl NewIdea {
    pub fn validate(&self) -> IdeaboxResult<()> {
        validate_title(&self.title)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateIdea {
    pub title: String,
    pub description: String,
}

impl UpdateIdea {
    pub fn validate(&self) -> IdeaboxResult<()> {
        validate_title(&self.title)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetResponse {
    pub text: String,
    /// The responding administrator.
    pub user_id: Uuid,
    pub status: IdeaStatus,
}

fn validate_title(title: &str) -> IdeaboxResult<()> {
    if title.trim().is_empty() {
        return Err(IdeaboxError::Validation {
            message: "idea title must not be empty".into(),
        });
    }
    Ok(())
}
