//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Tenant-scoped repositories take a
//! `tenant_id` on every call instead of carrying one as state, so a single
//! repository value can serve many tenants concurrently. Reads whose
//! result depends on who is looking take an explicit `viewer`.

use uuid::Uuid;

use crate::error::IdeaboxResult;
use crate::models::{
    comment::Comment,
    idea::{Idea, NewIdea, SetResponse, UpdateIdea},
    tag::{NewTag, Tag},
    tenant::{NewTenant, Tenant},
    user::{NewUser, User},
};

// ---------------------------------------------------------------------------
// Tenant (global scope)
// ---------------------------------------------------------------------------

pub trait TenantRepository: Send + Sync {
    fn create(&self, input: NewTenant) -> impl Future<Output = IdeaboxResult<Tenant>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = IdeaboxResult<Tenant>> + Send;
    fn get_by_subdomain(
        &self,
        subdomain: &str,
    ) -> impl Future<Output = IdeaboxResult<Tenant>> + Send;
}

// ---------------------------------------------------------------------------
// Tenant-scoped repositories
// ---------------------------------------------------------------------------

/// The user directory consumed by the idea store for display data.
pub trait UserRepository: Send + Sync {
    fn create(
        &self,
        tenant_id: Uuid,
        input: NewUser,
    ) -> impl Future<Output = IdeaboxResult<User>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = IdeaboxResult<User>> + Send;
    fn get_by_email(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> impl Future<Output = IdeaboxResult<User>> + Send;
}

pub trait TagRepository: Send + Sync {
    fn create(
        &self,
        tenant_id: Uuid,
        input: NewTag,
    ) -> impl Future<Output = IdeaboxResult<Tag>> + Send;
    fn get_by_slug(
        &self,
        tenant_id: Uuid,
        slug: &str,
    ) -> impl Future<Output = IdeaboxResult<Tag>> + Send;
    /// All tags of the tenant, ordered by name.
    fn list(&self, tenant_id: Uuid) -> impl Future<Output = IdeaboxResult<Vec<Tag>>> + Send;

    /// Assign a tag to an idea. Assigning twice has no further effect.
    fn assign_tag(
        &self,
        tenant_id: Uuid,
        tag_id: Uuid,
        idea_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = IdeaboxResult<()>> + Send;

    /// Remove a tag from an idea. Removing a missing assignment is a no-op.
    fn unassign_tag(
        &self,
        tenant_id: Uuid,
        tag_id: Uuid,
        idea_id: Uuid,
    ) -> impl Future<Output = IdeaboxResult<()>> + Send;

    /// Tags assigned to an idea, in assignment order.
    fn get_assigned(
        &self,
        tenant_id: Uuid,
        idea_id: Uuid,
    ) -> impl Future<Output = IdeaboxResult<Vec<Tag>>> + Send;
}

/// The idea store: idea lifecycle, comments, supporters and responses.
pub trait IdeaRepository: Send + Sync {
    /// All ideas of the tenant, ordered by number.
    fn get_all(
        &self,
        tenant_id: Uuid,
        viewer: Option<Uuid>,
    ) -> impl Future<Output = IdeaboxResult<Vec<Idea>>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        viewer: Option<Uuid>,
        id: Uuid,
    ) -> impl Future<Output = IdeaboxResult<Idea>> + Send;
    fn get_by_slug(
        &self,
        tenant_id: Uuid,
        viewer: Option<Uuid>,
        slug: &str,
    ) -> impl Future<Output = IdeaboxResult<Idea>> + Send;
    fn get_by_number(
        &self,
        tenant_id: Uuid,
        viewer: Option<Uuid>,
        number: u32,
    ) -> impl Future<Output = IdeaboxResult<Idea>> + Send;

    /// Create an idea with the next sequential number and a unique slug.
    fn add(
        &self,
        tenant_id: Uuid,
        input: NewIdea,
    ) -> impl Future<Output = IdeaboxResult<Idea>> + Send;

    /// Rewrite title and description; the slug is regenerated.
    fn update(
        &self,
        tenant_id: Uuid,
        number: u32,
        input: UpdateIdea,
    ) -> impl Future<Output = IdeaboxResult<Idea>> + Send;

    /// Append a comment and return its id.
    fn add_comment(
        &self,
        tenant_id: Uuid,
        number: u32,
        content: &str,
        user_id: Uuid,
    ) -> impl Future<Output = IdeaboxResult<Uuid>> + Send;

    /// Comments of an idea in creation order.
    fn get_comments_by_idea(
        &self,
        tenant_id: Uuid,
        number: u32,
    ) -> impl Future<Output = IdeaboxResult<Vec<Comment>>> + Send;

    /// Record a vote. Idempotent; a no-op on closed ideas.
    fn add_supporter(
        &self,
        tenant_id: Uuid,
        number: u32,
        user_id: Uuid,
    ) -> impl Future<Output = IdeaboxResult<()>> + Send;

    /// Withdraw a vote. Idempotent; a no-op on closed ideas.
    fn remove_supporter(
        &self,
        tenant_id: Uuid,
        number: u32,
        user_id: Uuid,
    ) -> impl Future<Output = IdeaboxResult<()>> + Send;

    /// Respond to an idea and move it to a new status.
    fn set_response(
        &self,
        tenant_id: Uuid,
        number: u32,
        input: SetResponse,
    ) -> impl Future<Output = IdeaboxResult<()>> + Send;

    /// Ids of the ideas a user supports, ordered by idea number.
    fn supported_by(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = IdeaboxResult<Vec<Uuid>>> + Send;
}
