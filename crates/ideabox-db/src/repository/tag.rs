//! SurrealDB implementation of [`TagRepository`].
//!
//! Assignments live in the `idea_tag` table under a deterministic
//! `<tag_id>_<idea_id>` key, so assigning twice is harmless and the
//! first assigner and assignment time are kept.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use ideabox_core::error::IdeaboxResult;
use ideabox_core::models::tag::{NewTag, Tag};
use ideabox_core::repository::TagRepository;
use ideabox_core::slug::slugify;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, pair_key, parse_uuid};
use crate::error::DbError;

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct TagRow {
    record_id: String,
    tenant_id: String,
    name: String,
    slug: String,
    color: String,
    is_public: bool,
    created_at: DateTime<Utc>,
}

impl TagRow {
    fn try_into_tag(self) -> Result<Tag, DbError> {
        Ok(Tag {
            id: parse_uuid(&self.record_id, "tag")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            name: self.name,
            slug: self.slug,
            color: self.color,
            is_public: self.is_public,
            created_at: self.created_at,
        })
    }
}

/// One row of the `idea_tag` assignment table.
#[derive(Debug, SurrealValue)]
struct AssignmentRow {
    idea_id: String,
    tag_id: String,
    // Only selected so the query can order by it.
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

/// Tag ids assigned to each of the given ideas, in assignment order.
///
/// Without `include_restricted` only public tags are returned; this is
/// what anonymous viewers get to see.
pub(super) async fn load_assignments<C: Connection>(
    db: &Surreal<C>,
    tenant_id: Uuid,
    idea_ids: Vec<String>,
    include_restricted: bool,
) -> Result<HashMap<String, Vec<Uuid>>, DbError> {
    if idea_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut result = db
        .query(
            "SELECT idea_id, tag_id, created_at FROM idea_tag \
             WHERE tenant_id = $tenant_id AND idea_id IN $idea_ids \
             ORDER BY created_at ASC; \
             SELECT VALUE meta::id(id) FROM tag \
             WHERE tenant_id = $tenant_id AND is_public = true;",
        )
        .bind(("tenant_id", tenant_id.to_string()))
        .bind(("idea_ids", idea_ids))
        .await?;

    let assignments: Vec<AssignmentRow> = result.take(0)?;
    let public: Vec<String> = result.take(1)?;
    let public: HashSet<String> = public.into_iter().collect();

    let mut by_idea: HashMap<String, Vec<Uuid>> = HashMap::new();
    for row in assignments {
        if !include_restricted && !public.contains(&row.tag_id) {
            continue;
        }
        let tag_id = parse_uuid(&row.tag_id, "tag")?;
        by_idea.entry(row.idea_id).or_default().push(tag_id);
    }
    Ok(by_idea)
}

/// SurrealDB implementation of the Tag repository.
#[derive(Clone)]
pub struct SurrealTagRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTagRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TagRepository for SurrealTagRepository<C> {
    async fn create(&self, tenant_id: Uuid, input: NewTag) -> IdeaboxResult<Tag> {
        let id_str = Uuid::new_v4().to_string();
        let slug = slugify(&input.name);

        let result = self
            .db
            .query(
                "CREATE type::record('tag', $id) SET \
                 tenant_id = $tenant_id, name = $name, slug = $slug, \
                 color = $color, is_public = $is_public; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('tag', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("slug", slug))
            .bind(("color", input.color))
            .bind(("is_public", input.is_public))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write(e, "tag"))?;

        let rows: Vec<TagRow> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("tag", &id_str))?;

        Ok(row.try_into_tag()?)
    }

    async fn get_by_slug(&self, tenant_id: Uuid, slug: &str) -> IdeaboxResult<Tag> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM tag \
                 WHERE tenant_id = $tenant_id AND slug = $slug",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("slug", slug.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TagRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("tag", format!("slug={slug}")))?;

        Ok(row.try_into_tag()?)
    }

    async fn list(&self, tenant_id: Uuid) -> IdeaboxResult<Vec<Tag>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM tag \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY name ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TagRow> = result.take(0).map_err(DbError::from)?;

        let tags = rows
            .into_iter()
            .map(|row| row.try_into_tag())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(tags)
    }

    async fn assign_tag(
        &self,
        tenant_id: Uuid,
        tag_id: Uuid,
        idea_id: Uuid,
        user_id: Uuid,
    ) -> IdeaboxResult<()> {
        let tag_id_str = tag_id.to_string();
        let idea_id_str = idea_id.to_string();
        let tenant_id_str = tenant_id.to_string();

        // Verify both tag and idea belong to the tenant.
        let mut check = self
            .db
            .query(
                "SELECT count() AS total FROM tag \
                 WHERE id = type::record('tag', $tag_id) \
                 AND tenant_id = $tenant_id GROUP ALL; \
                 SELECT count() AS total FROM idea \
                 WHERE id = type::record('idea', $idea_id) \
                 AND tenant_id = $tenant_id GROUP ALL;",
            )
            .bind(("tag_id", tag_id_str.clone()))
            .bind(("idea_id", idea_id_str.clone()))
            .bind(("tenant_id", tenant_id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let tag_count: Vec<CountRow> = check.take(0).map_err(DbError::from)?;
        if tag_count.first().map(|r| r.total).unwrap_or(0) == 0 {
            return Err(DbError::not_found("tag", tag_id_str).into());
        }

        let idea_count: Vec<CountRow> = check.take(1).map_err(DbError::from)?;
        if idea_count.first().map(|r| r.total).unwrap_or(0) == 0 {
            return Err(DbError::not_found("idea", idea_id_str).into());
        }

        self.db
            .query(
                "UPSERT type::record('idea_tag', $key) SET \
                 tenant_id = $tenant_id, tag_id = $tag_id, \
                 idea_id = $idea_id, user_id = user_id ?? $user_id",
            )
            .bind(("key", pair_key(tag_id, idea_id)))
            .bind(("tenant_id", tenant_id_str))
            .bind(("tag_id", tag_id_str))
            .bind(("idea_id", idea_id_str))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_write(e, "idea_tag"))?;

        Ok(())
    }

    async fn unassign_tag(
        &self,
        tenant_id: Uuid,
        tag_id: Uuid,
        idea_id: Uuid,
    ) -> IdeaboxResult<()> {
        self.db
            .query(
                "DELETE type::record('idea_tag', $key) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("key", pair_key(tag_id, idea_id)))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn get_assigned(&self, tenant_id: Uuid, idea_id: Uuid) -> IdeaboxResult<Vec<Tag>> {
        let idea_id_str = idea_id.to_string();
        let tenant_id_str = tenant_id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT idea_id, tag_id, created_at FROM idea_tag \
                 WHERE tenant_id = $tenant_id AND idea_id = $idea_id \
                 ORDER BY created_at ASC; \
                 SELECT meta::id(id) AS record_id, * FROM tag \
                 WHERE tenant_id = $tenant_id \
                 AND meta::id(id) IN (\
                     SELECT VALUE tag_id FROM idea_tag \
                     WHERE tenant_id = $tenant_id AND idea_id = $idea_id\
                 );",
            )
            .bind(("tenant_id", tenant_id_str))
            .bind(("idea_id", idea_id_str))
            .await
            .map_err(DbError::from)?;

        let assignments: Vec<AssignmentRow> = result.take(0).map_err(DbError::from)?;
        let rows: Vec<TagRow> = result.take(1).map_err(DbError::from)?;

        let mut by_id: HashMap<String, TagRow> = rows
            .into_iter()
            .map(|row| (row.record_id.clone(), row))
            .collect();

        let tags = assignments
            .into_iter()
            .filter_map(|assignment| by_id.remove(&assignment.tag_id))
            .map(|row| row.try_into_tag())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(tags)
    }
}
