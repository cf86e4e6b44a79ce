//! SurrealDB implementation of [`IdeaRepository`].
//!
//! Ideas carry a tenant-scoped sequential `number` and a tenant-unique
//! `slug`, both guarded by unique indexes. Supporters are stored one
//! record per (idea, user) pair under a deterministic key; every vote
//! change recomputes the materialized `supporters` count from that set
//! inside the same transaction, so the count always equals the set size.
//!
//! Authors, commenters, voters and responders must be users of the
//! tenant. Writes check this before touching anything, so every stored
//! row can be enriched on read.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use ideabox_core::error::{IdeaboxError, IdeaboxResult};
use ideabox_core::models::comment::Comment;
use ideabox_core::models::idea::{Idea, IdeaResponse, IdeaStatus, NewIdea, SetResponse, UpdateIdea};
use ideabox_core::repository::IdeaRepository;
use ideabox_core::slug::{disambiguate, slugify};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};
use uuid::Uuid;

use super::tag::load_assignments;
use super::user::{ensure_member, load_summaries, summary_for};
use super::{pair_key, parse_uuid};
use crate::error::DbError;

/// How many times `add` retries when a concurrent writer took the number
/// or slug it picked.
const MAX_INSERT_ATTEMPTS: u32 = 3;

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct IdeaRow {
    record_id: String,
    tenant_id: String,
    number: u32,
    title: String,
    slug: String,
    description: String,
    status: String,
    user_id: String,
    supporters: u64,
    response: Option<String>,
    response_user_id: Option<String>,
    responded_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CommentRow {
    record_id: String,
    idea_id: String,
    user_id: String,
    content: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CommentCountRow {
    idea_id: String,
    total: u64,
}

#[derive(Debug, SurrealValue)]
struct NumberRow {
    number: u32,
}

#[derive(Debug, SurrealValue)]
struct SupportedRow {
    record_id: String,
    // Only selected so the query can order by it.
    #[allow(dead_code)]
    number: u32,
}

fn parse_status(s: &str) -> Result<IdeaStatus, DbError> {
    match s {
        "Open" => Ok(IdeaStatus::Open),
        "Planned" => Ok(IdeaStatus::Planned),
        "Started" => Ok(IdeaStatus::Started),
        "Completed" => Ok(IdeaStatus::Completed),
        "Declined" => Ok(IdeaStatus::Declined),
        other => Err(DbError::Decode(format!("unknown idea status: {other}"))),
    }
}

fn status_to_string(s: IdeaStatus) -> &'static str {
    match s {
        IdeaStatus::Open => "Open",
        IdeaStatus::Planned => "Planned",
        IdeaStatus::Started => "Started",
        IdeaStatus::Completed => "Completed",
        IdeaStatus::Declined => "Declined",
    }
}

/// The ways a single idea can be addressed within a tenant.
#[derive(Debug, Clone, Copy)]
enum Lookup<'a> {
    Id(Uuid),
    Slug(&'a str),
    Number(u32),
}

impl Lookup<'_> {
    fn describe(&self) -> String {
        match self {
            Lookup::Id(id) => id.to_string(),
            Lookup::Slug(slug) => format!("slug={slug}"),
            Lookup::Number(number) => format!("number={number}"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum VoteChange {
    Add,
    Remove,
}

/// SurrealDB implementation of the Idea repository.
#[derive(Clone)]
pub struct SurrealIdeaRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealIdeaRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch_row(&self, tenant_id: Uuid, lookup: Lookup<'_>) -> Result<IdeaRow, DbError> {
        let tenant_id_str = tenant_id.to_string();

        let builder = match lookup {
            Lookup::Id(id) => self
                .db
                .query(
                    "SELECT meta::id(id) AS record_id, * \
                     FROM type::record('idea', $id) \
                     WHERE tenant_id = $tenant_id",
                )
                .bind(("id", id.to_string())),
            Lookup::Slug(slug) => self
                .db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM idea \
                     WHERE tenant_id = $tenant_id AND slug = $slug",
                )
                .bind(("slug", slug.to_string())),
            Lookup::Number(number) => self
                .db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM idea \
                     WHERE tenant_id = $tenant_id AND number = $number",
                )
                .bind(("number", number)),
        };

        let mut result = builder.bind(("tenant_id", tenant_id_str)).await?;

        let rows: Vec<IdeaRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("idea", lookup.describe()))
    }

    async fn get_one(
        &self,
        tenant_id: Uuid,
        viewer: Option<Uuid>,
        lookup: Lookup<'_>,
    ) -> IdeaboxResult<Idea> {
        let row = self.fetch_row(tenant_id, lookup).await?;
        let idea = self
            .enrich(tenant_id, viewer, vec![row])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("idea", lookup.describe()))?;
        Ok(idea)
    }

    /// Attach author and responder display data, comment totals, the
    /// viewer's vote and the tags the viewer may see.
    async fn enrich(
        &self,
        tenant_id: Uuid,
        viewer: Option<Uuid>,
        rows: Vec<IdeaRow>,
    ) -> Result<Vec<Idea>, DbError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let idea_ids: Vec<String> = rows.iter().map(|row| row.record_id.clone()).collect();
        let mut user_ids: Vec<String> = rows
            .iter()
            .flat_map(|row| std::iter::once(row.user_id.clone()).chain(row.response_user_id.clone()))
            .collect();
        user_ids.sort();
        user_ids.dedup();

        let summaries = load_summaries(&self.db, tenant_id, user_ids).await?;
        let mut tags =
            load_assignments(&self.db, tenant_id, idea_ids.clone(), viewer.is_some()).await?;

        let mut result = self
            .db
            .query(
                "SELECT idea_id, count() AS total FROM comment \
                 WHERE tenant_id = $tenant_id AND idea_id IN $idea_ids \
                 GROUP BY idea_id; \
                 SELECT VALUE idea_id FROM supporter \
                 WHERE tenant_id = $tenant_id AND user_id = $viewer \
                 AND idea_id IN $idea_ids;",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("idea_ids", idea_ids))
            .bind(("viewer", viewer.map(|v| v.to_string())))
            .await?;

        let comment_counts: Vec<CommentCountRow> = result.take(0)?;
        let comment_counts: HashMap<String, u64> = comment_counts
            .into_iter()
            .map(|row| (row.idea_id, row.total))
            .collect();
        let supported: Vec<String> = result.take(1)?;

        rows.into_iter()
            .map(|row| {
                let response = match (row.response, row.response_user_id, row.responded_at) {
                    (Some(text), Some(user_id), Some(responded_at)) => Some(IdeaResponse {
                        text,
                        user: summary_for(&summaries, &user_id)?,
                        responded_at,
                    }),
                    _ => None,
                };

                Ok::<_, DbError>(Idea {
                    id: parse_uuid(&row.record_id, "idea")?,
                    tenant_id: parse_uuid(&row.tenant_id, "tenant")?,
                    number: row.number,
                    title: row.title,
                    slug: row.slug,
                    description: row.description,
                    status: parse_status(&row.status)?,
                    user: summary_for(&summaries, &row.user_id)?,
                    total_supporters: row.supporters,
                    total_comments: comment_counts.get(&row.record_id).copied().unwrap_or(0),
                    viewer_supported: supported.contains(&row.record_id),
                    tags: tags.remove(&row.record_id).unwrap_or_default(),
                    response,
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                })
            })
            .collect()
    }

    async fn next_number(&self, tenant_id: Uuid) -> Result<u32, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT number FROM idea WHERE tenant_id = $tenant_id \
                 ORDER BY number DESC LIMIT 1",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .await?;

        let rows: Vec<NumberRow> = result.take(0)?;
        Ok(rows.first().map(|row| row.number + 1).unwrap_or(1))
    }

    /// Derive a slug from `title` that no other idea of the tenant uses.
    /// `exclude` is the idea being renamed, which may keep its own slug.
    async fn unique_slug(
        &self,
        tenant_id: Uuid,
        title: &str,
        exclude: Option<&str>,
    ) -> Result<String, DbError> {
        let base = slugify(title);

        let mut result = self
            .db
            .query(
                "SELECT VALUE slug FROM idea \
                 WHERE tenant_id = $tenant_id \
                 AND string::starts_with(slug, $base) \
                 AND meta::id(id) != $exclude",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("base", base.clone()))
            .bind(("exclude", exclude.map(str::to_string)))
            .await?;

        let taken: Vec<String> = result.take(0)?;
        let slug = disambiguate(&base, &taken);
        if slug != base {
            debug!(%tenant_id, %base, %slug, "Slug taken, using suffixed variant");
        }
        Ok(slug)
    }

    async fn insert(&self, tenant_id: Uuid, input: &NewIdea) -> Result<Uuid, DbError> {
        let id = Uuid::new_v4();
        let number = self.next_number(tenant_id).await?;
        let slug = self.unique_slug(tenant_id, &input.title, None).await?;

        self.db
            .query(
                "CREATE type::record('idea', $id) SET \
                 tenant_id = $tenant_id, number = $number, \
                 title = $title, slug = $slug, \
                 description = $description, status = 'Open', \
                 user_id = $user_id, supporters = 0",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("number", number))
            .bind(("title", input.title.clone()))
            .bind(("slug", slug.clone()))
            .bind(("description", input.description.clone()))
            .bind(("user_id", input.user_id.to_string()))
            .await?
            .check()
            .map_err(|e| DbError::from_write(e, "idea"))?;

        info!(%tenant_id, idea_id = %id, number, %slug, "Idea created");
        Ok(id)
    }

    async fn change_vote(
        &self,
        tenant_id: Uuid,
        number: u32,
        user_id: Uuid,
        change: VoteChange,
    ) -> IdeaboxResult<()> {
        let row = self.fetch_row(tenant_id, Lookup::Number(number)).await?;
        if let VoteChange::Add = change {
            ensure_member(&self.db, tenant_id, user_id).await?;
        }

        let status = parse_status(&row.status)?;
        if status.is_closed() {
            debug!(
                %tenant_id,
                number,
                %user_id,
                ?status,
                ?change,
                "Idea is closed, supporter set left unchanged"
            );
        }

        let idea_id = parse_uuid(&row.record_id, "idea")?;
        let mutation = match change {
            VoteChange::Add => {
                "UPSERT type::record('supporter', $key) SET \
                 tenant_id = $tenant_id, idea_id = $idea_id, user_id = $user_id;"
            }
            VoteChange::Remove => "DELETE type::record('supporter', $key);",
        };

        // The status is re-read inside the transaction; a concurrent close
        // wins over the vote.
        let query = format!(
            "BEGIN TRANSACTION; \
             LET $status = (SELECT VALUE status FROM ONLY type::record('idea', $idea_id)); \
             IF $status NOT IN ['Completed', 'Declined'] {{ \
                 {mutation} \
                 UPDATE type::record('idea', $idea_id) SET supporters = \
                 array::len((SELECT VALUE id FROM supporter WHERE idea_id = $idea_id)); \
             }}; \
             COMMIT TRANSACTION;"
        );

        self.db
            .query(query)
            .bind(("key", pair_key(idea_id, user_id)))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("idea_id", row.record_id))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }
}

impl<C: Connection> IdeaRepository for SurrealIdeaRepository<C> {
    async fn get_all(&self, tenant_id: Uuid, viewer: Option<Uuid>) -> IdeaboxResult<Vec<Idea>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM idea \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY number ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<IdeaRow> = result.take(0).map_err(DbError::from)?;
        Ok(self.enrich(tenant_id, viewer, rows).await?)
    }

    async fn get_by_id(
        &self,
        tenant_id: Uuid,
        viewer: Option<Uuid>,
        id: Uuid,
    ) -> IdeaboxResult<Idea> {
        self.get_one(tenant_id, viewer, Lookup::Id(id)).await
    }

    async fn get_by_slug(
        &self,
        tenant_id: Uuid,
        viewer: Option<Uuid>,
        slug: &str,
    ) -> IdeaboxResult<Idea> {
        self.get_one(tenant_id, viewer, Lookup::Slug(slug)).await
    }

    async fn get_by_number(
        &self,
        tenant_id: Uuid,
        viewer: Option<Uuid>,
        number: u32,
    ) -> IdeaboxResult<Idea> {
        self.get_one(tenant_id, viewer, Lookup::Number(number)).await
    }

    async fn add(&self, tenant_id: Uuid, input: NewIdea) -> IdeaboxResult<Idea> {
        input.validate()?;
        ensure_member(&self.db, tenant_id, input.user_id).await?;

        let mut attempt = 1;
        let id = loop {
            match self.insert(tenant_id, &input).await {
                Ok(id) => break id,
                Err(DbError::Conflict { message, .. }) if attempt < MAX_INSERT_ATTEMPTS => {
                    debug!(%tenant_id, attempt, %message, "Idea number or slug taken, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        self.get_one(tenant_id, None, Lookup::Id(id)).await
    }

    async fn update(&self, tenant_id: Uuid, number: u32, input: UpdateIdea) -> IdeaboxResult<Idea> {
        input.validate()?;

        let row = self.fetch_row(tenant_id, Lookup::Number(number)).await?;
        let id = parse_uuid(&row.record_id, "idea")?;
        let slug = self
            .unique_slug(tenant_id, &input.title, Some(&row.record_id))
            .await?;

        self.db
            .query(
                "UPDATE type::record('idea', $id) SET \
                 title = $title, slug = $slug, description = $description, \
                 updated_at = time::now() \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", row.record_id))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("title", input.title))
            .bind(("slug", slug))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_write(e, "idea"))?;

        self.get_one(tenant_id, None, Lookup::Id(id)).await
    }

    async fn add_comment(
        &self,
        tenant_id: Uuid,
        number: u32,
        content: &str,
        user_id: Uuid,
    ) -> IdeaboxResult<Uuid> {
        if content.trim().is_empty() {
            return Err(IdeaboxError::Validation {
                message: "comment content must not be empty".into(),
            });
        }

        let row = self.fetch_row(tenant_id, Lookup::Number(number)).await?;
        ensure_member(&self.db, tenant_id, user_id).await?;
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::record('comment', $id) SET \
                 tenant_id = $tenant_id, idea_id = $idea_id, \
                 user_id = $user_id, content = $content",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("idea_id", row.record_id))
            .bind(("user_id", user_id.to_string()))
            .bind(("content", content.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_write(e, "comment"))?;

        Ok(id)
    }

    async fn get_comments_by_idea(&self, tenant_id: Uuid, number: u32) -> IdeaboxResult<Vec<Comment>> {
        let idea = self.fetch_row(tenant_id, Lookup::Number(number)).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM comment \
                 WHERE tenant_id = $tenant_id AND idea_id = $idea_id \
                 ORDER BY created_at ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("idea_id", idea.record_id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CommentRow> = result.take(0).map_err(DbError::from)?;

        let mut user_ids: Vec<String> = rows.iter().map(|row| row.user_id.clone()).collect();
        user_ids.sort();
        user_ids.dedup();
        let summaries = load_summaries(&self.db, tenant_id, user_ids).await?;

        let comments = rows
            .into_iter()
            .map(|row| {
                Ok::<_, DbError>(Comment {
                    id: parse_uuid(&row.record_id, "comment")?,
                    idea_id: parse_uuid(&row.idea_id, "idea")?,
                    content: row.content,
                    user: summary_for(&summaries, &row.user_id)?,
                    created_at: row.created_at,
                })
            })
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(comments)
    }

    async fn add_supporter(&self, tenant_id: Uuid, number: u32, user_id: Uuid) -> IdeaboxResult<()> {
        self.change_vote(tenant_id, number, user_id, VoteChange::Add)
            .await
    }

    async fn remove_supporter(
        &self,
        tenant_id: Uuid,
        number: u32,
        user_id: Uuid,
    ) -> IdeaboxResult<()> {
        self.change_vote(tenant_id, number, user_id, VoteChange::Remove)
            .await
    }

    async fn set_response(
        &self,
        tenant_id: Uuid,
        number: u32,
        input: SetResponse,
    ) -> IdeaboxResult<()> {
        let row = self.fetch_row(tenant_id, Lookup::Number(number)).await?;
        ensure_member(&self.db, tenant_id, input.user_id).await?;
        let previous = parse_status(&row.status)?;

        // Rewording a response keeps its date; a status change stamps a new
        // one. `responded_at` is assigned first so it sees the old values.
        self.db
            .query(
                "UPDATE type::record('idea', $id) SET \
                 responded_at = IF response != NONE AND responded_at != NONE \
                     AND status = $status THEN responded_at ELSE time::now() END, \
                 response = $text, response_user_id = $user_id, \
                 status = $status, updated_at = time::now() \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", row.record_id))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("text", input.text))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("status", status_to_string(input.status).to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        info!(
            %tenant_id,
            number,
            from = ?previous,
            to = ?input.status,
            "Idea response recorded"
        );
        Ok(())
    }

    async fn supported_by(&self, tenant_id: Uuid, user_id: Uuid) -> IdeaboxResult<Vec<Uuid>> {
        let tenant_id_str = tenant_id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, number FROM idea \
                 WHERE tenant_id = $tenant_id \
                 AND meta::id(id) IN (\
                     SELECT VALUE idea_id FROM supporter \
                     WHERE tenant_id = $tenant_id AND user_id = $user_id\
                 ) \
                 ORDER BY number ASC",
            )
            .bind(("tenant_id", tenant_id_str))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SupportedRow> = result.take(0).map_err(DbError::from)?;

        let ids = rows
            .into_iter()
            .map(|row| parse_uuid(&row.record_id, "idea"))
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(ids)
    }
}
