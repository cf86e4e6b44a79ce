//! Integration tests for the Idea repository using in-memory SurrealDB.

use ideabox_core::error::IdeaboxError;
use ideabox_core::models::idea::{IdeaStatus, NewIdea, SetResponse, UpdateIdea};
use ideabox_core::models::tag::NewTag;
use ideabox_core::models::tenant::{NewTenant, TenantStatus};
use ideabox_core::models::user::{NewUser, User, UserRole};
use ideabox_core::repository::{IdeaRepository, TagRepository, TenantRepository, UserRepository};
use ideabox_db::repository::{
    SurrealIdeaRepository, SurrealTagRepository, SurrealTenantRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

/// Helper: spin up in-memory DB, run migrations, create a tenant.
async fn setup_db() -> (Surreal<Db>, Uuid) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    ideabox_db::run_migrations(&db).await.unwrap();

    let tenant_id = create_tenant(&db, "demo").await;
    (db, tenant_id)
}

async fn create_tenant(db: &Surreal<Db>, subdomain: &str) -> Uuid {
    SurrealTenantRepository::new(db.clone())
        .create(NewTenant {
            name: format!("{subdomain} tenant"),
            subdomain: subdomain.into(),
            status: TenantStatus::Active,
        })
        .await
        .unwrap()
        .id
}

async fn create_user(db: &Surreal<Db>, tenant_id: Uuid, name: &str, role: UserRole) -> User {
    let email = format!("{}@example.com", name.to_lowercase().replace(' ', "."));
    SurrealUserRepository::new(db.clone())
        .create(
            tenant_id,
            NewUser {
                name: name.into(),
                email,
                role,
            },
        )
        .await
        .unwrap()
}

/// Helper: DB with one tenant, an administrator (Jon) and a member (Arya).
async fn setup() -> (Surreal<Db>, Uuid, User, User) {
    let (db, tenant_id) = setup_db().await;
    let jon = create_user(&db, tenant_id, "Jon Snow", UserRole::Administrator).await;
    let arya = create_user(&db, tenant_id, "Arya Stark", UserRole::Member).await;
    (db, tenant_id, jon, arya)
}

fn new_idea(title: &str, user: &User) -> NewIdea {
    NewIdea {
        title: title.into(),
        description: "This is a new idea".into(),
        user_id: user.id,
    }
}

fn response(text: &str, user: &User, status: IdeaStatus) -> SetResponse {
    SetResponse {
        text: text.into(),
        user_id: user.id,
        status,
    }
}

#[tokio::test]
async fn add_and_get_idea() {
    let (db, tenant_id, jon, _) = setup().await;
    let repo = SurrealIdeaRepository::new(db);

    let idea = repo
        .add(tenant_id, new_idea("My new idea", &jon))
        .await
        .unwrap();

    assert_eq!(idea.number, 1);
    assert_eq!(idea.slug, "my-new-idea");
    assert_eq!(idea.title, "My new idea");
    assert_eq!(idea.description, "This is a new idea");
    assert_eq!(idea.status, IdeaStatus::Open);
    assert_eq!(idea.tenant_id, tenant_id);
    assert_eq!(idea.user, jon.summary());
    assert_eq!(idea.total_supporters, 0);
    assert_eq!(idea.total_comments, 0);
    assert!(!idea.viewer_supported);
    assert!(idea.response.is_none());

    let by_id = repo.get_by_id(tenant_id, None, idea.id).await.unwrap();
    let by_slug = repo
        .get_by_slug(tenant_id, None, "my-new-idea")
        .await
        .unwrap();
    let by_number = repo.get_by_number(tenant_id, None, 1).await.unwrap();

    for fetched in [&by_id, &by_slug, &by_number] {
        assert_eq!(fetched.id, idea.id);
        assert_eq!(fetched.number, 1);
        assert_eq!(fetched.slug, "my-new-idea");
        assert_eq!(fetched.user.name, "Jon Snow");
        assert_eq!(fetched.user.email, "jon.snow@example.com");
    }
}

#[tokio::test]
async fn get_missing_idea_is_not_found() {
    let (db, tenant_id, _, _) = setup().await;
    let repo = SurrealIdeaRepository::new(db);

    let err = repo.get_by_number(tenant_id, None, 1).await.unwrap_err();
    assert!(err.is_not_found());

    let err = repo
        .get_by_slug(tenant_id, None, "my-new-idea")
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = repo
        .get_by_id(tenant_id, None, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn get_all_orders_by_number() {
    let (db, tenant_id, jon, arya) = setup().await;
    let repo = SurrealIdeaRepository::new(db);

    assert!(repo.get_all(tenant_id, None).await.unwrap().is_empty());

    repo.add(tenant_id, new_idea("First", &jon)).await.unwrap();
    repo.add(tenant_id, new_idea("Second", &arya)).await.unwrap();
    repo.add(tenant_id, new_idea("Third", &jon)).await.unwrap();

    let ideas = repo.get_all(tenant_id, None).await.unwrap();
    let numbers: Vec<u32> = ideas.iter().map(|i| i.number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(ideas[1].user, arya.summary());
}

#[tokio::test]
async fn add_rejects_blank_title() {
    let (db, tenant_id, jon, _) = setup().await;
    let repo = SurrealIdeaRepository::new(db);

    let err = repo.add(tenant_id, new_idea("   ", &jon)).await.unwrap_err();
    assert!(matches!(err, IdeaboxError::Validation { .. }));
    assert!(repo.get_all(tenant_id, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_titles_get_suffixed_slugs() {
    let (db, tenant_id, jon, arya) = setup().await;
    let repo = SurrealIdeaRepository::new(db);

    let first = repo.add(tenant_id, new_idea("My idea", &jon)).await.unwrap();
    let second = repo
        .add(tenant_id, new_idea("My idea", &arya))
        .await
        .unwrap();
    let third = repo.add(tenant_id, new_idea("My  idea!", &jon)).await.unwrap();

    assert_eq!(first.slug, "my-idea");
    assert_eq!(second.slug, "my-idea-2");
    assert_eq!(third.slug, "my-idea-3");
    assert_eq!(third.number, 3);
}

#[tokio::test]
async fn comments_come_back_in_order_with_authors() {
    let (db, tenant_id, jon, arya) = setup().await;
    let repo = SurrealIdeaRepository::new(db);

    let idea = repo
        .add(tenant_id, new_idea("My new idea", &jon))
        .await
        .unwrap();

    let first = repo
        .add_comment(tenant_id, idea.number, "Comment #1", jon.id)
        .await
        .unwrap();
    let second = repo
        .add_comment(tenant_id, idea.number, "Comment #2", arya.id)
        .await
        .unwrap();

    let comments = repo
        .get_comments_by_idea(tenant_id, idea.number)
        .await
        .unwrap();
    assert_eq!(comments.len(), 2);

    assert_eq!(comments[0].id, first);
    assert_eq!(comments[0].idea_id, idea.id);
    assert_eq!(comments[0].content, "Comment #1");
    assert_eq!(comments[0].user, jon.summary());

    assert_eq!(comments[1].id, second);
    assert_eq!(comments[1].content, "Comment #2");
    assert_eq!(comments[1].user, arya.summary());
    assert!(comments[0].created_at <= comments[1].created_at);

    let idea = repo
        .get_by_number(tenant_id, None, idea.number)
        .await
        .unwrap();
    assert_eq!(idea.total_comments, 2);
}

#[tokio::test]
async fn comment_validation_and_missing_idea() {
    let (db, tenant_id, jon, _) = setup().await;
    let repo = SurrealIdeaRepository::new(db);

    let err = repo
        .add_comment(tenant_id, 1, "Hello", jon.id)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = repo.get_comments_by_idea(tenant_id, 1).await.unwrap_err();
    assert!(err.is_not_found());

    let idea = repo
        .add(tenant_id, new_idea("My new idea", &jon))
        .await
        .unwrap();
    let err = repo
        .add_comment(tenant_id, idea.number, "  ", jon.id)
        .await
        .unwrap_err();
    assert!(matches!(err, IdeaboxError::Validation { .. }));
}

#[tokio::test]
async fn tenants_have_independent_numbering() {
    let (db, tenant_a, jon, _) = setup().await;
    let tenant_b = create_tenant(&db, "other").await;
    let sansa = create_user(&db, tenant_b, "Sansa Stark", UserRole::Member).await;
    let repo = SurrealIdeaRepository::new(db);

    let in_a = repo
        .add(tenant_a, new_idea("My new idea", &jon))
        .await
        .unwrap();
    let in_b = repo
        .add(tenant_b, new_idea("My other idea", &sansa))
        .await
        .unwrap();
    let same_title_in_b = repo
        .add(tenant_b, new_idea("My new idea", &sansa))
        .await
        .unwrap();

    assert_eq!(in_a.number, 1);
    assert_eq!(in_b.number, 1);
    assert_eq!(same_title_in_b.number, 2);
    assert_eq!(same_title_in_b.slug, "my-new-idea");

    let fetched = repo.get_by_number(tenant_a, None, 1).await.unwrap();
    assert_eq!(fetched.id, in_a.id);

    let fetched = repo.get_by_number(tenant_b, None, 1).await.unwrap();
    assert_eq!(fetched.id, in_b.id);

    // Ids do not leak across tenants.
    let err = repo.get_by_id(tenant_b, None, in_a.id).await.unwrap_err();
    assert!(err.is_not_found());

    let err = repo
        .get_by_slug(tenant_a, None, "my-other-idea")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn update_regenerates_slug() {
    let (db, tenant_id, jon, arya) = setup().await;
    let repo = SurrealIdeaRepository::new(db);

    let idea = repo
        .add(tenant_id, new_idea("My new idea", &jon))
        .await
        .unwrap();
    repo.add_supporter(tenant_id, idea.number, arya.id)
        .await
        .unwrap();

    let updated = repo
        .update(
            tenant_id,
            idea.number,
            UpdateIdea {
                title: "The new comment".into(),
                description: "With the new description".into(),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.id, idea.id);
    assert_eq!(updated.number, idea.number);
    assert_eq!(updated.title, "The new comment");
    assert_eq!(updated.description, "With the new description");
    assert_eq!(updated.slug, "the-new-comment");
    assert_eq!(updated.status, IdeaStatus::Open);
    assert_eq!(updated.total_supporters, 1);

    let err = repo
        .get_by_slug(tenant_id, None, "my-new-idea")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn update_keeps_own_slug_and_avoids_others() {
    let (db, tenant_id, jon, _) = setup().await;
    let repo = SurrealIdeaRepository::new(db);

    let first = repo.add(tenant_id, new_idea("My idea", &jon)).await.unwrap();
    let second = repo
        .add(tenant_id, new_idea("Another idea", &jon))
        .await
        .unwrap();

    let same = repo
        .update(
            tenant_id,
            first.number,
            UpdateIdea {
                title: "My idea".into(),
                description: "Reworded".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(same.slug, "my-idea");

    let renamed = repo
        .update(
            tenant_id,
            second.number,
            UpdateIdea {
                title: "My idea".into(),
                description: "Now a duplicate".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.slug, "my-idea-2");
}

#[tokio::test]
async fn update_missing_idea_is_not_found() {
    let (db, tenant_id, _, _) = setup().await;
    let repo = SurrealIdeaRepository::new(db);

    let err = repo
        .update(
            tenant_id,
            42,
            UpdateIdea {
                title: "Nothing".into(),
                description: "here".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn add_supporter_marks_viewer() {
    let (db, tenant_id, jon, arya) = setup().await;
    let repo = SurrealIdeaRepository::new(db);

    let idea = repo
        .add(tenant_id, new_idea("My new idea", &jon))
        .await
        .unwrap();
    repo.add_supporter(tenant_id, idea.number, arya.id)
        .await
        .unwrap();

    let seen_by_arya = repo
        .get_by_number(tenant_id, Some(arya.id), idea.number)
        .await
        .unwrap();
    assert_eq!(seen_by_arya.total_supporters, 1);
    assert!(seen_by_arya.viewer_supported);

    let seen_by_jon = repo
        .get_by_number(tenant_id, Some(jon.id), idea.number)
        .await
        .unwrap();
    assert_eq!(seen_by_jon.total_supporters, 1);
    assert!(!seen_by_jon.viewer_supported);

    let anonymous = repo
        .get_by_number(tenant_id, None, idea.number)
        .await
        .unwrap();
    assert!(!anonymous.viewer_supported);
}

#[tokio::test]
async fn add_supporter_twice_counts_once() {
    let (db, tenant_id, jon, arya) = setup().await;
    let repo = SurrealIdeaRepository::new(db);

    let idea = repo
        .add(tenant_id, new_idea("My new idea", &jon))
        .await
        .unwrap();
    repo.add_supporter(tenant_id, idea.number, arya.id)
        .await
        .unwrap();
    repo.add_supporter(tenant_id, idea.number, arya.id)
        .await
        .unwrap();

    let idea = repo
        .get_by_number(tenant_id, None, idea.number)
        .await
        .unwrap();
    assert_eq!(idea.total_supporters, 1);

    repo.add_supporter(tenant_id, idea.number, jon.id)
        .await
        .unwrap();
    let idea = repo
        .get_by_number(tenant_id, None, idea.number)
        .await
        .unwrap();
    assert_eq!(idea.total_supporters, 2);
}

#[tokio::test]
async fn remove_supporter_is_idempotent() {
    let (db, tenant_id, jon, arya) = setup().await;
    let repo = SurrealIdeaRepository::new(db);

    let idea = repo
        .add(tenant_id, new_idea("My new idea", &jon))
        .await
        .unwrap();
    repo.add_supporter(tenant_id, idea.number, arya.id)
        .await
        .unwrap();
    repo.remove_supporter(tenant_id, idea.number, arya.id)
        .await
        .unwrap();

    let fetched = repo
        .get_by_number(tenant_id, Some(arya.id), idea.number)
        .await
        .unwrap();
    assert_eq!(fetched.total_supporters, 0);
    assert!(!fetched.viewer_supported);

    repo.remove_supporter(tenant_id, idea.number, arya.id)
        .await
        .unwrap();
    let fetched = repo
        .get_by_number(tenant_id, None, idea.number)
        .await
        .unwrap();
    assert_eq!(fetched.total_supporters, 0);
}

#[tokio::test]
async fn supporter_changes_on_missing_idea_are_not_found() {
    let (db, tenant_id, _, arya) = setup().await;
    let repo = SurrealIdeaRepository::new(db);

    let err = repo.add_supporter(tenant_id, 9, arya.id).await.unwrap_err();
    assert!(err.is_not_found());

    let err = repo
        .remove_supporter(tenant_id, 9, arya.id)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn set_response_changes_status() {
    let (db, tenant_id, jon, _) = setup().await;
    let repo = SurrealIdeaRepository::new(db);

    let idea = repo
        .add(tenant_id, new_idea("My new idea", &jon))
        .await
        .unwrap();
    repo.set_response(
        tenant_id,
        idea.number,
        response("We're working on it", &jon, IdeaStatus::Started),
    )
    .await
    .unwrap();

    let idea = repo
        .get_by_number(tenant_id, None, idea.number)
        .await
        .unwrap();
    assert_eq!(idea.status, IdeaStatus::Started);

    let resp = idea.response.expect("response should be set");
    assert_eq!(resp.text, "We're working on it");
    assert_eq!(resp.user, jon.summary());
}

#[tokio::test]
async fn set_response_can_keep_idea_open() {
    let (db, tenant_id, jon, _) = setup().await;
    let repo = SurrealIdeaRepository::new(db);

    let idea = repo
        .add(tenant_id, new_idea("My new idea", &jon))
        .await
        .unwrap();
    repo.set_response(
        tenant_id,
        idea.number,
        response("We liked this idea", &jon, IdeaStatus::Open),
    )
    .await
    .unwrap();

    let idea = repo
        .get_by_number(tenant_id, None, idea.number)
        .await
        .unwrap();
    assert_eq!(idea.status, IdeaStatus::Open);
    assert_eq!(idea.response.unwrap().text, "We liked this idea");
}

#[tokio::test]
async fn responded_at_moves_only_on_status_change() {
    let (db, tenant_id, jon, _) = setup().await;
    let repo = SurrealIdeaRepository::new(db);

    let idea = repo
        .add(tenant_id, new_idea("My new idea", &jon))
        .await
        .unwrap();

    repo.set_response(
        tenant_id,
        idea.number,
        response("We liked this idea", &jon, IdeaStatus::Started),
    )
    .await
    .unwrap();
    let first = repo
        .get_by_number(tenant_id, None, idea.number)
        .await
        .unwrap()
        .response
        .unwrap();

    repo.set_response(
        tenant_id,
        idea.number,
        response("We liked this idea and we'll work on it", &jon, IdeaStatus::Started),
    )
    .await
    .unwrap();
    let second = repo
        .get_by_number(tenant_id, None, idea.number)
        .await
        .unwrap()
        .response
        .unwrap();

    assert_eq!(second.text, "We liked this idea and we'll work on it");
    assert_eq!(second.responded_at, first.responded_at);

    repo.set_response(
        tenant_id,
        idea.number,
        response("We finished it", &jon, IdeaStatus::Completed),
    )
    .await
    .unwrap();
    let third = repo
        .get_by_number(tenant_id, None, idea.number)
        .await
        .unwrap()
        .response
        .unwrap();

    assert!(third.responded_at > second.responded_at);
}

#[tokio::test]
async fn set_response_on_missing_idea_is_not_found() {
    let (db, tenant_id, jon, _) = setup().await;
    let repo = SurrealIdeaRepository::new(db);

    let err = repo
        .set_response(tenant_id, 3, response("Nope", &jon, IdeaStatus::Declined))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn closed_idea_ignores_new_supporters() {
    let (db, tenant_id, jon, arya) = setup().await;
    let repo = SurrealIdeaRepository::new(db);

    let idea = repo
        .add(tenant_id, new_idea("My new idea", &jon))
        .await
        .unwrap();
    repo.set_response(
        tenant_id,
        idea.number,
        response("We liked this idea", &jon, IdeaStatus::Completed),
    )
    .await
    .unwrap();

    repo.add_supporter(tenant_id, idea.number, arya.id)
        .await
        .unwrap();

    let fetched = repo
        .get_by_number(tenant_id, Some(arya.id), idea.number)
        .await
        .unwrap();
    assert_eq!(fetched.total_supporters, 0);
    assert!(!fetched.viewer_supported);
}

#[tokio::test]
async fn closed_idea_keeps_existing_supporters() {
    let (db, tenant_id, jon, arya) = setup().await;
    let repo = SurrealIdeaRepository::new(db);

    let idea = repo
        .add(tenant_id, new_idea("My new idea", &jon))
        .await
        .unwrap();
    repo.add_supporter(tenant_id, idea.number, arya.id)
        .await
        .unwrap();
    repo.set_response(
        tenant_id,
        idea.number,
        response("Not going to happen", &jon, IdeaStatus::Declined),
    )
    .await
    .unwrap();

    repo.remove_supporter(tenant_id, idea.number, arya.id)
        .await
        .unwrap();

    let fetched = repo
        .get_by_number(tenant_id, Some(arya.id), idea.number)
        .await
        .unwrap();
    assert_eq!(fetched.total_supporters, 1);
    assert!(fetched.viewer_supported);
    assert_eq!(
        repo.supported_by(tenant_id, arya.id).await.unwrap(),
        vec![idea.id]
    );
}

#[tokio::test]
async fn supported_by_lists_ideas_in_number_order() {
    let (db, tenant_id, jon, arya) = setup().await;
    let repo = SurrealIdeaRepository::new(db);

    let first = repo.add(tenant_id, new_idea("First", &jon)).await.unwrap();
    let second = repo.add(tenant_id, new_idea("Second", &jon)).await.unwrap();
    let third = repo.add(tenant_id, new_idea("Third", &jon)).await.unwrap();

    repo.add_supporter(tenant_id, third.number, arya.id)
        .await
        .unwrap();
    repo.add_supporter(tenant_id, first.number, arya.id)
        .await
        .unwrap();
    repo.add_supporter(tenant_id, second.number, jon.id)
        .await
        .unwrap();

    let arya_supports = repo.supported_by(tenant_id, arya.id).await.unwrap();
    assert_eq!(arya_supports, vec![first.id, third.id]);

    let jon_supports = repo.supported_by(tenant_id, jon.id).await.unwrap();
    assert_eq!(jon_supports, vec![second.id]);

    let nobody = repo
        .supported_by(tenant_id, Uuid::new_v4())
        .await
        .unwrap();
    assert!(nobody.is_empty());
}

#[tokio::test]
async fn supported_by_is_tenant_scoped() {
    let (db, tenant_a, jon, arya) = setup().await;
    let tenant_b = create_tenant(&db, "other").await;
    let repo = SurrealIdeaRepository::new(db);

    let idea = repo.add(tenant_a, new_idea("First", &jon)).await.unwrap();
    repo.add_supporter(tenant_a, idea.number, arya.id)
        .await
        .unwrap();

    assert!(repo.supported_by(tenant_b, arya.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn tags_visible_to_viewer_only_when_restricted() {
    let (db, tenant_id, jon, arya) = setup().await;
    let tags = SurrealTagRepository::new(db.clone());
    let repo = SurrealIdeaRepository::new(db);

    let bug = tags
        .create(
            tenant_id,
            NewTag {
                name: "Bug".into(),
                color: "FF0000".into(),
                is_public: true,
            },
        )
        .await
        .unwrap();
    let feature = tags
        .create(
            tenant_id,
            NewTag {
                name: "Feature Request".into(),
                color: "00FF00".into(),
                is_public: false,
            },
        )
        .await
        .unwrap();
    let not_assigned = tags
        .create(
            tenant_id,
            NewTag {
                name: "Wontfix".into(),
                color: "000000".into(),
                is_public: true,
            },
        )
        .await
        .unwrap();

    let idea = repo
        .add(tenant_id, new_idea("My new idea", &jon))
        .await
        .unwrap();
    assert!(idea.tags.is_empty());

    tags.assign_tag(tenant_id, bug.id, idea.id, jon.id)
        .await
        .unwrap();
    tags.assign_tag(tenant_id, feature.id, idea.id, jon.id)
        .await
        .unwrap();

    let public_view = repo
        .get_by_number(tenant_id, None, idea.number)
        .await
        .unwrap();
    assert_eq!(public_view.tags, vec![bug.id]);

    let member_view = repo
        .get_by_number(tenant_id, Some(arya.id), idea.number)
        .await
        .unwrap();
    assert_eq!(member_view.tags, vec![bug.id, feature.id]);
    assert!(!member_view.tags.contains(&not_assigned.id));

    let all = repo.get_all(tenant_id, Some(arya.id)).await.unwrap();
    assert_eq!(all[0].tags, vec![bug.id, feature.id]);
}

#[tokio::test]
async fn get_all_enriches_each_idea_separately() {
    let (db, tenant_id, jon, arya) = setup().await;
    let tags = SurrealTagRepository::new(db.clone());
    let repo = SurrealIdeaRepository::new(db);

    let first = repo.add(tenant_id, new_idea("First", &jon)).await.unwrap();
    let second = repo.add(tenant_id, new_idea("Second", &arya)).await.unwrap();

    repo.add_supporter(tenant_id, first.number, arya.id)
        .await
        .unwrap();
    repo.add_supporter(tenant_id, first.number, jon.id)
        .await
        .unwrap();

    repo.add_comment(tenant_id, second.number, "Nice", jon.id)
        .await
        .unwrap();
    repo.add_comment(tenant_id, second.number, "Thanks", arya.id)
        .await
        .unwrap();

    let public = tags
        .create(
            tenant_id,
            NewTag {
                name: "Bug".into(),
                color: "FF0000".into(),
                is_public: true,
            },
        )
        .await
        .unwrap();
    let private = tags
        .create(
            tenant_id,
            NewTag {
                name: "Internal".into(),
                color: "000000".into(),
                is_public: false,
            },
        )
        .await
        .unwrap();
    tags.assign_tag(tenant_id, public.id, second.id, jon.id)
        .await
        .unwrap();
    tags.assign_tag(tenant_id, private.id, second.id, jon.id)
        .await
        .unwrap();

    repo.set_response(
        tenant_id,
        second.number,
        response("Coming soon", &jon, IdeaStatus::Planned),
    )
    .await
    .unwrap();

    let ideas = repo.get_all(tenant_id, Some(arya.id)).await.unwrap();
    assert_eq!(ideas.len(), 2);

    assert_eq!(ideas[0].id, first.id);
    assert_eq!(ideas[0].status, IdeaStatus::Open);
    assert_eq!(ideas[0].total_supporters, 2);
    assert!(ideas[0].viewer_supported);
    assert_eq!(ideas[0].total_comments, 0);
    assert!(ideas[0].tags.is_empty());
    assert!(ideas[0].response.is_none());
    assert_eq!(ideas[0].user, jon.summary());

    assert_eq!(ideas[1].id, second.id);
    assert_eq!(ideas[1].status, IdeaStatus::Planned);
    assert_eq!(ideas[1].total_supporters, 0);
    assert!(!ideas[1].viewer_supported);
    assert_eq!(ideas[1].total_comments, 2);
    assert_eq!(ideas[1].tags, vec![public.id, private.id]);
    assert_eq!(ideas[1].user, arya.summary());
    assert_eq!(ideas[1].response.as_ref().unwrap().user, jon.summary());

    let anonymous = repo.get_all(tenant_id, None).await.unwrap();
    assert!(!anonymous[0].viewer_supported);
    assert_eq!(anonymous[0].total_supporters, 2);
    assert_eq!(anonymous[1].tags, vec![public.id]);
}

#[tokio::test]
async fn foreign_user_writes_are_rejected_before_storing() {
    let (db, tenant_id, jon, _) = setup().await;
    let other_tenant = create_tenant(&db, "other").await;
    let sansa = create_user(&db, other_tenant, "Sansa Stark", UserRole::Member).await;
    let repo = SurrealIdeaRepository::new(db);

    let good = repo.add(tenant_id, new_idea("Good", &jon)).await.unwrap();

    let err = repo
        .add(tenant_id, new_idea("Bad", &sansa))
        .await
        .unwrap_err();
    assert!(matches!(err, IdeaboxError::NotFound { ref entity, .. } if entity == "user"));

    let err = repo
        .add_comment(tenant_id, good.number, "Hello", sansa.id)
        .await
        .unwrap_err();
    assert!(matches!(err, IdeaboxError::NotFound { ref entity, .. } if entity == "user"));

    let err = repo
        .add_supporter(tenant_id, good.number, sansa.id)
        .await
        .unwrap_err();
    assert!(matches!(err, IdeaboxError::NotFound { ref entity, .. } if entity == "user"));

    let err = repo
        .set_response(
            tenant_id,
            good.number,
            response("Not mine to answer", &sansa, IdeaStatus::Declined),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, IdeaboxError::NotFound { ref entity, .. } if entity == "user"));

    // Nothing was stored and the tenant stays readable.
    let ideas = repo.get_all(tenant_id, None).await.unwrap();
    assert_eq!(ideas.len(), 1);
    assert_eq!(ideas[0].id, good.id);
    assert_eq!(ideas[0].status, IdeaStatus::Open);
    assert_eq!(ideas[0].total_supporters, 0);
    assert_eq!(ideas[0].total_comments, 0);
    assert!(ideas[0].response.is_none());
    assert!(
        repo.get_comments_by_idea(tenant_id, good.number)
            .await
            .unwrap()
            .is_empty()
    );

    let next = repo.add(tenant_id, new_idea("Next", &jon)).await.unwrap();
    assert_eq!(next.number, 2);
}

#[tokio::test]
async fn votes_racing_a_close_keep_the_count_consistent() {
    let (db, tenant_id, jon, _) = setup().await;
    let mut voters = Vec::new();
    for name in ["Bran Stark", "Robb Stark", "Rickon Stark", "Sansa Stark"] {
        voters.push(create_user(&db, tenant_id, name, UserRole::Member).await);
    }
    let repo = SurrealIdeaRepository::new(db);

    let idea = repo
        .add(tenant_id, new_idea("My new idea", &jon))
        .await
        .unwrap();

    let votes = async {
        for voter in &voters {
            repo.add_supporter(tenant_id, idea.number, voter.id)
                .await
                .unwrap();
        }
    };
    let close = repo.set_response(
        tenant_id,
        idea.number,
        response("Done", &jon, IdeaStatus::Completed),
    );
    let ((), closed) = tokio::join!(votes, close);
    closed.unwrap();

    let mut supporters = 0;
    for voter in &voters {
        if repo
            .supported_by(tenant_id, voter.id)
            .await
            .unwrap()
            .contains(&idea.id)
        {
            supporters += 1;
        }
    }

    let closed = repo
        .get_by_number(tenant_id, None, idea.number)
        .await
        .unwrap();
    assert_eq!(closed.status, IdeaStatus::Completed);
    assert_eq!(closed.total_supporters, supporters);

    // Once closed, the set stays frozen.
    repo.add_supporter(tenant_id, idea.number, jon.id)
        .await
        .unwrap();
    repo.remove_supporter(tenant_id, idea.number, voters[0].id)
        .await
        .unwrap();
    let after = repo
        .get_by_number(tenant_id, None, idea.number)
        .await
        .unwrap();
    assert_eq!(after.total_supporters, supporters);
    assert!(repo.supported_by(tenant_id, jon.id).await.unwrap().is_empty());
}
