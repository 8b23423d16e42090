//! Repository tests against a real Postgres
//!
//! Run with: DATABASE_URL=postgres://... cargo test -p recruitctl-server -- --ignored

use recruitctl_core::filters::{FilterDescriptor, FilterOperator};
use recruitctl_core::{Facet, FacetRequest, ListQuery};
use recruitctl_server::db::repos::{
    bulk_create, Applications, Athletes, BulkLeadsRequest, CampaignLeads, Coaches, ContactRepo,
    Contacts, LinkAthlete, Programs, TeamMembers, Universities, UniversityJobs,
};
use recruitctl_server::db::{DbError, EntityRepo, EntityWrite};
use recruitctl_server::models::ValidationError;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

async fn create<E: EntityWrite>(pool: &PgPool, body: serde_json::Value) -> Result<E::Row, DbError> {
    let new: E::New = serde_json::from_value(body).unwrap();
    E::create(&EntityRepo::<E>::new(pool), new).await
}

async fn patch<E: EntityWrite>(
    pool: &PgPool,
    id: Uuid,
    body: serde_json::Value,
) -> Result<E::Row, DbError> {
    let patch: E::Patch = serde_json::from_value(body).unwrap();
    E::update(&EntityRepo::<E>::new(pool), id, patch).await
}

async fn university(pool: &PgPool, name: &str, state: &str) -> Uuid {
    create::<Universities>(pool, json!({"name": name, "state": state, "division": "D1"}))
        .await
        .unwrap()
        .id
}

async fn program(pool: &PgPool, university_id: Uuid, gender: &str) -> Uuid {
    create::<Programs>(pool, json!({"university_id": university_id, "gender": gender}))
        .await
        .unwrap()
        .id
}

async fn athlete(pool: &PgPool, name: &str) -> Uuid {
    create::<Athletes>(pool, json!({"full_name": name}))
        .await
        .unwrap()
        .id
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn soft_deleted_rows_disappear(pool: PgPool) {
    let id = athlete(&pool, "Jamie Fox").await;
    let repo = EntityRepo::<Athletes>::new(&pool);

    repo.soft_delete(id).await.unwrap();

    assert!(matches!(repo.get(id).await, Err(DbError::NotFound { .. })));
    assert!(matches!(repo.soft_delete(id).await, Err(DbError::NotFound { .. })));
    assert!(matches!(
        patch::<Athletes>(&pool, id, json!({"city": "Austin"})).await,
        Err(DbError::NotFound { .. })
    ));
    let page = repo.list(&ListQuery::default()).await.unwrap();
    assert_eq!(page.total, 0);
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn patch_null_clears_and_absent_keeps(pool: PgPool) {
    let created = create::<Athletes>(
        &pool,
        json!({"full_name": "Ana Ruiz", "city": "Tucson", "state": "AZ"}),
    )
    .await
    .unwrap();

    let updated = patch::<Athletes>(&pool, created.id, json!({"city": null}))
        .await
        .unwrap();
    assert_eq!(updated.city, None);
    assert_eq!(updated.state.as_deref(), Some("AZ"));

    assert!(matches!(
        patch::<Athletes>(&pool, created.id, json!({})).await,
        Err(DbError::Validation(ValidationError::NoChanges))
    ));
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn invite_codes_are_unique_among_live_athletes(pool: PgPool) {
    let first = create::<Athletes>(&pool, json!({"full_name": "A", "invite_code": "abc123"}))
        .await
        .unwrap();

    let clash = create::<Athletes>(&pool, json!({"full_name": "B", "invite_code": "abc123"})).await;
    assert!(matches!(
        clash,
        Err(DbError::Validation(ValidationError::Duplicate { .. }))
    ));

    EntityRepo::<Athletes>::new(&pool)
        .soft_delete(first.id)
        .await
        .unwrap();
    create::<Athletes>(&pool, json!({"full_name": "B", "invite_code": "abc123"}))
        .await
        .unwrap();
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn applications_reject_duplicates_and_foreign_programs(pool: PgPool) {
    let athlete_id = athlete(&pool, "Kai Moore").await;
    let state_u = university(&pool, "State University", "TX").await;
    let other_u = university(&pool, "Other College", "OK").await;
    let women = program(&pool, state_u, "women").await;
    let other_program = program(&pool, other_u, "women").await;

    create::<Applications>(
        &pool,
        json!({"athlete_id": athlete_id, "university_id": state_u, "program_id": women}),
    )
    .await
    .unwrap();

    let duplicate = create::<Applications>(
        &pool,
        json!({"athlete_id": athlete_id, "university_id": state_u, "program_id": women}),
    )
    .await;
    assert!(matches!(
        duplicate,
        Err(DbError::Validation(ValidationError::Duplicate { .. }))
    ));

    let wrong_program = create::<Applications>(
        &pool,
        json!({"athlete_id": athlete_id, "university_id": state_u, "program_id": other_program}),
    )
    .await;
    assert!(matches!(
        wrong_program,
        Err(DbError::Validation(ValidationError::InvalidFormat { field: "program_id", .. }))
    ));

    // No program is its own key
    let open = create::<Applications>(
        &pool,
        json!({"athlete_id": athlete_id, "university_id": state_u}),
    )
    .await
    .unwrap();

    // Moving the open application onto the existing key is a duplicate too
    let moved = patch::<Applications>(&pool, open.id, json!({"program_id": women})).await;
    assert!(matches!(
        moved,
        Err(DbError::Validation(ValidationError::Duplicate { .. }))
    ));
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn unknown_reference_is_validation_error(pool: PgPool) {
    let missing = Uuid::new_v4();
    let result = create::<Programs>(&pool, json!({"university_id": missing, "gender": "men"})).await;
    assert!(matches!(
        result,
        Err(DbError::Validation(ValidationError::UnknownReference { field: "university_id", .. }))
    ));
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn current_job_moves_coach(pool: PgPool) {
    let first_u = university(&pool, "First U", "CA").await;
    let second_u = university(&pool, "Second U", "OR").await;
    let coach = create::<Coaches>(
        &pool,
        json!({"full_name": "Robin Hale", "university_id": first_u}),
    )
    .await
    .unwrap();

    let old_job = create::<UniversityJobs>(
        &pool,
        json!({"coach_id": coach.id, "university_id": first_u, "is_current": true}),
    )
    .await
    .unwrap();
    let new_job = create::<UniversityJobs>(
        &pool,
        json!({"coach_id": coach.id, "university_id": second_u, "is_current": true}),
    )
    .await
    .unwrap();

    let jobs = EntityRepo::<UniversityJobs>::new(&pool);
    assert!(!jobs.get(old_job.id).await.unwrap().is_current);
    assert!(jobs.get(new_job.id).await.unwrap().is_current);

    let coach = EntityRepo::<Coaches>::new(&pool).get(coach.id).await.unwrap();
    assert_eq!(coach.university_id, Some(second_u));
    assert_eq!(coach.university_name.as_deref(), Some("Second U"));
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn job_program_must_belong_to_job_university(pool: PgPool) {
    let first_u = university(&pool, "First U", "CA").await;
    let second_u = university(&pool, "Second U", "OR").await;
    let foreign_program = program(&pool, second_u, "women").await;
    let own_program = program(&pool, first_u, "women").await;
    let coach = create::<Coaches>(&pool, json!({"full_name": "Robin Hale"}))
        .await
        .unwrap();

    let result = create::<UniversityJobs>(
        &pool,
        json!({
            "coach_id": coach.id,
            "university_id": first_u,
            "program_id": foreign_program,
            "is_current": true
        }),
    )
    .await;
    assert!(matches!(
        result,
        Err(DbError::Validation(ValidationError::InvalidFormat { field: "program_id", .. }))
    ));
    let coach_row = EntityRepo::<Coaches>::new(&pool).get(coach.id).await.unwrap();
    assert_eq!(coach_row.program_id, None);

    let job = create::<UniversityJobs>(
        &pool,
        json!({
            "coach_id": coach.id,
            "university_id": first_u,
            "program_id": own_program,
            "is_current": true
        }),
    )
    .await
    .unwrap();
    let result = patch::<UniversityJobs>(&pool, job.id, json!({"program_id": foreign_program})).await;
    assert!(matches!(
        result,
        Err(DbError::Validation(ValidationError::InvalidFormat { field: "program_id", .. }))
    ));
    let coach_row = EntityRepo::<Coaches>::new(&pool).get(coach.id).await.unwrap();
    assert_eq!(coach_row.program_id, Some(own_program));
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn list_filters_search_and_counts(pool: PgPool) {
    university(&pool, "Texas Tech", "TX").await;
    university(&pool, "Rice University", "TX").await;
    university(&pool, "Oregon State", "OR").await;

    let repo = EntityRepo::<Universities>::new(&pool);
    let query = ListQuery {
        filters: vec![FilterDescriptor::new(
            "state",
            FilterOperator::Is,
            vec![json!("TX")],
        )],
        per_page: Some(1),
        ..Default::default()
    };
    let page = repo.list(&query).await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.total_pages, 2);
    // Default sort is by name
    assert_eq!(page.items[0].name, "Rice University");

    let query = ListQuery {
        search: Some("  oregon ".into()),
        ..Default::default()
    };
    let page = repo.list(&query).await.unwrap();
    assert_eq!(page.total, 1);
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn page_past_the_end_keeps_total(pool: PgPool) {
    university(&pool, "Texas Tech", "TX").await;
    university(&pool, "Rice University", "TX").await;
    university(&pool, "Oregon State", "OR").await;

    let repo = EntityRepo::<Universities>::new(&pool);
    let query = ListQuery {
        page: Some(5),
        per_page: Some(2),
        ..Default::default()
    };
    let page = repo.list(&query).await.unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total, 3);
    assert_eq!(page.total_pages, 2);

    let query = ListQuery {
        filters: vec![FilterDescriptor::new(
            "state",
            FilterOperator::Is,
            vec![json!("OR")],
        )],
        page: Some(3),
        per_page: Some(2),
        ..Default::default()
    };
    assert_eq!(repo.list(&query).await.unwrap().total, 1);
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn facets_ignore_their_own_filter(pool: PgPool) {
    university(&pool, "Texas Tech", "TX").await;
    university(&pool, "Rice University", "TX").await;
    university(&pool, "Oregon State", "OR").await;

    let request = FacetRequest {
        filters: vec![FilterDescriptor::new(
            "state",
            FilterOperator::Is,
            vec![json!("TX")],
        )],
        search: None,
        columns: vec!["state".into(), "division".into()],
    };
    let facets = EntityRepo::<Universities>::new(&pool)
        .facets(&request)
        .await
        .unwrap();

    let Some(Facet::Counts(states)) = facets.get("state") else {
        panic!("expected state counts, got {:?}", facets.get("state"));
    };
    assert_eq!(states.get("TX"), Some(&2));
    assert_eq!(states.get("OR"), Some(&1));

    let Some(Facet::Counts(divisions)) = facets.get("division") else {
        panic!("expected division counts");
    };
    assert_eq!(divisions.get("D1"), Some(&2));
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn bulk_leads_are_all_or_nothing(pool: PgPool) {
    let campaign = create::<recruitctl_server::db::repos::Campaigns>(
        &pool,
        json!({"name": "Spring outreach"}),
    )
    .await
    .unwrap();
    let state_u = university(&pool, "State U", "TX").await;
    let other_u = university(&pool, "Other U", "TX").await;
    let foreign_program = program(&pool, other_u, "men").await;

    let request: BulkLeadsRequest = serde_json::from_value(json!({
        "campaign_id": campaign.id,
        "leads": [
            {"university_id": state_u},
            {"university_id": state_u, "program_id": foreign_program}
        ]
    }))
    .unwrap();
    assert!(bulk_create(&pool, request).await.is_err());

    let leads = EntityRepo::<CampaignLeads>::new(&pool);
    assert_eq!(leads.list(&ListQuery::default()).await.unwrap().total, 0);

    let request: BulkLeadsRequest = serde_json::from_value(json!({
        "campaign_id": campaign.id,
        "leads": [{"university_id": state_u}, {"university_id": other_u}]
    }))
    .unwrap();
    let created = bulk_create(&pool, request).await.unwrap();
    assert_eq!(created.len(), 2);
    assert!(created.iter().all(|l| l.status == "pending"));
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn contact_links(pool: PgPool) {
    let contact = create::<Contacts>(&pool, json!({"full_name": "Dana Ruiz"}))
        .await
        .unwrap();
    let athlete_id = athlete(&pool, "Ana Ruiz").await;
    let repo = ContactRepo::new(&pool);

    repo.link_athlete(
        contact.id,
        LinkAthlete {
            athlete_id,
            relationship: Some("mother".into()),
            is_primary: false,
        },
    )
    .await
    .unwrap();
    // Linking again updates the link in place
    let linked = repo
        .link_athlete(
            contact.id,
            LinkAthlete {
                athlete_id,
                relationship: Some("guardian".into()),
                is_primary: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(linked.relationship.as_deref(), Some("guardian"));
    assert_eq!(linked.athlete_name, "Ana Ruiz");

    let contact = EntityRepo::<Contacts>::new(&pool).get(contact.id).await.unwrap();
    assert_eq!(contact.athlete_count, 1);

    repo.unlink_athlete(contact.id, athlete_id).await.unwrap();
    assert!(repo.list_athletes(contact.id).await.unwrap().is_empty());
    assert!(matches!(
        repo.unlink_athlete(contact.id, athlete_id).await,
        Err(DbError::NotFound { .. })
    ));
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn team_member_email_is_unique_ignoring_case(pool: PgPool) {
    create::<TeamMembers>(&pool, json!({"full_name": "Alex", "email": "alex@agency.com"}))
        .await
        .unwrap();
    let clash =
        create::<TeamMembers>(&pool, json!({"full_name": "Alexis", "email": "ALEX@agency.com"}))
            .await;
    assert!(matches!(
        clash,
        Err(DbError::Validation(ValidationError::Duplicate { .. }))
    ));
}
