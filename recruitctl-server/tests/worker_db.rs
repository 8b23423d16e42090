//! Import worker against a mock file host and a real Postgres
//!
//! Run with: DATABASE_URL=postgres://... cargo test -p recruitctl-server -- --ignored

use std::time::Duration;

use recruitctl_core::ListQuery;
use recruitctl_server::db::repos::import_jobs::JobStatus;
use recruitctl_server::db::repos::{
    CoachImportJobRepo, CoachImportJobs, Coaches, NewImportJob, Universities,
};
use recruitctl_server::db::{EntityRepo, EntityWrite};
use recruitctl_server::ImportWorker;
use serde_json::json;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SHEET: &str = "\
Name,Email,Title,School,Gender
Jordan Lee,jlee@state.edu,Head Coach - Sprints/Hurdles,State University,Women
Casey Park,cpark@state.edu,Assistant Coach - Throws,state university,Women
,nobody@state.edu,Volunteer,State University,Men
Riley Stone,,Distance Coach,Unknown College,Men
";

async fn queue_job(pool: &PgPool, url: String) -> uuid::Uuid {
    CoachImportJobRepo::new(pool)
        .create(NewImportJob {
            file_name: "coaches.csv".into(),
            file_url: url,
        })
        .await
        .unwrap()
        .id
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn imports_sheet_and_records_row_errors(pool: PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coaches.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SHEET))
        .mount(&server)
        .await;

    let new: <Universities as EntityWrite>::New =
        serde_json::from_value(json!({"name": "State University"})).unwrap();
    let state_u = Universities::create(&EntityRepo::new(&pool), new)
        .await
        .unwrap();

    let job_id = queue_job(&pool, format!("{}/coaches.csv", server.uri())).await;
    let worker = ImportWorker::new(pool.clone(), Duration::from_millis(10));

    let outcome = worker.run_once().await.unwrap().unwrap();
    assert_eq!(outcome.job_id, job_id);
    assert_eq!(outcome.status, JobStatus::Completed);
    assert_eq!(outcome.progress.success_rows, 3);
    assert_eq!(outcome.progress.error_rows, 1);

    let job = EntityRepo::<CoachImportJobs>::new(&pool)
        .get(job_id)
        .await
        .unwrap();
    assert_eq!(job.status, "completed");
    assert_eq!(job.errors.as_array().map(Vec::len), Some(1));
    assert_eq!(job.errors[0]["row"], 3);

    let coaches = EntityRepo::<Coaches>::new(&pool)
        .list(&ListQuery::default())
        .await
        .unwrap();
    assert_eq!(coaches.total, 3);
    let jordan = coaches
        .items
        .iter()
        .find(|c| c.full_name == "Jordan Lee")
        .unwrap();
    assert_eq!(jordan.university_id, Some(state_u.id));
    assert!(jordan.is_head_coach);

    // The queue is drained
    assert!(worker.run_once().await.unwrap().is_none());
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn reimport_updates_by_email(pool: PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coaches.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SHEET))
        .mount(&server)
        .await;

    let worker = ImportWorker::new(pool.clone(), Duration::from_millis(10));
    queue_job(&pool, format!("{}/coaches.csv", server.uri())).await;
    worker.run_once().await.unwrap();
    queue_job(&pool, format!("{}/coaches.csv", server.uri())).await;
    worker.run_once().await.unwrap();

    let coaches = EntityRepo::<Coaches>::new(&pool)
        .list(&ListQuery::default())
        .await
        .unwrap();
    // Riley has no email, so that row inserts twice
    assert_eq!(coaches.total, 4);
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn blank_duty_cells_keep_stored_duties(pool: PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/first.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "Name,Email,Title,Responsibilities\nJo Lee,jo@u.edu,Head Coach,Sprints/Hurdles\n",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/second.csv"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("Name,Email,Title,Responsibilities\nJo Lee,jo@u.edu,,\n"),
        )
        .mount(&server)
        .await;

    let worker = ImportWorker::new(pool.clone(), Duration::from_millis(10));
    queue_job(&pool, format!("{}/first.csv", server.uri())).await;
    worker.run_once().await.unwrap();
    queue_job(&pool, format!("{}/second.csv", server.uri())).await;
    let outcome = worker.run_once().await.unwrap().unwrap();
    assert_eq!(outcome.progress.success_rows, 1);

    let coaches = EntityRepo::<Coaches>::new(&pool)
        .list(&ListQuery::default())
        .await
        .unwrap();
    assert_eq!(coaches.total, 1);
    let jo = &coaches.items[0];
    assert_eq!(jo.title.as_deref(), Some("Head Coach"));
    assert_eq!(jo.event_groups, vec!["sprints", "hurdles"]);
    assert!(jo.is_head_coach);
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn download_failure_fails_job(pool: PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let job_id = queue_job(&pool, format!("{}/missing.csv", server.uri())).await;
    let worker = ImportWorker::new(pool.clone(), Duration::from_millis(10));

    let outcome = worker.run_once().await.unwrap().unwrap();
    assert_eq!(outcome.status, JobStatus::Failed);

    let job = EntityRepo::<CoachImportJobs>::new(&pool)
        .get(job_id)
        .await
        .unwrap();
    assert_eq!(job.status, "failed");
    assert!(job.error_message.unwrap().starts_with("download failed"));
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn run_stops_on_cancel(pool: PgPool) {
    let worker = ImportWorker::new(pool, Duration::from_secs(60));
    let token = CancellationToken::new();
    let handle = {
        let token = token.clone();
        tokio::spawn(async move { worker.run(token).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("worker did not stop")
        .unwrap();
}
