//! Tests for tokio spawner and API models

use job_admission::core::{Spawn, WorkType, BIAS_DEFAULT};
use job_admission::runtime::{health, JobSubmission, TokioSpawner};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(async move {
        tx.send(123).unwrap();
    });

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[test]
fn test_tokio_spawner_outside_runtime() {
    assert!(TokioSpawner::try_current().is_err());
}

#[test]
fn test_job_submission_defaults() {
    let submission: JobSubmission =
        serde_json::from_str(r#"{"uid": 1110001, "job_id": 3, "package": "com.example"}"#).unwrap();
    let job = submission.into_job();
    assert_eq!(job.bias(), BIAS_DEFAULT);
    assert!(!job.is_expedited());
    assert_eq!(job.source_user_id(), 11);
}

#[test]
fn test_job_submission_source_user_override() {
    let submission: JobSubmission = serde_json::from_str(
        r#"{"uid": 10001, "job_id": 3, "package": "com.example", "source_user_id": 10, "expedited": true}"#,
    )
    .unwrap();
    let job = submission.into_job();
    assert_eq!(job.source_user_id(), 10);
    assert!(job.is_expedited());
}

#[test]
fn test_health_and_work_type_serde() {
    assert!(health().ok);
    assert_eq!(
        serde_json::to_string(&WorkType::BgUserImportant).unwrap(),
        "\"bg_user_important\""
    );
}
