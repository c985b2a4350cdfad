use chrono::{TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use taskevents_core::UpstreamConfig;
use taskevents_domain::{
    OccurrenceSink, RecurrenceType, ReminderDeliveryStatus, TaskGateway, TaskOccurrence,
};
use taskevents_infrastructure::{HttpOccurrenceSink, HttpTaskGateway};

fn upstream_config(server: &MockServer) -> UpstreamConfig {
    UpstreamConfig {
        base_url: server.uri(),
        timeout_seconds: 2,
    }
}

fn sample_occurrence() -> TaskOccurrence {
    let due = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    TaskOccurrence {
        id: Uuid::new_v4(),
        user_id: "u-1".to_string(),
        title: "写周报".to_string(),
        description: None,
        is_completed: false,
        recurrence_type: RecurrenceType::Daily,
        recurrence_interval: None,
        due_at: due,
        next_occurrence_at: due,
        priority: "medium".to_string(),
        parent_task_id: "t-1".to_string(),
        created_at: due,
        updated_at: due,
    }
}

#[tokio::test]
async fn test_fetch_task_title_returns_title() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/t-1"))
        .and(header("X-User-ID", "u-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "t-1", "title": "写周报"})),
        )
        .mount(&server)
        .await;

    let gateway = HttpTaskGateway::new(&upstream_config(&server)).unwrap();
    let title = gateway.fetch_task_title("t-1", "u-1").await.unwrap();
    assert_eq!(title, Some("写周报".to_string()));
}

#[tokio::test]
async fn test_fetch_task_title_missing_task_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let gateway = HttpTaskGateway::new(&upstream_config(&server)).unwrap();
    let title = gateway.fetch_task_title("missing", "u-1").await.unwrap();
    assert_eq!(title, None);
}

#[tokio::test]
async fn test_fetch_task_title_server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/t-1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let gateway = HttpTaskGateway::new(&upstream_config(&server)).unwrap();
    let error = gateway.fetch_task_title("t-1", "u-1").await.unwrap_err();
    assert!(error.is_transient());
}

#[tokio::test]
async fn test_update_reminder_status_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/reminders/r-1/status"))
        .and(body_json(json!({"status": "sent"})))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let gateway = HttpTaskGateway::new(&upstream_config(&server)).unwrap();
    let updated = gateway
        .update_reminder_status("r-1", ReminderDeliveryStatus::Sent)
        .await
        .unwrap();
    assert!(updated);
}

#[tokio::test]
async fn test_update_reminder_status_rejected_is_false_not_error() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/reminders/r-1/status"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let gateway = HttpTaskGateway::new(&upstream_config(&server)).unwrap();
    let updated = gateway
        .update_reminder_status("r-1", ReminderDeliveryStatus::Failed)
        .await
        .unwrap();
    assert!(!updated);
}

#[tokio::test]
async fn test_persist_occurrence_posts_to_tasks_api() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tasks"))
        .and(header("X-User-ID", "u-1"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let sink = HttpOccurrenceSink::new(&upstream_config(&server)).unwrap();
    sink.persist(&sample_occurrence()).await.unwrap();
}

#[tokio::test]
async fn test_persist_occurrence_server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let sink = HttpOccurrenceSink::new(&upstream_config(&server)).unwrap();
    let error = sink.persist(&sample_occurrence()).await.unwrap_err();
    assert!(error.is_transient());
}
