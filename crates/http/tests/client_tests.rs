//! Integration tests for the DevTrack HTTP client

use devtrack_core::{CredentialStore, CredentialVault, MemoryStore};
use devtrack_http::types::{ContactMessage, ProfileUpdate, Semaphore};
use devtrack_http::{ClientError, DevTrackClient};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{
    body_json, body_string_contains, header, header_exists, method, path, query_param,
};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn user_json() -> serde_json::Value {
    json!({
        "id": 42,
        "email": "student@devtrack.test",
        "username": "student@devtrack.test",
        "first_name": "Sofía",
        "last_name": "Ramos",
        "role": "STUDENT",
        "is_email_verified": true
    })
}

fn client_with_store(uri: &str) -> (DevTrackClient, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let vault = Arc::new(CredentialVault::open(store.clone()).unwrap());
    let client = DevTrackClient::builder()
        .base_url(uri)
        .vault(vault)
        .build()
        .unwrap();
    (client, store)
}

async fn signed_in(server: &MockServer) -> (DevTrackClient, Arc<MemoryStore>) {
    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": "access-1",
            "refresh": "refresh-1",
            "user": user_json()
        })))
        .mount(server)
        .await;

    let (client, store) = client_with_store(&server.uri());
    client.login("student@devtrack.test", "secret123").await.unwrap();
    (client, store)
}

#[tokio::test]
async fn test_client_builder() {
    let client = DevTrackClient::builder()
        .base_url("http://localhost:8000/")
        .captcha_site_key(Some("site-key".into()))
        .build()
        .unwrap();

    assert_eq!(client.base_url(), "http://localhost:8000");
    assert_eq!(client.captcha_site_key(), Some("site-key"));
    assert!(!client.vault().is_authenticated());
}

#[tokio::test]
async fn test_client_builder_requires_base_url() {
    let result = DevTrackClient::builder().build();
    assert!(matches!(result, Err(ClientError::Configuration(_))));
}

#[tokio::test]
async fn test_login_persists_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .and(body_json(json!({"email": "student@devtrack.test", "password": "secret123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": "access-1",
            "refresh": "refresh-1",
            "user": user_json()
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_with_store(&server.uri());
    let user = client
        .login("  Student@DevTrack.test ", "secret123")
        .await
        .unwrap();

    assert_eq!(user.id, 42);
    let record = store.load().unwrap().unwrap();
    assert_eq!(record.access.as_deref(), Some("access-1"));
    assert_eq!(record.refresh.as_deref(), Some("refresh-1"));
    assert_eq!(record.user, Some(user));
}

#[tokio::test]
async fn test_login_does_not_send_stale_token() {
    let server = MockServer::start().await;
    let (client, _store) = signed_in(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(401))
        .with_priority(1)
        .expect(0)
        .mount(&server)
        .await;

    client.login("student@devtrack.test", "secret123").await.unwrap();
}

#[tokio::test]
async fn test_bad_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Credenciales inválidas."})),
        )
        .mount(&server)
        .await;

    let (client, store) = client_with_store(&server.uri());
    let result = client.login("x@devtrack.test", "nope").await;

    assert!(matches!(result, Err(ClientError::AuthenticationFailed(_))));
    assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn test_bearer_token_attached() {
    let server = MockServer::start().await;
    let (client, _store) = signed_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/courses/subjects/"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Algoritmos", "code": "ALG-1", "enrollments_count": 12}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let subjects = client.list_subjects().await.unwrap();
    assert_eq!(subjects.len(), 1);
    assert_eq!(subjects[0].code, "ALG-1");
}

#[tokio::test]
async fn test_anonymous_request_has_no_authorization() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/courses/subjects/"))
        .respond_with(|req: &Request| {
            if req.headers.contains_key("authorization") {
                ResponseTemplate::new(500)
            } else {
                ResponseTemplate::new(401).set_body_string("not authenticated")
            }
        })
        .mount(&server)
        .await;

    let client = DevTrackClient::new(server.uri()).unwrap();
    let result = client.list_subjects().await;
    assert!(matches!(result, Err(ClientError::AuthenticationFailed(_))));
}

#[tokio::test]
async fn test_error_status_passthrough() {
    let server = MockServer::start().await;
    let (client, store) = signed_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/courses/subjects/9/"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found."))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/courses/subjects/"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Only teachers"))
        .mount(&server)
        .await;

    assert!(matches!(
        client.get_subject(9).await,
        Err(ClientError::NotFound(_))
    ));
    assert!(matches!(
        client.create_subject("Redes", "RED-1").await,
        Err(ClientError::Forbidden(_))
    ));
    // Non-401 failures never touch credentials
    assert!(store.load().unwrap().is_some());
}

#[tokio::test]
async fn test_update_profile_validates_timeout_locally() {
    let server = MockServer::start().await;
    let (client, _store) = signed_in(&server).await;

    Mock::given(method("PATCH"))
        .and(path("/api/auth/profile/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .expect(0)
        .mount(&server)
        .await;

    let update = ProfileUpdate {
        session_timeout: Some(240),
        ..ProfileUpdate::default()
    };
    let result = client.update_profile(&update).await;
    assert!(matches!(result, Err(ClientError::Validation(_))));
}

#[tokio::test]
async fn test_update_profile_refreshes_stored_user() {
    let server = MockServer::start().await;
    let (client, store) = signed_in(&server).await;

    let mut updated = user_json();
    updated["session_timeout"] = json!(15);
    Mock::given(method("PATCH"))
        .and(path("/api/auth/profile/"))
        .and(body_json(json!({"session_timeout": 15})))
        .respond_with(ResponseTemplate::new(200).set_body_json(updated))
        .expect(1)
        .mount(&server)
        .await;

    let update = ProfileUpdate {
        session_timeout: Some(15),
        ..ProfileUpdate::default()
    };
    let user = client.update_profile(&update).await.unwrap();

    assert_eq!(user.session_timeout().minutes(), 15);
    let stored = store.load().unwrap().unwrap();
    assert_eq!(stored.user.unwrap().session_timeout_minutes, Some(15));
    assert_eq!(stored.access.as_deref(), Some("access-1"));
}

#[tokio::test]
async fn test_profile_refreshes_stored_user() {
    let server = MockServer::start().await;
    let (client, store) = signed_in(&server).await;

    let mut remote = user_json();
    remote["first_name"] = json!("Sofi");
    remote["session_timeout"] = json!(60);
    Mock::given(method("GET"))
        .and(path("/api/auth/profile/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(remote))
        .expect(1)
        .mount(&server)
        .await;

    let user = client.profile().await.unwrap();

    assert_eq!(user.first_name, "Sofi");
    assert_eq!(client.vault().user(), Some(user));
    let stored = store.load().unwrap().unwrap().user.unwrap();
    assert_eq!(stored.session_timeout_minutes, Some(60));
}

#[tokio::test]
async fn test_enrollment_views() {
    let server = MockServer::start().await;
    let (client, _store) = signed_in(&server).await;

    let stats = json!({"total": 4, "green": 3, "yellow": 1, "red": 0, "grade": 3.75, "semaphore": "YELLOW"});
    Mock::given(method("GET"))
        .and(path("/api/courses/my-enrollments/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "enrollments": [{
                "enrollment_id": 11,
                "subject_id": 4,
                "subject_code": "ALG-1",
                "subject_name": "Algoritmos",
                "stats": stats.clone()
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/courses/enrollments/11/results/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "enrollment_id": 11,
            "student_email": "student@devtrack.test",
            "results": [
                {"exercise_id": 1, "exercise_name": "Ordenamiento", "status": "GREEN", "updated_at": "2026-03-02T09:30:00Z"},
                {"exercise_id": 2, "exercise_name": "Grafos", "status": "YELLOW", "updated_at": "2026-03-03T09:30:00Z"}
            ],
            "stats": stats
        })))
        .mount(&server)
        .await;

    let mine = client.my_enrollments().await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].subject_code, "ALG-1");
    assert_eq!(mine[0].stats.semaphore, Semaphore::Yellow);

    let results = client.enrollment_results(11).await.unwrap();
    assert_eq!(results.results.len(), 2);
    assert_eq!(results.results[1].exercise_name, "Grafos");
    assert_eq!(results.stats.grade, 3.75);
}

#[tokio::test]
async fn test_dashboards() {
    let server = MockServer::start().await;
    let (client, _store) = signed_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/courses/subjects/4/dashboard/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "subject_id": 4,
            "subject_code": "ALG-1",
            "subject_name": "Algoritmos",
            "total_exercises": 5,
            "enrollments": [{
                "enrollment_id": 11,
                "student_email": "student@devtrack.test",
                "total": 5, "green": 5, "yellow": 0, "red": 0,
                "grade": 5.0, "semaphore": "GREEN"
            }],
            "aggregates": {"avg_grade": 5.0, "pct_green": 100.0, "pct_yellow": 0.0, "pct_red": 0.0}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/courses/student-dashboard/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "summary": {
                "total_results": 6, "green_count": 4, "yellow_count": 1, "red_count": 1,
                "success_rate": 66.7, "total_pending": 2
            },
            "subjects_progress": [{
                "subject_id": 4, "subject_code": "ALG-1", "subject_name": "Algoritmos",
                "total_exercises": 8, "completed_exercises": 6, "completion_rate": 75.0, "grade": 4.1
            }],
            "pending_exercises": [{
                "id": 9, "name": "Heaps", "subject_id": 4, "subject_code": "ALG-1",
                "subject_name": "Algoritmos", "deadline": null
            }]
        })))
        .mount(&server)
        .await;

    let dashboard = client.subject_dashboard(4).await.unwrap();
    assert_eq!(dashboard.total_exercises, 5);
    assert_eq!(dashboard.enrollments[0].stats.semaphore, Semaphore::Green);
    assert_eq!(dashboard.aggregates.pct_green, 100.0);

    let student = client.student_dashboard().await.unwrap();
    assert_eq!(student.summary.total_pending, 2);
    assert_eq!(student.subjects_progress[0].completed_exercises, 6);
    assert_eq!(student.pending_exercises[0].name, "Heaps");
    assert!(student.recent_results.is_empty());
}

#[tokio::test]
async fn test_export_subject_csv() {
    let server = MockServer::start().await;
    let (client, _store) = signed_in(&server).await;

    let csv = "student_email,total,green,yellow,red,grade\r\nstudent@devtrack.test,5,5,0,0,5.0\r\n";
    Mock::given(method("GET"))
        .and(path("/api/courses/subjects/4/export-csv/"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(csv, "text/csv")
                .insert_header("content-disposition", "attachment; filename=\"ALG-1_consolidado.csv\""),
        )
        .expect(1)
        .mount(&server)
        .await;

    let export = client.export_subject_csv(4).await.unwrap();
    assert_eq!(export.filename.as_deref(), Some("ALG-1_consolidado.csv"));
    assert_eq!(export.content, csv);
}

#[tokio::test]
async fn test_upload_results_csv_reports_row_errors() {
    let server = MockServer::start().await;
    let (client, _store) = signed_in(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/courses/subjects/4/results/upload-csv/"))
        .and(body_string_contains("name=\"file\"; filename=\"notas.csv\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "created": 2,
            "updated": 1,
            "skipped": 0,
            "errors": [{"row": 5, "error": "Estudiante no encontrado: x@devtrack.test"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let csv = "student_email,exercise_name,status\nstudent@devtrack.test,Grafos,verde\n";
    let report = client
        .upload_results_csv(4, "notas.csv", csv.as_bytes().to_vec())
        .await
        .unwrap();
    assert_eq!((report.created, report.updated), (2, 1));
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].row, 5);
}

#[tokio::test]
async fn test_invalid_csv_is_a_bad_request() {
    let server = MockServer::start().await;
    let (client, store) = signed_in(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/courses/subjects/4/enrollments/upload-csv/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "detail": "CSV inválido. Debe tener columnas: email, (opcional) first_name, last_name."
        })))
        .mount(&server)
        .await;

    let result = client
        .upload_enrollments_csv(4, "alumnos.csv", b"nombre\nLuis\n".to_vec())
        .await;
    assert!(matches!(result, Err(ClientError::BadRequest(_))));
    assert!(store.load().unwrap().is_some());
}

#[tokio::test]
async fn test_calendar_events_filter_by_subject() {
    let server = MockServer::start().await;
    let (client, _store) = signed_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/courses/calendar/all_events/"))
        .and(query_param("subject", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "exercise-9",
            "title": "Entrega: Heaps",
            "start": "2026-04-10T23:59:00Z",
            "end": "2026-04-10T23:59:00Z",
            "color": "#f59e0b"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let events = client.calendar_events(Some(4)).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Entrega: Heaps");
    assert_eq!(events[0].color.as_deref(), Some("#f59e0b"));
    assert!(events[0].description.is_none());
}

#[tokio::test]
async fn test_notifications_endpoints() {
    let server = MockServer::start().await;
    let (client, _store) = signed_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/courses/notifications/unread-count/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unread": 3})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/courses/notifications/mark-all-read/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"updated": 3})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/courses/notifications/7/mark-read/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/api/courses/notifications/7/"))
        .and(body_json(json!({"is_read": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "type": "RESULT",
            "title": "Nueva nota",
            "is_read": false,
            "created_at": "2026-03-01T12:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(client.unread_notifications().await.unwrap(), 3);
    client.mark_notification_read(7).await.unwrap();
    let toggled = client.set_notification_read(7, false).await.unwrap();
    assert!(!toggled.is_read);
    assert_eq!(client.mark_all_notifications_read().await.unwrap(), 3);
}

#[tokio::test]
async fn test_messaging_endpoints() {
    let server = MockServer::start().await;
    let (client, _store) = signed_in(&server).await;

    let message = json!({
        "id": 100,
        "conversation": 5,
        "sender": {"id": 42, "email": "student@devtrack.test", "first_name": "Sofía", "last_name": "Ramos", "role": "STUDENT"},
        "content": "Hola profe",
        "is_read": false,
        "created_at": "2026-03-01T12:00:00Z"
    });

    Mock::given(method("GET"))
        .and(path("/api/messaging/messages/"))
        .and(query_param("conversation", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([message.clone()])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/messaging/messages/"))
        .and(body_json(json!({"conversation_id": 5, "content": "Hola profe"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(message))
        .expect(1)
        .mount(&server)
        .await;

    let messages = client.list_messages(5).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender.id, 42);

    let sent = client.send_message(5, "Hola profe").await.unwrap();
    assert_eq!(sent.id, 100);
}

#[tokio::test]
async fn test_contact_form_is_anonymous() {
    let server = MockServer::start().await;
    let (client, _store) = signed_in(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/auth/contact/"))
        .respond_with(|req: &Request| {
            if req.headers.contains_key("authorization") {
                ResponseTemplate::new(400)
            } else {
                ResponseTemplate::new(200).set_body_json(json!({"message": "Mensaje enviado"}))
            }
        })
        .mount(&server)
        .await;

    let response = client
        .send_contact_message(&ContactMessage {
            name: "Sofía Ramos".into(),
            email: "student@devtrack.test".into(),
            subject: "Consulta".into(),
            message: "¿Cuándo abre la inscripción?".into(),
            captcha_token: Some("captcha".into()),
        })
        .await
        .unwrap();
    assert_eq!(response.message, "Mensaje enviado");
}

#[tokio::test]
async fn test_logout_clears_storage() {
    let server = MockServer::start().await;
    let (client, store) = signed_in(&server).await;

    client.logout().unwrap();
    assert!(store.load().unwrap().is_none());
    assert!(!client.vault().is_authenticated());
}
