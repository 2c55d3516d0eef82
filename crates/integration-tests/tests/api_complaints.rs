mod common;

use std::time::Duration;

use axum::http::{Method, StatusCode};
use base64::Engine;
use common::{app, app_with_shutdown, frame_data, next_frame};
use serde_json::json;

fn draft(category: &str, location: &str) -> serde_json::Value {
    json!({ "type": category, "location": location, "priority": "high", "description": "Water on the floor" })
}

#[tokio::test]
async fn test_submit_creates_pending_complaint() {
    let app = app();
    let token = app.session("a@college.edu", "student").await;

    let created = app.submit(&token, draft("Plumbing", "Hostel B")).await;
    assert_eq!(created["status"], "pending");
    assert_eq!(created["priority"], "high");
    assert_eq!(created["category"], "Plumbing");
    assert_eq!(created["subject"], "Plumbing at Hostel B");
    assert!(created["attachment"].is_null());
}

#[tokio::test]
async fn test_missing_location_is_validation_error() {
    let app = app();
    let token = app.session("a@college.edu", "student").await;
    let (status, body) = app
        .send(Method::POST, "/api/complaints", Some(&token), Some(draft("Plumbing", " ")))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    assert!(app.repo.is_empty());
}

#[tokio::test]
async fn test_undecodable_attachment_is_encoding_error() {
    let app = app();
    let token = app.session("a@college.edu", "student").await;
    let mut body = draft("Electrical", "Lab 2");
    body["attachment"] = json!({ "file_name": "spark.jpg", "data_base64": "@@not-base64@@" });

    let (status, body) = app.send(Method::POST, "/api/complaints", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "encoding_error");
    assert!(app.repo.is_empty());
}

#[tokio::test]
async fn test_attachment_is_kept_as_url_reference() {
    let app = app();
    let token = app.session("a@college.edu", "student").await;
    let mut body = draft("Electrical", "Lab 2");
    body["attachment"] = json!({
        "file_name": "spark.png",
        "data_base64": base64::engine::general_purpose::STANDARD.encode(b"\x89PNG fake image"),
    });

    let created = app.submit(&token, body).await;
    let attachment = &created["attachment"];
    assert!(attachment["url"].as_str().unwrap().starts_with("/media/"));
    assert_eq!(attachment["content_type"], "image/png");
    assert_eq!(attachment["size_bytes"], 15);
    assert!(attachment.get("data_base64").is_none());
}

#[tokio::test]
async fn test_my_complaints_are_scoped_and_newest_first() {
    let app = app();
    let me = app.session("me@college.edu", "student").await;
    let other = app.session("other@college.edu", "student").await;

    let first = app.submit(&me, draft("Plumbing", "Hostel B")).await;
    app.submit(&other, draft("Library", "Reading room")).await;
    let second = app.submit(&me, draft("Electrical", "Lab 2")).await;

    let (status, list) = app.send(Method::GET, "/api/complaints", Some(&me), None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<_> = list.as_array().unwrap().iter().map(|c| c["id"].clone()).collect();
    assert_eq!(ids, vec![second["id"].clone(), first["id"].clone()]);
}

#[tokio::test]
async fn test_detail_visible_to_owner_and_maintenance_only() {
    let app = app();
    let owner = app.session("own@college.edu", "student").await;
    let stranger = app.session("str@college.edu", "staff").await;
    let fixer = app.session("fix@college.edu", "maintenance").await;

    let created = app.submit(&owner, draft("Plumbing", "Hostel B")).await;
    let uri = format!("/api/complaints/{}", created["id"].as_str().unwrap());

    assert_eq!(app.send(Method::GET, &uri, Some(&owner), None).await.0, StatusCode::OK);
    assert_eq!(app.send(Method::GET, &uri, Some(&fixer), None).await.0, StatusCode::OK);
    assert_eq!(app.send(Method::GET, &uri, Some(&stranger), None).await.0, StatusCode::FORBIDDEN);

    let missing = format!("/api/complaints/{}", uuid::Uuid::new_v4());
    assert_eq!(app.send(Method::GET, &missing, Some(&owner), None).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_lifecycle_over_http() {
    let app = app();
    let student = app.session("s@college.edu", "student").await;
    let fixer = app.session("f@college.edu", "maintenance").await;

    let created = app.submit(&student, draft("Plumbing", "Hostel B")).await;
    let uri = format!("/api/complaints/{}/status", created["id"].as_str().unwrap());

    // Students cannot update.
    let (status, body) = app
        .send(Method::PATCH, &uri, Some(&student), Some(json!({ "status": "in_progress" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    // Pending cannot jump straight to Resolved.
    let (status, body) = app
        .send(Method::PATCH, &uri, Some(&fixer), Some(json!({ "status": "resolved" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_state");

    // Legacy spelling is accepted on input.
    let (status, body) = app
        .send(Method::PATCH, &uri, Some(&fixer), Some(json!({ "status": "In Progress" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "in_progress");
    assert_eq!(body["created_at"], created["created_at"]);
    assert_eq!(body["description"], created["description"]);

    let (status, body) = app
        .send(Method::PATCH, &uri, Some(&fixer), Some(json!({ "status": "completed" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "resolved");

    let (status, _) = app
        .send(Method::PATCH, &uri, Some(&fixer), Some(json!({ "status": "archived" })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let missing = format!("/api/complaints/{}/status", uuid::Uuid::new_v4());
    let (status, _) = app
        .send(Method::PATCH, &missing, Some(&fixer), Some(json!({ "status": "pending" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stream_pushes_initial_snapshot() {
    let app = app();
    let token = app.session("live@college.edu", "student").await;
    let created = app.submit(&token, draft("Plumbing", "Hostel B")).await;

    let mut stream = app.open_stream("/api/complaints/stream", &token).await;
    let frame = next_frame(&mut stream).await.expect("stream open");
    assert!(frame.contains("event: complaints"));
    assert_eq!(frame_data(&frame)[0]["id"], created["id"]);
}

#[tokio::test]
async fn test_open_stream_ends_on_shutdown() {
    let (app, shutdown) = app_with_shutdown();
    let token = app.session("late@college.edu", "student").await;

    let mut stream = app.open_stream("/api/complaints/stream", &token).await;
    assert!(next_frame(&mut stream).await.is_some());

    shutdown.send(true).unwrap();
    assert_eq!(next_frame(&mut stream).await, None);

    drop(stream);
    for _ in 0..50 {
        if app.complaints.feed().listener_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(app.complaints.feed().listener_count(), 0);
}

#[tokio::test]
async fn test_form_labels_are_accepted_as_submitted() {
    let app = app();
    let token = app.session("form@college.edu", "student").await;

    let created = app
        .submit(
            &token,
            json!({ "type": "Plumbing", "priority": "High", "location": "Block A", "description": "Leak" }),
        )
        .await;
    assert_eq!(created["priority"], "high");
    assert_eq!(created["status"], "pending");
    assert!(created["attachment"].is_null());

    let (status, body) = app
        .send(
            Method::POST,
            "/api/complaints",
            Some(&token),
            Some(json!({ "type": "Plumbing", "priority": "Critical", "location": "Block A" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    assert!(body["message"].as_str().unwrap().contains("unknown priority"));
}

#[tokio::test]
async fn test_malformed_input_gets_json_error_body() {
    let app = app();
    let token = app.session("typo@college.edu", "student").await;

    let (status, body) = app.send(Method::GET, "/api/complaints/not-a-uuid", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    assert!(body["message"].is_string());

    let (status, body) = app
        .send(Method::POST, "/api/complaints", Some(&token), Some(json!({ "location": "Block A" })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    assert!(body["message"].as_str().unwrap().contains("category"));
}
