mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{body_to_json, body_to_vec, sample_docx, TestApp, DOCX_MIME};
use doctrail::models::Role;
use serde_json::{json, Value};
use uuid::Uuid;

async fn upload_pending(app: &TestApp, doc_number: &str, prepared_by: Uuid) -> Result<Value> {
    let docx = sample_docx(&["Heading", "Body text", "Footer note"]);
    let response = app
        .upload(
            "/api/documents",
            "draft.docx",
            DOCX_MIME,
            &docx,
            &[
                ("docName", "Draft Procedure".to_string()),
                ("docNumber", doc_number.to_string()),
                ("preparedBy", prepared_by.to_string()),
            ],
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_to_json(response.into_body()).await
}

#[tokio::test]
async fn upload_validation_rejects_bad_requests() -> Result<()> {
    let app = TestApp::new().await?;
    let creator = app.insert_user("creator@example.com", Role::Creator).await?;
    let docx = sample_docx(&["Body"]);

    // wrong MIME type
    let response = app
        .upload(
            "/api/documents",
            "file.pdf",
            "application/pdf",
            &docx,
            &[
                ("docName", "X".to_string()),
                ("docNumber", "N-1".to_string()),
                ("preparedBy", creator.id.to_string()),
            ],
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // missing metadata
    let response = app
        .upload("/api/documents", "file.docx", DOCX_MIME, &docx, &[])
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // unknown preparer
    let response = app
        .upload(
            "/api/documents",
            "file.docx",
            DOCX_MIME,
            &docx,
            &[
                ("docName", "X".to_string()),
                ("docNumber", "N-1".to_string()),
                ("preparedBy", Uuid::new_v4().to_string()),
            ],
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // duplicate (docNumber, revisionNo)
    upload_pending(&app, "N-2", creator.id).await?;
    let response = app
        .upload(
            "/api/documents",
            "file.docx",
            DOCX_MIME,
            &docx,
            &[
                ("docName", "X".to_string()),
                ("docNumber", "N-2".to_string()),
                ("preparedBy", creator.id.to_string()),
            ],
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn listing_requires_a_filter_and_enriches_rows() -> Result<()> {
    let app = TestApp::new().await?;
    let creator = app.insert_user("casey.writer@example.com", Role::Creator).await?;
    upload_pending(&app, "N-10", creator.id).await?;

    let response = app.get("/api/documents").await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.get("/api/documents?status=pending").await?;
    assert_eq!(response.status(), StatusCode::OK);
    let docs = body_to_json(response.into_body()).await?;
    let docs = docs.as_array().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["preparerName"], "casey writer");
    assert!(docs[0]["departments"].as_array().unwrap().is_empty());

    let response = app
        .get(&format!("/api/documents?userId={}", creator.id))
        .await?;
    let docs = body_to_json(response.into_body()).await?;
    assert_eq!(docs.as_array().unwrap().len(), 1);

    let response = app.get("/api/documents?status=issued").await?;
    let docs = body_to_json(response.into_body()).await?;
    assert!(docs.as_array().unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn due_for_review_window_and_ordering() -> Result<()> {
    let app = TestApp::new().await?;
    let creator = app.insert_user("creator@example.com", Role::Creator).await?;
    let approver = app.insert_user("approver@example.com", Role::Approver).await?;
    let issuer = app.insert_user("issuer@example.com", Role::Issuer).await?;

    let docx = sample_docx(&["Reviewable content"]);
    let response = app
        .upload(
            "/api/documents",
            "review.docx",
            DOCX_MIME,
            &docx,
            &[
                ("docName", "Annual Review".to_string()),
                ("docNumber", "N-20".to_string()),
                ("preparedBy", creator.id.to_string()),
                ("duePeriodYears", "1".to_string()),
            ],
        )
        .await?;
    let document = body_to_json(response.into_body()).await?;
    let id = document["id"].as_str().unwrap();

    app.post_json(
        &format!("/api/documents/{id}/approve"),
        &json!({ "approvalRemarks": "ok", "approvedBy": approver.id }),
    )
    .await?;
    app.post_json(
        &format!("/api/documents/{id}/issue"),
        &json!({ "issuedBy": issuer.id, "issuerName": "Issuer" }),
    )
    .await?;

    // a year out: invisible in the default 30-day window
    let response = app.get("/api/documents/due-for-review").await?;
    assert_eq!(response.status(), StatusCode::OK);
    let due = body_to_json(response.into_body()).await?;
    assert!(due.as_array().unwrap().is_empty());

    let response = app.get("/api/documents/due-for-review?daysAhead=400").await?;
    let due = body_to_json(response.into_body()).await?;
    let due = due.as_array().unwrap();
    assert_eq!(due.len(), 1);
    let days = due[0]["daysUntilDue"].as_i64().unwrap();
    assert!((360..=370).contains(&days), "unexpected daysUntilDue {days}");

    let response = app.get("/api/documents/due-for-review?daysAhead=-1").await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn raw_view_is_gated_away_from_recipients() -> Result<()> {
    let app = TestApp::new().await?;
    let creator = app.insert_user("creator@example.com", Role::Creator).await?;
    let viewer = app.insert_user("viewer@example.com", Role::Recipient).await?;
    let document = upload_pending(&app, "N-30", creator.id).await?;
    let id = document["id"].as_str().unwrap();

    let response = app
        .get(&format!("/api/documents/{id}/view?userId={}", creator.id))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let view = body_to_json(response.into_body()).await?;
    assert_eq!(view["docNumber"], "N-30");
    assert_eq!(
        view["paragraphs"],
        json!(["Heading", "Body text", "Footer note"])
    );

    let response = app
        .get(&format!("/api/documents/{id}/view?userId={}", viewer.id))
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // viewing leaves no control-copy trail
    let document_id: Uuid = id.parse()?;
    assert!(app
        .state
        .store
        .control_copies_by_document(document_id)
        .await
        .is_empty());

    Ok(())
}

#[tokio::test]
async fn source_download_round_trips_the_upload() -> Result<()> {
    let app = TestApp::new().await?;
    let creator = app.insert_user("creator@example.com", Role::Creator).await?;
    let docx = sample_docx(&["Download me"]);
    let response = app
        .upload(
            "/api/documents",
            "original name.docx",
            DOCX_MIME,
            &docx,
            &[
                ("docName", "Download".to_string()),
                ("docNumber", "N-40".to_string()),
                ("preparedBy", creator.id.to_string()),
            ],
        )
        .await?;
    let document = body_to_json(response.into_body()).await?;
    let id = document["id"].as_str().unwrap();

    let response = app.get(&format!("/api/documents/{id}/download")).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()?
        .to_string();
    assert!(disposition.contains("attachment"));
    assert!(disposition.contains("original name.docx"));
    let bytes = body_to_vec(response.into_body()).await?;
    assert_eq!(bytes, docx);

    Ok(())
}

#[tokio::test]
async fn login_checks_credentials() -> Result<()> {
    let app = TestApp::new().await?;
    let user = app.insert_user("login@example.com", Role::Creator).await?;

    let response = app
        .post_json(
            "/api/login",
            &json!({ "username": "login@example.com", "password": "password" }),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["id"], user.id.to_string());
    assert_eq!(body["role"], "creator");
    assert!(body.get("password").is_none());

    let response = app
        .post_json(
            "/api/login",
            &json!({ "username": "login@example.com", "password": "wrong" }),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .post_json("/api/login", &json!({ "username": "login@example.com" }))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn user_and_department_admin_flows() -> Result<()> {
    let app = TestApp::new().await?;

    let response = app
        .post_json(
            "/api/users",
            &json!({
                "username": "new.approver@example.com",
                "password": "secret",
                "role": "approver",
                "fullName": "New Approver",
            }),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_to_json(response.into_body()).await?;
    assert!(created.get("password").is_none());
    let approver_id = created["id"].as_str().unwrap().to_string();

    let response = app.get("/api/users?role=approver").await?;
    let listed = body_to_json(response.into_body()).await?;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let response = app.get("/api/users").await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // an unreferenced user deletes cleanly
    let response = app.delete(&format!("/api/users/{approver_id}")).await?;
    assert_eq!(response.status(), StatusCode::OK);

    // a referenced user does not
    let creator = app.insert_user("creator@example.com", Role::Creator).await?;
    upload_pending(&app, "N-50", creator.id).await?;
    let response = app.delete(&format!("/api/users/{}", creator.id)).await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // departments: unique, deletable with cascading associations
    let response = app
        .post_json("/api/departments", &json!({ "name": "Quality", "code": "QA" }))
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let department = body_to_json(response.into_body()).await?;
    let department_id = department["id"].as_str().unwrap().to_string();

    let response = app
        .post_json("/api/departments", &json!({ "name": "Quality", "code": "Q2" }))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.delete(&format!("/api/departments/{department_id}")).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.get("/api/departments").await?;
    let departments = body_to_json(response.into_body()).await?;
    assert!(departments.as_array().unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn notifications_can_be_marked_read() -> Result<()> {
    let app = TestApp::new().await?;
    let creator = app.insert_user("creator@example.com", Role::Creator).await?;
    let approver = app.insert_user("approver@example.com", Role::Approver).await?;
    upload_pending(&app, "N-60", creator.id).await?;

    let response = app.get(&format!("/api/notifications/{}", approver.id)).await?;
    let notifications = body_to_json(response.into_body()).await?;
    let notification = &notifications.as_array().unwrap()[0];
    assert_eq!(notification["isRead"], false);
    let notification_id = notification["id"].as_str().unwrap();

    let response = app
        .post_json(&format!("/api/notifications/{notification_id}/read"), &json!({}))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get(&format!("/api/notifications/{}", approver.id)).await?;
    let notifications = body_to_json(response.into_body()).await?;
    assert_eq!(notifications.as_array().unwrap()[0]["isRead"], true);

    let response = app
        .post_json(&format!("/api/notifications/{}/read", Uuid::new_v4()), &json!({}))
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn admin_views_aggregate_the_store() -> Result<()> {
    let app = TestApp::new().await?;
    let creator = app.insert_user("creator@example.com", Role::Creator).await?;
    app.insert_user("approver@example.com", Role::Approver).await?;
    upload_pending(&app, "N-70", creator.id).await?;
    upload_pending(&app, "N-71", creator.id).await?;

    let response = app.get("/api/admin/users").await?;
    assert_eq!(response.status(), StatusCode::OK);
    let directory = body_to_json(response.into_body()).await?;
    assert_eq!(directory["total"], 2);
    assert_eq!(directory["creators"].as_array().unwrap().len(), 1);

    let response = app.get("/api/admin/documents").await?;
    let overview = body_to_json(response.into_body()).await?;
    assert_eq!(overview["stats"]["total"], 2);
    assert_eq!(overview["stats"]["pending"], 2);

    let response = app.get("/api/admin/stats").await?;
    let stats = body_to_json(response.into_body()).await?;
    assert_eq!(stats["documents"]["total"], 2);
    assert_eq!(stats["documents"]["recentCount"], 2);
    assert_eq!(stats["weeklyActivity"].as_array().unwrap().len(), 7);
    assert_eq!(stats["recentDocuments"].as_array().unwrap().len(), 2);

    let response = app.get("/api/health").await?;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}
