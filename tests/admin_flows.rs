//! Admin sessions and status management through the HTTP surface.

mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn admin_register_issues_a_bearer_session() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/auth/admin/register",
            json!({
                "name": "root",
                "email": "root@example.com",
                "password": "secret-pass",
                "confirm_password": "secret-pass",
            }),
        )
        .await?;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Admin created successfully");
    assert_eq!(body["data"]["admin"]["status"], "pending");
    assert_eq!(body["data"]["authorisation"]["type"], "bearer");
    assert_eq!(body["data"]["authorisation"]["expires_in"], 3600);
    assert!(body["data"]["authorisation"]["token"].is_string());
    assert!(app.provider.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn admin_login_checks_password() -> Result<()> {
    let app = TestApp::new();
    app.admin_token("root", "root@example.com").await?;

    let (status, body) = app
        .post(
            "/auth/admin/login",
            json!({"email": "root@example.com", "password": "wrong-pass"}),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");

    let (status, body) = app
        .post(
            "/auth/admin/login",
            json!({"email": "ROOT@example.com", "password": "secret-pass"}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["admin"]["email"], "root@example.com");

    let (status, _) = app
        .post(
            "/auth/admin/login",
            json!({"email": "nobody@example.com", "password": "secret-pass"}),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn admin_only_routes_require_a_session() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/users", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authenticated request.");

    let (status, _) = app
        .send(Method::GET, "/users", None, Some("not-a-session"))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.admin_token("root", "root@example.com").await?;
    let (status, body) = app.send(Method::GET, "/users", None, Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
    Ok(())
}

#[tokio::test]
async fn logout_revokes_and_refresh_rotates() -> Result<()> {
    let app = TestApp::new();
    let token = app.admin_token("root", "root@example.com").await?;

    let (status, body) = app
        .send(Method::POST, "/auth/admin/refresh", None, Some(&token))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let rotated = body["data"]["authorisation"]["token"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    assert!(!rotated.is_empty());
    assert_ne!(rotated, token);

    let (status, _) = app.send(Method::GET, "/admins", None, Some(&token)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(Method::POST, "/auth/admin/logout", None, Some(&rotated))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully logged out");

    let (status, _) = app.send(Method::GET, "/admins", None, Some(&rotated)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn unknown_status_token_is_rejected_without_a_write() -> Result<()> {
    let app = TestApp::new();
    let token = app.admin_token("root", "root@example.com").await?;
    let id = app.register_user("alice", "alice@example.com").await?;
    let writes = app.store.write_count();

    for body in [json!({"status": "bogus"}), json!({"status": "Active"}), json!({})] {
        let (status, response) = app
            .send(
                Method::POST,
                &format!("/auth/user/{id}/status"),
                Some(body),
                Some(&token),
            )
            .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["message"], "Provided user's status is invalid or missed");
    }

    assert_eq!(app.store.write_count(), writes);
    Ok(())
}

#[tokio::test]
async fn status_changes_are_persisted() -> Result<()> {
    let app = TestApp::new();
    let token = app.admin_token("root", "root@example.com").await?;
    let id = app.register_user("alice", "alice@example.com").await?;

    for next in ["active", "disabled", "pending"] {
        let (status, body) = app
            .send(
                Method::POST,
                &format!("/auth/user/{id}/status"),
                Some(json!({"status": next})),
                Some(&token),
            )
            .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["message"],
            format!("Status for the user with ID {id} set to {next}")
        );

        let (_, body) = app
            .send(Method::GET, &format!("/users/{id}"), None, None)
            .await?;
        assert_eq!(body["data"]["status"], next);
    }

    let (status, _) = app
        .send(
            Method::POST,
            "/auth/user/missing/status",
            Some(json!({"status": "active"})),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn disabled_admin_is_locked_out() -> Result<()> {
    let app = TestApp::new();
    let root = app.admin_token("root", "root@example.com").await?;
    let other = app.admin_token("other", "other@example.com").await?;

    let (_, body) = app.send(Method::GET, "/admins", None, Some(&root)).await?;
    let other_id = body["data"]
        .as_array()
        .and_then(|admins| {
            admins
                .iter()
                .find(|admin| admin["email"] == "other@example.com")
        })
        .and_then(|admin| admin["id"].as_str())
        .unwrap_or_default()
        .to_string();
    assert!(!other_id.is_empty());

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/auth/admin/{other_id}/status"),
            Some(json!({"status": "disabled"})),
            Some(&root),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        format!("Status for the admin with ID {other_id} set to disabled")
    );

    let (status, _) = app.send(Method::GET, "/users", None, Some(&other)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/auth/admin/login",
            json!({"email": "other@example.com", "password": "secret-pass"}),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn admin_crud_round() -> Result<()> {
    let app = TestApp::new();
    let token = app.admin_token("root", "root@example.com").await?;

    let (status, body) = app
        .send(
            Method::POST,
            "/users",
            Some(common::user_body("bob", "bob@example.com")),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap_or_default().to_string();
    assert_eq!(body["message"], format!("User with ID {id} was successfully created"));
    assert_eq!(app.provider.count("register"), 1);

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/users/{id}"),
            Some(json!({"name": "robert", "status": "active"})),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "robert");
    assert_eq!(body["data"]["status"], "pending");

    let (status, body) = app
        .send(Method::DELETE, &format!("/users/{id}"), None, Some(&token))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], format!("User with ID {id} was successfully deleted"));

    let (status, _) = app
        .send(Method::GET, &format!("/users/{id}"), None, None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn version_and_health_are_public() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/version", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let (status, body) = app.send(Method::GET, "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");
    Ok(())
}

#[tokio::test]
async fn non_string_status_is_an_invalid_status() -> Result<()> {
    let app = TestApp::new();
    let token = app.admin_token("root", "root@example.com").await?;
    let id = app.register_user("alice", "alice@example.com").await?;
    let writes = app.store.write_count();

    for value in [json!(5), json!(null), json!(true), json!(["active"]), json!({"value": "active"})] {
        let (status, body) = app
            .send(
                Method::POST,
                &format!("/auth/user/{id}/status"),
                Some(json!({"status": value})),
                Some(&token),
            )
            .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Provided user's status is invalid or missed");
    }

    assert_eq!(app.store.write_count(), writes);
    Ok(())
}

#[tokio::test]
async fn unreadable_status_body_uses_the_error_envelope() -> Result<()> {
    let app = TestApp::new();
    let token = app.admin_token("root", "root@example.com").await?;
    let id = app.register_user("alice", "alice@example.com").await?;
    let writes = app.store.write_count();
    let uri = format!("/auth/user/{id}/status");

    for (content_type, body) in [
        (Some("application/json"), "{\"status\": "),
        (None, "{\"status\": \"active\"}"),
        (Some("application/json"), "\"active\""),
    ] {
        let (status, response) = app
            .send_raw(&uri, content_type, body, Some(&token))
            .await?;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{response}");
        assert_eq!(response["status"], "error");
        assert_eq!(response["code"], 422);
        assert!(response["errors"]["body"][0].is_string());
    }

    assert_eq!(app.store.write_count(), writes);
    Ok(())
}
