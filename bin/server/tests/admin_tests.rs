mod support;

use axum::http::StatusCode;
use serde_json::{Value, json};
use shelf_gate_authz::{
    ManagedRole, PermissionGrid, PolicyConfig, PolicyStore, Verb, from_policy_document,
};
use support::*;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

async fn mount_bob(app: &TestApp) {
    Mock::given(method("GET"))
        .and(path(format!("{ADMIN_API}/users")))
        .and(query_param("username", "bob"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": "u-bob", "username": "bob"}])),
        )
        .mount(&app.idp)
        .await;
}

fn grants(entries: &Value) -> Vec<(String, String)> {
    entries
        .as_array()
        .expect("entries")
        .iter()
        .filter(|entry| entry["granted"] == json!(true))
        .map(|entry| {
            (
                entry["role"].as_str().unwrap_or_default().to_string(),
                entry["permission"].as_str().unwrap_or_default().to_string(),
            )
        })
        .collect()
}

#[tokio::test]
async fn admin_login_opens_policy_editor() {
    let app = TestApp::new().await;
    let cookie = app.login("admin", &["admin"]).await;

    let response = app.send(get("/policy/editor", Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(text_body(response).await.contains("Permissions"));
}

#[tokio::test]
async fn non_admin_is_refused_policy_editor() {
    let app = TestApp::new().await;
    let cookie = app.login("alice", &["user"]).await;

    let response = app.send(get("/policy/editor", Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        json_body(response).await,
        json!({"error": "Admin access required"})
    );
}

#[tokio::test]
async fn permissions_start_empty() {
    let app = TestApp::new().await;
    let cookie = app.login("admin", &["admin"]).await;

    let response = app.send(get("/api/permissions", Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["books_permissions"].as_array().map(Vec::len), Some(9));
    assert_eq!(body["reviews_permissions"].as_array().map(Vec::len), Some(9));
    assert!(grants(&body["books_permissions"]).is_empty());
}

#[tokio::test]
async fn saved_permissions_are_projected_and_read_back() {
    let app = TestApp::new().await;
    let cookie = app.login("admin", &["admin"]).await;
    let submitted = json!({"permissions": [
        {"role": "user", "permission": "view", "granted": true},
        {"role": "moderator", "permission": "view", "granted": true},
        {"role": "moderator", "permission": "delete", "granted": true},
        {"role": "verified", "permission": "add", "granted": false}
    ]});

    let response = app
        .send(send_json(
            "POST",
            "/api/permissions/books",
            &cookie,
            &submitted,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"success": true}));

    let stored = app
        .policies
        .get("books-policy")
        .await
        .expect("store")
        .expect("policy created");
    let grid = from_policy_document(&stored, &PolicyConfig::default());
    assert!(grid.is_granted(ManagedRole::Moderator, Verb::Delete));
    assert!(!grid.is_granted(ManagedRole::Verified, Verb::Add));

    let response = app.send(get("/api/permissions", Some(&cookie))).await;
    let body = json_body(response).await;
    assert_eq!(
        grants(&body["books_permissions"]),
        vec![
            ("user".to_string(), "view".to_string()),
            ("moderator".to_string(), "view".to_string()),
            ("moderator".to_string(), "delete".to_string()),
        ]
    );
    assert!(grants(&body["reviews_permissions"]).is_empty());
}

#[tokio::test]
async fn saving_twice_replaces_policy() {
    let app = TestApp::new().await;
    let cookie = app.login("admin", &["admin"]).await;

    for granted in [true, false] {
        let submitted = json!({"permissions": [
            {"role": "user", "permission": "add", "granted": granted}
        ]});
        let response = app
            .send(send_json(
                "POST",
                "/api/permissions/reviews",
                &cookie,
                &submitted,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let policies = app.policies.list().await.expect("list");
    assert_eq!(policies.len(), 1);
    assert_eq!(
        from_policy_document(&policies[0], &PolicyConfig::default()),
        PermissionGrid::empty()
    );
}

#[tokio::test]
async fn unknown_resource_is_rejected() {
    let app = TestApp::new().await;
    let cookie = app.login("admin", &["admin"]).await;

    let response = app
        .send(send_json(
            "POST",
            "/api/permissions/authors",
            &cookie,
            &json!({"permissions": []}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["success"], json!(false));
    assert!(app.policies.list().await.expect("list").is_empty());
}

#[tokio::test]
async fn unknown_role_in_grid_is_rejected() {
    let app = TestApp::new().await;
    let cookie = app.login("admin", &["admin"]).await;

    let response = app
        .send(send_json(
            "POST",
            "/api/permissions/books",
            &cookie,
            &json!({"permissions": [
                {"role": "librarian", "permission": "view", "granted": true}
            ]}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn change_role_replaces_mapping() {
    let app = TestApp::new().await;
    let cookie = app.login("admin", &["admin"]).await;
    app.mount_admin_token().await;
    app.mount_client_lookup().await;
    mount_bob(&app).await;
    Mock::given(method("GET"))
        .and(path(format!("{ADMIN_API}/clients/c-1/roles/moderator")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "r-mod", "name": "moderator"})),
        )
        .mount(&app.idp)
        .await;
    let mappings = format!("{ADMIN_API}/users/u-bob/role-mappings/clients/c-1");
    Mock::given(method("GET"))
        .and(path(mappings.as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": "r-user", "name": "user"}])),
        )
        .mount(&app.idp)
        .await;
    Mock::given(method("DELETE"))
        .and(path(mappings.as_str()))
        .and(body_json(json!([{"id": "r-user", "name": "user"}])))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&app.idp)
        .await;
    Mock::given(method("POST"))
        .and(path(mappings.as_str()))
        .and(body_json(json!([{"id": "r-mod", "name": "moderator"}])))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&app.idp)
        .await;

    let response = app
        .send(send_json(
            "POST",
            "/settings/change_role",
            &cookie,
            &json!({"username": "bob", "role": "moderator"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"success": true}));
}

#[tokio::test]
async fn change_role_failure_is_reported() {
    let app = TestApp::new().await;
    let cookie = app.login("admin", &["admin"]).await;
    app.mount_admin_token().await;
    app.mount_client_lookup().await;
    mount_bob(&app).await;
    // The role lookup is not mounted, so the role is unknown.
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&app.idp)
        .await;

    let response = app
        .send(send_json(
            "POST",
            "/settings/change_role",
            &cookie,
            &json!({"username": "bob", "role": "librarian"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["success"], json!(false));
}

#[tokio::test]
async fn delete_role_without_directory_access_fails() {
    let app = TestApp::new().await;
    let cookie = app.login("admin", &["admin"]).await;

    let response = app
        .send(send_json(
            "DELETE",
            "/settings/delete_role",
            &cookie,
            &json!({"username": "bob"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({"success": false, "message": "Failed to change role"})
    );
}

#[tokio::test]
async fn settings_page_lists_directory_users() {
    let app = TestApp::new().await;
    let cookie = app.login("admin", &["admin"]).await;
    app.mount_admin_token().await;
    app.mount_client_lookup().await;
    Mock::given(method("GET"))
        .and(path(format!("{ADMIN_API}/users")))
        .and(query_param("briefRepresentation", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "u-bob", "username": "bob"},
            {"id": "u-carol", "username": "carol"}
        ])))
        .mount(&app.idp)
        .await;
    Mock::given(method("GET"))
        .and(path(format!(
            "{ADMIN_API}/users/u-bob/role-mappings/clients/c-1"
        )))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": "r-mod", "name": "moderator"}])),
        )
        .mount(&app.idp)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{ADMIN_API}/clients/c-1/roles")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "r-mod", "name": "moderator"},
            {"id": "r-user", "name": "user"}
        ])))
        .mount(&app.idp)
        .await;

    let response = app.send(get("/settings", Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let page = text_body(response).await;
    assert!(page.contains(r#"<tr data-username="bob">"#));
    assert!(page.contains(r#"<tr data-username="carol">"#));
    assert!(page.contains("<td>moderator</td>"));
}
