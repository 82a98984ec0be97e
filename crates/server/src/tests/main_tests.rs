use super::*;
use axum::{
    body::{self, Body},
    http::{header, Request, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use shared::protocol::NewTemplate;
use tower::ServiceExt;

use crate::app_state::Credentials;

async fn test_app() -> (Router, Storage) {
    test_app_with(None).await
}

async fn test_app_with(credentials: Option<Credentials>) -> (Router, Storage) {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let state = AppState {
        api: ApiContext::new(storage.clone()),
        credentials,
    };
    (build_router(Arc::new(state)), storage)
}

async fn seed_template(storage: &Storage, name: &str) -> i64 {
    storage
        .create_template(&NewTemplate {
            name: name.into(),
            subject: "Hello".into(),
            ..NewTemplate::default()
        })
        .await
        .expect("insert")
        .expect("template")
        .id
        .0
}

async fn json_body(response: Response<Body>) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn json_post(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn json_put(uri: &str, body: Value) -> Request<Body> {
    Request::put(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn empty(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn healthz_reports_ok_when_storage_is_ready() {
    let (app, _storage) = test_app().await;
    let response = app.oneshot(empty("GET", "/healthz")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn spring_sale_is_created_then_fetched() {
    let (app, storage) = test_app().await;
    seed_template(&storage, "promo-basic").await;

    let response = app
        .clone()
        .oneshot(form_post(
            "/api/campaigns",
            "name=Spring+Sale&template_name=promo-basic",
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::OK);
    let created = json_body(response).await;
    assert_eq!(created["status"], 200);
    let id = created["campaign"].as_i64().expect("id");

    let response = app
        .oneshot(empty("GET", &format!("/api/campaigns/{id}")))
        .await
        .expect("show");
    assert_eq!(response.status(), StatusCode::OK);
    let campaign = json_body(response).await;
    assert_eq!(campaign["name"], "Spring Sale");
    assert_eq!(campaign["template_name"], "promo-basic");
}

#[tokio::test]
async fn unknown_template_answers_412() {
    let (app, _storage) = test_app().await;
    let response = app
        .oneshot(form_post(
            "/api/campaigns",
            "name=Ghost&template_name=does-not-exist",
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    assert_eq!(
        json_body(response).await,
        json!({ "status": 412, "campaign": ["The specified resource could not be created."] })
    );
}

#[tokio::test]
async fn invalid_form_answers_400_with_field_errors() {
    let (app, _storage) = test_app().await;
    let long_name = "x".repeat(192);
    let response = app
        .oneshot(form_post(
            "/api/campaigns",
            &format!("name={long_name}&template_name="),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({
            "message": "Invalid parameters, please try again",
            "errors": {
                "name": "The name must not exceed 191 characters.",
                "template_name": "This field is required"
            }
        })
    );
}

#[tokio::test]
async fn missing_campaign_answers_404() {
    let (app, _storage) = test_app().await;
    let response = app
        .oneshot(empty("GET", "/api/campaigns/99"))
        .await
        .expect("show");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await,
        json!({ "status": 404, "message": "The specified resource does not exist." })
    );
}

#[tokio::test]
async fn delete_campaign_twice_answers_200_then_422() {
    let (app, storage) = test_app().await;
    seed_template(&storage, "promo-basic").await;
    let campaign = storage
        .insert_campaign("Spring Sale", "promo-basic")
        .await
        .expect("insert")
        .expect("campaign");
    let uri = format!("/api/campaigns/{}", campaign.id);

    let response = app
        .clone()
        .oneshot(empty("DELETE", &uri))
        .await
        .expect("delete");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "status": 200, "message": "The specified resource has been deleted." })
    );

    let response = app.oneshot(empty("DELETE", &uri)).await.expect("again");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        json_body(response).await,
        json!({ "status": 422, "campaign": ["The specified resource could not be deleted."] })
    );
}

#[tokio::test]
async fn update_is_not_implemented() {
    let (app, _storage) = test_app().await;
    let response = app
        .oneshot(empty("PUT", "/api/campaigns/1"))
        .await
        .expect("update");
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn campaign_listing_shape_follows_paginate_flag() {
    let (app, storage) = test_app().await;
    seed_template(&storage, "promo-basic").await;
    for i in 0..3 {
        storage
            .insert_campaign(&format!("c{i}"), "promo-basic")
            .await
            .expect("insert")
            .expect("campaign");
    }

    let response = app
        .clone()
        .oneshot(empty("GET", "/api/campaigns"))
        .await
        .expect("list");
    let all = json_body(response).await;
    assert_eq!(all.as_array().map(Vec::len), Some(3));

    let response = app
        .oneshot(empty("GET", "/api/campaigns?paginate&page_size=2"))
        .await
        .expect("page");
    let page = json_body(response).await;
    assert_eq!(page["collection"].as_array().map(Vec::len), Some(2));
    assert!(page["next_token"].is_string());
}

#[tokio::test]
async fn twenty_five_templates_page_over_http() {
    let (app, storage) = test_app().await;
    for i in 0..25 {
        seed_template(&storage, &format!("t{i:02}")).await;
    }

    let mut sizes = Vec::new();
    let mut uri = "/api/templates?page_size=10".to_string();
    loop {
        let response = app
            .clone()
            .oneshot(empty("GET", &uri))
            .await
            .expect("page");
        assert_eq!(response.status(), StatusCode::OK);
        let page = json_body(response).await;
        sizes.push(page["collection"].as_array().map(Vec::len).unwrap_or(0));
        match page["next_token"].as_str() {
            Some(token) => uri = format!("/api/templates?page_size=10&next_token={token}"),
            None => break,
        }
    }
    assert_eq!(sizes, [10, 10, 5]);
}

#[tokio::test]
async fn invalid_template_token_answers_400() {
    let (app, _storage) = test_app().await;
    let response = app
        .oneshot(empty("GET", "/api/templates?next_token=not-a-token"))
        .await
        .expect("list");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["status"], 400);
}

#[tokio::test]
async fn template_create_and_duplicate() {
    let (app, _storage) = test_app().await;
    let body = json!({ "name": "welcome", "subject": "Welcome!", "text_part": "hi" });

    let response = app
        .clone()
        .oneshot(json_post("/api/templates", body.clone()))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await["name"], "welcome");

    let response = app
        .oneshot(json_post("/api/templates", body))
        .await
        .expect("duplicate");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        json_body(response).await["message"],
        "Template with that name already exists"
    );
}

#[tokio::test]
async fn template_update_over_http() {
    let (app, storage) = test_app().await;
    let template_id = seed_template(&storage, "promo-basic").await;
    seed_template(&storage, "promo-plus").await;
    let uri = format!("/api/templates/{template_id}");

    let response = app
        .clone()
        .oneshot(json_put(&uri, json!({ "name": "promo-basic", "subject": "Fresh" })))
        .await
        .expect("same name");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["subject"], "Fresh");

    let response = app
        .clone()
        .oneshot(json_put(&uri, json!({ "name": "promo-plus", "subject": "Fresh" })))
        .await
        .expect("collision");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        json_body(response).await,
        json!({ "status": 422, "message": "Template with that name already exists" })
    );

    let response = app
        .clone()
        .oneshot(json_put(&uri, json!({ "name": "", "subject": "Fresh" })))
        .await
        .expect("invalid");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    storage
        .insert_campaign("Spring Sale", "promo-basic")
        .await
        .expect("insert")
        .expect("campaign");
    let response = app
        .oneshot(json_put(&uri, json!({ "name": "promo-new", "subject": "Fresh" })))
        .await
        .expect("rename in use");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn template_lookup_by_name() {
    let (app, storage) = test_app().await;
    let template_id = seed_template(&storage, "promo-basic").await;

    let response = app
        .clone()
        .oneshot(empty("GET", "/api/templates/by-name/promo-basic"))
        .await
        .expect("found");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["id"], template_id);

    let response = app
        .oneshot(empty("GET", "/api/templates/by-name/nope"))
        .await
        .expect("missing");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn referenced_template_delete_answers_409() {
    let (app, storage) = test_app().await;
    let template_id = seed_template(&storage, "promo-basic").await;
    storage
        .insert_campaign("Spring Sale", "promo-basic")
        .await
        .expect("insert")
        .expect("campaign");

    let response = app
        .clone()
        .oneshot(empty("DELETE", &format!("/api/templates/{template_id}")))
        .await
        .expect("delete");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(empty("GET", &format!("/api/templates/{template_id}")))
        .await
        .expect("show");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn list_delete_cascades_over_http() {
    let (app, storage) = test_app().await;
    seed_template(&storage, "promo-basic").await;
    let campaign = storage
        .insert_campaign("Spring Sale", "promo-basic")
        .await
        .expect("insert")
        .expect("campaign");

    let response = app
        .clone()
        .oneshot(json_post("/api/lists", json!({ "name": "vip" })))
        .await
        .expect("create list");
    assert_eq!(response.status(), StatusCode::CREATED);
    let list_id = json_body(response).await["id"].as_i64().expect("list id");

    let attach = format!("/api/campaigns/{}/lists/{list_id}", campaign.id);
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(empty("PUT", &attach))
            .await
            .expect("attach");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let response = app
        .clone()
        .oneshot(empty("DELETE", &format!("/api/lists/{list_id}")))
        .await
        .expect("delete list");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["campaign_links"], 1);

    let response = app
        .oneshot(empty("GET", &format!("/api/campaigns/{}/lists", campaign.id)))
        .await
        .expect("lists");
    assert_eq!(json_body(response).await, json!([]));
}

#[tokio::test]
async fn subscriber_rules_and_subscription() {
    let (app, _storage) = test_app().await;
    let response = app
        .clone()
        .oneshot(json_post(
            "/api/subscribers",
            json!({ "name": "Ana", "email": "not-an-email" }),
        ))
        .await
        .expect("invalid");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(json_post(
            "/api/subscribers",
            json!({ "name": "Ana", "email": "ana@example.com" }),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);
    let subscriber_id = json_body(response).await["id"].as_i64().expect("id");

    let response = app
        .clone()
        .oneshot(empty(
            "PUT",
            &format!("/api/lists/77/subscribers/{subscriber_id}"),
        ))
        .await
        .expect("subscribe");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn basic_auth_guards_api_but_not_healthz() {
    let (app, _storage) = test_app_with(Some(Credentials {
        user: "admin".into(),
        password: "secret".into(),
    }))
    .await;

    let response = app
        .clone()
        .oneshot(empty("GET", "/api/templates"))
        .await
        .expect("anonymous");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));

    let authorized = Request::get("/api/templates")
        .header(
            header::AUTHORIZATION,
            format!("Basic {}", STANDARD.encode("admin:secret")),
        )
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(authorized).await.expect("authorized");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(empty("GET", "/healthz")).await.expect("health");
    assert_eq!(response.status(), StatusCode::OK);
}
