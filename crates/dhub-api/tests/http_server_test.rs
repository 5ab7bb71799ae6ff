#![allow(clippy::unwrap_used)]
// Integration tests for `HttpResourceServer` using wiremock.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dhub_api::{
    Collection, Error, HttpResourceServer, ListQuery, ResourceServer, TransportConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup(collection: Collection) -> (MockServer, HttpResourceServer) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client =
        HttpResourceServer::with_client(reqwest::Client::new(), &base_url, None, collection)
            .unwrap();
    (server, client)
}

// ── List tests ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_list_sends_filter_and_search() {
    let (server, devices) = setup(Collection::Devices).await;

    Mock::given(method("GET"))
        .and(path("/devices/"))
        .and(query_param("filter", r#"{"type":["Laptop"]}"#))
        .and(query_param("search", "dell"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": 1, "type": "Laptop" }, { "id": 2, "type": "Laptop" }],
            "pagination": { "page": 1, "perPage": 30, "total": 2, "next": null },
            "url": "/devices/"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = ListQuery {
        filter: Some(json!({ "type": ["Laptop"] })),
        search: Some("dell".into()),
        ..ListQuery::default()
    };
    let list = devices.get_list(&query).await.unwrap();

    assert_eq!(list.items.len(), 2);
    assert_eq!(list.pagination.total, Some(2));
    assert_eq!(list.pagination.per_page, Some(30));
    assert!(!list.pagination.has_more());
    assert_eq!(list.url.as_deref(), Some("/devices/"));
}

#[tokio::test]
async fn test_get_list_rejects_unexpected_shape() {
    let (server, devices) = setup(Collection::Devices).await;

    Mock::given(method("GET"))
        .and(path("/devices/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": "nope" })))
        .mount(&server)
        .await;

    let result = devices.get_list(&ListQuery::default()).await;
    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}

// ── Item tests ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_post_lot_child_link() {
    let (server, lots) = setup(Collection::Lots).await;

    Mock::given(method("POST"))
        .and(path("/lots/parent-1/children"))
        .and(query_param("id", "child-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "parent-1", "type": "Lot", "name": "Parent"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let lot = lots
        .post_at("parent-1/children", &json!({}), &[("id", "child-1".to_owned())])
        .await
        .unwrap();
    assert_eq!(lot["name"], "Parent");
}

#[tokio::test]
async fn test_patch_sends_only_body() {
    let (server, notes) = setup(Collection::DeliveryNotes).await;

    Mock::given(method("PATCH"))
        .and(path("/deliverynotes/dn-9"))
        .and(body_json(json!({ "transfer_state": "Accepted" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let body = notes
        .patch(&json!({ "transfer_state": "Accepted" }), "dn-9")
        .await
        .unwrap();
    assert!(body.is_null());
}

#[tokio::test]
async fn test_delete_with_params() {
    let (server, lots) = setup(Collection::Lots).await;

    Mock::given(method("DELETE"))
        .and(path("/lots/l1/devices"))
        .and(query_param("id", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "l1", "devices": [] })))
        .mount(&server)
        .await;

    let lot = lots.delete("l1/devices", &[("id", "4".to_owned())]).await.unwrap();
    assert_eq!(lot["devices"], json!([]));
}

// ── Error mapping ───────────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_maps_to_authentication() {
    let (server, devices) = setup(Collection::Devices).await;

    Mock::given(method("GET"))
        .and(path("/devices/1"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let err = devices.get("1").await.unwrap_err();
    assert!(err.is_auth_expired(), "got: {err:?}");
}

#[tokio::test]
async fn test_server_error_carries_status_and_preview() {
    let (server, devices) = setup(Collection::Devices).await;

    Mock::given(method("POST"))
        .and(path("/devices/"))
        .respond_with(ResponseTemplate::new(422).set_body_string("x".repeat(500)))
        .mount(&server)
        .await;

    let err = devices.post(&json!({ "type": "Laptop" })).await.unwrap_err();
    match err {
        Error::Status { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message.len(), 200);
        }
        other => panic!("expected Status error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_not_found_is_detected() {
    let (server, tags) = setup(Collection::Tags).await;

    Mock::given(method("GET"))
        .and(path("/tags/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = tags.get("missing").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.is_transient());
}

// ── Transport config ────────────────────────────────────────────────

#[tokio::test]
async fn test_token_is_sent_as_basic_auth() {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let transport = TransportConfig {
        timeout: Duration::from_secs(5),
        token: Some("abc123".to_owned().into()),
        accept_invalid_certs: false,
    };
    let devices =
        HttpResourceServer::new(&base_url, Some("db1"), Collection::Devices, &transport).unwrap();

    Mock::given(method("GET"))
        .and(path("/db1/devices/7"))
        .and(header("authorization", "Basic abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 7 })))
        .expect(1)
        .mount(&server)
        .await;

    let device = devices.get("7").await.unwrap();
    assert_eq!(device["id"], 7);
}
