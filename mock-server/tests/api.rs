use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::app;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .header("x-api-key", "P-test")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", "P-test")
        .body(String::new())
        .unwrap()
}

// --- auth ---

#[tokio::test]
async fn missing_api_key_returns_401() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/v1/object/order/abc")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- create ---

#[tokio::test]
async fn create_object_returns_201_with_guid() {
    let resp = app()
        .oneshot(json_request("POST", "/v1/object/order", r#"{"data":{"title":"Buy milk"}}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "CREATED");
    assert_eq!(body["data"]["table_slug"], "order");
    let object = &body["data"]["data"]["response"];
    assert_eq!(object["title"], "Buy milk");
    assert!(object["guid"].as_str().is_some_and(|g| !g.is_empty()));
}

#[tokio::test]
async fn create_object_malformed_json_returns_4xx() {
    let resp = app()
        .oneshot(json_request("POST", "/v1/object/order", r#"{"data":"#))
        .await
        .unwrap();

    assert!(resp.status().is_client_error());
}

// --- get ---

#[tokio::test]
async fn get_single_not_found() {
    let resp = app().oneshot(empty_request("GET", "/v1/object/order/missing")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- update ---

#[tokio::test]
async fn update_without_guid_returns_400() {
    let resp = app()
        .oneshot(json_request("PUT", "/v1/object/order", r#"{"data":{"title":"Nope"}}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_unknown_guid_returns_404() {
    let resp = app()
        .oneshot(json_request("PUT", "/v1/object/order", r#"{"data":{"guid":"missing"}}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- delete ---

#[tokio::test]
async fn delete_not_found() {
    let resp = app().oneshot(empty_request("DELETE", "/v1/object/order/missing")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- aggregation ---

#[tokio::test]
async fn aggregation_rejects_unknown_stage() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/v1/object/get-list-aggregation/order",
            r#"{"data":{"pipelines":[{"$group":{"_id":"$status"}}]}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- full lifecycle ---

#[tokio::test]
async fn object_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create two orders
    let mut guids = Vec::new();
    for (title, status) in [("First", "new"), ("Second", "done")] {
        let body = json!({"data": {"title": title, "status": status}}).to_string();
        let resp = ServiceExt::ready(&mut app)
            .await
            .unwrap()
            .call(json_request("POST", "/v1/object/order", &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = body_json(resp).await;
        guids.push(created["data"]["data"]["response"]["guid"].as_str().unwrap().to_string());
    }

    // filtered list
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/v1/object/get-list/order",
            r#"{"data":{"status":"new","limit":10,"page":1}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let list = body_json(resp).await;
    assert_eq!(list["data"]["data"]["count"], 1);
    assert_eq!(list["data"]["data"]["response"][0]["title"], "First");

    // slim list, second page of one
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/v1/object-slim/get-list/order?data=%7B%7D&limit=1&page=2"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let list = body_json(resp).await;
    assert_eq!(list["data"]["data"]["count"], 2);
    assert_eq!(list["data"]["data"]["response"][0]["title"], "Second");

    // relate the first order to two products, then slim read hides the link
    let relation = json!({"table_from": "order", "table_to": "product", "id_from": guids[0], "id_to": ["p1", "p2"]});
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("PUT", "/v1/many-to-many", &relation.to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let linked = body_json(resp).await;
    assert_eq!(linked["data"]["data"]["response"]["product_ids"], json!(["p1", "p2"]));

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", &format!("/v1/object-slim/order/{}", guids[0])))
        .await
        .unwrap();
    let slim = body_json(resp).await;
    assert!(slim["data"]["data"]["response"].get("product_ids").is_none());

    // unlink everything with an empty id_to
    let relation = json!({"table_from": "order", "table_to": "product", "id_from": guids[0], "id_to": []});
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("DELETE", "/v1/many-to-many", &relation.to_string()))
        .await
        .unwrap();
    let unlinked = body_json(resp).await;
    assert_eq!(unlinked["data"]["data"]["response"]["product_ids"], json!([]));

    // delete with triggers bypassed
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", &format!("/v1/object/order/{}?from-ofs=true", guids[1])))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // two creates and two relation edits fired triggers; the delete did not
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(Request::builder().uri("/debug/triggers").body(String::new()).unwrap())
        .await
        .unwrap();
    let triggers = body_json(resp).await;
    assert_eq!(triggers["triggers_fired"], 4);
}
