//! HTTP API tests driven through the router with `oneshot`

mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use helpers::{setup, setup_with, StubParser};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

fn as_json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

fn as_text(bytes: &[u8]) -> String {
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn submit(app: &Router, url: &str) -> (StatusCode, Value) {
    let (status, body) = send(app, "POST", "/paragliding/api/track", Some(json!({ "url": url }))).await;
    (status, as_json(&body))
}

#[tokio::test]
async fn test_health_endpoint() {
    let ctx = setup().await;
    let app = paragliding_tracker::build_router(ctx.state.clone());

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);

    let json = as_json(&body);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "paragliding-tracker");
    assert_eq!(json["tracks_ingested"], 0);
}

#[tokio::test]
async fn test_api_info_and_redirect() {
    let ctx = setup().await;
    let app = paragliding_tracker::build_router(ctx.state.clone());

    let (status, body) = send(&app, "GET", "/paragliding/api", None).await;
    assert_eq!(status, StatusCode::OK);
    let json = as_json(&body);
    assert!(json["uptime"].as_str().unwrap().starts_with('P'));
    assert_eq!(json["version"], "v1");

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/paragliding").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/paragliding/api");
}

#[tokio::test]
async fn test_submit_conflict_and_lookup() {
    let ctx = setup().await;
    let app = paragliding_tracker::build_router(ctx.state.clone());

    let (status, json) = submit(&app, "http://example.org/track.igc").await;
    assert_eq!(status, StatusCode::CREATED);
    let id = json["id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());

    let (status, json) = submit(&app, "http://example.org/track.igc").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["id"], id.as_str());
    assert_eq!(json["error"]["code"], "CONFLICT");

    let (status, body) = send(&app, "GET", "/paragliding/api/track", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body), json!([id]));

    let (status, body) = send(&app, "GET", &format!("/paragliding/api/track/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    let track = as_json(&body);
    assert_eq!(track["H_date"], "2016-02-19");
    assert_eq!(track["pilot"], "Miguel Angel Gordillo");
    assert_eq!(track["glider"], "RV8");
    assert_eq!(track["glider_id"], "EC-XLL");
    assert_eq!(track["track_src_url"], "http://example.org/track.igc");
    assert!(track["track_length"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_track_field_endpoint() {
    let ctx = setup().await;
    let app = paragliding_tracker::build_router(ctx.state.clone());
    let (_, json) = submit(&app, "http://example.org/track.igc").await;
    let id = json["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "GET", &format!("/paragliding/api/track/{}/pilot", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_text(&body), "Miguel Angel Gordillo");

    let (status, _) = send(&app, "GET", &format!("/paragliding/api/track/{}/colour", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", &format!("/paragliding/api/track/{}/pilot2", id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/paragliding/api/track/999/pilot", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_submit_errors() {
    let ctx = setup().await;
    let app = paragliding_tracker::build_router(ctx.state.clone());

    let (status, json) = submit(&app, "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");

    let (status, _) = submit(&app, "http://example.org/track.kml").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = submit(&app, "http://example.org/broken.igc").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"]["code"], "UPSTREAM_ERROR");

    let (status, _) = send(&app, "GET", "/paragliding/api/track/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

async fn send_raw(app: &Router, uri: &str, content_type: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", content_type)
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, as_json(&bytes))
}

#[tokio::test]
async fn test_malformed_bodies_use_error_shape() {
    let ctx = setup().await;
    let app = paragliding_tracker::build_router(ctx.state.clone());

    for uri in ["/paragliding/api/track", "/paragliding/api/webhook/new_track"] {
        for (content_type, body) in [
            ("application/json", "{not json"),
            ("application/json", "{}"),
            ("application/json", "[1, 2]"),
            ("text/plain", "{\"url\": \"http://example.org/a.igc\"}"),
        ] {
            let (status, json) = send_raw(&app, uri, content_type, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{} {:?}", uri, body);
            assert_eq!(json["error"]["code"], "BAD_REQUEST");
            assert!(json["error"]["message"].as_str().is_some_and(|m| !m.is_empty()));
        }
    }

    assert_eq!(ctx.parser.call_count(), 0);
}

#[tokio::test]
async fn test_ticker_empty_store() {
    let ctx = setup().await;
    let app = paragliding_tracker::build_router(ctx.state.clone());

    for uri in [
        "/paragliding/api/ticker",
        "/paragliding/api/ticker/latest",
        "/paragliding/api/ticker/1000",
    ] {
        let (status, body) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT, "{}", uri);
        assert!(body.is_empty());
    }
}

#[tokio::test]
async fn test_ticker_pages() {
    let ctx = setup().await;
    let app = paragliding_tracker::build_router(ctx.state.clone());

    let mut ids = Vec::new();
    for i in 0..3 {
        let (_, json) = submit(&app, &format!("http://example.org/{}.igc", i)).await;
        ids.push(json["id"].as_str().unwrap().to_string());
    }

    let (status, body) = send(&app, "GET", "/paragliding/api/ticker", None).await;
    assert_eq!(status, StatusCode::OK);
    let page = as_json(&body);
    assert_eq!(page["tracks"], json!(ids));
    assert_eq!(page["t_stop"], page["t_latest"]);
    assert!(page["t_start"].as_i64().unwrap() < page["t_latest"].as_i64().unwrap());

    let (status, body) = send(&app, "GET", "/paragliding/api/ticker/latest", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_text(&body), page["t_latest"].as_i64().unwrap().to_string());

    let latest = page["t_latest"].as_i64().unwrap();
    let (status, body) = send(&app, "GET", &format!("/paragliding/api/ticker/{}", latest), None).await;
    assert_eq!(status, StatusCode::OK);
    let after = as_json(&body);
    assert_eq!(after["tracks"], json!([]));
    assert_eq!(after["t_start"], page["t_start"]);

    let first = page["t_start"].as_i64().unwrap();
    let (_, body) = send(&app, "GET", &format!("/paragliding/api/ticker/{}", first), None).await;
    assert_eq!(as_json(&body)["tracks"], json!(ids[1..].to_vec()));
}

#[tokio::test]
async fn test_ticker_malformed_since() {
    let ctx = setup().await;
    let app = paragliding_tracker::build_router(ctx.state.clone());
    submit(&app, "http://example.org/track.igc").await;

    let (status, json) = send(&app, "GET", "/paragliding/api/ticker/yesterday", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(as_json(&json)["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_ticker_page_size_cap() {
    let ctx = setup_with(StubParser::new(), Some(2)).await;
    let app = paragliding_tracker::build_router(ctx.state.clone());

    let mut ids = Vec::new();
    for i in 0..5 {
        let (_, json) = submit(&app, &format!("http://example.org/{}.igc", i)).await;
        ids.push(json["id"].as_str().unwrap().to_string());
    }

    let mut seen: Vec<String> = Vec::new();
    let mut uri = "/paragliding/api/ticker".to_string();
    loop {
        let (status, body) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let page = as_json(&body);
        let tracks: Vec<String> = serde_json::from_value(page["tracks"].clone()).unwrap();
        if tracks.is_empty() {
            break;
        }
        assert!(tracks.len() <= 2);
        seen.extend(tracks);
        uri = format!("/paragliding/api/ticker/{}", page["t_stop"].as_i64().unwrap());
    }

    assert_eq!(seen, ids);
}

#[tokio::test]
async fn test_webhook_lifecycle() {
    let ctx = setup().await;
    let app = paragliding_tracker::build_router(ctx.state.clone());

    let (status, body) = send(
        &app,
        "POST",
        "/paragliding/api/webhook/new_track",
        Some(json!({ "webhookURL": "http://127.0.0.1:9/hook", "minTriggerValue": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = as_json(&body)["id"].as_str().unwrap().to_string();

    let uri = format!("/paragliding/api/webhook/new_track/{}", id);
    let (status, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let hook = as_json(&body);
    assert_eq!(hook["webhookURL"], "http://127.0.0.1:9/hook");
    assert_eq!(hook["minTriggerValue"], 1);

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/paragliding/api/webhook/new_track",
        Some(json!({ "webhookURL": "not a url" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_count_and_delete_all() {
    let ctx = setup().await;
    let app = paragliding_tracker::build_router(ctx.state.clone());

    submit(&app, "http://example.org/a.igc").await;
    submit(&app, "http://example.org/b.igc").await;

    let (status, body) = send(&app, "GET", "/paragliding/admin/api/tracks_count", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_text(&body), "2");

    let (status, body) = send(&app, "DELETE", "/paragliding/admin/api/tracks", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_text(&body), "2");

    let (_, body) = send(&app, "GET", "/paragliding/admin/api/tracks_count", None).await;
    assert_eq!(as_text(&body), "0");

    let (status, _) = send(&app, "GET", "/paragliding/api/ticker", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(as_json(&body)["tracks_ingested"], 0);
}
