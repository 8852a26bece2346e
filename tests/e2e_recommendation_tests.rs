//! End-to-end tests for the recommendations endpoint
//!
//! Tests the full pipeline over HTTP: candidate generation from seeded
//! engagement, gateway probing and catalog backfill, eligibility rules,
//! scoring order, and graceful degradation.

mod common;

use common::{TestClient, TestGateway, TestServer};
use mixwheel_server::catalog::{TrackCatalog, TrackMetadata};
use mixwheel_server::interactions::{InteractionEvent, InteractionStore, NewInteraction};
use reqwest::StatusCode;
use std::sync::Arc;

fn seed_track_metadata(id: &str, artist: &str, title: &str) -> TrackMetadata {
    TrackMetadata {
        id: id.to_string(),
        title: title.to_string(),
        artist: artist.to_string(),
        duration_sec: 240,
        view_count: 50_000,
        ..Default::default()
    }
}

/// A server where user "u1" has liked one known Caribou track and the
/// gateway knows a handful of other Caribou tracks.
async fn seeded_server() -> TestServer {
    let mut short = TestGateway::track("caribou-short", "Caribou", "Odessa teaser");
    short.duration_sec = 30;
    let mut live = TestGateway::track("caribou-live", "Caribou", "Odessa live set");
    live.is_live = true;

    let gateway = Arc::new(TestGateway::new(vec![
        TestGateway::track("caribou-2", "Caribou", "Sun"),
        TestGateway::track("caribou-3", "Caribou", "Can't Do Without You"),
        short,
        live,
    ]));
    let server = TestServer::spawn_with_gateway(gateway).await;

    server
        .catalog
        .upsert_track(seed_track_metadata("t-seed", "Caribou", "Odessa"))
        .unwrap();
    server
        .interactions
        .append(NewInteraction::new("u1", "t-seed", InteractionEvent::Like))
        .unwrap();
    server.engine.rebuild_vocabulary().unwrap();
    server
}

#[tokio::test]
async fn test_empty_system_degrades_gracefully() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.recommendations("nobody", "limit=5").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["results"].as_array().unwrap().len(), 0);
    assert_eq!(body["metadata"]["reason"], "no_candidates");
    assert_eq!(body["metadata"]["candidatesGenerated"], 0);
}

#[tokio::test]
async fn test_missing_user_header_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.recommendations_without_user().await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_seeded_user_gets_related_tracks() {
    let server = seeded_server().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .recommendations("u1", "limit=10&exploration=false&diversification=false")
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.unwrap();
    let results = body["results"].as_array().unwrap();
    assert!(!results.is_empty());

    let ids: Vec<&str> = results.iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert!(ids.contains(&"caribou-2"));
    assert!(ids.contains(&"caribou-3"));
    // Too short and live streams never pass eligibility.
    assert!(!ids.contains(&"caribou-short"));
    assert!(!ids.contains(&"caribou-live"));

    assert!(body["metadata"]["candidatesGenerated"].as_u64().unwrap() > 0);
    assert!(body["metadata"]["reason"].is_null());

    // u1 had no stored profile, so this first call rebuilt it in-line and
    // the rebuild timestamp travels back in the metadata.
    assert!(body["metadata"]["userProfileLastUpdated"].is_string());
}

#[tokio::test]
async fn test_probed_tracks_backfill_the_catalog() {
    let server = seeded_server().await;
    let client = TestClient::new(server.base_url.clone());

    assert!(server.catalog.get_track("caribou-2").unwrap().is_none());
    client
        .recommendations("u1", "limit=10&exploration=false")
        .await;

    // The successful probe was persisted, the failed rules still keep the
    // track out of results but it is in the catalog now too.
    assert!(server.catalog.get_track("caribou-2").unwrap().is_some());
    assert!(server.catalog.get_track("caribou-short").unwrap().is_some());
}

#[tokio::test]
async fn test_results_are_sorted_by_score_without_exploration() {
    let server = seeded_server().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .recommendations("u1", "limit=10&exploration=false&diversification=false")
        .await;
    let body: serde_json::Value = response.json().await.unwrap();
    let scores: Vec<f64> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["score"].as_f64().unwrap())
        .collect();
    assert!(scores.windows(2).all(|pair| pair[0] >= pair[1]));
}

#[tokio::test]
async fn test_verified_only_filters_unverified() {
    let mut verified = TestGateway::track("verified-1", "Caribou", "Sun");
    verified.verified = true;
    let unverified = TestGateway::track("unverified-1", "Caribou", "Bowls");

    let gateway = Arc::new(TestGateway::new(vec![verified, unverified]));
    let server = TestServer::spawn_with_gateway(gateway).await;
    server
        .catalog
        .upsert_track(seed_track_metadata("t-seed", "Caribou", "Odessa"))
        .unwrap();
    server
        .interactions
        .append(NewInteraction::new("u1", "t-seed", InteractionEvent::Like))
        .unwrap();

    let client = TestClient::new(server.base_url.clone());
    let response = client
        .recommendations("u1", "verifiedOnly=true&exploration=false")
        .await;
    let body: serde_json::Value = response.json().await.unwrap();

    let ids: Vec<&str> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"verified-1"));
    assert!(!ids.contains(&"unverified-1"));
    assert_eq!(body["metadata"]["verifiedOnly"], true);
}

#[tokio::test]
async fn test_limit_is_clamped() {
    let server = seeded_server().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.recommendations("u1", "limit=5000").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["results"].as_array().unwrap().len() <= 50);
}
