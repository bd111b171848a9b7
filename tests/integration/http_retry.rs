//! Integration tests for HTTP retry behavior
//!
//! Runs the real reqwest-backed client against a local server.

use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use swapi_people_loader::fetcher::http::HttpJsonClient;
use swapi_people_loader::fetcher::retry::RetryPolicy;
use swapi_people_loader::fetcher::{FetchError, JsonSource};
use swapi_people_loader::harvester::{BatchDriver, HarvestConfig, HarvestError};
use swapi_people_loader::people::PeopleEndpoint;

use crate::support::{named, raw_person, MockApi, RecordingStore};

fn fast_client(max_attempts: u32) -> HttpJsonClient {
    HttpJsonClient::new(
        Client::new(),
        RetryPolicy::fixed(max_attempts, Duration::from_millis(5)),
    )
}

#[tokio::test]
async fn test_undecodable_body_exhausts_five_attempts() {
    let api = MockApi::start().await;
    api.respond("/api/planets/1/", 200, "<html>upstream hiccup</html>");

    let err = fast_client(5)
        .get_json(&api.url("/api/planets/1/"))
        .await
        .expect_err("body is never JSON");

    match err {
        FetchError::Exhausted {
            status, attempts, ..
        } => {
            assert_eq!(status, Some(200));
            assert_eq!(attempts, 5);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(api.hits("/api/planets/1/"), 5);
}

#[tokio::test]
async fn test_recovers_after_transient_failures() {
    let api = MockApi::start().await;
    api.sequence(
        "/api/films/1/",
        vec![
            (503, "Service Unavailable".to_string()),
            (502, "<html>bad gateway</html>".to_string()),
            (200, json!({ "title": "A New Hope", "episode_id": 4 }).to_string()),
        ],
    );

    let value = fast_client(5)
        .get_json(&api.url("/api/films/1/"))
        .await
        .unwrap();

    assert_eq!(value["title"], "A New Hope");
    assert_eq!(api.hits("/api/films/1/"), 3);
}

#[tokio::test]
async fn test_json_error_status_is_not_retried() {
    // The not-found sentinel arrives with a 404 but decodes fine
    let api = MockApi::start().await;

    let value = fast_client(5)
        .get_json(&api.url("/api/people/99"))
        .await
        .unwrap();

    assert_eq!(value["detail"], "Not found");
    assert_eq!(api.hits("/api/people/99"), 1);
}

#[tokio::test]
async fn test_last_status_reported_after_mixed_failures() {
    let api = MockApi::start().await;
    api.sequence(
        "/api/species/1/",
        vec![
            (500, "oops".to_string()),
            (429, "slow down".to_string()),
            (503, "maintenance".to_string()),
        ],
    );

    let err = fast_client(3)
        .get_json(&api.url("/api/species/1/"))
        .await
        .expect_err("every attempt fails");

    assert_eq!(err.status(), Some(503));
    assert_eq!(api.hits("/api/species/1/"), 3);
}

#[tokio::test]
async fn test_exhausted_reference_never_reaches_store() {
    let api = MockApi::start().await;
    api.json("/api/people/", json!({ "count": 1 }));
    api.json(
        "/api/people/1",
        raw_person("Luke Skywalker", &api.url("/api/planets/1/"), &[], &[], &[], &[]),
    );
    api.respond("/api/planets/1/", 200, "not json at all");

    let store = Arc::new(RecordingStore::new());
    let driver = BatchDriver::new(
        Arc::new(fast_client(5)),
        PeopleEndpoint::new(api.url("/api/people/")),
        store.clone(),
        HarvestConfig::new(1),
    );

    let err = driver.run().await.expect_err("homeworld never decodes");

    assert!(matches!(err, HarvestError::Record { id: 1, .. }));
    assert_eq!(api.hits("/api/planets/1/"), 5);
    assert!(store.saved().is_empty());
}

#[tokio::test]
async fn test_in_flight_cap_still_completes_all_requests() {
    let api = MockApi::start().await;
    for i in 0..8 {
        let path = format!("/api/vehicles/{i}/");
        api.json(&path, named(&format!("vehicle-{i}")));
        // Slow enough that uncapped requests would overlap
        api.delay(&path, Duration::from_millis(50));
    }

    let client = Arc::new(fast_client(5).with_max_in_flight(Some(2)));
    let fetches = (0..8).map(|i| {
        let client = Arc::clone(&client);
        let url = api.url(&format!("/api/vehicles/{i}/"));
        async move { client.get_json(&url).await }
    });

    let values = futures::future::try_join_all(fetches).await.unwrap();

    assert_eq!(values.len(), 8);
    assert_eq!(values[7]["name"], "vehicle-7");
    assert_eq!(client.max_in_flight(), Some(2));
    assert!(api.peak_in_flight() >= 1);
    assert!(
        api.peak_in_flight() <= 2,
        "peak was {}",
        api.peak_in_flight()
    );
}

#[tokio::test]
async fn test_uncapped_client_overlaps_slow_requests() {
    let api = MockApi::start().await;
    for i in 0..4 {
        let path = format!("/api/starships/{i}/");
        api.json(&path, named(&format!("starship-{i}")));
        api.delay(&path, Duration::from_millis(100));
    }

    let client = Arc::new(fast_client(5));
    let fetches = (0..4).map(|i| {
        let client = Arc::clone(&client);
        let url = api.url(&format!("/api/starships/{i}/"));
        async move { client.get_json(&url).await }
    });

    let values = futures::future::try_join_all(fetches).await.unwrap();

    assert_eq!(values.len(), 4);
    assert!(api.peak_in_flight() > 1, "peak was {}", api.peak_in_flight());
}
