//! Integration tests for logging and tracing

use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use swapi_people_loader::harvester::{BatchDriver, HarvestConfig};
use swapi_people_loader::people::PeopleEndpoint;

use crate::support::{stub_universe, RecordingStore};

fn init_test_tracing(directives: &str) {
    // Fails harmlessly when another test already installed a subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directives))
        .with_test_writer()
        .try_init();
}

#[test]
fn test_env_filter_directives_parse() {
    for directive in [
        "info",
        "swapi_people_loader=debug",
        "warn,swapi_people_loader::fetcher=trace",
        "swapi_people_loader::harvester=debug,swapi_people_loader=info",
    ] {
        assert!(EnvFilter::try_new(directive).is_ok(), "{directive}");
    }
}

#[test]
fn test_json_subscriber_builds() {
    let result = tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new("swapi_people_loader=info"))
        .with_test_writer()
        .try_init();

    // Ok, or Err because a subscriber was already installed
    let _ = result;
}

#[test]
fn test_structured_fields_and_spans() {
    init_test_tracing("swapi_people_loader=debug");

    let span = tracing::info_span!("window", start = 1u32, end = 11u32);
    let _enter = span.enter();
    info!(id = 1u32, name = "Luke Skywalker", " 1 - Luke Skywalker got");
    warn!(url = "https://swapi.dev/api/films/1/", attempt = 2u32, "retrying");
}

#[tokio::test]
async fn test_run_emits_logs_without_panicking() {
    init_test_tracing("swapi_people_loader=trace");

    let base = "https://swapi.test/api/";
    let source = Arc::new(stub_universe(base, 2, 1..=2, []));
    let store = Arc::new(RecordingStore::new());

    let driver = BatchDriver::new(
        source,
        PeopleEndpoint::new(format!("{base}people/")),
        store.clone(),
        HarvestConfig::new(2),
    );

    assert_eq!(driver.run_all().await.unwrap(), 2);
    assert_eq!(store.saved_ids(), vec![1, 2]);
}
