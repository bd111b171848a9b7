//! Unit tests for record assembly

use std::sync::Arc;
use std::time::Duration;

use swapi_people_loader::fetcher::FetchError;
use swapi_people_loader::people::{PeopleEndpoint, RecordAssembler};

use crate::support::{film, named, raw_person, StubSource};

const BASE: &str = "https://swapi.test/api/";

fn url(path: &str) -> String {
    format!("{BASE}{path}")
}

fn endpoint() -> PeopleEndpoint {
    PeopleEndpoint::new(url("people/"))
}

fn luke_source() -> StubSource {
    StubSource::new()
        .with_json(
            url("people/1"),
            raw_person(
                "Luke Skywalker",
                &url("planets/1/"),
                &[url("films/1/"), url("films/2/")],
                &[],
                &[url("vehicles/14/"), url("vehicles/30/")],
                &[url("starships/12/")],
            ),
        )
        .with_json(url("planets/1/"), named("Tatooine"))
        .with_json(url("films/1/"), film(4, "A New Hope"))
        .with_json(url("films/2/"), film(5, "The Empire Strikes Back"))
        .with_json(url("vehicles/14/"), named("Snowspeeder"))
        .with_json(url("vehicles/30/"), named("Imperial Speeder Bike"))
        .with_json(url("starships/12/"), named("X-wing"))
}

#[tokio::test]
async fn test_assembles_flat_person() {
    let assembler = RecordAssembler::new(Arc::new(luke_source()), endpoint());

    let person = assembler.assemble(1).await.unwrap().expect("record exists");

    assert_eq!(person.id, 1);
    assert_eq!(person.name, "Luke Skywalker");
    assert_eq!(person.birth_year, "19BBY");
    assert_eq!(person.height, "172");
    assert_eq!(person.homeworld, "Tatooine");
    assert_eq!(
        person.films,
        "Episode 4: A New Hope, Episode 5: The Empire Strikes Back"
    );
    assert_eq!(person.species, "");
    assert_eq!(person.vehicles, "Snowspeeder, Imperial Speeder Bike");
    assert_eq!(person.starships, "X-wing");
}

#[tokio::test]
async fn test_not_found_sentinel_skips_resolution() {
    let source = Arc::new(StubSource::new().with_not_found(url("people/17")));
    let assembler = RecordAssembler::new(Arc::clone(&source), endpoint());

    assert_eq!(assembler.assemble(17).await.unwrap(), None);
    assert_eq!(source.total_calls(), 1);
}

#[tokio::test]
async fn test_reference_failure_fails_assembly() {
    let source = luke_source().with_failure(url("vehicles/30/"));
    let assembler = RecordAssembler::new(Arc::new(source), endpoint());

    let err = assembler
        .assemble(1)
        .await
        .expect_err("a failed vehicle lookup must fail the person");
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_raw_record_failure_propagates() {
    let source = StubSource::new().with_failure(url("people/3"));
    let assembler = RecordAssembler::new(Arc::new(source), endpoint());

    assert!(matches!(
        assembler.assemble(3).await,
        Err(FetchError::Exhausted { .. })
    ));
}

#[tokio::test]
async fn test_missing_scalar_is_reported() {
    let mut raw = raw_person("Nameless", &url("planets/1/"), &[], &[], &[], &[]);
    raw.as_object_mut().unwrap().remove("eye_color");
    let source = StubSource::new()
        .with_json(url("people/2"), raw)
        .with_json(url("planets/1/"), named("Tatooine"));
    let assembler = RecordAssembler::new(Arc::new(source), endpoint());

    let err = assembler.assemble(2).await.expect_err("eye_color is required");
    assert!(matches!(err, FetchError::MissingField { ref field, .. } if field == "eye_color"));
}

#[tokio::test(start_paused = true)]
async fn test_reference_fields_resolve_concurrently() {
    let source = luke_source()
        .with_delay(url("planets/1/"), Duration::from_millis(100))
        .with_delay(url("films/1/"), Duration::from_millis(100))
        .with_delay(url("vehicles/14/"), Duration::from_millis(100))
        .with_delay(url("starships/12/"), Duration::from_millis(100));
    let assembler = RecordAssembler::new(Arc::new(source), endpoint());

    let started = tokio::time::Instant::now();
    assembler.assemble(1).await.unwrap();

    // Serial resolution would take at least 400ms
    assert!(started.elapsed() < Duration::from_millis(200));
}
