use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, TimeZone};
use sd3_studio::{
    storage::Clock, AspectRatio, Config, EntryOutcome, GenerationRequest, LocalImageStorage, Mode,
    OutputFormat, SdModel, StabilityClient, StabilityConfig, StorageConfig, StudioError,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Hands out a new seed per call, like the real service does when none is sent.
struct SeedingResponder {
    next_seed: AtomicU64,
}

impl Respond for SeedingResponder {
    fn respond(&self, _: &Request) -> ResponseTemplate {
        let seed = self.next_seed.fetch_add(1, Ordering::SeqCst);
        ResponseTemplate::new(200)
            .set_delay(Duration::from_millis(300))
            .set_body_json(serde_json::json!({
                "image": "iVBORw0KGgo=",
                "seed": seed,
                "finish_reason": "SUCCESS"
            }))
    }
}

/// Each call lands one second after the previous one.
fn ticking_clock() -> Clock {
    let tick = Arc::new(AtomicI64::new(0));
    Arc::new(move || {
        let offset = tick.fetch_add(1, Ordering::SeqCst);
        Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(offset)
    })
}

fn frozen_clock() -> Clock {
    Arc::new(|| Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
}

async fn setup(output_dir: &std::path::Path) -> (MockServer, StabilityClient) {
    setup_with_clock(output_dir, ticking_clock()).await
}

async fn setup_with_clock(output_dir: &std::path::Path, clock: Clock) -> (MockServer, StabilityClient) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2beta/stable-image/generate/sd3"))
        .respond_with(SeedingResponder {
            next_seed: AtomicU64::new(1000),
        })
        .mount(&server)
        .await;

    let config = Config::new()
        .with_stability(
            StabilityConfig::new()
                .with_api_key("sk-test")
                .with_endpoint(format!("{}/v2beta/stable-image/generate/sd3", server.uri())),
        )
        .with_storage(StorageConfig::new().with_output_dir(output_dir));
    let storage = LocalImageStorage::new(config.storage.clone()).with_clock(clock);
    let client = StabilityClient::with_storage(&config, Arc::new(storage)).unwrap();

    (server, client)
}

#[tokio::test]
async fn red_fox_scenario_writes_three_images_and_sidecars() {
    let dir = tempfile::tempdir().unwrap();
    let output_dir = dir.path().join("outputs");
    let (server, client) = setup(&output_dir).await;

    let request = GenerationRequest::new("a red fox in snow")
        .with_mode(Mode::TextToImage)
        .with_aspect_ratio(AspectRatio::Ratio1x1)
        .with_model(SdModel::Sd3)
        .with_output_format(OutputFormat::Png);

    let entries = client.generate_and_save(&request, 3).await.unwrap();
    assert_eq!(entries.len(), 3);

    let mut seeds = HashSet::new();
    for entry in &entries {
        let EntryOutcome::Saved(saved) = &entry.outcome else {
            panic!("entry {} was not saved: {:?}", entry.index, entry.outcome);
        };
        assert_eq!(saved.image_path.extension().unwrap(), "png");
        assert!(saved.image_path.exists());

        let sidecar: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&saved.metadata_path).unwrap()).unwrap();
        assert_eq!(sidecar["prompt"], "a red fox in snow");
        assert_eq!(sidecar["mode"], "text-to-image");
        assert_eq!(sidecar["aspect_ratio"], "1:1");
        assert_eq!(sidecar["model"], "sd3");
        assert_eq!(sidecar["output_format"], "png");
        assert!(sidecar["seed"].is_u64());
        seeds.insert(sidecar["seed"].as_u64().unwrap());
    }
    assert_eq!(seeds.len(), 3);

    let files: Vec<_> = std::fs::read_dir(&output_dir).unwrap().collect();
    assert_eq!(files.len(), 6);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn requests_run_concurrently() {
    let dir = tempfile::tempdir().unwrap();
    let (_server, client) = setup(dir.path()).await;

    let started = Instant::now();
    let results = client
        .dispatcher()
        .dispatch(&GenerationRequest::new("lighthouse at dusk"), 10)
        .await
        .unwrap();

    assert_eq!(results.len(), 10);
    assert!(results.iter().all(|r| r.is_success()));
    // Ten sequential calls would take at least three seconds.
    assert!(started.elapsed() < Duration::from_millis(2500));
}

#[tokio::test]
async fn empty_prompt_is_rejected_before_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let (server, client) = setup(dir.path()).await;

    let result = client.generate_and_save(&GenerationRequest::new(""), 3).await;

    assert!(matches!(result, Err(StudioError::ValidationError(_))));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn same_second_saves_share_one_file_and_are_flagged() {
    let dir = tempfile::tempdir().unwrap();
    let (_server, client) = setup_with_clock(dir.path(), frozen_clock()).await;

    let entries = client
        .generate_and_save(&GenerationRequest::new("a red fox in snow"), 3)
        .await
        .unwrap();

    let saved: Vec<_> = entries.iter().filter_map(|entry| entry.saved()).collect();
    assert_eq!(saved.len(), 3);
    assert!(saved.iter().all(|s| s.image_path == saved[0].image_path));
    assert!(!saved[0].overwrote);
    assert!(saved[1].overwrote && saved[2].overwrote);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[tokio::test]
async fn unwritable_output_folder_reports_every_entry() {
    let dir = tempfile::tempdir().unwrap();
    let blocked = dir.path().join("outputs");
    std::fs::write(&blocked, b"file in the way").unwrap();
    let (server, client) = setup(&blocked).await;

    let entries = client
        .generate_and_save(&GenerationRequest::new("a red fox in snow"), 2)
        .await
        .unwrap();

    assert_eq!(entries.len(), 2);
    assert!(entries
        .iter()
        .all(|entry| matches!(entry.outcome, EntryOutcome::StorageFailed(_))));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}
