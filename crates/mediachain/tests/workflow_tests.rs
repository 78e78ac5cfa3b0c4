//! End-to-end workflow runs through `WorkflowEngine::from_config`.

mod common;

use serde_json::{json, Map, Value};

use common::TestHarness;
#[cfg(unix)]
use common::FakeEncoder;
use mediachain::config::StoreBackend;
use mediachain::{DeliverableMode, DeliverableStatus, RunStatus, WorkflowError};

fn inputs(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(unix)]
#[test]
fn test_social_pack_runs_locally() {
    let harness = TestHarness::new();
    let encoder = harness.fake_encoder(FakeEncoder::Succeeds);
    let config = harness.config().encoder(&encoder).build();
    let engine = harness.engine(&config);

    harness.write_upload("abc_trailer.mov", b"frames");
    let run = engine
        .run(
            "social_pack",
            inputs(json!({ "source": "abc_trailer.mov" })),
            Map::new(),
        )
        .unwrap();

    assert_eq!(run.deliverables.len(), 1);
    let d = &run.deliverables[0];
    assert_eq!(d.status, DeliverableStatus::Ready);
    assert_eq!(d.mode, Some(DeliverableMode::Local));
    let path = d.path.as_deref().unwrap();
    assert!(path.ends_with("abc_trailer_vertical.mp4"));
    assert!(std::path::Path::new(path).starts_with(harness.outputs_dir().join(&run.run_id)));
    assert_eq!(run.status, RunStatus::Completed);

    let summary = run.summary.unwrap();
    assert_eq!(summary.local_outputs, 1);
    assert_eq!(summary.cloud_jobs, 0);

    let stored = engine.get_run(&run.run_id).unwrap();
    assert_eq!(stored.deliverables, run.deliverables);
    assert!(harness
        .runs_dir()
        .join(&run.run_id)
        .join("run.json")
        .is_file());
}

#[cfg(unix)]
#[test]
fn test_encoder_failure_recorded_on_deliverable() {
    let harness = TestHarness::new();
    let encoder = harness.fake_encoder(FakeEncoder::Fails);
    let config = harness.config().encoder(&encoder).build();
    let engine = harness.engine(&config);

    harness.write_upload("clip.mov", b"frames");
    let run = engine
        .run("ott_delivery", inputs(json!({ "source": "clip.mov" })), Map::new())
        .unwrap();

    assert_eq!(run.status, RunStatus::Failed);
    for d in &run.deliverables {
        assert_eq!(d.status, DeliverableStatus::Failed);
        let error = d.error.as_deref().unwrap();
        assert!(!error.is_empty());
        assert!(error.contains("Invalid data found"));
    }
    assert_eq!(run.summary.unwrap().failed, 2);
}

#[cfg(unix)]
#[test]
fn test_encoder_without_output_fails() {
    let harness = TestHarness::new();
    let encoder = harness.fake_encoder(FakeEncoder::Silent);
    let config = harness.config().encoder(&encoder).build();
    let engine = harness.engine(&config);

    harness.write_upload("clip.mov", b"frames");
    let run = engine
        .run("social_pack", inputs(json!({ "source": "clip.mov" })), Map::new())
        .unwrap();

    assert_eq!(run.deliverables[0].status, DeliverableStatus::Failed);
    assert!(run.deliverables[0]
        .error
        .as_deref()
        .unwrap()
        .contains("produced no output"));
}

#[cfg(unix)]
#[test]
fn test_launch_campaign_mixed_outcomes() {
    let harness = TestHarness::new();
    let encoder = harness.fake_encoder(FakeEncoder::Succeeds);
    let config = harness
        .config()
        .encoder(&encoder)
        .blueprint(
            "festival",
            &[("Festival master", "mezzanine"), ("Press kit", "misc_extra")],
        )
        .build();
    let engine = harness.engine(&config);

    harness.write_upload("premiere.mov", b"frames");
    let run = engine
        .run(
            "festival",
            inputs(json!({ "source": "premiere.mov" })),
            inputs(json!({ "campaign": "cannes" })),
        )
        .unwrap();

    assert_eq!(run.deliverables[0].status, DeliverableStatus::Ready);
    assert_eq!(run.deliverables[1].status, DeliverableStatus::Skipped);
    assert!(run.deliverables[1].note.is_some());
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.labels["campaign"], "cannes");

    let summary = run.summary.unwrap();
    assert_eq!(summary.local_outputs, 1);
    assert_eq!(summary.skipped, 1);
}

#[test]
fn test_unknown_cue_is_skipped() {
    let harness = TestHarness::new();
    let config = harness
        .config()
        .blueprint("extras", &[("Behind the scenes", "misc_extra")])
        .build();
    let engine = harness.engine(&config);

    let run = engine.run("extras", Map::new(), Map::new()).unwrap();

    assert_eq!(run.deliverables[0].status, DeliverableStatus::Skipped);
    assert!(run.deliverables[0].path.is_none());
    assert_eq!(run.summary.unwrap().skipped, 1);
    assert_eq!(run.status, RunStatus::Failed);
}

#[test]
fn test_unknown_blueprint_creates_no_record() {
    let harness = TestHarness::new();
    let engine = harness.engine(&harness.config().build());

    let result = engine.run("no_such_blueprint", Map::new(), Map::new());
    assert!(matches!(result, Err(WorkflowError::UnknownBlueprint(_))));
    assert!(engine.list_runs(100).unwrap().is_empty());

    let entries = std::fs::read_dir(harness.runs_dir()).unwrap().count();
    assert_eq!(entries, 0);
}

#[test]
fn test_missing_source_fails_precondition() {
    let harness = TestHarness::new();
    let engine = harness.engine(&harness.config().build());

    let run = engine
        .run("social_pack", inputs(json!({ "source": "not-uploaded.mov" })), Map::new())
        .unwrap();

    let d = &run.deliverables[0];
    assert_eq!(d.status, DeliverableStatus::Failed);
    assert!(d.error.as_deref().unwrap().contains("Precondition"));
}

#[test]
fn test_list_runs_caps_at_one_hundred() {
    let harness = TestHarness::new();
    let config = harness
        .config()
        .store(StoreBackend::Memory)
        .blueprint("noop", &[("Poster", "still")])
        .build();
    let engine = harness.engine(&config);

    for _ in 0..105 {
        engine.run("noop", Map::new(), Map::new()).unwrap();
    }

    let runs = engine.list_runs(500).unwrap();
    assert_eq!(runs.len(), 100);
    assert!(runs
        .windows(2)
        .all(|pair| pair[0].created_at >= pair[1].created_at));

    assert_eq!(engine.list_runs(0).unwrap().len(), 1);
}

#[test]
fn test_sqlite_store_survives_restart() {
    let harness = TestHarness::new();
    let config = harness
        .config()
        .store(StoreBackend::Sqlite)
        .blueprint("extras", &[("Stills", "gallery")])
        .build();

    let run_id = {
        let engine = harness.engine(&config);
        engine.run("extras", Map::new(), Map::new()).unwrap().run_id
    };

    let engine = harness.engine(&config);
    let run = engine.get_run(&run_id).unwrap();
    assert_eq!(run.blueprint_name, "extras");
    assert_eq!(run.deliverables[0].status, DeliverableStatus::Skipped);
    assert!(harness.data_dir.join("runs.db").is_file());
}

#[cfg(unix)]
#[test]
fn test_local_output_mirrored_to_object_store() {
    let harness = TestHarness::new();
    let encoder = harness.fake_encoder(FakeEncoder::Succeeds);
    let config = harness
        .config()
        .encoder(&encoder)
        .object_store(harness.objects_dir.clone())
        .destination_bucket("deliveries")
        .build();
    let engine = harness.engine(&config);

    harness.write_upload("clip.mov", b"frames");
    let run = engine
        .run("social_pack", inputs(json!({ "source": "clip.mov" })), Map::new())
        .unwrap();

    let d = &run.deliverables[0];
    assert_eq!(d.status, DeliverableStatus::Ready);
    let expected = format!(
        "remote://deliveries/runs/{}/social_vertical/01/clip_vertical.mp4",
        run.run_id
    );
    assert_eq!(d.path.as_deref(), Some(expected.as_str()));
    assert!(std::path::Path::new(d.local_path.as_deref().unwrap()).is_file());
    assert!(harness
        .objects_dir
        .join("deliveries/runs")
        .join(&run.run_id)
        .join("social_vertical/01/clip_vertical.mp4")
        .is_file());
}

#[test]
fn test_blueprint_listing() {
    let harness = TestHarness::new();
    let engine = harness.engine(&harness.config().build());

    let names: Vec<String> = engine
        .list_blueprints()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(names, vec!["launch_campaign", "ott_delivery", "social_pack"]);
}
