mod common;

use common::test_utils::*;
use futures::executor::block_on;
use model_viewer::resources::{
    Progress,
    loader::{LoadEvent, LoadRequest, LoadStage, ProgressTracker, load_model, parse_obj},
    material::DEFAULT_DIFFUSE,
};

fn textured_request() -> LoadRequest {
    LoadRequest::new("models/model.obj", Some("models/model.mtl".to_string()))
}

#[test]
fn material_is_requested_before_geometry() {
    let source = MemorySource::new()
        .with_file("models/model.mtl", RED_MTL)
        .with_file("models/model.obj", TRIANGLE_OBJ);
    let sink = RecordingSink::new();

    block_on(load_model(&source, &textured_request(), sink.clone()));

    assert_eq!(source.requests(), vec!["models/model.mtl", "models/model.obj"]);
    let events = sink.take();
    assert_eq!(
        stages(&events),
        vec![LoadStage::LoadingMaterial, LoadStage::LoadingGeometry]
    );
    assert_eq!(terminal_count(&events), 1);
    assert!(matches!(events.last(), Some(LoadEvent::Loaded(_))));
}

#[test]
fn materials_are_bound_to_the_geometry() {
    let source = MemorySource::new()
        .with_file("models/model.mtl", RED_MTL)
        .with_file("models/model.obj", TRIANGLE_OBJ);
    let sink = RecordingSink::new();

    block_on(load_model(&source, &textured_request(), sink.clone()));

    let asset = loaded_asset(sink.take()).expect("load succeeds");
    assert_eq!(asset.name, "models/model.obj");
    assert_eq!(asset.materials.len(), 1);
    assert_eq!(asset.materials[0].name, "red");
    assert_eq!(asset.materials[0].diffuse_colour, [1.0, 0.0, 0.0]);
    assert_eq!(asset.meshes.len(), 1);
    assert_eq!(asset.meshes[0].material, Some(0));
    assert_eq!(asset.meshes[0].indices, vec![0, 1, 2]);
}

#[test]
fn materials_bind_without_an_mtllib_statement() {
    let obj = "o tri\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl red\nf 1 2 3\n";
    let source = MemorySource::new()
        .with_file("models/model.mtl", RED_MTL)
        .with_file("models/model.obj", obj);
    let sink = RecordingSink::new();

    block_on(load_model(&source, &textured_request(), sink.clone()));

    let asset = loaded_asset(sink.take()).expect("load succeeds");
    assert_eq!(asset.materials[0].name, "red");
    assert_eq!(asset.meshes[0].material, Some(0));
}

#[test]
fn bound_library_replaces_the_one_named_in_the_obj() {
    let meshes = block_on(parse_obj(
        TRIANGLE_OBJ.replace("mtllib model.mtl", "mtllib elsewhere.mtl").as_bytes(),
        Some("newmtl blue\nKd 0 0 1\nnewmtl red\nKd 1 0 0\n".as_bytes()),
    ))
    .expect("triangle parses");

    assert_eq!(meshes[0].material, Some(1));
}

#[test]
fn missing_material_never_requests_geometry() {
    let source = MemorySource::new().with_file("models/model.obj", TRIANGLE_OBJ);
    let sink = RecordingSink::new();

    block_on(load_model(&source, &textured_request(), sink.clone()));

    assert_eq!(source.requests(), vec!["models/model.mtl"]);
    let events = sink.take();
    assert_eq!(stages(&events), vec![LoadStage::LoadingMaterial]);
    assert_eq!(terminal_count(&events), 1);
    match events.last() {
        Some(LoadEvent::Failed(failure)) => {
            assert_eq!(failure.stage, LoadStage::LoadingMaterial);
            assert_eq!(failure.path, "models/model.mtl");
        }
        other => panic!("expected a material failure, got {other:?}"),
    }
}

#[test]
fn unbound_load_ignores_mtllib() {
    let source = MemorySource::new().with_file("model.obj", TRIANGLE_OBJ);
    let sink = RecordingSink::new();

    block_on(load_model(
        &source,
        &LoadRequest::new("model.obj", None),
        sink.clone(),
    ));

    assert_eq!(source.requests(), vec!["model.obj"]);
    let events = sink.take();
    assert_eq!(stages(&events), vec![LoadStage::LoadingGeometry]);
    let asset = loaded_asset(events).expect("load succeeds");
    assert!(asset.materials.is_empty());
    assert_eq!(asset.meshes[0].material, None);
}

#[test]
fn missing_geometry_fails_once() {
    let source = MemorySource::new().with_file("models/model.mtl", RED_MTL);
    let sink = RecordingSink::new();

    block_on(load_model(&source, &textured_request(), sink.clone()));

    let events = sink.take();
    assert_eq!(terminal_count(&events), 1);
    match events.last() {
        Some(LoadEvent::Failed(failure)) => {
            assert_eq!(failure.stage, LoadStage::LoadingGeometry);
            assert_eq!(failure.path, "models/model.obj");
            assert!(format!("{:#}", failure.source).contains("not found"));
        }
        other => panic!("expected a geometry failure, got {other:?}"),
    }
}

#[test]
fn geometry_without_faces_fails() {
    let source = MemorySource::new().with_file("model.obj", "o empty\nv 0 0 0\n");
    let sink = RecordingSink::new();

    block_on(load_model(
        &source,
        &LoadRequest::new("model.obj", None),
        sink.clone(),
    ));

    let events = sink.take();
    assert_eq!(terminal_count(&events), 1);
    assert!(matches!(
        events.last(),
        Some(LoadEvent::Failed(failure)) if failure.stage == LoadStage::LoadingGeometry
    ));
}

#[test]
fn progress_is_monotonic_and_bounded() {
    let source = MemorySource::new()
        .with_chunk_size(7)
        .with_file("models/model.mtl", RED_MTL)
        .with_file("models/model.obj", TRIANGLE_OBJ);
    let sink = RecordingSink::new();

    block_on(load_model(&source, &textured_request(), sink.clone()));

    let events = sink.take();
    for resource in ["models/model.mtl", "models/model.obj"] {
        let fractions = progress_of(&events, resource);
        assert!(fractions.len() > 1, "{resource} reported {fractions:?}");
        assert!(fractions.iter().all(|f| (0.0..=1.0).contains(f)));
        assert!(fractions.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(fractions.last(), Some(&1.0));
    }
}

#[test]
fn texture_is_resolved_next_to_the_material_file() {
    let source = MemorySource::new()
        .with_file("models/model.mtl", TEXTURED_MTL)
        .with_file("models/red.png", png(2, 2, [255, 0, 0, 255]))
        .with_file("models/model.obj", TRIANGLE_OBJ);
    let sink = RecordingSink::new();

    block_on(load_model(&source, &textured_request(), sink.clone()));

    assert_eq!(
        source.requests(),
        vec!["models/model.mtl", "models/red.png", "models/model.obj"]
    );
    let asset = loaded_asset(sink.take()).expect("load succeeds");
    let texture = asset.materials[0]
        .diffuse_texture
        .as_ref()
        .expect("texture decoded");
    assert_eq!(texture.dimensions(), (2, 2));
    assert_eq!(texture.get_pixel(0, 0).0, [255, 0, 0, 255]);
}

#[test]
fn missing_texture_falls_back_to_diffuse_colour() {
    let source = MemorySource::new()
        .with_file("models/model.mtl", TEXTURED_MTL)
        .with_file("models/model.obj", TRIANGLE_OBJ);
    let sink = RecordingSink::new();

    block_on(load_model(&source, &textured_request(), sink.clone()));

    let asset = loaded_asset(sink.take()).expect("a missing texture does not fail the load");
    assert!(asset.materials[0].diffuse_texture.is_none());
    assert_eq!(asset.materials[0].diffuse_colour, [1.0, 0.0, 0.0]);
}

#[test]
fn undecodable_texture_falls_back_to_diffuse_colour() {
    let source = MemorySource::new()
        .with_file("models/model.mtl", TEXTURED_MTL)
        .with_file("models/red.png", "definitely not a png")
        .with_file("models/model.obj", TRIANGLE_OBJ);
    let sink = RecordingSink::new();

    block_on(load_model(&source, &textured_request(), sink.clone()));

    let asset = loaded_asset(sink.take()).expect("load succeeds");
    assert!(asset.materials[0].diffuse_texture.is_none());
}

#[test]
fn material_without_colour_uses_the_default() {
    let source = MemorySource::new()
        .with_file("models/model.mtl", "newmtl plain\n")
        .with_file("models/model.obj", TRIANGLE_OBJ.replace("usemtl red", "usemtl plain"));
    let sink = RecordingSink::new();

    block_on(load_model(&source, &textured_request(), sink.clone()));

    let asset = loaded_asset(sink.take()).expect("load succeeds");
    assert_eq!(asset.materials[0].diffuse_colour, DEFAULT_DIFFUSE);
}

#[test]
fn progress_tracker_drops_regressions() {
    let mut tracker = ProgressTracker::new("model.obj");

    let seen: Vec<Option<f32>> = [(5, 10), (3, 10), (5, 10), (10, 10), (20, 10)]
        .into_iter()
        .map(|(loaded, total)| {
            tracker.observe(Progress {
                loaded,
                total: Some(total),
            })
        })
        .collect();

    assert_eq!(seen, vec![Some(0.5), None, None, Some(1.0), None]);
}

#[test]
fn progress_tracker_ignores_unknown_totals() {
    let mut tracker = ProgressTracker::new("model.obj");

    assert_eq!(
        tracker.observe(Progress {
            loaded: 100,
            total: None
        }),
        None
    );
    assert_eq!(
        tracker.observe(Progress {
            loaded: 0,
            total: Some(0)
        }),
        Some(1.0)
    );
}
