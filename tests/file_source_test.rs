mod common;

use std::path::PathBuf;

use common::test_utils::*;
use model_viewer::resources::{
    AssetSource, FileSource, Progress,
    loader::{LoadRequest, load_model},
};

/// Fresh scratch directory under the system temp dir.
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("model-viewer-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(dir.join("models")).unwrap();
    dir
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

#[test]
fn reads_a_file_with_final_progress() {
    let dir = scratch_dir("read");
    std::fs::write(dir.join("models/model.obj"), TRIANGLE_OBJ).unwrap();
    let source = FileSource::new(&dir);

    let mut seen = Vec::new();
    let bytes = runtime()
        .block_on(source.fetch("models/model.obj", |p: Progress| seen.push(p)))
        .unwrap();

    assert_eq!(bytes, TRIANGLE_OBJ.as_bytes());
    let total = TRIANGLE_OBJ.len() as u64;
    assert_eq!(
        seen.last(),
        Some(&Progress {
            loaded: total,
            total: Some(total)
        })
    );
}

#[test]
fn empty_file_reports_completion() {
    let dir = scratch_dir("empty");
    std::fs::write(dir.join("models/empty.mtl"), "").unwrap();
    let source = FileSource::new(&dir);

    let mut seen = Vec::new();
    let bytes = runtime()
        .block_on(source.fetch("models/empty.mtl", |p: Progress| seen.push(p)))
        .unwrap();

    assert!(bytes.is_empty());
    assert_eq!(
        seen,
        vec![Progress {
            loaded: 0,
            total: Some(0)
        }]
    );
    assert_eq!(seen[0].fraction(), Some(1.0));
}

#[test]
fn missing_file_error_names_the_path() {
    let dir = scratch_dir("missing");
    let source = FileSource::new(&dir);

    let error = runtime()
        .block_on(source.fetch("models/nope.obj", |_| ()))
        .unwrap_err();

    assert!(format!("{error:#}").contains("nope.obj"));
}

#[test]
fn loads_a_model_from_disk() {
    let dir = scratch_dir("load");
    std::fs::write(dir.join("models/model.obj"), TRIANGLE_OBJ).unwrap();
    std::fs::write(dir.join("models/model.mtl"), TEXTURED_MTL).unwrap();
    std::fs::write(dir.join("models/red.png"), png(4, 4, [255, 0, 0, 255])).unwrap();
    let source = FileSource::new(&dir);
    let sink = RecordingSink::new();

    runtime().block_on(load_model(
        &source,
        &LoadRequest::new("models/model.obj", Some("models/model.mtl".to_string())),
        sink.clone(),
    ));

    let asset = loaded_asset(sink.take()).expect("load succeeds");
    assert_eq!(asset.meshes.len(), 1);
    assert_eq!(asset.materials[0].name, "red");
    assert!(asset.materials[0].diffuse_texture.is_some());
}
