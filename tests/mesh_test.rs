mod common;

use common::test_utils::*;
use futures::executor::block_on;
use model_viewer::resources::{loader::parse_obj, material::sibling_path, mesh::build_vertices};

#[test]
fn texture_coordinates_are_flipped_vertically() {
    let vertices = build_vertices(
        &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        &[0.0, 0.0, 1.0, 0.25, 0.0, 1.0],
        &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
        &[0, 1, 2],
    );

    assert_eq!(vertices[0].tex_coords, [0.0, 1.0]);
    assert_eq!(vertices[1].tex_coords, [1.0, 0.75]);
    assert_eq!(vertices[2].tex_coords, [0.0, 0.0]);
    assert!(vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
}

#[test]
fn missing_normals_are_computed_per_vertex() {
    let meshes = block_on(parse_obj(QUAD_NO_NORMALS_OBJ.as_bytes(), None)).expect("quad parses");

    assert_eq!(meshes.len(), 1);
    let quad = &meshes[0];
    assert_eq!(quad.vertices.len(), 4);
    assert_eq!(quad.indices.len(), 6);
    for vertex in &quad.vertices {
        assert_eq!(vertex.normal, [0.0, 0.0, 1.0]);
    }
}

#[test]
fn shared_vertices_average_their_faces() {
    // Two faces folded along the x axis: one facing +z, one facing +y.
    let positions = [
        0.0, 0.0, 0.0, //
        1.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, //
        0.0, 0.0, -1.0,
    ];
    let vertices = build_vertices(&positions, &[], &[], &[0, 1, 2, 0, 1, 3]);

    let half = std::f32::consts::FRAC_1_SQRT_2;
    for shared in [0, 1] {
        let n = vertices[shared].normal;
        assert!((n[0]).abs() < 1e-6);
        assert!((n[1] - half).abs() < 1e-6, "{n:?}");
        assert!((n[2] - half).abs() < 1e-6, "{n:?}");
    }
    assert_eq!(vertices[2].normal, [0.0, 0.0, 1.0]);
    assert_eq!(vertices[3].normal, [0.0, 1.0, 0.0]);
}

#[test]
fn unreferenced_vertices_keep_a_zero_normal() {
    let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 5.0, 5.0, 5.0];
    let vertices = build_vertices(&positions, &[], &[], &[0, 1, 2]);

    assert_eq!(vertices[3].normal, [0.0, 0.0, 0.0]);
}

#[test]
fn sibling_paths_resolve_against_the_material_directory() {
    assert_eq!(sibling_path("models/model.mtl", "red.png"), "models/red.png");
    assert_eq!(sibling_path("model.mtl", "red.png"), "red.png");
    assert_eq!(
        sibling_path("a/b/model.mtl", "textures\\red.png"),
        "a/b/textures/red.png"
    );
    assert_eq!(sibling_path("models/model.mtl", "/abs/red.png"), "/abs/red.png");
}
