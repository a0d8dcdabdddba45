//! Shared fixtures for unit tests.
#![allow(clippy::unwrap_used)]

use crate::math::Point3;
use crate::mesh::{
    Panel, PanelMesh, PanelShape, Part, PartKind, PartStore, PositionTag, SurfaceGrid, SurfaceKind,
    WingShape,
};

/// Unit cube with outward normals, one quad per face.
pub fn cube_mesh() -> PanelMesh {
    let nodes: Vec<Point3> = (0..8)
        .map(|n| Point3::new(f64::from(n & 1), f64::from((n >> 1) & 1), f64::from((n >> 2) & 1)))
        .collect();
    let faces = [
        [0, 2, 3, 1],
        [4, 5, 7, 6],
        [0, 4, 6, 2],
        [1, 3, 7, 5],
        [0, 1, 5, 4],
        [2, 6, 7, 3],
    ];
    let panels = faces
        .iter()
        .map(|f| Panel::new(PanelShape::Quad, f, &nodes, PositionTag::Fuselage).unwrap())
        .collect();
    PanelMesh::from_parts(nodes, panels, Vec::new()).unwrap()
}

/// Single thin flat plate in the `z = 0` plane, leading edge on `x = 0`.
pub fn plate_store(chord: f64, span: f64, chord_panels: usize, span_panels: usize) -> PartStore {
    let mut store = PartStore::new();
    store.insert(Part::new(
        "plate",
        PartKind::Wing,
        SurfaceKind::Thin,
        vec![SurfaceGrid::flat_plate(chord, span, chord_panels, span_panels)],
    ));
    store
}

/// Closed thick wing of the given panel counts, default planform.
pub fn thick_wing_store(chord_panels: usize, span_panels: usize) -> PartStore {
    let shape = WingShape {
        chord_panels,
        span_panels,
        ..WingShape::default()
    };
    let mut store = PartStore::new();
    store.insert(Part::new(
        "wing",
        PartKind::Wing,
        SurfaceKind::Thick,
        shape.thick_surfaces().unwrap(),
    ));
    store
}

/// Installs a test log subscriber, filtered by `RUST_LOG` with warnings on
/// by default. Later calls are no-ops.
pub fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_test_writer()
        .try_init();
}
