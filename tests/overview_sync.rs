use std::time::Duration;
use stopmap::prelude::*;

const LAYERS: &str = r#"[
    { "kind": "base_raster", "label": "A", "source": { "type": "xyz", "template": "https://a/{z}/{x}/{y}.png" } },
    { "kind": "base_raster", "label": "B", "visible": true, "source": { "type": "open_street_map" } },
    { "kind": "base_raster", "label": "C", "source": { "type": "xyz", "template": "https://c/{z}/{x}/{y}.png" } }
]"#;

fn abc_map(engine: &mut HeadlessEngine) -> MapController {
    let requests: Vec<LayerRequest> = serde_json::from_str(LAYERS).unwrap();
    let mut map = MapBuilder::new(MapConfig::default())
        .with_layers(requests)
        .build(engine)
        .unwrap();
    map.attach("map", Some("overview")).unwrap();
    map.pump();
    map
}

#[test]
fn test_overview_shows_layer_after_main() {
    let mut engine = HeadlessEngine::default();
    let mut map = abc_map(&mut engine);
    assert_eq!(map.base_layer().label(), "B");
    assert_eq!(map.overview().visible_layer().label(), "C");

    map.rotate_base_layer();
    assert_eq!(map.base_layer().label(), "C");
    assert_eq!(map.overview().visible_layer().label(), "A");

    map.rotate_base_layer();
    assert_eq!(map.base_layer().label(), "A");
    assert_eq!(map.overview().visible_layer().label(), "B");

    map.set_base_layer("C").unwrap();
    assert_eq!(map.overview().visible_layer().label(), "A");
}

#[test]
fn test_rotation_from_first_layer() {
    let requests: Vec<LayerRequest> = ["A", "B", "C"]
        .iter()
        .enumerate()
        .map(|(i, label)| {
            LayerRequest::BaseRaster(RasterLayerOptions {
                source: RasterSource::OpenStreetMap,
                label: label.to_string(),
                short_label: None,
                visible: i == 0,
            })
        })
        .collect();
    let mut engine = HeadlessEngine::default();
    let mut map = MapBuilder::new(MapConfig::default())
        .with_layers(requests)
        .build(&mut engine)
        .unwrap();

    assert_eq!(map.overview().visible_layer().label(), "B");
    assert_eq!(map.rotate_base_layer().label(), "B");
    assert_eq!(map.overview().visible_layer().label(), "C");
    assert_eq!(map.rotate_base_layer().label(), "C");
    assert_eq!(map.overview().visible_layer().label(), "A");
}

#[test]
fn test_overview_index_tracks_rotations() {
    let mut engine = HeadlessEngine::default();
    let mut map = abc_map(&mut engine);
    let n = map.layers().base_count();
    let initial = map.layers().visible_base_index();
    for k in 1..=2 * n {
        map.rotate_base_layer();
        assert_eq!(map.overview().visible_index(), (initial + k + 1) % n);
        let shown = map.overview().layers().iter().filter(|l| l.is_visible()).count();
        assert_eq!(shown, 1);
    }
}

#[test]
fn test_overview_recenters_after_main_settles() {
    let mut engine = HeadlessEngine::default();
    let mut map = abc_map(&mut engine);
    let overview_zoom = map.overview().zoom();

    map.set_center(
        Coordinate::new(-122.5, 45.4),
        Some(16.0),
        Crs::Geographic,
        Duration::from_millis(200),
    );
    map.advance(Duration::from_millis(100));
    let before = map.overview().center(Crs::Native);
    assert_ne!(before, map.center(Crs::Native));

    // The main view settles here; the overview starts following.
    map.advance(Duration::from_millis(100));
    assert!(map.overview().is_animating());

    map.advance(Duration::from_millis(500));
    assert!(!map.overview().is_animating());
    assert_eq!(map.overview().center(Crs::Native), map.center(Crs::Native));
    assert_eq!(map.overview().zoom(), overview_zoom);

    let frame = engine.log().last_frame(SurfaceRole::Overview).unwrap();
    assert_eq!(frame.visible_labels(), vec!["C"]);
    assert_eq!(frame.zoom, overview_zoom);
}

#[test]
fn test_overview_ignores_main_zoom() {
    let mut engine = HeadlessEngine::default();
    let mut map = abc_map(&mut engine);
    let overview_zoom = map.overview().zoom();
    map.set_zoom(5.0, Duration::ZERO);
    map.advance(Duration::from_secs(1));
    assert_eq!(map.overview().zoom(), overview_zoom);
}

#[test]
fn test_overview_without_target_stays_unmounted() {
    let mut engine = HeadlessEngine::default();
    let mut map = MapBuilder::standard(MapConfig::default())
        .build(&mut engine)
        .unwrap();
    map.attach("map", None).unwrap();
    map.pump();
    assert!(!map.overview().is_attached());
    assert!(engine.log().last_frame(SurfaceRole::Overview).is_none());
}

#[test]
fn test_overview_follow_starts_from_its_first_frame() {
    let mut engine = HeadlessEngine::default();
    let mut map = abc_map(&mut engine);
    map.advance(Duration::from_secs(1));
    let start = map.overview().center(Crs::Native);

    map.set_center(Coordinate::new(-122.5, 45.4), None, Crs::Geographic, Duration::ZERO);
    let target = map.center(Crs::Native);

    // One coarse tick settles the main view; the overview only starts moving.
    map.advance(Duration::from_millis(200));
    assert!(map.overview().is_animating());
    assert_eq!(map.overview().center(Crs::Native), start);

    map.advance(Duration::from_millis(100));
    let midway = map.overview().center(Crs::Native);
    assert!(midway.x > start.x && midway.x < target.x);

    map.advance(Duration::from_millis(200));
    assert_eq!(map.overview().center(Crs::Native), target);
}
