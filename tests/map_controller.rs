use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use stopmap::prelude::*;

fn config() -> MapConfig {
    MapConfig {
        initial_zoom: 15.0,
        ..MapConfig::default()
    }
}

/// A standard map mounted on a headless engine, with its first move settled.
fn attached_map() -> (MapController, HeadlessEngine) {
    let mut engine = HeadlessEngine::default();
    let mut map = MapBuilder::standard(config()).build(&mut engine).unwrap();
    map.attach("map", Some("overview")).unwrap();
    map.pump();
    (map, engine)
}

fn close(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}

#[test]
fn test_zoom_is_clamped_to_limits() {
    let (mut map, _) = attached_map();

    map.set_zoom(30.0, Duration::ZERO);
    assert_eq!(map.zoom(), map.config().max_zoom);

    map.set_zoom(-3.0, Duration::ZERO);
    assert_eq!(map.zoom(), map.config().min_zoom);

    // Zooming out at the limit is a no-op that still resolves.
    let mut handle = map.zoom_out();
    assert_eq!(handle.try_outcome(), Some(AnimationOutcome::Completed));
    assert_eq!(map.zoom(), map.config().min_zoom);
}

#[test]
fn test_zero_duration_set_center_is_synchronous() {
    let (mut map, _) = attached_map();
    let moves = Rc::new(RefCell::new(Vec::new()));
    let sink = moves.clone();
    let _sub = map.on(EventKind::MoveEnd, move |event| {
        if let MapEvent::MoveEnd { zoom, .. } = event {
            sink.borrow_mut().push(*zoom);
        }
    });

    let target = Coordinate::new(-122.6, 45.5);
    let mut handle = map.set_center(target, Some(13.0), Crs::Geographic, Duration::ZERO);
    assert_eq!(handle.try_outcome(), Some(AnimationOutcome::Completed));

    let center = map.center(Crs::Geographic);
    assert!(close(center.x, target.x, 1e-9));
    assert!(close(center.y, target.y, 1e-9));
    assert_eq!(map.zoom(), 13.0);

    map.pump();
    map.pump();
    assert_eq!(*moves.borrow(), vec![13.0]);
}

#[test]
fn test_set_center_on_native_origin() {
    let (mut map, _) = attached_map();
    map.set_center(Coordinate::new(0.0, 0.0), Some(10.0), Crs::Native, Duration::ZERO);
    assert!(!map.view().is_animating());
    assert_eq!(map.center(Crs::Native), Coordinate::new(0.0, 0.0));
    assert_eq!(map.zoom(), 10.0);
}

#[test]
fn test_animated_change_supersedes_previous() {
    let (mut map, _) = attached_map();
    let mut first = map.set_center(
        Coordinate::new(-122.6, 45.5),
        None,
        Crs::Geographic,
        Duration::from_millis(250),
    );
    map.advance(Duration::from_millis(100));
    assert!(first.is_pending());

    let second = map.pan_to(Coordinate::new(-122.7, 45.6), Crs::Geographic);
    assert_eq!(first.try_outcome(), Some(AnimationOutcome::Superseded));

    map.advance(Duration::from_millis(300));
    assert_eq!(
        futures::executor::block_on(second),
        AnimationOutcome::Completed
    );
    let center = map.center(Crs::Geographic);
    assert!(close(center.x, -122.7, 1e-9));
    assert!(close(center.y, 45.6, 1e-9));
}

#[test]
fn test_pixel_coordinate_round_trip() {
    let (map, _) = attached_map();
    let coord = Coordinate::new(-122.65, 45.53);
    let pixel = map.pixel_from_coordinate(coord, Crs::Geographic).unwrap();
    let back = map.coordinate_from_pixel(pixel, Crs::Geographic).unwrap();
    assert!(close(back.x, coord.x, 1e-9));
    assert!(close(back.y, coord.y, 1e-9));

    let center = map.pixel_from_coordinate(map.center(Crs::Native), Crs::Native).unwrap();
    assert!(close(center.x, 400.0, 1e-6));
    assert!(close(center.y, 300.0, 1e-6));
}

#[test]
fn test_conversions_need_a_mounted_surface() {
    let mut engine = HeadlessEngine::default();
    let map = MapBuilder::standard(config()).build(&mut engine).unwrap();
    assert!(map.size().is_none());
    assert!(map.extent(Crs::Native).is_none());
    assert!(map
        .coordinate_from_pixel(Pixel::new(10.0, 10.0), Crs::Native)
        .is_none());
}

#[test]
fn test_fit_extent_makes_extent_visible() {
    let (mut map, _) = attached_map();
    let target = Extent::geographic(-122.75, 45.45, -122.55, 45.60).unwrap();
    map.fit_extent(&target, 20.0, Duration::ZERO).unwrap();

    let visible = map.extent(Crs::Native).unwrap();
    assert!(visible.contains_extent(&target.to_crs(Crs::Native)));
    assert_eq!(map.zoom().fract(), 0.0);

    let center = map.center(Crs::Native);
    let expected = target.to_crs(Crs::Native).center();
    assert!(close(center.x, expected.x, 1e-6));
    assert!(close(center.y, expected.y, 1e-6));
}

#[test]
fn test_fit_extent_before_attach_fails() {
    let mut engine = HeadlessEngine::default();
    let mut map = MapBuilder::standard(config()).build(&mut engine).unwrap();
    let target = Extent::geographic(-122.75, 45.45, -122.55, 45.60).unwrap();
    assert!(matches!(
        map.fit_extent(&target, 0.0, Duration::ZERO),
        Err(MapError::ViewportNotAttached)
    ));
}

#[test]
fn test_rotation_keeps_one_visible_base_layer() {
    let (mut map, _) = attached_map();
    let start = map.base_layer().label().to_string();
    let count = map.layers().base_count();
    assert_eq!(count, 3);

    for _ in 0..count {
        let shown = map.rotate_base_layer().label().to_string();
        let visible: Vec<_> = map.layers().base_layers().filter(|l| l.is_visible()).collect();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].label(), shown);
    }
    assert_eq!(map.base_layer().label(), start);
}

#[test]
fn test_set_base_layer_by_label() {
    let (mut map, _) = attached_map();
    map.set_base_layer("OpenStreetMap").unwrap();
    assert_eq!(map.base_layer().short_label(), "OSM");
    assert_eq!(map.next_base_layer().label(), "Map");
    assert!(matches!(
        map.set_base_layer("Stops"),
        Err(MapError::LayerNotFound(_))
    ));
}

#[test]
fn test_render_frames_reach_the_engine() {
    let (mut map, engine) = attached_map();
    map.rotate_base_layer();
    map.pump();
    let frame = engine.log().last_frame(SurfaceRole::Main).unwrap();
    assert_eq!(frame.visible_labels(), vec!["Satellite", "Stops"]);
    assert!(engine.log().is_mounted(SurfaceRole::Overview));
}

#[test]
fn test_detach_releases_every_listener() {
    let (mut map, engine) = attached_map();
    let calls = Rc::new(RefCell::new(0));
    for kind in [EventKind::MoveEnd, EventKind::RenderComplete, EventKind::Click] {
        let calls = calls.clone();
        map.on(kind, move |_| *calls.borrow_mut() += 1);
    }
    let counted = calls.clone();
    let sub = map
        .add_feature_listener(
            EventKind::SingleClick,
            FeatureListener::new(|_| {})
                .on_miss(move |_| *counted.borrow_mut() += 1)
                .debounce(Duration::from_millis(50)),
        )
        .unwrap();
    map.handle_event(MapEvent::Pointer(PointerEvent::new(
        EventKind::SingleClick,
        Pixel::new(5.0, 5.0),
    )));
    assert_eq!(map.listener_count(), 4);

    map.detach();
    assert_eq!(map.listener_count(), 0);
    assert!(!sub.is_active());
    assert!(!engine.log().is_mounted(SurfaceRole::Main));

    map.handle_event(MapEvent::MoveEnd {
        center: Coordinate::default(),
        zoom: 3.0,
    });
    map.handle_event(MapEvent::Pointer(PointerEvent::click(1.0, 1.0)));
    map.advance(Duration::from_secs(1));
    assert_eq!(*calls.borrow(), 0);

    // A second detach is harmless.
    map.detach();
}

#[test]
fn test_attach_twice_is_rejected() {
    let (mut map, _) = attached_map();
    assert!(matches!(
        map.attach("elsewhere", None),
        Err(MapError::InvalidConfig(_))
    ));
}

#[test]
fn test_once_listener_fires_once() {
    let (mut map, _) = attached_map();
    let calls = Rc::new(RefCell::new(0));
    let counter = calls.clone();
    let sub = map.once(EventKind::MoveEnd, move |_| *counter.borrow_mut() += 1);

    map.set_zoom(14.0, Duration::ZERO);
    map.pump();
    map.set_zoom(13.0, Duration::ZERO);
    map.pump();

    assert_eq!(*calls.borrow(), 1);
    assert!(!sub.is_active());
}

#[test]
fn test_released_subscription_stops_delivery() {
    let (mut map, _) = attached_map();
    let calls = Rc::new(RefCell::new(0));
    let counter = calls.clone();
    let sub = map.on(EventKind::RenderComplete, move |_| *counter.borrow_mut() += 1);

    map.set_zoom(14.0, Duration::ZERO);
    map.pump();
    assert_eq!(*calls.borrow(), 1);

    assert!(sub.release());
    assert!(!sub.release());
    map.set_zoom(13.0, Duration::ZERO);
    map.pump();
    assert_eq!(*calls.borrow(), 1);
}

#[test]
fn test_user_location_respects_accuracy_threshold() {
    let (mut map, _) = attached_map();
    assert!(map.user_location().is_none());
    let fixes = Rc::new(RefCell::new(Vec::new()));
    let sink = fixes.clone();
    let _sub = map.on(EventKind::PositionChange, move |event| {
        if let MapEvent::PositionChange(sample) = event {
            sink.borrow_mut().push(sample.accuracy);
        }
    });

    let vague = GeolocationSample::from_lon_lat(-122.67, 45.52, Some(1_000.0));
    assert!(!map.handle_location(&vague).unwrap());
    assert!(map.user_location().is_none());

    let precise = GeolocationSample::from_lon_lat(-122.67, 45.52, Some(15.0));
    assert!(map.handle_location(&precise).unwrap());
    assert_eq!(map.user_location(), precise.position);
    assert!(map.find_layer("User Location").unwrap().is_visible());
    assert_eq!(*fixes.borrow(), vec![Some(15.0)]);

    map.hide_user_location().unwrap();
    assert!(map.user_location().is_none());
    assert!(!map.find_layer("User Location").unwrap().is_visible());
}

#[test]
fn test_reset_view_returns_to_initial_position() {
    let (mut map, _) = attached_map();
    map.set_center(Coordinate::new(-100.0, 40.0), Some(8.0), Crs::Geographic, Duration::ZERO);
    let handle = map.reset_view();
    map.advance(Duration::from_millis(300));
    assert_eq!(
        futures::executor::block_on(handle),
        AnimationOutcome::Completed
    );
    assert_eq!(map.zoom(), 15.0);
    let center = map.center(Crs::Geographic);
    assert!(close(center.x, -122.67, 1e-9));
    assert!(close(center.y, 45.52, 1e-9));
}
