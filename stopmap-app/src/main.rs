use anyhow::Context;
use std::time::Duration;
use stopmap::{
    data::fulfill,
    input::Inbound,
    EventKind, FeatureHit, FeatureId, FeatureListener, HeadlessEngine, HttpFeatureFetcher,
    MapBuilder, MapConfig, MapEvent, Pixel, PointerEvent, SelectionStatus,
};

const FRAME: Duration = Duration::from_millis(16);
const RUN_FOR: Duration = Duration::from_secs(5);

/// Drives a stop map against a headless engine: loads stops for the initial
/// view, selects the stop ids given on the command line and reports clicks.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    stopmap::init_logging();

    let config = MapConfig::from_env().context("reading STOPMAP_* configuration")?;
    let mut engine = HeadlessEngine::default();
    let mut map = MapBuilder::standard(config)
        .build(&mut engine)
        .context("building map")?;
    map.attach("map", Some("overview"))?;

    let fetcher = HttpFeatureFetcher::new()?.with_id_prefix(stopmap::constants::STOP_FEATURE_PREFIX);
    let events = map.event_sender();

    let _moves = map.on(EventKind::MoveEnd, |event| {
        if let MapEvent::MoveEnd { center, zoom } = event {
            log::info!("view settled at {:?}, zoom {:.2}", center, zoom);
        }
    });
    let _clicks = map.add_feature_listener(
        EventKind::SingleClick,
        FeatureListener::new(|hit: &FeatureHit| {
            let name = hit
                .feature
                .property("name")
                .and_then(|n| n.as_str())
                .unwrap_or("unnamed");
            log::info!("clicked {} ({}) on {}", hit.feature.id, name, hit.layer_label);
        })
        .only_layer("Stops")
        .on_miss(|event: &PointerEvent| log::info!("nothing at {:?}", event.pixel)),
    )?;

    let ids: Vec<FeatureId> = std::env::args().skip(1).map(FeatureId::stop).collect();
    if !ids.is_empty() {
        match map.set_selected_features(ids)? {
            SelectionStatus::Applied => log::info!("selection applied"),
            SelectionStatus::Pending { missing } => {
                log::info!("waiting for {} stops to load", missing.len())
            }
        }
    }

    if let Some(size) = map.size() {
        let center = Pixel::new(size.width / 2.0, size.height / 2.0);
        let click = PointerEvent::new(EventKind::SingleClick, center);
        events.send(Inbound::Event(MapEvent::Pointer(click)))?;
    }

    let mut elapsed = Duration::ZERO;
    while elapsed < RUN_FOR {
        tokio::time::sleep(FRAME).await;
        map.tick();
        let requests = map.take_feature_requests();
        if !requests.is_empty() {
            let delivered = fulfill(&fetcher, requests, &events).await;
            log::debug!("delivered {} feature responses", delivered);
        }
        elapsed += FRAME;
    }

    log::info!(
        "selected {:?}, base layer {:?}, {} frames rendered",
        map.selected_features(),
        map.base_layer().label(),
        engine.log().frame_count(stopmap::SurfaceRole::Main)
    );
    map.detach();
    Ok(())
}
