//! The map controller: layers, the main view, the overview and listeners.
//!
//! Everything runs on the thread that owns the controller. Work arriving from
//! elsewhere (feature responses, engine notifications) is posted to the
//! channel returned by [`MapController::event_sender`] and handled inside
//! [`MapController::advance`].

use crate::animation::transition::AnimationHandle;
use crate::core::config::MapConfig;
use crate::core::extent::Extent;
use crate::core::geo::{transform, Coordinate, Crs, Pixel, Size};
use crate::core::view::ViewController;
use crate::engine::{Frame, RenderEngine, RenderStatus, RenderSurface, SurfaceRole};
use crate::geolocation::{GeolocationSample, LocationFilter};
use crate::input::events::{EventKind, Inbound, MapEvent};
use crate::input::listeners::{self, Handler, ListenerRegistry, Subscription};
use crate::input::router::{FeatureListener, FeatureRoute, HitContext};
use crate::layers::base::{Layer, LayerId, LayerKind};
use crate::layers::feature::{Feature, FeatureId, FeatureRequest};
use crate::layers::manager::LayerSet;
use crate::overview::OverviewSynchronizer;
use crate::traits::ViewportAware;
use crate::{MapError, Result};
use crossbeam_channel::{Receiver, Sender};
use instant::Instant;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Result of a selection request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionStatus {
    /// Every requested feature is selected.
    Applied,
    /// Some features are not loaded yet; selection is retried after each
    /// render until they are.
    Pending { missing: Vec<FeatureId> },
}

#[derive(Debug)]
struct PendingSelection {
    layer: LayerId,
    ids: Vec<FeatureId>,
    attempts: u32,
}

pub struct MapController {
    config: MapConfig,
    view: ViewController,
    layers: LayerSet,
    overview: OverviewSynchronizer,
    surface: Box<dyn RenderSurface>,
    attached: bool,
    registry: Rc<RefCell<ListenerRegistry>>,
    clock: Duration,
    last_tick: Option<Instant>,
    inbound_tx: Sender<Inbound>,
    inbound_rx: Receiver<Inbound>,
    selected: Vec<FeatureId>,
    pending_selection: Option<PendingSelection>,
    location_filter: LocationFilter,
    needs_render: bool,
    settle_pending: bool,
}

impl MapController {
    /// Wires layers, the main view and the overview to surfaces of `engine`.
    pub fn new(config: MapConfig, layers: Vec<Layer>, engine: &mut dyn RenderEngine) -> Result<Self> {
        config.validate()?;
        let layers = LayerSet::new(layers)?;
        let center = transform(config.initial_center, Crs::Geographic, Crs::Native);
        let view = ViewController::new(center, config.initial_zoom, config.min_zoom, config.max_zoom)?
            .with_constrained_resolution(config.constrain_resolution)
            .with_easing(config.easing);
        let overview = OverviewSynchronizer::new(
            &layers,
            center,
            config.overview_zoom,
            config.overview_animation(),
            engine.create_surface(SurfaceRole::Overview),
        );
        let surface = engine.create_surface(SurfaceRole::Main);
        let (inbound_tx, inbound_rx) = crossbeam_channel::unbounded();

        log::info!(
            "map created with {} layers, base layer {:?}",
            layers.len(),
            layers.visible_base().label()
        );

        Ok(Self {
            location_filter: LocationFilter::new(config.location_accuracy_threshold),
            config,
            view,
            layers,
            overview,
            surface,
            attached: false,
            registry: Rc::new(RefCell::new(ListenerRegistry::new())),
            clock: Duration::ZERO,
            last_tick: None,
            inbound_tx,
            inbound_rx,
            selected: Vec::new(),
            pending_selection: None,
            needs_render: true,
            settle_pending: false,
        })
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn view(&self) -> &ViewController {
        &self.view
    }

    pub fn layers(&self) -> &LayerSet {
        &self.layers
    }

    pub fn overview(&self) -> &OverviewSynchronizer {
        &self.overview
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Time elapsed on the controller's clock.
    pub fn clock(&self) -> Duration {
        self.clock
    }

    // --- lifecycle ---------------------------------------------------------------------------

    /// Mounts the main view on `target` and, if given, the overview on
    /// `overview_target`.
    pub fn attach(&mut self, target: &str, overview_target: Option<&str>) -> Result<()> {
        if self.attached {
            return Err(MapError::InvalidConfig(format!(
                "map is already attached, cannot attach to {:?}",
                target
            )));
        }
        self.surface.mount(target)?;
        for layer in self.layers.iter_mut() {
            layer.source = Some(self.surface.register_layer(layer));
        }
        if let Some(overview_target) = overview_target {
            if let Err(e) = self.overview.attach(overview_target) {
                self.surface.unmount();
                return Err(e);
            }
        }
        self.attached = true;
        self.needs_render = true;
        self.settle_pending = true;
        log::info!("map attached to {:?}", target);
        Ok(())
    }

    /// Releases every listener, drops pending debounced deliveries and
    /// selection retries, stops animations and unmounts the surfaces.
    ///
    /// Queued events are dropped. Feature responses already posted are still
    /// stored, and requests nobody took are forgotten so the next attach asks
    /// for those areas again. Safe to call when not attached.
    pub fn detach(&mut self) {
        let released = self.registry.borrow_mut().clear();
        self.pending_selection = None;
        self.view.cancel_animations();
        self.overview.detach();
        while let Ok(message) = self.inbound_rx.try_recv() {
            if let Inbound::Features { request, result } = message {
                self.receive_features(&request, result);
            }
        }
        for remote in self.layers.iter_mut().filter_map(|l| l.remote_mut()) {
            remote.abandon_queued();
        }
        if self.attached {
            self.surface.unmount();
            self.attached = false;
            log::info!("map detached, released {} listeners", released);
        }
    }

    // --- listeners ---------------------------------------------------------------------------

    pub fn on<F>(&mut self, kind: EventKind, callback: F) -> Subscription
    where
        F: FnMut(&MapEvent) + 'static,
    {
        self.subscribe(kind, false, Handler::Event(Box::new(callback)))
    }

    /// Like [`on`](Self::on), released after the first delivery.
    pub fn once<F>(&mut self, kind: EventKind, callback: F) -> Subscription
    where
        F: FnMut(&MapEvent) + 'static,
    {
        self.subscribe(kind, true, Handler::Event(Box::new(callback)))
    }

    /// Routes `kind` pointer events through hit-testing to `listener`.
    pub fn add_feature_listener(&mut self, kind: EventKind, listener: FeatureListener) -> Result<Subscription> {
        if !kind.is_pointer() {
            return Err(MapError::InvalidConfig(format!(
                "feature listeners need a pointer event, got {}",
                kind
            )));
        }
        let only = listener
            .layer_filter()
            .map(|label| self.layers.find(label).map(|l| l.id()))
            .transpose()?;
        let route = FeatureRoute::new(listener, only);
        Ok(self.subscribe(kind, false, Handler::Feature(route)))
    }

    pub fn listener_count(&self) -> usize {
        self.registry.borrow().len()
    }

    fn subscribe(&mut self, kind: EventKind, once: bool, handler: Handler) -> Subscription {
        let key = self.registry.borrow_mut().register(kind, once, handler);
        Subscription::new(key, kind, &self.registry)
    }

    // --- event loop --------------------------------------------------------------------------

    /// Sender for events and feature responses produced off the controller's thread.
    pub fn event_sender(&self) -> Sender<Inbound> {
        self.inbound_tx.clone()
    }

    /// Delivers an event to listeners right away.
    pub fn handle_event(&mut self, event: MapEvent) {
        if let MapEvent::RenderComplete = event {
            self.retry_selection();
        }
        let tester = HitContext {
            layers: &self.layers,
            view: &self.view,
            size: self.size(),
            tolerance_px: self.config.hit_tolerance_px,
        };
        listeners::dispatch(&self.registry, &event, self.clock, &tester);
    }

    /// Moves the clock forward by `dt` and runs everything that became due.
    pub fn advance(&mut self, dt: Duration) {
        self.clock += dt;
        self.drain_inbound();

        self.view.advance(dt);
        // The overview steps before it is told to follow, so a follow started
        // in this tick begins from its first frame.
        self.overview.advance(dt);
        let settled = self.view.take_move_end() || std::mem::take(&mut self.settle_pending);
        if settled {
            self.on_move_end();
        }

        let tester = HitContext {
            layers: &self.layers,
            view: &self.view,
            size: self.size(),
            tolerance_px: self.config.hit_tolerance_px,
        };
        listeners::fire_due(&self.registry, self.clock, &tester);

        self.render();
    }

    /// Advances by the wall-clock time since the previous tick.
    pub fn tick(&mut self) {
        let now = Instant::now();
        let dt = self
            .last_tick
            .map(|last| now.duration_since(last))
            .unwrap_or_default();
        self.last_tick = Some(now);
        self.advance(dt);
    }

    /// Processes pending work without moving the clock.
    pub fn pump(&mut self) {
        self.advance(Duration::ZERO);
    }

    fn drain_inbound(&mut self) {
        while let Ok(message) = self.inbound_rx.try_recv() {
            match message {
                Inbound::Event(event) => self.handle_event(event),
                Inbound::Features { request, result } => self.receive_features(&request, result),
            }
        }
    }

    fn receive_features(&mut self, request: &FeatureRequest, result: Result<Vec<Feature>>) {
        match result {
            Ok(features) => {
                if let Err(e) = self.load_features(request, features) {
                    log::warn!("dropping features for {}: {}", request.url, e);
                }
            }
            Err(e) => {
                log::warn!("feature request {} failed: {}", request.url, e);
                self.feature_request_failed(request);
            }
        }
    }

    fn on_move_end(&mut self) {
        let center = self.view.center(Crs::Native);
        let zoom = self.view.zoom();
        self.overview.follow(center);

        if let Some(extent) = self.view.extent(self.size(), Crs::Native) {
            let resolution = self.view.resolution();
            for remote in self.layers.iter_mut().filter_map(|l| l.remote_mut()) {
                remote.on_view_settled(&extent, resolution, zoom);
            }
        }

        self.needs_render = true;
        self.handle_event(MapEvent::MoveEnd { center, zoom });
    }

    fn render(&mut self) {
        if !self.attached || !(self.needs_render || self.view.is_animating()) {
            return;
        }
        let frame = Frame::capture(SurfaceRole::Main, &self.view, self.size(), self.layers.iter());
        let status = self.surface.render(&frame);
        self.needs_render = false;
        if status == RenderStatus::Complete && !self.view.is_animating() {
            self.handle_event(MapEvent::RenderComplete);
        }
    }

    // --- view --------------------------------------------------------------------------------

    pub fn center(&self, crs: Crs) -> Coordinate {
        self.view.center(crs)
    }

    pub fn zoom(&self) -> f64 {
        self.view.zoom()
    }

    pub fn resolution(&self) -> f64 {
        self.view.resolution()
    }

    /// Size of the main surface; `None` until attached.
    pub fn size(&self) -> Option<Size> {
        if self.attached {
            self.surface.size()
        } else {
            None
        }
    }

    /// Visible extent; `None` until attached.
    pub fn extent(&self, crs: Crs) -> Option<Extent> {
        self.view.extent(self.size(), crs)
    }

    pub fn set_center(
        &mut self,
        center: Coordinate,
        zoom: Option<f64>,
        crs: Crs,
        duration: Duration,
    ) -> AnimationHandle {
        self.needs_render = true;
        self.view.set_center(center, zoom, crs, duration)
    }

    /// Animated recentering with the configured duration.
    pub fn pan_to(&mut self, center: Coordinate, crs: Crs) -> AnimationHandle {
        let duration = self.config.animation_duration();
        self.set_center(center, None, crs, duration)
    }

    pub fn set_zoom(&mut self, zoom: f64, duration: Duration) -> AnimationHandle {
        self.needs_render = true;
        self.view.set_zoom(zoom, duration)
    }

    pub fn zoom_in(&mut self) -> AnimationHandle {
        let duration = self.config.animation_duration();
        self.needs_render = true;
        self.view.zoom_in(duration)
    }

    pub fn zoom_out(&mut self) -> AnimationHandle {
        let duration = self.config.animation_duration();
        self.needs_render = true;
        self.view.zoom_out(duration)
    }

    /// Animates back to the configured initial center and zoom.
    pub fn reset_view(&mut self) -> AnimationHandle {
        let duration = self.config.animation_duration();
        let (center, zoom) = (self.config.initial_center, self.config.initial_zoom);
        self.set_center(center, Some(zoom), Crs::Geographic, duration)
    }

    /// Fits `extent` inside the viewport inset by `padding_px`.
    ///
    /// Fails with [`MapError::ViewportNotAttached`] before the first attach.
    pub fn fit_extent(&mut self, extent: &Extent, padding_px: f64, duration: Duration) -> Result<AnimationHandle> {
        let size = self.size();
        let handle = self.view.fit_extent(extent, padding_px, size, duration)?;
        self.needs_render = true;
        Ok(handle)
    }

    pub fn coordinate_from_pixel(&self, pixel: Pixel, crs: Crs) -> Option<Coordinate> {
        self.view
            .coordinate_from_pixel(pixel, self.size())
            .map(|c| transform(c, Crs::Native, crs))
    }

    pub fn pixel_from_coordinate(&self, coord: Coordinate, crs: Crs) -> Option<Pixel> {
        self.view
            .pixel_from_coordinate(transform(coord, crs, Crs::Native), self.size())
    }

    pub fn pixel_from_feature(&self, feature: &Feature) -> Option<Pixel> {
        self.pixel_from_coordinate(feature.anchor()?, Crs::Native)
    }

    // --- base layers -------------------------------------------------------------------------

    /// Shows the next base layer and moves the overview one further ahead.
    pub fn rotate_base_layer(&mut self) -> &Layer {
        let index = self.layers.rotate_base();
        self.overview.show_after(index);
        self.needs_render = true;
        let base = self.layers.visible_base();
        log::info!("base layer rotated to {:?}", base.label());
        base
    }

    pub fn set_base_layer(&mut self, label: &str) -> Result<()> {
        let index = self.layers.base_index_of(label)?;
        self.layers.set_visible_base(index);
        self.overview.show_after(index);
        self.needs_render = true;
        log::info!("base layer set to {:?}", label);
        Ok(())
    }

    pub fn base_layer(&self) -> &Layer {
        self.layers.visible_base()
    }

    /// The base layer a rotation would show.
    pub fn next_base_layer(&self) -> &Layer {
        self.layers.base_after(1)
    }

    // --- features ----------------------------------------------------------------------------

    pub fn find_layer(&self, label: &str) -> Result<&Layer> {
        self.layers.find(label)
    }

    pub fn selected_features(&self) -> &[FeatureId] {
        &self.selected
    }

    /// Features still waiting to be loaded before they can be selected.
    pub fn pending_selection(&self) -> Option<&[FeatureId]> {
        self.pending_selection.as_ref().map(|p| p.ids.as_slice())
    }

    /// Selects exactly `ids` on the configured selection layer.
    ///
    /// Features not loaded yet are selected once they arrive: the whole pass
    /// is repeated after every render until all are found, the selection is
    /// replaced or cancelled, or `max_selection_retries` is exhausted.
    pub fn set_selected_features<I, T>(&mut self, ids: I) -> Result<SelectionStatus>
    where
        I: IntoIterator<Item = T>,
        T: Into<FeatureId>,
    {
        let layer = self.layers.find(&self.config.selection_layer)?;
        if layer.remote().is_none() {
            return Err(MapError::InvalidConfig(format!(
                "selection layer {:?} is not a feature layer",
                layer.label()
            )));
        }
        let layer = layer.id();
        let ids: Vec<FeatureId> = ids.into_iter().map(Into::into).collect();

        self.pending_selection = None;
        let missing = self.apply_selection(layer, &ids);
        if missing.is_empty() {
            return Ok(SelectionStatus::Applied);
        }
        log::debug!("{} selected features not loaded yet, waiting", missing.len());
        self.pending_selection = Some(PendingSelection {
            layer,
            ids,
            attempts: 0,
        });
        Ok(SelectionStatus::Pending { missing })
    }

    /// Stops waiting for unloaded selected features.
    pub fn cancel_pending_selection(&mut self) -> bool {
        self.pending_selection.take().is_some()
    }

    fn retry_selection(&mut self) {
        let Some(mut pending) = self.pending_selection.take() else {
            return;
        };
        pending.attempts += 1;
        let missing = self.apply_selection(pending.layer, &pending.ids);
        if missing.is_empty() {
            log::debug!("selection resolved after {} retries", pending.attempts);
            return;
        }
        if let Some(max) = self.config.max_selection_retries {
            if pending.attempts >= max {
                log::warn!(
                    "giving up selecting {:?} after {} retries",
                    missing,
                    pending.attempts
                );
                return;
            }
        }
        self.pending_selection = Some(pending);
    }

    /// Applies the selection; returns the ids that are not loaded.
    fn apply_selection(&mut self, layer: LayerId, ids: &[FeatureId]) -> Vec<FeatureId> {
        let Some(store) = self
            .layers
            .get_mut(layer)
            .and_then(|l| l.remote_mut())
            .map(|r| r.store_mut())
        else {
            return ids.to_vec();
        };

        let mut changed = false;
        for previous in &self.selected {
            if !ids.contains(previous) {
                changed |= store.set_selected(previous, false);
            }
        }

        let mut selected = Vec::with_capacity(ids.len());
        let mut missing = Vec::new();
        for id in ids {
            if store.contains(id) {
                changed |= store.set_selected(id, true);
                if !selected.contains(id) {
                    selected.push(id.clone());
                }
            } else {
                missing.push(id.clone());
            }
        }

        self.selected = selected;
        if changed {
            self.needs_render = true;
        }
        missing
    }

    /// Collects fetches planned by feature layers since the last call.
    pub fn take_feature_requests(&mut self) -> Vec<FeatureRequest> {
        self.layers
            .iter_mut()
            .filter_map(|l| l.remote_mut())
            .flat_map(|remote| remote.take_requests())
            .collect()
    }

    /// Hands the response of `request` to its layer; returns how many
    /// features were new.
    pub fn load_features(&mut self, request: &FeatureRequest, features: Vec<Feature>) -> Result<usize> {
        let layer = self.layers.find_mut(&request.layer)?;
        let label = layer.label().to_string();
        let remote = layer
            .remote_mut()
            .ok_or_else(|| MapError::InvalidConfig(format!("{:?} is not a feature layer", label)))?;
        let added = remote.receive(request, features);
        self.needs_render = true;
        Ok(added)
    }

    pub fn feature_request_failed(&mut self, request: &FeatureRequest) {
        if let Ok(layer) = self.layers.find_mut(&request.layer) {
            if let Some(remote) = layer.remote_mut() {
                remote.request_failed(request);
            }
        }
    }

    // --- user location -----------------------------------------------------------------------

    fn user_location_layer(&mut self) -> Result<&mut Layer> {
        self.layers
            .iter_mut()
            .find(|l| matches!(l.kind(), LayerKind::UserLocation(_)))
            .ok_or_else(|| MapError::LayerNotFound("user location".to_string()))
    }

    /// Shows the marker at the sample's position, or hides it when the
    /// sample has none.
    pub fn show_user_location(&mut self, sample: &GeolocationSample) -> Result<()> {
        let layer = self.user_location_layer()?;
        let visible = sample.position.is_some();
        if let Some(marker) = layer.location_mut() {
            match sample.position {
                Some(position) => marker.show(position, sample.accuracy),
                None => marker.clear(),
            }
        }
        layer.visible = visible;
        self.needs_render = true;
        Ok(())
    }

    pub fn hide_user_location(&mut self) -> Result<()> {
        self.show_user_location(&GeolocationSample::lost())
    }

    /// Shows `sample` unless its accuracy is above the configured
    /// threshold, then notifies `PositionChange` listeners; returns whether
    /// it was shown.
    pub fn handle_location(&mut self, sample: &GeolocationSample) -> Result<bool> {
        if !self.location_filter.accepts(sample) {
            log::debug!(
                "discarding location fix with accuracy {:?} m (threshold {} m)",
                sample.accuracy,
                self.location_filter.threshold()
            );
            return Ok(false);
        }
        self.show_user_location(sample)?;
        self.handle_event(MapEvent::PositionChange(*sample));
        Ok(true)
    }

    /// Native position of the user-location marker, if shown.
    pub fn user_location(&self) -> Option<Coordinate> {
        self.layers.iter().find_map(|l| match l.kind() {
            LayerKind::UserLocation(marker) if l.is_visible() => marker.position(),
            _ => None,
        })
    }
}

impl std::fmt::Debug for MapController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapController")
            .field("view", &self.view)
            .field("base_layer", &self.base_layer().label())
            .field("attached", &self.attached)
            .field("listeners", &self.listener_count())
            .finish()
    }
}
