//! The overview mini-map.
//!
//! A fixed-zoom, non-interactive view over copies of the main map's base
//! layers. It shows the base layer one position after the main map's, and
//! re-centers on the main view whenever that view settles. All mutation goes
//! through the owning controller.

use crate::animation::transition::AnimationHandle;
use crate::core::geo::{Coordinate, Crs, Size};
use crate::core::view::ViewController;
use crate::engine::{Frame, RenderStatus, RenderSurface, SurfaceRole};
use crate::layers::base::Layer;
use crate::layers::manager::LayerSet;
use crate::Result;
use std::time::Duration;

pub struct OverviewSynchronizer {
    view: ViewController,
    layers: Vec<Layer>,
    shown: usize,
    animation: Duration,
    surface: Box<dyn RenderSurface>,
    attached: bool,
    dirty: bool,
}

impl OverviewSynchronizer {
    pub(crate) fn new(
        main: &LayerSet,
        center: Coordinate,
        zoom: f64,
        animation: Duration,
        surface: Box<dyn RenderSurface>,
    ) -> Self {
        let layers: Vec<Layer> = main.base_layers().filter_map(Layer::mirror).collect();
        let mut overview = Self {
            view: ViewController::fixed_zoom(center, zoom),
            layers,
            shown: 0,
            animation,
            surface,
            attached: false,
            dirty: true,
        };
        overview.show_after(main.visible_base_index());
        overview
    }

    pub fn center(&self, crs: Crs) -> Coordinate {
        self.view.center(crs)
    }

    pub fn zoom(&self) -> f64 {
        self.view.zoom()
    }

    pub fn view(&self) -> &ViewController {
        &self.view
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Position of the shown layer among the main map's base layers.
    pub fn visible_index(&self) -> usize {
        self.shown
    }

    pub fn visible_layer(&self) -> &Layer {
        &self.layers[self.shown]
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn is_animating(&self) -> bool {
        self.view.is_animating()
    }

    pub fn size(&self) -> Option<Size> {
        self.surface.size()
    }

    /// Shows the base layer following `main_index`, wrapping around.
    pub(crate) fn show_after(&mut self, main_index: usize) {
        self.shown = (main_index + 1) % self.layers.len();
        for (i, layer) in self.layers.iter_mut().enumerate() {
            layer.visible = i == self.shown;
        }
        self.dirty = true;
    }

    /// Re-centers on the main view's settled center (native).
    pub(crate) fn follow(&mut self, center: Coordinate) -> AnimationHandle {
        self.dirty = true;
        self.view
            .set_center(center, None, Crs::Native, self.animation)
    }

    pub(crate) fn attach(&mut self, target: &str) -> Result<()> {
        self.surface.mount(target)?;
        for layer in self.layers.iter_mut() {
            layer.source = Some(self.surface.register_layer(layer));
        }
        self.attached = true;
        self.dirty = true;
        Ok(())
    }

    pub(crate) fn detach(&mut self) {
        self.view.cancel_animations();
        if self.attached {
            self.surface.unmount();
            self.attached = false;
        }
    }

    pub(crate) fn advance(&mut self, dt: Duration) {
        let animating = self.view.is_animating();
        self.view.advance(dt);
        self.view.take_move_end();
        if self.attached && (animating || self.dirty) {
            let frame = Frame::capture(
                SurfaceRole::Overview,
                &self.view,
                self.surface.size(),
                self.layers.iter(),
            );
            if self.surface.render(&frame) == RenderStatus::Complete {
                self.dirty = false;
            }
        }
    }
}

impl std::fmt::Debug for OverviewSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverviewSynchronizer")
            .field("view", &self.view)
            .field("shown", &self.visible_layer().label())
            .field("attached", &self.attached)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{HeadlessEngine, RenderEngine};
    use crate::layers::base::LayerKind;
    use crate::layers::source::TileGrid;

    fn overview(visible: usize) -> (OverviewSynchronizer, HeadlessEngine) {
        let layers = ["A", "B", "C"]
            .iter()
            .enumerate()
            .map(|(i, label)| {
                Layer::new(*label, LayerKind::DebugGrid(TileGrid::default())).with_visible(i == visible)
            })
            .collect();
        let set = LayerSet::new(layers).unwrap();
        let mut engine = HeadlessEngine::default();
        let surface = engine.create_surface(SurfaceRole::Overview);
        let o = OverviewSynchronizer::new(
            &set,
            Coordinate::default(),
            12.0,
            Duration::from_millis(250),
            surface,
        );
        (o, engine)
    }

    #[test]
    fn test_shows_next_base_layer() {
        let (o, _) = overview(2);
        assert_eq!(o.visible_layer().label(), "A");
        assert_eq!(o.layers().iter().filter(|l| l.is_visible()).count(), 1);
    }

    #[test]
    fn test_follow_keeps_fixed_zoom() {
        let (mut o, engine) = overview(0);
        o.attach("overview").unwrap();
        let mut handle = o.follow(Coordinate::new(1000.0, 2000.0));
        o.advance(Duration::from_millis(100));
        assert!(handle.is_pending());
        o.advance(Duration::from_millis(200));
        assert!(handle.try_outcome().unwrap().is_completed());
        assert_eq!(o.center(Crs::Native), Coordinate::new(1000.0, 2000.0));
        assert_eq!(o.zoom(), 12.0);

        let frame = engine.log().last_frame(SurfaceRole::Overview).unwrap();
        assert_eq!(frame.visible_labels(), vec!["B"]);
    }
}
