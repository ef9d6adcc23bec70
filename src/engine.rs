//! Boundary to the rendering engine.
//!
//! The controller never draws. It hands the engine a [`Frame`] describing the
//! view and layer visibility, and asks it for the surface size. The
//! [`HeadlessEngine`] records frames instead of drawing them and backs the
//! tests and the driver binary.

use crate::core::extent::Extent;
use crate::core::geo::{Coordinate, Crs, Size};
use crate::core::view::ViewController;
use crate::layers::base::{Layer, LayerId, LayerType, SourceHandle};
use crate::layers::feature::FeatureId;
use crate::{MapError, Result};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SurfaceRole {
    Main,
    Overview,
}

/// What the engine should show for one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerFrame {
    pub id: LayerId,
    pub label: String,
    pub layer_type: LayerType,
    pub source: Option<SourceHandle>,
    pub visible: bool,
    pub feature_count: usize,
    pub selected: Vec<FeatureId>,
}

/// Snapshot of one surface's view and layers.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub role: SurfaceRole,
    /// Native coordinates.
    pub center: Coordinate,
    pub zoom: f64,
    pub rotation: f64,
    pub resolution: f64,
    pub extent: Option<Extent>,
    pub layers: Vec<LayerFrame>,
}

impl Frame {
    pub fn capture<'a, I>(role: SurfaceRole, view: &ViewController, size: Option<Size>, layers: I) -> Self
    where
        I: IntoIterator<Item = &'a Layer>,
    {
        let resolution = view.resolution();
        let layers = layers
            .into_iter()
            .map(|layer| {
                let (feature_count, mut selected) = layer.features().map_or((0, Vec::new()), |store| {
                    (store.len(), store.selected().map(|f| f.id.clone()).collect())
                });
                selected.sort();
                LayerFrame {
                    id: layer.id(),
                    label: layer.label().to_string(),
                    layer_type: layer.layer_type(),
                    source: layer.source(),
                    visible: layer.is_rendered(resolution),
                    feature_count,
                    selected,
                }
            })
            .collect();
        Self {
            role,
            center: view.center(Crs::Native),
            zoom: view.zoom(),
            rotation: view.rotation(),
            resolution,
            extent: view.extent(size, Crs::Native),
            layers,
        }
    }

    pub fn visible_labels(&self) -> Vec<&str> {
        self.layers
            .iter()
            .filter(|l| l.visible)
            .map(|l| l.label.as_str())
            .collect()
    }

    pub fn layer(&self, label: &str) -> Option<&LayerFrame> {
        self.layers.iter().find(|l| l.label == label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// Everything in the frame is drawn.
    Complete,
    /// Still loading; the engine posts `RenderComplete` once it is done.
    Pending,
}

/// A display surface owned by one view.
pub trait RenderSurface {
    fn mount(&mut self, target: &str) -> Result<()>;

    fn unmount(&mut self);

    /// Size in pixels; `None` while unmounted.
    fn size(&self) -> Option<Size>;

    /// Creates the engine-side source for `layer`.
    fn register_layer(&mut self, layer: &Layer) -> SourceHandle;

    fn render(&mut self, frame: &Frame) -> RenderStatus;
}

/// Factory for surfaces, passed explicitly to the controller at construction.
pub trait RenderEngine {
    fn create_surface(&mut self, role: SurfaceRole) -> Box<dyn RenderSurface>;
}

/// What a headless surface was asked to do.
#[derive(Debug, Clone, Default)]
pub struct SurfaceRecord {
    pub target: Option<String>,
    pub mounts: usize,
    pub unmounts: usize,
    pub registered: Vec<String>,
    pub frames: Vec<Frame>,
}

/// Shared view onto everything a [`HeadlessEngine`]'s surfaces recorded.
#[derive(Debug, Clone, Default)]
pub struct HeadlessLog(Rc<RefCell<BTreeMap<SurfaceRole, SurfaceRecord>>>);

impl HeadlessLog {
    pub fn record(&self, role: SurfaceRole) -> SurfaceRecord {
        self.0.borrow().get(&role).cloned().unwrap_or_default()
    }

    pub fn last_frame(&self, role: SurfaceRole) -> Option<Frame> {
        self.0
            .borrow()
            .get(&role)
            .and_then(|r| r.frames.last().cloned())
    }

    pub fn frame_count(&self, role: SurfaceRole) -> usize {
        self.0.borrow().get(&role).map_or(0, |r| r.frames.len())
    }

    pub fn is_mounted(&self, role: SurfaceRole) -> bool {
        self.0
            .borrow()
            .get(&role)
            .map_or(false, |r| r.target.is_some())
    }

    fn update<F: FnOnce(&mut SurfaceRecord)>(&self, role: SurfaceRole, f: F) {
        f(self.0.borrow_mut().entry(role).or_default());
    }
}

/// An engine whose surfaces have a fixed size and draw nothing.
#[derive(Debug, Clone)]
pub struct HeadlessEngine {
    main_size: Size,
    overview_size: Size,
    status: RenderStatus,
    log: HeadlessLog,
}

impl HeadlessEngine {
    pub fn new(main_size: Size) -> Self {
        Self {
            main_size,
            overview_size: Size::new(150.0, 150.0),
            status: RenderStatus::Complete,
            log: HeadlessLog::default(),
        }
    }

    /// Status every render reports; `Pending` simulates slow tile loading.
    pub fn with_status(mut self, status: RenderStatus) -> Self {
        self.status = status;
        self
    }

    pub fn log(&self) -> HeadlessLog {
        self.log.clone()
    }
}

impl Default for HeadlessEngine {
    fn default() -> Self {
        Self::new(Size::new(800.0, 600.0))
    }
}

impl RenderEngine for HeadlessEngine {
    fn create_surface(&mut self, role: SurfaceRole) -> Box<dyn RenderSurface> {
        let size = match role {
            SurfaceRole::Main => self.main_size,
            SurfaceRole::Overview => self.overview_size,
        };
        Box::new(HeadlessSurface {
            role,
            size,
            status: self.status,
            mounted: false,
            next_handle: 0,
            log: self.log.clone(),
        })
    }
}

struct HeadlessSurface {
    role: SurfaceRole,
    size: Size,
    status: RenderStatus,
    mounted: bool,
    next_handle: u64,
    log: HeadlessLog,
}

impl RenderSurface for HeadlessSurface {
    fn mount(&mut self, target: &str) -> Result<()> {
        if target.trim().is_empty() {
            return Err(MapError::InvalidConfig("surface target is empty".to_string()));
        }
        self.mounted = true;
        self.log.update(self.role, |r| {
            r.target = Some(target.to_string());
            r.mounts += 1;
        });
        Ok(())
    }

    fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.log.update(self.role, |r| {
            r.target = None;
            r.unmounts += 1;
        });
    }

    fn size(&self) -> Option<Size> {
        self.mounted.then_some(self.size)
    }

    fn register_layer(&mut self, layer: &Layer) -> SourceHandle {
        self.next_handle += 1;
        self.log
            .update(self.role, |r| r.registered.push(layer.label().to_string()));
        SourceHandle(self.next_handle)
    }

    fn render(&mut self, frame: &Frame) -> RenderStatus {
        if self.mounted {
            self.log.update(self.role, |r| r.frames.push(frame.clone()));
        }
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_size_only_while_mounted() {
        let mut engine = HeadlessEngine::new(Size::new(640.0, 480.0));
        let log = engine.log();
        let mut surface = engine.create_surface(SurfaceRole::Main);
        assert_eq!(surface.size(), None);
        assert!(surface.mount("").is_err());
        surface.mount("map").unwrap();
        assert_eq!(surface.size(), Some(Size::new(640.0, 480.0)));
        assert!(log.is_mounted(SurfaceRole::Main));
        surface.unmount();
        surface.unmount();
        assert_eq!(surface.size(), None);
        assert_eq!(log.record(SurfaceRole::Main).unmounts, 1);
    }
}
