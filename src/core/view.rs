//! The view controller: single source of truth for center, zoom and rotation.
//!
//! State is stored in native coordinates only. Geographic values are converted
//! at the API boundary, so repeated reads and writes never accumulate
//! projection drift.

use crate::animation::easing::EasingType;
use crate::animation::transition::{AnimationHandle, AnimationOutcome, Transition};
use crate::core::constants::{DEFAULT_ZOOM_DELTA, RESOLUTION_AT_ZOOM_0};
use crate::core::extent::Extent;
use crate::core::geo::{transform, Coordinate, Crs, Pixel, Size};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Native units per pixel at `zoom`.
pub fn resolution_for_zoom(zoom: f64) -> f64 {
    RESOLUTION_AT_ZOOM_0 / 2_f64.powf(zoom)
}

/// Zoom level at which one pixel covers `resolution` native units.
pub fn zoom_for_resolution(resolution: f64) -> f64 {
    (RESOLUTION_AT_ZOOM_0 / resolution).log2()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    /// Native coordinates.
    pub center: Coordinate,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Radians, counter-clockwise.
    pub rotation: f64,
}

impl ViewState {
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}

pub struct ViewController {
    state: ViewState,
    constrain_resolution: bool,
    easing: EasingType,
    transition: Option<Transition>,
    /// Set when the view settled after a change and nobody has observed it yet.
    move_end_pending: bool,
}

impl ViewController {
    /// Creates a view centered on a native coordinate.
    pub fn new(center: Coordinate, zoom: f64, min_zoom: f64, max_zoom: f64) -> Result<Self> {
        if !(min_zoom <= max_zoom) {
            return Err(MapError::InvalidConfig(format!(
                "min_zoom {} exceeds max_zoom {}",
                min_zoom, max_zoom
            )));
        }
        Ok(Self {
            state: ViewState {
                center,
                zoom: zoom.clamp(min_zoom, max_zoom),
                min_zoom,
                max_zoom,
                rotation: 0.0,
            },
            constrain_resolution: false,
            easing: EasingType::default(),
            transition: None,
            move_end_pending: false,
        })
    }

    /// A view locked at one zoom level (`min_zoom == max_zoom`).
    pub fn fixed_zoom(center: Coordinate, zoom: f64) -> Self {
        Self {
            state: ViewState {
                center,
                zoom,
                min_zoom: zoom,
                max_zoom: zoom,
                rotation: 0.0,
            },
            constrain_resolution: false,
            easing: EasingType::default(),
            transition: None,
            move_end_pending: false,
        }
    }

    /// Snap computed zoom levels to integers.
    pub fn with_constrained_resolution(mut self, constrain: bool) -> Self {
        self.constrain_resolution = constrain;
        self
    }

    pub fn with_easing(mut self, easing: EasingType) -> Self {
        self.easing = easing;
        self
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn center(&self, crs: Crs) -> Coordinate {
        transform(self.state.center, Crs::Native, crs)
    }

    pub fn zoom(&self) -> f64 {
        self.state.zoom
    }

    pub fn min_zoom(&self) -> f64 {
        self.state.min_zoom
    }

    pub fn max_zoom(&self) -> f64 {
        self.state.max_zoom
    }

    pub fn rotation(&self) -> f64 {
        self.state.rotation
    }

    pub fn resolution(&self) -> f64 {
        resolution_for_zoom(self.state.zoom)
    }

    pub fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    /// Visible rectangle for a viewport of `size`; `None` while the size is unknown.
    pub fn extent(&self, size: Option<Size>, crs: Crs) -> Option<Extent> {
        let size = size.filter(|s| !s.is_empty())?;
        let resolution = self.resolution();
        let half_w = size.width * resolution / 2.0;
        let half_h = size.height * resolution / 2.0;
        let (sin, cos) = self.state.rotation.sin_cos();
        let (sin, cos) = (sin.abs(), cos.abs());
        let reach_x = cos * half_w + sin * half_h;
        let reach_y = sin * half_w + cos * half_h;
        let c = self.state.center;
        Extent::native(c.x - reach_x, c.y - reach_y, c.x + reach_x, c.y + reach_y)
            .ok()
            .map(|e| e.to_crs(crs))
    }

    /// Native coordinate under `pixel`; `None` while the size is unknown.
    pub fn coordinate_from_pixel(&self, pixel: Pixel, size: Option<Size>) -> Option<Coordinate> {
        let size = size.filter(|s| !s.is_empty())?;
        let resolution = self.resolution();
        let offset = Coordinate::new(
            (pixel.x - size.width / 2.0) * resolution,
            (size.height / 2.0 - pixel.y) * resolution,
        )
        .rotate_around(&Coordinate::default(), self.state.rotation);
        let c = self.state.center;
        Some(Coordinate::new(c.x + offset.x, c.y + offset.y))
    }

    /// Pixel position of a native coordinate; `None` while the size is unknown.
    pub fn pixel_from_coordinate(&self, coord: Coordinate, size: Option<Size>) -> Option<Pixel> {
        let size = size.filter(|s| !s.is_empty())?;
        let resolution = self.resolution();
        let c = self.state.center;
        let offset = Coordinate::new(coord.x - c.x, coord.y - c.y)
            .rotate_around(&Coordinate::default(), -self.state.rotation);
        Some(Pixel::new(
            size.width / 2.0 + offset.x / resolution,
            size.height / 2.0 - offset.y / resolution,
        ))
    }

    /// Moves the view to `center` (in `crs`) and optionally `zoom`.
    ///
    /// A zero duration applies the change synchronously and returns an
    /// already-completed handle. Otherwise the change is animated; any
    /// in-flight animation is superseded first.
    pub fn set_center(
        &mut self,
        center: Coordinate,
        zoom: Option<f64>,
        crs: Crs,
        duration: Duration,
    ) -> AnimationHandle {
        let center = transform(center, crs, Crs::Native);
        let zoom = zoom.unwrap_or_else(|| self.target_zoom());
        self.animate(center, zoom, self.state.rotation, duration)
    }

    pub fn set_zoom(&mut self, zoom: f64, duration: Duration) -> AnimationHandle {
        let center = self.target_center();
        self.animate(center, zoom, self.state.rotation, duration)
    }

    pub fn set_rotation(&mut self, rotation: f64, duration: Duration) -> AnimationHandle {
        let (center, zoom) = (self.target_center(), self.target_zoom());
        self.animate(center, zoom, rotation, duration)
    }

    /// One zoom level in. At `max_zoom` this does nothing.
    pub fn zoom_in(&mut self, duration: Duration) -> AnimationHandle {
        self.zoom_by(DEFAULT_ZOOM_DELTA, duration)
    }

    /// One zoom level out. At `min_zoom` this does nothing.
    pub fn zoom_out(&mut self, duration: Duration) -> AnimationHandle {
        self.zoom_by(-DEFAULT_ZOOM_DELTA, duration)
    }

    fn zoom_by(&mut self, delta: f64, duration: Duration) -> AnimationHandle {
        let current = self.target_zoom();
        let target = self.state.clamp_zoom(current + delta);
        if target == current {
            return AnimationHandle::resolved(AnimationOutcome::Completed);
        }
        self.set_zoom(target, duration)
    }

    /// Centers and zooms so `extent` is fully visible inside the viewport
    /// inset by `padding_px` on every side.
    pub fn fit_extent(
        &mut self,
        extent: &Extent,
        padding_px: f64,
        size: Option<Size>,
        duration: Duration,
    ) -> Result<AnimationHandle> {
        let size = size
            .filter(|s| !s.is_empty())
            .ok_or(MapError::ViewportNotAttached)?;
        let native = extent.to_crs(Crs::Native);
        let center = native.center();

        // Measure the extent in the rotated view frame.
        let rotated = native
            .corners()
            .map(|c| c.rotate_around(&center, -self.state.rotation));
        let frame = Extent::from_points(rotated, Crs::Native).unwrap_or(native);

        let padding = padding_px.max(0.0);
        let avail_w = (size.width - 2.0 * padding).max(1.0);
        let avail_h = (size.height - 2.0 * padding).max(1.0);
        let resolution = (frame.width() / avail_w).max(frame.height() / avail_h);

        let mut zoom = if resolution > 0.0 {
            zoom_for_resolution(resolution)
        } else {
            self.state.max_zoom
        };
        if self.constrain_resolution {
            // Round down so the extent still fits.
            zoom = (zoom + 1e-9).floor();
        }

        Ok(self.animate(center, zoom, self.state.rotation, duration))
    }

    fn animate(
        &mut self,
        center: Coordinate,
        zoom: f64,
        rotation: f64,
        duration: Duration,
    ) -> AnimationHandle {
        let zoom = self.state.clamp_zoom(zoom);
        self.supersede();

        if duration.is_zero() {
            let changed = center != self.state.center
                || zoom != self.state.zoom
                || rotation != self.state.rotation;
            self.state.center = center;
            self.state.zoom = zoom;
            self.state.rotation = rotation;
            if changed {
                self.move_end_pending = true;
            }
            return AnimationHandle::resolved(AnimationOutcome::Completed);
        }

        let (completion, handle) = AnimationHandle::pair();
        let transition = Transition::new(
            self.state.center,
            center,
            self.state.zoom,
            zoom,
            self.state.rotation,
            rotation,
            duration,
            completion,
        );
        self.transition = Some(transition.with_easing(self.easing));
        handle
    }

    /// Steps the in-flight animation by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        let Some(transition) = self.transition.as_mut() else {
            return;
        };
        let frame = transition.step(dt);
        self.state.center = frame.center;
        self.state.zoom = self.state.clamp_zoom(frame.zoom);
        self.state.rotation = frame.rotation;
        if frame.finished {
            if let Some(done) = self.transition.take() {
                done.finish(AnimationOutcome::Completed);
            }
            self.move_end_pending = true;
        }
    }

    /// Stops any animation where it is, resolving its handle as cancelled.
    pub fn cancel_animations(&mut self) {
        if let Some(transition) = self.transition.take() {
            transition.finish(AnimationOutcome::Cancelled);
        }
    }

    /// Returns true once per settled move.
    pub fn take_move_end(&mut self) -> bool {
        std::mem::take(&mut self.move_end_pending)
    }

    fn supersede(&mut self) {
        if let Some(previous) = self.transition.take() {
            log::debug!("view animation superseded at {:.0}%", previous.progress() * 100.0);
            previous.finish(AnimationOutcome::Superseded);
        }
    }

    fn target_center(&self) -> Coordinate {
        self.transition
            .as_ref()
            .map(|t| t.target_center())
            .unwrap_or(self.state.center)
    }

    fn target_zoom(&self) -> f64 {
        self.transition
            .as_ref()
            .map(|t| t.target_zoom())
            .unwrap_or(self.state.zoom)
    }
}

impl std::fmt::Debug for ViewController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewController")
            .field("state", &self.state)
            .field("animating", &self.is_animating())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> ViewController {
        ViewController::new(Coordinate::default(), 10.0, 4.0, 19.0)
            .unwrap()
            .with_constrained_resolution(true)
    }

    #[test]
    fn test_zoom_clamped_on_construction() {
        let v = ViewController::new(Coordinate::default(), 25.0, 4.0, 19.0).unwrap();
        assert_eq!(v.zoom(), 19.0);
        assert!(ViewController::new(Coordinate::default(), 5.0, 10.0, 4.0).is_err());
    }

    #[test]
    fn test_immediate_set_center() {
        let mut v = view();
        let mut handle = v.set_center(Coordinate::new(5.0, 6.0), Some(12.0), Crs::Native, Duration::ZERO);
        assert_eq!(handle.try_outcome(), Some(AnimationOutcome::Completed));
        assert_eq!(v.center(Crs::Native), Coordinate::new(5.0, 6.0));
        assert_eq!(v.zoom(), 12.0);
        assert!(v.take_move_end());
        assert!(!v.take_move_end());
    }

    #[test]
    fn test_animation_supersedes_previous() {
        let mut v = view();
        let mut first = v.set_center(Coordinate::new(1000.0, 0.0), None, Crs::Native, Duration::from_millis(250));
        v.advance(Duration::from_millis(100));
        let mut second = v.set_center(Coordinate::new(0.0, 1000.0), None, Crs::Native, Duration::from_millis(250));
        assert_eq!(first.try_outcome(), Some(AnimationOutcome::Superseded));
        assert!(second.is_pending());
        v.advance(Duration::from_millis(300));
        assert_eq!(second.try_outcome(), Some(AnimationOutcome::Completed));
        assert_eq!(v.center(Crs::Native), Coordinate::new(0.0, 1000.0));
        assert!(v.take_move_end());
    }

    #[test]
    fn test_easing_shapes_the_path() {
        let mut linear = view().with_easing(EasingType::Linear);
        let mut smooth = view();
        for v in [&mut linear, &mut smooth] {
            v.set_center(Coordinate::new(1000.0, 0.0), None, Crs::Native, Duration::from_millis(200));
            v.advance(Duration::from_millis(50));
        }
        assert!((linear.center(Crs::Native).x - 250.0).abs() < 1e-9);
        assert!((smooth.center(Crs::Native).x - 156.25).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_in_out_bounded() {
        let mut v = ViewController::new(Coordinate::default(), 18.5, 4.0, 19.0).unwrap();
        v.zoom_in(Duration::ZERO);
        assert_eq!(v.zoom(), 19.0);
        let mut noop = v.zoom_in(Duration::ZERO);
        assert_eq!(noop.try_outcome(), Some(AnimationOutcome::Completed));
        assert_eq!(v.zoom(), 19.0);

        for _ in 0..40 {
            v.zoom_out(Duration::ZERO);
            assert!(v.zoom() >= v.min_zoom() && v.zoom() <= v.max_zoom());
        }
        assert_eq!(v.zoom(), 4.0);
    }

    #[test]
    fn test_extent_requires_size() {
        let v = view();
        assert!(v.extent(None, Crs::Native).is_none());
        assert!(v.extent(Some(Size::new(0.0, 100.0)), Crs::Native).is_none());
        let e = v.extent(Some(Size::new(256.0, 256.0)), Crs::Native).unwrap();
        let expected = 256.0 * resolution_for_zoom(10.0);
        assert!((e.width() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_fit_extent_contains_target() {
        let mut v = view();
        let size = Some(Size::new(800.0, 600.0));
        let target = Extent::native(-13_656_000.0, 5_690_000.0, -13_640_000.0, 5_710_000.0).unwrap();
        v.fit_extent(&target, 20.0, size, Duration::ZERO).unwrap();
        let visible = v.extent(size, Crs::Native).unwrap();
        assert!(visible.contains_extent(&target));
        assert_eq!(v.zoom(), v.zoom().floor());
    }

    #[test]
    fn test_fit_extent_without_size_fails() {
        let mut v = view();
        let target = Extent::native(0.0, 0.0, 10.0, 10.0).unwrap();
        assert!(matches!(
            v.fit_extent(&target, 0.0, None, Duration::ZERO),
            Err(MapError::ViewportNotAttached)
        ));
    }

    #[test]
    fn test_pixel_round_trip_with_rotation() {
        let mut v = view();
        v.set_rotation(0.3, Duration::ZERO);
        let size = Some(Size::new(640.0, 480.0));
        let coord = v.coordinate_from_pixel(Pixel::new(100.0, 50.0), size).unwrap();
        let pixel = v.pixel_from_coordinate(coord, size).unwrap();
        assert!((pixel.x - 100.0).abs() < 1e-6);
        assert!((pixel.y - 50.0).abs() < 1e-6);
    }
}
