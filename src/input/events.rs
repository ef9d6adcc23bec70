use crate::core::geo::{Coordinate, Pixel};
use crate::geolocation::GeolocationSample;
use crate::layers::feature::{Feature, FeatureRequest};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Named events listeners can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    MoveEnd,
    Click,
    SingleClick,
    DoubleClick,
    PointerMove,
    RenderComplete,
    PositionChange,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::MoveEnd => "moveend",
            EventKind::Click => "click",
            EventKind::SingleClick => "singleclick",
            EventKind::DoubleClick => "dblclick",
            EventKind::PointerMove => "pointermove",
            EventKind::RenderComplete => "rendercomplete",
            EventKind::PositionChange => "change:position",
        }
    }

    /// Events carrying a pixel that can be hit-tested.
    pub fn is_pointer(&self) -> bool {
        matches!(
            self,
            EventKind::Click | EventKind::SingleClick | EventKind::DoubleClick | EventKind::PointerMove
        )
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "moveend" => Ok(EventKind::MoveEnd),
            "click" => Ok(EventKind::Click),
            "singleclick" => Ok(EventKind::SingleClick),
            "dblclick" => Ok(EventKind::DoubleClick),
            "pointermove" => Ok(EventKind::PointerMove),
            "rendercomplete" => Ok(EventKind::RenderComplete),
            "change:position" => Ok(EventKind::PositionChange),
            other => Err(MapError::Parse(format!("unknown event type {:?}", other))),
        }
    }
}

/// A raw pointer event at a viewport pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub kind: EventKind,
    pub pixel: Pixel,
}

impl PointerEvent {
    pub fn new(kind: EventKind, pixel: Pixel) -> Self {
        Self { kind, pixel }
    }

    pub fn click(x: f64, y: f64) -> Self {
        Self::new(EventKind::Click, Pixel::new(x, y))
    }
}

/// Events delivered through the controller's event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// The main view settled. Center is in native coordinates.
    MoveEnd { center: Coordinate, zoom: f64 },
    Pointer(PointerEvent),
    RenderComplete,
    PositionChange(GeolocationSample),
}

impl MapEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            MapEvent::MoveEnd { .. } => EventKind::MoveEnd,
            MapEvent::Pointer(pointer) => pointer.kind,
            MapEvent::RenderComplete => EventKind::RenderComplete,
            MapEvent::PositionChange(_) => EventKind::PositionChange,
        }
    }
}

/// Messages other threads may post to the controller.
#[derive(Debug)]
pub enum Inbound {
    Event(MapEvent),
    Features {
        request: FeatureRequest,
        result: Result<Vec<Feature>>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_names_parse_back() {
        for kind in [
            EventKind::MoveEnd,
            EventKind::Click,
            EventKind::SingleClick,
            EventKind::DoubleClick,
            EventKind::PointerMove,
            EventKind::RenderComplete,
            EventKind::PositionChange,
        ] {
            assert_eq!(kind.name().parse::<EventKind>().unwrap(), kind);
        }
        assert!(matches!("wheel".parse::<EventKind>(), Err(MapError::Parse(_))));
    }

    #[test]
    fn test_map_event_kind() {
        let click = MapEvent::Pointer(PointerEvent::click(1.0, 2.0));
        assert_eq!(click.kind(), EventKind::Click);
        assert!(click.kind().is_pointer());
        assert!(!MapEvent::RenderComplete.kind().is_pointer());
    }
}
