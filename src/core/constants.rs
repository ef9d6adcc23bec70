//! Core constants shared by the view, layer and overview code.

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// WGS84 semi-major axis used by the spherical Web Mercator projection.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude beyond which Web Mercator is undefined.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Native units per pixel at zoom 0 for 256px tiles (2 * PI * R / 256).
pub const RESOLUTION_AT_ZOOM_0: f64 = 156_543.033_928_040_97;

/// Deepest XYZ tile level; tile indices at this level still fit in a `u32`.
pub const MAX_TILE_ZOOM: u8 = 30;

/// Half the width of the Web Mercator world in native units.
pub const HALF_WORLD: f64 = std::f64::consts::PI * EARTH_RADIUS;

/// Zoom limits of the main view.
pub const DEFAULT_MIN_ZOOM: f64 = 4.0;
pub const DEFAULT_MAX_ZOOM: f64 = 19.0;

/// Programmatic +/- zoom step when calling `zoom_in/zoom_out`.
pub const DEFAULT_ZOOM_DELTA: f64 = 1.0;

/// Duration of programmatic view animations.
pub const DEFAULT_ANIMATION_DURATION_MS: u64 = 250;

/// Fixed zoom of the overview map.
pub const DEFAULT_OVERVIEW_ZOOM: f64 = 12.0;

/// Feature geometry is not requested above this resolution (native units per pixel).
pub const FEATURE_LAYER_MAX_RESOLUTION: f64 = 10.0;

/// Location fixes less accurate than this (meters) are dropped.
pub const USER_LOCATION_ACCURACY_THRESHOLD: f64 = 400.0;

/// Pointer slop used when hit-testing features.
pub const DEFAULT_HIT_TOLERANCE_PX: f64 = 6.0;

/// Upper bound on render-complete retries of a pending selection.
pub const DEFAULT_MAX_SELECTION_RETRIES: u32 = 64;

/// Label of the feature layer that selection applies to.
pub const STOPS_LAYER_LABEL: &str = "Stops";

/// Prefix of stop feature identifiers (`stop.<id>`).
pub const STOP_FEATURE_PREFIX: &str = "stop";

/// Feature id carried by the user-location marker.
pub const USER_LOCATION_FEATURE_ID: &str = "user-location";

/// Mapbox styles used for the standard base layers.
pub const MAPBOX_STREETS_STYLE: &str = "wylee/ckq4iwptf2wzn17pjnpbh9gsa";
pub const MAPBOX_SATELLITE_STYLE: &str = "wylee/cjgpp7kso000c2smgd2hji3j8";
