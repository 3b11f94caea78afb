//! Map geometry for claim rendering: coordinate parsing, status markers, and
//! the approximate claim footprint.
//!
//! The footprint is a square of the claimed area centered on the claim's
//! point. It is a coarse visual aid for the map, not a cadastral boundary:
//! the real parcel shape, orientation and offset from the recorded point are
//! all unknown.

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::OnceLock;
use tracing::debug;

use crate::types::{ClaimId, ClaimRecord};

/// Meters per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;
pub const SQ_METERS_PER_HECTARE: f64 = 10_000.0;
pub const SQ_METERS_PER_ACRE: f64 = 4_046.86;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Parse a "lat,lng" pair. Both halves must be finite numbers, with latitude
/// within ±90 and longitude within ±180.
pub fn parse_coordinates(raw: &str) -> Option<LatLng> {
    let (lat, lng) = raw.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lng: f64 = lng.trim().parse().ok()?;
    if lat.is_finite() && lng.is_finite() && lat.abs() <= 90.0 && lng.abs() <= 180.0 {
        Some(LatLng::new(lat, lng))
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Claimed area
// ---------------------------------------------------------------------------

fn magnitude_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"^\s*([+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?)").unwrap()
    })
}

/// Leading numeric magnitude of a free-text quantity ("2.5 hectare" -> 2.5).
pub fn leading_magnitude(raw: &str) -> Option<f64> {
    let caps = magnitude_re().captures(raw)?;
    caps[1].parse().ok()
}

/// Claimed area in square meters. Only hectares and acres are recognized.
pub fn area_sq_meters(raw: &str) -> Option<f64> {
    let magnitude = leading_magnitude(raw)?;
    let unit = raw.to_ascii_lowercase();
    if unit.contains("hectare") {
        Some(magnitude * SQ_METERS_PER_HECTARE)
    } else if unit.contains("acre") {
        Some(magnitude * SQ_METERS_PER_ACRE)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Footprint
// ---------------------------------------------------------------------------

/// Equal-area square around a claim point. Corners run SW, SE, NE, NW.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Footprint {
    pub center: LatLng,
    pub side_m: f64,
    pub corners: [LatLng; 4],
}

/// Square of `area_sq_m` centered on `center`. Meters convert to degrees with
/// a fixed 111320 m/deg for latitude and the same scaled by cos(lat) for
/// longitude. Returns `None` for non-positive areas and for latitudes at or
/// past the poles, where the corner order would no longer hold.
pub fn square_footprint(center: LatLng, area_sq_m: f64) -> Option<Footprint> {
    if !area_sq_m.is_finite() || area_sq_m <= 0.0 {
        return None;
    }
    if !center.lat.is_finite() || center.lat.abs() >= 90.0 {
        return None;
    }
    let side_m = area_sq_m.sqrt();
    let meters_per_deg_lng = METERS_PER_DEGREE * center.lat.to_radians().cos();
    if meters_per_deg_lng.abs() < 1e-9 {
        return None;
    }
    let half_lat = side_m / METERS_PER_DEGREE / 2.0;
    let half_lng = side_m / meters_per_deg_lng / 2.0;

    Some(Footprint {
        center,
        side_m,
        corners: [
            LatLng::new(center.lat - half_lat, center.lng - half_lng),
            LatLng::new(center.lat - half_lat, center.lng + half_lng),
            LatLng::new(center.lat + half_lat, center.lng + half_lng),
            LatLng::new(center.lat + half_lat, center.lng - half_lng),
        ],
    })
}

pub fn claim_footprint(center: LatLng, area_text: &str) -> Option<Footprint> {
    square_footprint(center, area_sq_meters(area_text)?)
}

// ---------------------------------------------------------------------------
// Markers
// ---------------------------------------------------------------------------

/// One renderable claim: a colored point plus its optional footprint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub id: ClaimId,
    pub claim_id: String,
    pub holder: String,
    pub status: String,
    pub position: LatLng,
    pub color: &'static str,
    pub outline_color: &'static str,
    pub footprint: Option<Footprint>,
}

impl MapMarker {
    /// Marker for a record, or `None` when its coordinates don't parse.
    pub fn for_record(record: &ClaimRecord) -> Option<Self> {
        let position = record.position()?;
        let status = record.claim_status();
        Some(Self {
            id: record.id,
            claim_id: record.claim_id.clone(),
            holder: record.patta_holder_name.clone(),
            status: status.label().to_string(),
            position,
            color: status.marker_color(),
            outline_color: status.outline_color(),
            footprint: claim_footprint(position, &record.total_area_claimed),
        })
    }
}

/// Markers for every record with usable coordinates. Records without them are
/// skipped individually.
pub fn project_markers(records: &[ClaimRecord]) -> Vec<MapMarker> {
    records
        .iter()
        .filter_map(|record| {
            let marker = MapMarker::for_record(record);
            if marker.is_none() {
                debug!(id = record.id, coordinates = %record.coordinates, "Claim has no map position");
            }
            marker
        })
        .collect()
}

/// GeoJSON FeatureCollection: a Point per marker and a Polygon per footprint.
/// GeoJSON positions are `[lng, lat]` and polygon rings are closed.
pub fn to_geojson(markers: &[MapMarker]) -> Value {
    let mut features = Vec::with_capacity(markers.len() * 2);
    for marker in markers {
        let properties = json!({
            "id": marker.id,
            "claim_id": marker.claim_id,
            "holder": marker.holder,
            "status": marker.status,
            "color": marker.color,
        });
        features.push(json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [marker.position.lng, marker.position.lat] },
            "properties": properties.clone(),
        }));
        if let Some(ref fp) = marker.footprint {
            let mut ring: Vec<[f64; 2]> = fp.corners.iter().map(|c| [c.lng, c.lat]).collect();
            ring.push([fp.corners[0].lng, fp.corners[0].lat]);
            let mut props = properties;
            props["kind"] = json!("footprint");
            props["outline"] = json!(marker.outline_color);
            props["side_m"] = json!(fp.side_m);
            features.push(json!({
                "type": "Feature",
                "geometry": { "type": "Polygon", "coordinates": [ring] },
                "properties": props,
            }));
        }
    }
    json!({ "type": "FeatureCollection", "features": features })
}
