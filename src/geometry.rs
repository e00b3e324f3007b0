// 🔷 Region geometry - hexgrid GeoJSON → projected polygons
//
// One feature per region, keyed by a name property. Hexgrid files usually
// name regions "Texas (United States)"; the suffix is dropped so names line
// up with the crosswalk. Coordinates are projected to spherical Web Mercator
// on load, and centroids are computed in projected space.

use crate::aggregator::RegionSummary;
use crate::error::{PipelineError, Result};
use geojson::{GeoJson, Value};
use std::collections::HashMap;
use std::path::Path;

const NAME_SUFFIX: &str = " (United States)";

/// Latitude clamp for Web Mercator
const MAX_LATITUDE: f64 = 85.051_128_78;

#[derive(Debug, Clone, PartialEq)]
pub struct RegionGeometry {
    pub name: String,
    /// Exterior rings in projected (x, y)
    pub rings: Vec<Vec<(f64, f64)>>,
    /// Label anchor in projected (x, y)
    pub centroid: (f64, f64),
}

impl RegionGeometry {
    pub fn new(name: String, rings: Vec<Vec<(f64, f64)>>) -> Self {
        let centroid = centroid(&rings);
        RegionGeometry {
            name,
            rings,
            centroid,
        }
    }

    /// (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        bounds(self.rings.iter().flatten())
    }
}

// ============================================================================
// PROJECTION + CENTROID
// ============================================================================

/// lon/lat degrees → Web Mercator, scaled so x stays in degrees
pub fn project(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let y = (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln().to_degrees();
    (lon, y)
}

/// Signed shoelace area and area-weighted centroid of one ring
fn ring_moments(ring: &[(f64, f64)]) -> (f64, f64, f64) {
    let mut area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..ring.len() {
        let (x0, y0) = ring[i];
        let (x1, y1) = ring[(i + 1) % ring.len()];
        let cross = x0 * y1 - x1 * y0;
        area += cross;
        cx += (x0 + x1) * cross;
        cy += (y0 + y1) * cross;
    }
    (area / 2.0, cx, cy)
}

/// Area-weighted centroid of the largest ring
///
/// Multi-part shapes label on their biggest part. Degenerate (zero-area)
/// input falls back to the vertex mean.
pub fn centroid(rings: &[Vec<(f64, f64)>]) -> (f64, f64) {
    let largest = rings
        .iter()
        .map(|ring| ring_moments(ring))
        .max_by(|a, b| a.0.abs().total_cmp(&b.0.abs()));

    if let Some((area, cx, cy)) = largest {
        if area.abs() > f64::EPSILON {
            return (cx / (6.0 * area), cy / (6.0 * area));
        }
    }

    let points: Vec<&(f64, f64)> = rings.iter().flatten().collect();
    if points.is_empty() {
        return (0.0, 0.0);
    }
    let n = points.len() as f64;
    (
        points.iter().map(|p| p.0).sum::<f64>() / n,
        points.iter().map(|p| p.1).sum::<f64>() / n,
    )
}

/// Bounding box over any set of points
pub fn bounds<'a, I>(points: I) -> Option<(f64, f64, f64, f64)>
where
    I: IntoIterator<Item = &'a (f64, f64)>,
{
    points.into_iter().fold(None, |acc, &(x, y)| match acc {
        None => Some((x, y, x, y)),
        Some((min_x, min_y, max_x, max_y)) => {
            Some((min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y)))
        }
    })
}

// ============================================================================
// GEOJSON LOADING
// ============================================================================

/// Strip the hexgrid's " (United States)" suffix
pub fn normalize_region_name(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_suffix(NAME_SUFFIX)
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

fn project_ring(ring: &[Vec<f64>]) -> Vec<(f64, f64)> {
    ring.iter()
        .filter(|pos| pos.len() >= 2)
        .map(|pos| project(pos[0], pos[1]))
        .collect()
}

fn exterior_rings(value: &Value) -> Vec<Vec<(f64, f64)>> {
    match value {
        Value::Polygon(polygon) => polygon.first().map(|r| project_ring(r)).into_iter().collect(),
        Value::MultiPolygon(polygons) => polygons
            .iter()
            .filter_map(|polygon| polygon.first())
            .map(|r| project_ring(r))
            .collect(),
        _ => Vec::new(),
    }
}

/// Parse a GeoJSON FeatureCollection
///
/// Features missing the name property or a polygon geometry are skipped.
pub fn parse_geometries(source: &str, name_field: &str) -> std::result::Result<Vec<RegionGeometry>, String> {
    let geojson: GeoJson = source.parse().map_err(|e: geojson::Error| e.to_string())?;
    let collection = match geojson {
        GeoJson::FeatureCollection(collection) => collection,
        _ => return Err("expected a FeatureCollection".to_string()),
    };

    let mut geometries = Vec::new();
    let mut skipped = 0;
    for feature in &collection.features {
        let name = feature
            .property(name_field)
            .and_then(|v| v.as_str())
            .map(normalize_region_name);
        let rings = feature
            .geometry
            .as_ref()
            .map(|g| exterior_rings(&g.value))
            .unwrap_or_default();

        match name {
            Some(name) if !rings.is_empty() => geometries.push(RegionGeometry::new(name, rings)),
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::warn!(features = skipped, field = name_field, "skipped geometry features");
    }
    Ok(geometries)
}

/// Read the hexgrid file
pub fn load_geometries(path: &Path, name_field: &str) -> Result<Vec<RegionGeometry>> {
    let source = std::fs::read_to_string(path).map_err(|e| PipelineError::geometry(path, e))?;
    let geometries =
        parse_geometries(&source, name_field).map_err(|e| PipelineError::geometry(path, e))?;
    tracing::info!(regions = geometries.len(), "geometry loaded");
    Ok(geometries)
}

// ============================================================================
// GEOMETRY JOIN
// ============================================================================

/// Result of matching summaries to shapes by region name
#[derive(Debug)]
pub struct GeometryJoin<'a> {
    pub matched: Vec<(&'a RegionGeometry, &'a RegionSummary)>,
    /// Summary rows with no shape (code, name if any)
    pub unmatched_summaries: Vec<String>,
    /// Shapes with no summary row
    pub unmatched_geometries: Vec<String>,
}

impl GeometryJoin<'_> {
    pub fn dropped(&self) -> usize {
        self.unmatched_summaries.len() + self.unmatched_geometries.len()
    }
}

/// Inner join on region name; both sides' leftovers are counted and dropped
pub fn join_geometry<'a>(
    geometries: &'a [RegionGeometry],
    summaries: &'a [RegionSummary],
) -> GeometryJoin<'a> {
    let by_name: HashMap<&str, &RegionSummary> = summaries
        .iter()
        .filter_map(|s| s.region_name.as_deref().map(|name| (name, s)))
        .collect();

    let mut matched = Vec::new();
    let mut unmatched_geometries = Vec::new();
    for geometry in geometries {
        match by_name.get(geometry.name.as_str()) {
            Some(summary) => matched.push((geometry, *summary)),
            None => unmatched_geometries.push(geometry.name.clone()),
        }
    }

    let unmatched_summaries: Vec<String> = summaries
        .iter()
        .filter(|s| {
            s.region_name
                .as_deref()
                .map(|name| !geometries.iter().any(|g| g.name == name))
                .unwrap_or(true)
        })
        .map(|s| match &s.region_name {
            Some(name) => format!("{} ({})", s.region_code, name),
            None => s.region_code.clone(),
        })
        .collect();

    if !unmatched_summaries.is_empty() {
        tracing::warn!(
            rows = unmatched_summaries.len(),
            regions = ?unmatched_summaries,
            "summary rows without geometry dropped from maps"
        );
    }
    if !unmatched_geometries.is_empty() {
        tracing::warn!(
            shapes = unmatched_geometries.len(),
            regions = ?unmatched_geometries,
            "shapes without summary rows dropped from maps"
        );
    }

    GeometryJoin {
        matched,
        unmatched_summaries,
        unmatched_geometries,
    }
}
