//! ZIP code tabulation area boundaries.
//!
//! Boundaries are read from the extracted shapefile and then narrowed to the
//! ZIP codes that actually occur in the incident data.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use shapefile::dbase::{FieldValue, Record};
use shapefile::{PolygonRing, Shape};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::incident::ZipCode;

/// A `[longitude, latitude]` pair.
pub type Position = [f64; 2];

/// A polygon as a list of rings; the first ring is the exterior.
pub type Polygon = Vec<Vec<Position>>;

/// The outline of one ZCTA.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Boundary {
    /// The ZIP code this area represents.
    pub zip: ZipCode,
    /// One or more polygons making up the area.
    pub polygons: Vec<Polygon>,
}

impl Boundary {
    /// Create a boundary from its polygons.
    #[must_use]
    pub fn new(zip: ZipCode, polygons: Vec<Polygon>) -> Self {
        Self { zip, polygons }
    }

    /// The boundary as a GeoJSON `Feature` keyed by ZIP.
    #[must_use]
    pub fn to_feature(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "Feature",
            "id": self.zip,
            "properties": { "zip": self.zip },
            "geometry": {
                "type": "MultiPolygon",
                "coordinates": self.polygons,
            },
        })
    }
}

/// Group shapefile rings into polygons.
///
/// Each outer ring starts a new polygon; inner rings (holes) belong to the
/// most recent outer ring. A hole with no preceding outer ring is dropped.
pub fn group_rings<P>(rings: &[PolygonRing<P>], xy: impl Fn(&P) -> Position) -> Vec<Polygon> {
    let mut polygons: Vec<Polygon> = Vec::new();
    for ring in rings {
        let points: Vec<Position> = ring.points().iter().map(&xy).collect();
        match ring {
            PolygonRing::Outer(_) => polygons.push(vec![points]),
            PolygonRing::Inner(_) => {
                if let Some(polygon) = polygons.last_mut() {
                    polygon.push(points);
                }
            }
        }
    }
    polygons
}

/// Extract polygons from any polygon-bearing shape.
fn shape_polygons(shape: &Shape) -> Option<Vec<Polygon>> {
    let polygons = match shape {
        Shape::Polygon(p) => group_rings(p.rings(), |pt| [pt.x, pt.y]),
        Shape::PolygonM(p) => group_rings(p.rings(), |pt| [pt.x, pt.y]),
        Shape::PolygonZ(p) => group_rings(p.rings(), |pt| [pt.x, pt.y]),
        _ => return None,
    };
    (!polygons.is_empty()).then_some(polygons)
}

/// Read the ZIP attribute from a dBase record.
fn record_zip(record: &Record, field: &str) -> Option<ZipCode> {
    match record.get(field)? {
        FieldValue::Character(Some(value)) => ZipCode::normalize(value),
        FieldValue::Numeric(Some(value)) => ZipCode::normalize(&format!("{value}")),
        _ => None,
    }
}

/// Load every boundary from a shapefile.
///
/// `zip_field` names the attribute holding the ZCTA code. Shapes without
/// polygons and records without a usable ZIP are skipped.
///
/// # Errors
///
/// Returns an error if the shapefile is missing or cannot be parsed.
pub fn load_boundaries(path: impl AsRef<Path>, zip_field: &str) -> Result<Vec<Boundary>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::ShapefileMissing {
            path: path.to_path_buf(),
        });
    }

    debug!("Reading boundaries from {}", path.display());
    let mut reader = shapefile::Reader::from_path(path)?;

    let mut boundaries = Vec::new();
    let mut skipped = 0usize;
    for item in reader.iter_shapes_and_records() {
        let (shape, record) = item?;
        match (record_zip(&record, zip_field), shape_polygons(&shape)) {
            (Some(zip), Some(polygons)) => boundaries.push(Boundary::new(zip, polygons)),
            _ => skipped += 1,
        }
    }

    debug!(loaded = boundaries.len(), skipped, "Read boundary shapes");
    Ok(boundaries)
}

/// Keep only the boundaries whose ZIP occurs in `observed`.
#[must_use]
pub fn retain_observed(boundaries: Vec<Boundary>, observed: &HashSet<ZipCode>) -> Vec<Boundary> {
    let total = boundaries.len();
    let retained: Vec<Boundary> = boundaries
        .into_iter()
        .filter(|b| observed.contains(&b.zip))
        .collect();
    info!(
        retained = retained.len(),
        total, "Restricted boundaries to observed ZIP codes"
    );
    retained
}

/// Build a GeoJSON `FeatureCollection` from boundaries.
#[must_use]
pub fn feature_collection(boundaries: &[Boundary]) -> serde_json::Value {
    serde_json::json!({
        "type": "FeatureCollection",
        "features": boundaries.iter().map(Boundary::to_feature).collect::<Vec<_>>(),
    })
}

/// Shapefile fixtures shared by tests.
#[cfg(test)]
pub(crate) mod test_support {
    use std::path::{Path, PathBuf};

    use shapefile::dbase::{FieldValue, Record, TableWriterBuilder};
    use shapefile::{Point, Polygon, PolygonRing};

    /// Write `<dir>/<layer>.shp` with `.shx` and `.dbf` siblings, one unit
    /// square per ZIP, the ZIP stored in the character attribute `field`.
    pub(crate) fn write_zcta_shapefile(
        dir: &Path,
        layer: &str,
        field: &str,
        zips: &[&str],
    ) -> PathBuf {
        let path = dir.join(format!("{layer}.shp"));
        let table = TableWriterBuilder::new().add_character_field(field.try_into().unwrap(), 5);
        let mut writer = shapefile::Writer::from_path(&path, table).unwrap();

        let mut x = 0.0;
        for zip in zips {
            let polygon = Polygon::new(PolygonRing::Outer(vec![
                Point::new(x, 0.0),
                Point::new(x, 1.0),
                Point::new(x + 1.0, 1.0),
                Point::new(x + 1.0, 0.0),
                Point::new(x, 0.0),
            ]));
            let mut record = Record::default();
            record.insert(
                field.to_string(),
                FieldValue::Character(Some((*zip).to_string())),
            );
            writer.write_shape_and_record(&polygon, &record).unwrap();
            x += 2.0;
        }
        drop(writer);

        path
    }
}
