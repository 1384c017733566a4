//! Spatializer (§4.3): point sources resolve to a single grid cell via the
//! grid's r-tree; area sources resolve through a gridding-reference lookup
//! plus an externally supplied footprint polygon, intersected against the
//! grid and cached by (grid, surrogate id, FIPS).

mod error;
pub use error::SpatialError;

use ahash::AHashMap;
use geo::{BoundingRect, Polygon};
use parking_lot::Mutex;

use aep_domain::{Grid, Record, Surrogate};

/// External collaborator boundary (§4.3, §6): shapefile I/O is out of scope,
/// so area-source geometry and the SCC+FIPS -> surrogate-id lookup are
/// supplied by the caller rather than read from disk here.
pub trait SurrogateSource {
    fn surrogate_id(&self, scc: &str, fips: &str) -> Result<String, SpatialError>;
    fn area_geometry(&self, fips: &str) -> Result<Polygon<f64>, SpatialError>;
}

/// Axis-aligned bounding-rectangle overlap between `a` and `b`, in the same
/// units as the polygons' coordinates. Exact for the rectangular grid cells
/// this system targets; an approximation (not true polygon clipping, which
/// would need a boolean-ops crate this stack doesn't carry) for irregular
/// cells or non-rectangular area footprints.
fn rect_overlap_area(a: &Polygon<f64>, b: &Polygon<f64>) -> f64 {
    let (Some(ra), Some(rb)) = (a.bounding_rect(), b.bounding_rect()) else { return 0.0 };
    let x0 = ra.min().x.max(rb.min().x);
    let y0 = ra.min().y.max(rb.min().y);
    let x1 = ra.max().x.min(rb.max().x);
    let y1 = ra.max().y.min(rb.max().y);
    (x1 - x0).max(0.0) * (y1 - y0).max(0.0)
}

fn rect_area(p: &Polygon<f64>) -> f64 {
    p.bounding_rect().map(|r| (r.max().x - r.min().x) * (r.max().y - r.min().y)).unwrap_or(0.0)
}

/// Per-(grid, surrogate id, FIPS) surrogate cache shared across a sector's
/// area-source records (§4.3, §5).
#[derive(Default)]
pub struct Spatializer {
    cache: Mutex<AHashMap<(String, String, String), Surrogate>>,
}

impl Spatializer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Point-source allocation: single-cell surrogate plus `inGrid`/
    /// `coveredByGrid` record flags (§4.3).
    pub fn gridize_point(&self, grid: &Grid, grid_name: &str, lon: f64, lat: f64, record: &mut Record) -> Surrogate {
        let (ny, nx) = grid.shape();
        match grid.locate_point(lon, lat) {
            Some((row, col)) => {
                record.mark_grid_membership(grid_name, true, true);
                Surrogate::single_cell(ny, nx, row, col)
            }
            None => {
                record.mark_grid_membership(grid_name, grid.in_extent(lon, lat), false);
                Surrogate::new(ny, nx)
            }
        }
    }

    /// Area-source allocation: gsref-like surrogate-id lookup, footprint
    /// geometry from `source`, intersected against every grid cell and
    /// cached by (grid name, surrogate id, FIPS). Idempotent: a repeat call
    /// with the same key returns the cached surrogate without recomputing.
    pub fn gridize_area(&self, grid: &Grid, grid_name: &str, source: &dyn SurrogateSource, scc: &str, fips: &str) -> Result<Surrogate, SpatialError> {
        let surrogate_id = source.surrogate_id(scc, fips)?;
        let key = (grid_name.to_string(), surrogate_id, fips.to_string());
        if let Some(cached) = self.cache.lock().get(&key) {
            return Ok(cached.clone());
        }

        let footprint = source.area_geometry(fips)?;
        let total_area = rect_area(&footprint);
        if total_area <= 0.0 {
            return Err(SpatialError::EmptyAreaGeometry { fips: fips.to_string() });
        }

        let mut surrogate = Surrogate::new(grid.shape().0, grid.shape().1);
        for cell in grid.cells() {
            let overlap = rect_overlap_area(&cell.polygon, &footprint);
            if overlap > 0.0 {
                surrogate.set(cell.row, cell.col, overlap / total_area);
            }
        }

        self.cache.lock().insert(key, surrogate.clone());
        Ok(surrogate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aep_domain::{Dialect, Geometry};
    use float_cmp::approx_eq;
    use geo::LineString;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
        Polygon::new(LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]), vec![])
    }

    struct FixedSource {
        id: &'static str,
        geometry: Polygon<f64>,
    }

    impl SurrogateSource for FixedSource {
        fn surrogate_id(&self, _scc: &str, _fips: &str) -> Result<String, SpatialError> {
            Ok(self.id.to_string())
        }

        fn area_geometry(&self, _fips: &str) -> Result<Polygon<f64>, SpatialError> {
            Ok(self.geometry.clone())
        }
    }

    #[test]
    fn point_inside_grid_resolves_single_cell() {
        let grid = Grid::regular("g", "EPSG:4326", 3, 3, 1.0, 1.0, 0.0, 0.0);
        let spatializer = Spatializer::new();
        let mut record = Record::new("US", "17031", "2102001000", Geometry::Area, Dialect::Orl);
        let surrogate = spatializer.gridize_point(&grid, "g", 1.5, 1.5, &mut record);
        assert!(approx_eq!(f64, surrogate.sum(), 1.0, epsilon = 1e-12));
        assert!(record.in_grid("g"));
        assert!(record.covered_by_grid("g"));
    }

    #[test]
    fn point_outside_grid_marks_not_in_grid() {
        let grid = Grid::regular("g", "EPSG:4326", 3, 3, 1.0, 1.0, 0.0, 0.0);
        let spatializer = Spatializer::new();
        let mut record = Record::new("US", "17031", "2102001000", Geometry::Area, Dialect::Orl);
        let surrogate = spatializer.gridize_point(&grid, "g", 100.0, 100.0, &mut record);
        assert!(surrogate.is_empty());
        assert!(!record.in_grid("g"));
    }

    #[test]
    fn area_fully_inside_grid_sums_to_one() {
        let grid = Grid::regular("g", "EPSG:4326", 3, 3, 1.0, 1.0, 0.0, 0.0);
        let source = FixedSource { id: "SRG1", geometry: rect(0.0, 0.0, 3.0, 3.0) };
        let spatializer = Spatializer::new();
        let surrogate = spatializer.gridize_area(&grid, "g", &source, "2102001000", "17031").unwrap();
        assert!(approx_eq!(f64, surrogate.sum(), 1.0, epsilon = 1e-9));
    }

    #[test]
    fn area_partially_inside_grid_reports_fraction() {
        let grid = Grid::regular("g", "EPSG:4326", 2, 2, 1.0, 1.0, 0.0, 0.0);
        let source = FixedSource { id: "SRG2", geometry: rect(0.0, 0.0, 4.0, 1.0) };
        let spatializer = Spatializer::new();
        let surrogate = spatializer.gridize_area(&grid, "g", &source, "2102001000", "17031").unwrap();
        assert!(approx_eq!(f64, surrogate.sum(), 0.5, epsilon = 1e-9));
    }

    #[test]
    fn area_lookup_is_cached_and_idempotent() {
        let grid = Grid::regular("g", "EPSG:4326", 3, 3, 1.0, 1.0, 0.0, 0.0);
        let source = FixedSource { id: "SRG1", geometry: rect(0.0, 0.0, 3.0, 3.0) };
        let spatializer = Spatializer::new();
        let first = spatializer.gridize_area(&grid, "g", &source, "2102001000", "17031").unwrap();
        let second = spatializer.gridize_area(&grid, "g", &source, "2102001000", "17031").unwrap();
        assert_eq!(first.get(0, 0), second.get(0, 0));
    }
}
