//! Grid model: regular and irregular output grids, an r-tree cell index,
//! and time-zone tagging of cells (§3, §4.7).

mod error;
pub use error::GridError;

pub mod timezone;
pub use timezone::TimeZoneLayer;

use ahash::AHashMap;
use chrono_tz::Tz;
use geo::{BoundingRect, Contains, Point as GeoPoint, Polygon};
use rstar::{Envelope, RTree, RTreeObject, PointDistance, AABB};

/// One grid cell: its `(row, col)` index and its footprint polygon.
///
/// For a regular grid the polygon is always an axis-aligned rectangle; for
/// an irregular grid it is whatever shape the caller supplied.
#[derive(Debug, Clone)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
    pub polygon: Polygon<f64>,
}

impl RTreeObject for GridCell {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let rect = self.polygon.bounding_rect().expect("grid cell polygon must be non-empty");
        AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
    }
}

impl PointDistance for GridCell {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let rect = self.polygon.bounding_rect().expect("grid cell polygon must be non-empty");
        let cx = (rect.min().x + rect.max().x) / 2.0;
        let cy = (rect.min().y + rect.max().y) / 2.0;
        let (dx, dy) = (point[0] - cx, point[1] - cy);
        dx * dx + dy * dy
    }
}

fn rectangle(x0: f64, y0: f64, dx: f64, dy: f64, col: usize, row: usize) -> Polygon<f64> {
    let (xmin, ymin) = (x0 + col as f64 * dx, y0 + row as f64 * dy);
    let (xmax, ymax) = (xmin + dx, ymin + dy);
    Polygon::new(
        geo::LineString::from(vec![(xmin, ymin), (xmax, ymin), (xmax, ymax), (xmin, ymax), (xmin, ymin)]),
        vec![],
    )
}

/// A regular or irregular output grid.
///
/// Regardless of shape, a `Grid` exposes the same point-lookup and
/// time-zone interfaces: the spatializer and temporalizer never need to know
/// which kind of grid they are allocating into.
pub struct Grid {
    pub name: String,
    pub spatial_ref: String,
    ny: usize,
    nx: usize,
    tree: RTree<GridCell>,
    timezones: AHashMap<(usize, usize), Tz>,
    extent: AABB<[f64; 2]>,
}

impl Grid {
    /// Build a regular grid: `nx` columns by `ny` rows of `dx` x `dy` cells,
    /// with `(x0, y0)` the lower-left corner.
    #[must_use]
    pub fn regular(name: impl Into<String>, spatial_ref: impl Into<String>, nx: usize, ny: usize, dx: f64, dy: f64, x0: f64, y0: f64) -> Self {
        let mut cells = Vec::with_capacity(nx * ny);
        for row in 0..ny {
            for col in 0..nx {
                cells.push(GridCell { row, col, polygon: rectangle(x0, y0, dx, dy, col, row) });
            }
        }
        let extent = AABB::from_corners([x0, y0], [x0 + nx as f64 * dx, y0 + ny as f64 * dy]);
        Self { name: name.into(), spatial_ref: spatial_ref.into(), ny, nx, tree: RTree::bulk_load(cells), timezones: AHashMap::new(), extent }
    }

    /// Build an irregular grid from a list of polygons already transformed
    /// into the grid's spatial reference: one column, one row per polygon,
    /// as (row, col=0) (§4.7).
    #[must_use]
    pub fn irregular(name: impl Into<String>, spatial_ref: impl Into<String>, polygons: Vec<Polygon<f64>>) -> Self {
        let mut cells = Vec::with_capacity(polygons.len());
        let mut extent: Option<AABB<[f64; 2]>> = None;
        for (row, polygon) in polygons.into_iter().enumerate() {
            let rect = polygon.bounding_rect().expect("irregular grid polygon must be non-empty");
            let cell_extent = AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);
            extent = Some(match extent {
                Some(e) => e.merged(&cell_extent),
                None => cell_extent,
            });
            cells.push(GridCell { row, col: 0, polygon });
        }
        let ny = cells.len();
        let extent = extent.unwrap_or_else(|| AABB::from_point([0.0, 0.0]));
        Self { name: name.into(), spatial_ref: spatial_ref.into(), ny, nx: 1, tree: RTree::bulk_load(cells), timezones: AHashMap::new(), extent }
    }

    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.ny, self.nx)
    }

    /// `true` if `(x, y)` falls within the grid's overall bounding extent,
    /// regardless of whether it lands inside an actual cell (a grid may
    /// have gaps, e.g. an irregular county grid).
    #[must_use]
    pub fn in_extent(&self, x: f64, y: f64) -> bool {
        self.extent.contains_point(&[x, y])
    }

    /// Locate the single cell containing `(x, y)`, if any.
    #[must_use]
    pub fn locate_point(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let point = GeoPoint::new(x, y);
        self.tree
            .locate_all_at_point(&[x, y])
            .find(|cell| cell.polygon.contains(&point) || cell.polygon.exterior().contains(&point))
            .map(|cell| (cell.row, cell.col))
    }

    /// Attach time-zone tags to every cell by projecting each cell's
    /// centroid into the supplied time-zone layer (§4.7). Cells with no
    /// matching zone (e.g. offshore) default to UTC, preserving the
    /// original source behavior called out in the Open Questions (§9).
    #[must_use]
    pub fn with_timezones(mut self, layer: &TimeZoneLayer) -> Self {
        for cell in self.tree.iter() {
            let centroid = cell.polygon.bounding_rect().map(|r| r.center()).unwrap_or(geo::Coord { x: 0.0, y: 0.0 });
            let tz = layer.resolve(centroid.x, centroid.y).unwrap_or(Tz::UTC);
            self.timezones.insert((cell.row, cell.col), tz);
        }
        self
    }

    #[must_use]
    pub fn timezone_for_cell(&self, row: usize, col: usize) -> Tz {
        self.timezones.get(&(row, col)).copied().unwrap_or(Tz::UTC)
    }

    pub fn cells(&self) -> impl Iterator<Item = &GridCell> {
        self.tree.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_grid_locates_interior_point() {
        let grid = Grid::regular("g", "EPSG:4326", 3, 3, 1.0, 1.0, 0.0, 0.0);
        assert_eq!(grid.locate_point(1.5, 1.5), Some((1, 1)));
        assert_eq!(grid.locate_point(0.5, 0.5), Some((0, 0)));
    }

    #[test]
    fn point_outside_extent_returns_none() {
        let grid = Grid::regular("g", "EPSG:4326", 3, 3, 1.0, 1.0, 0.0, 0.0);
        assert!(!grid.in_extent(100.0, 100.0));
        assert_eq!(grid.locate_point(100.0, 100.0), None);
    }

    #[test]
    fn irregular_grid_assigns_single_column() {
        let polys = vec![
            Polygon::new(geo::LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]), vec![]),
            Polygon::new(geo::LineString::from(vec![(2.0, 0.0), (3.0, 0.0), (3.0, 1.0), (2.0, 1.0), (2.0, 0.0)]), vec![]),
        ];
        let grid = Grid::irregular("counties", "EPSG:4326", polys);
        assert_eq!(grid.shape(), (2, 1));
        assert_eq!(grid.locate_point(0.5, 0.5), Some((0, 0)));
        assert_eq!(grid.locate_point(2.5, 0.5), Some((1, 0)));
    }

    #[test]
    fn unresolved_timezone_defaults_to_utc() {
        let grid = Grid::regular("g", "EPSG:4326", 2, 2, 1.0, 1.0, 0.0, 0.0).with_timezones(&TimeZoneLayer::new(vec![]));
        assert_eq!(grid.timezone_for_cell(0, 0), Tz::UTC);
    }
}
