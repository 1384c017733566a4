//! Time-zone polygon layer used to tag grid cells with a `chrono_tz::Tz`
//! (§4.7). Shapefile I/O is out of scope here; the caller is responsible for
//! parsing a time-zone shapefile into `(Polygon, Tz)` pairs already
//! reprojected into the grid's spatial reference.

use chrono_tz::Tz;
use geo::{BoundingRect, Contains, Point as GeoPoint, Polygon};
use rstar::{RTreeObject, PointDistance, RTree, AABB};

struct ZonePolygon {
    polygon: Polygon<f64>,
    tz: Tz,
}

impl RTreeObject for ZonePolygon {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let rect = self.polygon.bounding_rect().expect("time zone polygon must be non-empty");
        AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
    }
}

impl PointDistance for ZonePolygon {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let rect = self.polygon.bounding_rect().expect("time zone polygon must be non-empty");
        let cx = (rect.min().x + rect.max().x) / 2.0;
        let cy = (rect.min().y + rect.max().y) / 2.0;
        let (dx, dy) = (point[0] - cx, point[1] - cy);
        dx * dx + dy * dy
    }
}

/// An r-tree of time-zone polygons, queried by point-in-polygon (§4.7).
pub struct TimeZoneLayer {
    tree: RTree<ZonePolygon>,
}

impl TimeZoneLayer {
    #[must_use]
    pub fn new(zones: Vec<(Polygon<f64>, Tz)>) -> Self {
        let entries = zones.into_iter().map(|(polygon, tz)| ZonePolygon { polygon, tz }).collect();
        Self { tree: RTree::bulk_load(entries) }
    }

    /// Resolve the time zone containing `(x, y)`. Returns `None` on a miss
    /// (e.g. offshore), which the caller should fall back to UTC for.
    #[must_use]
    pub fn resolve(&self, x: f64, y: f64) -> Option<Tz> {
        let point = GeoPoint::new(x, y);
        self.tree
            .locate_all_at_point(&[x, y])
            .find(|zone| zone.polygon.contains(&point) || zone.polygon.exterior().contains(&point))
            .map(|zone| zone.tz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_point_inside_zone() {
        let poly = Polygon::new(geo::LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]), vec![]);
        let layer = TimeZoneLayer::new(vec![(poly, Tz::America__New_York)]);
        assert_eq!(layer.resolve(5.0, 5.0), Some(Tz::America__New_York));
    }

    #[test]
    fn miss_returns_none() {
        let poly = Polygon::new(geo::LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]), vec![]);
        let layer = TimeZoneLayer::new(vec![(poly, Tz::America__Chicago)]);
        assert_eq!(layer.resolve(50.0, 50.0), None);
    }
}
