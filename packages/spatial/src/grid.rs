//! Uniform analysis grid over a bounding box.
//!
//! Cells are square in meters at the box's middle latitude, so their size
//! in degrees differs between the two axes. Cells are addressed by
//! `(row, col)` counted from the south-west corner.

use geo::{BoundingRect, Coord, MultiPoint, Point, Rect};

/// Meters per degree of latitude.
const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Address of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId {
    /// Row counted northwards from the south edge.
    pub row: u32,
    /// Column counted eastwards from the west edge.
    pub col: u32,
}

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}_c{}", self.row, self.col)
    }
}

/// A uniform grid covering a bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    bounds: Rect<f64>,
    cell_size_m: f64,
    cell_lat_deg: f64,
    cell_lng_deg: f64,
    rows: u32,
    cols: u32,
}

impl Grid {
    /// Builds a grid covering `bounds` (x = longitude, y = latitude).
    ///
    /// Returns `None` if the cell size is not a positive finite number.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn covering(bounds: Rect<f64>, cell_size_m: f64) -> Option<Self> {
        if !cell_size_m.is_finite() || cell_size_m <= 0.0 {
            return None;
        }

        let mid_lat = bounds.center().y.to_radians();
        let cell_lat_deg = cell_size_m / METERS_PER_DEGREE_LAT;
        let cell_lng_deg = cell_size_m / (METERS_PER_DEGREE_LAT * mid_lat.cos().max(1e-6));

        let rows = ((bounds.height() / cell_lat_deg).ceil() as u32).max(1);
        let cols = ((bounds.width() / cell_lng_deg).ceil() as u32).max(1);

        log::debug!("Grid of {rows}x{cols} cells at {cell_size_m} m");

        Some(Self {
            bounds,
            cell_size_m,
            cell_lat_deg,
            cell_lng_deg,
            rows,
            cols,
        })
    }

    /// Builds a grid covering the bounding box of `(latitude, longitude)`
    /// points. Returns `None` when there are no points or the cell size is
    /// invalid.
    #[must_use]
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>, cell_size_m: f64) -> Option<Self> {
        let multi_point: MultiPoint<f64> = points
            .into_iter()
            .map(|(lat, lng)| Point::new(lng, lat))
            .collect();
        let bounds = multi_point.bounding_rect()?;
        Self::covering(bounds, cell_size_m)
    }

    /// Cell containing a point, or `None` when it lies outside the grid.
    /// Points on the north/east edge belong to the last row/column.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn cell_of(&self, lat: f64, lng: f64) -> Option<CellId> {
        let min = self.bounds.min();
        let max = self.bounds.max();
        if !(min.y..=max.y).contains(&lat) || !(min.x..=max.x).contains(&lng) {
            return None;
        }

        let row = (((lat - min.y) / self.cell_lat_deg).floor() as u32).min(self.rows - 1);
        let col = (((lng - min.x) / self.cell_lng_deg).floor() as u32).min(self.cols - 1);
        Some(CellId { row, col })
    }

    /// Bounding box of a cell (x = longitude, y = latitude).
    #[must_use]
    pub fn cell_bounds(&self, cell: CellId) -> Rect<f64> {
        let min = self.bounds.min();
        let south = f64::from(cell.row).mul_add(self.cell_lat_deg, min.y);
        let west = f64::from(cell.col).mul_add(self.cell_lng_deg, min.x);
        Rect::new(
            Coord { x: west, y: south },
            Coord {
                x: west + self.cell_lng_deg,
                y: south + self.cell_lat_deg,
            },
        )
    }

    /// Centre of a cell as `(latitude, longitude)`.
    #[must_use]
    pub fn cell_center(&self, cell: CellId) -> (f64, f64) {
        let center = self.cell_bounds(cell).center();
        (center.y, center.x)
    }

    /// Cell edge length in meters.
    #[must_use]
    pub const fn cell_size_m(&self) -> f64 {
        self.cell_size_m
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn cols(&self) -> u32 {
        self.cols
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Contains;

    fn syracuse() -> Grid {
        Grid::covering(
            Rect::new(
                Coord { x: -76.20, y: 43.00 },
                Coord { x: -76.10, y: 43.08 },
            ),
            250.0,
        )
        .unwrap()
    }

    #[test]
    fn rejects_non_positive_cell_size() {
        let bounds = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 });
        assert!(Grid::covering(bounds, 0.0).is_none());
        assert!(Grid::covering(bounds, -5.0).is_none());
        assert!(Grid::covering(bounds, f64::NAN).is_none());
    }

    #[test]
    fn dimensions_follow_cell_size() {
        let grid = syracuse();
        // 0.08 deg of latitude is ~8.9 km, so 36 rows of 250 m.
        assert_eq!(grid.rows(), 36);
        assert!(grid.cols() > 30 && grid.cols() < 36, "cols {}", grid.cols());
    }

    #[test]
    fn corners_map_to_edge_cells() {
        let grid = syracuse();
        assert_eq!(grid.cell_of(43.00, -76.20), Some(CellId { row: 0, col: 0 }));
        assert_eq!(
            grid.cell_of(43.08, -76.10),
            Some(CellId {
                row: grid.rows() - 1,
                col: grid.cols() - 1
            })
        );
        assert_eq!(grid.cell_of(42.99, -76.15), None);
    }

    #[test]
    fn cell_bounds_contain_their_centre() {
        let grid = syracuse();
        let cell = grid.cell_of(43.041, -76.142).unwrap();
        let (lat, lng) = grid.cell_center(cell);
        assert!(grid.cell_bounds(cell).contains(&Point::new(lng, lat)));
        assert_eq!(grid.cell_of(lat, lng), Some(cell));
    }

    #[test]
    fn single_point_grid_has_one_cell() {
        let grid = Grid::from_points(vec![(43.0, -76.0)], 250.0).unwrap();
        assert_eq!((grid.rows(), grid.cols()), (1, 1));
        assert!(Grid::from_points(Vec::new(), 250.0).is_none());
    }

    #[test]
    fn cell_id_display() {
        assert_eq!(CellId { row: 3, col: 12 }.to_string(), "r3_c12");
    }
}
