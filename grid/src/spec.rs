use crate::{GridError, SpatialRef, C};
use geo::{
    geometry::{Coord, Polygon, Rect},
    polygon,
};
use std::fmt;

/// Geometry shared by every co-registered grid: dimensions, cell
/// size, upper-left corner, and spatial reference.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
    /// Number of columns (x direction).
    pub cols: usize,

    /// Number of rows (y direction, row 0 is the northern edge).
    pub rows: usize,

    /// Side length of a (square) cell in linear units.
    pub cell_size: C,

    /// Upper-left _corner_ of the upper-left cell.
    pub origin: Coord<C>,

    pub srs: SpatialRef,
}

impl GridSpec {
    pub fn new(cols: usize, rows: usize, cell_size: C, origin: Coord<C>, srs: SpatialRef) -> Self {
        Self {
            cols,
            rows,
            cell_size,
            origin,
            srs,
        }
    }

    /// Returns the number of cells.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.cols * self.rows
    }

    pub fn index(&self, col: usize, row: usize) -> usize {
        row * self.cols + col
    }

    pub fn col_row(&self, index: usize) -> (usize, usize) {
        (index % self.cols, index / self.cols)
    }

    /// Returns the cell center of (`col`, `row`).
    #[allow(clippy::cast_precision_loss)]
    pub fn cell_center(&self, col: usize, row: usize) -> Coord<C> {
        Coord {
            x: self.origin.x + (col as C + 0.5) * self.cell_size,
            y: self.origin.y - (row as C + 0.5) * self.cell_size,
        }
    }

    /// Returns the (`col`, `row`) of the cell containing `coord`, if
    /// any.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn cell_at(&self, coord: Coord<C>) -> Option<(usize, usize)> {
        let col = ((coord.x - self.origin.x) / self.cell_size).floor();
        let row = ((self.origin.y - coord.y) / self.cell_size).floor();
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (col, row) = (col as usize, row as usize);
        (col < self.cols && row < self.rows).then_some((col, row))
    }

    /// Lattice vertex (`i`, `j`) in map coordinates, where vertex
    /// (0, 0) is the grid origin.
    #[allow(clippy::cast_precision_loss)]
    pub fn vertex(&self, i: usize, j: usize) -> Coord<C> {
        Coord {
            x: self.origin.x + i as C * self.cell_size,
            y: self.origin.y - j as C * self.cell_size,
        }
    }

    /// Returns the square footprint of a cell.
    pub fn cell_polygon(&self, col: usize, row: usize) -> Polygon<C> {
        let Coord { x: w, y: n } = self.vertex(col, row);
        let Coord { x: e, y: s } = self.vertex(col + 1, row + 1);
        polygon![
            (x: w, y: s),
            (x: e, y: s),
            (x: e, y: n),
            (x: w, y: n),
            (x: w, y: s),
        ]
    }

    pub fn extent(&self) -> Rect<C> {
        Rect::new(self.vertex(0, self.rows), self.vertex(self.cols, 0))
    }

    /// Returns the in-bounds 8-connected neighbors of `index`.
    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = (Direction, usize)> + '_ {
        let (col, row) = self.col_row(index);
        Direction::ALL.into_iter().filter_map(move |dir| {
            let (dc, dr) = dir.offset();
            let c = col.checked_add_signed(dc)?;
            let r = row.checked_add_signed(dr)?;
            (c < self.cols && r < self.rows).then(|| (dir, self.index(c, r)))
        })
    }

    /// Returns `true` when cell-wise operations between grids of
    /// `self` and `other` are meaningful: same dimensions, cell size,
    /// origin, and spatial reference.
    pub fn is_coregistered(&self, other: &Self) -> bool {
        let tol = self.cell_size * 1e-6;
        self.cols == other.cols
            && self.rows == other.rows
            && (self.cell_size - other.cell_size).abs() <= tol
            && (self.origin.x - other.origin.x).abs() <= tol
            && (self.origin.y - other.origin.y).abs() <= tol
            && self.srs == other.srs
    }

    pub fn ensure_coregistered(&self, other: &Self) -> Result<(), GridError> {
        if self.srs != other.srs {
            return Err(GridError::Srs(self.srs.to_string(), other.srs.to_string()));
        }
        if self.is_coregistered(other) {
            Ok(())
        } else {
            Err(GridError::Misaligned(
                Box::new(self.clone()),
                Box::new(other.clone()),
            ))
        }
    }
}

impl fmt::Display for GridSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} @ {} from ({}, {}) in {}",
            self.cols, self.rows, self.cell_size, self.origin.x, self.origin.y, self.srs
        )
    }
}

/// One of the eight neighbor directions.
///
/// Discriminants are the ESRI back-direction codes; code 0 is
/// reserved for source cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    E = 1,
    SE = 2,
    S = 3,
    SW = 4,
    W = 5,
    NW = 6,
    N = 7,
    NE = 8,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::E,
        Direction::SE,
        Direction::S,
        Direction::SW,
        Direction::W,
        Direction::NW,
        Direction::N,
        Direction::NE,
    ];

    /// (column, row) offset; rows grow southward.
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::E => (1, 0),
            Direction::SE => (1, 1),
            Direction::S => (0, 1),
            Direction::SW => (-1, 1),
            Direction::W => (-1, 0),
            Direction::NW => (-1, -1),
            Direction::N => (0, -1),
            Direction::NE => (1, -1),
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code).checked_sub(1)?).copied()
    }

    pub fn is_diagonal(self) -> bool {
        matches!(
            self,
            Direction::SE | Direction::SW | Direction::NW | Direction::NE
        )
    }

    pub fn opposite(self) -> Self {
        Self::ALL[(self as usize + 3) % 8]
    }

    /// Compass bearing in degrees clockwise from north.
    pub fn azimuth(self) -> C {
        match self {
            Direction::N => 0.0,
            Direction::NE => 45.0,
            Direction::E => 90.0,
            Direction::SE => 135.0,
            Direction::S => 180.0,
            Direction::SW => 225.0,
            Direction::W => 270.0,
            Direction::NW => 315.0,
        }
    }

    /// Multiple of the cell size separating two cell centers in this
    /// direction.
    pub fn step(self) -> C {
        if self.is_diagonal() {
            std::f64::consts::SQRT_2
        } else {
            1.0
        }
    }
}
