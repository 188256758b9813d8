/// Static tile grid: wall mask plus bounds/occupancy queries.
///
/// Storage is a flat row-major buffer: `walls[y * width + x]`.
/// The grid never changes after a level is parsed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Integer tile coordinate. Signed so neighbour arithmetic can step off
/// the edge and be rejected by `in_bounds` instead of wrapping.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub const fn new(x: i32, y: i32) -> Self {
        Pos { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Pos { x: self.x + dx, y: self.y + dy }
    }

    /// Euclidean distance in tiles.
    pub fn distance(self, other: Pos) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Neighbour enumeration order: +x, −x, +y, −y.
/// BFS tie-breaking depends on this order, so it is fixed.
pub const DIRS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    walls: Vec<bool>,
}

impl Grid {
    /// Build from row-major wall flags. `walls.len()` must equal `width * height`.
    pub fn new(width: usize, height: usize, walls: Vec<bool>) -> Self {
        assert_eq!(walls.len(), width * height, "wall mask does not match {width}x{height}");
        Grid { width, height, walls }
    }

    /// An all-floor grid.
    pub fn open(width: usize, height: usize) -> Self {
        Grid::new(width, height, vec![false; width * height])
    }

    /// Build from text rows where `#` is a wall. Handy for tests and tools.
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.chars().count());
        let mut walls = Vec::with_capacity(width * height);
        for row in rows {
            assert_eq!(row.chars().count(), width, "ragged row {row:?}");
            walls.extend(row.chars().map(|c| c == '#'));
        }
        Grid::new(width, height, walls)
    }

    #[inline]
    pub fn width(&self) -> usize { self.width }

    #[inline]
    pub fn height(&self) -> usize { self.height }

    #[inline]
    pub fn len(&self) -> usize { self.walls.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.walls.is_empty() }

    #[inline]
    pub fn in_bounds(&self, p: Pos) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as usize) < self.width && (p.y as usize) < self.height
    }

    /// Row-major index of an in-bounds tile.
    ///
    /// Panics on an out-of-bounds position: a bad x would otherwise
    /// silently land on the neighbouring row.
    #[inline]
    pub fn index(&self, p: Pos) -> usize {
        assert!(
            self.in_bounds(p),
            "tile {p} outside {}x{} grid", self.width, self.height,
        );
        p.y as usize * self.width + p.x as usize
    }

    /// Inverse of `index`.
    #[inline]
    pub fn pos_of(&self, index: usize) -> Pos {
        Pos::new((index % self.width) as i32, (index / self.width) as i32)
    }

    /// Is (x, y) a wall? Caller must check `in_bounds` first.
    #[inline]
    pub fn is_wall(&self, p: Pos) -> bool {
        self.walls[self.index(p)]
    }

    /// In bounds and not a wall.
    #[inline]
    pub fn is_open(&self, p: Pos) -> bool {
        self.in_bounds(p) && !self.is_wall(p)
    }

    /// In-bounds, non-wall 4-neighbours in `DIRS` order.
    pub fn neighbors(&self, p: Pos) -> Vec<Pos> {
        DIRS.iter()
            .map(|&(dx, dy)| p.offset(dx, dy))
            .filter(|&n| self.is_open(n))
            .collect()
    }

    /// Every tile position, row-major.
    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        (0..self.walls.len()).map(move |i| self.pos_of(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds() {
        let g = Grid::open(3, 2);
        assert!(g.in_bounds(Pos::new(0, 0)));
        assert!(g.in_bounds(Pos::new(2, 1)));
        assert!(!g.in_bounds(Pos::new(3, 0)));
        assert!(!g.in_bounds(Pos::new(0, 2)));
        assert!(!g.in_bounds(Pos::new(-1, 0)));
    }

    #[test]
    fn walls_are_row_major() {
        let g = Grid::from_rows(&[
            "..#",
            "#..",
        ]);
        assert!(g.is_wall(Pos::new(2, 0)));
        assert!(g.is_wall(Pos::new(0, 1)));
        assert!(!g.is_wall(Pos::new(1, 1)));
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn out_of_bounds_wall_query_panics() {
        let g = Grid::open(3, 3);
        // x = 3 would alias (0, 1) with naive indexing
        g.is_wall(Pos::new(3, 0));
    }

    #[test]
    fn neighbors_order_and_filtering() {
        let g = Grid::from_rows(&[
            "...",
            "..#",
            "...",
        ]);
        // +x is a wall; remaining order: -x, +y, -y
        assert_eq!(
            g.neighbors(Pos::new(1, 1)),
            vec![Pos::new(0, 1), Pos::new(1, 2), Pos::new(1, 0)],
        );
        // corner: only +x and +y in bounds
        assert_eq!(g.neighbors(Pos::new(0, 0)), vec![Pos::new(1, 0), Pos::new(0, 1)]);
    }

    #[test]
    fn index_roundtrip() {
        let g = Grid::open(4, 3);
        for p in g.positions() {
            assert_eq!(g.pos_of(g.index(p)), p);
        }
    }
}
