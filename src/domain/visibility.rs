/// Fog-of-war: per-tile reveal timers plus the player's ambient radius.
///
/// A tile's visibility is the brighter of two signals:
///   - **glow**: `timer / reveal_duration`, left behind by a sonar pulse
///     and fading linearly to zero;
///   - **ambient**: `1 − dist/ambient_radius` around the player.
///
/// Visibility is radial. Walls do not occlude either signal, so a tile
/// behind a wall inside the ambient radius is still visible.

use super::grid::{Grid, Pos};

/// Keeps the falloff strictly positive at exactly `radius`.
pub const REVEAL_EPSILON: f32 = 1e-3;

#[derive(Clone, Debug)]
pub struct VisibilityField {
    width: usize,
    height: usize,
    timers: Vec<f32>,
    reveal_duration: f32,
    ambient_radius: f32,
}

impl VisibilityField {
    pub fn new(grid: &Grid, reveal_duration: f32, ambient_radius: f32) -> Self {
        VisibilityField {
            width: grid.width(),
            height: grid.height(),
            timers: vec![0.0; grid.len()],
            reveal_duration,
            ambient_radius,
        }
    }

    #[inline]
    fn index(&self, p: Pos) -> Option<usize> {
        if p.x < 0 || p.y < 0 { return None; }
        let (x, y) = (p.x as usize, p.y as usize);
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    pub fn reveal_duration(&self) -> f32 { self.reveal_duration }

    /// Seconds of glow left on a tile (0 outside the grid).
    pub fn timer_at(&self, p: Pos) -> f32 {
        self.index(p).map_or(0.0, |i| self.timers[i])
    }

    /// Light every tile within `radius` of `center`, brightest at the center.
    /// Never lowers a timer that is already higher.
    pub fn reveal_tiles(&mut self, center: Pos, radius: f32) {
        let reach = radius.max(0.0).ceil() as i32;
        for y in (center.y - reach)..=(center.y + reach) {
            for x in (center.x - reach)..=(center.x + reach) {
                let p = Pos::new(x, y);
                let Some(i) = self.index(p) else { continue };
                let d = center.distance(p);
                if d > radius { continue; }
                let value = self.reveal_duration * (1.0 - d / (radius + REVEAL_EPSILON));
                if value > self.timers[i] {
                    self.timers[i] = value;
                }
            }
        }
    }

    /// Decay every timer by `delta`, floored at zero.
    pub fn tick(&mut self, delta: f32) {
        for t in &mut self.timers {
            *t = (*t - delta).max(0.0);
        }
    }

    /// Combined visibility of `tile` as seen by a player at `player`, in [0, 1].
    pub fn visibility_at(&self, player: Pos, tile: Pos) -> f32 {
        let glow = if self.reveal_duration > 0.0 {
            (self.timer_at(tile) / self.reveal_duration).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let ambient = if self.ambient_radius > 0.0 {
            (1.0 - player.distance(tile) / self.ambient_radius).max(0.0)
        } else {
            0.0
        };
        glow.max(ambient)
    }

    pub fn clear(&mut self) {
        self.timers.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(w: usize, h: usize) -> VisibilityField {
        VisibilityField::new(&Grid::open(w, h), 2.0, 2.0)
    }

    #[test]
    fn reveal_is_monotonic_and_peaks_at_center() {
        let mut f = field(9, 9);
        let c = Pos::new(4, 4);
        f.reveal_tiles(Pos::new(2, 4), 3.0);
        let before: Vec<f32> = (0..81).map(|i| f.timers[i]).collect();

        f.reveal_tiles(c, 3.0);

        let grid = Grid::open(9, 9);
        let center = f.timer_at(c);
        assert!((center - 2.0).abs() < 1e-6);
        for p in grid.positions() {
            let i = grid.index(p);
            assert!(f.timers[i] >= before[i], "timer dropped at {p}");
            if c.distance(p) <= 3.0 {
                assert!(f.timers[i] <= center);
            }
        }
    }

    #[test]
    fn reveal_falloff_and_cutoff() {
        let mut f = field(9, 9);
        f.reveal_tiles(Pos::new(4, 4), 3.0);
        // inside the radius, near zero at the edge
        let edge = f.timer_at(Pos::new(7, 4));
        assert!(edge > 0.0 && edge < 0.01);
        let mid = f.timer_at(Pos::new(5, 4));
        assert!(mid > edge && mid < 2.0);
        // outside the radius: untouched
        assert_eq!(f.timer_at(Pos::new(8, 4)), 0.0);
        assert_eq!(f.timer_at(Pos::new(7, 7)), 0.0);
    }

    #[test]
    fn reveal_clips_at_grid_edge() {
        let mut f = field(3, 3);
        f.reveal_tiles(Pos::new(0, 0), 5.0);
        assert!(f.timer_at(Pos::new(2, 2)) > 0.0);
        assert_eq!(f.timer_at(Pos::new(-1, 0)), 0.0);
    }

    #[test]
    fn decay_reaches_exact_zero() {
        let mut f = field(5, 5);
        f.reveal_tiles(Pos::new(2, 2), 2.0);
        let delta = 0.25;
        let ticks = (f.reveal_duration() / delta) as usize;
        for _ in 0..ticks {
            f.tick(delta);
        }
        assert!(f.timers.iter().all(|&t| t == 0.0));
        f.tick(delta);
        assert!(f.timers.iter().all(|&t| t == 0.0));
    }

    #[test]
    fn visibility_is_max_of_glow_and_ambient() {
        let mut f = field(9, 9);
        let player = Pos::new(0, 0);
        // ambient only
        assert!((f.visibility_at(player, player) - 1.0).abs() < 1e-6);
        assert!((f.visibility_at(player, Pos::new(1, 0)) - 0.5).abs() < 1e-6);
        assert_eq!(f.visibility_at(player, Pos::new(6, 6)), 0.0);

        // glow on a far tile
        f.reveal_tiles(Pos::new(6, 6), 1.0);
        assert!((f.visibility_at(player, Pos::new(6, 6)) - 1.0).abs() < 1e-6);
        f.tick(1.0);
        assert!((f.visibility_at(player, Pos::new(6, 6)) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn walls_do_not_occlude() {
        let grid = Grid::from_rows(&[
            ".#.",
        ]);
        let f = VisibilityField::new(&grid, 2.0, 3.0);
        assert!(f.visibility_at(Pos::new(0, 0), Pos::new(2, 0)) > 0.0);
    }
}
