/// Sentry navigation: breadth-first next-hop resolver.
///
/// `next_step` searches the whole grid from `start`, recording each tile's
/// BFS parent, then walks the parent chain back from `goal` to find the
/// first hop. Neighbours are expanded in `grid::DIRS` order, which fixes
/// tie-breaking among equal-length paths and keeps results deterministic.

use std::collections::VecDeque;

use super::grid::{Grid, Pos};

const NO_PARENT: usize = usize::MAX;

/// The next tile on a shortest path from `start` to `goal`.
///
/// Returns `None` if there is no goal, `start == goal`, or the goal is
/// walled off from `start`.
pub fn next_step(grid: &Grid, start: Pos, goal: Option<Pos>) -> Option<Pos> {
    let goal = goal?;
    if start == goal { return None; }
    if !grid.is_open(start) || !grid.is_open(goal) { return None; }

    let start_idx = grid.index(start);
    let goal_idx = grid.index(goal);

    let mut parent = vec![NO_PARENT; grid.len()];
    parent[start_idx] = start_idx;

    let mut queue: VecDeque<Pos> = VecDeque::with_capacity(64);
    queue.push_back(start);

    while let Some(cur) = queue.pop_front() {
        let cur_idx = grid.index(cur);
        if cur_idx == goal_idx { break; }

        for n in grid.neighbors(cur) {
            let n_idx = grid.index(n);
            if parent[n_idx] == NO_PARENT {
                parent[n_idx] = cur_idx;
                queue.push_back(n);
            }
        }
    }

    if parent[goal_idx] == NO_PARENT { return None; }

    // Walk back until the parent is the start tile.
    let mut idx = goal_idx;
    while parent[idx] != start_idx {
        idx = parent[idx];
    }
    Some(grid.pos_of(idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Follow `next_step` until arrival; `None` if it stalls or loops.
    fn walk_len(grid: &Grid, start: Pos, goal: Pos) -> Option<usize> {
        let mut cur = start;
        let mut steps = 0;
        while cur != goal {
            cur = next_step(grid, cur, Some(goal))?;
            steps += 1;
            if steps > grid.len() { return None; }
        }
        Some(steps)
    }

    /// Shortest distances by repeated relaxation (no queue, no BFS ordering).
    fn brute_force_dist(grid: &Grid, start: Pos, goal: Pos) -> Option<usize> {
        let mut dist = vec![usize::MAX; grid.len()];
        dist[grid.index(start)] = 0;
        loop {
            let mut changed = false;
            for p in grid.positions() {
                if !grid.is_open(p) { continue; }
                let d = dist[grid.index(p)];
                if d == usize::MAX { continue; }
                for n in grid.neighbors(p) {
                    let ni = grid.index(n);
                    if dist[ni] > d + 1 {
                        dist[ni] = d + 1;
                        changed = true;
                    }
                }
            }
            if !changed { break; }
        }
        let d = dist[grid.index(goal)];
        (d != usize::MAX).then_some(d)
    }

    #[test]
    fn no_goal_or_same_tile() {
        let g = Grid::open(3, 3);
        assert_eq!(next_step(&g, Pos::new(1, 1), None), None);
        assert_eq!(next_step(&g, Pos::new(1, 1), Some(Pos::new(1, 1))), None);
    }

    #[test]
    fn open_grid_prefers_plus_x_first() {
        let g = Grid::open(5, 5);
        // Both +x and +y lie on shortest paths; +x is enumerated first.
        assert_eq!(next_step(&g, Pos::new(0, 0), Some(Pos::new(2, 2))), Some(Pos::new(1, 0)));
        assert_eq!(next_step(&g, Pos::new(4, 0), Some(Pos::new(0, 0))), Some(Pos::new(3, 0)));
    }

    #[test]
    fn repeated_calls_are_identical() {
        let g = Grid::from_rows(&[
            ".....",
            ".###.",
            ".....",
            ".#.#.",
            ".....",
        ]);
        let first = next_step(&g, Pos::new(0, 4), Some(Pos::new(4, 0)));
        for _ in 0..10 {
            assert_eq!(next_step(&g, Pos::new(0, 4), Some(Pos::new(4, 0))), first);
        }
    }

    #[test]
    fn routes_around_wall() {
        let g = Grid::from_rows(&[
            ".#.",
            ".#.",
            "...",
        ]);
        assert_eq!(walk_len(&g, Pos::new(0, 0), Pos::new(2, 0)), Some(6));
        assert_eq!(next_step(&g, Pos::new(0, 0), Some(Pos::new(2, 0))), Some(Pos::new(0, 1)));
    }

    #[test]
    fn unreachable_goal() {
        let g = Grid::from_rows(&[
            "..#..",
            "..#..",
            "..#..",
        ]);
        assert_eq!(next_step(&g, Pos::new(0, 0), Some(Pos::new(4, 2))), None);
    }

    #[test]
    fn wall_goal_is_unreachable() {
        let g = Grid::from_rows(&["..#"]);
        assert_eq!(next_step(&g, Pos::new(0, 0), Some(Pos::new(2, 0))), None);
    }

    fn small_grid() -> impl Strategy<Value = (Grid, Pos, Pos)> {
        (2usize..=6, 2usize..=6).prop_flat_map(|(w, h)| {
            (
                proptest::collection::vec(proptest::bool::weighted(0.3), w * h),
                0..w, 0..h, 0..w, 0..h,
            ).prop_map(move |(mut walls, sx, sy, gx, gy)| {
                walls[sy * w + sx] = false;
                walls[gy * w + gx] = false;
                (
                    Grid::new(w, h, walls),
                    Pos::new(sx as i32, sy as i32),
                    Pos::new(gx as i32, gy as i32),
                )
            })
        })
    }

    proptest! {
        #[test]
        fn walk_matches_brute_force_shortest((grid, start, goal) in small_grid()) {
            prop_assert_eq!(walk_len(&grid, start, goal), brute_force_dist(&grid, start, goal));
        }

        #[test]
        fn first_hop_is_adjacent_and_open((grid, start, goal) in small_grid()) {
            if let Some(hop) = next_step(&grid, start, Some(goal)) {
                prop_assert!(grid.is_open(hop));
                prop_assert_eq!((hop.x - start.x).abs() + (hop.y - start.y).abs(), 1);
            }
        }
    }
}
