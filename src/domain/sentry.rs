/// Sentry AI: a three-state machine steered by BFS.
///
///   Idle ──pulse──▶ Investigate ──linger elapsed──▶ Return ──home──▶ Idle
///     ▲                  ▲                             │
///     └──────────────────┴──────────pulse──────────────┘
///
/// Any pulse (player ping or decoy) retargets every sentry, whatever its
/// state. State transitions are evaluated every tick; movement only when
/// the sentry's move clock passes its alert-scaled step interval.
///
/// Randomness (the wander fallback) comes from an injected `Rng`, so a
/// seeded generator replays the same decisions.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::SentryConfig;

use super::grid::{Grid, Pos};
use super::path;
use super::sonar::AlertLevel;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SentryState {
    Idle,
    Investigate,
    Return,
}

#[derive(Clone, Debug)]
pub struct Sentry {
    pub id: usize,
    pub pos: Pos,
    pub home: Pos,
    pub state: SentryState,
    pub target: Option<Pos>,
    /// Seconds accumulated toward the next step.
    pub move_clock: f32,
    /// Session time at which a lingering investigation gives up.
    pub wait_until: Option<f32>,
}

/// Seconds between steps at the given alert level.
pub fn step_interval(cfg: &SentryConfig, alert: AlertLevel) -> f32 {
    (cfg.base_step_interval - alert.ratio() * cfg.alert_speedup).max(cfg.min_step_interval)
}

impl Sentry {
    pub fn new(id: usize, home: Pos) -> Self {
        Sentry {
            id,
            pos: home,
            home,
            state: SentryState::Idle,
            target: None,
            move_clock: 0.0,
            wait_until: None,
        }
    }

    /// A pulse went off at `origin`: drop everything and go look.
    pub fn alarm(&mut self, origin: Pos) {
        if self.state != SentryState::Investigate || self.target != Some(origin) {
            tracing::debug!(id = self.id, %origin, from = ?self.state, "sentry alarmed");
        }
        self.state = SentryState::Investigate;
        self.target = Some(origin);
        self.wait_until = None;
    }

    /// Is the sentry parked at its investigation target?
    pub fn is_lingering(&self) -> bool {
        self.state == SentryState::Investigate && self.target == Some(self.pos)
    }

    /// Apply arrival-driven transitions for the current position.
    fn advance_state(&mut self, now: f32, linger: f32) {
        match self.state {
            SentryState::Investigate if self.target == Some(self.pos) => {
                match self.wait_until {
                    None => self.wait_until = Some(now + linger),
                    Some(deadline) if now >= deadline => {
                        tracing::debug!(id = self.id, "sentry giving up, returning home");
                        self.state = SentryState::Return;
                        self.target = Some(self.home);
                        self.wait_until = None;
                    }
                    Some(_) => {}
                }
            }
            SentryState::Return if self.pos == self.home => {
                tracing::debug!(id = self.id, "sentry back home");
                self.state = SentryState::Idle;
                self.target = None;
            }
            _ => {}
        }
    }

    /// Advance one tick. Returns `true` if the sentry changed tile.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        grid: &Grid,
        now: f32,
        delta: f32,
        alert: AlertLevel,
        cfg: &SentryConfig,
        rng: &mut R,
    ) -> bool {
        self.advance_state(now, cfg.linger);

        self.move_clock += delta;
        if self.move_clock < step_interval(cfg, alert) {
            return false;
        }
        self.move_clock = 0.0;

        if self.is_lingering() {
            return false;
        }

        let hop = match self.state {
            SentryState::Idle => None,
            SentryState::Investigate | SentryState::Return => {
                path::next_step(grid, self.pos, self.target)
            }
        };

        let next = match hop {
            Some(h) => Some(h),
            None => self.wander(grid, cfg.wander_chance, rng),
        };

        match next {
            Some(p) => {
                self.pos = p;
                self.advance_state(now, cfg.linger);
                true
            }
            None => false,
        }
    }

    fn wander<R: Rng + ?Sized>(&self, grid: &Grid, chance: f64, rng: &mut R) -> Option<Pos> {
        if !rng.gen_bool(chance.clamp(0.0, 1.0)) {
            return None;
        }
        grid.neighbors(self.pos).choose(rng).copied()
    }

    /// Put the sentry back on its spawn tile in the idle state.
    pub fn reset(&mut self) {
        *self = Sentry::new(self.id, self.home);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn cfg() -> SentryConfig {
        SentryConfig {
            base_step_interval: 0.5,
            min_step_interval: 0.2,
            alert_speedup: 0.4,
            linger: 1.0,
            wander_chance: 0.0,
        }
    }

    #[test]
    fn interval_shrinks_with_alert_and_floors() {
        let c = cfg();
        let mut a = AlertLevel::default();
        assert!((step_interval(&c, a) - 0.5).abs() < 1e-6);
        a.add(50.0);
        assert!((step_interval(&c, a) - 0.3).abs() < 1e-6);
        a.add(50.0);
        assert!((step_interval(&c, a) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn converges_on_ping_origin_in_straight_line() {
        let grid = Grid::open(5, 5);
        let mut s = Sentry::new(0, Pos::new(4, 0));
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        s.alarm(Pos::new(0, 0));

        let mut now = 0.0;
        for _ in 0..100 {
            now += 0.1;
            s.update(&grid, now, 0.1, AlertLevel::default(), &cfg(), &mut rng);
            assert_eq!(s.pos.y, 0, "left the straight line at {}", s.pos);
            if s.pos == Pos::new(0, 0) { break; }
        }
        assert_eq!(s.pos, Pos::new(0, 0));
        assert_eq!(s.state, SentryState::Investigate);
    }

    #[test]
    fn full_cycle_investigate_return_idle() {
        // Home sits several tiles from the target so the walk back spans ticks.
        let grid = Grid::open(5, 1);
        let mut s = Sentry::new(0, Pos::new(4, 0));
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let c = cfg();
        s.alarm(Pos::new(0, 0));

        let mut now = 0.0;
        let mut seen_wait = false;
        let mut seen_return = false;
        for _ in 0..200 {
            now += 0.1;
            s.update(&grid, now, 0.1, AlertLevel::default(), &c, &mut rng);
            if s.wait_until.is_some() { seen_wait = true; }
            if s.state == SentryState::Return {
                seen_return = true;
                assert_eq!(s.target, Some(Pos::new(4, 0)));
                assert!(s.wait_until.is_none());
            }
            if seen_return && s.state == SentryState::Idle { break; }
        }
        assert!(seen_wait);
        assert!(seen_return);
        assert_eq!(s.state, SentryState::Idle);
        assert_eq!(s.pos, Pos::new(4, 0));
        assert_eq!(s.target, None);
    }

    #[test]
    fn lingers_before_returning() {
        let grid = Grid::open(3, 1);
        let mut s = Sentry::new(0, Pos::new(1, 0));
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        s.alarm(Pos::new(1, 0));

        s.update(&grid, 0.1, 0.1, AlertLevel::default(), &cfg(), &mut rng);
        let deadline = s.wait_until.expect("wait deadline set on arrival");
        assert!((deadline - 1.1).abs() < 1e-5);
        s.update(&grid, 1.0, 0.9, AlertLevel::default(), &cfg(), &mut rng);
        assert_eq!(s.state, SentryState::Investigate);
        assert_eq!(s.pos, Pos::new(1, 0));
        s.update(&grid, 1.2, 0.2, AlertLevel::default(), &cfg(), &mut rng);
        assert_eq!(s.state, SentryState::Return);
    }

    #[test]
    fn alarm_clears_pending_wait() {
        let mut s = Sentry::new(0, Pos::new(0, 0));
        s.state = SentryState::Return;
        s.wait_until = Some(5.0);
        s.alarm(Pos::new(3, 3));
        assert_eq!(s.state, SentryState::Investigate);
        assert_eq!(s.target, Some(Pos::new(3, 3)));
        assert_eq!(s.wait_until, None);
    }

    #[test]
    fn unreachable_target_falls_back_to_wander() {
        let grid = Grid::from_rows(&[
            "..#..",
            "..#..",
        ]);
        let mut wander = SentryConfig { wander_chance: 1.0, ..cfg() };
        let mut s = Sentry::new(0, Pos::new(0, 0));
        s.alarm(Pos::new(4, 0));
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        assert!(s.update(&grid, 0.5, 0.5, AlertLevel::default(), &wander, &mut rng));
        assert!(grid.is_open(s.pos));
        assert!(s.pos.x < 2);

        wander.wander_chance = 0.0;
        let before = s.pos;
        assert!(!s.update(&grid, 1.0, 0.5, AlertLevel::default(), &wander, &mut rng));
        assert_eq!(s.pos, before);
    }

    #[test]
    fn seeded_wander_is_reproducible() {
        let grid = Grid::open(6, 6);
        let c = SentryConfig { wander_chance: 0.5, ..cfg() };
        let run = |seed: u64| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut s = Sentry::new(0, Pos::new(3, 3));
            let mut trail = vec![];
            for i in 0..50 {
                s.update(&grid, i as f32 * 0.5, 0.5, AlertLevel::default(), &c, &mut rng);
                trail.push(s.pos);
            }
            trail
        };
        assert_eq!(run(9), run(9));
    }

    #[test]
    fn idle_sentry_without_wander_stays_put() {
        let grid = Grid::open(3, 3);
        let mut s = Sentry::new(0, Pos::new(1, 1));
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for i in 0..20 {
            s.update(&grid, i as f32, 1.0, AlertLevel::default(), &cfg(), &mut rng);
        }
        assert_eq!(s.pos, Pos::new(1, 1));
    }
}
