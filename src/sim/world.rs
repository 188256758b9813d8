/// WorldState: the complete snapshot of a running level.
///
/// ## Level layers
///
///   - `pristine`: the level as parsed. **Never mutated** after load.
///   - `level`:    working copy; only artifact/pickup `collected` flags change.
///
/// `step::restart_level` rebuilds everything (player, sentries, fog, alert,
/// decoy, clock, RNG) from `pristine`, so nothing leaks across resets.
///
/// ## Clock
///
/// `clock` is simulation seconds since level start, advanced only by
/// `step` with a clamped delta. Every timer in the session is an absolute
/// timestamp on this clock.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::Tuning;
use crate::domain::detection;
use crate::domain::entity::{Decoy, Player};
use crate::domain::grid::Pos;
use crate::domain::sentry::Sentry;
use crate::domain::sonar::{AlertLevel, DampenerWindow, PingWave, SonarEmitter};
use crate::domain::visibility::VisibilityField;
use crate::sim::level::Level;

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Playing,
    Won { pings: u32, elapsed: f32 },
    Lost { reason: String },
}

impl Outcome {
    pub fn is_over(&self) -> bool {
        !matches!(self, Outcome::Playing)
    }
}

pub struct WorldState {
    // ── Level layers ──
    pristine: Level,
    pub level: Level,

    // ── Entities ──
    pub player: Player,
    pub sentries: Vec<Sentry>,
    pub decoy: Option<Decoy>,

    // ── Sonar / fog ──
    pub visibility: VisibilityField,
    pub sonar: SonarEmitter,
    pub alert: AlertLevel,
    pub dampener: DampenerWindow,
    /// Presentation-only ring records; pruned by age.
    pub pings: Vec<PingWave>,

    // ── Clock / outcome ──
    pub clock: f32,
    pub tick: u64,
    pub outcome: Outcome,
    /// Distance to the closest sentry after the last detection pass.
    pub nearest_sentry: Option<f32>,
    /// Detection radius used by the last detection pass.
    pub detection_radius: f32,

    // ── Tuning / randomness ──
    pub tuning: Tuning,
    seed: u64,
    pub rng: ChaCha8Rng,
}

// ── Construction ──

impl WorldState {
    pub fn new(level: Level, tuning: Tuning, seed: u64) -> Self {
        let working = level.clone();
        let player = Player::new(level.player_spawn, level.start_resources);
        let sentries = level.sentry_spawns.iter()
            .enumerate()
            .map(|(id, &home)| Sentry::new(id, home))
            .collect();
        let visibility = VisibilityField::new(
            &level.grid,
            tuning.visibility.reveal_duration,
            tuning.visibility.ambient_radius,
        );
        let sonar = SonarEmitter::new(tuning.sonar.clone());
        let detection_radius = detection::detection_radius(
            &tuning.detection, AlertLevel::default(), false,
        );

        tracing::info!(
            level = %level.id,
            sentries = level.sentry_spawns.len(),
            artifacts = level.artifacts.len(),
            seed,
            "level loaded"
        );

        WorldState {
            pristine: level,
            level: working,
            player,
            sentries,
            decoy: None,
            visibility,
            sonar,
            alert: AlertLevel::default(),
            dampener: DampenerWindow::default(),
            pings: vec![],
            clock: 0.0,
            tick: 0,
            outcome: Outcome::Playing,
            nearest_sentry: None,
            detection_radius,
            tuning,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// The level exactly as it was loaded.
    pub fn pristine_level(&self) -> &Level {
        &self.pristine
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

// ── Queries ──

impl WorldState {
    #[inline]
    pub fn is_dampened(&self) -> bool {
        self.dampener.is_active(self.clock)
    }

    /// How visible `tile` is to the player right now, in [0, 1].
    #[inline]
    pub fn visibility_at(&self, tile: Pos) -> f32 {
        self.visibility.visibility_at(self.player.pos, tile)
    }

    pub fn ping_count(&self) -> u32 {
        self.sonar.ping_count()
    }

    pub fn sentry_at(&self, p: Pos) -> Option<&Sentry> {
        self.sentries.iter().find(|s| s.pos == p)
    }

    pub fn exit_open(&self) -> bool {
        self.level.all_artifacts_collected()
    }
}
