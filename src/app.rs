/// Front-end state around a level session: which screen is up, the level
/// list, best records, and transient status messages.
///
/// The simulation knows nothing about screens; it only ever sees a
/// `WorldState`. Everything here is presentation flow.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use deepecho::config::GameConfig;
use deepecho::sim::level::{available_levels, Level};
use deepecho::sim::records::{records_path, BestRecords};
use deepecho::sim::step;
use deepecho::sim::world::{Outcome, WorldState};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Screen {
    /// Title + level list.
    Title,
    Playing,
    /// Level finished, won or lost.
    Result,
}

/// Ticks a status message stays on screen.
pub const MESSAGE_TICKS: u32 = 60;

pub struct App {
    pub screen: Screen,
    pub levels: Vec<Level>,
    /// Level list selection on the title screen.
    pub cursor: usize,
    /// Index of the level in `world`.
    pub current: usize,
    pub world: Option<WorldState>,
    pub records: BestRecords,
    records_path: PathBuf,
    /// Did the last win set a new best?
    pub new_record: bool,
    pub paused: bool,
    pub message: String,
    message_timer: u32,
    pub anim_tick: u32,
    config: GameConfig,
}

impl App {
    pub fn new(config: GameConfig) -> Self {
        let levels = available_levels(&config.levels_dir);
        let records_path = records_path();
        let records = BestRecords::load(&records_path);
        tracing::info!(
            levels = levels.len(),
            records = records.len(),
            path = %records_path.display(),
            "front end ready"
        );
        App {
            screen: Screen::Title,
            levels,
            cursor: 0,
            current: 0,
            world: None,
            records,
            records_path,
            new_record: false,
            paused: false,
            message: String::new(),
            message_timer: 0,
            anim_tick: 0,
            config,
        }
    }

    // ── Flow ──

    pub fn start_level(&mut self, index: usize) {
        let Some(level) = self.levels.get(index) else { return };
        let seed = self.config.seed.unwrap_or_else(clock_seed);
        self.world = Some(WorldState::new(level.clone(), self.config.tuning.clone(), seed));
        self.current = index;
        self.cursor = index;
        self.new_record = false;
        self.paused = false;
        self.screen = Screen::Playing;
        self.clear_message();
    }

    pub fn restart(&mut self) {
        if let Some(world) = self.world.as_mut() {
            step::restart_level(world);
            self.new_record = false;
            self.paused = false;
            self.screen = Screen::Playing;
            self.set_message("Level restarted");
        }
    }

    /// After a win: next level, or back to the title after the last one.
    pub fn next_level(&mut self) {
        if self.current + 1 < self.levels.len() {
            self.start_level(self.current + 1);
        } else {
            self.to_title();
            self.set_message("All levels cleared");
        }
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        if self.paused {
            if let Some(world) = self.world.as_mut() {
                step::suspend(world);
            }
        }
    }

    pub fn to_title(&mut self) {
        self.world = None;
        self.paused = false;
        self.screen = Screen::Title;
    }

    /// Called once when the session outcome flips away from Playing.
    pub fn finish(&mut self) {
        let Some(world) = self.world.as_ref() else { return };
        if let Outcome::Won { pings, elapsed } = world.outcome {
            let id = world.level.id.clone();
            self.new_record = self.records.submit(&id, pings, elapsed);
            if self.new_record {
                if let Err(e) = self.records.save(&self.records_path) {
                    tracing::warn!(error = %e, "could not save records");
                    self.set_message("Could not save records");
                }
            }
        }
        self.screen = Screen::Result;
    }

    // ── Messages ──

    pub fn set_message(&mut self, msg: &str) {
        self.message = msg.to_string();
        self.message_timer = MESSAGE_TICKS;
    }

    pub fn clear_message(&mut self) {
        self.message.clear();
        self.message_timer = 0;
    }

    /// Once per tick, on every screen.
    pub fn tick(&mut self) {
        self.anim_tick = self.anim_tick.wrapping_add(1);
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 {
                self.message.clear();
            }
        }
    }

    pub fn tick_rate_ms(&self) -> u64 {
        self.config.tuning.timing.tick_rate_ms
    }
}

/// Fresh seed for sessions when the config doesn't pin one.
fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
