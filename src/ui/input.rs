/// Keyboard tracking and key bindings.
///
/// Movement is continuous while a key is held. The sonar trigger needs
/// both edges: press starts the charge, release fires it. Terminals that
/// report Release events (keyboard enhancement) give exact release
/// timing; elsewhere a key counts as released once its auto-repeat stops
/// for `HOLD_TIMEOUT`, and the sonar release is backdated by that silence.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, poll};

use deepecho::domain::entity::{Ability, FrameInput, MoveDir, PingInput};

/// Silence after which a key without a Release event is considered up.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);
/// The sonar trigger must outlast the terminal's initial auto-repeat delay,
/// otherwise a long hold splits into several short taps.
const CHARGE_HOLD_TIMEOUT: Duration = Duration::from_millis(550);

fn hold_timeout(code: KeyCode) -> Duration {
    if KEYS_PING.contains(&code) { CHARGE_HOLD_TIMEOUT } else { HOLD_TIMEOUT }
}

// ── Bindings ──

pub const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
pub const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
pub const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
pub const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
pub const KEYS_PING: &[KeyCode] = &[KeyCode::Char(' ')];
pub const KEYS_BEACON: &[KeyCode] = &[KeyCode::Char('1'), KeyCode::Char('b'), KeyCode::Char('B')];
pub const KEYS_DAMPENER: &[KeyCode] = &[KeyCode::Char('2'), KeyCode::Char('f'), KeyCode::Char('F')];
pub const KEYS_PHASE: &[KeyCode] = &[KeyCode::Char('3'), KeyCode::Char('e'), KeyCode::Char('E')];
pub const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
pub const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
pub const KEYS_BACK: &[KeyCode] = &[KeyCode::Esc];
pub const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];

pub struct InputState {
    /// Last Press/Repeat time for each held key.
    last_active: HashMap<KeyCode, Instant>,
    /// Keys that went down during the latest drain.
    fresh_presses: Vec<KeyCode>,
    /// Keys that came up (explicitly or by timeout) during the latest drain.
    fresh_releases: Vec<KeyCode>,
    /// Releases held back one frame because the press landed in the same drain.
    deferred_releases: Vec<KeyCode>,
    /// How long a timed-out key had been silent when its release was noticed.
    release_lag: HashMap<KeyCode, Duration>,
    raw_events: Vec<KeyEvent>,
    /// Trust Release events. Set once keyboard enhancement is confirmed.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            fresh_releases: Vec::with_capacity(8),
            deferred_releases: Vec::with_capacity(4),
            release_lag: HashMap::with_capacity(4),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Pull every pending terminal event without blocking. Once per frame.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.fresh_releases = std::mem::take(&mut self.deferred_releases);
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            let Ok(Event::Key(key)) = event::read() else { continue };
            self.raw_events.push(key);

            match key.kind {
                KeyEventKind::Release if self.honor_release => {
                    if self.last_active.remove(&key.code).is_some() {
                        self.fresh_releases.push(key.code);
                    }
                }
                KeyEventKind::Release => {}
                _ => {
                    let was_held = self.last_active.contains_key(&key.code);
                    self.last_active.insert(key.code, Instant::now());
                    if !was_held {
                        self.fresh_presses.push(key.code);
                        self.release_lag.remove(&key.code);
                    }
                }
            }
        }

        self.expire_silent(Instant::now());

        // Press and release in one drain: report the press now, the release next frame.
        let presses = &self.fresh_presses;
        let (deferred, now_released): (Vec<_>, Vec<_>) = self.fresh_releases
            .drain(..)
            .partition(|c| presses.contains(c));
        self.fresh_releases = now_released;
        self.deferred_releases = deferred;
    }

    /// Release every key whose auto-repeat has gone quiet.
    fn expire_silent(&mut self, now: Instant) {
        let releases = &mut self.fresh_releases;
        let lag = &mut self.release_lag;
        self.last_active.retain(|code, t| {
            let silent = now.duration_since(*t);
            let alive = silent < hold_timeout(*code);
            if !alive {
                releases.push(*code);
                lag.insert(*code, silent);
            }
            alive
        });
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.last_active.contains_key(c))
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.fresh_presses.contains(c))
    }

    pub fn any_released(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.fresh_releases.contains(c))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'))
        })
    }

    /// Forget everything held. Used when leaving the play screen so a
    /// half-charged ping doesn't fire on the next level.
    pub fn reset(&mut self) {
        self.last_active.clear();
        self.fresh_presses.clear();
        self.fresh_releases.clear();
        self.deferred_releases.clear();
        self.release_lag.clear();
    }

    // ── Gameplay mapping ──

    /// Translate this frame's keyboard state into simulation input.
    pub fn frame_input(&self) -> FrameInput {
        FrameInput {
            movement: self.movement(),
            ping: self.ping_edge(),
            ability: self.ability(),
        }
    }

    fn movement(&self) -> Option<MoveDir> {
        let held = |keys: &[KeyCode]| self.any_held(keys) || self.any_pressed(keys);
        if held(KEYS_UP) {
            Some(MoveDir::Up)
        } else if held(KEYS_DOWN) {
            Some(MoveDir::Down)
        } else if held(KEYS_LEFT) {
            Some(MoveDir::Left)
        } else if held(KEYS_RIGHT) {
            Some(MoveDir::Right)
        } else {
            None
        }
    }

    fn ping_edge(&self) -> Option<PingInput> {
        if self.any_released(KEYS_PING) {
            Some(PingInput::Release { late: self.ping_release_lag().as_secs_f32() })
        } else if self.any_pressed(KEYS_PING) {
            Some(PingInput::Press)
        } else {
            None
        }
    }

    /// Zero when the terminal reported the release itself.
    fn ping_release_lag(&self) -> Duration {
        KEYS_PING.iter()
            .filter(|c| self.fresh_releases.contains(c))
            .filter_map(|c| self.release_lag.get(c).copied())
            .max()
            .unwrap_or(Duration::ZERO)
    }

    fn ability(&self) -> Option<Ability> {
        if self.any_pressed(KEYS_BEACON) {
            Some(Ability::Beacon)
        } else if self.any_pressed(KEYS_DAMPENER) {
            Some(Ability::Dampener)
        } else if self.any_pressed(KEYS_PHASE) {
            Some(Ability::Phase)
        } else {
            None
        }
    }
}
