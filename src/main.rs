/// Entry point and game loop.

mod app;
mod ui;

use std::collections::VecDeque;
use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use tracing_subscriber::EnvFilter;

use deepecho::config::GameConfig;
use deepecho::domain::entity::{Ability, FrameInput, PingInput};
use deepecho::sim::event::{ActionKind, GameEvent, Rejection};
use deepecho::sim::records::save_dir;
use deepecho::sim::step;
use deepecho::sim::world::Outcome;

use app::{App, Screen};
use ui::input::{
    InputState, KEYS_BACK, KEYS_CONFIRM, KEYS_DOWN, KEYS_QUIT, KEYS_RESTART, KEYS_UP,
};
use ui::renderer::Renderer;
use ui::sound::{self, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);

/// Setting this enables logging, e.g. `DEEPECHO_LOG=debug`.
const LOG_ENV: &str = "DEEPECHO_LOG";
/// Written to the save directory: the terminal belongs to the game.
const LOG_FILE: &str = "deepecho.log";

const KEYS_PAUSE: &[KeyCode] = &[KeyCode::Char('p'), KeyCode::Char('P'), KeyCode::F(1)];

fn main() {
    init_logging();
    let config = GameConfig::load();
    let mut app = App::new(config);

    let mut renderer = Renderer::new();
    let honor_release = match renderer.init() {
        Ok(enhanced) => enhanced,
        Err(e) => {
            eprintln!("Terminal init failed: {e}");
            return;
        }
    };

    let sound = SoundEngine::new();
    let result = game_loop(&mut app, &mut renderer, sound.as_ref(), honor_release);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        tracing::error!(error = %e, "game loop aborted");
        eprintln!("Game error: {e}");
    }

    println!("Thanks for playing Deep Echo.");
}

fn init_logging() {
    let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) else { return };
    let path = save_dir().join(LOG_FILE);
    let file = match File::create(&path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Cannot open {}: {e}", path.display());
            return;
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
}

/// Edge-triggered input seen between two simulation ticks.
#[derive(Default)]
struct PendingInput {
    pings: VecDeque<PingInput>,
    ability: Option<Ability>,
}

impl PendingInput {
    fn clear(&mut self) {
        self.pings.clear();
        self.ability = None;
    }
}

fn game_loop(
    app: &mut App,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    honor_release: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    kb.honor_release = honor_release;
    let mut pending = PendingInput::default();
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(app.tick_rate_ms());

    loop {
        kb.drain_events();
        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(app, &mut kb, &mut pending) {
            break;
        }

        let frame = kb.frame_input();
        if app.screen == Screen::Playing && !app.paused {
            if let Some(edge) = frame.ping {
                pending.pings.push_back(edge);
            }
            if frame.ability.is_some() {
                pending.ability = frame.ability;
            }
        }

        let since = last_tick.elapsed();
        if since >= tick_rate {
            last_tick = Instant::now();
            app.tick();

            if app.screen == Screen::Playing && !app.paused {
                let input = FrameInput {
                    movement: frame.movement,
                    ping: pending.pings.pop_front(),
                    ability: pending.ability.take(),
                };
                if let Some(world) = app.world.as_mut() {
                    let events = step::step(world, input, since.as_secs_f32());
                    sound::play_events(sound, &events);
                    announce(app, &events);
                }
                if app.world.as_ref().map_or(false, |w| w.outcome.is_over()) {
                    app.finish();
                    kb.reset();
                    pending.clear();
                }
            }
        }

        renderer.render(app)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Screen navigation. Returns `true` to quit.
fn handle_meta(app: &mut App, kb: &mut InputState, pending: &mut PendingInput) -> bool {
    let confirm = kb.any_pressed(KEYS_CONFIRM);
    let back = kb.any_pressed(KEYS_BACK);

    match app.screen {
        // ── Title / level list ──
        Screen::Title => {
            let total = app.levels.len();
            if kb.any_pressed(KEYS_UP) {
                app.cursor = app.cursor.saturating_sub(1);
            } else if kb.any_pressed(KEYS_DOWN) {
                if app.cursor + 1 < total {
                    app.cursor += 1;
                }
            } else if confirm && total > 0 {
                app.start_level(app.cursor);
                kb.reset();
                pending.clear();
            } else if back || kb.any_pressed(KEYS_QUIT) {
                return true;
            }
        }

        // ── Playing ──
        Screen::Playing => {
            if back {
                app.to_title();
                kb.reset();
                pending.clear();
            } else if kb.any_pressed(KEYS_PAUSE) {
                app.toggle_pause();
                kb.reset();
                pending.clear();
            } else if kb.any_pressed(KEYS_RESTART) {
                app.restart();
                pending.clear();
            }
        }

        // ── Result ──
        Screen::Result => {
            let won = app.world.as_ref()
                .map_or(false, |w| matches!(w.outcome, Outcome::Won { .. }));
            if kb.any_pressed(KEYS_RESTART) || (confirm && !won) {
                app.restart();
                kb.reset();
                pending.clear();
            } else if confirm && won {
                app.next_level();
                kb.reset();
                pending.clear();
            } else if back {
                app.to_title();
                kb.reset();
            }
        }
    }

    false
}

/// Status-bar text for events worth spelling out.
fn announce(app: &mut App, events: &[GameEvent]) {
    for event in events {
        let msg = match event {
            GameEvent::AllArtifactsCollected => "All artifacts recovered. The exit is open.",
            GameEvent::DecoyDeployed { .. } => "Beacon dropped",
            GameEvent::DampenerActivated { .. } => "Dampener on: pings are quieter",
            GameEvent::PhaseArmed => "Phase armed: walk into a wall",
            GameEvent::ActionRejected { action, reason } => rejection_text(*action, *reason),
            _ => continue,
        };
        app.set_message(msg);
    }
}

fn rejection_text(action: ActionKind, reason: Rejection) -> &'static str {
    match (action, reason) {
        (_, Rejection::CoolingDown) => "Sonar cooling down",
        (ActionKind::Ability(Ability::Beacon), Rejection::AlreadyActive) => "A beacon is already out",
        (ActionKind::Ability(Ability::Dampener), Rejection::AlreadyActive) => "Dampener already running",
        (ActionKind::Ability(Ability::Phase), Rejection::AlreadyActive) => "Phase already armed",
        (ActionKind::Ability(Ability::Beacon), Rejection::Depleted) => "No beacons left",
        (ActionKind::Ability(Ability::Dampener), Rejection::Depleted) => "No dampeners left",
        (ActionKind::Ability(Ability::Phase), Rejection::Depleted) => "No phase charges left",
        (ActionKind::Ping, _) => "Sonar unavailable",
    }
}
