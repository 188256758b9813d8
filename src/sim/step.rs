/// The step function: advances the world by one tick.
///
/// Processing order:
///   1. Clock (delta clamped to `max_tick_delta`)
///   2. Decay: fog timers, alert level, expired ping waves
///   3. Decoy arming / expiry
///   4. Sonar trigger (charge / release)
///   5. Abilities (beacon, dampener, phase)
///   6. Player movement (with phase jump)
///   7. Artifact / pickup collection
///   8. Win check
///   9. Sentry transitions + movement
///  10. Detection / loss check
///
/// Rejected actions report `ActionRejected` and leave the world untouched.

use crate::domain::detection;
use crate::domain::entity::{Ability, Decoy, FrameInput, MoveDir, PickupKind, PingInput};
use crate::domain::grid::Pos;
use crate::domain::sonar::{Emission, PingSource, PingWave};
use super::event::{ActionKind, GameEvent, Rejection};
use super::world::{Outcome, WorldState};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, input: FrameInput, delta: f32) -> Vec<GameEvent> {
    if world.outcome.is_over() { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    let delta = if delta.is_finite() {
        delta.clamp(0.0, world.tuning.timing.max_tick_delta)
    } else {
        0.0
    };
    world.tick += 1;
    world.clock += delta;

    resolve_decay(world, delta);
    resolve_decoy(world, &mut events);
    resolve_ping(world, input.ping, &mut events);
    resolve_ability(world, input.ability, &mut events);
    resolve_player_movement(world, input.movement, &mut events);
    resolve_collection(world, &mut events);
    if resolve_win(world, &mut events) { return events; }
    resolve_sentries(world, delta);
    resolve_detection(world, &mut events);

    events
}

/// Throw away all session state and start the level over.
pub fn restart_level(world: &mut WorldState) {
    tracing::info!(level = %world.level.id, "level restart");
    *world = WorldState::new(
        world.pristine_level().clone(),
        world.tuning.clone(),
        world.seed(),
    );
}

/// The session stops receiving input (pause, leaving the screen). A
/// half-charged trigger is dropped since its release will never arrive.
pub fn suspend(world: &mut WorldState) {
    if world.sonar.is_charging() {
        tracing::debug!("sonar charge cancelled");
    }
    world.sonar.cancel_charge();
}

// ══════════════════════════════════════════════════════════════
// Decay
// ══════════════════════════════════════════════════════════════

fn resolve_decay(world: &mut WorldState, delta: f32) {
    world.visibility.tick(delta);
    world.alert.decay(world.tuning.sonar.alert_decay * delta);
    let now = world.clock;
    world.pings.retain(|w| !w.is_expired(now));
}

// ══════════════════════════════════════════════════════════════
// Sonar
// ══════════════════════════════════════════════════════════════

fn resolve_ping(world: &mut WorldState, ping: Option<PingInput>, events: &mut Vec<GameEvent>) {
    match ping {
        Some(PingInput::Press) => world.sonar.begin_charge(world.clock),
        Some(PingInput::Release { late }) => {
            let released_at = world.clock - late.max(0.0);
            if let Some(radius) = world.sonar.release_charge(released_at) {
                emit_ping(world, radius, events);
            }
        }
        None => {}
    }
}

/// Fire a player ping of `radius` from the player's tile.
///
/// On acceptance: alert rises, tiles around the player light up, a ring
/// is queued for presentation, and every sentry heads for the origin.
/// Returns `false` (state untouched) while the sonar is cooling down.
pub fn emit_ping(world: &mut WorldState, radius: f32, events: &mut Vec<GameEvent>) -> bool {
    let now = world.clock;
    let dampened = world.is_dampened();
    match world.sonar.emit(now, radius, dampened) {
        Emission::Rejected => {
            events.push(GameEvent::ActionRejected {
                action: ActionKind::Ping,
                reason: Rejection::CoolingDown,
            });
            false
        }
        Emission::Accepted { gain } => {
            let origin = world.player.pos;
            world.alert.add(gain);
            tracing::debug!(
                %origin, radius, gain, alert = world.alert.value(), dampened,
                "ping #{}", world.sonar.ping_count()
            );
            pulse(world, origin, radius, PingSource::Player, events);
            true
        }
    }
}

/// Shared by player pings and decoys: light tiles, queue a ring, alarm sentries.
fn pulse(world: &mut WorldState, origin: Pos, radius: f32, source: PingSource, events: &mut Vec<GameEvent>) {
    world.visibility.reveal_tiles(origin, radius);
    world.pings.push(PingWave {
        origin,
        radius,
        born_at: world.clock,
        duration: world.tuning.sonar.wave_duration,
        source,
    });
    events.push(GameEvent::PingEmitted { origin, radius, source });

    for s in world.sentries.iter_mut() {
        s.alarm(origin);
        events.push(GameEvent::SentryAlarmed { id: s.id, target: origin });
    }
}

// ══════════════════════════════════════════════════════════════
// Decoy
// ══════════════════════════════════════════════════════════════

fn resolve_decoy(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let now = world.clock;
    let Some(decoy) = world.decoy.as_mut() else { return };

    if decoy.should_fire(now) {
        decoy.fired = true;
        let origin = decoy.pos;
        let radius = world.tuning.abilities.decoy_radius;
        tracing::debug!(%origin, radius, "decoy pulse");
        pulse(world, origin, radius, PingSource::Decoy, events);
    }

    if world.decoy.as_ref().map_or(false, |d| d.is_expired(now)) {
        world.decoy = None;
    }
}

// ══════════════════════════════════════════════════════════════
// Abilities
// ══════════════════════════════════════════════════════════════

fn resolve_ability(world: &mut WorldState, ability: Option<Ability>, events: &mut Vec<GameEvent>) {
    let Some(ability) = ability else { return };
    let now = world.clock;

    let already_active = match ability {
        Ability::Beacon => world.decoy.is_some(),
        Ability::Dampener => world.dampener.is_active(now),
        Ability::Phase => world.player.phase_ready,
    };
    let reject = |reason| GameEvent::ActionRejected { action: ActionKind::Ability(ability), reason };

    if already_active {
        events.push(reject(Rejection::AlreadyActive));
        return;
    }
    if !world.player.resources.spend(PickupKind::from(ability)) {
        events.push(reject(Rejection::Depleted));
        return;
    }

    match ability {
        Ability::Beacon => {
            let abilities = &world.tuning.abilities;
            let pos = world.player.pos;
            world.decoy = Some(Decoy::new(pos, now, abilities.decoy_arm, abilities.decoy_life));
            events.push(GameEvent::DecoyDeployed { pos });
        }
        Ability::Dampener => {
            world.dampener.activate(now, world.tuning.abilities.dampener_duration);
            events.push(GameEvent::DampenerActivated { until: now + world.tuning.abilities.dampener_duration });
        }
        Ability::Phase => {
            world.player.phase_ready = true;
            events.push(GameEvent::PhaseArmed);
        }
    }
    tracing::debug!(?ability, "ability used");
}

// ══════════════════════════════════════════════════════════════
// Player movement
// ══════════════════════════════════════════════════════════════

fn resolve_player_movement(world: &mut WorldState, movement: Option<MoveDir>, events: &mut Vec<GameEvent>) {
    let Some(dir) = movement else { return };
    if world.clock < world.player.next_move_at { return; }

    let (dx, dy) = dir.delta();
    let from = world.player.pos;
    let target = from.offset(dx, dy);
    let grid = &world.level.grid;
    world.player.facing = dir;

    let dest = if grid.is_open(target) {
        target
    } else if world.player.phase_ready && grid.in_bounds(target) {
        // Phase: pass through exactly one wall tile.
        let beyond = target.offset(dx, dy);
        if !grid.is_open(beyond) { return; }
        world.player.phase_ready = false;
        events.push(GameEvent::PhaseJump { from, to: beyond });
        beyond
    } else {
        return;
    };

    world.player.pos = dest;
    world.player.next_move_at = world.clock + world.tuning.timing.player_step_interval;
}

// ══════════════════════════════════════════════════════════════
// Collection
// ══════════════════════════════════════════════════════════════

fn resolve_collection(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let pos = world.player.pos;

    let mut got_artifact = false;
    for a in world.level.artifacts.iter_mut().filter(|a| a.pos == pos) {
        if a.collect() {
            got_artifact = true;
            events.push(GameEvent::ArtifactCollected { pos });
        }
    }
    if got_artifact && world.level.all_artifacts_collected() {
        events.push(GameEvent::AllArtifactsCollected);
    }

    for p in world.level.pickups.iter_mut().filter(|p| p.pos == pos) {
        if p.collect() {
            world.player.resources.add(p.kind);
            events.push(GameEvent::PickupCollected { pos, kind: p.kind });
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Win / lose
// ══════════════════════════════════════════════════════════════

fn resolve_win(world: &mut WorldState, events: &mut Vec<GameEvent>) -> bool {
    if world.player.pos != world.level.exit || !world.level.all_artifacts_collected() {
        return false;
    }
    let pings = world.sonar.ping_count();
    let elapsed = world.clock;
    tracing::info!(level = %world.level.id, pings, elapsed, "level won");
    world.outcome = Outcome::Won { pings, elapsed };
    events.push(GameEvent::Won { pings, elapsed });
    true
}

fn resolve_sentries(world: &mut WorldState, delta: f32) {
    let now = world.clock;
    let alert = world.alert;
    for s in world.sentries.iter_mut() {
        s.update(&world.level.grid, now, delta, alert, &world.tuning.sentry, &mut world.rng);
    }
}

fn resolve_detection(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let radius = detection::detection_radius(&world.tuning.detection, world.alert, world.is_dampened());
    let found = detection::resolve(world.player.pos, &world.sentries, radius);
    world.detection_radius = radius;
    world.nearest_sentry = found.nearest;

    if let Some(id) = found.detected_by {
        let reason = format!("Spotted by sentry {}", id + 1);
        tracing::info!(level = %world.level.id, sentry = id, radius, "player detected");
        world.outcome = Outcome::Lost { reason: reason.clone() };
        events.push(GameEvent::Lost { reason });
    }
}
