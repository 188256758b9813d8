/// Events emitted during a simulation step.
/// The presentation layer consumes these for animation/sound; they never
/// feed back into the simulation.

use crate::domain::entity::{Ability, PickupKind};
use crate::domain::grid::Pos;
use crate::domain::sonar::PingSource;

/// Why an action was refused. State is untouched when this is reported.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Rejection {
    /// No charges left for this ability.
    Depleted,
    /// Decoy already out, dampener already open, or phase already armed.
    AlreadyActive,
    /// Sonar still cooling down.
    CoolingDown,
}

/// What the player tried to do when it was refused.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ActionKind {
    Ping,
    Ability(Ability),
}

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    PingEmitted { origin: Pos, radius: f32, source: PingSource },
    ArtifactCollected { pos: Pos },
    PickupCollected { pos: Pos, kind: PickupKind },
    SentryAlarmed { id: usize, target: Pos },
    DecoyDeployed { pos: Pos },
    DampenerActivated { until: f32 },
    PhaseArmed,
    PhaseJump { from: Pos, to: Pos },
    ActionRejected { action: ActionKind, reason: Rejection },
    AllArtifactsCollected,
    Won { pings: u32, elapsed: f32 },
    Lost { reason: String },
}
