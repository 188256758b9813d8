/// Entities: Player, resources, artifacts, pickups, decoy, and frame input.

use serde::{Deserialize, Serialize};

use super::grid::Pos;

/// Movement direction (continuous while key held).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveDir {
    Left,
    Right,
    Up,
    Down,
}

impl MoveDir {
    pub fn delta(self) -> (i32, i32) {
        match self {
            MoveDir::Left => (-1, 0),
            MoveDir::Right => (1, 0),
            MoveDir::Up => (0, -1),
            MoveDir::Down => (0, 1),
        }
    }
}

/// Sonar trigger edge for this frame.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum PingInput {
    /// Trigger went down: start charging.
    Press,
    /// Trigger came up `late` seconds before this edge was delivered:
    /// emit at the radius charged up to that moment.
    Release { late: f32 },
}

/// Consumable abilities.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Ability {
    Beacon,
    Dampener,
    Phase,
}

/// Frame input: movement is continuous (held key), the rest edge-triggered.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub movement: Option<MoveDir>,
    pub ping: Option<PingInput>,
    pub ability: Option<Ability>,
}

impl FrameInput {
    pub fn moving(dir: MoveDir) -> Self {
        FrameInput { movement: Some(dir), ..Self::default() }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct Resources {
    pub beacon: u32,
    pub dampener: u32,
    pub phase: u32,
}

impl Resources {
    pub fn new(beacon: u32, dampener: u32, phase: u32) -> Self {
        Resources { beacon, dampener, phase }
    }

    fn slot(&mut self, kind: PickupKind) -> &mut u32 {
        match kind {
            PickupKind::Beacon => &mut self.beacon,
            PickupKind::Dampener => &mut self.dampener,
            PickupKind::Phase => &mut self.phase,
        }
    }

    pub fn count(&self, kind: PickupKind) -> u32 {
        match kind {
            PickupKind::Beacon => self.beacon,
            PickupKind::Dampener => self.dampener,
            PickupKind::Phase => self.phase,
        }
    }

    pub fn add(&mut self, kind: PickupKind) {
        *self.slot(kind) += 1;
    }

    /// Spend one. Returns `false` (and changes nothing) when empty.
    pub fn spend(&mut self, kind: PickupKind) -> bool {
        let slot = self.slot(kind);
        if *slot == 0 { return false; }
        *slot -= 1;
        true
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    pub pos: Pos,
    pub facing: MoveDir,
    /// One-shot: the next blocked move may pass through a single wall.
    pub phase_ready: bool,
    pub resources: Resources,
    /// Session time at which the next step is allowed.
    pub next_move_at: f32,
}

impl Player {
    pub fn new(pos: Pos, resources: Resources) -> Self {
        Player {
            pos,
            facing: MoveDir::Right,
            phase_ready: false,
            resources,
            next_move_at: 0.0,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum PickupKind {
    Beacon,
    Dampener,
    Phase,
}

impl PickupKind {
    pub fn from_marker(ch: char) -> Option<Self> {
        match ch {
            'B' => Some(PickupKind::Beacon),
            'D' => Some(PickupKind::Dampener),
            'T' => Some(PickupKind::Phase),
            _ => None,
        }
    }

    pub fn marker(self) -> char {
        match self {
            PickupKind::Beacon => 'B',
            PickupKind::Dampener => 'D',
            PickupKind::Phase => 'T',
        }
    }
}

impl From<Ability> for PickupKind {
    fn from(a: Ability) -> Self {
        match a {
            Ability::Beacon => PickupKind::Beacon,
            Ability::Dampener => PickupKind::Dampener,
            Ability::Phase => PickupKind::Phase,
        }
    }
}

/// Collectible required to open the exit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub pos: Pos,
    pub collected: bool,
}

impl Artifact {
    pub fn new(pos: Pos) -> Self {
        Artifact { pos, collected: false }
    }

    /// Flip to collected. Returns `true` only the first time.
    pub fn collect(&mut self) -> bool {
        !std::mem::replace(&mut self.collected, true)
    }
}

/// Resource refill lying on the map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pickup {
    pub pos: Pos,
    pub kind: PickupKind,
    pub collected: bool,
}

impl Pickup {
    pub fn new(pos: Pos, kind: PickupKind) -> Self {
        Pickup { pos, kind, collected: false }
    }

    pub fn collect(&mut self) -> bool {
        !std::mem::replace(&mut self.collected, true)
    }
}

/// Thrown beacon: pulses once when armed, then lingers until it expires.
#[derive(Clone, Debug)]
pub struct Decoy {
    pub pos: Pos,
    pub arm_at: f32,
    pub expires_at: f32,
    pub fired: bool,
}

impl Decoy {
    pub fn new(pos: Pos, now: f32, arm_delay: f32, life: f32) -> Self {
        let arm_at = now + arm_delay;
        Decoy { pos, arm_at, expires_at: arm_at + life, fired: false }
    }

    /// Should the pulse go off this tick?
    pub fn should_fire(&self, now: f32) -> bool {
        !self.fired && now >= self.arm_at
    }

    pub fn is_expired(&self, now: f32) -> bool {
        now >= self.expires_at
    }

    /// Seconds until the pulse, 0 once armed.
    pub fn arm_remaining(&self, now: f32) -> f32 {
        (self.arm_at - now).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spend_refuses_when_empty() {
        let mut r = Resources::new(1, 0, 0);
        assert!(r.spend(PickupKind::Beacon));
        assert!(!r.spend(PickupKind::Beacon));
        assert!(!r.spend(PickupKind::Dampener));
        assert_eq!(r, Resources::new(0, 0, 0));
        r.add(PickupKind::Phase);
        assert_eq!(r.count(PickupKind::Phase), 1);
    }

    #[test]
    fn artifact_collects_once() {
        let mut a = Artifact::new(Pos::new(1, 1));
        assert!(a.collect());
        assert!(!a.collect());
        assert!(a.collected);
    }

    #[test]
    fn decoy_lifecycle() {
        let mut d = Decoy::new(Pos::new(0, 0), 10.0, 1.5, 2.0);
        assert!(!d.should_fire(11.0));
        assert!(d.should_fire(11.5));
        d.fired = true;
        assert!(!d.should_fire(12.0));
        assert!(!d.is_expired(13.0));
        assert!(d.is_expired(13.5));
    }
}
