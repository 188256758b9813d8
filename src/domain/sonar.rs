/// Sonar: cooldown-gated pings, the charge gesture, alert level, dampener.
///
/// All timers are absolute timestamps on the session clock (seconds).
/// A gate is open when `now >= ready_at`; a window is active while
/// `now < until`.

use crate::config::SonarConfig;

use super::grid::Pos;

// ── Alert level ──

pub const ALERT_MAX: f32 = 100.0;

/// Global suspicion in [0, 100]. Every mutation clamps.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AlertLevel(f32);

impl AlertLevel {
    pub fn value(self) -> f32 { self.0 }

    /// Fraction of maximum, in [0, 1].
    pub fn ratio(self) -> f32 { self.0 / ALERT_MAX }

    pub fn add(&mut self, gain: f32) {
        self.0 = (self.0 + gain).clamp(0.0, ALERT_MAX);
    }

    pub fn decay(&mut self, amount: f32) {
        self.0 = (self.0 - amount).clamp(0.0, ALERT_MAX);
    }
}

// ── Dampener window ──

/// Temporary discount on alert gain and detection radius.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DampenerWindow {
    until: f32,
}

impl DampenerWindow {
    pub fn is_active(&self, now: f32) -> bool {
        now < self.until
    }

    /// Open the window for `duration` seconds. No-op returning `false`
    /// if a window is already open (not stackable).
    pub fn activate(&mut self, now: f32, duration: f32) -> bool {
        if self.is_active(now) { return false; }
        self.until = now + duration;
        true
    }

    /// Seconds left, 0 when inactive.
    pub fn remaining(&self, now: f32) -> f32 {
        (self.until - now).max(0.0)
    }
}

// ── Ping waves (presentation records) ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PingSource {
    Player,
    Decoy,
}

/// Record of an emitted pulse, kept only so renderers and audio can
/// animate it. Nothing in the simulation reads it back.
#[derive(Clone, Debug)]
pub struct PingWave {
    pub origin: Pos,
    pub radius: f32,
    pub born_at: f32,
    pub duration: f32,
    pub source: PingSource,
}

impl PingWave {
    pub fn age(&self, now: f32) -> f32 {
        (now - self.born_at).max(0.0)
    }

    pub fn is_expired(&self, now: f32) -> bool {
        now >= self.born_at + self.duration
    }

    /// Current ring radius for drawing: grows from 0 to `radius`.
    pub fn ring_radius(&self, now: f32) -> f32 {
        if self.duration <= 0.0 { return self.radius; }
        self.radius * (self.age(now) / self.duration).min(1.0)
    }
}

// ── Emitter ──

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Emission {
    /// Alert gain owed for this ping.
    Accepted { gain: f32 },
    /// Still cooling down; nothing changed.
    Rejected,
}

#[derive(Clone, Debug)]
pub struct SonarEmitter {
    cfg: SonarConfig,
    ready_at: f32,
    ping_count: u32,
    charge_started: Option<f32>,
}

impl SonarEmitter {
    pub fn new(cfg: SonarConfig) -> Self {
        SonarEmitter {
            cfg,
            ready_at: 0.0,
            ping_count: 0,
            charge_started: None,
        }
    }

    pub fn ping_count(&self) -> u32 { self.ping_count }

    pub fn is_ready(&self, now: f32) -> bool { now >= self.ready_at }

    /// Seconds until the next ping is allowed.
    pub fn cooldown_remaining(&self, now: f32) -> f32 {
        (self.ready_at - now).max(0.0)
    }

    pub fn min_radius(&self) -> f32 { self.cfg.min_radius }

    pub fn max_radius(&self) -> f32 { self.cfg.max_radius }

    /// Gate and account for one ping of `radius`.
    pub fn emit(&mut self, now: f32, radius: f32, dampened: bool) -> Emission {
        if !self.is_ready(now) {
            return Emission::Rejected;
        }
        self.ready_at = now + self.cfg.cooldown;
        self.ping_count += 1;

        let scale = if self.cfg.max_radius > 0.0 { radius / self.cfg.max_radius } else { 1.0 };
        let mut gain = self.cfg.alert_gain * scale;
        if dampened {
            gain *= self.cfg.dampener_gain_factor;
        }
        Emission::Accepted { gain }
    }

    // ── Charge gesture ──

    pub fn is_charging(&self) -> bool { self.charge_started.is_some() }

    /// Start holding the trigger. A second press while held keeps the
    /// original start time.
    pub fn begin_charge(&mut self, now: f32) {
        self.charge_started.get_or_insert(now);
    }

    /// Radius the charge would release at if let go right now.
    pub fn charge_radius(&self, now: f32) -> Option<f32> {
        self.charge_started.map(|start| self.radius_for_hold(now - start))
    }

    /// Let go of the trigger. `None` if no charge was in progress.
    /// The cooldown is not checked here; `emit` does that.
    pub fn release_charge(&mut self, now: f32) -> Option<f32> {
        let start = self.charge_started.take()?;
        Some(self.radius_for_hold(now - start))
    }

    pub fn cancel_charge(&mut self) {
        self.charge_started = None;
    }

    /// Linear map from held time (clamped to [charge_min, charge_max])
    /// onto [min_radius, max_radius].
    pub fn radius_for_hold(&self, held: f32) -> f32 {
        let span = self.cfg.charge_max - self.cfg.charge_min;
        let t = if span > 0.0 {
            (held.clamp(self.cfg.charge_min, self.cfg.charge_max) - self.cfg.charge_min) / span
        } else {
            1.0
        };
        self.cfg.min_radius + (self.cfg.max_radius - self.cfg.min_radius) * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emitter() -> SonarEmitter {
        SonarEmitter::new(SonarConfig {
            cooldown: 1.0,
            min_radius: 2.0,
            max_radius: 8.0,
            charge_min: 0.2,
            charge_max: 1.2,
            alert_gain: 20.0,
            dampener_gain_factor: 0.5,
            ..SonarConfig::default()
        })
    }

    #[test]
    fn cooldown_gates_second_ping() {
        let mut s = emitter();
        assert!(matches!(s.emit(0.0, 8.0, false), Emission::Accepted { .. }));
        assert_eq!(s.emit(0.5, 8.0, false), Emission::Rejected);
        assert_eq!(s.ping_count(), 1);
        assert!(matches!(s.emit(1.0, 8.0, false), Emission::Accepted { .. }));
        assert_eq!(s.ping_count(), 2);
    }

    #[test]
    fn gain_scales_with_radius_and_dampener() {
        let mut s = emitter();
        assert_eq!(s.emit(0.0, 8.0, false), Emission::Accepted { gain: 20.0 });
        assert_eq!(s.emit(5.0, 4.0, false), Emission::Accepted { gain: 10.0 });
        assert_eq!(s.emit(10.0, 8.0, true), Emission::Accepted { gain: 10.0 });
    }

    #[test]
    fn charge_interpolates_and_clamps() {
        let s = emitter();
        assert_eq!(s.radius_for_hold(0.0), 2.0);
        assert_eq!(s.radius_for_hold(0.2), 2.0);
        assert!((s.radius_for_hold(0.7) - 5.0).abs() < 1e-5);
        assert_eq!(s.radius_for_hold(1.2), 8.0);
        assert_eq!(s.radius_for_hold(9.0), 8.0);
    }

    #[test]
    fn release_without_charge_is_none() {
        let mut s = emitter();
        assert_eq!(s.release_charge(1.0), None);
        s.begin_charge(1.0);
        s.begin_charge(1.5);
        assert!(s.is_charging());
        let r = s.release_charge(2.2).unwrap();
        assert_eq!(r, 8.0);
        assert!(!s.is_charging());
    }

    #[test]
    fn alert_stays_clamped() {
        let mut a = AlertLevel::default();
        for _ in 0..20 { a.add(17.0); }
        assert_eq!(a.value(), 100.0);
        a.decay(250.0);
        assert_eq!(a.value(), 0.0);
        a.add(-5.0);
        assert_eq!(a.value(), 0.0);
    }

    #[test]
    fn dampener_not_stackable() {
        let mut d = DampenerWindow::default();
        assert!(!d.is_active(0.0));
        assert!(d.activate(1.0, 5.0));
        assert!(d.is_active(5.9));
        assert!(!d.activate(3.0, 5.0));
        assert!((d.remaining(3.0) - 3.0).abs() < 1e-6);
        assert!(!d.is_active(6.0));
        assert!(d.activate(6.0, 5.0));
    }

    #[test]
    fn wave_expires_by_age() {
        let w = PingWave { origin: Pos::new(0, 0), radius: 4.0, born_at: 1.0, duration: 0.5, source: PingSource::Player };
        assert!(!w.is_expired(1.2));
        assert!((w.ring_radius(1.25) - 2.0).abs() < 1e-6);
        assert!(w.is_expired(1.5));
    }
}
