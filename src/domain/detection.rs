/// Detection: dynamic radius and the first-sentry-wins loss check.

use crate::config::DetectionConfig;

use super::grid::Pos;
use super::sentry::Sentry;
use super::sonar::AlertLevel;

/// Result of one detection pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    /// Distance to the closest sentry examined (`None` with no sentries).
    pub nearest: Option<f32>,
    /// Id of the sentry that spotted the player, if any.
    pub detected_by: Option<usize>,
}

/// `max(floor, base + alert% × boost − dampener discount)`.
pub fn detection_radius(cfg: &DetectionConfig, alert: AlertLevel, dampened: bool) -> f32 {
    let discount = if dampened { cfg.dampener_discount } else { 0.0 };
    (cfg.base_radius + alert.ratio() * cfg.alert_boost - discount).max(cfg.floor)
}

/// Check every sentry against `radius` (inclusive). Stops at the first
/// detection, since any single one ends the run.
pub fn resolve(player: Pos, sentries: &[Sentry], radius: f32) -> Detection {
    let mut nearest: Option<f32> = None;
    for s in sentries {
        let d = s.pos.distance(player);
        nearest = Some(nearest.map_or(d, |n| n.min(d)));
        if d <= radius {
            return Detection { nearest, detected_by: Some(s.id) };
        }
    }
    Detection { nearest, detected_by: None }
}
