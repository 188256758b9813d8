/// External configuration loader.
///
/// Reads `config.toml` from the first search directory that has one.
/// Falls back to defaults if the file is missing or incomplete, and
/// replaces values the simulation cannot run with.
/// Every key has its own serde default, so a file that only sets
/// `[sonar] cooldown = 1.5` keeps everything else at the stock values.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub tuning: Tuning,
    pub levels_dir: PathBuf,
    /// Seed for the sentry wander RNG. `None` = derive from the clock.
    pub seed: Option<u64>,
}

/// Every simulation constant, grouped the way `config.toml` groups them.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Tuning {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub sonar: SonarConfig,
    #[serde(default)]
    pub visibility: VisibilityConfig,
    #[serde(default)]
    pub sentry: SentryConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub abilities: AbilityConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_tick_rate")]
    pub tick_rate_ms: u64,
    /// Per-step delta cap in seconds (guards against huge jumps after a stall).
    #[serde(default = "default_max_tick_delta")]
    pub max_tick_delta: f32,
    #[serde(default = "default_player_step")]
    pub player_step_interval: f32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SonarConfig {
    #[serde(default = "default_ping_cooldown")]
    pub cooldown: f32,
    #[serde(default = "default_min_radius")]
    pub min_radius: f32,
    #[serde(default = "default_max_radius")]
    pub max_radius: f32,
    #[serde(default = "default_charge_min")]
    pub charge_min: f32,
    #[serde(default = "default_charge_max")]
    pub charge_max: f32,
    /// Alert gained by a full-radius ping.
    #[serde(default = "default_alert_gain")]
    pub alert_gain: f32,
    /// Multiplier on alert gain while a dampener window is open.
    #[serde(default = "default_dampener_gain_factor")]
    pub dampener_gain_factor: f32,
    /// Alert points lost per second.
    #[serde(default = "default_alert_decay")]
    pub alert_decay: f32,
    #[serde(default = "default_wave_duration")]
    pub wave_duration: f32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct VisibilityConfig {
    #[serde(default = "default_reveal_duration")]
    pub reveal_duration: f32,
    #[serde(default = "default_ambient_radius")]
    pub ambient_radius: f32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SentryConfig {
    #[serde(default = "default_base_step")]
    pub base_step_interval: f32,
    #[serde(default = "default_min_step")]
    pub min_step_interval: f32,
    /// Seconds shaved off the step interval at alert 100.
    #[serde(default = "default_alert_speedup")]
    pub alert_speedup: f32,
    #[serde(default = "default_linger")]
    pub linger: f32,
    #[serde(default = "default_wander_chance")]
    pub wander_chance: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_detect_base")]
    pub base_radius: f32,
    #[serde(default = "default_detect_boost")]
    pub alert_boost: f32,
    #[serde(default = "default_detect_discount")]
    pub dampener_discount: f32,
    #[serde(default = "default_detect_floor")]
    pub floor: f32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AbilityConfig {
    #[serde(default = "default_dampener_duration")]
    pub dampener_duration: f32,
    #[serde(default = "default_decoy_arm")]
    pub decoy_arm: f32,
    #[serde(default = "default_decoy_life")]
    pub decoy_life: f32,
    #[serde(default = "default_decoy_radius")]
    pub decoy_radius: f32,
}

// ── TOML Schema (top level) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(flatten)]
    tuning: Tuning,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default)]
    seed: Option<u64>,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 33 }
fn default_max_tick_delta() -> f32 { 0.1 }
fn default_player_step() -> f32 { 0.12 }

fn default_ping_cooldown() -> f32 { 0.9 }
fn default_min_radius() -> f32 { 2.5 }
fn default_max_radius() -> f32 { 8.0 }
fn default_charge_min() -> f32 { 0.1 }
fn default_charge_max() -> f32 { 1.2 }
fn default_alert_gain() -> f32 { 22.0 }
fn default_dampener_gain_factor() -> f32 { 0.5 }
fn default_alert_decay() -> f32 { 3.5 }
fn default_wave_duration() -> f32 { 0.9 }

fn default_reveal_duration() -> f32 { 3.0 }
fn default_ambient_radius() -> f32 { 2.5 }

fn default_base_step() -> f32 { 0.6 }
fn default_min_step() -> f32 { 0.2 }
fn default_alert_speedup() -> f32 { 0.35 }
fn default_linger() -> f32 { 2.5 }
fn default_wander_chance() -> f64 { 0.3 }

fn default_detect_base() -> f32 { 1.5 }
fn default_detect_boost() -> f32 { 1.5 }
fn default_detect_discount() -> f32 { 0.75 }
fn default_detect_floor() -> f32 { 1.0 }

fn default_dampener_duration() -> f32 { 6.0 }
fn default_decoy_arm() -> f32 { 1.5 }
fn default_decoy_life() -> f32 { 2.5 }
fn default_decoy_radius() -> f32 { 5.0 }

fn default_levels_dir() -> String { "levels".into() }

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            tick_rate_ms: default_tick_rate(),
            max_tick_delta: default_max_tick_delta(),
            player_step_interval: default_player_step(),
        }
    }
}

impl Default for SonarConfig {
    fn default() -> Self {
        SonarConfig {
            cooldown: default_ping_cooldown(),
            min_radius: default_min_radius(),
            max_radius: default_max_radius(),
            charge_min: default_charge_min(),
            charge_max: default_charge_max(),
            alert_gain: default_alert_gain(),
            dampener_gain_factor: default_dampener_gain_factor(),
            alert_decay: default_alert_decay(),
            wave_duration: default_wave_duration(),
        }
    }
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        VisibilityConfig {
            reveal_duration: default_reveal_duration(),
            ambient_radius: default_ambient_radius(),
        }
    }
}

impl Default for SentryConfig {
    fn default() -> Self {
        SentryConfig {
            base_step_interval: default_base_step(),
            min_step_interval: default_min_step(),
            alert_speedup: default_alert_speedup(),
            linger: default_linger(),
            wander_chance: default_wander_chance(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        DetectionConfig {
            base_radius: default_detect_base(),
            alert_boost: default_detect_boost(),
            dampener_discount: default_detect_discount(),
            floor: default_detect_floor(),
        }
    }
}

impl Default for AbilityConfig {
    fn default() -> Self {
        AbilityConfig {
            dampener_duration: default_dampener_duration(),
            decoy_arm: default_decoy_arm(),
            decoy_life: default_decoy_life(),
            decoy_radius: default_decoy_radius(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
            seed: None,
        }
    }
}

// ── Loading ──

const CONFIG_FILE: &str = "config.toml";
const DATA_DIR_NAME: &str = "deepecho";

impl GameConfig {
    /// The first `config.toml` found in [`candidate_dirs`] wins. Absent
    /// files, unreadable files and absent keys all resolve to defaults.
    pub fn load() -> Self {
        let dirs = candidate_dirs();
        Self::resolve(find_toml(&dirs), &dirs)
    }

    /// Parse config text without looking for a file.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let parsed: TomlConfig = toml::from_str(text)?;
        Ok(Self::resolve(parsed, &candidate_dirs()))
    }

    /// Relative level directories resolve against the first search dir
    /// that actually contains them.
    fn resolve(parsed: TomlConfig, dirs: &[PathBuf]) -> Self {
        let TomlConfig { general, mut tuning } = parsed;
        tuning.sanitize();
        let raw = PathBuf::from(&general.levels_dir);
        let levels_dir = if raw.is_absolute() {
            raw
        } else {
            dirs.iter()
                .map(|d| d.join(&raw))
                .find(|p| p.is_dir())
                .unwrap_or(raw)
        };

        GameConfig { tuning, levels_dir, seed: general.seed }
    }
}

impl Tuning {
    /// Values the simulation cannot run with go back to their defaults.
    fn sanitize(&mut self) {
        let max_delta = self.timing.max_tick_delta;
        if !(max_delta.is_finite() && max_delta > 0.0) {
            tracing::warn!(value = max_delta, "timing.max_tick_delta must be positive, using default");
            self.timing.max_tick_delta = default_max_tick_delta();
        }
        let wander = self.sentry.wander_chance;
        if !(0.0..=1.0).contains(&wander) {
            tracing::warn!(value = wander, "sentry.wander_chance must be within 0..=1, using default");
            self.sentry.wander_chance = default_wander_chance();
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            tuning: Tuning::default(),
            levels_dir: PathBuf::from(default_levels_dir()),
            seed: None,
        }
    }
}

/// Where config and level data may live, most specific first:
/// binary dir, CWD, `~/.local/share/deepecho`, `/usr/share/deepecho`.
pub fn candidate_dirs() -> Vec<PathBuf> {
    // Canonicalized so a symlinked binary still finds its data.
    let exe_dir = std::env::current_exe()
        .ok()
        .map(|exe| exe.canonicalize().unwrap_or(exe))
        .and_then(|exe| exe.parent().map(PathBuf::from));
    let cwd = std::env::current_dir().ok();
    let user_data = std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".local/share").join(DATA_DIR_NAME))
        .filter(|p| p.is_dir());
    let system_data = Some(PathBuf::from("/usr/share").join(DATA_DIR_NAME))
        .filter(|p| p.is_dir());

    let mut dirs: Vec<PathBuf> = Vec::new();
    for dir in [exe_dir, cwd, user_data, system_data].into_iter().flatten() {
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }
    dirs
}

fn find_toml(dirs: &[PathBuf]) -> TomlConfig {
    let Some(path) = dirs.iter().map(|d| d.join(CONFIG_FILE)).find(|p| p.is_file()) else {
        tracing::debug!("no config file, using defaults");
        return TomlConfig::default();
    };
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "config unreadable, using defaults");
            return TomlConfig::default();
        }
    };
    match toml::from_str(&text) {
        Ok(cfg) => {
            tracing::info!(path = %path.display(), "config loaded");
            cfg
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "config malformed, using defaults");
            TomlConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = GameConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.tuning.timing.tick_rate_ms, 33);
        assert!((cfg.tuning.sonar.cooldown - 0.9).abs() < 1e-6);
        assert!(cfg.seed.is_none());
    }

    #[test]
    fn partial_section_keeps_other_keys() {
        let cfg = GameConfig::from_toml_str(
            "[sonar]\ncooldown = 1.5\n\n[general]\nseed = 7\n",
        ).unwrap();
        assert!((cfg.tuning.sonar.cooldown - 1.5).abs() < 1e-6);
        assert!((cfg.tuning.sonar.max_radius - 8.0).abs() < 1e-6);
        assert!((cfg.tuning.visibility.reveal_duration - 3.0).abs() < 1e-6);
        assert_eq!(cfg.seed, Some(7));
    }

    #[test]
    fn unusable_values_fall_back() {
        let cfg = GameConfig::from_toml_str(
            "[timing]\nmax_tick_delta = -0.5\n\n[sentry]\nwander_chance = nan\n",
        ).unwrap();
        assert!((cfg.tuning.timing.max_tick_delta - 0.1).abs() < 1e-6);
        assert!((cfg.tuning.sentry.wander_chance - 0.3).abs() < 1e-9);

        let cfg = GameConfig::from_toml_str("[sentry]\nwander_chance = 1.0\n").unwrap();
        assert_eq!(cfg.tuning.sentry.wander_chance, 1.0);
    }

    #[test]
    fn bad_type_is_an_error() {
        assert!(GameConfig::from_toml_str("[sonar]\ncooldown = \"slow\"\n").is_err());
    }
}
