/// Best-run records per level, kept in `records.toml`.
///
/// ## File format
///
/// ```toml
/// [levels.shallows]
/// pings = 2
/// elapsed = 41.5
/// ```
///
/// A record is replaced only by a strictly better run: fewer pings, or the
/// same pings in less time. Losses are never submitted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RecordError;

const RECORDS_FILE: &str = "records.toml";

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BestRecord {
    pub pings: u32,
    pub elapsed: f32,
}

impl BestRecord {
    /// Ordering used for records: pings first, then time.
    pub fn beats(&self, other: &BestRecord) -> bool {
        self.pings < other.pings || (self.pings == other.pings && self.elapsed < other.elapsed)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BestRecords {
    #[serde(default)]
    levels: BTreeMap<String, BestRecord>,
}

impl BestRecords {
    /// Read records from `path`. A missing or unreadable file yields an
    /// empty table; it is never fatal.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read records");
                return Self::default();
            }
        };
        match toml::from_str::<BestRecords>(&content) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "records file malformed, starting fresh");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), RecordError> {
        let text = toml::to_string(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn get(&self, level_id: &str) -> Option<&BestRecord> {
        self.levels.get(level_id)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Offer a winning run. Returns `true` if it became the new best.
    pub fn submit(&mut self, level_id: &str, pings: u32, elapsed: f32) -> bool {
        let run = BestRecord { pings, elapsed };
        match self.levels.get(level_id) {
            Some(best) if !run.beats(best) => false,
            _ => {
                tracing::info!(level = level_id, pings, elapsed, "new best record");
                self.levels.insert(level_id.to_string(), run);
                true
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Paths
// ══════════════════════════════════════════════════════════════

/// Where `records.toml` lives.
pub fn save_dir() -> PathBuf {
    // 1. Exe directory, if writable (portable installs)
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            let probe = parent.join(".write_test_deepecho");
            if std::fs::write(&probe, "").is_ok() {
                let _ = std::fs::remove_file(&probe);
                return parent.to_path_buf();
            }
        }
    }

    // 2. ~/.local/share/deepecho for system installs
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(home).join(".local/share/deepecho");
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    // 3. CWD
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

pub fn records_path() -> PathBuf {
    save_dir().join(RECORDS_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fewer_pings_beats_faster_time() {
        let mut r = BestRecords::default();
        assert!(r.submit("trench", 2, 10.0));
        assert!(r.submit("trench", 1, 20.0));
        assert_eq!(r.get("trench"), Some(&BestRecord { pings: 1, elapsed: 20.0 }));

        assert!(!r.submit("trench", 3, 5.0));
        assert_eq!(r.get("trench").map(|b| b.pings), Some(1));
    }

    #[test]
    fn ties_go_to_the_faster_run() {
        let mut r = BestRecords::default();
        r.submit("a", 2, 30.0);
        assert!(!r.submit("a", 2, 30.0));
        assert!(r.submit("a", 2, 29.5));
        assert_eq!(r.get("a").map(|b| b.elapsed), Some(29.5));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn missing_or_malformed_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(BestRecords::load(&dir.path().join("nope.toml")).is_empty());

        let bad = dir.path().join(RECORDS_FILE);
        std::fs::write(&bad, "levels = [1, 2").unwrap();
        assert!(BestRecords::load(&bad).is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join(RECORDS_FILE);

        let mut r = BestRecords::default();
        r.submit("shallows", 3, 12.5);
        r.submit("listening-post", 0, 88.0);
        r.save(&path).unwrap();

        let back = BestRecords::load(&path);
        assert_eq!(back, r);
        assert!(std::fs::read_to_string(&path).unwrap().contains("[levels.shallows]"));
    }
}
