/// Level loader.
///
/// ## Sources (in list order):
///   1. Built-in embedded levels
///   2. `levels/` directory (individual `.txt` files, sorted by filename)
///
/// ## Single-level format (`.txt`):
///   Header (optional, before the first map row):
///     `# Level Name` (no other `#` on the line)
///     `@ id=<id> beacon=<n> dampener=<n> phase=<n>`
///   Then map rows, all the same width
///
/// ## Tile legend:
///   '#' = Wall                   'P' = Player spawn
///   'E' = Exit                   'A' = Artifact
///   'B' = Beacon pickup          'D' = Dampener pickup
///   'T' = Phase pickup           'S' = Sentry spawn (its home tile)
///   anything else = open floor
///
/// A level that is missing `P` or `E`, has two of either, or has ragged
/// rows is rejected outright rather than loaded half-valid.

use std::path::Path;

use crate::domain::entity::{Artifact, Pickup, PickupKind, Resources};
use crate::domain::grid::{Grid, Pos};
use crate::error::LevelError;

/// A parsed level. Only the `collected` flags change after parsing.
#[derive(Clone, Debug)]
pub struct Level {
    pub id: String,
    pub name: String,
    pub grid: Grid,
    pub artifacts: Vec<Artifact>,
    pub pickups: Vec<Pickup>,
    pub sentry_spawns: Vec<Pos>,
    pub player_spawn: Pos,
    pub exit: Pos,
    pub start_resources: Resources,
}

impl Level {
    pub fn all_artifacts_collected(&self) -> bool {
        self.artifacts.iter().all(|a| a.collected)
    }

    pub fn artifacts_remaining(&self) -> usize {
        self.artifacts.iter().filter(|a| !a.collected).count()
    }
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Every playable level: embedded first, then the levels directory.
pub fn available_levels(levels_dir: &Path) -> Vec<Level> {
    let mut levels = embedded_levels();
    if levels_dir.is_dir() {
        levels.extend(load_from_directory(levels_dir));
    }
    levels
}

/// Parse one level from text. `default_id` is used when the text carries
/// no `@ id=` metadata (typically the file stem).
pub fn parse_level(default_id: &str, content: &str) -> Result<Level, LevelError> {
    let mut name = String::new();
    let mut id = default_id.to_string();
    let mut resources = Resources::default();

    // Header: blank lines, at most one name line, metadata lines.
    // The first line that is none of these starts the grid.
    let mut lines = content.lines().map(|l| l.trim_end_matches('\r')).peekable();
    while let Some(&line) = lines.peek() {
        if line.trim().is_empty() {
            // skip
        } else if name.is_empty() && is_name_line(line) {
            name = line[1..].trim().to_string();
        } else if let Some(meta) = line.strip_prefix("@ ") {
            parse_metadata(meta, default_id, &mut id, &mut resources)?;
        } else {
            break;
        }
        lines.next();
    }
    let mut rows: Vec<&str> = lines.collect();

    while rows.last().map_or(false, |r| r.trim().is_empty()) {
        rows.pop();
    }

    if name.is_empty() {
        name = id.clone();
    }

    if rows.is_empty() {
        return Err(LevelError::EmptyGrid(id));
    }

    let width = rows[0].chars().count();
    let height = rows.len();
    let mut walls = Vec::with_capacity(width * height);
    let mut artifacts = vec![];
    let mut pickups = vec![];
    let mut sentry_spawns = vec![];
    let mut player_spawn: Option<Pos> = None;
    let mut exit: Option<Pos> = None;

    for (y, row) in rows.iter().enumerate() {
        let found = row.chars().count();
        if found != width {
            return Err(LevelError::RaggedRow { level: id, row: y, expected: width, found });
        }
        for (x, ch) in row.chars().enumerate() {
            let pos = Pos::new(x as i32, y as i32);
            walls.push(ch == '#');
            match ch {
                'P' => place_unique(&mut player_spawn, 'P', pos, &id)?,
                'E' => place_unique(&mut exit, 'E', pos, &id)?,
                'A' => artifacts.push(Artifact::new(pos)),
                'S' => sentry_spawns.push(pos),
                c => {
                    if let Some(kind) = PickupKind::from_marker(c) {
                        pickups.push(Pickup::new(pos, kind));
                    }
                }
            }
        }
    }

    let player_spawn = player_spawn
        .ok_or_else(|| LevelError::MissingMarker { level: id.clone(), marker: 'P' })?;
    let exit = exit
        .ok_or_else(|| LevelError::MissingMarker { level: id.clone(), marker: 'E' })?;

    Ok(Level {
        id,
        name,
        grid: Grid::new(width, height, walls),
        artifacts,
        pickups,
        sentry_spawns,
        player_spawn,
        exit,
        start_resources: resources,
    })
}

// ══════════════════════════════════════════════════════════════
// Parsing helpers
// ══════════════════════════════════════════════════════════════

fn place_unique(slot: &mut Option<Pos>, marker: char, pos: Pos, level: &str) -> Result<(), LevelError> {
    if let Some(first) = *slot {
        return Err(LevelError::DuplicateMarker {
            level: level.to_string(),
            marker,
            first,
            second: pos,
        });
    }
    *slot = Some(pos);
    Ok(())
}

fn parse_metadata(
    meta: &str,
    level: &str,
    id: &mut String,
    resources: &mut Resources,
) -> Result<(), LevelError> {
    for entry in meta.split_whitespace() {
        let bad = || LevelError::BadMetadata { level: level.to_string(), entry: entry.to_string() };
        let (key, value) = entry.split_once('=').ok_or_else(bad)?;
        match key {
            "id" if !value.is_empty() => *id = value.to_string(),
            "beacon" => resources.beacon = value.parse().map_err(|_| bad())?,
            "dampener" => resources.dampener = value.parse().map_err(|_| bad())?,
            "phase" => resources.phase = value.parse().map_err(|_| bad())?,
            _ => return Err(bad()),
        }
    }
    Ok(())
}

/// `# Level Name`: a hash, a space, then text with no further `#`.
/// Rows like `# P E #` or `#x###` stay grid data.
fn is_name_line(line: &str) -> bool {
    line.strip_prefix("# ")
        .map_or(false, |rest| !rest.trim().is_empty() && !rest.contains('#'))
}

// ══════════════════════════════════════════════════════════════
// Directory loading (individual .txt files)
// ══════════════════════════════════════════════════════════════

fn load_from_directory(dir: &Path) -> Vec<Level> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!("could not read {}: {e}", dir.display());
            return vec![];
        }
    };

    let mut files: Vec<_> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |e| e == "txt"))
        .collect();
    files.sort();

    let mut levels = vec![];
    for path in files {
        let stem = path.file_stem().unwrap_or_default().to_string_lossy().to_string();
        let loaded = std::fs::read_to_string(&path)
            .map_err(LevelError::from)
            .and_then(|content| parse_level(&stem, &content));
        match loaded {
            Ok(level) => levels.push(level),
            Err(e) => tracing::warn!("skipping {}: {e}", path.display()),
        }
    }
    levels
}

// ══════════════════════════════════════════════════════════════
// Embedded levels
// ══════════════════════════════════════════════════════════════

const EMBEDDED: &[&str] = &[
    "# Shallows
@ id=shallows beacon=1 dampener=0 phase=0
###############
#P    #      E#
#     #  S    #
#  A  #       #
#          A  #
#     #       #
###############",
    "# Cold Trench
@ id=trench beacon=1 dampener=1 phase=1
####################
#P   #      #     E#
#    #  S   #      #
#  A #      #  S   #
#    ###  ###      #
#  B      D    A   #
#    #      ####  ##
#    #  A   T      #
####################",
    "# Listening Post
@ id=listening-post beacon=2 dampener=1 phase=1
#########################
#P  #        S         E#
#   #  ####### #######  #
# A #  #  A  # #     #  #
#   #  #  S  # #  A  #  #
#   ####     # ####  #  #
#        D   #       #  #
#### ####### ### ##### ##
#  T            S    B  #
#  ######  A  ######    #
#########################",
];

fn embedded_levels() -> Vec<Level> {
    EMBEDDED.iter()
        .enumerate()
        .filter_map(|(i, text)| match parse_level(&format!("builtin-{}", i + 1), text) {
            Ok(level) => Some(level),
            Err(e) => {
                tracing::error!("built-in level {} is invalid: {e}", i + 1);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_levels_all_parse() {
        assert_eq!(embedded_levels().len(), EMBEDDED.len());
    }

    #[test]
    fn embedded_exits_are_reachable() {
        use crate::domain::path::next_step;
        for level in embedded_levels() {
            let hop = next_step(&level.grid, level.player_spawn, Some(level.exit));
            assert!(hop.is_some(), "exit unreachable in {}", level.id);
            for a in &level.artifacts {
                assert!(
                    next_step(&level.grid, level.player_spawn, Some(a.pos)).is_some(),
                    "artifact {} unreachable in {}", a.pos, level.id,
                );
            }
        }
    }

    #[test]
    fn parses_markers_and_metadata() {
        let level = parse_level("fallback", "\
# Test Dock
@ id=dock beacon=2 dampener=1 phase=3
#######
#P A S#
#B?D E#
#T    #
#######").unwrap();
        assert_eq!(level.id, "dock");
        assert_eq!(level.name, "Test Dock");
        assert_eq!(level.grid.width(), 7);
        assert_eq!(level.grid.height(), 5);
        assert_eq!(level.player_spawn, Pos::new(1, 1));
        assert_eq!(level.exit, Pos::new(5, 2));
        assert_eq!(level.artifacts, vec![Artifact::new(Pos::new(3, 1))]);
        assert_eq!(level.sentry_spawns, vec![Pos::new(5, 1)]);
        assert_eq!(level.start_resources, Resources::new(2, 1, 3));
        let kinds: Vec<_> = level.pickups.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![PickupKind::Beacon, PickupKind::Dampener, PickupKind::Phase]);
        // unknown '?' is open floor
        assert!(!level.grid.is_wall(Pos::new(2, 2)));
    }

    #[test]
    fn id_and_name_fall_back() {
        let level = parse_level("stem", "P.E").unwrap();
        assert_eq!(level.id, "stem");
        assert_eq!(level.name, "stem");
        assert_eq!(level.start_resources, Resources::default());
    }

    #[test]
    fn wall_row_is_not_a_name() {
        let level = parse_level("x", "#####\n#P E#\n#####").unwrap();
        assert_eq!(level.grid.height(), 3);
    }

    #[test]
    fn lettered_wall_row_stays_in_the_grid() {
        let level = parse_level("x", "#x###\n#P.E#\n#####").unwrap();
        assert_eq!(level.grid.height(), 3);
        assert_eq!(level.name, "x");
        assert!(!level.grid.is_wall(Pos::new(1, 0)));
    }

    #[test]
    fn header_lines_after_the_grid_are_rows() {
        let level = parse_level("x", "P.E\n@ .\n...").unwrap();
        assert_eq!(level.grid.height(), 3);
        assert!(!level.grid.is_wall(Pos::new(0, 1)));

        let err = parse_level("x", "P.E\n# Late name\n...").unwrap_err();
        assert!(matches!(err, LevelError::RaggedRow { row: 1, .. }));
    }

    #[test]
    fn header_order_is_free() {
        let level = parse_level("x", "\n@ beacon=4\n# Reef\n\nP.E").unwrap();
        assert_eq!(level.name, "Reef");
        assert_eq!(level.start_resources.beacon, 4);
        assert_eq!(level.grid.height(), 1);
    }

    #[test]
    fn trailing_blank_lines_ignored() {
        let level = parse_level("x", "\nP.E\n...\n\n\n").unwrap();
        assert_eq!(level.grid.height(), 2);
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = parse_level("x", "P..\n..\n..E").unwrap_err();
        assert!(matches!(err, LevelError::RaggedRow { row: 1, expected: 3, found: 2, .. }));
    }

    #[test]
    fn rejects_missing_markers() {
        assert!(matches!(
            parse_level("x", "P..").unwrap_err(),
            LevelError::MissingMarker { marker: 'E', .. }
        ));
        assert!(matches!(
            parse_level("x", "..E").unwrap_err(),
            LevelError::MissingMarker { marker: 'P', .. }
        ));
        assert!(matches!(parse_level("x", "# Only a name\n").unwrap_err(), LevelError::EmptyGrid(_)));
    }

    #[test]
    fn rejects_duplicate_player() {
        let err = parse_level("x", "P.P\n..E").unwrap_err();
        assert!(matches!(err, LevelError::DuplicateMarker { marker: 'P', .. }));
    }

    #[test]
    fn rejects_bad_metadata() {
        let err = parse_level("x", "@ beacon=lots\nP.E").unwrap_err();
        assert!(matches!(err, LevelError::BadMetadata { .. }));
        let err = parse_level("x", "@ colour=red\nP.E").unwrap_err();
        assert!(matches!(err, LevelError::BadMetadata { .. }));
    }

    #[test]
    fn directory_levels_sorted_and_invalid_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b_second.txt"), "P.E").unwrap();
        std::fs::write(dir.path().join("a_first.txt"), "# First\nPE").unwrap();
        std::fs::write(dir.path().join("c_broken.txt"), "P..").unwrap();
        std::fs::write(dir.path().join("notes.md"), "P.E").unwrap();

        let levels = load_from_directory(dir.path());
        let ids: Vec<_> = levels.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["a_first", "b_second"]);

        let all = available_levels(dir.path());
        assert_eq!(all.len(), EMBEDDED.len() + 2);
    }
}
