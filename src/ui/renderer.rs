/// Presentation layer: double-buffered, diff-based terminal renderer.
///
///   1. Compose the next frame into `front` (a grid of Cells)
///   2. Compare each cell with `back` (the previous frame)
///   3. Emit terminal commands only for cells that changed, batched with `queue!`
///   4. Swap front/back
///
/// Map tiles are two terminal columns wide. Brightness follows the
/// visibility field: unseen tiles are blank, fading tiles dim toward the
/// background.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use deepecho::domain::entity::PickupKind;
use deepecho::domain::grid::Pos;
use deepecho::domain::sonar::{PingSource, ALERT_MAX};
use deepecho::sim::world::{Outcome, WorldState};

use crate::app::{App, Screen};

// ── Cell ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit background for every cell, so terminals never show their
    /// own default between rows.
    const BASE_BG: Color = Color::Rgb { r: 6, g: 10, b: 18 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Never equal to a real cell; forces a full repaint.
    const INVALID: Cell = Cell { ch: '\0', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = if bg == Color::Reset { Self::BASE_BG } else { bg };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            *self = FrameBuffer::new(w, h);
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }

    fn put_centered(&mut self, y: usize, s: &str, fg: Color) {
        let x = self.width.saturating_sub(s.chars().count()) / 2;
        self.put_str(x, y, s, fg, Color::Reset);
    }
}

// ── Layout / palette ──

const CELL_W: usize = 2;
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 3;
/// Rows below the map: gap, message, gap, help.
const FOOTER_ROWS: usize = 4;

/// Minimum visibility at which a sentry is drawn.
const SENTRY_VISIBLE: f32 = 0.2;
/// Below this a tile is not drawn at all.
const TILE_VISIBLE: f32 = 0.02;

const HUD_BG: Color = Color::Rgb { r: 12, g: 28, b: 44 };
const HILITE: Color = Color::Rgb { r: 90, g: 230, b: 210 };
const GOLD: Color = Color::Rgb { r: 255, g: 210, b: 70 };
const DANGER: Color = Color::Rgb { r: 255, g: 70, b: 70 };
const DIM: Color = Color::DarkGrey;

type Rgb = (u8, u8, u8);

const WALL_RGB: Rgb = (70, 110, 140);
const FLOOR_RGB: Rgb = (40, 70, 90);
const RING_PLAYER_BG: Color = Color::Rgb { r: 20, g: 70, b: 80 };
const RING_DECOY_BG: Color = Color::Rgb { r: 70, g: 50, b: 20 };

/// Scale an RGB color by visibility; never fully black so fading tiles
/// stay readable until they drop under `TILE_VISIBLE`.
fn shade((r, g, b): Rgb, vis: f32) -> Color {
    let k = 0.25 + 0.75 * vis.clamp(0.0, 1.0);
    Color::Rgb {
        r: (r as f32 * k) as u8,
        g: (g as f32 * k) as u8,
        b: (b as f32 * k) as u8,
    }
}

/// First visible world coordinate along one axis, keeping `focus` centred
/// where the map is larger than the view.
fn viewport_start(focus: i32, world: usize, view: usize) -> i32 {
    let max_start = world.saturating_sub(view) as i32;
    (focus - view as i32 / 2).clamp(0, max_start)
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_screen: Option<Screen>,
    keyboard_enhanced: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_screen: None,
            keyboard_enhanced: false,
        }
    }

    /// Enter raw mode and the alternate screen. Returns whether the
    /// terminal will report key releases.
    pub fn init(&mut self) -> io::Result<bool> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.keyboard_enhanced = true;
        }
        tracing::debug!(keyboard_enhanced = self.keyboard_enhanced, "terminal ready");

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);

        Ok(self.keyboard_enhanced)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.keyboard_enhanced {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, app: &App) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        let resized = tw as usize != self.term_w || th as usize != self.term_h;
        if resized {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
        }
        if resized || self.last_screen != Some(app.screen) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_screen = Some(app.screen);
        }

        self.front.clear();
        match (app.screen, app.world.as_ref()) {
            (Screen::Playing, Some(w)) => {
                self.compose_game(app, w);
                if app.paused {
                    self.compose_pause_overlay(app);
                }
            }
            (Screen::Result, Some(w)) => {
                self.compose_game(app, w);
                self.compose_result(app, w);
            }
            _ => self.compose_title(app),
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ══════════════════════════════════════════════════════════
    // Game screen
    // ══════════════════════════════════════════════════════════

    fn compose_game(&mut self, app: &App, w: &WorldState) {
        self.compose_hud(w);

        let grid = &w.level.grid;
        let view_w = (self.front.width / CELL_W).min(grid.width());
        let view_h = self.front.height.saturating_sub(MAP_ROW + FOOTER_ROWS).max(1).min(grid.height());
        let ox = viewport_start(w.player.pos.x, grid.width(), view_w);
        let oy = viewport_start(w.player.pos.y, grid.height(), view_h);

        for vy in 0..view_h {
            for vx in 0..view_w {
                let p = Pos::new(ox + vx as i32, oy + vy as i32);
                self.compose_tile(w, p, vx * CELL_W, MAP_ROW + vy);
            }
        }

        let msg_row = MAP_ROW + view_h + 1;
        if !app.message.is_empty() {
            self.front.fill_row(msg_row, HUD_BG);
            self.front.put_str(1, msg_row, &format!("◈ {}", app.message), GOLD, HUD_BG);
        }

        let help = " ←→↑↓/WASD move  SPACE hold+release ping  1 beacon  2 dampener  3 phase  R restart  P pause  ESC title";
        self.front.put_str(0, msg_row + 2, help, DIM, Color::Reset);
    }

    fn compose_hud(&mut self, w: &WorldState) {
        let now = w.clock;
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.fill_row(HUD_ROW + 1, HUD_BG);

        let total = w.level.artifacts.len();
        let got = total - w.level.artifacts_remaining();
        let exit = if w.exit_open() { "  EXIT OPEN" } else { "" };
        let line = format!(
            " {}   Artifacts {}/{}   Pings {}   Time {:.1}s{}",
            w.level.name, got, total, w.ping_count(), now, exit,
        );
        self.front.put_str(0, HUD_ROW, &line, Color::White, HUD_BG);

        // Alert bar
        const BAR: usize = 20;
        let filled = ((w.alert.value() / ALERT_MAX) * BAR as f32).round() as usize;
        let bar: String = (0..BAR).map(|i| if i < filled { '█' } else { '░' }).collect();
        let alert_fg = if w.alert.ratio() > 0.66 {
            DANGER
        } else if w.alert.ratio() > 0.33 {
            GOLD
        } else {
            HILITE
        };
        self.front.put_str(1, HUD_ROW + 1, "Alert ", Color::White, HUD_BG);
        self.front.put_str(7, HUD_ROW + 1, &bar, alert_fg, HUD_BG);

        let sonar = match w.sonar.charge_radius(now) {
            Some(r) => format!("Charging r={:.1}", r),
            None if w.sonar.is_ready(now) => "Sonar READY".to_string(),
            None => format!("Sonar {:.1}s", w.sonar.cooldown_remaining(now)),
        };
        let r = &w.player.resources;
        let mut status = format!(
            " {:<16} Beacon {}  Damp {}  Phase {}",
            sonar, r.beacon, r.dampener, r.phase,
        );
        if w.is_dampened() {
            status.push_str(&format!("  [DAMPED {:.1}s]", w.dampener.remaining(now)));
        }
        if w.player.phase_ready {
            status.push_str("  [PHASE ARMED]");
        }
        if let Some(d) = &w.decoy {
            if !d.fired {
                status.push_str(&format!("  [DECOY {:.1}s]", d.arm_remaining(now)));
            }
        }
        let status_x = 7 + BAR + 1;
        self.front.put_str(status_x, HUD_ROW + 1, &status, Color::White, HUD_BG);

        // Proximity warning: a sentry within one tile of the detection edge.
        if let Some(d) = w.nearest_sentry {
            if d <= w.detection_radius + 1.0 && !w.outcome.is_over() {
                let x = self.front.width.saturating_sub(8);
                self.front.put_str(x, HUD_ROW, " !NEAR ", Color::Black, DANGER);
            }
        }
    }

    fn compose_tile(&mut self, w: &WorldState, p: Pos, col: usize, row: usize) {
        let vis = w.visibility_at(p);
        let now = w.clock;

        let ring_bg = w.pings.iter().find_map(|wave| {
            let d = wave.origin.distance(p);
            let rr = wave.ring_radius(now);
            if d <= wave.radius && (d - rr).abs() < 0.5 {
                Some(match wave.source {
                    PingSource::Player => RING_PLAYER_BG,
                    PingSource::Decoy => RING_DECOY_BG,
                })
            } else {
                None
            }
        });
        let bg = ring_bg.unwrap_or(Cell::BASE_BG);

        let put = |front: &mut FrameBuffer, c0: char, c1: char, fg: Color| {
            front.set(col, row, Cell::new(c0, fg, bg));
            front.set(col + 1, row, Cell::new(c1, fg, bg));
        };

        // Player is always drawn.
        if p == w.player.pos {
            let fg = if w.player.phase_ready { Color::Magenta } else { HILITE };
            put(&mut self.front, '◖', '◗', fg);
            return;
        }

        if vis < TILE_VISIBLE {
            put(&mut self.front, ' ', ' ', Color::Reset);
            return;
        }

        if vis >= SENTRY_VISIBLE {
            if w.sentry_at(p).is_some() {
                put(&mut self.front, '▲', '▲', DANGER);
                return;
            }
        }

        if let Some(d) = &w.decoy {
            if d.pos == p {
                put(&mut self.front, '(', ')', GOLD);
                return;
            }
        }

        let grid = &w.level.grid;
        if grid.is_wall(p) {
            put(&mut self.front, '█', '█', shade(WALL_RGB, vis));
            return;
        }

        if p == w.level.exit {
            let fg = if w.exit_open() { shade((80, 255, 120), vis) } else { shade((120, 120, 120), vis) };
            put(&mut self.front, '[', ']', fg);
            return;
        }
        if w.level.artifacts.iter().any(|a| a.pos == p && !a.collected) {
            put(&mut self.front, '◆', ' ', shade((255, 210, 70), vis));
            return;
        }
        if let Some(pk) = w.level.pickups.iter().find(|pk| pk.pos == p && !pk.collected) {
            let rgb = match pk.kind {
                PickupKind::Beacon => (255, 170, 60),
                PickupKind::Dampener => (120, 170, 255),
                PickupKind::Phase => (220, 120, 255),
            };
            put(&mut self.front, pk.kind.marker(), ' ', shade(rgb, vis));
            return;
        }

        put(&mut self.front, '·', ' ', shade(FLOOR_RGB, vis));
    }

    fn compose_result(&mut self, app: &App, w: &WorldState) {
        let top = MAP_ROW + 1;
        let (title, color) = match &w.outcome {
            Outcome::Won { .. } => ("  ★  LEVEL CLEARED  ★  ", GOLD),
            Outcome::Lost { .. } => ("  ✕  DETECTED  ✕  ", DANGER),
            Outcome::Playing => return,
        };
        for y in top..top + 7 {
            self.front.fill_row(y, HUD_BG);
        }
        self.front.put_centered(top + 1, title, color);

        match &w.outcome {
            Outcome::Won { pings, elapsed } => {
                let run = format!("{} pings  ·  {:.1}s", pings, elapsed);
                self.front.put_centered(top + 2, &run, Color::White);
                let best = match app.records.get(&w.level.id) {
                    Some(b) if app.new_record => format!("NEW BEST! {} pings · {:.1}s", b.pings, b.elapsed),
                    Some(b) => format!("Best: {} pings · {:.1}s", b.pings, b.elapsed),
                    None => String::new(),
                };
                self.front.put_centered(top + 3, &best, if app.new_record { GOLD } else { DIM });
                self.front.put_centered(top + 5, "ENTER next level   R replay   ESC title", HILITE);
            }
            Outcome::Lost { reason } => {
                self.front.put_centered(top + 2, reason, Color::White);
                self.front.put_centered(top + 5, "ENTER / R retry   ESC title", HILITE);
            }
            Outcome::Playing => {}
        }
    }

    fn compose_pause_overlay(&mut self, app: &App) {
        let top = MAP_ROW + 1;
        for y in top..top + 3 {
            self.front.fill_row(y, HUD_BG);
        }
        let label = if (app.anim_tick / 8) % 2 == 0 { "▶  PAUSED  ◀" } else { "   PAUSED   " };
        self.front.put_centered(top + 1, label, GOLD);
    }

    // ══════════════════════════════════════════════════════════
    // Title / level list
    // ══════════════════════════════════════════════════════════

    fn compose_title(&mut self, app: &App) {
        let title = [
            r"  ___                  ___     _         ",
            r" |   \ ___ ___ _ __   | __|__| |_  ___   ",
            r" | |) / -_) -_) '_ \  | _|/ _| ' \/ _ \  ",
            r" |___/\___\___| .__/  |___\__|_||_\___/  ",
            r"              |_|                        ",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_str(2, 1 + i, line, HILITE, Color::Reset);
        }
        self.front.put_str(4, 7, "Find the artifacts. Reach the exit. Every ping is heard.", DIM, Color::Reset);

        let list_top = 9;
        let visible = self.front.height.saturating_sub(list_top + 4).max(1);
        let scroll = app.cursor.saturating_sub(visible.saturating_sub(1));

        if app.levels.is_empty() {
            self.front.put_str(4, list_top, "No playable levels found.", DANGER, Color::Reset);
        }
        for (row, (i, level)) in app.levels.iter().enumerate().skip(scroll).take(visible).enumerate() {
            let selected = i == app.cursor;
            let marker = if selected { "▸" } else { " " };
            let best = app.records.get(&level.id)
                .map(|b| format!("best {} pings · {:.1}s", b.pings, b.elapsed))
                .unwrap_or_else(|| "unplayed".to_string());
            let line = format!("{} {:>2}. {:<24} {}", marker, i + 1, level.name, best);
            let fg = if selected { GOLD } else { Color::White };
            self.front.put_str(4, list_top + row, &line, fg, Color::Reset);
        }

        let foot = self.front.height.saturating_sub(2);
        self.front.put_str(4, foot, "↑↓ choose   ENTER play   Q quit", DIM, Color::Reset);
        if !app.message.is_empty() {
            self.front.put_str(4, foot.saturating_sub(1), &format!("◈ {}", app.message), GOLD, Color::Reset);
        }
    }
}
