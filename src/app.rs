//! App: terminal init, main loop, gesture and key handling.

use crate::game::{GRID_SIZE, Session, ShapeKind, TRAY_SIZE};
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::{Args, GameConfig};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::DefaultTerminal;
use std::io::Write;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// How long the board jitters after a blast.
pub const SHAKE_DURATION_MS: u64 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    GameOver,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    MainMenu,
    Exit,
}

/// Gesture state for one piece drop: Idle -> Dragging -> dropped (valid or
/// invalid). An invalid drop returns the piece to the tray; nothing mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Idle,
    Dragging { slot: usize, x: i32, y: i32 },
}

#[derive(Debug, Clone)]
pub struct MenuState {
    pub animation_start: Instant,
}

impl Default for MenuState {
    fn default() -> Self {
        Self {
            animation_start: Instant::now(),
        }
    }
}

pub struct App {
    args: Args,
    config: GameConfig,
    theme: Theme,
    session: Session,
    screen: Screen,
    gesture: Gesture,
    /// Tray slot highlighted while idle.
    selected_slot: usize,
    game_start: Instant,
    high_score: u32,
    new_high_score: bool,
    /// Blast feedback: board jitter + cell fade, plus the terminal bell.
    shake_started: Option<Instant>,
    blast_cells: Vec<usize>,
    blast_effect: Option<Effect>,
    blast_effect_process_time: Option<Instant>,
    menu_state: MenuState,
    quit_selected: QuitOption,
}

impl App {
    pub fn new(args: Args, config: GameConfig, theme: Theme) -> Result<Self> {
        let session = Session::new(config.seed);
        let screen = if args.no_menu {
            Screen::Playing
        } else {
            Screen::Menu
        };
        Ok(Self {
            args,
            config,
            theme,
            session,
            screen,
            gesture: Gesture::Idle,
            selected_slot: 0,
            game_start: Instant::now(),
            high_score: crate::highscores::load_high_score(),
            new_high_score: false,
            shake_started: None,
            blast_cells: Vec::new(),
            blast_effect: None,
            blast_effect_process_time: None,
            menu_state: MenuState::default(),
            quit_selected: QuitOption::Resume,
        })
    }

    fn reset_game(&mut self) {
        self.session.reset();
        self.screen = Screen::Playing;
        self.gesture = Gesture::Idle;
        self.selected_slot = 0;
        self.game_start = Instant::now();
        self.new_high_score = false;
        self.shake_started = None;
        self.blast_cells.clear();
        self.blast_effect = None;
        self.blast_effect_process_time = None;
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        // Persist the best score even when quitting mid-game.
        let _ = crate::highscores::save_high_score(self.high_score);

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_interval = Duration::from_secs_f64(1.0 / self.config.frame_rate.max(1.0));
        loop {
            let now = Instant::now();
            if self
                .shake_started
                .is_some_and(|t| t.elapsed() >= Duration::from_millis(SHAKE_DURATION_MS))
            {
                self.shake_started = None;
            }

            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.session,
                    &self.theme,
                    self.gesture,
                    self.selected_slot,
                    self.high_score,
                    self.new_high_score,
                    self.shake_started,
                    &self.blast_cells,
                    &mut self.blast_effect,
                    &mut self.blast_effect_process_time,
                    &self.menu_state,
                    (self.screen == Screen::QuitMenu).then_some(self.quit_selected),
                    now,
                    self.args.no_animation,
                )
            })?;

            if !event::poll(frame_interval)? {
                continue;
            }
            while event::poll(Duration::ZERO)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    let action = key_to_action(key);
                    match self.screen {
                        Screen::Menu => match action {
                            Action::Quit | Action::Cancel => return Ok(()),
                            Action::Confirm => self.reset_game(),
                            _ => {}
                        },
                        Screen::Playing => {
                            if self.handle_playing_key(action, key.code) {
                                return Ok(());
                            }
                        }
                        Screen::QuitMenu => match action {
                            Action::MoveDown | Action::MoveRight | Action::NextPiece => {
                                self.quit_selected = match self.quit_selected {
                                    QuitOption::Resume => QuitOption::MainMenu,
                                    QuitOption::MainMenu => QuitOption::Exit,
                                    QuitOption::Exit => QuitOption::Resume,
                                };
                            }
                            Action::MoveUp | Action::MoveLeft | Action::PrevPiece => {
                                self.quit_selected = match self.quit_selected {
                                    QuitOption::Resume => QuitOption::Exit,
                                    QuitOption::MainMenu => QuitOption::Resume,
                                    QuitOption::Exit => QuitOption::MainMenu,
                                };
                            }
                            Action::Confirm => match self.quit_selected {
                                QuitOption::Resume => self.screen = Screen::Playing,
                                QuitOption::MainMenu => self.screen = Screen::Menu,
                                QuitOption::Exit => return Ok(()),
                            },
                            Action::Pause | Action::Quit | Action::Cancel => {
                                self.screen = Screen::Playing;
                            }
                            _ => {}
                        },
                        Screen::GameOver => {
                            if action == Action::Quit {
                                return Ok(());
                            }
                            if matches!(key.code, KeyCode::Char('r') | KeyCode::Char('R')) {
                                self.reset_game();
                            } else if action == Action::Cancel {
                                self.screen = Screen::Menu;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Handle one key while playing. Returns true when the app should exit.
    fn handle_playing_key(&mut self, action: Action, code: KeyCode) -> bool {
        if self.session.is_paused() {
            match action {
                Action::Pause => self.session.set_paused(false),
                Action::Quit | Action::Cancel => {
                    self.session.set_paused(false);
                    self.screen = Screen::QuitMenu;
                    self.quit_selected = QuitOption::Resume;
                }
                // Paused: all drag/placement processing suppressed.
                _ => {}
            }
            return false;
        }
        match action {
            Action::Pause => {
                self.session.set_paused(true);
                return false;
            }
            Action::Quit => {
                self.screen = Screen::QuitMenu;
                self.quit_selected = QuitOption::Resume;
                return false;
            }
            _ => {}
        }
        if let KeyCode::Char(c @ '1'..='3') = code {
            let slot = (c as usize) - ('1' as usize);
            if self.gesture == Gesture::Idle && self.session.tray[slot].is_some() {
                self.selected_slot = slot;
            }
            return false;
        }
        match self.gesture {
            Gesture::Idle => match action {
                Action::MoveLeft | Action::PrevPiece | Action::MoveUp => self.cycle_slot(-1),
                Action::MoveRight | Action::NextPiece | Action::MoveDown => self.cycle_slot(1),
                Action::Confirm => {
                    if let Some(piece) = self.session.tray[self.selected_slot] {
                        // Pick up centred on the board.
                        let (x, y) = clamp_anchor(
                            (GRID_SIZE as i32 - piece.shape.width() as i32) / 2,
                            (GRID_SIZE as i32 - piece.shape.height() as i32) / 2,
                            piece.shape,
                        );
                        self.gesture = Gesture::Dragging {
                            slot: self.selected_slot,
                            x,
                            y,
                        };
                    }
                }
                _ => {}
            },
            Gesture::Dragging { slot, x, y } => {
                let shape = match self.session.tray[slot] {
                    Some(p) => p.shape,
                    None => {
                        self.gesture = Gesture::Idle;
                        return false;
                    }
                };
                match action {
                    Action::MoveLeft => self.move_drag(slot, x - 1, y, shape),
                    Action::MoveRight => self.move_drag(slot, x + 1, y, shape),
                    Action::MoveUp => self.move_drag(slot, x, y - 1, shape),
                    Action::MoveDown => self.move_drag(slot, x, y + 1, shape),
                    Action::Cancel => self.gesture = Gesture::Idle,
                    Action::Confirm => self.drop_at(slot, x, y),
                    _ => {}
                }
            }
        }
        false
    }

    fn move_drag(&mut self, slot: usize, x: i32, y: i32, shape: ShapeKind) {
        let (x, y) = clamp_anchor(x, y, shape);
        self.gesture = Gesture::Dragging { slot, x, y };
    }

    /// Drop the dragged piece. Valid: grid mutates, clusters may blast, the
    /// piece is consumed. Invalid: the piece returns to the tray untouched.
    fn drop_at(&mut self, slot: usize, x: i32, y: i32) {
        self.gesture = Gesture::Idle;
        let Some(outcome) = self.session.drop_piece(slot, x, y) else {
            return;
        };
        self.select_first_available();
        if !outcome.blasts.is_empty() {
            self.blast_cells = outcome
                .blasts
                .iter()
                .flat_map(|b| b.indices.iter().copied())
                .collect();
            if !self.args.no_animation {
                self.shake_started = Some(Instant::now());
                self.blast_effect = None;
                self.blast_effect_process_time = None;
            }
            ring_bell();
        }
        if self.session.score > self.high_score {
            self.high_score = self.session.score;
            self.new_high_score = true;
        }
        if self.session.is_stuck() {
            let _ = crate::highscores::save_high_score(self.high_score);
            self.screen = Screen::GameOver;
        }
    }

    fn cycle_slot(&mut self, dir: i32) {
        for step in 1..=TRAY_SIZE as i32 {
            let i = (self.selected_slot as i32 + dir * step).rem_euclid(TRAY_SIZE as i32) as usize;
            if self.session.tray[i].is_some() {
                self.selected_slot = i;
                return;
            }
        }
    }

    fn select_first_available(&mut self) {
        if let Some(i) = self.session.tray.iter().position(Option::is_some) {
            self.selected_slot = i;
        }
    }
}

/// Keep the shape's bounding box on the board while dragging.
fn clamp_anchor(x: i32, y: i32, shape: ShapeKind) -> (i32, i32) {
    let max_x = GRID_SIZE as i32 - shape.width() as i32;
    let max_y = GRID_SIZE as i32 - shape.height() as i32;
    (x.clamp(0, max_x), y.clamp(0, max_y))
}

/// Blast audio cue. Raw mode swallows nothing here; BEL is fine.
fn ring_bell() {
    let mut stdout = std::io::stdout();
    let _ = stdout.write_all(b"\x07");
    let _ = stdout.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_anchor() {
        assert_eq!(clamp_anchor(-3, 0, ShapeKind::Dot), (0, 0));
        assert_eq!(clamp_anchor(9, 9, ShapeKind::Dot), (7, 7));
        assert_eq!(clamp_anchor(7, 0, ShapeKind::Bar4), (4, 0));
        assert_eq!(clamp_anchor(7, 7, ShapeKind::Square), (6, 6));
    }
}
