//! Layout and drawing: menu, board, tray, pause, game over, quit menu, blast effects.

use crate::app::{Gesture, MenuState, QuitOption, SHAKE_DURATION_MS, Screen};
use crate::game::{Cell, GRID_SIZE, Piece, Session, TRAY_SIZE};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each grid cell is 2 columns x 1 row of terminal cells.
const CELL_W: u16 = 2;
const CELL_H: u16 = 1;
const SIDEBAR_WIDTH: u16 = 24;
/// Full height of the sidebar sections (tray + stats + help, with gaps).
const SIDEBAR_HEIGHT: u16 = 18;
/// Duration of the blast flash fade, matched to the shake.
const BLAST_FADE_MS: u32 = SHAKE_DURATION_MS as u32;

/// Board size in terminal cells (grid + border).
fn board_pixel_size() -> (u16, u16) {
    (
        GRID_SIZE as u16 * CELL_W + 2,
        GRID_SIZE as u16 * CELL_H + 2,
    )
}

/// Board inner rect (no border) for given area; matches draw_game layout,
/// including the shake offset. Used to position the blast fade effect.
fn board_inner_rect(area: Rect, shake_started: Option<Instant>, now: Instant) -> Rect {
    let outer = board_outer_rect(area, shake_started, now);
    Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: (GRID_SIZE as u16 * CELL_W).min(outer.width.saturating_sub(2)),
        height: (GRID_SIZE as u16 * CELL_H).min(outer.height.saturating_sub(2)),
    }
}

/// Centered rect holding board + sidebar; all game drawing hangs off this.
fn game_active_rect(area: Rect) -> Rect {
    let (bw, bh) = board_pixel_size();
    let total_w = bw + SIDEBAR_WIDTH;
    let total_h = bh.max(SIDEBAR_HEIGHT);
    Rect {
        x: area.x + area.width.saturating_sub(total_w) / 2,
        y: area.y + area.height.saturating_sub(total_h) / 2,
        width: total_w.min(area.width),
        height: total_h.min(area.height),
    }
}

fn board_outer_rect(area: Rect, shake_started: Option<Instant>, now: Instant) -> Rect {
    let (bw, bh) = board_pixel_size();
    let active = game_active_rect(area);
    let (dx, dy) = shake_offset(shake_started, now);
    Rect {
        x: active.x.saturating_add_signed(dx),
        y: active.y.saturating_add_signed(dy),
        width: bw.min(active.width),
        height: bh.min(active.height),
    }
}

/// Board jitter while a blast shake is active; cycles a small offset table.
fn shake_offset(shake_started: Option<Instant>, now: Instant) -> (i16, i16) {
    const OFFSETS: [(i16, i16); 6] = [(1, 0), (0, 1), (-1, 0), (1, 1), (0, -1), (-1, 1)];
    let Some(started) = shake_started else {
        return (0, 0);
    };
    let elapsed = now.saturating_duration_since(started).as_millis() as u64;
    if elapsed >= SHAKE_DURATION_MS {
        return (0, 0);
    }
    OFFSETS[(elapsed / 40) as usize % OFFSETS.len()]
}

/// Draw current screen (menu, game, game over), with pause overlay and blast
/// effect handling. `blast_effect` / `blast_effect_process_time` persist the
/// TachyonFX state across frames.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    session: &Session,
    theme: &Theme,
    gesture: Gesture,
    selected_slot: usize,
    high_score: u32,
    new_high_score: bool,
    shake_started: Option<Instant>,
    blast_cells: &[usize],
    blast_effect: &mut Option<Effect>,
    blast_effect_process_time: &mut Option<Instant>,
    menu_state: &MenuState,
    quit_selected: Option<QuitOption>,
    now: Instant,
    no_animation: bool,
) {
    let area = frame.area();
    match screen {
        Screen::Menu => draw_menu(frame, theme, menu_state, area, now),
        Screen::Playing | Screen::QuitMenu => {
            draw_game(
                frame,
                session,
                theme,
                gesture,
                selected_slot,
                high_score,
                shake_started,
                area,
                now,
            );
            if screen == Screen::Playing
                && shake_started.is_some()
                && !blast_cells.is_empty()
                && !no_animation
            {
                apply_blast_effect(
                    frame,
                    theme,
                    area,
                    shake_started,
                    blast_cells,
                    blast_effect,
                    blast_effect_process_time,
                    now,
                );
            }
            if session.is_paused() {
                draw_pause_overlay(frame, theme, area);
            }
            if let Some(opt) = quit_selected {
                draw_quit_menu(frame, theme, opt);
            }
        }
        Screen::GameOver => {
            draw_game_over(frame, session, theme, high_score, new_high_score, area);
        }
    }
}

/// White flash fading back out over the blasted cells (TachyonFX).
fn apply_blast_effect(
    frame: &mut Frame,
    theme: &Theme,
    area: Rect,
    shake_started: Option<Instant>,
    blast_cells: &[usize],
    blast_effect: &mut Option<Effect>,
    blast_effect_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let board_rect = board_inner_rect(area, shake_started, now);
    let delta = blast_effect_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let tfx_delta = TfxDuration::from_millis(delta.as_millis().min(u128::from(u32::MAX)) as u32);
    *blast_effect_process_time = Some(now);

    if blast_effect.is_none() {
        let mut positions = HashSet::new();
        for &index in blast_cells {
            let col = (index % GRID_SIZE) as u16;
            let row = (index / GRID_SIZE) as u16;
            let x0 = board_rect.x + col * CELL_W;
            let y0 = board_rect.y + row * CELL_H;
            for dx in 0..CELL_W {
                positions.insert((x0 + dx, y0));
            }
        }
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            positions.contains(&(pos.x, pos.y))
        }));
        let flash = theme.main_fg;
        let effect = fx::fade_from(flash, flash, (BLAST_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board_rect);
        *blast_effect = Some(effect);
    }

    if let Some(effect) = blast_effect {
        frame.render_effect(effect, board_rect, tfx_delta);
    }
}

fn draw_menu(frame: &mut Frame, theme: &Theme, menu_state: &MenuState, area: Rect, now: Instant) {
    let popup_w = 44u16;
    let popup_h = 16u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };

    let title = Line::from(vec![
        Span::styled(" Octo ", Style::default().fg(theme.piece_color(0)).bold()),
        Span::styled(" blast ", Style::default().fg(theme.main_fg).bold()),
    ]);

    let key_style = Style::default().fg(theme.title);
    let text_style = Style::default().fg(theme.main_fg);
    let lines = vec![
        Line::from(""),
        title,
        Line::from(""),
        Line::from(Span::styled(
            " Place pieces on the 8×8 board. ",
            text_style,
        )),
        Line::from(Span::styled(
            " Same-colour clusters of 8+ blast! ",
            text_style,
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled(" ←↑↓→ ", key_style),
            Span::styled("move   ", text_style),
            Span::styled(" TAB ", key_style),
            Span::styled("pick piece ", text_style),
        ]),
        Line::from(vec![
            Span::styled(" ENTER ", key_style),
            Span::styled("grab/drop   ", text_style),
            Span::styled(" ESC ", key_style),
            Span::styled("put back ", text_style),
        ]),
        Line::from(vec![
            Span::styled(" P ", key_style),
            Span::styled("pause   ", text_style),
            Span::styled(" Q ", key_style),
            Span::styled("quit ", text_style),
        ]),
        Line::from(""),
        Line::from(""),
        Line::from(Span::styled(
            " [ ENTER ] START ",
            Style::default().fg(Color::Black).bg(theme.title).bold(),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " ⌁ [Q] QUIT ",
            Style::default().fg(theme.piece_color(0)),
        )),
    ];

    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );

    // Startup animation: slide in from below, ease-out cubic.
    let elapsed = now.duration_since(menu_state.animation_start).as_millis() as u32;
    let t = (elapsed as f32 / 500.0).min(1.0);
    let offset_t = 1.0 - (1.0 - t).powi(3);
    let mut anim_popup = popup;
    anim_popup.y += ((1.0 - offset_t) * 10.0) as u16;

    p.render(anim_popup, frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup_w = 28u16;
    let popup_h = 5u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P — Resume    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_game_over(
    frame: &mut Frame,
    session: &Session,
    theme: &Theme,
    high_score: u32,
    new_high_score: bool,
    area: Rect,
) {
    let (bw, bh) = board_pixel_size();
    let total_w = bw + SIDEBAR_WIDTH;
    let total_h = bh.max(12);
    let popup = Rect {
        x: area.x + area.width.saturating_sub(total_w) / 2,
        y: area.y + area.height.saturating_sub(total_h) / 2,
        width: total_w.min(area.width),
        height: total_h.min(area.height),
    };
    let mut lines: Vec<Line> = vec![
        Line::from(""),
        Line::from(Span::styled(
            " No moves left ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Score: {} ", session.score),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Best: {} ", high_score),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Level: {} ", session.level),
            Style::default().fg(theme.main_fg),
        )),
    ];
    if new_high_score {
        lines.push(Line::from(Span::styled(
            " New record! ",
            Style::default().fg(Color::Yellow).bold(),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " R — Restart    Q — Quit ",
        Style::default().fg(theme.main_fg),
    )));
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .title(Span::styled(" Octoblast ", Style::default().fg(theme.title))),
    );
    p.render(popup, frame.buffer_mut());
}

/// Draw game: board + sidebar; use full area and center both.
fn draw_game(
    frame: &mut Frame,
    session: &Session,
    theme: &Theme,
    gesture: Gesture,
    selected_slot: usize,
    high_score: u32,
    shake_started: Option<Instant>,
    area: Rect,
    now: Instant,
) {
    let (bw, _bh) = board_pixel_size();
    let active = game_active_rect(area);

    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(bw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(active);

    draw_board(frame, session, theme, gesture, shake_started, inner[0], now);
    draw_sidebar(frame, session, theme, gesture, selected_slot, high_score, inner[1]);
}

fn draw_board(
    frame: &mut Frame,
    session: &Session,
    theme: &Theme,
    gesture: Gesture,
    shake_started: Option<Instant>,
    area: Rect,
    now: Instant,
) {
    let outer = board_outer_rect_in(area, shake_started, now);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Octoblast ", Style::default().fg(theme.title)));
    let board = block.inner(outer);
    block.render(outer, frame.buffer_mut());

    // Dragged piece: covered cells + whether the drop would be valid.
    let ghost = match gesture {
        Gesture::Dragging { slot, x, y } => session.tray[slot].map(|piece| {
            let covered: HashSet<(i32, i32)> = piece
                .shape
                .cells()
                .iter()
                .map(|&(dx, dy)| (x + i32::from(dx), y + i32::from(dy)))
                .collect();
            let valid = session.validate(x, y, piece.shape);
            (piece, covered, valid)
        }),
        Gesture::Idle => None,
    };

    let buf = frame.buffer_mut();
    for row in 0..GRID_SIZE {
        for col in 0..GRID_SIZE {
            let rx = board.x + col as u16 * CELL_W;
            let ry = board.y + row as u16 * CELL_H;
            if rx + CELL_W > board.x + board.width || ry >= board.y + board.height {
                continue;
            }
            let (symbol, style) = match session.grid().get(col, row) {
                Cell::Filled(c) => (
                    "██",
                    Style::default()
                        .fg(theme.piece_color(c.palette_index()))
                        .bg(theme.bg),
                ),
                Cell::Empty => ("··", Style::default().fg(theme.div_line).bg(theme.bg)),
            };
            buf.set_string(rx, ry, symbol, style);
        }
    }

    // Ghost overlay on top of the cells.
    if let Some((piece, covered, valid)) = ghost {
        for &(cx, cy) in &covered {
            if !(0..GRID_SIZE as i32).contains(&cx) || !(0..GRID_SIZE as i32).contains(&cy) {
                continue;
            }
            let rx = board.x + cx as u16 * CELL_W;
            let ry = board.y + cy as u16 * CELL_H;
            if rx + CELL_W > board.x + board.width || ry >= board.y + board.height {
                continue;
            }
            let (symbol, style) = if valid {
                (
                    "▓▓",
                    Style::default()
                        .fg(theme.piece_color(piece.color.palette_index()))
                        .bg(theme.bg),
                )
            } else {
                ("░░", Style::default().fg(Color::Red).bg(theme.bg))
            };
            buf.set_string(rx, ry, symbol, style);
        }
    }
}

/// Board outer rect inside an already-centered column (shake still applies).
fn board_outer_rect_in(area: Rect, shake_started: Option<Instant>, now: Instant) -> Rect {
    let (bw, bh) = board_pixel_size();
    let (dx, dy) = shake_offset(shake_started, now);
    Rect {
        x: area.x.saturating_add_signed(dx),
        y: area.y.saturating_add_signed(dy),
        width: bw.min(area.width),
        height: bh.min(area.height),
    }
}

fn draw_sidebar(
    frame: &mut Frame,
    session: &Session,
    theme: &Theme,
    gesture: Gesture,
    selected_slot: usize,
    high_score: u32,
    area: Rect,
) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Tray (border + title + previews + labels)
            Constraint::Length(1), // gap
            Constraint::Length(5), // Stats (border + score, best, level)
            Constraint::Length(1), // gap
            Constraint::Length(5), // Help
        ])
        .split(area);

    // --- Tray ---
    let tray_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let tray_inner = tray_block.inner(chunks[0]);
    tray_block.render(chunks[0], frame.buffer_mut());
    let tray_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(2), Constraint::Length(1)])
        .split(tray_inner);
    Paragraph::new(Line::from(Span::styled("Pieces", title_style)))
        .render(tray_layout[0], frame.buffer_mut());
    let dragging_slot = match gesture {
        Gesture::Dragging { slot, .. } => Some(slot),
        Gesture::Idle => None,
    };
    let slot_w = 7u16;
    for i in 0..TRAY_SIZE {
        let sub = Rect {
            x: tray_layout[1].x + (i as u16) * slot_w,
            y: tray_layout[1].y,
            width: slot_w.min(tray_layout[1].width.saturating_sub(i as u16 * slot_w)),
            height: tray_layout[1].height,
        };
        match session.tray[i] {
            // The dragged piece lives on the board, not in the tray.
            Some(piece) if dragging_slot != Some(i) => {
                draw_piece_preview(frame, theme, sub, piece);
            }
            _ => {
                let p = Paragraph::new("—").style(Style::default().fg(theme.inactive_fg));
                p.render(sub, frame.buffer_mut());
            }
        }
        let label_style = if i == selected_slot {
            Style::default().fg(Color::Black).bg(theme.title).bold()
        } else {
            Style::default().fg(theme.inactive_fg)
        };
        let label = format!(" {} ", i + 1);
        let lx = sub.x + sub.width.saturating_sub(label.len() as u16) / 2;
        let ly = tray_layout[2].y;
        if ly < tray_inner.y + tray_inner.height {
            frame.buffer_mut().set_string(lx, ly, label, label_style);
        }
    }

    // --- Stats ---
    let stats_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let stats_inner = stats_block.inner(chunks[2]);
    stats_block.render(chunks[2], frame.buffer_mut());
    let stats_lines = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(session.score.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Best: ", title_style),
            Span::styled(high_score.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Level: ", title_style),
            Span::styled(session.level.to_string(), fg_style),
        ]),
    ];
    Paragraph::new(ratatui::text::Text::from(stats_lines))
        .render(stats_inner, frame.buffer_mut());

    // --- Help ---
    let help_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let help_inner = help_block.inner(chunks[4]);
    help_block.render(chunks[4], frame.buffer_mut());
    let hint_style = Style::default().fg(theme.inactive_fg);
    let help_lines = vec![
        Line::from(Span::styled("Enter grab/drop", hint_style)),
        Line::from(Span::styled("Esc put back", hint_style)),
        Line::from(Span::styled("P pause  Q quit", hint_style)),
    ];
    Paragraph::new(ratatui::text::Text::from(help_lines))
        .render(help_inner, frame.buffer_mut());
}

/// Draw a tray piece as a mini preview (1 char per cell), centred in `area`.
fn draw_piece_preview(frame: &mut Frame, theme: &Theme, area: Rect, piece: Piece) {
    let color = theme.piece_color(piece.color.palette_index());
    let w = piece.shape.width() as u16;
    let h = piece.shape.height() as u16;
    let off_x = area.width.saturating_sub(w) / 2;
    let off_y = area.height.saturating_sub(h) / 2;
    for &(dx, dy) in piece.shape.cells() {
        let rx = area.x + off_x + u16::from(dx);
        let ry = area.y + off_y + u16::from(dy);
        if rx < area.x + area.width && ry < area.y + area.height {
            frame
                .buffer_mut()
                .set_string(rx, ry, "█", Style::default().fg(color).bg(theme.bg));
        }
    }
}

pub fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let area = frame.area();
    let qw = 24;
    let qh = 8;
    let quit_rect = Rect {
        x: area.x + area.width.saturating_sub(qw) / 2,
        y: area.y + area.height.saturating_sub(qh) / 2,
        width: qw,
        height: qh,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");

    // Clear background
    for y in quit_rect.y..quit_rect.y + quit_rect.height {
        for x in quit_rect.x..quit_rect.x + quit_rect.width {
            frame.buffer_mut()[(x, y)].set_style(Style::default().bg(theme.bg));
        }
    }

    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    let options = [
        (QuitOption::Resume, " Resume "),
        (QuitOption::MainMenu, " Main Menu "),
        (QuitOption::Exit, " Exit "),
    ];

    for (i, (opt, label)) in options.iter().enumerate() {
        let style = if *opt == selected {
            Style::default().fg(theme.bg).bg(theme.title).bold()
        } else {
            Style::default().fg(theme.title)
        };
        let rx = inner.x + (inner.width.saturating_sub(label.len() as u16)) / 2;
        let ry = inner.y + 1 + i as u16 * 2;
        frame.buffer_mut().set_string(rx, ry, label, style);
    }
}
