//! Layout and drawing: menu, poem board, candidate tray, solved popup, retry flash.

use crate::app::Screen;
use crate::game::{Round, Slot};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Position, Rect};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Terminal columns per character cell: a double-width CJK glyph + 2 padding.
const CELL_W: u16 = 4;
/// Display columns of the glyph itself.
const GLYPH_W: u16 = 2;
/// Glyph for an empty blank (fullwidth low line, width 2 like the poem glyphs).
const BLANK_GLYPH: char = '＿';
/// Rows inside the board border: line 0, gap, line 1, gap, tray, gap, status, hint.
const BOARD_INNER_H: u16 = 8;

/// Inner board width in columns for this round.
fn board_inner_width(round: &Round) -> u16 {
    let line_w = round.lines()[0].len() as u16 * CELL_W;
    let tray_w = round.candidates().len() as u16 * CELL_W;
    line_w.max(tray_w).max(38)
}

/// Centered board rect (border included) for the given frame area.
fn board_rect(area: Rect, round: &Round) -> Rect {
    let w = board_inner_width(round) + 2;
    let h = BOARD_INNER_H + 2;
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

/// Buffer origin of the character cell (line, col); matches draw_game's layout.
fn cell_origin(board: Rect, line: usize, col: usize) -> (u16, u16) {
    (
        board.x + 1 + col as u16 * CELL_W,
        board.y + 1 + line as u16 * 2,
    )
}

/// Draw current screen. While the retry flash is pending (and animation is
/// on), applies a TachyonFX fade on the mismatched cells and updates
/// `wrong_effect` / `wrong_effect_time`.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    round: &Round,
    theme: &Theme,
    cursor: usize,
    selected: usize,
    restore_pending: bool,
    retry_delay_ms: u64,
    last_spoken: Option<&str>,
    menu_animation_start: Instant,
    now: Instant,
    no_animation: bool,
    wrong_effect: &mut Option<Effect>,
    wrong_effect_time: &mut Option<Instant>,
) {
    let area = frame.area();
    match screen {
        Screen::Menu => draw_menu(frame, theme, area, menu_animation_start, now),
        Screen::Playing => {
            draw_game(
                frame,
                round,
                theme,
                area,
                cursor,
                selected,
                restore_pending,
                last_spoken,
            );
            if restore_pending && !no_animation {
                apply_wrong_flash(
                    frame,
                    round,
                    theme,
                    area,
                    retry_delay_ms,
                    wrong_effect,
                    wrong_effect_time,
                    now,
                );
            }
        }
        Screen::Solved => {
            draw_game(
                frame, round, theme, area, cursor, selected, false, last_spoken,
            );
            draw_solved_popup(frame, round, theme, area);
        }
    }
}

fn draw_menu(frame: &mut Frame, theme: &Theme, area: Rect, animation_start: Instant, now: Instant) {
    let popup_w = 46u16;
    let popup_h = 15u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };

    let title = Line::from(vec![
        Span::styled(" 填字 ", Style::default().fg(theme.title).bold()),
        Span::styled(" tui ", Style::default().fg(theme.main_fg).bold()),
    ]);

    let lines = vec![
        Line::from(""),
        title,
        Line::from(""),
        Line::from(Span::styled(
            " 把缺失的字放回诗句里 ",
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " ─ 玩法 ─ ",
            Style::default().fg(theme.div_line),
        )),
        Line::from(vec![
            Span::styled(" ←/→ ", Style::default().fg(theme.candidate)),
            Span::from("选空格   "),
            Span::styled(" ↑/↓ ", Style::default().fg(theme.candidate)),
            Span::from("选字"),
        ]),
        Line::from(vec![
            Span::styled(" ENTER ", Style::default().fg(theme.candidate)),
            Span::from("放字   "),
            Span::styled(" U ", Style::default().fg(theme.candidate)),
            Span::from("悔一步   "),
            Span::styled(" S ", Style::default().fg(theme.candidate)),
            Span::from("读音"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            " [ ENTER 开始 ] ",
            Style::default().fg(Color::Black).bg(theme.title).bold(),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " [Q] 退出 ",
            Style::default().fg(theme.wrong),
        )),
    ];

    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );

    // Startup animation: slide in from bottom, ease-out cubic.
    let elapsed = now.duration_since(animation_start).as_millis() as u32;
    let t = (elapsed as f32 / 500.0).min(1.0);
    let offset_t = 1.0 - (1.0 - t).powi(3);
    let mut anim_popup = popup;
    anim_popup.y += ((1.0 - offset_t) * 10.0) as u16;

    p.render(anim_popup, frame.buffer_mut());
}

fn draw_game(
    frame: &mut Frame,
    round: &Round,
    theme: &Theme,
    area: Rect,
    cursor: usize,
    selected: usize,
    restore_pending: bool,
    last_spoken: Option<&str>,
) {
    let board = board_rect(area, round);
    let cursor_pos = round.blanks().get(cursor).copied();

    let mut lines: Vec<Line> = Vec::with_capacity(BOARD_INNER_H as usize);
    for (li, poem_line) in round.lines().iter().enumerate() {
        let mut spans = Vec::with_capacity(poem_line.len());
        for col in 0..poem_line.len() {
            let pos = crate::game::BlankPos::new(li, col);
            let under_cursor = cursor_pos == Some(pos);
            let span = match round.slot_at(pos) {
                None => Span::styled(
                    format!("{}  ", poem_line.char_at(col)),
                    Style::default().fg(theme.main_fg),
                ),
                Some(Slot::Empty) => {
                    let style = if under_cursor {
                        Style::default().fg(Color::Black).bg(theme.cursor).bold()
                    } else {
                        Style::default().fg(theme.blank)
                    };
                    Span::styled(format!("{BLANK_GLYPH}  "), style)
                }
                Some(Slot::Filled { ch, matches }) => {
                    let fg = if restore_pending && !matches {
                        theme.wrong
                    } else {
                        theme.filled
                    };
                    let style = if under_cursor {
                        Style::default().fg(Color::Black).bg(theme.cursor)
                    } else {
                        Style::default().fg(fg).bold()
                    };
                    Span::styled(format!("{ch}  "), style)
                }
            };
            spans.push(span);
        }
        lines.push(Line::from(spans));
        lines.push(Line::from(""));
    }

    // Candidate tray: consumed candidates collapse to a dim dot.
    let mut tray = Vec::with_capacity(round.candidates().len());
    for (i, candidate) in round.candidates().iter().enumerate() {
        let span = if !candidate.is_available() {
            Span::styled("·   ", Style::default().fg(theme.blank))
        } else if i == selected {
            Span::styled(
                format!("{}  ", candidate.ch),
                Style::default().fg(Color::Black).bg(theme.candidate).bold(),
            )
        } else {
            Span::styled(
                format!("{}  ", candidate.ch),
                Style::default().fg(theme.candidate),
            )
        };
        tray.push(span);
    }
    lines.push(Line::from(tray));
    lines.push(Line::from(""));

    let status = if restore_pending {
        Line::from(Span::styled(
            "不对，再试一次…",
            Style::default().fg(theme.wrong).bold(),
        ))
    } else if let Some(spoken) = last_spoken {
        Line::from(vec![
            Span::styled("读音 ", Style::default().fg(theme.div_line)),
            Span::styled(spoken.to_string(), Style::default().fg(theme.title).bold()),
        ])
    } else {
        Line::from("")
    };
    lines.push(status);
    lines.push(Line::from(Span::styled(
        "←→ 空格  ↑↓ 选字  ⏎ 放  U 悔  S 读  R 换  Q 退",
        Style::default().fg(theme.div_line),
    )));

    let p = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(" 补全诗句 ", Style::default().fg(theme.title)))
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(board, frame.buffer_mut());
}

fn draw_solved_popup(frame: &mut Frame, round: &Round, theme: &Theme, area: Rect) {
    let popup_w = 34u16;
    let popup_h = 9u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " 答对了！ ",
            Style::default().fg(Color::Black).bg(theme.filled).bold(),
        )),
        Line::from(""),
        Line::from(Span::styled(
            round.lines()[0].text().to_string(),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            round.lines()[1].text().to_string(),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " R 再来一局   Q 菜单 ",
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

/// Create or update the wrong-answer flash (TachyonFX: fade the mismatched
/// cells from the error colour to the background over the retry delay).
fn apply_wrong_flash(
    frame: &mut Frame,
    round: &Round,
    theme: &Theme,
    area: Rect,
    retry_delay_ms: u64,
    wrong_effect: &mut Option<Effect>,
    wrong_effect_time: &mut Option<Instant>,
    now: Instant,
) {
    let board = board_rect(area, round);
    let delta = wrong_effect_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let tfx_delta = TfxDuration::from_millis(delta.as_millis().min(u128::from(u32::MAX)) as u32);
    *wrong_effect_time = Some(now);

    if wrong_effect.is_none() {
        let mut wrong_cells: HashSet<(u16, u16)> = HashSet::new();
        for &pos in round.blanks() {
            if let Some(Slot::Filled { matches: false, .. }) = round.slot_at(pos) {
                let (x0, y0) = cell_origin(board, pos.line, pos.col);
                for dx in 0..GLYPH_W {
                    wrong_cells.insert((x0 + dx, y0));
                }
            }
        }
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            wrong_cells.contains(&(pos.x, pos.y))
        }));
        let fade_ms = retry_delay_ms.min(u64::from(u32::MAX)) as u32;
        let effect = fx::fade_to(theme.wrong, theme.bg, (fade_ms, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board);
        *wrong_effect = Some(effect);
    }

    if let Some(effect) = wrong_effect {
        frame.render_effect(effect, board, tfx_delta);
    }
}
