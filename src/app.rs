//! App: terminal init, main loop, key handling, retry timer.

use crate::corpus::Corpus;
use crate::game::{BlankPos, CandidateId, FillOutcome, Round, Verdict};
use crate::input::{Action, key_to_action};
use crate::pronounce::{self, Speaker, StatusSpeaker};
use crate::theme::Theme;
use crate::{Args, GameConfig};
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use rand::SeedableRng;
use rand::rngs::StdRng;
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    Solved,
}

pub struct App {
    args: Args,
    config: GameConfig,
    theme: Theme,
    corpus: Corpus,
    rng: StdRng,
    round: Round,
    screen: Screen,
    /// Cursor over the round's blanks (index into `round.blanks()`).
    cursor: usize,
    /// Selected candidate (index into `round.candidates()`).
    selected: usize,
    /// Deadline for the snapshot restore after an Incorrect verdict.
    /// Canceled (set to None) when a new round starts during the delay.
    restore_at: Option<Instant>,
    /// TachyonFX flash on the mismatched fills (created when the verdict lands).
    wrong_effect: Option<Effect>,
    wrong_effect_time: Option<Instant>,
    speaker: StatusSpeaker,
    menu_animation_start: Instant,
}

impl App {
    pub fn new(args: Args, config: GameConfig, theme: Theme, corpus: Corpus) -> Result<Self> {
        let mut rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        // Configuration errors (too many blanks, zero line length) surface
        // here, before the terminal is taken over.
        let round = Round::generate(&corpus, &config, &mut rng)
            .context("invalid puzzle configuration")?;
        let screen = if args.no_menu {
            Screen::Playing
        } else {
            Screen::Menu
        };
        Ok(Self {
            args,
            config,
            theme,
            corpus,
            rng,
            round,
            screen,
            cursor: 0,
            selected: 0,
            restore_at: None,
            wrong_effect: None,
            wrong_effect_time: None,
            speaker: StatusSpeaker::default(),
            menu_animation_start: Instant::now(),
        })
    }

    /// Discard the current round wholesale and draw a fresh one. Cancels any
    /// pending restore so it cannot clobber the new round's state.
    fn new_round(&mut self) -> Result<()> {
        self.round = Round::generate(&self.corpus, &self.config, &mut self.rng)
            .context("invalid puzzle configuration")?;
        self.cursor = 0;
        self.selected = 0;
        self.restore_at = None;
        self.wrong_effect = None;
        self.wrong_effect_time = None;
        self.screen = Screen::Playing;
        Ok(())
    }

    fn cursor_pos(&self) -> BlankPos {
        self.round.blanks()[self.cursor]
    }

    /// Move `selected` onto an available candidate, scanning forward from its
    /// current position. No-op when every candidate is consumed.
    fn snap_selected_to_available(&mut self) {
        let n = self.round.candidates().len();
        for step in 0..n {
            let i = (self.selected + step) % n;
            if self.round.candidates()[i].is_available() {
                self.selected = i;
                return;
            }
        }
    }

    fn cycle_candidate(&mut self, forward: bool) {
        let n = self.round.candidates().len();
        for step in 1..=n {
            let i = if forward {
                (self.selected + step) % n
            } else {
                (self.selected + n - step) % n
            };
            if self.round.candidates()[i].is_available() {
                self.selected = i;
                return;
            }
        }
    }

    /// Move the blank cursor onto the next empty blank, if any.
    fn advance_cursor_to_empty(&mut self) {
        let n = self.round.blanks().len();
        for step in 1..=n {
            let i = (self.cursor + step) % n;
            if !self.round.is_locked(self.round.blanks()[i]) {
                self.cursor = i;
                return;
            }
        }
    }

    fn place_selected(&mut self) {
        if self.round.blanks().is_empty() {
            return;
        }
        let id = CandidateId(self.selected);
        let outcome = self.round.fill(self.cursor_pos(), id);
        if outcome == FillOutcome::Blocked {
            return;
        }
        match self.round.evaluate() {
            Verdict::Incomplete => {
                self.snap_selected_to_available();
                self.advance_cursor_to_empty();
            }
            Verdict::Correct => {
                self.screen = Screen::Solved;
            }
            Verdict::Incorrect => {
                // Leave the board visible for the delay, then revert to the
                // fully-blanked snapshot in run_loop.
                self.restore_at =
                    Some(Instant::now() + Duration::from_millis(self.config.retry_delay_ms));
                self.wrong_effect = None;
                self.wrong_effect_time = None;
            }
        }
    }

    fn speak_selected(&mut self) {
        if let Some(candidate) = self.round.candidate(CandidateId(self.selected)) {
            let spoken = pronounce::resolve(&candidate.source_text, candidate.ch);
            self.speaker.say(&spoken.to_string());
        }
    }

    fn handle_playing(&mut self, action: Action) -> Result<()> {
        // Input is frozen while the retry flash is showing; only an explicit
        // new round may interrupt (and thereby cancel) the pending restore.
        if self.restore_at.is_some() {
            if action == Action::NewRound {
                self.new_round()?;
            } else if action == Action::Quit {
                self.restore_at = None;
                self.wrong_effect = None;
                self.wrong_effect_time = None;
                self.round.restore();
                self.screen = Screen::Menu;
            }
            return Ok(());
        }
        match action {
            Action::CursorLeft => {
                let n = self.round.blanks().len();
                if n > 0 {
                    self.cursor = (self.cursor + n - 1) % n;
                }
            }
            Action::CursorRight => {
                let n = self.round.blanks().len();
                if n > 0 {
                    self.cursor = (self.cursor + 1) % n;
                }
            }
            Action::PrevCandidate => self.cycle_candidate(false),
            Action::NextCandidate => self.cycle_candidate(true),
            Action::Place => self.place_selected(),
            Action::Undo => {
                if self.round.undo() {
                    self.snap_selected_to_available();
                }
            }
            Action::Speak => self.speak_selected(),
            Action::NewRound => self.new_round()?,
            Action::Quit => self.screen = Screen::Menu,
            Action::None => {}
        }
        Ok(())
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    /// Apply the restore deadline if it has passed: revert to the snapshot
    /// and continue the same round. Called once per frame from `run_loop`.
    fn tick_restore(&mut self, now: Instant) {
        if let Some(at) = self.restore_at {
            if now >= at {
                self.round.restore();
                self.restore_at = None;
                self.wrong_effect = None;
                self.wrong_effect_time = None;
                self.cursor = 0;
                self.selected = 0;
            }
        }
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            self.tick_restore(now);

            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.round,
                    &self.theme,
                    self.cursor,
                    self.selected,
                    self.restore_at.is_some(),
                    self.config.retry_delay_ms,
                    self.speaker.last_utterance(),
                    self.menu_animation_start,
                    now,
                    self.args.no_animation,
                    &mut self.wrong_effect,
                    &mut self.wrong_effect_time,
                )
            })?;

            let timeout = Duration::from_millis(16);
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        let action = key_to_action(key);
                        match self.screen {
                            Screen::Menu => match action {
                                Action::Quit => return Ok(()),
                                Action::Place | Action::NewRound => self.new_round()?,
                                _ => {}
                            },
                            Screen::Playing => self.handle_playing(action)?,
                            Screen::Solved => match action {
                                Action::Quit => self.screen = Screen::Menu,
                                Action::Place | Action::NewRound => self.new_round()?,
                                _ => {}
                            },
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Slot;

    fn test_app(seed: u64) -> App {
        let args = Args {
            corpus: None,
            line_len: 5,
            blanks: 4,
            retry_delay_ms: 1500,
            theme: None,
            seed: Some(seed),
            no_menu: true,
            no_animation: true,
        };
        let config = GameConfig {
            line_len: 5,
            remove_count: 4,
            retry_delay_ms: 1500,
        };
        let corpus = Corpus::builtin(5);
        App::new(args, config, Theme::default(), corpus).unwrap()
    }

    /// App whose first blank has at least one mismatching candidate, so a
    /// wrong board can be forced deterministically.
    fn wrongable_app() -> App {
        for seed in 0..32 {
            let app = test_app(seed);
            let orig = app.round.original_char(app.round.blanks()[0]);
            if app.round.candidates().iter().any(|c| c.ch != orig) {
                return app;
            }
        }
        unreachable!("no seed produced a mismatchable layout");
    }

    /// Fill every blank, mismatching the first, until the incorrect verdict
    /// arms the restore deadline.
    fn fill_board_wrong(app: &mut App) {
        let orig = app.round.original_char(app.round.blanks()[0]);
        app.cursor = 0;
        app.selected = app
            .round
            .candidates()
            .iter()
            .position(|c| c.is_available() && c.ch != orig)
            .unwrap();
        app.place_selected();
        while app.round.evaluate() == Verdict::Incomplete {
            app.cursor = app
                .round
                .blanks()
                .iter()
                .position(|&p| !app.round.is_locked(p))
                .unwrap();
            app.selected = app
                .round
                .candidates()
                .iter()
                .position(|c| c.is_available())
                .unwrap();
            app.place_selected();
        }
        assert_eq!(app.round.evaluate(), Verdict::Incorrect);
        assert!(app.restore_at.is_some(), "incorrect verdict arms the delay");
    }

    #[test]
    fn new_round_cancels_pending_restore() {
        let mut app = wrongable_app();
        fill_board_wrong(&mut app);
        app.new_round().unwrap();
        assert!(app.restore_at.is_none());
        // The replacement round is fully blanked; no stale fills survive.
        assert_eq!(app.round.evaluate(), Verdict::Incomplete);
        for &pos in app.round.blanks() {
            assert_eq!(app.round.slot_at(pos), Some(Slot::Empty));
        }
        assert!(app.round.candidates().iter().all(|c| c.is_available()));
        assert_eq!(app.cursor, 0);
        assert_eq!(app.selected, 0);
        assert_eq!(app.screen, Screen::Playing);
        // The canceled deadline never fires, even long past its due time.
        app.tick_restore(Instant::now() + Duration::from_secs(60));
        assert_eq!(app.round.evaluate(), Verdict::Incomplete);
    }

    #[test]
    fn new_round_action_interrupts_delay() {
        let mut app = wrongable_app();
        fill_board_wrong(&mut app);
        app.handle_playing(Action::NewRound).unwrap();
        assert!(app.restore_at.is_none());
        assert_eq!(app.round.evaluate(), Verdict::Incomplete);
        assert_eq!(app.screen, Screen::Playing);
    }

    #[test]
    fn fill_and_undo_frozen_while_restore_pending() {
        let mut app = wrongable_app();
        fill_board_wrong(&mut app);
        let before: Vec<Option<Slot>> = app
            .round
            .blanks()
            .iter()
            .map(|&p| app.round.slot_at(p))
            .collect();
        // The last fill left a pending undo; the freeze must ignore it.
        app.handle_playing(Action::Undo).unwrap();
        app.handle_playing(Action::Place).unwrap();
        let after: Vec<Option<Slot>> = app
            .round
            .blanks()
            .iter()
            .map(|&p| app.round.slot_at(p))
            .collect();
        assert_eq!(before, after);
        assert!(app.restore_at.is_some());
        assert_eq!(app.round.evaluate(), Verdict::Incorrect);
    }

    #[test]
    fn restore_fires_after_deadline() {
        let mut app = wrongable_app();
        fill_board_wrong(&mut app);
        let at = app.restore_at.unwrap();
        // Just before the deadline: nothing happens.
        app.tick_restore(at - Duration::from_millis(1));
        assert!(app.restore_at.is_some());
        assert_eq!(app.round.evaluate(), Verdict::Incorrect);
        // At the deadline: same round, fully blanked again.
        app.tick_restore(at);
        assert!(app.restore_at.is_none());
        assert_eq!(app.round.evaluate(), Verdict::Incomplete);
        for &pos in app.round.blanks() {
            assert_eq!(app.round.slot_at(pos), Some(Slot::Empty));
        }
        assert!(app.round.candidates().iter().all(|c| c.is_available()));
    }
}
