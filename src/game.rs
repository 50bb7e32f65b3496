//! Round state: blank layout, fill tracking, undo, evaluation, snapshot restore.

use crate::GameConfig;
use crate::corpus::{Corpus, PoemLine};
use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

/// Lines per round. Always two consecutive lines of one section.
pub const LINES_PER_ROUND: usize = 2;

#[derive(Debug, Error)]
pub enum RoundError {
    #[error("cannot blank {requested} positions out of {available}")]
    TooManyBlanks { requested: usize, available: usize },
    #[error("line length must be at least 1")]
    ZeroLineLen,
}

/// Position of a blank on the 2×L grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlankPos {
    pub line: usize,
    pub col: usize,
}

impl BlankPos {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// Index into the round's shuffled candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateId(pub usize);

/// A displaced character offered for placement. Carries the full text of the
/// line it came from so pronunciation lookup has its context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub ch: char,
    pub source_text: String,
    consumed: bool,
}

impl Candidate {
    pub fn is_available(&self) -> bool {
        !self.consumed
    }
}

/// Per-blank assignment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Empty,
    Filled { ch: char, matches: bool },
}

/// Result of a fill attempt. Blocked covers: blank already filled, candidate
/// already consumed, round already solved, or position not a blank at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    Placed { matches: bool },
    Blocked,
}

/// Evaluator verdict after any number of fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Incomplete,
    Correct,
    Incorrect,
}

/// Fully-blanked state captured right after generation; restored after an
/// incorrect submission so the same layout can be retried.
#[derive(Debug, Clone)]
struct Snapshot {
    slots: Vec<Slot>,
    available: Vec<bool>,
}

/// One playable two-line puzzle. Created by [`Round::generate`], mutated by
/// fill/undo, reverted by [`Round::restore`], discarded on explicit restart.
#[derive(Debug, Clone)]
pub struct Round {
    lines: [PoemLine; LINES_PER_ROUND],
    blanks: Vec<BlankPos>,
    /// Parallel to `blanks`.
    slots: Vec<Slot>,
    candidates: Vec<Candidate>,
    /// Most recent fill, if still reversible. Undo depth is exactly 1: a new
    /// fill overwrites this, committing the previous one.
    last_action: Option<(usize, CandidateId)>,
    snapshot: Snapshot,
    solved: bool,
}

impl Round {
    /// Start a round: pick a section uniformly, pick two consecutive lines
    /// within it, blank `remove_count` grid positions (Fisher–Yates prefix),
    /// and shuffle the displaced characters into the candidate list.
    ///
    /// Fails fast on configuration errors; never fails on a valid config
    /// because the corpus guarantees at least one section of ≥ 2 lines.
    pub fn generate<R: Rng>(
        corpus: &Corpus,
        config: &GameConfig,
        rng: &mut R,
    ) -> Result<Self, RoundError> {
        if config.line_len == 0 {
            return Err(RoundError::ZeroLineLen);
        }
        let available = LINES_PER_ROUND * config.line_len;
        if config.remove_count > available {
            return Err(RoundError::TooManyBlanks {
                requested: config.remove_count,
                available,
            });
        }

        let sections = corpus.sections();
        let section = &sections[rng.gen_range(0..sections.len())];
        let start = rng.gen_range(0..=section.len() - LINES_PER_ROUND);
        let lines = [
            section.lines()[start].clone(),
            section.lines()[start + 1].clone(),
        ];

        let mut grid: Vec<BlankPos> = (0..LINES_PER_ROUND)
            .flat_map(|line| (0..config.line_len).map(move |col| BlankPos::new(line, col)))
            .collect();
        grid.shuffle(rng);
        let mut blanks: Vec<BlankPos> = grid[..config.remove_count].to_vec();
        // Reading order for display; candidate order is shuffled separately
        // so the tray never betrays the blank order.
        blanks.sort_unstable();

        let mut candidates: Vec<Candidate> = blanks
            .iter()
            .map(|pos| Candidate {
                ch: lines[pos.line].char_at(pos.col),
                source_text: lines[pos.line].text().to_string(),
                consumed: false,
            })
            .collect();
        candidates.shuffle(rng);

        let slots = vec![Slot::Empty; blanks.len()];
        let snapshot = Snapshot {
            slots: slots.clone(),
            available: vec![true; candidates.len()],
        };
        Ok(Self {
            lines,
            blanks,
            slots,
            candidates,
            last_action: None,
            snapshot,
            solved: false,
        })
    }

    pub fn lines(&self) -> &[PoemLine; LINES_PER_ROUND] {
        &self.lines
    }

    pub fn blanks(&self) -> &[BlankPos] {
        &self.blanks
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn candidate(&self, id: CandidateId) -> Option<&Candidate> {
        self.candidates.get(id.0)
    }

    /// Slot state for a grid position; None if the position is not a blank.
    pub fn slot_at(&self, pos: BlankPos) -> Option<Slot> {
        self.slot_index(pos).map(|i| self.slots[i])
    }

    /// True if the blank at `pos` already holds a character.
    pub fn is_locked(&self, pos: BlankPos) -> bool {
        matches!(self.slot_at(pos), Some(Slot::Filled { .. }))
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    /// The character that belongs at `pos`.
    pub fn original_char(&self, pos: BlankPos) -> char {
        self.lines[pos.line].char_at(pos.col)
    }

    fn slot_index(&self, pos: BlankPos) -> Option<usize> {
        self.blanks.iter().position(|&b| b == pos)
    }

    /// Place a candidate into a blank. First write wins: filling an occupied
    /// blank is a blocked no-op and never changes the existing assignment.
    pub fn fill(&mut self, pos: BlankPos, id: CandidateId) -> FillOutcome {
        if self.solved {
            return FillOutcome::Blocked;
        }
        let Some(slot) = self.slot_index(pos) else {
            return FillOutcome::Blocked;
        };
        if self.slots[slot] != Slot::Empty {
            return FillOutcome::Blocked;
        }
        let Some(candidate) = self.candidates.get_mut(id.0) else {
            return FillOutcome::Blocked;
        };
        if candidate.consumed {
            return FillOutcome::Blocked;
        }
        candidate.consumed = true;
        let ch = candidate.ch;
        let matches = ch == self.original_char(pos);
        self.slots[slot] = Slot::Filled { ch, matches };
        self.last_action = Some((slot, id));
        if self.evaluate() == Verdict::Correct {
            self.solved = true;
        }
        FillOutcome::Placed { matches }
    }

    /// Reverse the single most recent fill. Returns false when there is
    /// nothing pending; a second consecutive undo is always a no-op.
    pub fn undo(&mut self) -> bool {
        if self.solved {
            return false;
        }
        let Some((slot, id)) = self.last_action.take() else {
            return false;
        };
        self.slots[slot] = Slot::Empty;
        self.candidates[id.0].consumed = false;
        true
    }

    /// Pure read: Incomplete while any blank is empty, then Correct iff every
    /// filled character matches its original.
    pub fn evaluate(&self) -> Verdict {
        let mut all_match = true;
        for slot in &self.slots {
            match slot {
                Slot::Empty => return Verdict::Incomplete,
                Slot::Filled { matches, .. } => all_match &= matches,
            }
        }
        if all_match {
            Verdict::Correct
        } else {
            Verdict::Incorrect
        }
    }

    /// Revert to the post-generation snapshot: every blank empty, every
    /// candidate available, no pending undo. Same line pair, same layout.
    pub fn restore(&mut self) {
        self.slots = self.snapshot.slots.clone();
        for (candidate, &available) in self.candidates.iter_mut().zip(&self.snapshot.available) {
            candidate.consumed = !available;
        }
        self.last_action = None;
        self.solved = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn test_config() -> GameConfig {
        GameConfig {
            line_len: 5,
            remove_count: 4,
            retry_delay_ms: 1500,
        }
    }

    fn any_round(seed: u64) -> Round {
        let corpus = Corpus::builtin(5);
        let mut rng = StdRng::seed_from_u64(seed);
        Round::generate(&corpus, &test_config(), &mut rng).unwrap()
    }

    /// Round with the fixed layout from the scenario: lines 太阳哈哈笑 /
    /// 背上小书包, blanks (0,1) (0,3) (1,0) (1,4), candidates in blank order.
    fn scenario_round() -> Round {
        let lines = [
            PoemLine::new("太阳哈哈笑"),
            PoemLine::new("背上小书包"),
        ];
        let blanks = vec![
            BlankPos::new(0, 1),
            BlankPos::new(0, 3),
            BlankPos::new(1, 0),
            BlankPos::new(1, 4),
        ];
        let candidates: Vec<Candidate> = blanks
            .iter()
            .map(|pos| Candidate {
                ch: lines[pos.line].char_at(pos.col),
                source_text: lines[pos.line].text().to_string(),
                consumed: false,
            })
            .collect();
        let slots = vec![Slot::Empty; blanks.len()];
        let snapshot = Snapshot {
            slots: slots.clone(),
            available: vec![true; candidates.len()],
        };
        Round {
            lines,
            blanks,
            slots,
            candidates,
            last_action: None,
            snapshot,
            solved: false,
        }
    }

    /// CandidateId whose (available) candidate carries `ch`.
    fn candidate_for(round: &Round, ch: char) -> CandidateId {
        let idx = round
            .candidates()
            .iter()
            .position(|c| c.is_available() && c.ch == ch)
            .unwrap();
        CandidateId(idx)
    }

    #[test]
    fn generation_respects_blank_count_and_grid() {
        for seed in 0..50 {
            let round = any_round(seed);
            assert_eq!(round.blanks().len(), 4);
            let mut seen = round.blanks().to_vec();
            seen.dedup();
            assert_eq!(seen.len(), 4, "blanks must be distinct");
            for pos in round.blanks() {
                assert!(pos.line < 2);
                assert!(pos.col < 5);
            }
        }
    }

    #[test]
    fn candidates_match_blanked_characters() {
        for seed in 0..50 {
            let round = any_round(seed);
            let mut from_blanks: Vec<char> = round
                .blanks()
                .iter()
                .map(|&p| round.original_char(p))
                .collect();
            let mut from_candidates: Vec<char> =
                round.candidates().iter().map(|c| c.ch).collect();
            from_blanks.sort_unstable();
            from_candidates.sort_unstable();
            assert_eq!(from_blanks, from_candidates);
        }
    }

    #[test]
    fn candidate_carries_source_line_text() {
        let round = any_round(7);
        for candidate in round.candidates() {
            let in_round = round
                .lines()
                .iter()
                .any(|l| l.text() == candidate.source_text);
            assert!(in_round);
            assert!(candidate.source_text.chars().any(|c| c == candidate.ch));
        }
    }

    #[test]
    fn too_many_blanks_fails_fast() {
        let corpus = Corpus::builtin(5);
        let mut rng = StdRng::seed_from_u64(0);
        let config = GameConfig {
            line_len: 5,
            remove_count: 11,
            retry_delay_ms: 1500,
        };
        assert!(matches!(
            Round::generate(&corpus, &config, &mut rng),
            Err(RoundError::TooManyBlanks {
                requested: 11,
                available: 10
            })
        ));
    }

    #[test]
    fn zero_line_len_fails_fast() {
        let corpus = Corpus::builtin(5);
        let mut rng = StdRng::seed_from_u64(0);
        let config = GameConfig {
            line_len: 0,
            remove_count: 0,
            retry_delay_ms: 1500,
        };
        assert!(matches!(
            Round::generate(&corpus, &config, &mut rng),
            Err(RoundError::ZeroLineLen)
        ));
    }

    #[test]
    fn fill_marks_match() {
        let mut round = scenario_round();
        let id = candidate_for(&round, '阳');
        assert_eq!(
            round.fill(BlankPos::new(0, 1), id),
            FillOutcome::Placed { matches: true }
        );
        assert_eq!(
            round.slot_at(BlankPos::new(0, 1)),
            Some(Slot::Filled {
                ch: '阳',
                matches: true
            })
        );
        assert!(round.is_locked(BlankPos::new(0, 1)));
    }

    #[test]
    fn fill_on_occupied_blank_is_blocked() {
        let mut round = scenario_round();
        let first = candidate_for(&round, '阳');
        round.fill(BlankPos::new(0, 1), first);
        let second = candidate_for(&round, '哈');
        assert_eq!(round.fill(BlankPos::new(0, 1), second), FillOutcome::Blocked);
        // Existing assignment untouched, second candidate still available.
        assert_eq!(
            round.slot_at(BlankPos::new(0, 1)),
            Some(Slot::Filled {
                ch: '阳',
                matches: true
            })
        );
        assert!(round.candidate(second).unwrap().is_available());
    }

    #[test]
    fn fill_with_consumed_candidate_is_blocked() {
        let mut round = scenario_round();
        let id = candidate_for(&round, '阳');
        round.fill(BlankPos::new(0, 1), id);
        assert_eq!(round.fill(BlankPos::new(0, 3), id), FillOutcome::Blocked);
        assert_eq!(round.slot_at(BlankPos::new(0, 3)), Some(Slot::Empty));
    }

    #[test]
    fn fill_outside_blanks_is_blocked() {
        let mut round = scenario_round();
        let id = candidate_for(&round, '阳');
        assert_eq!(round.fill(BlankPos::new(0, 0), id), FillOutcome::Blocked);
        assert!(round.candidate(id).unwrap().is_available());
    }

    #[test]
    fn undo_reverses_latest_fill_once() {
        let mut round = scenario_round();
        let id = candidate_for(&round, '阳');
        round.fill(BlankPos::new(0, 1), id);
        assert!(round.undo());
        assert_eq!(round.slot_at(BlankPos::new(0, 1)), Some(Slot::Empty));
        assert!(round.candidate(id).unwrap().is_available());
        // Idempotent: second undo is a no-op.
        assert!(!round.undo());
        assert_eq!(round.slot_at(BlankPos::new(0, 1)), Some(Slot::Empty));
    }

    #[test]
    fn undo_depth_is_one() {
        let mut round = scenario_round();
        let a = candidate_for(&round, '阳');
        round.fill(BlankPos::new(0, 1), a);
        let b = candidate_for(&round, '哈');
        round.fill(BlankPos::new(0, 3), b);
        // Only the second fill is reversible; the first is committed.
        assert!(round.undo());
        assert_eq!(round.slot_at(BlankPos::new(0, 3)), Some(Slot::Empty));
        assert!(round.is_locked(BlankPos::new(0, 1)));
        assert!(!round.undo());
        assert!(round.is_locked(BlankPos::new(0, 1)));
    }

    #[test]
    fn correct_fills_in_any_order_yield_correct() {
        let orders: [[usize; 4]; 3] = [[0, 1, 2, 3], [3, 1, 0, 2], [2, 3, 1, 0]];
        for order in orders {
            let mut round = scenario_round();
            assert_eq!(round.evaluate(), Verdict::Incomplete);
            for i in order {
                let pos = round.blanks()[i];
                let id = candidate_for(&round, round.original_char(pos));
                assert_eq!(round.fill(pos, id), FillOutcome::Placed { matches: true });
            }
            assert_eq!(round.evaluate(), Verdict::Correct);
            assert!(round.is_solved());
        }
    }

    #[test]
    fn one_wrong_fill_yields_incorrect() {
        let mut round = scenario_round();
        // (1,0) gets '阳' where '背' belongs; then fill the rest with
        // whatever is left so every blank ends up occupied.
        let wrong = candidate_for(&round, '阳');
        assert_eq!(
            round.fill(BlankPos::new(1, 0), wrong),
            FillOutcome::Placed { matches: false }
        );
        for &pos in &[
            BlankPos::new(0, 1),
            BlankPos::new(0, 3),
            BlankPos::new(1, 4),
        ] {
            let id = round
                .candidates()
                .iter()
                .position(Candidate::is_available)
                .map(CandidateId)
                .unwrap();
            assert!(matches!(round.fill(pos, id), FillOutcome::Placed { .. }));
        }
        assert_eq!(round.evaluate(), Verdict::Incorrect);
        assert!(!round.is_solved());
    }

    #[test]
    fn restore_empties_all_blanks_and_frees_candidates() {
        let mut round = scenario_round();
        for &ch in &['包', '阳', '哈'] {
            let id = candidate_for(&round, ch);
            let pos = *round
                .blanks()
                .iter()
                .find(|&&p| !round.is_locked(p))
                .unwrap();
            round.fill(pos, id);
        }
        round.restore();
        for &pos in round.blanks() {
            assert_eq!(round.slot_at(pos), Some(Slot::Empty));
        }
        assert!(round.candidates().iter().all(Candidate::is_available));
        assert!(!round.undo(), "restore clears the pending action");
        assert_eq!(round.evaluate(), Verdict::Incomplete);
    }

    #[test]
    fn solved_round_rejects_fill_and_undo() {
        let mut round = scenario_round();
        for i in 0..4 {
            let pos = round.blanks()[i];
            let id = candidate_for(&round, round.original_char(pos));
            round.fill(pos, id);
        }
        assert!(round.is_solved());
        assert!(!round.undo());
        let pos = round.blanks()[0];
        assert_eq!(round.fill(pos, CandidateId(0)), FillOutcome::Blocked);
    }

    #[test]
    fn generated_lines_are_consecutive_in_one_section() {
        let corpus = Corpus::builtin(5);
        for seed in 0..50 {
            let round = any_round(seed);
            let [a, b] = round.lines();
            let adjacent = corpus.sections().iter().any(|s| {
                s.lines()
                    .windows(2)
                    .any(|w| w[0].text() == a.text() && w[1].text() == b.text())
            });
            assert!(adjacent, "lines {} / {} not adjacent", a.text(), b.text());
        }
    }
}
