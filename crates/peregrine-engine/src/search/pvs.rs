//! The alpha-beta tree: principal-variation search, the null-window
//! scout, and quiescence.
//!
//! All three routines mutate the engine descriptor in place and share
//! its board, PV buffer, and node counter. Scores are fail-soft: a
//! routine may return a value outside its window.

use peregrine_core::MoveList;

use crate::search::ordering;
use crate::search::tt::tt_write;
use crate::search::{DRAW_SCORE, Engine, MATE_SCORE};

/// Sentinel carried up the recursion when the abort token has fired.
///
/// Every frame undoes its move before propagating, so by the time the
/// root driver sees this the board is back in the root position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Aborted;

pub(crate) type SearchResult = Result<i32, Aborted>;

/// One ply less, extended by one when in check, never below zero.
#[inline]
fn next_depth(depth: u32, check: bool, reduction: u32) -> u32 {
    (depth + check as u32).saturating_sub(1 + reduction)
}

impl Engine {
    /// Full-window search maintaining the principal variation in
    /// `self.pv` from `pv_index` on.
    ///
    /// The first move is searched with the open window; the remaining
    /// moves are probed with the scout and re-searched on fail-high,
    /// splicing the new line into the PV when the re-search confirms.
    pub(crate) fn pv_search(
        &mut self,
        depth: u32,
        alpha: i32,
        beta: i32,
        pv_index: usize,
    ) -> SearchResult {
        self.node_count += 1;
        if self.board.repetition() {
            return Ok(DRAW_SCORE);
        }
        let check = self.board.in_check();
        let mut move_filter = i32::MIN;
        let mut best_score = i32::MIN;

        if depth == 0 && !check {
            best_score = self.eval.evaluate(&self.board);
            if best_score >= beta {
                self.pv.truncate(pv_index);
                return Ok(tt_write(depth, alpha, beta, best_score));
            }
            // Quiesce within the PV search: only gainful moves below.
            move_filter = 0;
        }

        let mut list = MoveList::new();
        self.board.generate_moves(&mut list);
        ordering::filter_and_sort(&self.board, &mut list, move_filter);
        ordering::filter_legal_moves(&mut self.board, &mut list);

        // First move, open window.
        if !list.is_empty() {
            if pv_index < self.pv.len() {
                ordering::move_to_front(&mut list, self.pv[pv_index]); // follow the pv
            } else {
                self.pv.push(list[0]);
            }
            let first = list[0];
            self.board.make_move(first);
            let new_depth = next_depth(depth, check, 0);
            let new_alpha = alpha.max(best_score);
            let result = self.pv_search(new_depth, -beta, -new_alpha, pv_index + 1);
            self.board.undo_move();
            let score = -result?;
            if score > best_score {
                best_score = score;
            } else {
                self.pv.truncate(pv_index); // stand pat beats the tree
            }
        }

        // Remaining moves: scout with the null window, re-search on
        // fail-high.
        let reduction = 0; // hook for late-move reductions
        for i in 1..list.len() {
            if best_score >= beta {
                break;
            }
            let mv = list[i];
            self.board.make_move(mv);
            let result = self.search_sibling(mv, depth, check, alpha, beta, best_score, pv_index, reduction);
            self.board.undo_move();
            best_score = best_score.max(result?);
        }

        if best_score == i32::MIN {
            best_score = self.end_score(check);
        }

        Ok(tt_write(depth, alpha, beta, best_score))
    }

    /// Probe one sibling move (already made on the board) with the
    /// scout; on fail-high, re-search it with the open window and
    /// splice the confirmed line into the PV.
    #[allow(clippy::too_many_arguments)]
    fn search_sibling(
        &mut self,
        mv: peregrine_core::Move,
        depth: u32,
        check: bool,
        alpha: i32,
        beta: i32,
        best_score: i32,
        pv_index: usize,
        reduction: u32,
    ) -> SearchResult {
        let new_alpha = alpha.max(best_score);
        let new_depth = next_depth(depth, check, reduction);
        let mut score = -self.scout(new_depth, -new_alpha - 1)?;

        if score > best_score {
            let pv_len = self.pv.len();
            self.pv.push(mv);
            let research_depth = next_depth(depth, check, 0);
            score = -self.pv_search(research_depth, -beta, -new_alpha, pv_len + 1)?;
            if score > best_score {
                self.pv.splice_down(pv_index, pv_len);
            } else {
                self.pv.truncate(pv_len); // research failed
            }
        }
        Ok(score)
    }

    /// Null-window alpha-beta probe with window `[alpha, alpha + 1]`.
    ///
    /// This is the only routine that polls the abort token; PV search
    /// and quiescence inherit the abort through their recursion into it.
    pub(crate) fn scout(&mut self, depth: u32, alpha: i32) -> SearchResult {
        self.node_count += 1;
        if self.board.repetition() {
            return Ok(DRAW_SCORE);
        }
        if depth == 0 {
            return Ok(self.qsearch(alpha));
        }

        if self.abort.is_set() {
            return Err(Aborted);
        }

        let check = self.board.in_check();
        let mut best_score = i32::MIN;

        let mut list = MoveList::new();
        self.board.generate_moves(&mut list);
        ordering::filter_and_sort(&self.board, &mut list, i32::MIN);

        let reduction = 0;
        for i in 0..list.len() {
            if best_score > alpha {
                break;
            }
            self.board.make_move(list[i]);
            let result = if self.board.was_legal_move() {
                let new_depth = next_depth(depth, check, reduction);
                Some(self.scout(new_depth, -(alpha + 1)))
            } else {
                None
            };
            self.board.undo_move();
            if let Some(result) = result {
                best_score = best_score.max(-result?);
            }
        }

        if best_score == i32::MIN {
            best_score = self.end_score(check);
        }

        Ok(tt_write(depth, alpha, alpha + 1, best_score))
    }

    /// Resolve tactical noise below the horizon: captures and
    /// promotions only, all evasions when in check, stand pat otherwise.
    pub(crate) fn qsearch(&mut self, alpha: i32) -> i32 {
        let check = self.board.in_check();
        let mut best_score = if check {
            i32::MIN // stand pat is not an option while in check
        } else {
            self.eval.evaluate(&self.board)
        };

        if best_score > alpha {
            return tt_write(0, alpha, alpha + 1, best_score);
        }

        let mut list = MoveList::new();
        self.board.generate_moves(&mut list);
        let move_filter = if check { i32::MIN } else { 0 };
        ordering::filter_and_sort(&self.board, &mut list, move_filter);

        for i in 0..list.len() {
            if best_score > alpha {
                break;
            }
            self.board.make_move(list[i]);
            if self.board.was_legal_move() {
                self.node_count += 1;
                let score = -self.qsearch(-(alpha + 1));
                best_score = best_score.max(score);
            }
            self.board.undo_move();
        }

        if best_score == i32::MIN {
            best_score = self.end_score(check);
        }

        tt_write(0, alpha, alpha + 1, best_score)
    }

    /// Score for a node with no legal moves: checkmate scored by
    /// distance from the root, stalemate as a draw.
    pub(crate) fn end_score(&self, check: bool) -> i32 {
        if check {
            let root_distance = (self.board.ply_number() - self.root_ply) as i32;
            -MATE_SCORE + root_distance
        } else {
            DRAW_SCORE
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::search::Engine;
    use crate::search::pvs::next_depth;
    use peregrine_core::Board;

    #[test]
    fn next_depth_clamps_at_zero() {
        assert_eq!(next_depth(0, false, 0), 0);
        assert_eq!(next_depth(1, false, 0), 0);
        assert_eq!(next_depth(3, false, 0), 2);
        // Check extension keeps the depth alive.
        assert_eq!(next_depth(0, true, 0), 0);
        assert_eq!(next_depth(1, true, 0), 1);
        assert_eq!(next_depth(3, false, 2), 0);
    }

    #[test]
    fn qsearch_stands_pat_in_quiet_position() {
        let mut engine = Engine::new(Board::starting_position());
        let eval = engine.eval.evaluate(&engine.board);
        // With alpha below the static score, stand pat fails high.
        let score = engine.qsearch(eval - 1);
        assert_eq!(score, eval);
    }

    #[test]
    fn qsearch_resolves_hanging_queen() {
        // White to move, rook takes an undefended queen.
        let board: Board = "4k3/8/8/3q4/8/8/8/3R2K1 w - - 0 1".parse().unwrap();
        let mut engine = Engine::new(board);
        let stand_pat = engine.eval.evaluate(&engine.board);
        let score = engine.qsearch(stand_pat);
        assert!(score > stand_pat + 8_000, "qsearch should win the queen");
    }

    #[test]
    fn scout_restores_board_and_stays_sane() {
        let mut engine = Engine::new(Board::starting_position());
        let score = engine.scout(2, 0).unwrap();
        // A quiet opening position scores within a couple of pawns.
        assert!(score.abs() < 2_000, "score={score}");
        assert_eq!(engine.board, Board::starting_position());
    }

    #[test]
    fn scout_detects_mate() {
        // Black is checkmated in the corner.
        let board: Board = "7k/6Q1/5K2/8/8/8/8/8 b - - 0 1".parse().unwrap();
        let mut engine = Engine::new(board);
        let score = engine.scout(3, 0).unwrap();
        assert_eq!(score, -crate::search::MATE_SCORE);
    }
}
