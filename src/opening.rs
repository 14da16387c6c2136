//! Fixed early-game economy: energy buildings on the rear column of quiet rows.

use common::{bits::*, params::SearchParams};

use crate::{
    action::{Action, Building},
    state::{Board, ENERGY_COST},
};

/// The book move for player A, or `None` to leave the turn to the search.
pub fn opening_action(board: &Board, turn: u32, params: &SearchParams) -> Option<Action> {
    if turn >= params.opening_turns {
        return None;
    }

    let me = &board.a;
    if me.energy < ENERGY_COST {
        return Some(Action::None);
    }

    let occupied = me.occupied();
    let threats = board.b.attack() | board.b.attack_queue;

    (0..SIZE)
        .find(|&row| {
            occupied & bit(position(row, 0)) == 0 && threats & ROW << (row * SIZE) == 0
        })
        .map(|row| Action::Build(Building::Energy, position(row, 0)))
}
