use std::path::Path;

use common::params::SearchParams;
use tracing::{info, warn};

use crate::{
    action::Action,
    command::{write_command, Command},
    error::{BotError, SearchError},
    opening::opening_action,
    parallel,
    snapshot::Snapshot,
};

/// Picks player A's move: the opening book while it applies, a timed search otherwise.
pub fn decide(snapshot: &Snapshot, params: &SearchParams) -> Result<Action, SearchError> {
    let Snapshot {
        ref board,
        turn,
        max_turn,
    } = *snapshot;

    if let Some(action) = opening_action(board, turn, params) {
        info!(turn, %action, "opening book");
        return Ok(action);
    }

    let decision = parallel::search(board, turn, max_turn.min(params.max_turn), params)?;
    Ok(decision.action)
}

/// Reads `state_path`, decides and writes the move to `command_path`. Nothing is written
/// when the state cannot be read.
pub fn respond(
    state_path: impl AsRef<Path>,
    command_path: impl AsRef<Path>,
    params: &SearchParams,
) -> Result<Action, BotError> {
    let snapshot = Snapshot::load(state_path.as_ref()).map_err(|e| {
        warn!(path = %state_path.as_ref().display(), error = %e, "unreadable state");
        e
    })?;

    let action = decide(&snapshot, params)?;
    write_command(command_path.as_ref(), action)?;
    info!(turn = snapshot.turn, command = %Command(action), "move written");
    Ok(action)
}
