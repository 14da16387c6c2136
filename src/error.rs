use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("unknown action kind {kind} in {raw:#x}")]
    UnknownKind { raw: u16, kind: u16 },
    #[error("action {0:#x} does not fit in nine bits")]
    OutOfRange(u16),
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("could not read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed state")]
    Parse(#[from] serde_json::Error),
    #[error("no player of type {0}")]
    MissingPlayer(char),
    #[error("unknown player type {0}")]
    UnknownPlayer(char),
    #[error("cell ({x}, {y}) lies outside the map")]
    OutOfBounds { x: i64, y: i64 },
    #[error("player {0} has more than two tesla towers")]
    TooManyTurrets(char),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("no search threads configured")]
    NoThreads,
    #[error("failed to spawn search worker")]
    Spawn(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error("could not write command to {}", .path.display())]
    Command {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
