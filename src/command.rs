//! The one-line move format read back by the game runner.

use core::fmt;
use std::{fs, path::Path};

use common::bits::row_col;

use crate::{action::Action, error::BotError};

/// Displays as `x,y,type`, or as an empty line when doing nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command(pub Action);

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            Action::None => Ok(()),
            Action::Build(building, position) => {
                let (row, col) = row_col(position);
                write!(f, "{col},{row},{}", building.kind() - 1)
            }
            // The runner accepts the iron curtain on any cell.
            Action::Shield => write!(f, "0,0,5"),
        }
    }
}

pub fn write_command(path: impl AsRef<Path>, action: Action) -> Result<(), BotError> {
    let path = path.as_ref();
    fs::write(path, format!("{}\n", Command(action))).map_err(|source| BotError::Command {
        path: path.to_path_buf(),
        source,
    })
}
