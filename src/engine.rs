use std::{path::PathBuf, thread};

use anyhow::{anyhow, Result};
use bastion::{action::Action, bot, command::Command, error::BotError, snapshot::Snapshot};
use common::params::SearchParams;
use tokio::{
    io::{stdin, AsyncBufReadExt, BufReader},
    sync::mpsc::unbounded_channel,
};
use tracing::warn;

#[derive(Debug)]
struct Go {
    state: PathBuf,
    command: Option<PathBuf>,
}

fn answer(go: &Go, params: &SearchParams) -> Result<Action, BotError> {
    match &go.command {
        Some(command) => bot::respond(&go.state, command, params),
        None => {
            let snapshot = Snapshot::load(&go.state)?;
            Ok(bot::decide(&snapshot, params)?)
        }
    }
}

pub async fn run(params: SearchParams) -> Result<()> {
    let mut lines = BufReader::new(stdin()).lines();

    println!("id name bastion");
    println!("id version {}", env!("CARGO_PKG_VERSION"));

    let (tx, mut rx) = unbounded_channel::<Go>();
    let worker = thread::Builder::new()
        .name("engine".into())
        .spawn(move || {
            while let Some(go) = rx.blocking_recv() {
                match answer(&go, &params) {
                    Ok(Action::None) => println!("bestmove none"),
                    Ok(action) => println!("bestmove {}", Command(action)),
                    Err(e) => {
                        warn!(state = %go.state.display(), error = %e, "go failed");
                        println!("bestmove none");
                    }
                }
            }
        })?;

    while let Some(line) = lines.next_line().await? {
        let mut cmd = line.split_ascii_whitespace();
        match cmd.next() {
            Some("isready") => println!("readyok"),
            Some("go") => {
                let Some(state) = cmd.next() else {
                    warn!("go without a state path");
                    continue;
                };
                tx.send(Go {
                    state: state.into(),
                    command: cmd.next().map(PathBuf::from),
                })?;
            }
            Some("quit") => break,
            Some(other) => warn!(command = other, "unsupported command"),
            None => {}
        }
    }

    drop(tx);
    worker
        .join()
        .map_err(|_| anyhow!("engine worker panicked"))?;
    Ok(())
}
