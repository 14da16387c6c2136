use std::{fs, path::Path, str::FromStr};

use common::{
    bits::*,
    pair::{A, B},
};
use serde::Deserialize;

use crate::{
    error::SnapshotError,
    state::*,
};

const DEFAULT_MAX_ROUNDS: u32 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub board: Board,
    pub turn: u32,
    pub max_turn: u32,
}

impl Snapshot {
    pub fn start(max_turn: u32) -> Self {
        Self {
            board: Board::default(),
            turn: 0,
            max_turn,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse()
    }
}

impl FromStr for Snapshot {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: RawState = serde_json::from_str(s)?;
        raw.into_snapshot()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawState {
    game_details: RawDetails,
    players: Vec<RawPlayer>,
    #[serde(default)]
    game_map: Vec<Vec<RawCell>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDetails {
    round: u32,
    #[serde(default = "default_max_rounds")]
    max_rounds: u32,
}

fn default_max_rounds() -> u32 {
    DEFAULT_MAX_ROUNDS
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlayer {
    player_type: char,
    energy: i64,
    health: i64,
    #[serde(default)]
    iron_curtain_available: bool,
    #[serde(default)]
    active_iron_curtain_lifetime: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCell {
    x: i64,
    y: i64,
    #[serde(default)]
    buildings: Vec<RawBuilding>,
    #[serde(default)]
    missiles: Vec<RawMissile>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum RawKind {
    Defense,
    Attack,
    Energy,
    Tesla,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBuilding {
    building_type: RawKind,
    health: i64,
    construction_time_left: i64,
    #[serde(default)]
    weapon_cooldown_time_left: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMissile {
    player_type: char,
}

fn tag(side: bool) -> char {
    match side {
        A => 'A',
        B => 'B',
    }
}

fn side_of(tag: char) -> Result<bool, SnapshotError> {
    match tag {
        'A' => Ok(A),
        'B' => Ok(B),
        _ => Err(SnapshotError::UnknownPlayer(tag)),
    }
}

impl RawState {
    fn into_snapshot(self) -> Result<Snapshot, SnapshotError> {
        let turn = self.game_details.round;
        let mut board = Board::default();

        for side in [A, B] {
            let raw = self
                .players
                .iter()
                .find(|p| p.player_type == tag(side))
                .ok_or(SnapshotError::MissingPlayer(tag(side)))?;

            board[side] = PlayerState {
                energy: raw.energy.clamp(0, u32::MAX as i64) as u32,
                health: raw.health.clamp(0, u16::MAX as i64) as u16,
                shield_available: raw.iron_curtain_available,
                shield_turns: raw.active_iron_curtain_lifetime.clamp(0, u8::MAX as i64) as u8,
                ..PlayerState::default()
            };
        }

        for cell in self.game_map.iter().flatten() {
            if !(0..2 * SIZE as i64).contains(&cell.x) || !(0..SIZE as i64).contains(&cell.y) {
                return Err(SnapshotError::OutOfBounds {
                    x: cell.x,
                    y: cell.y,
                });
            }

            let (x, y) = (cell.x as u8, cell.y as u8);
            let half = x >= SIZE;
            let at = position(y, x);

            for building in &cell.buildings {
                place(&mut board[half], building, at, turn)
                    .ok_or(SnapshotError::TooManyTurrets(tag(half)))?;
            }

            for (i, missile) in cell.missiles.iter().enumerate() {
                let owner = side_of(missile.player_type)?;
                let phase = i % ATTACK_PHASES;
                if owner == half {
                    board[owner].missiles[phase] |= bit(at);
                } else {
                    board[half].incoming[phase] |= bit(at);
                }
            }
        }

        Ok(Snapshot {
            board,
            turn,
            max_turn: self.game_details.max_rounds,
        })
    }
}

/// Adds one building to its owner's bitboards. `None` if a tesla finds no free turret slot.
fn place(p: &mut PlayerState, building: &RawBuilding, at: u8, turn: u32) -> Option<()> {
    let m = bit(at);
    let left = building.construction_time_left;
    let queued = left >= 0;

    match building.building_type {
        RawKind::Energy if queued => p.energy_queue |= m,
        RawKind::Energy => p.energy_buildings |= m,
        RawKind::Attack if queued => p.attack_queue |= m,
        RawKind::Attack => {
            let cooldown = building.weapon_cooldown_time_left.max(0) as usize;
            p.attack_buildings[(turn as usize + cooldown) % ATTACK_PHASES] |= m;
        }
        RawKind::Defense if queued => {
            p.defence_queue[(turn as usize + left.min(2) as usize) % DEFENCE_PHASES] |= m;
        }
        RawKind::Defense => {
            let tiers = ((building.health.max(1) + 4) / 5).min(DEFENCE_TIERS as i64) as usize;
            for tier in &mut p.defence_buildings[DEFENCE_TIERS - tiers..] {
                *tier |= m;
            }
        }
        RawKind::Tesla => {
            let slot = p.turrets.iter_mut().find(|s| s.is_empty())?;
            *slot = TurretSlot::pack(Turret {
                construction_left: left.clamp(-1, i8::MAX as i64) as i8,
                cooldown: building.weapon_cooldown_time_left.clamp(0, u8::MAX as i64) as u8,
                position: at,
            });
        }
    }

    Some(())
}
