use common::{
    bits::*,
    pair::{Pair, A, B},
};

use crate::{action::*, state::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ongoing,
    Won(bool),
    Draw,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        self != Self::Ongoing
    }

    /// Result from player A's point of view.
    pub fn reward(self) -> f32 {
        match self {
            Self::Won(A) => 1.,
            Self::Won(B) => -1.,
            Self::Ongoing | Self::Draw => 0.,
        }
    }
}

/// Game status before `turn` is played. Games still running at `max_turn` are adjudicated
/// by health, then by material.
pub fn status(board: &Board, turn: u32, max_turn: u32) -> Status {
    match (board.a.is_dead(), board.b.is_dead()) {
        (true, true) => return Status::Draw,
        (true, false) => return Status::Won(B),
        (false, true) => return Status::Won(A),
        (false, false) => {}
    }

    if turn < max_turn {
        return Status::Ongoing;
    }

    let key = board.map(|p| (p.health, p.score()));
    match key.a.cmp(&key.b) {
        core::cmp::Ordering::Greater => Status::Won(A),
        core::cmp::Ordering::Less => Status::Won(B),
        core::cmp::Ordering::Equal => Status::Draw,
    }
}

/// Advances the board by one simultaneous turn.
///
/// Actions must be legal for their player; costs are subtracted unchecked.
pub fn advance_state(board: &mut Board, actions: Pair<Action>, turn: u32) {
    let attack_phase = turn as usize % ATTACK_PHASES;
    let defence_phase = turn as usize % DEFENCE_PHASES;

    board.map_mut(|p| {
        tick_turrets(p);
        complete_construction(p, attack_phase, defence_phase);
    });

    for side in [A, B] {
        apply_action(&mut board[side], actions[side], defence_phase);
    }

    board.map_mut(|p| p.missiles[attack_phase] |= p.attack_buildings[attack_phase]);

    let blasts = Pair::new(turret_blast(board, A), turret_blast(board, B));
    for side in [A, B] {
        let (_, opponent) = board.get_mut(side);
        opponent.demolish(blasts[side].0);
        opponent.take_damage(blasts[side].1);
    }

    for _ in 0..2 {
        for phase in 0..ATTACK_PHASES {
            for target in [B, A] {
                let (target, source) = board.get_mut(target);
                move_missiles(target, source, phase);
            }
        }
    }

    board.map_mut(|p| {
        p.energy = p.energy.saturating_add(p.income());
        p.shield_turns = p.shield_turns.saturating_sub(1);
        if (turn + 1) % SHIELD_PERIOD == 0 {
            p.shield_available = true;
        }
    });
}

fn tick_turrets(p: &mut PlayerState) {
    for slot in &mut p.turrets {
        if let Some(mut t) = slot.unpack() {
            if t.construction_left >= 0 {
                t.construction_left -= 1;
            } else if t.cooldown > 0 {
                t.cooldown -= 1;
            }
            *slot = TurretSlot::pack(t);
        }
    }
}

fn complete_construction(p: &mut PlayerState, attack_phase: usize, defence_phase: usize) {
    p.energy_buildings |= p.energy_queue;
    p.energy_queue = 0;

    p.attack_buildings[attack_phase] |= p.attack_queue;
    p.attack_queue = 0;

    let walls = p.defence_queue[defence_phase];
    for tier in &mut p.defence_buildings {
        *tier |= walls;
    }
    p.defence_queue[defence_phase] = 0;
}

fn apply_action(p: &mut PlayerState, action: Action, defence_phase: usize) {
    debug_assert!(action.cost() <= p.energy, "{action} with {} energy", p.energy);
    p.energy -= action.cost();

    match action {
        Action::None => {}
        Action::Build(building, position) => {
            debug_assert_eq!(p.occupied() & bit(position), 0, "{action} on occupied cell");
            let m = bit(position);
            match building {
                Building::Defence => p.defence_queue[defence_phase] |= m,
                Building::Attack => p.attack_queue |= m,
                Building::Energy => p.energy_queue |= m,
                Building::Turret => {
                    let slot = p.turrets.iter_mut().find(|s| s.is_empty());
                    debug_assert!(slot.is_some(), "{action} without a free turret slot");
                    if let Some(slot) = slot {
                        *slot = TurretSlot::pack(Turret::new(position));
                    }
                }
            }
        }
        Action::Shield => {
            debug_assert!(p.shield_available && !p.is_shielded());
            p.shield_turns = SHIELD_DURATION;
            p.shield_available = false;
        }
    }
}

/// Cells `side`'s turrets destroy this turn and the damage they deal, charging their owner.
fn turret_blast(board: &mut Board, side: bool) -> (u64, u16) {
    let (owner, opponent) = board.get_mut(side);
    if opponent.is_shielded() {
        return (0, 0);
    }

    let mut area = 0;
    let mut damage = 0;
    for slot in &mut owner.turrets {
        let Some(mut t) = slot.unpack() else {
            continue;
        };
        if !t.is_ready() || owner.energy < TURRET_SHOT_COST {
            continue;
        }

        owner.energy -= TURRET_SHOT_COST;
        t.cooldown = TURRET_COOLDOWN;
        *slot = TurretSlot::pack(t);

        let (area_here, damage_here) = turret_footprint(t.position);
        area |= area_here;
        damage += damage_here;
    }

    (area & opponent.constructed(), damage)
}

/// Opponent cells reached by a turret at `position`, and the damage it deals past the far edge.
pub fn turret_footprint(position: u8) -> (u64, u16) {
    let (row, col) = row_col(position);
    let reach = (col + TURRET_RANGE + 1).saturating_sub(SIZE);
    let width = reach.min(SIZE);
    let lane = ROW << (SIZE - width) & ROW;

    let mut area = 0;
    for r in row.saturating_sub(1)..=(row + 1).min(SIZE - 1) {
        area |= lane << (r * SIZE);
    }

    let damage = if col + TURRET_RANGE >= 2 * SIZE {
        TURRET_DAMAGE
    } else {
        0
    };
    (area, damage)
}

/// One half-step of one missile phase flying from `source` into `target`.
fn move_missiles(target: &mut PlayerState, source: &mut PlayerState, phase: usize) {
    let shielded = target.is_shielded();

    let mut incoming = target.incoming[phase];
    let breached = incoming & REAR;
    if !shielded {
        target.take_damage(MISSILE_DAMAGE * popcount(breached) as u16);
    }
    incoming = (incoming & !REAR) >> 1;

    let outgoing = source.missiles[phase];
    let crossing = outgoing & FRONT;
    source.missiles[phase] = (outgoing & !FRONT) << 1;
    if !shielded {
        incoming |= crossing;
    }

    target.incoming[phase] = target.absorb(incoming);
}
