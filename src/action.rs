use core::fmt;

use common::bits::*;

use crate::{error::ActionError, state::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Building {
    Defence = 1,
    Attack = 2,
    Energy = 3,
    Turret = 5,
}

impl Building {
    pub const fn cost(self) -> u32 {
        match self {
            Self::Defence => DEFENCE_COST,
            Self::Attack => ATTACK_COST,
            Self::Energy => ENERGY_COST,
            Self::Turret => TURRET_COST,
        }
    }

    pub const fn kind(self) -> u16 {
        self as u16
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Defence => "defence",
            Self::Attack => "attack",
            Self::Energy => "energy",
            Self::Turret => "turret",
        }
    }
}

pub const NONE_KIND: u16 = 0;
pub const SHIELD_KIND: u16 = 6;

/// One player's move for a turn. Encodes to nine bits: kind in bits 0..3, position in 3..9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Action {
    #[default]
    None,
    Build(Building, u8),
    Shield,
}

impl Action {
    pub fn encode(self) -> u16 {
        match self {
            Self::None => NONE_KIND,
            Self::Build(building, position) => building.kind() | (position as u16) << 3,
            Self::Shield => SHIELD_KIND,
        }
    }

    pub fn cost(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Build(building, _) => building.cost(),
            Self::Shield => SHIELD_COST,
        }
    }
}

impl TryFrom<u16> for Action {
    type Error = ActionError;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        if raw >> 9 != 0 {
            return Err(ActionError::OutOfRange(raw));
        }

        let position = (raw >> 3) as u8;
        let building = match raw & 7 {
            NONE_KIND => return Ok(Self::None),
            SHIELD_KIND => return Ok(Self::Shield),
            1 => Building::Defence,
            2 => Building::Attack,
            3 => Building::Energy,
            5 => Building::Turret,
            kind => return Err(ActionError::UnknownKind { raw, kind }),
        };

        Ok(Self::Build(building, position))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::None => f.write_str("none"),
            Self::Build(building, position) => {
                let (row, col) = row_col(position);
                write!(f, "{}@{row},{col}", building.name())
            }
            Self::Shield => f.write_str("shield"),
        }
    }
}

const NOTHING: &[Building] = &[];
const ENERGY_ONLY: &[Building] = &[Building::Energy];
const STANDARD: &[Building] = &[Building::Defence, Building::Attack, Building::Energy];
const FULL: &[Building] = &[
    Building::Defence,
    Building::Attack,
    Building::Energy,
    Building::Turret,
];

/// The legal actions of one player, indexed densely.
///
/// Index 0 is no action. Then comes one block of `available` indices per affordable building
/// kind, the `n`-th index of a block naming the `n`-th free cell counted from the most
/// significant bit. The shield, when offered, takes the last index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Menu {
    occupied: u64,
    available: u32,
    buildings: &'static [Building],
    shield: bool,
}

impl Menu {
    pub fn new(player: &PlayerState) -> Self {
        let occupied = player.occupied();
        let available = count_zeros(occupied);
        let energy = player.energy;

        let buildings = if available == 0 || energy < ENERGY_COST {
            NOTHING
        } else if energy < DEFENCE_COST.min(ATTACK_COST) {
            ENERGY_ONLY
        } else if energy < TURRET_COST || !player.has_turret_slot() {
            STANDARD
        } else {
            FULL
        };

        let shield =
            energy >= SHIELD_COST && player.shield_available && !player.is_shielded();

        Self {
            occupied,
            available,
            buildings,
            shield,
        }
    }

    #[inline]
    pub fn len(&self) -> u16 {
        1 + (self.buildings.len() as u32 * self.available) as u16 + self.shield as u16
    }

    pub fn decode(&self, choice: u16) -> Action {
        assert!(choice < self.len(), "choice {choice} of {}", self.len());

        if choice == 0 {
            return Action::None;
        }

        let i = choice as u32 - 1;
        if i < self.buildings.len() as u32 * self.available {
            let building = self.buildings[(i / self.available) as usize];
            let position = select_free(self.occupied, i % self.available + 1);
            Action::Build(building, position)
        } else {
            Action::Shield
        }
    }

    /// Inverse of [`Menu::decode`]. `None` if the action is not on the menu.
    pub fn choice(&self, action: Action) -> Option<u16> {
        match action {
            Action::None => Some(0),
            Action::Build(building, position) => {
                let block = self.buildings.iter().position(|&b| b == building)? as u32;
                if position >= 64 || self.occupied >> position & 1 != 0 {
                    return None;
                }
                let n = rank_of(!self.occupied, position);
                Some((1 + block * self.available + n - 1) as u16)
            }
            Action::Shield => self.shield.then(|| self.len() - 1),
        }
    }
}

pub fn legal_action_count(player: &PlayerState) -> u16 {
    Menu::new(player).len()
}

/// Maps a dense index back to an action. Panics if `choice >= count`.
pub fn decode(choice: u16, player: &PlayerState, count: u16) -> Action {
    assert!(choice < count, "choice {choice} of {count}");
    let menu = Menu::new(player);
    debug_assert_eq!(menu.len(), count);
    menu.decode(choice)
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use rstest::rstest;

    fn random_player(rng: &mut ChaCha8Rng) -> PlayerState {
        let sparse = rng.gen::<u64>() & rng.gen::<u64>();
        let mut p = PlayerState {
            energy: rng.gen_range(0..300),
            energy_buildings: sparse & rng.gen::<u64>(),
            attack_queue: sparse & !0xFF & rng.gen::<u64>(),
            shield_available: rng.gen(),
            shield_turns: if rng.gen_bool(0.2) { 3 } else { 0 },
            ..Default::default()
        };
        p.attack_buildings[rng.gen_range(0..4)] = rng.gen::<u64>() & 0xFF00 & !p.occupied();
        if rng.gen_bool(0.3) {
            p.turrets[0] = TurretSlot::pack(Turret::new(select_free(p.occupied(), 1)));
        }
        p
    }

    #[rstest]
    #[case(Action::None, 0)]
    #[case(Action::Shield, 6)]
    #[case(Action::Build(Building::Attack, 0), 2)]
    #[case(Action::Build(Building::Turret, 63), 5 | 63 << 3)]
    #[case(Action::Build(Building::Energy, 12), 3 | 12 << 3)]
    fn raw_encoding(#[case] action: Action, #[case] raw: u16) {
        assert_eq!(action.encode(), raw);
        assert_eq!(Action::try_from(raw), Ok(action));
    }

    #[rstest]
    #[case(4)]
    #[case(7 | 5 << 3)]
    fn rejects_unknown_kinds(#[case] raw: u16) {
        assert!(matches!(
            Action::try_from(raw),
            Err(ActionError::UnknownKind { .. })
        ));
    }

    #[test]
    fn rejects_wide_values() {
        assert_eq!(Action::try_from(512), Err(ActionError::OutOfRange(512)));
    }

    #[rstest]
    #[case(0, 1)]
    #[case(19, 1)]
    #[case(20, 65)]
    #[case(29, 65)]
    #[case(30, 193)]
    #[case(99, 193)]
    #[case(100, 257)]
    fn counts_by_energy_tier(#[case] energy: u32, #[case] count: u16) {
        let p = PlayerState {
            energy,
            ..Default::default()
        };
        assert_eq!(legal_action_count(&p), count);
    }

    #[test]
    fn shield_takes_the_last_index() {
        let p = PlayerState {
            energy: 100,
            shield_available: true,
            ..Default::default()
        };
        let menu = Menu::new(&p);
        assert_eq!(menu.len(), 258);
        assert_eq!(menu.decode(257), Action::Shield);
        assert_eq!(menu.choice(Action::Shield), Some(257));

        let active = PlayerState {
            shield_turns: 2,
            ..p
        };
        assert_eq!(legal_action_count(&active), 257);
    }

    #[test]
    fn first_choice_is_the_top_free_cell() {
        let p = PlayerState {
            energy: 30,
            energy_buildings: bit(63),
            ..Default::default()
        };
        assert_eq!(decode(1, &p, 190), Action::Build(Building::Defence, 62));
        assert_eq!(decode(63, &p, 190), Action::Build(Building::Defence, 0));
        assert_eq!(decode(64, &p, 190), Action::Build(Building::Attack, 62));
        assert_eq!(decode(189, &p, 190), Action::Build(Building::Energy, 0));
    }

    #[test]
    fn decode_and_choice_agree() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..200 {
            let p = random_player(&mut rng);
            let menu = Menu::new(&p);
            let occupied = p.occupied();
            for c in 0..menu.len() {
                let action = menu.decode(c);
                if let Action::Build(building, position) = action {
                    assert_eq!(occupied >> position & 1, 0, "{action} on an occupied cell");
                    assert!(building.cost() <= p.energy);
                }
                assert_eq!(menu.choice(action), Some(c), "{action}");
            }
        }
    }

    #[test]
    fn count_grows_with_energy() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..100 {
            let mut p = random_player(&mut rng);
            let mut last = 0;
            for energy in 0..=120 {
                p.energy = energy;
                let count = legal_action_count(&p);
                assert!(count >= last);
                last = count;
            }
        }
    }

    #[test]
    fn full_board_offers_nothing_to_build() {
        let p = PlayerState {
            energy: 500,
            energy_buildings: !0,
            ..Default::default()
        };
        assert_eq!(legal_action_count(&p), 1);
        assert_eq!(Menu::new(&p).choice(Action::Build(Building::Energy, 3)), None);
    }

    #[test]
    #[should_panic]
    fn out_of_range_choice_panics() {
        let p = PlayerState::default();
        decode(65, &p, 65);
    }
}
