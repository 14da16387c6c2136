use common::{bits::*, pair::Pair};

pub const START_ENERGY: u32 = 20;
pub const START_HEALTH: u16 = 100;

pub const DEFENCE_COST: u32 = 30;
pub const ATTACK_COST: u32 = 30;
pub const ENERGY_COST: u32 = 20;
pub const TURRET_COST: u32 = 100;
pub const SHIELD_COST: u32 = 100;
pub const TURRET_SHOT_COST: u32 = 100;

pub const BASE_INCOME: u32 = 5;
pub const ENERGY_BUILDING_INCOME: u32 = 3;

pub const MISSILE_DAMAGE: u16 = 5;
pub const TURRET_DAMAGE: u16 = 20;
pub const TURRET_RANGE: u8 = 9;
pub const TURRET_BUILD_TIME: i8 = 10;
pub const TURRET_COOLDOWN: u8 = 10;

pub const SHIELD_DURATION: u8 = 6;
pub const SHIELD_PERIOD: u32 = 30;

pub const ATTACK_PHASES: usize = 4;
pub const DEFENCE_PHASES: usize = 3;
pub const DEFENCE_TIERS: usize = 4;
pub const MAX_TURRETS: usize = 2;

/// Both halves of the board; `a` is the side the engine plays for.
pub type Board = Pair<PlayerState>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Turret {
    /// Ticks left before the turret is built; negative once built. A turret placed on turn `t`
    /// fires from turn `t + TURRET_BUILD_TIME` at the earliest.
    pub construction_left: i8,
    pub cooldown: u8,
    pub position: u8,
}

impl Turret {
    pub fn new(position: u8) -> Self {
        Self {
            construction_left: TURRET_BUILD_TIME - 1,
            cooldown: 0,
            position,
        }
    }

    #[inline]
    pub fn is_built(self) -> bool {
        self.construction_left < 0
    }

    #[inline]
    pub fn is_ready(self) -> bool {
        self.is_built() && self.cooldown == 0
    }
}

/// A turret packed into one word: position in bits 0..6, construction counter in 8..16,
/// cooldown in 16..24, occupancy flag in bit 24.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TurretSlot(u32);

impl TurretSlot {
    pub const EMPTY: Self = Self(0);
    const OCCUPIED: u32 = 1 << 24;

    #[inline]
    pub fn pack(turret: Turret) -> Self {
        debug_assert!(turret.position < 64);
        Self(
            turret.position as u32
                | (turret.construction_left as u8 as u32) << 8
                | (turret.cooldown as u32) << 16
                | Self::OCCUPIED,
        )
    }

    #[inline]
    pub fn unpack(self) -> Option<Turret> {
        (self.0 & Self::OCCUPIED != 0).then(|| Turret {
            construction_left: (self.0 >> 8) as u8 as i8,
            cooldown: (self.0 >> 16) as u8,
            position: self.0 as u8 & 0x3F,
        })
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }

    #[inline]
    pub fn mask(self) -> u64 {
        self.unpack().map_or(0, |t| bit(t.position))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerState {
    pub energy_buildings: u64,
    /// Built attack buildings, by the turn (mod 4) on which they fire.
    pub attack_buildings: [u64; ATTACK_PHASES],
    /// Remaining hits on each defence building; a fresh wall sits in every tier.
    pub defence_buildings: [u64; DEFENCE_TIERS],
    pub attack_queue: u64,
    pub energy_queue: u64,
    /// Walls under construction, by the turn (mod 3) on which they complete.
    pub defence_queue: [u64; DEFENCE_PHASES],
    /// Own missiles still travelling through this half.
    pub missiles: [u64; ATTACK_PHASES],
    /// Opponent missiles travelling through this half.
    pub incoming: [u64; ATTACK_PHASES],
    pub turrets: [TurretSlot; MAX_TURRETS],
    pub energy: u32,
    pub health: u16,
    pub shield_turns: u8,
    pub shield_available: bool,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            energy_buildings: 0,
            attack_buildings: [0; ATTACK_PHASES],
            defence_buildings: [0; DEFENCE_TIERS],
            attack_queue: 0,
            energy_queue: 0,
            defence_queue: [0; DEFENCE_PHASES],
            missiles: [0; ATTACK_PHASES],
            incoming: [0; ATTACK_PHASES],
            turrets: [TurretSlot::EMPTY; MAX_TURRETS],
            energy: START_ENERGY,
            health: START_HEALTH,
            shield_turns: 0,
            shield_available: false,
        }
    }
}

impl PlayerState {
    #[inline]
    pub fn attack(&self) -> u64 {
        self.attack_buildings.iter().fold(0, |acc, m| acc | m)
    }

    #[inline]
    pub fn defence(&self) -> u64 {
        self.defence_buildings.iter().fold(0, |acc, m| acc | m)
    }

    #[inline]
    pub fn turret_mask(&self) -> u64 {
        self.turrets.iter().fold(0, |acc, t| acc | t.mask())
    }

    #[inline]
    pub fn built_turret_mask(&self) -> u64 {
        self.turrets
            .iter()
            .filter_map(|t| t.unpack())
            .filter(|t| t.is_built())
            .fold(0, |acc, t| acc | bit(t.position))
    }

    /// Cells holding a finished structure.
    #[inline]
    pub fn constructed(&self) -> u64 {
        self.energy_buildings | self.attack() | self.defence() | self.built_turret_mask()
    }

    /// Cells holding a finished structure or one under construction.
    #[inline]
    pub fn occupied(&self) -> u64 {
        self.constructed()
            | self.turret_mask()
            | self.attack_queue
            | self.energy_queue
            | self.defence_queue.iter().fold(0, |acc, m| acc | m)
    }

    #[inline]
    pub fn has_turret_slot(&self) -> bool {
        self.turrets.iter().any(|t| t.is_empty())
    }

    #[inline]
    pub fn is_shielded(&self) -> bool {
        self.shield_turns > 0
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        self.health == 0
    }

    #[inline]
    pub fn income(&self) -> u32 {
        BASE_INCOME + ENERGY_BUILDING_INCOME * popcount(self.energy_buildings)
    }

    #[inline]
    pub fn take_damage(&mut self, damage: u16) {
        self.health = self.health.saturating_sub(damage);
    }

    /// Stops missiles at the first structure in their cell. Each struck cell loses one
    /// structure (energy, then attack, then one defence tier, then turret) and the missile
    /// is spent. Returns the missiles that flew on.
    pub fn absorb(&mut self, missiles: u64) -> u64 {
        let mut m = missiles;

        let hit = m & self.energy_buildings;
        self.energy_buildings ^= hit;
        m ^= hit;

        let hit = m & self.attack();
        for phase in &mut self.attack_buildings {
            *phase &= !hit;
        }
        m ^= hit;

        for tier in &mut self.defence_buildings {
            let hit = m & *tier;
            *tier ^= hit;
            m ^= hit;
        }

        let hit = m & self.built_turret_mask();
        self.clear_turrets(hit);
        m ^ hit
    }

    /// Razes one whole structure on every cell of `mask`, walls included.
    pub fn demolish(&mut self, mask: u64) {
        let mut m = mask;

        let hit = m & self.energy_buildings;
        self.energy_buildings ^= hit;
        m ^= hit;

        let hit = m & self.attack();
        for phase in &mut self.attack_buildings {
            *phase &= !hit;
        }
        m ^= hit;

        let hit = m & self.defence();
        for tier in &mut self.defence_buildings {
            *tier &= !hit;
        }
        m ^= hit;

        self.clear_turrets(m);
    }

    fn clear_turrets(&mut self, mask: u64) {
        for slot in &mut self.turrets {
            if slot.mask() & mask != 0 {
                *slot = TurretSlot::EMPTY;
            }
        }
    }

    /// Heuristic material count used to separate equal-health games at the turn limit.
    pub fn score(&self) -> u32 {
        10 * (self.health > 10) as u32
            + popcount(self.defence())
            + 2 * popcount(self.energy_buildings)
            + 3 * popcount(self.attack())
    }
}
