//! Battle dice: faces, rolling, and deterministic valuation.
//!
//! Rolling is the only explicitly-modeled randomness in the engine; it is
//! performed by `RollDiceEffect` (a non-revertible "read" effect) against
//! the game RNG. Valuation of rolled faces is a pure function so retries
//! and tests can recompute values from recorded faces.

use rand::Rng;
use rand::rngs::StdRng;

/// One face of an attack die.
///
/// A hollow sword counts half a sword; the total is rounded down. A skull
/// counts two swords but costs the attacker one warband.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackFace {
    HollowSword,
    Sword,
    TwoSwords,
    Skull,
}

/// One face of a defense die. `DoubleAll` doubles the shield total once per
/// occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefenseFace {
    Blank,
    Shield,
    TwoShields,
    DoubleAll,
}

const ATTACK_DIE: [AttackFace; 6] = [
    AttackFace::HollowSword,
    AttackFace::HollowSword,
    AttackFace::HollowSword,
    AttackFace::Sword,
    AttackFace::TwoSwords,
    AttackFace::Skull,
];

const DEFENSE_DIE: [DefenseFace; 6] = [
    DefenseFace::Blank,
    DefenseFace::Blank,
    DefenseFace::Shield,
    DefenseFace::Shield,
    DefenseFace::TwoShields,
    DefenseFace::DoubleAll,
];

/// Roll `count` attack dice.
pub fn roll_attack(rng: &mut StdRng, count: u32) -> Vec<AttackFace> {
    (0..count)
        .map(|_| ATTACK_DIE[rng.random_range(0..6)])
        .collect()
}

/// Roll `count` defense dice.
pub fn roll_defense(rng: &mut StdRng, count: u32) -> Vec<DefenseFace> {
    (0..count)
        .map(|_| DEFENSE_DIE[rng.random_range(0..6)])
        .collect()
}

/// Attack value of a set of faces: summed swords, halves rounded down.
pub fn attack_value(faces: &[AttackFace]) -> u32 {
    let half_swords: u32 = faces
        .iter()
        .map(|face| match face {
            AttackFace::HollowSword => 1,
            AttackFace::Sword => 2,
            AttackFace::TwoSwords => 4,
            AttackFace::Skull => 4,
        })
        .sum();
    half_swords / 2
}

/// Number of skulls rolled; each costs the attacker one warband at the end
/// of the battle.
pub fn skull_count(faces: &[AttackFace]) -> u32 {
    faces
        .iter()
        .filter(|face| **face == AttackFace::Skull)
        .count() as u32
}

/// Defense value of a set of faces: summed shields, doubled once per
/// `DoubleAll` face.
pub fn defense_value(faces: &[DefenseFace]) -> u32 {
    let mut shields = 0u32;
    let mut doubles = 0u32;
    for face in faces {
        match face {
            DefenseFace::Blank => {}
            DefenseFace::Shield => shields += 1,
            DefenseFace::TwoShields => shields += 2,
            DefenseFace::DoubleAll => doubles += 1,
        }
    }
    shields << doubles.min(31)
}
